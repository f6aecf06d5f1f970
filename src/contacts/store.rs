//! `ContactStore` trait: the single async interface for contact persistence.

use std::path::Path;

use async_trait::async_trait;

use super::model::{Contact, ContactForm, ValidationErrors};
use crate::error::StoreError;

/// Contacts per listing page.
pub const PAGE_SIZE: usize = 100;

/// Result of a save attempt that reached validation.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Persisted; carries the contact with its assigned id.
    Saved(Contact),
    /// Rejected by validation; nothing was written.
    Invalid(ValidationErrors),
}

/// Backend-agnostic contact store.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// One page of contacts ordered by id. Pages are 1-based; 0 reads as 1.
    async fn all(&self, page: usize) -> Vec<Contact>;

    /// Contacts with any field containing `text`, case-insensitively, ordered by id.
    async fn search(&self, text: &str) -> Vec<Contact>;

    /// Total number of contacts.
    async fn count(&self) -> usize;

    /// Look up a contact by id.
    async fn find(&self, id: u64) -> Option<Contact>;

    /// Check a contact against the current record set without saving it.
    async fn validate(&self, contact: &Contact) -> ValidationErrors;

    /// Validate and persist. A contact with id 0 is assigned the next free id.
    async fn save(&self, contact: Contact) -> Result<SaveOutcome, StoreError>;

    /// Apply `form` to an existing contact, then validate and persist.
    ///
    /// Fails with `StoreError::NotFound` when no contact has `id`.
    async fn update(&self, id: u64, form: ContactForm) -> Result<SaveOutcome, StoreError>;

    /// Remove a contact. Returns whether it existed.
    async fn delete(&self, id: u64) -> Result<bool, StoreError>;

    /// Remove several contacts at once. Returns how many existed.
    async fn delete_many(&self, ids: &[u64]) -> Result<usize, StoreError>;

    /// Backing file. The archive artifact is served from here.
    fn path(&self) -> &Path;
}
