//! JSON-file backend for `ContactStore`.
//!
//! Holds every contact in memory and rewrites the whole file after each
//! mutation. The write lock is held across validation, mutation, and the
//! file write, so uniqueness checks and id assignment never race.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::model::{Contact, ContactForm, EMAIL_NOT_UNIQUE, EMAIL_REQUIRED, ValidationErrors};
use super::store::{ContactStore, PAGE_SIZE, SaveOutcome};
use crate::error::StoreError;

/// Contact store persisted as a JSON array.
pub struct JsonContactStore {
    path: PathBuf,
    contacts: RwLock<BTreeMap<u64, Contact>>,
}

impl JsonContactStore {
    /// Create an empty store that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            contacts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Load contacts from `path`. A missing file yields an empty store.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let contacts = match fs::read(&path).await {
            Ok(bytes) => {
                let list: Vec<Contact> = serde_json::from_slice(&bytes)?;
                list.into_iter().map(|c| (c.id, c)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Contacts file not found, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), count = contacts.len(), "Contacts loaded");
        Ok(Self {
            path,
            contacts: RwLock::new(contacts),
        })
    }

    /// Validate and insert under an already-held write guard, then persist.
    /// The map is restored if the file write fails.
    async fn commit(
        &self,
        contacts: &mut BTreeMap<u64, Contact>,
        mut contact: Contact,
    ) -> Result<SaveOutcome, StoreError> {
        let errors = validate_against(contacts, &contact);
        if !errors.is_empty() {
            debug!(id = contact.id, ?errors, "Contact failed validation");
            return Ok(SaveOutcome::Invalid(errors));
        }

        if contact.id == 0 {
            contact.id = contacts.keys().next_back().copied().unwrap_or(0) + 1;
        }
        let id = contact.id;
        let previous = contacts.insert(id, contact.clone());

        if let Err(e) = self.persist(contacts).await {
            match previous {
                Some(old) => contacts.insert(id, old),
                None => contacts.remove(&id),
            };
            return Err(e);
        }

        info!(id, created = previous.is_none(), "Contact saved");
        Ok(SaveOutcome::Saved(contact))
    }

    async fn persist(&self, contacts: &BTreeMap<u64, Contact>) -> Result<(), StoreError> {
        let list: Vec<&Contact> = contacts.values().collect();
        let bytes = serde_json::to_vec(&list)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, bytes).await?;
        debug!(path = %self.path.display(), count = list.len(), "Contacts persisted");
        Ok(())
    }
}

fn validate_against(contacts: &BTreeMap<u64, Contact>, contact: &Contact) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if contact.email.is_empty() {
        errors.insert("email".to_string(), EMAIL_REQUIRED.to_string());
    }
    if contacts
        .values()
        .any(|other| other.id != contact.id && other.email == contact.email)
    {
        errors.insert("email".to_string(), EMAIL_NOT_UNIQUE.to_string());
    }
    errors
}

#[async_trait]
impl ContactStore for JsonContactStore {
    async fn all(&self, page: usize) -> Vec<Contact> {
        let start = page.max(1).saturating_sub(1).saturating_mul(PAGE_SIZE);
        let contacts = self.contacts.read().await;
        contacts
            .values()
            .skip(start)
            .take(PAGE_SIZE)
            .cloned()
            .collect()
    }

    async fn search(&self, text: &str) -> Vec<Contact> {
        let needle = text.to_lowercase();
        let contacts = self.contacts.read().await;
        contacts
            .values()
            .filter(|c| c.matches(&needle))
            .cloned()
            .collect()
    }

    async fn count(&self) -> usize {
        self.contacts.read().await.len()
    }

    async fn find(&self, id: u64) -> Option<Contact> {
        self.contacts.read().await.get(&id).cloned()
    }

    async fn validate(&self, contact: &Contact) -> ValidationErrors {
        let contacts = self.contacts.read().await;
        validate_against(&contacts, contact)
    }

    async fn save(&self, contact: Contact) -> Result<SaveOutcome, StoreError> {
        let mut contacts = self.contacts.write().await;
        self.commit(&mut contacts, contact).await
    }

    async fn update(&self, id: u64, form: ContactForm) -> Result<SaveOutcome, StoreError> {
        let mut contacts = self.contacts.write().await;
        let Some(mut contact) = contacts.get(&id).cloned() else {
            return Err(StoreError::NotFound { id });
        };
        contact.update(form);
        self.commit(&mut contacts, contact).await
    }

    async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let mut contacts = self.contacts.write().await;
        let Some(removed) = contacts.remove(&id) else {
            debug!(id, "Delete of unknown contact ignored");
            return Ok(false);
        };

        if let Err(e) = self.persist(&contacts).await {
            contacts.insert(id, removed);
            return Err(e);
        }

        info!(id, "Contact deleted");
        Ok(true)
    }

    async fn delete_many(&self, ids: &[u64]) -> Result<usize, StoreError> {
        let mut contacts = self.contacts.write().await;
        let removed: Vec<Contact> = ids.iter().filter_map(|id| contacts.remove(id)).collect();
        if removed.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.persist(&contacts).await {
            contacts.extend(removed.into_iter().map(|c| (c.id, c)));
            return Err(e);
        }

        info!(count = removed.len(), "Contacts deleted");
        Ok(removed.len())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(first: &str, email: &str) -> Contact {
        Contact::from(ContactForm {
            first: first.into(),
            email: email.into(),
            ..ContactForm::default()
        })
    }

    async fn saved(store: &JsonContactStore, contact: Contact) -> Contact {
        match store.save(contact).await.unwrap() {
            SaveOutcome::Saved(c) => c,
            SaveOutcome::Invalid(errors) => panic!("unexpected validation errors: {errors:?}"),
        }
    }

    #[tokio::test]
    async fn save_assigns_incrementing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonContactStore::new(dir.path().join("contacts.json"));

        let a = saved(&store, form("Ann", "ann@example.com")).await;
        let b = saved(&store, form("Ben", "ben@example.com")).await;
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);

        store.delete(b.id).await.unwrap();
        let c = saved(&store, form("Cal", "cal@example.com")).await;
        assert_eq!(c.id, 2);
        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn email_required_and_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonContactStore::new(dir.path().join("contacts.json"));

        match store.save(form("Nobody", "")).await.unwrap() {
            SaveOutcome::Invalid(errors) => assert_eq!(errors["email"], EMAIL_REQUIRED),
            other => panic!("expected invalid, got {other:?}"),
        }

        let ann = saved(&store, form("Ann", "ann@example.com")).await;
        match store.save(form("Imposter", "ann@example.com")).await.unwrap() {
            SaveOutcome::Invalid(errors) => assert_eq!(errors["email"], EMAIL_NOT_UNIQUE),
            other => panic!("expected invalid, got {other:?}"),
        }

        // Re-saving the same contact with its own email is fine.
        let mut edited = ann.clone();
        edited.first = "Anne".into();
        let edited = saved(&store, edited).await;
        assert_eq!(edited.id, ann.id);
        assert_eq!(store.find(ann.id).await.unwrap().first, "Anne");
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn pagination_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonContactStore::new(dir.path().join("contacts.json"));
        {
            let mut contacts = store.contacts.write().await;
            for id in 1..=(PAGE_SIZE as u64 + 5) {
                contacts.insert(
                    id,
                    Contact {
                        id,
                        email: format!("c{id}@example.com"),
                        ..Contact::default()
                    },
                );
            }
        }

        let first = store.all(1).await;
        assert_eq!(first.len(), PAGE_SIZE);
        assert_eq!(first[0].id, 1);
        assert_eq!(store.all(0).await, first);

        let second = store.all(2).await;
        assert_eq!(second.len(), 5);
        assert_eq!(second[0].id, PAGE_SIZE as u64 + 1);

        assert!(store.all(3).await.is_empty());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonContactStore::new(dir.path().join("contacts.json"));
        saved(&store, form("Zed", "zed@Example.com")).await;
        saved(&store, form("amy", "amy@other.org")).await;
        saved(&store, form("Bob", "bob@example.com")).await;

        let hits = store.search("EXAMPLE").await;
        let names: Vec<_> = hits.iter().map(|c| c.first.as_str()).collect();
        assert_eq!(names, ["Zed", "Bob"]);
        assert!(store.search("nothing-here").await.is_empty());
    }

    #[tokio::test]
    async fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("contacts.json");
        let store = JsonContactStore::new(&path);
        saved(&store, form("Ann", "ann@example.com")).await;
        saved(&store, form("Ben", "ben@example.com")).await;
        assert_eq!(store.delete_many(&[1, 99]).await.unwrap(), 1);

        let reloaded = JsonContactStore::load(&path).await.unwrap();
        assert_eq!(reloaded.count().await, 1);
        assert_eq!(reloaded.find(2).await.unwrap().first, "Ben");
        assert_eq!(reloaded.path(), path.as_path());
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonContactStore::load(dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn load_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contacts.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = JsonContactStore::load(&path).await.err().unwrap();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn update_applies_form_and_rejects_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonContactStore::new(dir.path().join("contacts.json"));
        let ann = saved(&store, form("Ann", "ann@example.com")).await;
        saved(&store, form("Ben", "ben@example.com")).await;

        let edit = ContactForm {
            first: "Anne".into(),
            email: "anne@example.com".into(),
            ..ContactForm::default()
        };
        match store.update(ann.id, edit).await.unwrap() {
            SaveOutcome::Saved(c) => {
                assert_eq!(c.id, ann.id);
                assert_eq!(c.first, "Anne");
            }
            other => panic!("expected saved, got {other:?}"),
        }

        let clash = ContactForm {
            email: "ben@example.com".into(),
            ..ContactForm::default()
        };
        match store.update(ann.id, clash).await.unwrap() {
            SaveOutcome::Invalid(errors) => assert_eq!(errors["email"], EMAIL_NOT_UNIQUE),
            other => panic!("expected invalid, got {other:?}"),
        }
        assert_eq!(store.find(ann.id).await.unwrap().email, "anne@example.com");

        let err = store.update(99, ContactForm::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 99 }));
        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn delete_unknown_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonContactStore::new(dir.path().join("contacts.json"));
        assert!(!store.delete(42).await.unwrap());
        assert_eq!(store.delete_many(&[1, 2]).await.unwrap(), 0);
    }
}
