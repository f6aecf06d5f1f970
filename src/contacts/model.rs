//! Contact records and form payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name → message. Empty means valid.
pub type ValidationErrors = BTreeMap<String, String>;

/// Message for a missing email.
pub const EMAIL_REQUIRED: &str = "Email Required";
/// Message for an email already used by another contact.
pub const EMAIL_NOT_UNIQUE: &str = "Email Must Be Unique";

/// A stored contact. An `id` of 0 marks a contact that has not been saved yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub first: String,
    #[serde(default)]
    pub last: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl Contact {
    /// Overwrite every editable field from a form.
    pub fn update(&mut self, form: ContactForm) {
        self.first = form.first;
        self.last = form.last;
        self.phone = form.phone;
        self.email = form.email;
    }

    /// Case-insensitive substring match against any non-empty field.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        [&self.first, &self.last, &self.email, &self.phone]
            .iter()
            .any(|field| !field.is_empty() && field.to_lowercase().contains(needle))
    }
}

impl From<ContactForm> for Contact {
    fn from(form: ContactForm) -> Self {
        let mut contact = Contact::default();
        contact.update(form);
        contact
    }
}

/// Create/edit payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default, alias = "firstName")]
    pub first: String,
    #[serde(default, alias = "lastName")]
    pub last: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Contact {
        Contact {
            id: 1,
            first: "Alice".into(),
            last: "Liddell".into(),
            phone: "555-0101".into(),
            email: "alice@example.com".into(),
        }
    }

    #[test]
    fn matches_any_field_case_insensitively() {
        let c = alice();
        assert!(c.matches("ali"));
        assert!(c.matches("liddell"));
        assert!(c.matches("example.com"));
        assert!(c.matches("0101"));
        assert!(!c.matches("bob"));
    }

    #[test]
    fn empty_fields_never_match() {
        let c = Contact {
            email: "x@y.z".into(),
            ..Contact::default()
        };
        assert!(!c.matches("nobody"));
        assert!(c.matches("x@"));
    }

    #[test]
    fn form_accepts_camel_case_names() {
        let form: ContactForm = serde_json::from_str(
            r#"{"firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com"}"#,
        )
        .unwrap();
        let contact = Contact::from(form);
        assert_eq!(contact.id, 0);
        assert_eq!(contact.first, "Ada");
        assert_eq!(contact.last, "Lovelace");
        assert_eq!(contact.phone, "");
    }

    #[test]
    fn update_keeps_id() {
        let mut c = alice();
        c.update(ContactForm {
            first: "Alicia".into(),
            email: "alicia@example.com".into(),
            ..ContactForm::default()
        });
        assert_eq!(c.id, 1);
        assert_eq!(c.first, "Alicia");
        assert_eq!(c.last, "");
    }
}
