//! Contact records, storage, and their HTTP surface.

mod extract;
pub mod json_backend;
pub mod model;
pub mod routes;
pub mod store;

pub use json_backend::JsonContactStore;
pub use model::{Contact, ContactForm, ValidationErrors};
pub use routes::{ContactRouteState, contact_routes};
pub use store::{ContactStore, PAGE_SIZE, SaveOutcome};
