//! Contact manager with a pollable background archive job.

pub mod archive;
pub mod config;
pub mod contacts;
pub mod error;
pub mod server;
