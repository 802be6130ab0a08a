//! Domain types for OAuth 2.0 storage.

pub mod access;
pub mod authorization;
pub mod client;

pub use access::AccessData;
pub use authorization::AuthorizationData;
pub use client::{Client, ClientExtra};
