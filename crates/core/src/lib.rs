//! Bookstore Core - Shared domain types.
//!
//! This crate provides the types shared by the bookstore components:
//! - `client` - Session, cart and API access for the bookstore REST API
//! - `cli` - Command-line front-end built on the client
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
