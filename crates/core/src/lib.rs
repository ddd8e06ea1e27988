//! Functional core for questline.
//!
//! Pure domain types, repository traits, error taxonomies, and helper
//! functions shared by the server crates. No I/O happens here; storage and
//! network implementations live in `questline_auth` and the server binary.

pub mod account;
pub mod auth;
