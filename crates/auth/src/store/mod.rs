//! Account and auth-flow storage.

mod sqlite;

pub use sqlite::AccountStore;
