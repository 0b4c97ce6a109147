//! Persistent user records.

mod sqlite;

pub use sqlite::{StoreError, UserStore};
