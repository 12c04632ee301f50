//! Local persistence layer (key-value storage).
//!
//! The session keeps its credential record and the last-import timestamp
//! here. Values are plain strings, the way browser local storage holds them.

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::AppError;

/// Storage key names as constants.
pub mod keys {
    /// Prefix shared by every key this application owns.
    pub const NAMESPACE: &str = "strava_";
    pub const ACCESS_TOKEN: &str = "strava_access_token";
    pub const REFRESH_TOKEN: &str = "strava_refresh_token";
    /// Token expiry, epoch milliseconds as a decimal string
    pub const TOKEN_EXPIRY: &str = "strava_token_expiry";
    /// Last import high-water mark, epoch milliseconds as a decimal string
    pub const LAST_IMPORT: &str = "last_import_timestamp";
}

/// String key-value store with get/set/remove.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), AppError>;
    /// All keys currently present, in no particular order.
    fn keys(&self) -> Result<Vec<String>, AppError>;

    /// Set several keys as one unit: either all are written or none are.
    ///
    /// The default writes one key at a time and restores the earlier
    /// values when a write fails.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), AppError> {
        let mut written: Vec<(&str, Option<String>)> = Vec::with_capacity(entries.len());

        for &(key, value) in entries {
            let previous = match self.get(key) {
                Ok(previous) => previous,
                Err(e) => {
                    rollback(self, &written);
                    return Err(e);
                }
            };
            if let Err(e) = self.set(key, value) {
                rollback(self, &written);
                return Err(e);
            }
            written.push((key, previous));
        }
        Ok(())
    }
}

fn rollback<S: KeyValueStore + ?Sized>(store: &S, written: &[(&str, Option<String>)]) {
    for (key, previous) in written.iter().rev() {
        let restored = match previous {
            Some(value) => store.set(key, value),
            None => store.remove(key),
        };
        if let Err(e) = restored {
            tracing::error!(key = %key, error = %e, "Failed to restore stored item");
        }
    }
}
