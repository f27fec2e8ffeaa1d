//! Storage layer: in-memory tables with an optional JSON-lines journal, and
//! the booking ledger that owns the non-overlap invariant.

mod journal;
mod ledger;
mod properties;
mod users;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use staybook_kernel::repository::{BookingLedger, PropertyStore, UserStore};
use staybook_kernel::settings::DatabaseSettings;

pub use journal::{Journal, JournalEntry};
pub use ledger::InMemoryLedger;
pub use properties::InMemoryPropertyStore;
pub use users::InMemoryUserStore;

/// The three stores the application runs on.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub properties: Arc<dyn PropertyStore>,
    pub bookings: Arc<dyn BookingLedger>,
}

impl Stores {
    /// Memory-only stores.
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserStore::new()),
            properties: Arc::new(InMemoryPropertyStore::new()),
            bookings: Arc::new(InMemoryLedger::new()),
        }
    }

    /// Open the stores described by `settings`, replaying journals when a
    /// journal directory is configured.
    pub fn open(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let Some(dir) = settings.journal_dir.as_deref() else {
            tracing::info!(target: "staybook-db", "journal disabled, stores are memory-only");
            return Ok(Self::in_memory());
        };
        Self::open_dir(dir, settings.fsync)
    }

    fn open_dir(dir: &Path, fsync: bool) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create journal dir {}", dir.display()))?;

        let users = InMemoryUserStore::open(&dir.join("users.jsonl"), fsync)
            .context("failed to open user journal")?;
        let properties = InMemoryPropertyStore::open(&dir.join("properties.jsonl"), fsync)
            .context("failed to open property journal")?;
        let bookings = InMemoryLedger::open(&dir.join("bookings.jsonl"), fsync)
            .context("failed to open booking journal")?;

        tracing::info!(target: "staybook-db", dir = %dir.display(), fsync, "journals replayed");
        Ok(Self {
            users: Arc::new(users),
            properties: Arc::new(properties),
            bookings: Arc::new(bookings),
        })
    }
}
