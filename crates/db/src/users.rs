use std::io;
use std::path::Path;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use staybook_kernel::error::{StoreError, StoreResult};
use staybook_kernel::model::{User, UserId, UserRecord};
use staybook_kernel::repository::UserStore;

use crate::journal::{Journal, JournalEntry};

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Accounts keyed by id, with a unique case-insensitive email index.
pub struct InMemoryUserStore {
    rows: DashMap<UserId, UserRecord>,
    emails: DashMap<String, UserId>,
    journal: Option<Journal>,
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            emails: DashMap::new(),
            journal: None,
        }
    }

    pub fn open(path: &Path, fsync: bool) -> io::Result<Self> {
        let store = Self::new();
        for entry in Journal::replay::<UserRecord>(path)? {
            match entry {
                JournalEntry::Put { record } => {
                    if let Some(previous) = store.rows.insert(record.user.id, record.clone()) {
                        store.emails.remove(&email_key(&previous.user.email));
                    }
                    store
                        .emails
                        .insert(email_key(&record.user.email), record.user.id);
                }
                JournalEntry::Delete { id } => {
                    let id: UserId = id
                        .parse()
                        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                    if let Some((_, previous)) = store.rows.remove(&id) {
                        store.emails.remove(&email_key(&previous.user.email));
                    }
                }
            }
        }
        Ok(Self {
            journal: Some(Journal::open(path, fsync)?),
            ..store
        })
    }

    fn append(&self, entry: &JournalEntry<&UserRecord>) -> StoreResult<()> {
        if let Some(journal) = &self.journal {
            journal.append(entry)?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, record: UserRecord) -> StoreResult<User> {
        // The email slot stays locked until the row is written.
        match self.emails.entry(email_key(&record.user.email)) {
            Entry::Occupied(_) => Err(StoreError::Duplicate("email")),
            Entry::Vacant(slot) => {
                self.append(&JournalEntry::Put { record: &record })?;
                slot.insert(record.user.id);
                let user = record.user.clone();
                self.rows.insert(record.user.id, record);
                Ok(user)
            }
        }
    }

    async fn get(&self, id: UserId) -> StoreResult<UserRecord> {
        self.rows
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let Some(id) = self.emails.get(&email_key(email)).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.rows.get(&id).map(|row| row.value().clone()))
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.rows.iter().map(|row| row.user.clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn update(&self, record: UserRecord) -> StoreResult<User> {
        let id = record.user.id;
        let previous_email = self
            .rows
            .get(&id)
            .map(|row| email_key(&row.user.email))
            .ok_or_else(|| StoreError::not_found("user", id))?;
        let next_email = email_key(&record.user.email);

        if previous_email != next_email {
            match self.emails.entry(next_email) {
                Entry::Occupied(_) => return Err(StoreError::Duplicate("email")),
                Entry::Vacant(slot) => {
                    self.append(&JournalEntry::Put { record: &record })?;
                    slot.insert(id);
                }
            }
            self.emails.remove(&previous_email);
        } else {
            self.append(&JournalEntry::Put { record: &record })?;
        }

        let user = record.user.clone();
        self.rows.insert(id, record);
        Ok(user)
    }

    async fn delete(&self, id: UserId) -> StoreResult<User> {
        match self.rows.entry(id) {
            Entry::Occupied(row) => {
                self.append(&JournalEntry::Delete { id: id.to_string() })?;
                let (_, record) = row.remove_entry();
                self.emails.remove(&email_key(&record.user.email));
                Ok(record.user)
            }
            Entry::Vacant(_) => Err(StoreError::not_found("user", id)),
        }
    }
}
