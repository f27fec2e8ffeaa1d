use std::io;
use std::path::Path;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use staybook_kernel::error::{StoreError, StoreResult};
use staybook_kernel::model::{Property, PropertyFilter, PropertyId};
use staybook_kernel::repository::PropertyStore;

use crate::journal::{Journal, JournalEntry};

pub struct InMemoryPropertyStore {
    rows: DashMap<PropertyId, Property>,
    journal: Option<Journal>,
}

impl Default for InMemoryPropertyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPropertyStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            journal: None,
        }
    }

    /// Replay `path` and keep appending to it.
    pub fn open(path: &Path, fsync: bool) -> io::Result<Self> {
        let rows = DashMap::new();
        for entry in Journal::replay::<Property>(path)? {
            match entry {
                JournalEntry::Put { record } => {
                    rows.insert(record.id, record);
                }
                JournalEntry::Delete { id } => {
                    let id: PropertyId = id
                        .parse()
                        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                    rows.remove(&id);
                }
            }
        }
        Ok(Self {
            rows,
            journal: Some(Journal::open(path, fsync)?),
        })
    }

    fn append(&self, entry: &JournalEntry<&Property>) -> StoreResult<()> {
        if let Some(journal) = &self.journal {
            journal.append(entry)?;
        }
        Ok(())
    }
}

#[async_trait]
impl PropertyStore for InMemoryPropertyStore {
    async fn get(&self, id: PropertyId) -> StoreResult<Property> {
        self.rows
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or_else(|| StoreError::not_found("property", id))
    }

    async fn exists(&self, id: PropertyId) -> bool {
        self.rows.contains_key(&id)
    }

    async fn list(&self, filter: &PropertyFilter) -> StoreResult<Vec<Property>> {
        let mut properties: Vec<Property> = self
            .rows
            .iter()
            .filter(|row| filter.matches(row.value()))
            .map(|row| row.value().clone())
            .collect();
        properties.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(properties)
    }

    async fn insert(&self, property: Property) -> StoreResult<Property> {
        match self.rows.entry(property.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate("property id")),
            Entry::Vacant(slot) => {
                self.append(&JournalEntry::Put { record: &property })?;
                slot.insert(property.clone());
                Ok(property)
            }
        }
    }

    async fn update(&self, property: Property) -> StoreResult<Property> {
        let mut row = self
            .rows
            .get_mut(&property.id)
            .ok_or_else(|| StoreError::not_found("property", property.id))?;
        self.append(&JournalEntry::Put { record: &property })?;
        *row = property.clone();
        Ok(property)
    }

    async fn delete(&self, id: PropertyId) -> StoreResult<Property> {
        match self.rows.entry(id) {
            Entry::Occupied(row) => {
                self.append(&JournalEntry::Delete { id: id.to_string() })?;
                Ok(row.remove())
            }
            Entry::Vacant(_) => Err(StoreError::not_found("property", id)),
        }
    }
}
