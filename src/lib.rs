pub mod model;
pub mod error;
pub mod storage;
pub mod parser;
pub mod query;
pub mod photo;
pub mod config;

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Settings;
use crate::error::{CatalogError, Result};
use crate::model::{Record, RecordDraft, RecordId};
use crate::query::{QueryMode, View};
use crate::storage::Slot;

/// How imported records combine with the current collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    Replace,
    /// Append records whose ids are not present yet.
    Merge,
}

/// Single controller owning the collection, the edit target and the current filter.
///
/// Every mutation rewrites the whole slot; callers re-read `view()` afterwards.
pub struct Catalog {
    slot: Slot,
    records: Vec<Record>,
    editing: Option<RecordId>,
    current_query: Option<String>,
    query_mode: QueryMode,
    export_file: String,
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
        .field("slot", &self.slot.file_path)
        .field("record_count", &self.records.len())
        .field("editing", &self.editing)
        .finish()
    }
}

impl Catalog {
    pub fn open(settings: &Settings) -> Self {
        let slot = Slot::new(&settings.data_dir, &settings.slot);
        let records = slot.load();

        Self {
            slot,
            records,
            editing: None,
            current_query: None,
            query_mode: settings.query_mode,
            export_file: settings.export_file.clone(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn editing(&self) -> Option<RecordId> {
        self.editing
    }

    /// Create a record, or replace the one under edit. Incomplete drafts change nothing.
    pub fn submit(&mut self, draft: RecordDraft) -> Result<RecordId> {
        draft.validate()?;

        let mut records = self.records.clone();
        let id = match self.editing {
            Some(id) => {
                let entry = records
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or(CatalogError::RecordNotFound(id))?;
                *entry = draft.into_record(id);
                id
            }
            None => {
                let id = self.fresh_id();
                records.push(draft.into_record(id));
                id
            }
        };

        self.commit(records)?;
        if self.editing.take().is_some() {
            info!(%id, "updated record");
        } else {
            info!(%id, "created record");
        }
        Ok(id)
    }

    /// Mark `id` as the edit target and hand back its current values.
    pub fn begin_edit(&mut self, id: RecordId) -> Result<RecordDraft> {
        let record = self.get(id).ok_or(CatalogError::RecordNotFound(id))?;
        let draft = RecordDraft::from_record(record);
        self.editing = Some(id);
        Ok(draft)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub fn update(&mut self, id: RecordId, draft: RecordDraft) -> Result<RecordId> {
        let previous = self.editing;
        self.begin_edit(id)?;
        let result = self.submit(draft);
        if result.is_err() {
            self.editing = previous;
        }
        result
    }

    pub fn delete(&mut self, id: RecordId) -> Result<Record> {
        let pos = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(CatalogError::RecordNotFound(id))?;
        let mut records = self.records.clone();
        let removed = records.remove(pos);
        self.commit(records)?;
        if self.editing == Some(id) {
            self.editing = None;
        }
        info!(%id, "deleted record");
        Ok(removed)
    }

    /// Remember `text` as the current filter and evaluate it.
    pub fn search(&mut self, text: &str) -> View {
        self.current_query = if text.trim().is_empty() { None } else { Some(text.to_string()) };
        self.view()
    }

    pub fn clear_search(&mut self) {
        self.current_query = None;
    }

    pub fn current_query(&self) -> Option<&str> {
        self.current_query.as_deref()
    }

    /// Re-run the current filter against the current contents.
    pub fn view(&self) -> View {
        match &self.current_query {
            Some(text) => query::evaluate_with(&self.records, text, self.query_mode),
            None => View::all(&self.records),
        }
    }

    pub fn export(&self, dir: &Path) -> Result<PathBuf> {
        storage::export(&self.records, dir, &self.export_file)
    }

    /// Load an exported file. Returns how many records were added.
    pub fn import(&mut self, path: &Path, mode: ImportMode) -> Result<usize> {
        let incoming = storage::import(path)?;
        let (records, added) = match mode {
            ImportMode::Replace => {
                let count = incoming.len();
                (incoming, count)
            }
            ImportMode::Merge => {
                let mut records = self.records.clone();
                let mut added = 0;
                for record in incoming {
                    if !records.iter().any(|r| r.id == record.id) {
                        records.push(record);
                        added += 1;
                    }
                }
                (records, added)
            }
        };
        self.commit(records)?;
        if mode == ImportMode::Replace {
            self.editing = None;
        }
        Ok(added)
    }

    fn fresh_id(&self) -> RecordId {
        loop {
            let id = RecordId::generate();
            if self.get(id).is_none() {
                return id;
            }
        }
    }

    /// Write `records` to the slot, then adopt them. A failed write leaves memory as it was.
    fn commit(&mut self, records: Vec<Record>) -> Result<()> {
        self.slot.replace_all(&records)?;
        self.records = records;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &Path) -> Settings {
        Settings { data_dir: dir.to_path_buf(), ..Settings::default() }
    }

    fn draft(name: &str, score: &str) -> RecordDraft {
        RecordDraft {
            name: name.into(),
            category: "Ale".into(),
            origin: "England".into(),
            color: "Copper".into(),
            score: score.into(),
            ..Default::default()
        }
    }

    #[test]
    fn failed_write_keeps_memory_and_edit_target() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let mut catalog = Catalog::open(&settings(&data));
        let id = catalog.submit(draft("Mild", "5")).unwrap();

        // Swap the data directory for a plain file so every write fails
        std::fs::remove_dir_all(&data).unwrap();
        std::fs::write(&data, "not a directory").unwrap();

        catalog.begin_edit(id).unwrap();
        assert!(matches!(catalog.submit(draft("Dark Mild", "6")), Err(CatalogError::Io(_))));
        assert_eq!(catalog.get(id).unwrap().name, "Mild");
        assert_eq!(catalog.editing(), Some(id));

        catalog.cancel_edit();
        assert!(catalog.submit(draft("Brown Ale", "7")).is_err());
        assert_eq!(catalog.records().len(), 1);

        assert!(catalog.delete(id).is_err());
        assert!(catalog.get(id).is_some());
    }

    #[test]
    fn rejected_submit_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::open(&settings(dir.path()));
        let mut incomplete = draft("Bitter", "6");
        incomplete.color.clear();

        assert!(matches!(catalog.submit(incomplete), Err(CatalogError::MissingFields(_))));
        assert!(catalog.records().is_empty());
        assert!(!dir.path().join("records.json").exists());
    }

    #[test]
    fn failed_update_keeps_previous_edit_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::open(&settings(dir.path()));
        let a = catalog.submit(draft("Mild", "5")).unwrap();
        let b = catalog.submit(draft("Porter", "7")).unwrap();

        catalog.begin_edit(a).unwrap();
        assert!(catalog.update(b, RecordDraft::default()).is_err());
        assert_eq!(catalog.editing(), Some(a));
        assert_eq!(catalog.get(b).unwrap().name, "Porter");
    }

    #[test]
    fn view_without_query_shows_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::open(&settings(dir.path()));
        catalog.submit(draft("Mild", "5")).unwrap();
        catalog.submit(draft("Porter", "7")).unwrap();

        assert_eq!(catalog.view().records, catalog.records());
        catalog.search("   ");
        assert_eq!(catalog.current_query(), None);
    }
}
