use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CatalogError, Result};

/// Field names a query may reference, in form order.
pub const FIELDS: [&str; 8] = ["id", "name", "category", "origin", "color", "notes", "score", "photo"];

/// Opaque record identity. Time-ordered, so ids sort by creation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_matches(|c| c == '\'' || c == '"');
        Uuid::parse_str(trimmed)
            .map(RecordId)
            .map_err(|_| CatalogError::InvalidId(s.to_string()))
    }
}

/// One tasting entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub category: String,
    pub origin: String,
    pub color: String,
    #[serde(default)]
    pub notes: String,
    /// Free-form text; the interpreter compares it numerically when asked.
    pub score: String,
    /// Self-contained `data:` URL so the record travels without external files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl Record {
    /// Textual value of a field by name. Unknown fields and an absent photo are `None`.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.to_string()),
            "name" => Some(self.name.clone()),
            "category" => Some(self.category.clone()),
            "origin" => Some(self.origin.clone()),
            "color" => Some(self.color.clone()),
            "notes" => Some(self.notes.clone()),
            "score" => Some(self.score.clone()),
            "photo" => self.photo.clone(),
            _ => None,
        }
    }
}

/// Editable form state. Fields are replaced wholesale on submit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDraft {
    pub name: String,
    pub category: String,
    pub origin: String,
    pub color: String,
    pub notes: String,
    pub score: String,
    pub photo: Option<String>,
}

impl RecordDraft {
    pub fn from_record(record: &Record) -> Self {
        Self {
            name: record.name.clone(),
            category: record.category.clone(),
            origin: record.origin.clone(),
            color: record.color.clone(),
            notes: record.notes.clone(),
            score: record.score.clone(),
            photo: record.photo.clone(),
        }
    }

    /// Required fields left empty, in form order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("category", &self.category),
            ("origin", &self.origin),
            ("color", &self.color),
            ("score", &self.score),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::MissingFields(missing))
        }
    }

    pub fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            name: self.name,
            category: self.category,
            origin: self.origin,
            color: self.color,
            notes: self.notes,
            score: self.score,
            photo: self.photo,
        }
    }
}
