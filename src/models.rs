use crate::errors::{StoreError, StoreResult};
use crate::naming;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Where an outcome item came from: promoted from the day's plan, or added
/// freeform. A `plan`-sourced item shares its id with the plan item it was
/// promoted from; the link records provenance, not ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    Plan,
    Added,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    pub id: String,
    pub text: String,
    pub done: bool,
}

impl PlanItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            done: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualItem {
    pub id: String,
    pub text: String,
    pub done: bool,
    pub source: ItemSource,
}

impl ActualItem {
    pub fn added(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            done: true,
            source: ItemSource::Added,
        }
    }
}

/// One user's plan/outcome pair for one calendar day. Mutated in memory only;
/// persisted as exactly one encrypted file per (date, user), fully
/// overwritten on every save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub user: String,
    pub date: String,
    pub plan: Vec<PlanItem>,
    pub actual: Vec<ActualItem>,
}

impl Record {
    pub fn empty(user: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            date: date.into(),
            plan: Vec::new(),
            actual: Vec::new(),
        }
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.user.is_empty() {
            return Err(StoreError::Parse("record user must not be empty".to_string()));
        }
        if !naming::is_valid_date(&self.date) {
            return Err(StoreError::Parse(format!(
                "record date must be YYYY-MM-DD, got {:?}",
                self.date
            )));
        }
        let mut plan_ids = HashSet::new();
        for item in &self.plan {
            if !plan_ids.insert(item.id.as_str()) {
                return Err(StoreError::Parse(format!("duplicate plan item id {}", item.id)));
            }
        }
        let mut actual_ids = HashSet::new();
        for item in &self.actual {
            if !actual_ids.insert(item.id.as_str()) {
                return Err(StoreError::Parse(format!(
                    "duplicate actual item id {}",
                    item.id
                )));
            }
        }
        Ok(())
    }
}

/// Listing element for a teammate's file that could not be decrypted or
/// parsed. Attribution comes from the filename, the only part of a failed
/// file that is still trustworthy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPlaceholder {
    pub user: String,
    pub date: String,
    pub message: String,
}

impl ErrorPlaceholder {
    /// Renders the placeholder in record shape so the shell can show it
    /// inline with the rest of the team: empty plan, one non-actionable
    /// outcome item carrying the message.
    pub fn display_record(&self) -> Record {
        Record {
            user: self.user.clone(),
            date: self.date.clone(),
            plan: Vec::new(),
            actual: vec![ActualItem {
                id: Uuid::new_v4().to_string(),
                text: self.message.clone(),
                done: false,
                source: ItemSource::Added,
            }],
        }
    }
}

/// One element of a directory listing: a decrypted record, or a per-file
/// failure that must not hide the rest of the team's data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordEntry {
    Record(Record),
    Error(ErrorPlaceholder),
}

impl RecordEntry {
    pub fn user(&self) -> &str {
        match self {
            Self::Record(record) => &record.user,
            Self::Error(placeholder) => &placeholder.user,
        }
    }

    pub fn date(&self) -> &str {
        match self {
            Self::Record(record) => &record.date,
            Self::Error(placeholder) => &placeholder.date,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Error(_) => None,
        }
    }
}
