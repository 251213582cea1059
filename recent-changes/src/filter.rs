use crate::age::age_of_timestamp;
use crate::types::{ChangeMode, ChangeRecord, ItemDescriptor, Result};
use chrono::{DateTime, TimeZone};

/// Both ages of one item, computed once and reused downstream.
///
/// The age the mode does not look at may be unknown when its timestamp is
/// missing or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ages {
    pub creation: Option<i64>,
    pub modification: Option<i64>,
}

impl Ages {
    pub fn new(creation: i64, modification: i64) -> Self {
        Self {
            creation: Some(creation),
            modification: Some(modification),
        }
    }

    pub fn effective(&self, mode: ChangeMode) -> Option<i64> {
        match mode {
            ChangeMode::Created => self.creation,
            ChangeMode::Modified => self.modification,
        }
    }
}

/// Decides which items count as recent changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub days: i64,
    pub mode: ChangeMode,
    pub author: Option<String>,
}

impl ChangeFilter {
    pub fn new(days: i64, mode: ChangeMode) -> Self {
        Self {
            days,
            mode,
            author: None,
        }
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    /// The inclusion rule itself: age within the window, then exact author match.
    pub fn admits(&self, ages: Ages, created_by: &str, last_modified_by: &str) -> bool {
        match ages.effective(self.mode) {
            Some(age) if age <= self.days => {}
            _ => return false,
        }

        match &self.author {
            Some(author) => {
                let effective_author = match self.mode {
                    ChangeMode::Created => created_by,
                    ChangeMode::Modified => last_modified_by,
                };
                effective_author == author
            }
            None => true,
        }
    }

    /// Returns the item's ages when it qualifies, `None` when it does not.
    ///
    /// Fails only if the timestamp the mode filters on cannot be parsed. The
    /// other one is left unknown instead.
    pub fn evaluate<Tz: TimeZone>(&self, item: &ItemDescriptor, now: &DateTime<Tz>) -> Result<Option<Ages>> {
        let creation = age_of_timestamp(now, &item.created_date);
        let modification = age_of_timestamp(now, &item.last_modified_date);
        let ages = match self.mode {
            ChangeMode::Created => Ages {
                creation: Some(creation?),
                modification: modification.ok(),
            },
            ChangeMode::Modified => Ages {
                creation: creation.ok(),
                modification: Some(modification?),
            },
        };

        if self.admits(ages, &item.created_by_name, &item.last_modified_by_name) {
            Ok(Some(ages))
        } else {
            Ok(None)
        }
    }

    /// Re-apply the rule to a record that was already produced by a scan.
    pub fn accepts_record(&self, record: &ChangeRecord) -> bool {
        let ages = Ages {
            creation: record.creation_age,
            modification: record.modification_age,
        };
        self.admits(ages, &record.created_by_name, &record.last_modified_by_name)
    }
}
