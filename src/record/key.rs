//! Grouping and join keys derived from records.

use super::Record;

/// Sub-record holding only the fields a record is grouped by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GroupKey(Record);

impl GroupKey {
    pub fn fields(&self) -> &Record {
        &self.0
    }

    pub fn into_record(self) -> Record {
        self.0
    }
}

impl From<Record> for GroupKey {
    fn from(r: Record) -> Self {
        GroupKey(r)
    }
}

/// A group key scoped to one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinKey {
    pub key: GroupKey,
    pub epoch: i64,
}

impl JoinKey {
    pub fn new(key: GroupKey, epoch: i64) -> Self {
        Self { key, epoch }
    }
}
