/// Snapshot entries recorded in a run ledger
use super::{BucketUri, Fingerprint};
use serde::{Deserialize, Serialize};

/// Which snapshot a ledger row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Source,
    Destination,
}

impl Relation {
    /// Ledger table holding this snapshot
    pub fn table(&self) -> &'static str {
        match self {
            Relation::Source => "source",
            Relation::Destination => "destination",
        }
    }
}

/// One source object captured at run start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub id: i64,
    pub bucket: BucketUri,
    pub path: String,
    pub fingerprint: Fingerprint,
    pub processed: bool,
}

/// One destination object captured at run start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationEntry {
    pub id: i64,
    pub bucket: BucketUri,
    pub path: String,
    pub fingerprint: Fingerprint,
}
