mod bucket;
mod ledger;
mod object;

pub use bucket::{BucketUri, ParseBucketError};
pub use ledger::{DestinationEntry, Relation, SourceEntry};
pub use object::{Fingerprint, ObjectInfo};
