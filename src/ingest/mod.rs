pub mod columns;
pub mod scanner;

pub use columns::{CanonicalFields, UsageRow};
pub use scanner::{ingest, IngestError, IngestOptions, IngestOutcome, IngestProgress};
