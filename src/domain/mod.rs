// Domain layer - records, keys and derived statistics
pub mod dashboard;
pub mod heading;
pub mod key;
pub mod metric;
pub mod record;
pub mod stats;
