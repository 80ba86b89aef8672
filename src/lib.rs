// Ventas Analytics - Core Library
// Batch pipeline over a point-of-sale sales export: decode, clean, enrich,
// then answer filtered metric queries for whatever front end consumes them

pub mod cleaner;
pub mod dataset;
pub mod enrich;
pub mod loader;
pub mod metrics;

// Re-export commonly used types
pub use cleaner::{canonical_name, clean, CleanRecord, CleanStats, DATE_FORMAT};
pub use dataset::{load_dataset, Dataset, DatasetCache, LoadError, SourceStamp};
pub use enrich::{
    categorize_item, enrich, enrich_record, weekday_name, Category, SalesRecord, WEEKDAY_NAMES,
};
pub use loader::{decode_bytes, parse_bytes, RawRow, RawTable, SourceEncoding};
pub use metrics::{
    group_by, highlights, query, FilterSpec, GroupDimension, GroupRow, GroupSort, Highlights,
    QueryResult, SalesMetrics, TypeTotals, CASH_TYPE, CREDIT_TYPE,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
