pub mod error;
pub mod heuristics;
pub mod io;
pub mod models;
pub mod stages;

pub use error::ConsolidaError;
pub use heuristics::{score_records, score_response, ScoringSummary, SentimentConfig};
pub use io::{
    detect_table, read_consolidated, read_table_robust, write_consolidated, DashboardReport,
    DetectedTable, Delimiter, ReaderConfig, TextEncoding,
};
pub use models::{
    default_sources, load_manifest, CanonicalField, CanonicalRecord, RawTable, ReportFilter, Score,
    SourceSpec,
};
pub use stages::{
    build_report, consolidate, execute_report, inspect_sources, normalize_columns,
    ConsolidateConfig, ConsolidationResult, SourceOutcome,
};
