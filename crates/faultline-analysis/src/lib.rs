//! Change analysis, commit/change-set aggregation, and hotspot tracking.
//!
//! For one changed file, [`engine::ChangeAnalyzer`] compares both sides of
//! the change through the accessor and scores the result. The
//! [`aggregate::Aggregator`] folds per-file results into commit and
//! change-set assessments under a bounded worker pool, and
//! [`hotspots::HotspotTracker`] walks a commit range to rank the most
//! volatile files. Everything is freshly derived per request; no state
//! survives a call.

pub mod aggregate;
pub mod engine;
pub mod hotspots;

pub use aggregate::{Aggregator, ChangeSetAnalysis, CommitAnalysis};
pub use engine::{ChangeAnalyzer, FileAnalysis};
pub use hotspots::{Hotspot, HotspotReport, HotspotTracker, ScanOptions, TrendDirection};
