//! Core types, configuration, and error handling for the Faultline pipeline.
//!
//! This crate provides the shared foundation used by all other Faultline crates:
//! - [`FaultlineError`] / [`GitError`] — unified error types using `thiserror`,
//!   with machine-stable codes for every git failure
//! - [`FaultlineConfig`] — configuration loaded from `.faultline.toml`
//! - Shared value types: [`ComplexityMetrics`], [`TokenStats`],
//!   [`FileChangeRecord`], [`ChangeType`], [`ImpactLevel`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{AnalysisConfig, FaultlineConfig, GitConfig, HotspotConfig};
pub use error::{FaultlineError, GitError, GitErrorCode};
pub use types::{
    ChangeType, ComplexityMetrics, FileChangeRecord, ImpactLevel, OutputFormat, TokenStats,
};

/// A convenience `Result` type for Faultline operations.
pub type Result<T> = std::result::Result<T, FaultlineError>;
