#![forbid(unsafe_code)]

//! Advanced value counts: frequency tables with rare-value bucketing.
//!
//! A column is counted either on its own or split by a grouping column. Rare
//! groups and categories are folded into `_other`, missing values show up as
//! `_na` unless dropped, and grouped tables gain a `_total` row per group plus
//! an `_all` pseudo-group holding the overall distribution.
//!
//! ```ignore
//! let avc = AdvancedValueCounts::new(&df, "fruit", Some("shop"), AvcConfig::default())?;
//! println!("{}", avc.avc_table()?);
//! ```
//!
//! The stages are public on their own: [`bucket::bucket`] ->
//! [`tabulate::tabulate_grouped`] -> [`summary::add_summaries`] ->
//! [`collapse::collapse_subgroups`] -> [`diff::add_diff_vs_all`].

pub mod avc;
pub mod bucket;
pub mod collapse;
pub mod config;
pub mod diff;
pub mod pipeline;
pub mod summary;
pub mod table;
pub mod tabulate;

use avc_frame::FrameError;
use thiserror::Error;

pub use avc::{AdvancedValueCounts, PlotRow, ViewNotice};
pub use config::{AvcConfig, AvcConfigBuilder, ConfigError, ConfigValue, ConfigWarning};
pub use pipeline::aggregate;
pub use table::{
    ALL_LABEL, Bucket, FrequencyRow, FrequencyTable, GroupKey, MISSING_LABEL, OTHER_LABEL,
    RowKey, RowKind, SubgroupKey, TOTAL_LABEL,
};

#[derive(Debug, Error)]
pub enum AvcError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}
