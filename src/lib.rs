//! # segscan
//!
//! A scan engine for immutable columnar segment files. Each file divides into
//! row groups carrying per-column min/max statistics, so predicates prune
//! whole groups before any data bytes are touched. One of four execution
//! strategies streams the surviving rows to the caller, including a k-way
//! sorted merge with a hard bound on simultaneously open file handles.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use segscan::{
//!     CompareOp, ExecState, FilterCounters, LocalSource, OutputLayout, Predicate,
//!     ReadOutcome, Record, ScanConfig, ScanPlan, Value, ColumnType,
//! };
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! let source = Arc::new(LocalSource::new());
//! let predicate = Predicate::bind("k", CompareOp::Ge, Value::Int64(5), ColumnType::Int64).unwrap();
//! let counters = FilterCounters::default();
//! let files = segscan::prune(
//!     source.as_ref(),
//!     &[PathBuf::from("a.seg"), PathBuf::from("b.seg")],
//!     &[predicate],
//!     &counters,
//! ).unwrap();
//!
//! let plan = ScanPlan::sorted(files, OutputLayout::typed(vec!["k".into()]), vec!["k".into()]);
//! let mut state = ExecState::build(source, plan, &ScanConfig::default(), None, None).unwrap();
//! let mut record = Record::new();
//! while let ReadOutcome::Success = state.next(&mut record).unwrap() {
//!     println!("{}", record.values[0]);
//! }
//! ```

// Internal modules
pub mod config;
pub mod coordinator;
pub mod error;
pub mod exec;
pub mod filter;
pub mod handle_cache;
pub mod reader;
pub mod segment;
pub mod value;

// Public API - main types callers need
pub use config::{MatchedFile, OutputLayout, ScanConfig, ScanPlan};
pub use coordinator::ParallelCoordinator;
pub use error::{ScanError, ScanResult};
pub use exec::ExecState;
pub use filter::{prune, CompareOp, FilterCounters, Predicate};
pub use handle_cache::HandleCache;
pub use reader::{ReadOutcome, Record};
pub use segment::{
    ColumnMeta, ColumnStats, LocalSource, SegmentBuilder, SegmentHandle, SegmentMeta,
    SegmentSource,
};
pub use value::{ColumnType, Value};
