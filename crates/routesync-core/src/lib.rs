//! # routesync-core
//!
//! Core types and pure helpers for routesync: the error type, environment
//! configuration, route/dispatch models, and the tag/code/date normalizers
//! the backfill jobs are built on.

pub mod codes;
pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod tags;

// Re-export commonly used types at crate root
pub use codes::{code_variants, normalize_code};
pub use config::Config;
pub use dates::normalize_promise_date;
pub use error::{Error, Result};
pub use models::{
    DispatchClosure, DispatchCode, DispatchTags, DispatchUpsert, Route, RouteUpsert,
    SubstatusMapping, UnfinishedDispatch,
};
pub use tags::{extract_tag, extract_tag_str, TagSelector, CODCOMU, FECSOLDES, TIPO_ORDEN};
