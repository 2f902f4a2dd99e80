pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod table;

// Table algorithms
pub mod dedup;
pub mod fill;
pub mod reconcile;
pub mod report;
pub mod unescape;
pub mod validate;

// Project maintenance
pub mod lua_patch;
pub mod repos;
pub mod sync;

pub mod tasks;

pub use config::Config;
pub use error::{LocError, Result};
