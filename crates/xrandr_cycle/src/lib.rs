#![forbid(unsafe_code)]

pub mod archive;
pub mod cli;
pub mod cycle;
pub mod display;
pub mod error;
pub mod report;
pub mod selector;
pub mod shutter;
pub mod summary;
pub mod util;

pub use cli::{init_tracing, run, run_from_env};
pub use error::{CycleError, Result};
