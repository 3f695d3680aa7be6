//! `cb-domain`: types shared by every Combiner SDK crate: the error
//! enum, the TOML configuration model, and structured trace events.

pub mod config;
pub mod error;
pub mod trace;

pub use config::CombinerConfig;
pub use error::{Error, Result};
pub use trace::TraceEvent;
