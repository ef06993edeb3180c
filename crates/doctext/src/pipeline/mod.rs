pub mod config;
pub mod runner;

pub use config::{Backends, PipelineConfig};
pub use runner::{IngestOutcome, Pipeline};
