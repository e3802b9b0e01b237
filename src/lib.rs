pub mod cli;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

pub use cli::{Cli, Commands};
pub use error::{ErrorKind, PipelineError};
pub use models::Config;
pub use services::{IngestInput, IngestReport, Pipeline};
