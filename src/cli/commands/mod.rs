mod collections;
mod config;
mod ingest;
mod provider;
mod search;
mod serve;

pub use collections::DeleteArgs;
pub use config::ConfigCommand;
pub use ingest::IngestArgs;
pub use provider::ProviderArgs;
pub use search::SearchArgs;

pub use collections::{handle_collections, handle_delete};
pub use config::handle_config;
pub use ingest::handle_ingest;
pub use search::handle_search;
pub use serve::handle_serve;
