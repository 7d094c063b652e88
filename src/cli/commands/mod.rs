//! CLI command implementations.

mod config;
mod dialogue;
mod serve;
mod topics;

pub use config::run_config;
pub use dialogue::run_dialogue;
pub use serve::run_serve;
pub use topics::run_topics;
