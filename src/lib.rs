pub mod config;
pub mod errors;
pub mod files;
pub mod job;
pub mod logging;
pub mod pipeline_config;
pub mod queue;
pub mod sequencer;
pub mod stage;
pub mod subject;
