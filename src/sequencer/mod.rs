pub mod functional;
pub mod pipeline;
pub mod qc;
pub mod runner;

pub use functional::run_functional;
pub use pipeline::{PipelineOptions, RunMode, run_pipeline};
pub use qc::run_qc;
pub use runner::StageRunner;
