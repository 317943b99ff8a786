//! CLI command implementations.
//!
//! | Module   | Commands handled               |
//! |----------|--------------------------------|
//! | `run`    | `Run`, `Functional`, `Qc`      |
//! | `stages` | `Stages`                       |
//! | `config` | `Config`                       |

pub mod config;
pub mod run;
pub mod stages;

pub use config::cmd_config;
pub use run::{cmd_functional, cmd_qc, cmd_run};
pub use stages::cmd_stages;
