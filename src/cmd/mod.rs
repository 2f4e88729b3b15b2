//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `plan`   | `Plan`           |
//! | `check`  | `Check`          |
//! | `config` | `Config`         |

pub mod check;
pub mod config;
pub mod plan;

pub use check::cmd_check;
pub use config::cmd_config;
pub use plan::cmd_plan;
