//! # Node Runtime
//!
//! Assembles a federation node from the library crates:
//!
//! - `container/` - configuration and node state construction
//! - `adapters/` - TCP peers and storage backends
//! - `handlers/` - event reporter and block ticker
//! - `runtime` - startup and graceful shutdown
//!
//! ```text
//!  peers ──► fc-01 wire ──► fc-05 dispatch ──► fc-04 messages ──► fc-03 ledger
//!    ▲                           │
//!    └──────── broadcast ◄───────┘          shared-bus ──► event reporter
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod logging;
pub mod runtime;

pub use container::{ConfigError, NodeConfig, NodeContainer};
pub use logging::init_logging;
pub use runtime::{NodeRuntime, RunningNode};
