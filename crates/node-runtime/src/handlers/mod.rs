//! # Runtime Handlers
//!
//! Long-running tasks that sit beside the dispatcher.

pub mod block_ticker;
pub mod event_reporter;

pub use block_ticker::BlockTicker;
pub use event_reporter::EventReporter;
