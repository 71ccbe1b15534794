//! # FedChain Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (wire codec, signatures)
//! └── src/
//!     ├── fixtures.rs   # Shared federation fixture
//!     └── integration/  # Cross-crate flows
//!         ├── pipeline.rs   # wire -> dispatcher -> ledger, in memory
//!         └── two_node.rs   # two runtimes over loopback TCP
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p fc-tests
//! cargo test -p fc-tests integration::two_node
//! cargo bench -p fc-tests
//! ```

pub mod fixtures;
pub mod integration;
