//! Adapters: the Koopman checksum and the async stream transport.

mod checksum;
pub mod transport;

pub use checksum::KoopmanChecksum;
pub use transport::{CloseHandle, TransportConfig, WireReader, WireTransport, WireWriter};
