//! Domain layer for the signing service.

pub mod entities;
pub mod errors;

pub use entities::SignatureBlock;
pub use errors::SignatureError;
