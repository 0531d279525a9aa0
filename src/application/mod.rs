// Application layer: the ledger service (store + conversion at write
// time) and the pure reporting functions the CLI renders.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use service::*;
