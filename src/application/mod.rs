// Application layer: the ledger transformer and the conversion use case.

pub mod error;
pub mod service;
pub mod transformer;

pub use error::*;
pub use service::*;
pub use transformer::*;
