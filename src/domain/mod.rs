mod date;
mod ledger;
mod metadata;
mod money;
mod transaction;

pub use date::*;
pub use ledger::*;
pub use metadata::*;
pub use money::*;
pub use transaction::*;
