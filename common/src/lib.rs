mod db;
mod error;
mod helpers;
mod ledger;
mod memory;
mod schema;

pub use db::*;
pub use error::*;
pub use helpers::*;
pub use ledger::*;
pub use memory::*;
pub use schema::*;
