//! Dispatching core for a model railway: block and turnout reservation
//! records, deadlock lookahead, and the scheduler that assigns routes to
//! trains.

pub mod batch;
pub mod blocks;
pub mod codec;
pub mod deadlock;
pub mod error;
pub mod layout;
pub mod plan;
pub mod raw_layout;
pub mod record;
pub mod route;
pub mod scheduler;
pub mod sim;
pub mod table;
pub mod track;
pub mod turnouts;


pub use error::{Error, InvariantViolation, Result};
