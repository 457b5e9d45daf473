//! Table repositories

pub mod checkpoint;
pub mod session;
