//! Data models for the client
//!
//! Wire shapes follow the gateway's JSON contract; [`FileRecord`] additionally
//! tracks whether a record is a local placeholder.

mod file;
mod share;
mod transfer;

pub use file::*;
pub use share::*;
pub use transfer::*;
