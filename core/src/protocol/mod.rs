//! Wire-level constants and messages

pub mod constants;
mod info;

pub use info::InfoResponse;
