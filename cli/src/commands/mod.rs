//! CLI command implementations.

mod info;
mod join;

pub use info::show_info;
pub use join::{join_clipboard, JoinOptions};
