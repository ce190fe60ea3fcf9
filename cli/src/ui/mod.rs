//! UI utilities for terminal output.

mod instructions;

pub use instructions::{collapse_home, print_instructions};
