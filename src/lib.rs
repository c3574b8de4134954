//! Shelf application library
//!
//! Book records service: the books module, its stores, and the bootstrap
//! that wires them into the HTTP server.

#![recursion_limit = "256"]

pub mod app;
pub mod modules;
pub mod utils;

/// Re-export commonly used types
pub use modules::*;
