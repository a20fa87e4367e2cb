//! Common types and capability ports shared across Aura crates
//!
//! The core never touches hardware or the OS clock directly. Everything
//! platform-specific enters through the small port traits defined here and
//! is injected at construction time.

pub mod ports;
pub mod types;

#[cfg(feature = "mock")]
pub mod mock;

pub use ports::*;
pub use types::*;
