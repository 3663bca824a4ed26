//! Marketline - Marketplace Real-Time Client
//!
//! This crate ties the marketplace application's binaries to the
//! `liveline` connection client.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (env config, runners)
//! - **liveline**: Resilient real-time connection client (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use marketline::bin_common::{load_from_env, EnvSetting};
//! use marketline::liveline::SharedRealtime;
//! ```

// Re-export workspace libraries for convenience
pub use liveline;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables
    //!
    //! Provides shared functionality for the presentation layer (binaries).

    pub mod cli;
    pub mod runner;

    pub use cli::{load_from_env, EnvSetting};
    pub use runner::{RunConfig, ShutdownManager};
}
