//! Process-wide shared connection handle

pub mod handle;

pub use handle::SharedRealtime;
