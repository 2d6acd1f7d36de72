//! Shelf application library
//!
//! Wires the book catalog module into the kernel registry and exposes the
//! [`App`] lifecycle used by the binaries.

pub mod app;
pub mod modules;

pub use app::App;
