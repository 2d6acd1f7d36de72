//! Kernel of the shelf application: layered settings, the `Module` trait,
//! and the registry that drives module lifecycle.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Module};
pub use registry::ModuleRegistry;
pub use shelf_db::Migration;
