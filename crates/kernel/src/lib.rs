//! Staybook kernel: settings, the module lifecycle, and the domain model shared
//! by every other crate.

pub mod clock;
pub mod error;
pub mod model;
pub mod module;
pub mod registry;
pub mod repository;
pub mod settings;

pub use module::{InitCtx, Module};
pub use registry::ModuleRegistry;
