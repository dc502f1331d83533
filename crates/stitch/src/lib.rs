pub mod combine;
pub mod config;
pub mod dirs;
pub mod discovery;
pub mod emit;
pub mod module;
pub mod module_graph;
pub mod orchestrator;
pub mod runtime;
pub mod transform;
pub mod util;

pub use config::Config;
pub use module::{Module, ModuleId};
pub use orchestrator::BundleOrchestrator;
