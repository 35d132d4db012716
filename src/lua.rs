pub mod hooks;
pub mod runtime;
pub mod sandbox;

pub use runtime::PluginEngine;
