// Tools module - tool selection models and the runtimes some tools need before a run

pub mod code_interpreter;
pub mod models;
pub mod registry;

pub use code_interpreter::CodeInterpreter;
pub use models::*;
pub use registry::*;
