pub mod orchestrator;
pub mod postprocess;
pub mod recipe;
pub mod runner;

pub use orchestrator::*;
pub use postprocess::*;
pub use recipe::*;
pub use runner::*;
