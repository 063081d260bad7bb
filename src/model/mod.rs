pub mod config;
pub mod project;
pub mod task;
pub mod tree;

pub use config::*;
pub use project::*;
pub use task::*;
pub use tree::TaskTree;
