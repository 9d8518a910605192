pub mod attempt;
pub mod document;
pub mod research;
pub mod topic;
pub mod verdict;

pub use attempt::*;
pub use document::*;
pub use research::*;
pub use topic::*;
pub use verdict::*;
