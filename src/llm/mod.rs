pub mod client;
pub mod prompts;
#[cfg(test)]
pub mod scripted;

pub use client::*;
pub use prompts::*;
