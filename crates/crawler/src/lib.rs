pub mod client;
pub mod config;
pub mod error;
pub mod extractor;
pub mod links;
pub mod orchestrator;
pub mod parser;
pub mod rate_limiter;

pub use client::*;
pub use config::*;
pub use error::*;
pub use extractor::*;
pub use links::*;
pub use orchestrator::*;
pub use parser::*;
pub use rate_limiter::*;
