pub mod config;
pub mod error;
pub mod outcome;
pub mod runner;
pub mod stages;

pub use config::*;
pub use error::*;
pub use outcome::*;
pub use runner::*;
