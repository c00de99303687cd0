pub mod error;
pub mod fs_store;
pub mod memory;
pub mod models;
pub mod store;

pub use error::*;
pub use fs_store::*;
pub use memory::*;
pub use models::*;
pub use store::*;
