pub mod config;
pub mod error;
pub mod policy;
pub mod types;

pub use config::*;
pub use error::*;
pub use policy::*;
pub use types::*;
