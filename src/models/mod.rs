//! Data models for the drug catalog backend.
//!
//! Field names follow the documents kept in the remote store (camelCase JSON).

mod audit;
mod drug;
mod import;
mod page;

pub use audit::*;
pub use drug::*;
pub use import::*;
pub use page::*;
