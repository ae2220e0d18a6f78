pub mod db;
mod files;
pub mod models;
pub mod repo;
mod tables;

pub use db::{Database, DatabaseError};
pub use repo::{page_offset, MetadataStore};
pub use tables::*;
