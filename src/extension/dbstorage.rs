//! Database storage extension.
//!
//! - [`DbStorageFactory`]: registers the `db_storage` type
//! - [`DbStorageConfig`]: driver and datasource settings
//! - [`DbStorage`]: running extension exposing a sqlx pool

mod config;
mod extension;
mod factory;

pub use config::{DbDriver, DbStorageConfig, TYPE_STR};
pub use extension::{DbPool, DbStorage};
pub use factory::DbStorageFactory;
