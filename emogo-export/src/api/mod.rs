//! HTTP API handlers for emogo-export

pub mod buildinfo;
pub mod export;
pub mod health;

pub use buildinfo::get_build_info;
pub use export::{export_json, export_table, export_zip};
pub use health::{health_routes, root};
