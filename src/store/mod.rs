pub mod json_store;
pub mod kv;
pub mod performance;
pub mod schema;
