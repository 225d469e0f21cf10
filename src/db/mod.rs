//! Database module for the validator_state store
//!
//! - `schema`: table DDL, pragmas and identifier validation
//! - `reader`: the [`RecordSource`] trait and its SQLite implementation
//! - `writer`: batched inserts for registering and seeding records

pub mod reader;
pub mod schema;
pub mod writer;

pub use reader::{RecordSource, SqliteStore};
pub use schema::{create_order_index, create_table, DEFAULT_TABLE};
pub use writer::{insert_batched, insert_records, register_attestation};
