//! askdb-vector
//!
//! LanceDB-backed `VectorStore` adapter. Each collection maps to one table;
//! the adapter serves nearest-neighbor search, id lookups, and the append
//! path used by ingestion tooling.

pub mod schema;
pub mod store;

pub use store::LanceVectorStore;
