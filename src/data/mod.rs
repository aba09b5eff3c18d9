//! Data source adapter: synthetic generation, remote paging and canonicalization

pub mod hub;
pub mod loader;
pub mod schema;
pub mod synthetic;

pub use hub::{HubRowsClient, RowPage, RowSource};
pub use loader::{DataLoader, DataSource};
pub use schema::{Canonicalizer, ColumnMapping};
pub use synthetic::SyntheticGenerator;
