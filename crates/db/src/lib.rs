pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod snapshot;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{RoleSeedDataset, SeedResult, VerificationResult};
pub use snapshot::{load_purchase_request_store, load_role_snapshot};
