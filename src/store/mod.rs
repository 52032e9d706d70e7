pub mod models;
pub mod repository;

#[cfg(test)]
pub mod memory;

pub use models::{PayoutSummary, PendingPayout};
pub use repository::{PgSummaryStore, SummaryStore};
