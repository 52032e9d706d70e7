pub mod client;
pub mod models;

#[cfg(test)]
pub mod testing;

pub use client::{BalanceLedger, StripeClient};
