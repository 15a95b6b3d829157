// FinFit Debt Management - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod entities;
pub mod error;
pub mod store;
pub mod statistics;
pub mod db;
pub mod config;
pub mod logging;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use entities::{
    Budget, BudgetItem, BudgetSummary, Client, ClientPatch, ContactEntry, Debt, DebtPatch,
    DebtStatus, NewClient, NewDebt, Payment,
};
pub use error::{StoreError, StoreResult};
pub use store::EntityStore;
pub use statistics::{RecentPayment, Statistics};
pub use db::{count_clients, load_store, open_database, save_store, setup_database};
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
