// Entity Models
//
// Clients own debts by reference (Debt.client_id); each debt embeds its
// payment and contact history.

pub mod client;
pub mod debt;

pub use client::{Budget, BudgetItem, BudgetSummary, Client, ClientPatch, NewClient};
pub use debt::{today, ContactEntry, Debt, DebtPatch, DebtStatus, NewDebt, Payment};
