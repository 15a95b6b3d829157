// 📊 Statistics Aggregator - summary metrics derived from the store on demand

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::store::EntityStore;

/// How many payments `recent_payments` keeps
pub const RECENT_PAYMENTS_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_clients: usize,
    pub total_debts: usize,
    pub total_debt_amount: f64,
    /// total_debt_amount / total_debts, 0 when there are no debts
    pub average_debt_amount: f64,
    /// Sum of confirmed payments across all debts
    pub total_paid_amount: f64,
    pub status_breakdown: BTreeMap<String, usize>,
    pub recent_payments: Vec<RecentPayment>,
}

/// A payment flattened together with the debt and client it belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentPayment {
    pub debt_id: u64,
    pub client_id: u64,
    /// None when the owning client has been deleted
    pub client_name: Option<String>,
    pub creditor: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub is_confirmed: bool,
}

impl Statistics {
    pub fn collect(store: &EntityStore) -> Self {
        let total_clients = store.clients().count();
        let total_debts = store.debts().count();
        let total_debt_amount: f64 = store.debts().map(|d| d.amount).sum();
        let average_debt_amount = if total_debts > 0 {
            total_debt_amount / total_debts as f64
        } else {
            0.0
        };
        let total_paid_amount: f64 = store.debts().map(|d| d.total_paid()).sum();

        let mut status_breakdown: BTreeMap<String, usize> = BTreeMap::new();
        for debt in store.debts() {
            *status_breakdown.entry(debt.status.to_string()).or_insert(0) += 1;
        }

        let mut recent_payments: Vec<RecentPayment> = store
            .debts()
            .flat_map(|debt| {
                let client_name = store.find_client(debt.client_id).map(|c| c.name.clone());
                debt.payment_history.iter().map(move |payment| RecentPayment {
                    debt_id: debt.id,
                    client_id: debt.client_id,
                    client_name: client_name.clone(),
                    creditor: debt.creditor.clone(),
                    amount: payment.amount,
                    date: payment.payment_date,
                    is_confirmed: payment.is_confirmed,
                })
            })
            .collect();

        // Stable: equal dates keep debt/history order
        recent_payments.sort_by(|a, b| b.date.cmp(&a.date));
        recent_payments.truncate(RECENT_PAYMENTS_LIMIT);

        Statistics {
            total_clients,
            total_debts,
            total_debt_amount,
            average_debt_amount,
            total_paid_amount,
            status_breakdown,
            recent_payments,
        }
    }
}
