// 💶 Debt Entity - one obligation of a client towards a creditor
//
// A debt embeds its own payment and contact history. Entries in those
// histories have no id of their own: they are addressed by position.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::client::present;
use crate::error::{StoreError, StoreResult};

/// Calendar date of "now", used for payment/contact defaults
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ============================================================================
// DEBT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    /// Being paid off (or about to be)
    #[default]
    Active,

    /// Fully settled
    Paid,

    /// Payment arrangement under negotiation with the creditor
    Negotiating,

    /// Client stopped paying
    Defaulted,

    /// Amount or validity contested
    Dispute,

    /// Handed over to a bailiff or court
    Legal,
}

impl DebtStatus {
    pub const ALL: [DebtStatus; 6] = [
        DebtStatus::Active,
        DebtStatus::Paid,
        DebtStatus::Negotiating,
        DebtStatus::Defaulted,
        DebtStatus::Dispute,
        DebtStatus::Legal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DebtStatus::Active => "active",
            DebtStatus::Paid => "paid",
            DebtStatus::Negotiating => "negotiating",
            DebtStatus::Defaulted => "defaulted",
            DebtStatus::Dispute => "dispute",
            DebtStatus::Legal => "legal",
        }
    }

    /// "active, paid, ..." for error messages
    pub fn valid_values() -> String {
        Self::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for DebtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DebtStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StoreError::InvalidStatus(s.to_string()))
    }
}

// ============================================================================
// PAYMENT & CONTACT ENTRIES
// ============================================================================

/// A payment made towards a debt. Appended or removed, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default = "today")]
    pub payment_date: NaiveDate,
    pub amount: f64,
    /// "bank", "cash", "automatic", ...
    pub payment_method: String,
    #[serde(default)]
    pub is_confirmed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Payment {
    pub fn validate(&self) -> StoreResult<()> {
        validate_amount("payment amount", self.amount)
    }
}

/// A logged interaction with the client or creditor about a debt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactEntry {
    #[serde(default = "today")]
    pub date: NaiveDate,
    /// "phone", "email", "in_person", ...
    pub contact_type: String,
    pub notes: String,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
}

// ============================================================================
// DEBT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub id: u64,

    /// Foreign key to Client.id
    pub client_id: u64,

    pub creditor: String,
    pub amount: f64,
    pub interest_rate: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// "monthly", "weekly", "yearly", "one-time"
    pub payment_frequency: Option<String>,
    pub notes: Option<String>,
    pub status: DebtStatus,

    pub payment_history: Vec<Payment>,
    pub contact_history: Vec<ContactEntry>,

    pub next_payment_date: Option<NaiveDate>,
    /// Human description of the agreed arrangement, e.g. "150 per month for 36 months"
    pub payment_arrangement: Option<String>,
}

impl Debt {
    /// Sum of confirmed payments
    pub fn total_paid(&self) -> f64 {
        self.payment_history
            .iter()
            .filter(|p| p.is_confirmed)
            .map(|p| p.amount)
            .sum()
    }

    /// Outstanding principal, never below zero
    pub fn remaining_balance(&self) -> f64 {
        (self.amount - self.total_paid()).max(0.0)
    }
}

/// Body of a debt creation request
#[derive(Debug, Clone, Deserialize)]
pub struct NewDebt {
    pub client_id: u64,
    pub creditor: String,
    pub amount: f64,
    #[serde(default)]
    pub interest_rate: Option<f64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_frequency: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: DebtStatus,
    #[serde(default)]
    pub payment_history: Vec<Payment>,
    #[serde(default)]
    pub contact_history: Vec<ContactEntry>,
    #[serde(default)]
    pub next_payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_arrangement: Option<String>,
}

impl NewDebt {
    pub fn validate(&self) -> StoreResult<()> {
        if self.creditor.trim().is_empty() {
            return Err(StoreError::InvalidInput("creditor must not be empty".to_string()));
        }
        validate_amount("amount", self.amount)?;
        for payment in &self.payment_history {
            payment.validate()?;
        }
        Ok(())
    }

    pub(crate) fn into_debt(self, id: u64) -> Debt {
        Debt {
            id,
            client_id: self.client_id,
            creditor: self.creditor,
            amount: self.amount,
            interest_rate: self.interest_rate,
            start_date: self.start_date,
            end_date: self.end_date,
            payment_frequency: self.payment_frequency,
            notes: self.notes,
            status: self.status,
            payment_history: self.payment_history,
            contact_history: self.contact_history,
            next_payment_date: self.next_payment_date,
            payment_arrangement: self.payment_arrangement,
        }
    }
}

// ============================================================================
// PARTIAL UPDATE
// ============================================================================

/// Partial update of a debt.
///
/// A `payment_history` or `contact_history` key replaces that history
/// wholesale; leaving it out keeps the existing entries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DebtPatch {
    #[serde(default)]
    pub client_id: Option<u64>,
    #[serde(default)]
    pub creditor: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "present")]
    pub interest_rate: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present")]
    pub payment_frequency: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<DebtStatus>,
    #[serde(default, deserialize_with = "present")]
    pub next_payment_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present")]
    pub payment_arrangement: Option<Option<String>>,
    #[serde(default)]
    pub payment_history: Option<Vec<Payment>>,
    #[serde(default)]
    pub contact_history: Option<Vec<ContactEntry>>,
}

impl DebtPatch {
    pub fn validate(&self) -> StoreResult<()> {
        if let Some(creditor) = &self.creditor {
            if creditor.trim().is_empty() {
                return Err(StoreError::InvalidInput("creditor must not be empty".to_string()));
            }
        }
        if let Some(amount) = self.amount {
            validate_amount("amount", amount)?;
        }
        for payment in self.payment_history.iter().flatten() {
            payment.validate()?;
        }
        Ok(())
    }

    pub fn apply(self, debt: &mut Debt) {
        if let Some(client_id) = self.client_id {
            debt.client_id = client_id;
        }
        if let Some(creditor) = self.creditor {
            debt.creditor = creditor;
        }
        if let Some(amount) = self.amount {
            debt.amount = amount;
        }
        if let Some(interest_rate) = self.interest_rate {
            debt.interest_rate = interest_rate;
        }
        if let Some(start_date) = self.start_date {
            debt.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            debt.end_date = end_date;
        }
        if let Some(payment_frequency) = self.payment_frequency {
            debt.payment_frequency = payment_frequency;
        }
        if let Some(notes) = self.notes {
            debt.notes = notes;
        }
        if let Some(status) = self.status {
            debt.status = status;
        }
        if let Some(next_payment_date) = self.next_payment_date {
            debt.next_payment_date = next_payment_date;
        }
        if let Some(payment_arrangement) = self.payment_arrangement {
            debt.payment_arrangement = payment_arrangement;
        }
        if let Some(payment_history) = self.payment_history {
            debt.payment_history = payment_history;
        }
        if let Some(contact_history) = self.contact_history {
            debt.contact_history = contact_history;
        }
    }
}

fn validate_amount(field: &str, amount: f64) -> StoreResult<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(StoreError::InvalidInput(format!(
            "{} must be a non-negative number, got {}",
            field, amount
        )));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
