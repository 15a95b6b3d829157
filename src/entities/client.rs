// 👤 Client Entity - the person whose debts are being managed
//
// A client owns zero or more debts (by reference via Debt.client_id) and may
// carry an embedded household budget.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{StoreError, StoreResult};

// ============================================================================
// BUDGET
// ============================================================================

/// One line of a household budget (income or expense)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetItem {
    /// Free-form category, e.g. "income", "fixed_costs", "groceries"
    pub category: String,
    pub description: String,
    pub amount: f64,
    /// "weekly", "monthly", "quarterly", "yearly"
    pub frequency: String,
}

impl BudgetItem {
    /// Amount normalized to one month
    ///
    /// Unknown frequencies are treated as monthly.
    pub fn monthly_amount(&self) -> f64 {
        match self.frequency.to_lowercase().as_str() {
            "weekly" => self.amount * 52.0 / 12.0,
            "quarterly" => self.amount / 3.0,
            "yearly" | "annual" | "annually" => self.amount / 12.0,
            _ => self.amount,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default)]
    pub income_items: Vec<BudgetItem>,
    #[serde(default)]
    pub expense_items: Vec<BudgetItem>,
}

/// Monthly view over a client's budget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    /// income - expenses (negative means the household runs a deficit)
    pub monthly_balance: f64,
}

impl Budget {
    pub fn summary(&self) -> BudgetSummary {
        let monthly_income: f64 = self.income_items.iter().map(BudgetItem::monthly_amount).sum();
        let monthly_expenses: f64 = self.expense_items.iter().map(BudgetItem::monthly_amount).sum();

        BudgetSummary {
            monthly_income,
            monthly_expenses,
            monthly_balance: monthly_income - monthly_expenses,
        }
    }

    fn validate(&self) -> StoreResult<()> {
        let all_items = self.income_items.iter().chain(self.expense_items.iter());
        for item in all_items {
            if !item.amount.is_finite() {
                return Err(StoreError::InvalidInput(format!(
                    "budget item '{}' has a non-finite amount",
                    item.description
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// CLIENT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Assigned by the store, never reused
    pub id: u64,

    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,

    /// Free-form case notes
    pub notes: Option<String>,

    /// Updated whenever a contact is logged on one of the client's debts
    pub last_contact_date: Option<NaiveDate>,

    pub budget: Option<Budget>,
}

/// Body of a client creation request
#[derive(Debug, Clone, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub last_contact_date: Option<NaiveDate>,
    #[serde(default)]
    pub budget: Option<Budget>,
}

impl NewClient {
    pub fn validate(&self) -> StoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(StoreError::InvalidInput("name must not be empty".to_string()));
        }
        if let Some(budget) = &self.budget {
            budget.validate()?;
        }
        Ok(())
    }

    pub(crate) fn into_client(self, id: u64) -> Client {
        Client {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            postal_code: self.postal_code,
            city: self.city,
            notes: self.notes,
            last_contact_date: self.last_contact_date,
            budget: self.budget,
        }
    }
}

// ============================================================================
// PARTIAL UPDATE
// ============================================================================

/// Partial update: only fields present in the request body are applied.
///
/// Optional attributes use `Option<Option<T>>` so that an explicit `null`
/// clears the value while an absent key leaves it untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub postal_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub last_contact_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present")]
    pub budget: Option<Option<Budget>>,
}

impl ClientPatch {
    pub fn validate(&self) -> StoreResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(StoreError::InvalidInput("name must not be empty".to_string()));
            }
        }
        if let Some(Some(budget)) = &self.budget {
            budget.validate()?;
        }
        Ok(())
    }

    pub fn apply(self, client: &mut Client) {
        if let Some(name) = self.name {
            client.name = name;
        }
        if let Some(email) = self.email {
            client.email = email;
        }
        if let Some(phone) = self.phone {
            client.phone = phone;
        }
        if let Some(address) = self.address {
            client.address = address;
        }
        if let Some(postal_code) = self.postal_code {
            client.postal_code = postal_code;
        }
        if let Some(city) = self.city {
            client.city = city;
        }
        if let Some(notes) = self.notes {
            client.notes = notes;
        }
        if let Some(last_contact_date) = self.last_contact_date {
            client.last_contact_date = last_contact_date;
        }
        if let Some(budget) = self.budget {
            client.budget = budget;
        }
    }
}

/// Marks a key as present even when its value is `null`
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================================================
// TESTS
// ============================================================================
