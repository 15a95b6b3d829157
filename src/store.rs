// 🗂️ Entity Store - clients and debts, keyed by id
//
// Single owner of all records. Every mutation goes through a method here so
// the referential rules (debt → client) and the id counters stay consistent.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::entities::{
    Budget, BudgetItem, Client, ClientPatch, ContactEntry, Debt, DebtPatch, DebtStatus, NewClient,
    NewDebt, Payment,
};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq)]
pub struct EntityStore {
    clients: BTreeMap<u64, Client>,
    debts: BTreeMap<u64, Debt>,
    next_client_id: u64,
    next_debt_id: u64,
}

impl EntityStore {
    /// Create new empty store
    pub fn new() -> Self {
        EntityStore {
            clients: BTreeMap::new(),
            debts: BTreeMap::new(),
            next_client_id: 1,
            next_debt_id: 1,
        }
    }

    /// Store with one demo client and one demo debt (ids 1 and 1)
    pub fn seeded() -> Self {
        let mut store = Self::new();
        for (client, debt) in seed_records() {
            let client_id = store.insert_client(client);
            store.insert_debt(NewDebt { client_id, ..debt });
        }
        store
    }

    /// Rebuild a store from persisted records
    ///
    /// Counters resume after the highest id seen so ids are never handed out twice.
    pub fn from_parts(clients: Vec<Client>, debts: Vec<Debt>) -> Self {
        let next_client_id = clients.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let next_debt_id = debts.iter().map(|d| d.id).max().unwrap_or(0) + 1;

        EntityStore {
            clients: clients.into_iter().map(|c| (c.id, c)).collect(),
            debts: debts.into_iter().map(|d| (d.id, d)).collect(),
            next_client_id,
            next_debt_id,
        }
    }

    /// Move the id counters forward to the persisted values (never backwards)
    pub fn resume_ids(mut self, next_client_id: u64, next_debt_id: u64) -> Self {
        self.next_client_id = self.next_client_id.max(next_client_id);
        self.next_debt_id = self.next_debt_id.max(next_debt_id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty() && self.debts.is_empty()
    }

    /// Next id handed out by `create_client` / `create_debt`
    pub fn next_ids(&self) -> (u64, u64) {
        (self.next_client_id, self.next_debt_id)
    }

    // ========================================================================
    // CLIENTS
    // ========================================================================

    pub fn create_client(&mut self, input: NewClient) -> StoreResult<Client> {
        input.validate()?;
        let id = self.insert_client(input);
        info!(client_id = id, "client created");
        self.get_client(id)
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn list_clients(&self) -> Vec<Client> {
        self.clients.values().cloned().collect()
    }

    pub fn find_client(&self, id: u64) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn get_client(&self, id: u64) -> StoreResult<Client> {
        self.find_client(id)
            .cloned()
            .ok_or_else(|| StoreError::client_not_found(id))
    }

    pub fn update_client(&mut self, id: u64, patch: ClientPatch) -> StoreResult<Client> {
        patch.validate()?;
        let client = self
            .clients
            .get_mut(&id)
            .ok_or_else(|| StoreError::client_not_found(id))?;
        patch.apply(client);
        info!(client_id = id, "client updated");
        Ok(client.clone())
    }

    /// Remove a client. Debts that reference it are left in place.
    pub fn delete_client(&mut self, id: u64) -> StoreResult<Client> {
        let removed = self
            .clients
            .remove(&id)
            .ok_or_else(|| StoreError::client_not_found(id))?;
        let orphaned = self.debts.values().filter(|d| d.client_id == id).count();
        info!(client_id = id, orphaned_debts = orphaned, "client deleted");
        Ok(removed)
    }

    /// Append a dated line to the client's notes
    pub fn append_client_note(&mut self, id: u64, date: NaiveDate, text: &str) -> StoreResult<Client> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::InvalidInput("note must not be empty".to_string()));
        }
        let client = self
            .clients
            .get_mut(&id)
            .ok_or_else(|| StoreError::client_not_found(id))?;

        let line = format!("[{}] {}", date.format("%Y-%m-%d"), text);
        client.notes = Some(match client.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, line),
            _ => line,
        });
        Ok(client.clone())
    }

    /// Household budget of a client (empty budget when none was recorded)
    pub fn client_budget(&self, id: u64) -> StoreResult<Budget> {
        let client = self
            .find_client(id)
            .ok_or_else(|| StoreError::client_not_found(id))?;
        Ok(client.budget.clone().unwrap_or_default())
    }

    // ========================================================================
    // DEBTS
    // ========================================================================

    pub fn create_debt(&mut self, input: NewDebt) -> StoreResult<Debt> {
        input.validate()?;
        if !self.clients.contains_key(&input.client_id) {
            return Err(StoreError::UnknownClient(input.client_id));
        }
        let client_id = input.client_id;
        let id = self.insert_debt(input);
        info!(debt_id = id, client_id, "debt created");
        self.get_debt(id)
    }

    pub fn debts(&self) -> impl Iterator<Item = &Debt> {
        self.debts.values()
    }

    pub fn list_debts(&self) -> Vec<Debt> {
        self.debts.values().cloned().collect()
    }

    pub fn get_debt(&self, id: u64) -> StoreResult<Debt> {
        self.debts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::debt_not_found(id))
    }

    /// Apply a partial update. The resulting client_id must resolve.
    pub fn update_debt(&mut self, id: u64, patch: DebtPatch) -> StoreResult<Debt> {
        patch.validate()?;
        let current_client = self
            .debts
            .get(&id)
            .map(|d| d.client_id)
            .ok_or_else(|| StoreError::debt_not_found(id))?;

        let target_client = patch.client_id.unwrap_or(current_client);
        if !self.clients.contains_key(&target_client) {
            return Err(StoreError::UnknownClient(target_client));
        }

        let debt = self.debt_mut(id)?;
        patch.apply(debt);
        info!(debt_id = id, "debt updated");
        Ok(debt.clone())
    }

    pub fn delete_debt(&mut self, id: u64) -> StoreResult<Debt> {
        let removed = self
            .debts
            .remove(&id)
            .ok_or_else(|| StoreError::debt_not_found(id))?;
        info!(debt_id = id, "debt deleted");
        Ok(removed)
    }

    pub fn list_debts_for_client(&self, client_id: u64) -> StoreResult<Vec<Debt>> {
        if !self.clients.contains_key(&client_id) {
            return Err(StoreError::client_not_found(client_id));
        }
        Ok(self
            .debts
            .values()
            .filter(|d| d.client_id == client_id)
            .cloned()
            .collect())
    }

    /// Validate the raw status string against the fixed set, then apply it
    pub fn update_status(&mut self, debt_id: u64, new_status: &str) -> StoreResult<Debt> {
        let debt = self.debt_mut(debt_id)?;
        let status: DebtStatus = new_status.trim().parse()?;
        let previous = debt.status;
        debt.status = status;
        info!(debt_id, from = %previous, to = %status, "debt status changed");
        Ok(debt.clone())
    }

    // ========================================================================
    // PAYMENT HISTORY
    // ========================================================================

    pub fn add_payment(&mut self, debt_id: u64, payment: Payment) -> StoreResult<Payment> {
        payment.validate()?;
        let debt = self.debt_mut(debt_id)?;
        debt.payment_history.push(payment.clone());
        debug!(debt_id, position = debt.payment_history.len() - 1, "payment added");
        Ok(payment)
    }

    pub fn list_payments(&self, debt_id: u64) -> StoreResult<Vec<Payment>> {
        self.debts
            .get(&debt_id)
            .map(|d| d.payment_history.clone())
            .ok_or_else(|| StoreError::debt_not_found(debt_id))
    }

    /// Remove and return the payment at `index`
    pub fn delete_payment(&mut self, debt_id: u64, index: i64) -> StoreResult<Payment> {
        let debt = self.debt_mut(debt_id)?;
        let position = checked_index(index, debt.payment_history.len(), "payment")?;
        let removed = debt.payment_history.remove(position);
        debug!(debt_id, position, "payment removed");
        Ok(removed)
    }

    // ========================================================================
    // CONTACT HISTORY
    // ========================================================================

    /// Append a contact and move the owning client's last_contact_date to it
    pub fn add_contact(&mut self, debt_id: u64, contact: ContactEntry) -> StoreResult<ContactEntry> {
        let debt = self.debt_mut(debt_id)?;
        debt.contact_history.push(contact.clone());
        let client_id = debt.client_id;

        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_contact_date = Some(contact.date);
        }
        debug!(debt_id, client_id, "contact added");
        Ok(contact)
    }

    pub fn list_contacts(&self, debt_id: u64) -> StoreResult<Vec<ContactEntry>> {
        self.debts
            .get(&debt_id)
            .map(|d| d.contact_history.clone())
            .ok_or_else(|| StoreError::debt_not_found(debt_id))
    }

    pub fn delete_contact(&mut self, debt_id: u64, index: i64) -> StoreResult<ContactEntry> {
        let debt = self.debt_mut(debt_id)?;
        let position = checked_index(index, debt.contact_history.len(), "contact")?;
        let removed = debt.contact_history.remove(position);
        debug!(debt_id, position, "contact removed");
        Ok(removed)
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn debt_mut(&mut self, id: u64) -> StoreResult<&mut Debt> {
        self.debts
            .get_mut(&id)
            .ok_or_else(|| StoreError::debt_not_found(id))
    }

    fn insert_client(&mut self, input: NewClient) -> u64 {
        let id = self.next_client_id;
        self.next_client_id += 1;
        self.clients.insert(id, input.into_client(id));
        id
    }

    fn insert_debt(&mut self, input: NewDebt) -> u64 {
        let id = self.next_debt_id;
        self.next_debt_id += 1;
        self.debts.insert(id, input.into_debt(id));
        id
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

fn checked_index(index: i64, len: usize, entity: &'static str) -> StoreResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(StoreError::IndexOutOfRange { entity, index })
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Demo data loaded by `EntityStore::seeded`
fn seed_records() -> Vec<(NewClient, NewDebt)> {
    let client = NewClient {
        name: "John Doe".to_string(),
        email: "john@example.com".to_string(),
        phone: "0612345678".to_string(),
        address: Some("Hoofdstraat 1".to_string()),
        postal_code: Some("1234 AB".to_string()),
        city: Some("Amsterdam".to_string()),
        notes: Some("First intake meeting held on 15 January 2025.".to_string()),
        last_contact_date: date(2025, 1, 15),
        budget: Some(Budget {
            income_items: vec![BudgetItem {
                category: "income".to_string(),
                description: "Salary".to_string(),
                amount: 2100.0,
                frequency: "monthly".to_string(),
            }],
            expense_items: vec![BudgetItem {
                category: "fixed_costs".to_string(),
                description: "Rent".to_string(),
                amount: 850.0,
                frequency: "monthly".to_string(),
            }],
        }),
    };

    let debt = NewDebt {
        client_id: 0,
        creditor: "Bank XYZ".to_string(),
        amount: 5000.0,
        interest_rate: Some(4.5),
        start_date: date(2025, 1, 1),
        end_date: date(2026, 1, 1),
        payment_frequency: Some("monthly".to_string()),
        notes: Some("Personal loan".to_string()),
        status: DebtStatus::Active,
        payment_history: vec![Payment {
            payment_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap_or_default(),
            amount: 150.0,
            payment_method: "bank".to_string(),
            is_confirmed: true,
            notes: Some("First instalment paid".to_string()),
        }],
        contact_history: vec![ContactEntry {
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap_or_default(),
            contact_type: "phone".to_string(),
            notes: "Called about a payment arrangement".to_string(),
            outcome: Some("Payment arrangement accepted".to_string()),
            follow_up_date: date(2025, 2, 10),
        }],
        next_payment_date: date(2025, 2, 15),
        payment_arrangement: Some("150 per month for 36 months".to_string()),
    };

    vec![(client, debt)]
}

// ============================================================================
// TESTS
// ============================================================================
