// 💾 SQLite persistence - durable snapshot of the entity store
//
// The store stays the source of truth while the process runs; after every
// successful mutation the whole store is written back in one transaction.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tracing::debug;

use crate::entities::{Budget, Client, ContactEntry, Debt, DebtStatus, Payment};
use crate::store::EntityStore;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Clients (budget kept as JSON text)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS clients (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            address TEXT,
            postal_code TEXT,
            city TEXT,
            notes TEXT,
            last_contact_date TEXT,
            budget TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Debts
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS debts (
            id INTEGER PRIMARY KEY,
            client_id INTEGER NOT NULL REFERENCES clients(id),
            creditor TEXT NOT NULL,
            amount REAL NOT NULL,
            interest_rate REAL,
            start_date TEXT,
            end_date TEXT,
            payment_frequency TEXT,
            notes TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            next_payment_date TEXT,
            payment_arrangement TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Payment and contact history (ordered by position within a debt)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            debt_id INTEGER NOT NULL REFERENCES debts(id),
            position INTEGER NOT NULL,
            payment_date TEXT NOT NULL,
            amount REAL NOT NULL,
            payment_method TEXT NOT NULL,
            is_confirmed INTEGER NOT NULL DEFAULT 0,
            notes TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            debt_id INTEGER NOT NULL REFERENCES debts(id),
            position INTEGER NOT NULL,
            date TEXT NOT NULL,
            contact_type TEXT NOT NULL,
            notes TEXT NOT NULL,
            outcome TEXT,
            follow_up_date TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Id counters (survive deletion of the highest id)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS store_meta (
            key TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_debts_client ON debts(client_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_payments_debt ON payments(debt_id, position)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_contacts_debt ON contacts(debt_id, position)",
        [],
    )?;

    Ok(())
}

/// Replace the persisted snapshot with the current store contents
pub fn save_store(conn: &mut Connection, store: &EntityStore) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM contacts", [])?;
    tx.execute("DELETE FROM payments", [])?;
    tx.execute("DELETE FROM debts", [])?;
    tx.execute("DELETE FROM clients", [])?;

    for client in store.clients() {
        let budget_json = client
            .budget
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        tx.execute(
            "INSERT INTO clients (
                id, name, email, phone, address, postal_code, city, notes,
                last_contact_date, budget
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                client.id as i64,
                client.name,
                client.email,
                client.phone,
                client.address,
                client.postal_code,
                client.city,
                client.notes,
                client.last_contact_date.map(format_date),
                budget_json,
            ],
        )?;
    }

    for debt in store.debts() {
        tx.execute(
            "INSERT INTO debts (
                id, client_id, creditor, amount, interest_rate, start_date, end_date,
                payment_frequency, notes, status, next_payment_date, payment_arrangement
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                debt.id as i64,
                debt.client_id as i64,
                debt.creditor,
                debt.amount,
                debt.interest_rate,
                debt.start_date.map(format_date),
                debt.end_date.map(format_date),
                debt.payment_frequency,
                debt.notes,
                debt.status.as_str(),
                debt.next_payment_date.map(format_date),
                debt.payment_arrangement,
            ],
        )?;

        for (position, payment) in debt.payment_history.iter().enumerate() {
            tx.execute(
                "INSERT INTO payments (
                    debt_id, position, payment_date, amount, payment_method, is_confirmed, notes
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    debt.id as i64,
                    position as i64,
                    format_date(payment.payment_date),
                    payment.amount,
                    payment.payment_method,
                    payment.is_confirmed,
                    payment.notes,
                ],
            )?;
        }

        for (position, contact) in debt.contact_history.iter().enumerate() {
            tx.execute(
                "INSERT INTO contacts (
                    debt_id, position, date, contact_type, notes, outcome, follow_up_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    debt.id as i64,
                    position as i64,
                    format_date(contact.date),
                    contact.contact_type,
                    contact.notes,
                    contact.outcome,
                    contact.follow_up_date.map(format_date),
                ],
            )?;
        }
    }

    let (next_client_id, next_debt_id) = store.next_ids();
    tx.execute(
        "INSERT OR REPLACE INTO store_meta (key, value) VALUES ('next_client_id', ?1), ('next_debt_id', ?2)",
        params![next_client_id as i64, next_debt_id as i64],
    )?;

    tx.commit().context("Failed to commit store snapshot")?;
    debug!("store snapshot written");

    Ok(())
}

/// Rebuild the entity store from the persisted snapshot
pub fn load_store(conn: &Connection) -> Result<EntityStore> {
    let clients = load_clients(conn)?;
    let mut debts = load_debts(conn)?;

    for debt in debts.iter_mut() {
        debt.payment_history = load_payments(conn, debt.id)?;
        debt.contact_history = load_contacts(conn, debt.id)?;
    }

    let next_client_id = read_meta(conn, "next_client_id")?.unwrap_or(1);
    let next_debt_id = read_meta(conn, "next_debt_id")?.unwrap_or(1);

    Ok(EntityStore::from_parts(clients, debts).resume_ids(next_client_id, next_debt_id))
}

pub fn count_clients(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM clients", [], |row| row.get(0))?;

    Ok(count)
}

fn load_clients(conn: &Connection) -> Result<Vec<Client>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, phone, address, postal_code, city, notes,
                last_contact_date, budget
         FROM clients
         ORDER BY id",
    )?;

    let clients = stmt
        .query_map([], |row| {
            let budget_json: Option<String> = row.get(9)?;
            let budget = match budget_json {
                Some(json) => Some(serde_json::from_str::<Budget>(&json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e))
                })?),
                None => None,
            };

            Ok(Client {
                id: row.get::<_, i64>(0)? as u64,
                name: row.get(1)?,
                email: row.get(2)?,
                phone: row.get(3)?,
                address: row.get(4)?,
                postal_code: row.get(5)?,
                city: row.get(6)?,
                notes: row.get(7)?,
                last_contact_date: optional_date(row, 8)?,
                budget,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(clients)
}

fn load_debts(conn: &Connection) -> Result<Vec<Debt>> {
    let mut stmt = conn.prepare(
        "SELECT id, client_id, creditor, amount, interest_rate, start_date, end_date,
                payment_frequency, notes, status, next_payment_date, payment_arrangement
         FROM debts
         ORDER BY id",
    )?;

    let debts = stmt
        .query_map([], |row| {
            let status_str: String = row.get(9)?;
            let status: DebtStatus = status_str.parse().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e))
            })?;

            Ok(Debt {
                id: row.get::<_, i64>(0)? as u64,
                client_id: row.get::<_, i64>(1)? as u64,
                creditor: row.get(2)?,
                amount: row.get(3)?,
                interest_rate: row.get(4)?,
                start_date: optional_date(row, 5)?,
                end_date: optional_date(row, 6)?,
                payment_frequency: row.get(7)?,
                notes: row.get(8)?,
                status,
                payment_history: Vec::new(),
                contact_history: Vec::new(),
                next_payment_date: optional_date(row, 10)?,
                payment_arrangement: row.get(11)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(debts)
}

fn load_payments(conn: &Connection, debt_id: u64) -> Result<Vec<Payment>> {
    let mut stmt = conn.prepare(
        "SELECT payment_date, amount, payment_method, is_confirmed, notes
         FROM payments
         WHERE debt_id = ?1
         ORDER BY position",
    )?;

    let payments = stmt
        .query_map([debt_id as i64], |row| {
            Ok(Payment {
                payment_date: required_date(row, 0)?,
                amount: row.get(1)?,
                payment_method: row.get(2)?,
                is_confirmed: row.get(3)?,
                notes: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(payments)
}

fn load_contacts(conn: &Connection, debt_id: u64) -> Result<Vec<ContactEntry>> {
    let mut stmt = conn.prepare(
        "SELECT date, contact_type, notes, outcome, follow_up_date
         FROM contacts
         WHERE debt_id = ?1
         ORDER BY position",
    )?;

    let contacts = stmt
        .query_map([debt_id as i64], |row| {
            Ok(ContactEntry {
                date: required_date(row, 0)?,
                contact_type: row.get(1)?,
                notes: row.get(2)?,
                outcome: row.get(3)?,
                follow_up_date: optional_date(row, 4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(contacts)
}

fn read_meta(conn: &Connection, key: &str) -> Result<Option<u64>> {
    let mut stmt = conn.prepare("SELECT value FROM store_meta WHERE key = ?1")?;
    let mut rows = stmt.query([key])?;

    match rows.next()? {
        Some(row) => Ok(Some(row.get::<_, i64>(0)? as u64)),
        None => Ok(None),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(idx: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn required_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let value: String = row.get(idx)?;
    parse_date(idx, &value)
}

fn optional_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let value: Option<String> = row.get(idx)?;
    value.map(|s| parse_date(idx, &s)).transpose()
}
