use anyhow::{bail, Result};
use std::env;
use std::path::{Path, PathBuf};

use finfit::{
    count_clients, load_store, open_database, save_store, Config, EntityStore, Statistics,
};

const DEFAULT_DB_PATH: &str = "finfit.db";

fn main() -> Result<()> {
    let config = Config::from_env()?;
    finfit::logging::init(&config.log_filter);

    let args: Vec<String> = env::args().collect();
    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

    match args.get(1).map(String::as_str) {
        Some("init") => run_init(&db_path, config.seed)?,
        Some("stats") => run_stats(&db_path)?,
        Some("clients") => run_clients(&db_path)?,
        _ => print_usage(),
    }

    Ok(())
}

fn print_usage() {
    println!("FinFit debt management v{}", finfit::VERSION);
    println!();
    println!("Usage:");
    println!("  finfit init      create the database (seeded unless FINFIT_SEED=false)");
    println!("  finfit stats     print statistics of the stored records");
    println!("  finfit clients   list stored clients");
    println!();
    println!("Database: DATABASE_URL or FINFIT_DB (default ./{})", DEFAULT_DB_PATH);
}

fn run_init(db_path: &Path, seed: bool) -> Result<()> {
    println!("🔧 Setting up database at {}", db_path.display());
    let mut conn = open_database(db_path)?;

    let existing = load_store(&conn)?;
    if !existing.is_empty() {
        println!(
            "✓ Database already contains {} client(s), nothing to do",
            count_clients(&conn)?
        );
        return Ok(());
    }

    let store = if seed {
        EntityStore::seeded()
    } else {
        EntityStore::new()
    };
    save_store(&mut conn, &store)?;

    println!(
        "✓ Database initialized with {} client(s) and {} debt(s)",
        store.clients().count(),
        store.debts().count()
    );
    Ok(())
}

fn open_existing(db_path: &Path) -> Result<EntityStore> {
    if !db_path.exists() {
        eprintln!("❌ Database not found at {}", db_path.display());
        eprintln!("   Run: finfit init");
        bail!("database missing");
    }
    let conn = open_database(db_path)?;
    load_store(&conn)
}

fn run_stats(db_path: &Path) -> Result<()> {
    let store = open_existing(db_path)?;
    let stats = Statistics::collect(&store);

    println!("📊 Statistics");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Clients:          {}", stats.total_clients);
    println!("Debts:            {}", stats.total_debts);
    println!("Total debt:       {:.2}", stats.total_debt_amount);
    println!("Average debt:     {:.2}", stats.average_debt_amount);
    println!("Confirmed paid:   {:.2}", stats.total_paid_amount);

    println!("\nBy status:");
    for (status, count) in &stats.status_breakdown {
        println!("  {:<12} {}", status, count);
    }

    println!("\nRecent payments:");
    for payment in &stats.recent_payments {
        println!(
            "  {}  {:>10.2}  {:<20} {}{}",
            payment.date,
            payment.amount,
            payment.creditor,
            payment.client_name.as_deref().unwrap_or("(deleted client)"),
            if payment.is_confirmed { "" } else { "  (unconfirmed)" }
        );
    }

    Ok(())
}

fn run_clients(db_path: &Path) -> Result<()> {
    let store = open_existing(db_path)?;

    for client in store.clients() {
        let debts = store.list_debts_for_client(client.id)?;
        let outstanding: f64 = debts.iter().map(|d| d.remaining_balance()).sum();
        println!(
            "#{:<4} {:<24} {:<28} {} debt(s), {:.2} outstanding",
            client.id,
            client.name,
            client.email,
            debts.len(),
            outstanding
        );
    }

    Ok(())
}
