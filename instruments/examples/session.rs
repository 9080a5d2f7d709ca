//! Instrument store walkthrough
//!
//! Loads the sample catalog, shows the price index and a correlation query,
//! then runs one automatic and one manual session.
//!
//! Run with: cargo run --example session

use ag_instruments::{InstrumentStore, RiskTier, StoreConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Instrument Store Session Example ===\n");

    let config_path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.yaml");
    let catalog_path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/sample_catalog.csv");

    let mut config = StoreConfig::from_yaml_file(config_path)?;
    config.random_seed = Some(7);
    let mut store = InstrumentStore::from_delimited_file(catalog_path, config)?;

    // 1. Price order
    println!("Instruments by price:");
    for inv in store.price_index().iter() {
        println!("  {:<25} {:>8.2}  {}", inv.name, inv.price, inv.risk_level);
    }
    println!();

    // 2. Correlations
    println!("Correlations seen from Gold ETF:");
    for c in store.correlates_with("Gold ETF")?.take(5) {
        println!("  {:<25} {:>6.2}%", c.name, c.percent());
    }
    println!();

    // 3. Automatic session
    let tier: RiskTier = "high".parse()?;
    println!(
        "{} risk: {:.0}% annual chance of a lower return",
        tier,
        tier.downside_probability_pct()
    );
    let portfolio = store.recommend(tier, 5000.0)?;
    println!("Recommended portfolio:");
    for entry in &portfolio.entries {
        println!(
            "  {:<25} {:<12} {:>9.2}",
            entry.instrument.name, entry.instrument.category, entry.amount_invested
        );
    }
    let summary = portfolio.summary();
    println!(
        "Expected annual return: {:.2} ({:.2}% of {:.2} invested)\n",
        summary.expected_return, summary.return_pct, summary.total_invested
    );

    // 4. Manual session, one pick at a time
    let tier = RiskTier::Low;
    let mut session = store.start_manual(tier, 2000.0)?;
    println!("Available {} risk instruments:", tier);
    let choices: Vec<_> = store.catalog().by_tier(tier).map(|inv| inv.id).collect();
    for id in &choices {
        let inv = store.catalog().get(*id)?;
        println!("  [{}] {} ({})", id, inv.name, inv.category);
    }

    for (id, amount) in choices.iter().zip([800.0, 2500.0, 700.0]) {
        match session.select(store.catalog(), *id, amount) {
            Ok(entry) => println!(
                "  Invested {:.2} in {}",
                entry.amount_invested, entry.instrument.name
            ),
            Err(e) if e.is_recoverable() => println!("  Skipped: {}", e),
            Err(e) => return Err(e.into()),
        }
    }
    let portfolio = session.finish();
    println!(
        "Chosen portfolio: {} picks, {:.2} left of {:.2}",
        portfolio.len(),
        portfolio.remaining_budget(),
        portfolio.initial_budget
    );

    Ok(())
}
