//! Command Line Interface for the tidepool AMM engine.
use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use prettytable::{Table, row};
use rust_decimal::Decimal;
use tidepool_domain::quote;
use tidepool_engine::prelude::*;

#[derive(Parser)]
#[command(name = "tidepool")]
#[command(about = "Deterministic constant-product AMM pool engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted scenario against an in-memory ledger
    Demo {
        /// Dump the final ledger snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Quote a constant-product swap against explicit reserves
    Quote {
        /// Input-side reserve
        #[arg(long)]
        reserve_in: Decimal,

        /// Output-side reserve
        #[arg(long)]
        reserve_out: Decimal,

        /// Amount to quote
        #[arg(long)]
        amount: Decimal,

        /// Treat the amount as desired output instead of input
        #[arg(long)]
        exact_output: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo { json } => run_demo(json),
        Commands::Quote {
            reserve_in,
            reserve_out,
            amount,
            exact_output,
        } => run_quote(reserve_in, reserve_out, amount, exact_output),
    }
}

fn run_quote(
    reserve_in: Decimal,
    reserve_out: Decimal,
    amount: Decimal,
    exact_output: bool,
) -> Result<()> {
    if exact_output {
        let required = quote::amount_in(amount, reserve_in, reserve_out)?;
        println!("Input required for {amount} out: {required}");
    } else {
        let out = quote::amount_out(amount, reserve_in, reserve_out)?;
        println!("Output for {amount} in: {out}");
    }
    Ok(())
}

fn run_demo(json: bool) -> Result<()> {
    let mut tokens = InMemoryTokenLedger::new();
    tokens.register(TokenInfo::new("TKN", 3));
    tokens.register(TokenInfo::new("TOKENA", 8));
    tokens.register(TokenInfo::new("TOKENB", 8));
    tokens.issue("alice", "TKN", Decimal::from(2000))?;
    tokens.issue("alice", "TOKENA", Decimal::from(5000))?;
    tokens.issue("alice", "TOKENB", Decimal::from(10000))?;
    tokens.issue("bob", "TOKENA", Decimal::from(500))?;
    tokens.issue("bob", "TOKENB", Decimal::from(500))?;

    let mut oracle = FixedPriceOracle::new();
    oracle.set("TOKENA", Decimal::TWO);
    oracle.set("TOKENB", Decimal::ONE);

    let mut engine = PoolEngine::new(EngineConfig::default(), tokens, oracle);
    let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
    let alice = ActionContext::new("alice", now);
    let bob = ActionContext::new("bob", now + 60);

    println!("=== tidepool demo: TOKENA:TOKENB ===\n");

    engine.create_pool(&alice, "TOKENA:TOKENB")?;
    println!("Pool created (1000 TKN creation fee burned)");

    engine.add_liquidity(
        &alice,
        "TOKENA:TOKENB",
        Decimal::from(1000),
        Decimal::from(2000),
        None,
        None,
    )?;
    println!("\n--- alice deposits 1000 TOKENA / 2000 TOKENB ---");
    print_pool(&engine);

    let max_slippage = Decimal::new(5, 2);
    engine.swap_tokens(
        &bob,
        "TOKENA:TOKENB",
        "TOKENA",
        Decimal::from(10),
        TradeType::ExactInput,
        max_slippage,
    )?;
    println!("\n--- bob sells 10 TOKENA ---");
    print_pool(&engine);

    engine.swap_tokens(
        &bob,
        "TOKENA:TOKENB",
        "TOKENB",
        Decimal::from(15),
        TradeType::ExactInput,
        max_slippage,
    )?;
    println!("\n--- bob sells 15 TOKENB ---");
    print_pool(&engine);

    engine.remove_liquidity(&alice, "TOKENA:TOKENB", Decimal::from(25))?;
    println!("\n--- alice withdraws 25% of her position ---");
    print_pool(&engine);
    print_balances(&engine, &["alice", "bob"]);

    if json {
        println!("{}", serde_json::to_string_pretty(&engine.ledger().snapshot())?);
    }
    Ok(())
}

fn print_pool(engine: &PoolEngine<InMemoryTokenLedger, FixedPriceOracle>) {
    let mut table = Table::new();
    table.add_row(row![
        "pair",
        "base",
        "quote",
        "base price",
        "shares",
        "base vol",
        "quote vol"
    ]);
    for pool in engine.ledger().pools() {
        table.add_row(row![
            pool.token_pair,
            pool.base_quantity,
            pool.quote_quantity,
            pool.base_price,
            pool.total_shares,
            pool.base_volume,
            pool.quote_volume
        ]);
    }
    table.printstd();
}

fn print_balances(engine: &PoolEngine<InMemoryTokenLedger, FixedPriceOracle>, accounts: &[&str]) {
    let mut table = Table::new();
    table.add_row(row!["account", "TOKENA", "TOKENB"]);
    for account in accounts {
        table.add_row(row![
            account,
            engine.tokens().balance(account, "TOKENA"),
            engine.tokens().balance(account, "TOKENB")
        ]);
    }
    table.printstd();
}
