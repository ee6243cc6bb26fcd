// src/main.rs
use binary_sim::config::AppConfig;
use binary_sim::connectors::simulated::SimulatedBroker;
use binary_sim::connectors::traits::BrokerClient;
use binary_sim::core::engine::{DemoEngine, RunSummary};
use binary_sim::logging::{init_tracing, ChannelLog, EventLog, TracingLog};
use binary_sim::output::render_table;
use binary_sim::AccountSession;
use chrono::{Duration, Utc};
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Load Configuration
    let config = AppConfig::new()?;
    std::fs::create_dir_all(&config.demo.log_dir)?;
    let _guard = init_tracing(&config.demo.log_dir)?;

    println!("========================================");
    println!("       BINARY SIM - v{}", env!("CARGO_PKG_VERSION"));
    println!("========================================");
    println!("Account: {:?}", config.session.account_type);
    println!("Symbols: {}", config.session.symbols.join(", "));
    println!(
        "Outages: {:.0}% per call, {} attempt(s)",
        config.session.fail_chance * 100.0,
        config.session.max_retries
    );
    println!("========================================");

    // 2. Initialize Components
    let (ui_tx, ui_rx) = mpsc::channel(256);
    let log: Arc<dyn EventLog> = if config.demo.tui {
        Arc::new(ChannelLog::new(ui_tx.clone()))
    } else {
        Arc::new(TracingLog)
    };
    let session = AccountSession::from_config(&config.session, log)?;
    let broker = SimulatedBroker::new(session);

    // 3. Run Engine
    if config.demo.tui {
        let mut engine = DemoEngine::new(config.demo.clone(), broker.clone(), Some(ui_tx));
        let engine_task = tokio::spawn(async move { engine.run().await });
        binary_sim::tui::run(ui_rx).await?;
        if engine_task.is_finished() {
            print_summary(&engine_task.await??);
        } else {
            engine_task.abort();
            println!("Dashboard closed before the demo finished");
        }
    } else {
        drop(ui_rx);
        let mut engine = DemoEngine::new(config.demo.clone(), broker.clone(), None);
        print_summary(&engine.run().await?);
    }

    // 4. Report
    match broker.orders().await {
        Ok(orders) => println!("\n{}", render_table(&orders)),
        Err(e) => eprintln!("Could not load orders: {}", e),
    }

    if let Some(symbol) = config.session.symbols.first() {
        let end = Utc::now();
        match broker
            .get_history(symbol, end - Duration::minutes(4), end)
            .await
        {
            Ok(candles) => println!("\n{} last 5 minutes\n{}", symbol, render_table(&candles)),
            Err(e) => eprintln!("Could not load history: {}", e),
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Placed {} | win {} | loss {} | cancelled {} | open {} | skipped {}",
        summary.placed,
        summary.wins,
        summary.losses,
        summary.cancelled,
        summary.open,
        summary.unavailable
    );
    println!("Final balance: {}", summary.final_balance);
}
