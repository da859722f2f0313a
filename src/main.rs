use clap::Parser;
use receipt_mailer::utils::logger;
use receipt_mailer::{app, CliConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = CliConfig::parse();

    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting receipt-mailer");
    tracing::debug!("CLI config: {:?}", config);
    if !config.send {
        println!("Preview mode: receipts are written but no email is sent (use --send to deliver)");
    }

    let summary = match app::run(&config).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Setup failed: {} (category: {:?})", e, e.category());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    println!("{}", summary);
    for path in &summary.written {
        println!("  wrote {}", path);
    }
    for failure in &summary.failures {
        println!(
            "  row {} ({}) failed at {}: {}",
            failure.row, failure.recipient, failure.stage, failure.reason
        );
    }

    Ok(())
}
