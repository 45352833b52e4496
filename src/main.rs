use clap::Parser;
use poly_revert::cli::{Cli, Commands};
use poly_revert::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    // Invalid configuration is fatal; never trade on a bad setup
    config.validate()?;

    // Initialize telemetry
    let _guard = poly_revert::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting trading loop");
            args.execute(config).await?;
        }
        Commands::Status => {
            println!("poly-revert status");
            println!("  Mode: {:?}", config.execution.mode);
            println!("  Status: Not running");
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Feed: {} {:?}",
                config.feed.exchange, config.feed.assets
            );
            println!(
                "  Strategy: entry z={}, exit z={}, lookback={}s",
                config.strategy.entry_threshold,
                config.strategy.exit_threshold,
                config.strategy.lookback_secs
            );
            println!(
                "  Risk: bet={}, max_positions={}, cooldown={}s",
                config.risk.bet_amount, config.risk.max_positions, config.risk.cooldown_secs
            );
            println!("  Execution: {:?}", config.execution.mode);
        }
    }

    Ok(())
}
