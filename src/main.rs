//! voipbl-rtbh - ExaBGP process blackholing VoIP blacklists
//!
//! Stdout is the ExaBGP command channel, so every log line goes to stderr.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use voipbl_rtbh::cli::{Cli, Commands};
use voipbl_rtbh::config::DEFAULT_CONFIG;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let code = match execute(&cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    // The stdin reader may still be parked on a blocking read; exit without
    // waiting for the runtime to drain it.
    std::process::exit(code);
}

async fn execute(cli: &Cli) -> Result<()> {
    match cli.subcommand() {
        Commands::Run { dry_run } => {
            voipbl_rtbh::commands::run::run(&cli.config, dry_run).await?;
            Ok(())
        }
        Commands::Check => voipbl_rtbh::commands::check::run(&cli.config),
        Commands::DefaultConfig => {
            print!("{}", DEFAULT_CONFIG);
            Ok(())
        }
        Commands::Version => {
            println!("voipbl-rtbh {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
