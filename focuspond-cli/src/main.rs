//! FocusPond command-line client.
//!
//! Usage:
//!   focuspond --user 7 status
//!   focuspond --user 7 buy carp
//!   focuspond --user 7 study carp 25
//!   focuspond --user 7 watch
//!
//! Every command works offline: writes are kept in the local database and
//! replayed by `sync` or `watch` once the backend answers again.

use anyhow::Result;
use clap::Parser;
use focuspond_cli::{App, Cli};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let app = App::open(&cli).await?;
    let mut stdout = std::io::stdout().lock();
    app.run(&cli.command, &mut stdout, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
