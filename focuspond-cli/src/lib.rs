//! Command handling for the `focuspond` binary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use focuspond_client::{ClientConfig, HttpResourceClient};
use focuspond_storage::{DrainOutcome, SqliteStore};
use focuspond_sync::{
    ConnectivityMonitor, Loaded, MonitorConfig, PondKeeper, ReachabilityEvent, SyncConfig,
    SyncOrchestrator, WriteOutcome,
};
use focuspond_types::{AccountId, Catalog, CreatureId, CreatureSpecies, ResourceKind};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "focuspond")]
#[command(about = "Grow fish by studying, online or off")]
pub struct Cli {
    /// Path to the local database
    #[arg(long, default_value = "focuspond.db")]
    pub db: PathBuf,

    /// Backend API root
    #[arg(long, default_value = "http://localhost:8000/api")]
    pub api_url: String,

    /// Account to act as; omit for the shared anonymous namespace
    #[arg(short, long)]
    pub user: Option<i64>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show balance, creatures, pond and sync state
    Status,
    /// Buy a species by name or ID
    Buy { species: String },
    /// Credit a finished study session to an owned creature
    Study { creature: String, minutes: u32 },
    /// Replay queued writes and reload everything from the backend
    Sync,
    /// Keep probing the backend and sync whenever it comes back
    Watch,
    /// Forget this account's cached data and queued writes
    Logout,
}

/// A configured client bound to one account.
pub struct App {
    sync: Arc<SyncOrchestrator>,
    keeper: PondKeeper,
    monitor: Arc<ConnectivityMonitor>,
    account: Option<AccountId>,
}

impl App {
    /// Opens the database, builds the sync stack and attaches `--user`.
    ///
    /// Running as a different account than last time clears the previous
    /// account's cached data and queued writes.
    pub async fn open(cli: &Cli) -> Result<Self> {
        let store = SqliteStore::open(&cli.db)
            .with_context(|| format!("failed to open database {}", cli.db.display()))?;
        let client = HttpResourceClient::new(ClientConfig::with_base_url(cli.api_url.clone()))
            .context("failed to create HTTP client")?;
        let remote = Arc::new(client);
        let monitor = Arc::new(ConnectivityMonitor::new(
            remote.clone(),
            MonitorConfig::default(),
        ));
        let sync = Arc::new(
            SyncOrchestrator::new(Arc::new(store), remote, SyncConfig::default())
                .with_online_status(monitor.watch_online()),
        );

        let account = cli.user.map(AccountId::new);
        sync.attach(account)
            .await
            .context("failed to attach account")?;

        Ok(Self {
            keeper: PondKeeper::new(Arc::clone(&sync)),
            sync,
            monitor,
            account,
        })
    }

    pub fn orchestrator(&self) -> &Arc<SyncOrchestrator> {
        &self.sync
    }

    /// Runs one command, writing human-readable output. `shutdown` ends
    /// `watch`.
    pub async fn run<W, S>(&self, command: &Command, out: &mut W, shutdown: S) -> Result<()>
    where
        W: Write,
        S: Future<Output = ()>,
    {
        match command {
            Command::Status => self.status(out).await,
            Command::Buy { species } => self.buy(species, out).await,
            Command::Study { creature, minutes } => self.study(creature, *minutes, out).await,
            Command::Sync => self.sync_now(out).await,
            Command::Watch => self.watch(out, shutdown).await,
            Command::Logout => self.logout(out).await,
        }
    }

    async fn status<W: Write>(&self, out: &mut W) -> Result<()> {
        let currency = self.sync.load_currency(self.account).await;
        let owned = self.sync.load_owned_creatures(self.account).await;
        let pond = self.sync.load_pond_creatures(self.account).await;

        match &currency {
            Loaded::Unavailable => writeln!(out, "Coins: unknown (offline, nothing cached)")?,
            loaded => {
                let amount = loaded.value().map_or(0, |c| c.amount);
                writeln!(out, "Coins: {}{}", amount, freshness(loaded))?;
            }
        }

        writeln!(out, "Creatures{}:", freshness(&owned))?;
        match owned.value() {
            Some(owned) if !owned.is_empty() => {
                for creature in owned {
                    writeln!(
                        out,
                        "  {} x{}: {}/{} min ({:.0}%, {:?})",
                        species_name(self.sync.catalog(), creature.creature_id),
                        creature.quantity,
                        creature.minutes_studied,
                        creature.minutes_required,
                        creature.growth_percentage(),
                        creature.growth_stage(),
                    )?;
                }
            }
            Some(_) => writeln!(out, "  none")?,
            None => writeln!(out, "  unknown")?,
        }

        match pond.value() {
            Some(fish) => writeln!(out, "Pond: {} fish{}", fish.len(), freshness(&pond))?,
            None => writeln!(out, "Pond: unknown")?,
        }

        let status = self.sync.status(self.account);
        writeln!(out, "Pending writes: {}", status.pending_operations)?;
        for (kind, updated) in &status.last_updated {
            if *kind == ResourceKind::CreatureImages {
                continue;
            }
            match updated {
                Some(ts) => writeln!(out, "  {} cached at {}", kind.label(), ts)?,
                None => writeln!(out, "  {} never cached", kind.label())?,
            }
        }
        Ok(())
    }

    async fn buy<W: Write>(&self, query: &str, out: &mut W) -> Result<()> {
        let species = find_species(self.sync.catalog(), query)?;
        self.sync.load_currency(self.account).await;
        self.sync.load_owned_creatures(self.account).await;

        let outcome = self
            .keeper
            .purchase(self.account, species.id)
            .await
            .with_context(|| format!("cannot buy {}", species.name))?;
        writeln!(
            out,
            "Bought {} for {} coins{}",
            species.name,
            species.cost,
            outcome_note(outcome)
        )?;
        writeln!(out, "Coins left: {}", self.keeper.balance(self.account))?;
        Ok(())
    }

    async fn study<W: Write>(&self, query: &str, minutes: u32, out: &mut W) -> Result<()> {
        let species = find_species(self.sync.catalog(), query)?;
        self.sync.load_owned_creatures(self.account).await;

        let result = self
            .keeper
            .complete_study_session(self.account, species.id, minutes)
            .await
            .with_context(|| format!("cannot study with {}", species.name))?;

        if result.released_to_pond {
            writeln!(
                out,
                "{} is fully grown and now swims in your pond{}",
                species.name,
                outcome_note(result.write)
            )?;
        } else if let Some(creature) = result.creature {
            writeln!(
                out,
                "{}: {}/{} min ({:.0}%){}",
                species.name,
                creature.minutes_studied,
                creature.minutes_required,
                creature.growth_percentage(),
                outcome_note(result.write)
            )?;
        }
        Ok(())
    }

    async fn sync_now<W: Write>(&self, out: &mut W) -> Result<()> {
        match self.sync.drain(self.account).await {
            DrainOutcome::Completed(report) => writeln!(
                out,
                "Replayed {} queued writes ({} still pending)",
                report.succeeded, report.remaining
            )?,
            DrainOutcome::AlreadyRunning => writeln!(out, "A sync is already running")?,
            DrainOutcome::StoreUnavailable { .. } => {
                anyhow::bail!("local database unavailable, queued writes were kept")
            }
        }

        let report = self
            .sync
            .manual_refresh(self.account)
            .await
            .context("reload failed")?;
        writeln!(
            out,
            "Reloaded {} of {} resources",
            report.updated.len(),
            ResourceKind::ALL.len()
        )?;
        Ok(())
    }

    async fn watch<W, S>(&self, out: &mut W, shutdown: S) -> Result<()>
    where
        W: Write,
        S: Future<Output = ()>,
    {
        let mut events = self.monitor.subscribe();
        let reconciler = self.sync.spawn_reconciler(self.monitor.subscribe());
        let handle = self.monitor.spawn();
        writeln!(
            out,
            "Watching {} ({} pending writes)",
            self.sync.current_account().map_or("anonymous".to_string(), |a| format!("account {a}")),
            self.sync.pending_count(self.account)
        )?;
        out.flush()?;

        // Writes left by an earlier run are replayed without waiting for an
        // offline-to-online transition.
        let startup = self.sync.reconcile(self.account);
        let mut started = false;
        tokio::pin!(startup);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                report = &mut startup, if !started => {
                    started = true;
                    let replayed = report.drain.succeeded();
                    if replayed > 0 {
                        writeln!(
                            out,
                            "Replayed {} queued writes ({} still pending)",
                            replayed,
                            self.sync.pending_count(self.account)
                        )?;
                    }
                }
                event = events.recv() => match event {
                    Ok(ReachabilityEvent::BecameReachable) => {
                        writeln!(out, "Backend reachable, syncing")?;
                    }
                    Ok(ReachabilityEvent::BecameUnreachable) => {
                        writeln!(out, "Backend unreachable, writes will be queued")?;
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
            }
            out.flush()?;
        }

        handle.shutdown().await;
        reconciler.abort();
        info!("Stopped watching");
        Ok(())
    }

    async fn logout<W: Write>(&self, out: &mut W) -> Result<()> {
        let pending = self.sync.pending_count(self.account);
        self.sync.logout().await.context("logout failed")?;
        if pending > 0 {
            writeln!(out, "Logged out, discarded {pending} unsynced writes")?;
        } else {
            writeln!(out, "Logged out")?;
        }
        Ok(())
    }
}

fn find_species<'a>(catalog: &'a Catalog, query: &str) -> Result<&'a CreatureSpecies> {
    catalog
        .find(query)
        .with_context(|| {
            let names: Vec<&str> = catalog.species().iter().map(|s| s.name.as_str()).collect();
            format!("known species: {}", names.join(", "))
        })
}

fn species_name(catalog: &Catalog, id: CreatureId) -> String {
    catalog
        .get(id)
        .map_or_else(|| format!("#{id}"), |s| s.name.clone())
}

fn freshness<T>(loaded: &Loaded<T>) -> &'static str {
    match loaded {
        Loaded::Fresh(_) => "",
        Loaded::Cached(_) => " (cached)",
        Loaded::Unavailable => " (unavailable)",
    }
}

fn outcome_note(outcome: WriteOutcome) -> &'static str {
    match outcome {
        WriteOutcome::Synced => "",
        WriteOutcome::Queued => " (offline, will sync later)",
        WriteOutcome::Discarded => " (not saved)",
    }
}
