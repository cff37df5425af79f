use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use url::Url;

use crate::{
    classifier::SafeSurfClient,
    cli::{Command, ProtectionState},
    config::AppConfig,
    db::{self, settings::SettingsRepository, stats::StatsRepository},
    infrastructure::{directories::ResolvedPaths, shutdown::Shutdown},
    page::{DomWatcher, HtmlPageSource, InlineStyleSurface},
    tasks::ScanPipeline,
};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct GuardApp {
    config: Arc<AppConfig>,
    http: Client,
    stats: Arc<StatsRepository>,
    settings: SettingsRepository,
}

impl GuardApp {
    pub async fn initialize(config: AppConfig, paths: &ResolvedPaths) -> Result<Self> {
        let pool = db::init_pool(&paths.db_path)
            .await
            .with_context(|| format!("failed to open {}", paths.db_path.display()))?;

        let http = Client::builder()
            .user_agent(format!("safesurf-guard/{}", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http,
            stats: Arc::new(StatsRepository::new(pool.clone())),
            settings: SettingsRepository::new(pool),
        })
    }

    pub async fn run(self, command: Command, shutdown: Shutdown) -> Result<()> {
        let result = match command {
            Command::Watch { url } => self.watch(url, &shutdown).await,
            Command::Stats => self.print_stats().await,
            Command::Protection { state } => self.protection(state).await,
        };
        self.stats.close().await;
        result
    }

    async fn watch(&self, url: Url, shutdown: &Shutdown) -> Result<()> {
        let classifier = Arc::new(SafeSurfClient::new(
            self.http.clone(),
            self.config.classifier.clone(),
        ));
        let Some(ScanPipeline {
            filter,
            worker,
            queue,
        }) = ScanPipeline::for_page(
            &self.settings,
            &self.config.pipeline,
            classifier,
            Arc::new(InlineStyleSurface),
            self.stats.clone(),
        )
        .await?
        else {
            tracing::info!(target: "lifecycle", %url, "protection paused; page will not be scanned");
            return Ok(());
        };

        let mut page =
            HtmlPageSource::new(self.http.clone(), url.clone(), self.config.page.poll_interval);
        let document = page
            .load()
            .await
            .with_context(|| format!("failed to load {url}"))?;

        let (mutation_tx, mutation_rx) = mpsc::unbounded_channel();
        let poller = page.spawn(mutation_tx, shutdown.subscribe());
        let worker = worker.spawn(shutdown.subscribe());
        let watcher = tokio::spawn(DomWatcher::new(filter).run(
            document,
            mutation_rx,
            shutdown.subscribe(),
        ));

        tracing::info!(
            target: "lifecycle",
            %url,
            classifier = %self.config.classifier.endpoint,
            inline_images = self.config.classifier.inline_images,
            "protection active"
        );

        shutdown.subscribe().notified().await;
        tracing::info!(target: "lifecycle", queued = queue.len(), "page unloading");

        for (name, handle) in [("poller", poller), ("watcher", watcher), ("worker", worker)] {
            join_with_timeout(name, handle).await;
        }
        Ok(())
    }

    async fn print_stats(&self) -> Result<()> {
        let counts = self.stats.counts().await?;
        println!("Images scanned: {}", counts.scanned);
        println!("Images blocked: {}", counts.blocked);
        if let Some(updated_at) = counts.updated_at {
            println!("Last verdict:   {}", updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        Ok(())
    }

    async fn protection(&self, state: ProtectionState) -> Result<()> {
        match state {
            ProtectionState::On => self.settings.set_protection_enabled(true).await?,
            ProtectionState::Off => self.settings.set_protection_enabled(false).await?,
            ProtectionState::Status => {}
        }
        let enabled = self.settings.protection_enabled().await?;
        println!("Protection: {}", if enabled { "ACTIVE" } else { "PAUSED" });
        Ok(())
    }
}

async fn join_with_timeout(name: &'static str, mut handle: JoinHandle<()>) {
    let wait = sleep(SHUTDOWN_TIMEOUT);
    tokio::pin!(wait);
    tokio::select! {
        res = &mut handle => {
            if let Err(err) = res {
                if err.is_panic() {
                    tracing::error!(target: "lifecycle", task = name, "task panicked");
                }
            }
        }
        _ = &mut wait => {
            tracing::warn!(
                target: "lifecycle",
                task = name,
                "task did not stop within {:?}; aborting",
                SHUTDOWN_TIMEOUT
            );
            handle.abort();
        }
    }
}
