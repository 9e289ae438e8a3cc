//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::Profile;
use crate::engine::{LogLevel, Message, SyncEngine, SyncOptions, SyncReport};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig};
use crate::sink::{HostedTableConfig, HostedTableSink, OutputFormat, TableSink};
use crate::types::Credentials;
use std::path::PathBuf;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let profile = self.resolve_profile()?;

        match &self.cli.command {
            Commands::Check => self.check(&profile).await,
            Commands::Estimate => self.estimate(&profile).await,
            Commands::Fetch {
                output,
                format,
                max_records,
                no_estimate,
            } => {
                self.fetch(
                    &profile,
                    output.as_deref().map(PathBuf::from),
                    *format,
                    *max_records,
                    *no_estimate,
                )
                .await
            }
            Commands::Sync {
                service_url,
                table,
                batch_size,
                no_maintenance,
                max_records,
                no_estimate,
            } => {
                self.sync(
                    &profile,
                    service_url.as_deref(),
                    table.as_deref(),
                    *batch_size,
                    *no_maintenance,
                    *max_records,
                    *no_estimate,
                )
                .await
            }
        }
    }

    /// Load the profile (if any) and apply the global CLI overrides
    fn resolve_profile(&self) -> Result<Profile> {
        let mut profile = match &self.cli.profile {
            Some(path) => Profile::load(path)?,
            None => Profile::default(),
        };
        if let Some(endpoint) = &self.cli.endpoint {
            profile.endpoint = endpoint.clone();
        }
        if let Some(username) = &self.cli.username {
            profile.username = Some(username.clone());
        }
        if let Some(password) = &self.cli.password {
            profile.password = Some(password.clone());
        }
        if let Some(group) = self.cli.group {
            profile.group = group;
        }
        if let Some(page_size) = self.cli.page_size {
            profile.page_size = page_size;
        }
        url::Url::parse(&profile.endpoint)?;
        Ok(profile)
    }

    fn build_client(&self, credentials: Option<Credentials>) -> HttpClient {
        let config = HttpClientConfig::default();
        match credentials {
            Some(credentials) => HttpClient::with_credentials(config, credentials),
            None => HttpClient::with_config(config),
        }
    }

    fn build_engine(&self, profile: &Profile, max_records: Option<usize>, no_estimate: bool) -> SyncEngine {
        let client = self.build_client(profile.credentials());
        let mut pager = profile.pager_config();
        if let Some(cap) = max_records {
            pager = pager.with_max_records(cap);
        }
        let options = SyncOptions {
            endpoint: profile.endpoint.clone(),
            group: profile.group,
            pager,
            estimate: profile.estimate && !no_estimate,
            ..SyncOptions::default()
        };
        SyncEngine::new(client, options)
    }

    async fn check(&self, profile: &Profile) -> Result<()> {
        let engine = self.build_engine(profile, None, true);
        engine.check().await?;
        println!("{} is reachable", profile.endpoint);
        Ok(())
    }

    async fn estimate(&self, profile: &Profile) -> Result<()> {
        let engine = self.build_engine(profile, None, true);
        match engine.estimate().await {
            Some(count) => println!("{count} distinct species match {}", profile.group),
            None => println!("distinct-species count unavailable at this endpoint"),
        }
        Ok(())
    }

    async fn fetch(
        &self,
        profile: &Profile,
        output: Option<PathBuf>,
        format: Option<OutputFormat>,
        max_records: Option<usize>,
        no_estimate: bool,
    ) -> Result<()> {
        let path = output
            .or_else(|| profile.output.clone())
            .ok_or_else(|| Error::config("No output path given (use --output or the profile)"))?;

        let mut sink = TableSink::new(&path);
        if let Some(format) = format.or(profile.format) {
            sink = sink.with_format(format);
        }

        let engine = self.build_engine(profile, max_records, no_estimate);
        let report = engine.run(&sink).await;
        Self::render(&report);
        Self::into_result(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn sync(
        &self,
        profile: &Profile,
        service_url: Option<&str>,
        table: Option<&str>,
        batch_size: Option<usize>,
        no_maintenance: bool,
        max_records: Option<usize>,
        no_estimate: bool,
    ) -> Result<()> {
        let hosted = profile.hosted.as_ref();
        let service_url = service_url
            .map(ToString::to_string)
            .or_else(|| hosted.map(|h| h.service_url.clone()))
            .ok_or_else(|| Error::config("No hosted service URL (use --service-url or the profile)"))?;
        let table = table
            .map(ToString::to_string)
            .or_else(|| hosted.map(|h| h.table_name.clone()))
            .ok_or_else(|| Error::config("No hosted table name (use --table or the profile)"))?;

        let mut config = HostedTableConfig::new(service_url, table);
        if let Some(size) = batch_size.or_else(|| hosted.map(|h| h.batch_size)) {
            config = config.with_batch_size(size);
        }
        let maintenance = !no_maintenance && hosted.map_or(true, |h| h.maintenance);
        config = config.with_maintenance(maintenance);

        let engine = self.build_engine(profile, max_records, no_estimate);
        let sink = HostedTableSink::new(engine.client(), config);
        let report = engine.run(&sink).await;
        Self::render(&report);
        Self::into_result(report)
    }

    /// Print a run's messages and final statistics
    fn render(report: &SyncReport) {
        for message in &report.messages {
            match message {
                Message::Log { level, message } => match level {
                    LogLevel::Error => eprintln!("error: {message}"),
                    LogLevel::Warn => eprintln!("warning: {message}"),
                    _ => println!("{message}"),
                },
                Message::Stats(stats) => {
                    println!(
                        "{} unique species from {} rows across {} pages in {}ms",
                        stats.unique_records, stats.raw_rows, stats.pages_fetched, stats.duration_ms
                    );
                }
            }
        }
    }

    fn into_result(report: SyncReport) -> Result<()> {
        match report.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
