//! Command-line front end.
//!
//! Each subcommand maps onto one service call and prints JSON to stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;

use crate::application::use_cases::ingestion::IngestionUseCase;
use crate::application::use_cases::report_renderer::ReportRenderer;
use crate::application::use_cases::report_service::ReportService;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::{DatasetRepository, DatasetStore, EquipmentDb};
use crate::infrastructure::decode::TableDecoder;

pub const SAMPLE_FILE_NAME: &str = "sample_equipment_data.csv";
const SAMPLE_DATA: &str = include_str!("../../../demos/sample_equipment_data.csv");

#[derive(Parser, Debug)]
#[command(name = "equipment-analytics", author, version, about = "Chemical equipment analytics")]
pub struct Cli {
    /// Config file (defaults to ./equipment-analytics.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate, summarize and store a CSV or spreadsheet upload
    Ingest {
        #[arg(long)]
        owner: String,
        file: PathBuf,
    },
    /// Ingest the bundled demo dataset
    Sample {
        #[arg(long)]
        owner: String,
    },
    /// Datasets of an owner, newest first
    List {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    Show {
        #[arg(long)]
        owner: String,
        id: i64,
        /// Also print up to N stored records
        #[arg(long)]
        records: Option<usize>,
    },
    Delete {
        #[arg(long)]
        owner: String,
        id: i64,
    },
    /// Apply the retention cap now
    Evict {
        #[arg(long)]
        owner: String,
        /// Defaults to `retention_limit` from config
        #[arg(long)]
        keep: Option<usize>,
    },
    /// Render the PDF report of a dataset
    Report {
        #[arg(long)]
        owner: String,
        id: i64,
        /// Output path; defaults to the suggested report file name
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Services wired from one configuration
pub struct AppContext {
    config: AppConfig,
    store: Arc<dyn DatasetStore>,
    ingestion: IngestionUseCase,
    reports: ReportService,
}

impl AppContext {
    pub async fn open(config: AppConfig) -> anyhow::Result<Self> {
        let db = EquipmentDb::connect(&config.database_path)
            .await
            .with_context(|| format!("opening {}", config.database_path.display()))?;
        let store: Arc<dyn DatasetStore> = Arc::new(DatasetRepository::new(&db));

        let ingestion = IngestionUseCase::new(
            store.clone(),
            TableDecoder::new(config.max_upload_bytes),
            config.retention_limit,
        );
        let renderer =
            ReportRenderer::new(config.report.clone()).with_sample_cap(config.report_sample_rows);
        let reports = ReportService::new(store.clone(), renderer);

        Ok(Self {
            config,
            store,
            ingestion,
            reports,
        })
    }

    /// Run one command and return what should be printed
    pub async fn execute(&self, command: Command) -> anyhow::Result<String> {
        let output = match command {
            Command::Ingest { owner, file } => {
                let bytes = tokio::fs::read(&file)
                    .await
                    .with_context(|| format!("reading {}", file.display()))?;
                let filename = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string());
                let outcome = self.ingestion.ingest_upload(&owner, &filename, &bytes).await?;
                serde_json::to_value(&outcome)?
            }
            Command::Sample { owner } => {
                let outcome = self
                    .ingestion
                    .ingest_upload(&owner, SAMPLE_FILE_NAME, SAMPLE_DATA.as_bytes())
                    .await?;
                serde_json::to_value(&outcome)?
            }
            Command::List { owner, limit } => {
                serde_json::to_value(self.store.list(&owner, limit).await?)?
            }
            Command::Show { owner, id, records } => {
                let dataset = self.store.fetch(id, &owner).await?;
                match records {
                    Some(n) => json!({
                        "dataset": dataset,
                        "records": self.store.records(id, &owner, Some(n)).await?,
                    }),
                    None => serde_json::to_value(&dataset)?,
                }
            }
            Command::Delete { owner, id } => {
                self.store.delete(id, &owner).await?;
                json!({ "deleted": id })
            }
            Command::Evict { owner, keep } => {
                let keep = keep.unwrap_or(self.config.retention_limit);
                let evicted = self.store.evict_excess(&owner, keep).await?;
                json!({ "kept": keep, "evicted": evicted })
            }
            Command::Report { owner, id, out } => {
                let report = self.reports.render_report(id, &owner, Utc::now()).await?;
                let path = out.unwrap_or_else(|| PathBuf::from(&report.file_name));
                tokio::fs::write(&path, &report.bytes)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                json!({ "path": path, "bytes": report.bytes.len() })
            }
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }
}
