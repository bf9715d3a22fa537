//! Ingestion Service
//!
//! Runs one upload through the pipeline:
//! validate -> normalize -> aggregate -> commit -> evict_excess.
//!
//! Nothing is written unless every stage before `commit` succeeds. Retention
//! eviction runs after the commit and its failure never fails the upload.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::{record_normalizer, row_validator, summary_aggregator};
use crate::domain::equipment::{Dataset, DatasetInput, RawTable};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::DatasetStore;
use crate::infrastructure::decode::TableDecoder;

/// Result of a successful upload
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub dataset: Dataset,
    /// Rows that passed validation but were discarded by the normalizer
    pub dropped_rows: usize,
    /// Datasets of the same owner removed by retention after this commit
    pub evicted_ids: Vec<i64>,
}

pub struct IngestionUseCase {
    store: Arc<dyn DatasetStore>,
    decoder: TableDecoder,
    retention_limit: usize,
}

impl IngestionUseCase {
    pub fn new(store: Arc<dyn DatasetStore>, decoder: TableDecoder, retention_limit: usize) -> Self {
        Self {
            store,
            decoder,
            retention_limit,
        }
    }

    /// Decode raw upload bytes, then ingest the resulting table
    pub async fn ingest_upload(
        &self,
        owner: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<IngestOutcome> {
        let table = self.decoder.decode(filename, bytes)?;
        self.ingest(owner, filename, &table).await
    }

    pub async fn ingest(&self, owner: &str, filename: &str, table: &RawTable) -> Result<IngestOutcome> {
        row_validator::validate(table).map_err(|e| {
            info!(owner, filename, error = %e, "Upload rejected");
            e
        })?;

        let normalized = record_normalizer::normalize(table)?;
        if normalized.is_empty() {
            info!(owner, filename, dropped = normalized.dropped, "Upload has no valid rows");
            return Err(AppError::NoValidRows {
                dropped: normalized.dropped,
            });
        }

        let summary = summary_aggregator::aggregate(&normalized.records)?;
        let input = DatasetInput {
            owner: owner.to_string(),
            filename: filename.to_string(),
            summary,
            dropped_rows: normalized.dropped,
        };

        let dataset = self.store.commit(&input, &normalized.records).await?;

        let evicted_ids = match self.store.evict_excess(owner, self.retention_limit).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(
                    owner,
                    dataset_id = dataset.id,
                    error = %e,
                    "Retention eviction failed; upload kept"
                );
                Vec::new()
            }
        };

        info!(
            owner,
            dataset_id = dataset.id,
            records = dataset.record_count,
            dropped = normalized.dropped,
            evicted = evicted_ids.len(),
            "Dataset ingested"
        );

        Ok(IngestOutcome {
            dataset,
            dropped_rows: normalized.dropped,
            evicted_ids,
        })
    }
}
