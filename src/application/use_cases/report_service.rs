//! Report Service: owner-checked fetch of a dataset and its sample, then render.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::report_renderer::ReportRenderer;
use crate::domain::error::Result;
use crate::infrastructure::db::DatasetStore;

#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    /// Suggested download name, `equipment_report_{filename}_{id}.pdf`
    pub file_name: String,
}

pub struct ReportService {
    store: Arc<dyn DatasetStore>,
    renderer: ReportRenderer,
}

impl ReportService {
    pub fn new(store: Arc<dyn DatasetStore>, renderer: ReportRenderer) -> Self {
        Self { store, renderer }
    }

    /// Fails with `NotFound` when `id` does not resolve for `owner`.
    pub async fn render_report(
        &self,
        id: i64,
        owner: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<RenderedReport> {
        let (dataset, sample) = self
            .store
            .fetch_with_sample(id, owner, self.renderer.sample_cap())
            .await?;

        let bytes = self.renderer.render(&dataset, &sample, generated_at)?;
        info!(owner, dataset_id = id, bytes = bytes.len(), "Report generated");

        Ok(RenderedReport {
            file_name: dataset.report_file_name(),
            bytes,
        })
    }
}
