mod connection;
mod datasets;

pub use connection::EquipmentDb;
pub use datasets::DatasetRepository;

use crate::domain::equipment::{Dataset, DatasetInput, EquipmentRecord};
use crate::domain::error::Result;
use async_trait::async_trait;

/// Owner-scoped persistence for committed datasets.
///
/// Every lookup filters on `owner` inside the query, so a dataset that
/// exists for someone else is reported exactly like one that does not exist.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Create the dataset and all of its records as one unit of work.
    async fn commit(&self, input: &DatasetInput, records: &[EquipmentRecord]) -> Result<Dataset>;

    /// Delete every dataset of `owner` beyond the `keep` most recent ones.
    /// Returns the evicted ids.
    async fn evict_excess(&self, owner: &str, keep: usize) -> Result<Vec<i64>>;

    async fn fetch(&self, id: i64, owner: &str) -> Result<Dataset>;

    /// Dataset plus its first `sample` records (stored order), read consistently.
    async fn fetch_with_sample(
        &self,
        id: i64,
        owner: &str,
        sample: usize,
    ) -> Result<(Dataset, Vec<EquipmentRecord>)>;

    async fn delete(&self, id: i64, owner: &str) -> Result<()>;

    /// Newest first.
    async fn list(&self, owner: &str, limit: Option<usize>) -> Result<Vec<Dataset>>;

    async fn records(
        &self,
        id: i64,
        owner: &str,
        limit: Option<usize>,
    ) -> Result<Vec<EquipmentRecord>>;
}
