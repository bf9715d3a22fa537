use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::{Sqlite, Transaction};

use crate::domain::equipment::{Dataset, DatasetInput, EquipmentRecord};
use crate::domain::error::{AppError, Result};

use super::{DatasetStore, EquipmentDb};

const DATASET_COLUMNS: &str = "id, owner, filename, created_at, record_count, avg_flowrate, \
     avg_pressure, avg_temperature, type_distribution, field_stats, dropped_rows";

/// SQLite-backed dataset repository
pub struct DatasetRepository {
    pool: SqlitePool,
}

impl DatasetRepository {
    pub fn new(db: &EquipmentDb) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::PersistenceError(format!("Failed to begin transaction: {e}")))
    }
}

#[async_trait]
impl DatasetStore for DatasetRepository {
    async fn commit(&self, input: &DatasetInput, records: &[EquipmentRecord]) -> Result<Dataset> {
        check_consistency(input, records)?;

        let summary = &input.summary;
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let type_distribution = serde_json::to_string(&summary.type_distribution).map_err(|e| {
            AppError::PersistenceError(format!("Failed to encode type distribution: {e}"))
        })?;
        let field_stats = serde_json::to_string(&summary.stats).map_err(|e| {
            AppError::PersistenceError(format!("Failed to encode field stats: {e}"))
        })?;

        let mut tx = self.begin().await?;

        let dataset_id = sqlx::query(
            "INSERT INTO datasets (owner, filename, created_at, record_count, avg_flowrate, \
             avg_pressure, avg_temperature, type_distribution, field_stats, dropped_rows) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.owner)
        .bind(&input.filename)
        .bind(&created_at)
        .bind(summary.record_count as i64)
        .bind(summary.stats.flowrate.mean)
        .bind(summary.stats.pressure.mean)
        .bind(summary.stats.temperature.mean)
        .bind(&type_distribution)
        .bind(&field_stats)
        .bind(input.dropped_rows as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::PersistenceError(format!("Failed to insert dataset: {e}")))?
        .last_insert_rowid();

        for (row_index, record) in records.iter().enumerate() {
            sqlx::query(
                "INSERT INTO equipment_records (dataset_id, row_index, equipment_name, \
                 equipment_type, flowrate, pressure, temperature) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(dataset_id)
            .bind(row_index as i64)
            .bind(&record.name)
            .bind(&record.equipment_type)
            .bind(record.flowrate)
            .bind(record.pressure)
            .bind(record.temperature)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::PersistenceError(format!(
                    "Failed to insert equipment record {row_index}: {e}"
                ))
            })?;
        }

        let dataset = select_dataset(&mut tx, dataset_id, &input.owner).await?;

        tx.commit().await.map_err(|e| {
            AppError::PersistenceError(format!("Failed to commit transaction: {e}"))
        })?;

        tracing::info!(
            dataset_id,
            owner = %input.owner,
            records = records.len(),
            "Committed dataset"
        );

        Ok(dataset)
    }

    async fn evict_excess(&self, owner: &str, keep: usize) -> Result<Vec<i64>> {
        let mut tx = self.begin().await?;

        let excess: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM datasets WHERE owner = ? \
             ORDER BY created_at DESC, id DESC LIMIT -1 OFFSET ?",
        )
        .bind(owner)
        .bind(keep as i64)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::PersistenceError(format!("Failed to list excess datasets: {e}")))?;

        for id in &excess {
            sqlx::query("DELETE FROM datasets WHERE id = ? AND owner = ?")
                .bind(id)
                .bind(owner)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::PersistenceError(format!("Failed to evict dataset {id}: {e}"))
                })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::PersistenceError(format!("Failed to commit transaction: {e}"))
        })?;

        if !excess.is_empty() {
            tracing::info!(owner, keep, evicted = ?excess, "Evicted datasets beyond retention cap");
        }

        Ok(excess)
    }

    async fn fetch(&self, id: i64, owner: &str) -> Result<Dataset> {
        let mut tx = self.begin().await?;
        let dataset = select_dataset(&mut tx, id, owner).await?;
        end_read(tx).await?;
        Ok(dataset)
    }

    async fn fetch_with_sample(
        &self,
        id: i64,
        owner: &str,
        sample: usize,
    ) -> Result<(Dataset, Vec<EquipmentRecord>)> {
        // One read transaction so a concurrent delete is seen entirely or not at all.
        let mut tx = self.begin().await?;
        let dataset = select_dataset(&mut tx, id, owner).await?;
        let records = select_records(&mut tx, id, Some(sample)).await?;
        end_read(tx).await?;
        Ok((dataset, records))
    }

    async fn delete(&self, id: i64, owner: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM datasets WHERE id = ? AND owner = ?")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::PersistenceError(format!("Failed to delete dataset: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        tracing::info!(dataset_id = id, owner, "Deleted dataset");
        Ok(())
    }

    async fn list(&self, owner: &str, limit: Option<usize>) -> Result<Vec<Dataset>> {
        let sql = format!(
            "SELECT {DATASET_COLUMNS} FROM datasets WHERE owner = ? \
             ORDER BY created_at DESC, id DESC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, DatasetEntity>(&sql)
            .bind(owner)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::PersistenceError(format!("Failed to list datasets: {e}")))?;

        rows.into_iter().map(Dataset::try_from).collect()
    }

    async fn records(
        &self,
        id: i64,
        owner: &str,
        limit: Option<usize>,
    ) -> Result<Vec<EquipmentRecord>> {
        let mut tx = self.begin().await?;
        select_dataset(&mut tx, id, owner).await?;
        let records = select_records(&mut tx, id, limit).await?;
        end_read(tx).await?;
        Ok(records)
    }
}

fn check_consistency(input: &DatasetInput, records: &[EquipmentRecord]) -> Result<()> {
    let summary = &input.summary;
    let distributed: i64 = summary.type_distribution.values().sum();

    if summary.record_count != records.len() || distributed != records.len() as i64 {
        return Err(AppError::PersistenceError(format!(
            "Summary does not match records (record_count={}, distribution total={}, records={})",
            summary.record_count,
            distributed,
            records.len()
        )));
    }
    Ok(())
}

async fn select_dataset(tx: &mut Transaction<'_, Sqlite>, id: i64, owner: &str) -> Result<Dataset> {
    let sql = format!("SELECT {DATASET_COLUMNS} FROM datasets WHERE id = ? AND owner = ?");
    let row = sqlx::query_as::<_, DatasetEntity>(&sql)
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::PersistenceError(format!("Failed to fetch dataset: {e}")))?;

    match row {
        Some(entity) => entity.try_into(),
        None => Err(not_found(id)),
    }
}

async fn select_records(
    tx: &mut Transaction<'_, Sqlite>,
    dataset_id: i64,
    limit: Option<usize>,
) -> Result<Vec<EquipmentRecord>> {
    let rows = sqlx::query_as::<_, EquipmentRecordEntity>(
        "SELECT equipment_name, equipment_type, flowrate, pressure, temperature \
         FROM equipment_records WHERE dataset_id = ? ORDER BY row_index ASC LIMIT ?",
    )
    .bind(dataset_id)
    .bind(sql_limit(limit))
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| AppError::PersistenceError(format!("Failed to list equipment records: {e}")))?;

    Ok(rows.into_iter().map(|e| e.into()).collect())
}

async fn end_read(tx: Transaction<'_, Sqlite>) -> Result<()> {
    tx.commit()
        .await
        .map_err(|e| AppError::PersistenceError(format!("Failed to end read transaction: {e}")))
}

/// Same message whether the dataset is missing or belongs to someone else.
fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Dataset {} not found", id))
}

/// SQLite treats a negative LIMIT as "no limit".
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|l| l as i64).unwrap_or(-1)
}

#[derive(sqlx::FromRow)]
struct DatasetEntity {
    id: i64,
    owner: String,
    filename: String,
    created_at: String,
    record_count: i64,
    avg_flowrate: f64,
    avg_pressure: f64,
    avg_temperature: f64,
    type_distribution: String,
    field_stats: String,
    dropped_rows: i64,
}

impl TryFrom<DatasetEntity> for Dataset {
    type Error = AppError;

    fn try_from(entity: DatasetEntity) -> Result<Self> {
        let created_at = DateTime::parse_from_rfc3339(&entity.created_at)
            .map_err(|e| {
                AppError::PersistenceError(format!(
                    "Dataset {} has invalid created_at: {e}",
                    entity.id
                ))
            })?
            .with_timezone(&Utc);
        let type_distribution = serde_json::from_str(&entity.type_distribution).map_err(|e| {
            AppError::PersistenceError(format!(
                "Dataset {} has invalid type distribution: {e}",
                entity.id
            ))
        })?;
        let field_stats = serde_json::from_str(&entity.field_stats).map_err(|e| {
            AppError::PersistenceError(format!(
                "Dataset {} has invalid field stats: {e}",
                entity.id
            ))
        })?;

        Ok(Self {
            id: entity.id,
            owner: entity.owner,
            filename: entity.filename,
            created_at,
            record_count: entity.record_count,
            avg_flowrate: entity.avg_flowrate,
            avg_pressure: entity.avg_pressure,
            avg_temperature: entity.avg_temperature,
            type_distribution,
            field_stats,
            dropped_rows: entity.dropped_rows,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EquipmentRecordEntity {
    equipment_name: String,
    equipment_type: String,
    flowrate: f64,
    pressure: f64,
    temperature: f64,
}

impl From<EquipmentRecordEntity> for EquipmentRecord {
    fn from(entity: EquipmentRecordEntity) -> Self {
        Self {
            name: entity.equipment_name,
            equipment_type: entity.equipment_type,
            flowrate: entity.flowrate,
            pressure: entity.pressure,
            temperature: entity.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::summary_aggregator::aggregate;

    async fn repository() -> (tempfile::TempDir, DatasetRepository) {
        let dir = tempfile::tempdir().unwrap();
        let db = EquipmentDb::connect(&dir.path().join("equipment.db"))
            .await
            .unwrap();
        (dir, DatasetRepository::new(&db))
    }

    fn record(name: &str, ty: &str, flow: f64) -> EquipmentRecord {
        EquipmentRecord {
            name: name.to_string(),
            equipment_type: ty.to_string(),
            flowrate: flow,
            pressure: 10.0,
            temperature: 300.0,
        }
    }

    fn input(owner: &str, filename: &str, records: &[EquipmentRecord]) -> DatasetInput {
        DatasetInput {
            owner: owner.to_string(),
            filename: filename.to_string(),
            summary: aggregate(records).unwrap(),
            dropped_rows: 0,
        }
    }

    async fn commit_n(repo: &DatasetRepository, owner: &str, n: usize) -> Vec<i64> {
        let records = vec![record("P-1", "Pump", 1.0)];
        let mut ids = Vec::new();
        for i in 0..n {
            let ds = repo
                .commit(&input(owner, &format!("upload-{i}.csv"), &records), &records)
                .await
                .unwrap();
            ids.push(ds.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_commit_and_fetch_round_trip() {
        let (_dir, repo) = repository().await;
        let records = vec![
            record("Pump-1", "Pump", 45.2),
            record("Valve-1", "Valve", 0.0),
        ];

        let committed = repo
            .commit(&input("alice", "plant.csv", &records), &records)
            .await
            .unwrap();
        assert_eq!(committed.record_count, 2);
        assert_eq!(committed.avg_flowrate, 22.6);

        let fetched = repo.fetch(committed.id, "alice").await.unwrap();
        assert_eq!(fetched, committed);

        let stored = repo.records(committed.id, "alice", None).await.unwrap();
        assert_eq!(stored, records);
    }

    #[tokio::test]
    async fn test_fetch_is_owner_scoped() {
        let (_dir, repo) = repository().await;
        let id = commit_n(&repo, "alice", 1).await[0];

        let err = repo.fetch(id, "mallory").await.unwrap_err();
        let missing = repo.fetch(id + 100, "alice").await.unwrap_err();
        assert_eq!(err, AppError::NotFound(format!("Dataset {} not found", id)));
        assert!(matches!(missing, AppError::NotFound(_)));

        assert!(matches!(
            repo.delete(id, "mallory").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.records(id, "mallory", None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_write_leaves_nothing_behind() {
        let (_dir, repo) = repository().await;
        let good = record("Pump-1", "Pump", 1.0);
        let mut bad = record("Pump-2", "Pump", 1.0);
        let records = vec![good.clone(), bad.clone()];
        let input = input("alice", "plant.csv", &records);

        bad.flowrate = -1.0;
        let err = repo.commit(&input, &[good, bad]).await.unwrap_err();
        assert!(matches!(err, AppError::PersistenceError(_)));

        assert!(repo.list("alice", None).await.unwrap().is_empty());
        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM equipment_records")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_inconsistent_summary_is_rejected() {
        let (_dir, repo) = repository().await;
        let records = vec![record("Pump-1", "Pump", 1.0)];
        let input = input("alice", "plant.csv", &records);

        let err = repo.commit(&input, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::PersistenceError(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_and_fetch_after_delete_is_not_found() {
        let (_dir, repo) = repository().await;
        let id = commit_n(&repo, "alice", 1).await[0];

        repo.delete(id, "alice").await.unwrap();

        assert!(matches!(repo.fetch(id, "alice").await, Err(AppError::NotFound(_))));
        assert!(matches!(
            repo.fetch_with_sample(id, "alice", 20).await,
            Err(AppError::NotFound(_))
        ));
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM equipment_records")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_evict_keeps_most_recent() {
        let (_dir, repo) = repository().await;
        let ids = commit_n(&repo, "alice", 6).await;
        let other = commit_n(&repo, "bob", 1).await;

        let evicted = repo.evict_excess("alice", 5).await.unwrap();
        assert_eq!(evicted, vec![ids[0]]);

        assert!(matches!(repo.fetch(ids[0], "alice").await, Err(AppError::NotFound(_))));
        let kept: Vec<i64> = repo
            .list("alice", None)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(kept, ids[1..].iter().rev().copied().collect::<Vec<_>>());

        // Other owners are untouched; a second pass is a no-op.
        assert!(repo.fetch(other[0], "bob").await.is_ok());
        assert!(repo.evict_excess("alice", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sample_is_first_rows_in_stored_order() {
        let (_dir, repo) = repository().await;
        let records: Vec<_> = (0..25)
            .map(|i| record(&format!("E-{i:02}"), "Pump", i as f64))
            .collect();
        let ds = repo
            .commit(&input("alice", "big.csv", &records), &records)
            .await
            .unwrap();

        let (dataset, sample) = repo.fetch_with_sample(ds.id, "alice", 20).await.unwrap();
        assert_eq!(dataset.record_count, 25);
        assert_eq!(sample.len(), 20);
        assert_eq!(sample[0].name, "E-00");
        assert_eq!(sample[19].name, "E-19");

        let history = repo.list("alice", Some(1)).await.unwrap();
        assert_eq!(history.len(), 1);
    }
}
