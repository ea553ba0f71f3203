use crate::{
    chunk::ChunkProcessor,
    consistency::ConsistencyChecker,
    error::{DataIntegrityViolation, SyncError},
    job::{IfExists, SyncJob, SyncKind, SyncMode, SyncOptions, SyncOutcome, SyncReport},
};
use connectors::connector::{DataStoreConnector, TableHandle};
use engine_core::metrics::{Metrics, MetricsSnapshot};
use model::{core::value::Value, pagination::cursor::Cursor};
use std::cmp::Ordering;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// Replicates tables from `source` into `destination`. Chunks are copied
/// one after another; nothing is spawned.
pub struct SyncEngine<S: DataStoreConnector, D: DataStoreConnector> {
    source: S,
    destination: D,
    metrics: Metrics,
}

impl<S: DataStoreConnector, D: DataStoreConnector> SyncEngine<S, D> {
    pub fn new(source: S, destination: D) -> Self {
        Self {
            source,
            destination,
            metrics: Metrics::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    pub async fn run(&self, job: &SyncJob) -> Result<SyncReport, SyncError> {
        match &job.mode {
            SyncMode::Full {
                if_exists,
                order_by,
            } => {
                self.table_sync_full(
                    &job.source_table,
                    &job.destination_table,
                    *if_exists,
                    order_by.as_deref(),
                    &job.options,
                )
                .await
            }
            SyncMode::Incremental {
                primary_key,
                distinct_check,
            } => {
                self.table_sync_incremental(
                    &job.source_table,
                    &job.destination_table,
                    primary_key,
                    *distinct_check,
                    &job.options,
                )
                .await
            }
        }
    }

    /// Replaces the destination's contents with the source's.
    pub async fn table_sync_full(
        &self,
        source_table: &str,
        destination_table: &str,
        if_exists: IfExists,
        order_by: Option<&str>,
        options: &SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        let span = info_span!(
            "table_sync_full",
            run_id = %Uuid::new_v4(),
            source = source_table,
            destination = destination_table,
            %if_exists,
        );
        self.full(source_table, destination_table, if_exists, order_by, options)
            .instrument(span)
            .await
    }

    /// Appends source rows whose `primary_key` is above the destination's
    /// current maximum.
    pub async fn table_sync_incremental(
        &self,
        source_table: &str,
        destination_table: &str,
        primary_key: &str,
        distinct_check: bool,
        options: &SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        let span = info_span!(
            "table_sync_incremental",
            run_id = %Uuid::new_v4(),
            source = source_table,
            destination = destination_table,
            primary_key,
        );
        self.incremental(
            source_table,
            destination_table,
            primary_key,
            distinct_check,
            options,
        )
        .instrument(span)
        .await
    }

    async fn full(
        &self,
        source_table: &str,
        destination_table: &str,
        if_exists: IfExists,
        order_by: Option<&str>,
        options: &SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        options.validate()?;
        let start = self.metrics.snapshot();
        let report = SyncReport::new(SyncKind::Full, source_table, destination_table);

        let source = self.source.table(source_table);
        let destination = self.destination.table(destination_table);

        if destination.exists().await? {
            self.prepare_destination(&source, &destination, if_exists)
                .await?;
        }

        let total = source.num_rows().await?;
        if total == 0 {
            info!("Source table is empty, nothing to copy");
            return Ok(report.with_outcome(SyncOutcome::EmptySource));
        }

        info!(rows = total, chunk_size = options.chunk_size, "Starting full sync");
        let processor = self.processor(&source, &destination, options);
        let mut cursor = Cursor::Offset {
            offset: 0,
            order_by: order_by.map(str::to_string),
        };
        let mut copied = 0u64;

        while copied < total {
            let rows = processor.process(&cursor).await?;
            if rows == 0 {
                warn!(
                    copied,
                    expected = total,
                    "Source ran out of rows before the captured row count"
                );
                break;
            }
            copied += rows as u64;
            cursor = cursor.advance(rows);
            info!(copied, total, "Chunk copied");
        }

        self.finish(report, start, &source, &destination, options)
            .await
    }

    async fn prepare_destination(
        &self,
        source: &TableHandle<'_, S>,
        destination: &TableHandle<'_, D>,
        if_exists: IfExists,
    ) -> Result<(), SyncError> {
        match if_exists {
            IfExists::Drop => {
                info!("Dropping destination table");
                destination.drop_table().await?;
            }
            IfExists::Truncate => {
                ConsistencyChecker::new(source, destination)
                    .check_columns()
                    .await?;
                info!("Truncating destination table");
                destination.truncate().await?;
            }
            IfExists::DropIfNeeded => {
                match ConsistencyChecker::new(source, destination)
                    .check_columns()
                    .await
                {
                    Ok(()) => {
                        info!("Truncating destination table");
                        destination.truncate().await?;
                    }
                    // Only a schema difference drops; other errors propagate.
                    Err(error @ SyncError::SchemaMismatch { .. }) => {
                        warn!(%error, "Columns differ, dropping destination table");
                        destination.drop_table().await?;
                    }
                    Err(error) => return Err(error),
                }
            }
        }
        Ok(())
    }

    async fn incremental(
        &self,
        source_table: &str,
        destination_table: &str,
        primary_key: &str,
        distinct_check: bool,
        options: &SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        options.validate()?;

        let source = self.source.table(source_table);
        let destination = self.destination.table(destination_table);

        if !destination.exists().await? {
            info!("Destination table does not exist, running a full sync instead");
            return self
                .full(
                    source_table,
                    destination_table,
                    IfExists::Drop,
                    Some(primary_key),
                    options,
                )
                .await;
        }

        let start = self.metrics.snapshot();
        let report = SyncReport::new(SyncKind::Incremental, source_table, destination_table);

        if source.num_rows().await? == 0 {
            info!("Source table is empty, nothing to copy");
            return Ok(report.with_outcome(SyncOutcome::EmptySource));
        }

        if distinct_check && !source.distinct_primary_key(primary_key).await? {
            return Err(DataIntegrityViolation::NonDistinctKey {
                table: source_table.to_string(),
                primary_key: primary_key.to_string(),
            }
            .into());
        }

        let source_max = source.max_primary_key(primary_key).await?;
        let destination_max = destination.max_primary_key(primary_key).await?;

        let position = compare_watermarks(
            destination_table,
            primary_key,
            source_max.as_ref(),
            destination_max.as_ref(),
        )?;
        if position == Watermark::InSync {
            info!("Tables are in sync");
            return Ok(report.with_outcome(SyncOutcome::AlreadyInSync));
        }

        let pending = source
            .new_rows_count(primary_key, destination_max.as_ref())
            .await?;
        info!(
            pending,
            watermark = ?destination_max,
            chunk_size = options.chunk_size,
            "Starting incremental sync"
        );

        let processor = self.processor(&source, &destination, options);
        let mut cursor = Cursor::Watermark {
            column: primary_key.to_string(),
            after: destination_max,
            offset: 0,
        };
        let mut copied = 0u64;

        // An empty fetch is the only way out; the pending count is advisory.
        loop {
            let rows = processor.process(&cursor).await?;
            if rows == 0 {
                break;
            }
            copied += rows as u64;
            cursor = cursor.advance(rows);
            info!(copied, pending, "Chunk copied");
        }

        self.finish(report, start, &source, &destination, options)
            .await
    }

    fn processor<'a>(
        &self,
        source: &'a TableHandle<'a, S>,
        destination: &'a TableHandle<'a, D>,
        options: &'a SyncOptions,
    ) -> ChunkProcessor<'a, S, D> {
        ChunkProcessor::new(
            source,
            destination,
            options.chunk_size,
            options.retries,
            &options.write,
        )
        .with_metrics(self.metrics.clone())
    }

    async fn finish(
        &self,
        mut report: SyncReport,
        start: MetricsSnapshot,
        source: &TableHandle<'_, S>,
        destination: &TableHandle<'_, D>,
        options: &SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        let delta = self.metrics.snapshot().since(&start);
        report.rows_copied = delta.rows_copied;
        report.chunks = delta.chunks_processed;
        report.retries = delta.retry_count;

        if options.verify_row_count {
            let matched = ConsistencyChecker::new(source, destination)
                .verify_row_count()
                .await;
            report.row_count_match = Some(matched);
        }

        info!(
            rows = report.rows_copied,
            chunks = report.chunks,
            retries = report.retries,
            "Sync finished"
        );
        Ok(report)
    }
}

/// Where the destination watermark stands relative to the source's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Watermark {
    Behind,
    InSync,
}

/// A destination ahead of the source is an error, never a position.
fn compare_watermarks(
    table: &str,
    primary_key: &str,
    source_max: Option<&Value>,
    destination_max: Option<&Value>,
) -> Result<Watermark, DataIntegrityViolation> {
    let ahead = |source_max: Option<&Value>, destination_max: &Value| {
        DataIntegrityViolation::DestinationAhead {
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            source_max: source_max.cloned().unwrap_or(Value::Null),
            destination_max: destination_max.clone(),
        }
    };

    match (destination_max, source_max) {
        (None, None) => Ok(Watermark::InSync),
        (None, Some(_)) => Ok(Watermark::Behind),
        // Source rows exist but none has a key, so any destination key is ahead.
        (Some(dest), None) => Err(ahead(None, dest)),
        (Some(dest), Some(src)) => match dest.compare(src) {
            Some(Ordering::Greater) => Err(ahead(Some(src), dest)),
            Some(Ordering::Equal) => Ok(Watermark::InSync),
            Some(Ordering::Less) => Ok(Watermark::Behind),
            None => Err(DataIntegrityViolation::IncomparableWatermarks {
                primary_key: primary_key.to_string(),
                source_max: src.clone(),
                destination_max: dest.clone(),
            }),
        },
    }
}
