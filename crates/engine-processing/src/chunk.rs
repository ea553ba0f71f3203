use connectors::{
    connector::{DataStoreConnector, TableHandle, WriteOptions},
    sql::base::error::DbError,
};
use engine_core::{metrics::Metrics, retry::RetryPolicy};
use model::{pagination::cursor::Cursor, records::chunk::Chunk};
use tracing::debug;

/// Moves one chunk: fetch a window from the source, append it to the
/// destination. A failed attempt redoes both steps.
pub struct ChunkProcessor<'a, S: DataStoreConnector, D: DataStoreConnector> {
    source: &'a TableHandle<'a, S>,
    destination: &'a TableHandle<'a, D>,
    chunk_size: usize,
    retry: RetryPolicy,
    write: &'a WriteOptions,
    metrics: Metrics,
}

impl<'a, S: DataStoreConnector, D: DataStoreConnector> ChunkProcessor<'a, S, D> {
    pub fn new(
        source: &'a TableHandle<'a, S>,
        destination: &'a TableHandle<'a, D>,
        chunk_size: usize,
        retries: usize,
        write: &'a WriteOptions,
    ) -> Self {
        Self {
            source,
            destination,
            chunk_size,
            retry: RetryPolicy::new(retries),
            write,
            metrics: Metrics::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Copies the window at `cursor` and returns how many rows it held.
    /// `0` means the source has nothing left at this position.
    pub async fn process(&self, cursor: &Cursor) -> Result<usize, DbError> {
        let result = self
            .retry
            .run(|attempt| async move {
                let rows = self.source.fetch(cursor, self.chunk_size).await?;
                let chunk = Chunk::new(self.source.name(), cursor.clone(), rows);
                if chunk.is_empty() {
                    return Ok(chunk);
                }

                self.destination.append(&chunk.rows, self.write).await?;
                debug!(chunk = %chunk.id, rows = chunk.len(), attempt, "Chunk appended");
                Ok(chunk)
            })
            .await;

        match result {
            Ok(attempted) => {
                let retries = attempted.retries() as u64;
                let chunk = attempted.value;
                self.metrics.increment_retries(retries);
                if !chunk.is_empty() {
                    self.metrics.increment_rows(chunk.len() as u64);
                    self.metrics.increment_bytes(chunk.size_bytes() as u64);
                    self.metrics.increment_chunks(1);
                }
                Ok(chunk.len())
            }
            Err(err) => {
                self.metrics
                    .increment_retries(self.retry.max_attempts.saturating_sub(1) as u64);
                self.metrics.increment_failures(1);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::MemoryConnector;
    use model::{core::value::Value, records::row::RowData};

    async fn source_with(n: i64) -> MemoryConnector {
        let source = MemoryConnector::new();
        let rows = (1..=n)
            .map(|i| RowData::from_pairs("src", [("pk", Value::Int(i))]))
            .collect();
        source.insert_rows("src", rows).await.unwrap();
        source
    }

    #[tokio::test]
    async fn test_process_copies_window() {
        let source = source_with(5).await;
        let destination = MemoryConnector::new();
        let (src, dst) = (source.table("src"), destination.table("dst"));
        let write = WriteOptions::append();
        let metrics = Metrics::new();
        let processor = ChunkProcessor::new(&src, &dst, 2, 1, &write).with_metrics(metrics.clone());

        let cursor = Cursor::Offset {
            offset: 4,
            order_by: Some("pk".into()),
        };
        assert_eq!(processor.process(&cursor).await.unwrap(), 1);
        assert_eq!(destination.row_count("dst").await.unwrap(), 1);
        assert_eq!(metrics.snapshot().chunks_processed, 1);
    }

    #[tokio::test]
    async fn test_process_end_of_data() {
        let source = source_with(2).await;
        let destination = MemoryConnector::new();
        let (src, dst) = (source.table("src"), destination.table("dst"));
        let write = WriteOptions::append();
        let processor = ChunkProcessor::new(&src, &dst, 10, 1, &write);

        let cursor = Cursor::Offset {
            offset: 2,
            order_by: None,
        };
        assert_eq!(processor.process(&cursor).await.unwrap(), 0);
        assert!(!destination.table_exists("dst").await.unwrap());
    }
}
