#[cfg(test)]
mod tests {
    use crate::utils::{DEST, FlakyConnector, SOURCE, contents, memory_with, row, rows};
    use connectors::{
        connector::DataStoreConnector, memory::MemoryConnector, sql::base::error::DbError,
    };
    use engine_processing::{
        engine::SyncEngine,
        error::SyncError,
        job::{IfExists, SyncJob, SyncOptions, SyncOutcome},
    };
    use model::{core::value::Value, records::row::RowData};
    use tracing_test::traced_test;

    fn options(chunk_size: usize) -> SyncOptions {
        SyncOptions::default().with_chunk_size(chunk_size)
    }

    // Scenario: sources of 0, 1, chunk_size, chunk_size + 1 and 10 * chunk_size rows.
    // Expected Outcome: the destination holds exactly the source rows, in order.
    #[tokio::test]
    async fn test_full_sync_completeness() {
        for chunk_size in [1usize, 3, 7] {
            for n in [0, 1, chunk_size, chunk_size + 1, 10 * chunk_size] {
                let source = memory_with(SOURCE, rows(n as i64)).await;
                let destination = MemoryConnector::new();
                let engine = SyncEngine::new(source.clone(), destination.clone());

                let report = engine
                    .table_sync_full(SOURCE, DEST, IfExists::Drop, Some("pk"), &options(chunk_size))
                    .await
                    .unwrap();

                assert_eq!(
                    contents(&destination, DEST).await,
                    contents(&source, SOURCE).await,
                    "chunk_size={chunk_size} n={n}"
                );
                assert_eq!(report.rows_copied, n as u64);
                assert_eq!(report.chunks, n.div_ceil(chunk_size) as u64);
                if n == 0 {
                    assert_eq!(report.outcome, SyncOutcome::EmptySource);
                }
            }
        }
    }

    // Scenario: the worked example, three rows copied two at a time into a
    // missing destination, then an incremental run on `pk`.
    // Expected Outcome: all three rows arrive; the incremental run copies nothing.
    #[traced_test]
    #[tokio::test]
    async fn test_full_then_incremental_scenario() {
        let source = memory_with(SOURCE, vec![row(1, "a"), row(2, "b"), row(3, "c")]).await;
        let destination = MemoryConnector::new();
        let engine = SyncEngine::new(source, destination.clone());
        let opts = options(2);

        let full = engine
            .table_sync_full(SOURCE, DEST, IfExists::Drop, None, &opts)
            .await
            .unwrap();
        assert_eq!(full.rows_copied, 3);
        assert_eq!(full.chunks, 2);
        assert_eq!(full.row_count_match, Some(true));
        assert_eq!(
            contents(&destination, DEST).await,
            vec![
                (Value::Int(1), Value::from("a")),
                (Value::Int(2), Value::from("b")),
                (Value::Int(3), Value::from("c")),
            ]
        );

        let incremental = engine
            .table_sync_incremental(SOURCE, DEST, "pk", true, &opts)
            .await
            .unwrap();
        assert_eq!(incremental.outcome, SyncOutcome::AlreadyInSync);
        assert_eq!(incremental.rows_copied, 0);
        assert_eq!(destination.row_count(DEST).await.unwrap(), 3);
        assert!(logs_contain("Tables are in sync"));
    }

    // Scenario: destination exists with different columns, if_exists = truncate.
    // Expected Outcome: SchemaMismatch, destination rows untouched.
    #[tokio::test]
    async fn test_truncate_requires_matching_columns() {
        let source = memory_with(SOURCE, rows(3)).await;
        let destination = memory_with(
            DEST,
            vec![RowData::from_pairs(DEST, [("pk", Value::Int(9)), ("other", Value::Int(0))])],
        )
        .await;
        let flaky = FlakyConnector::new(destination.clone());
        let engine = SyncEngine::new(source, flaky);

        let err = engine
            .table_sync_full(SOURCE, DEST, IfExists::Truncate, None, &options(10))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::SchemaMismatch { .. }));
        assert_eq!(destination.row_count(DEST).await.unwrap(), 1);
        assert_eq!(
            destination.columns(DEST).await.unwrap(),
            vec!["pk".to_string(), "other".to_string()]
        );
    }

    // Scenario: destination exists with the same columns, if_exists = truncate.
    // Expected Outcome: old rows replaced, table kept.
    #[tokio::test]
    async fn test_truncate_keeps_table() {
        let source = memory_with(SOURCE, rows(4)).await;
        let destination = memory_with(DEST, vec![row(100, "stale")]).await;
        let engine = SyncEngine::new(source.clone(), destination.clone());

        engine
            .table_sync_full(SOURCE, DEST, IfExists::Truncate, Some("pk"), &options(3))
            .await
            .unwrap();

        assert_eq!(
            contents(&destination, DEST).await,
            contents(&source, SOURCE).await
        );
    }

    // Scenario: truncate requested, source empty.
    // Expected Outcome: destination emptied but still present.
    #[tokio::test]
    async fn test_empty_source_leaves_truncated_destination() {
        let source = MemoryConnector::new();
        source.create_table(SOURCE, &["pk", "v"]).await;
        let destination = memory_with(DEST, rows(2)).await;
        let engine = SyncEngine::new(source, destination.clone());

        let report = engine
            .table_sync_full(SOURCE, DEST, IfExists::Truncate, None, &options(5))
            .await
            .unwrap();

        assert_eq!(report.outcome, SyncOutcome::EmptySource);
        assert!(destination.table_exists(DEST).await.unwrap());
        assert_eq!(destination.row_count(DEST).await.unwrap(), 0);
    }

    // Scenario: drop_if_needed against a destination with other columns.
    // Expected Outcome: destination dropped and rebuilt from the source rows.
    #[traced_test]
    #[tokio::test]
    async fn test_drop_if_needed_falls_back_to_drop() {
        let source = memory_with(SOURCE, rows(3)).await;
        let destination = memory_with(
            DEST,
            vec![RowData::from_pairs(DEST, [("legacy", Value::Int(1))])],
        )
        .await;
        let engine = SyncEngine::new(source.clone(), destination.clone());

        engine
            .table_sync_full(SOURCE, DEST, IfExists::DropIfNeeded, None, &options(2))
            .await
            .unwrap();

        assert_eq!(
            destination.columns(DEST).await.unwrap(),
            vec!["pk".to_string(), "v".to_string()]
        );
        assert_eq!(
            contents(&destination, DEST).await,
            contents(&source, SOURCE).await
        );
        assert!(logs_contain("Columns differ, dropping destination table"));
    }

    // Scenario: drop_if_needed against a destination with the same columns
    // and stale rows.
    // Expected Outcome: the table is truncated and kept, never dropped.
    #[traced_test]
    #[tokio::test]
    async fn test_drop_if_needed_truncates_matching_table() {
        let source = memory_with(SOURCE, rows(3)).await;
        let destination = memory_with(DEST, vec![row(40, "stale"), row(41, "stale")]).await;
        let engine = SyncEngine::new(source.clone(), destination.clone());

        let report = engine
            .table_sync_full(SOURCE, DEST, IfExists::DropIfNeeded, Some("pk"), &options(2))
            .await
            .unwrap();

        assert_eq!(report.rows_copied, 3);
        assert_eq!(
            contents(&destination, DEST).await,
            contents(&source, SOURCE).await
        );
        assert!(logs_contain("Truncating destination table"));
        assert!(!logs_contain("Columns differ"));
        assert!(!logs_contain("Dropping destination table"));
    }

    // Scenario: drop_if_needed while the destination cannot list its columns.
    // Expected Outcome: the connector error surfaces and nothing is dropped.
    #[tokio::test]
    async fn test_drop_if_needed_does_not_drop_on_connector_error() {
        let source = memory_with(SOURCE, rows(3)).await;
        let destination = memory_with(DEST, vec![row(1, "keep")]).await;
        let engine = SyncEngine::new(source, BrokenColumns(destination.clone()));

        let err = engine
            .table_sync_full(SOURCE, DEST, IfExists::DropIfNeeded, None, &options(2))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Connector(DbError::Unknown(_))));
        assert_eq!(destination.row_count(DEST).await.unwrap(), 1);
    }

    // Scenario: destination fails its first k appends.
    // Expected Outcome: retries >= k + 1 succeeds with every row; retries <= k
    // surfaces the injected error unchanged.
    #[traced_test]
    #[tokio::test]
    async fn test_retry_then_succeed() {
        for k in [1usize, 2] {
            let source = memory_with(SOURCE, rows(5)).await;
            let destination = FlakyConnector::new(MemoryConnector::new()).fail_appends(k);
            let engine = SyncEngine::new(source, destination.clone());

            let report = engine
                .table_sync_full(
                    SOURCE,
                    DEST,
                    IfExists::Drop,
                    Some("pk"),
                    &options(2).with_retries(k + 1),
                )
                .await
                .unwrap();

            assert_eq!(report.rows_copied, 5);
            assert_eq!(report.retries, k as u64);
            assert_eq!(destination.inner().row_count(DEST).await.unwrap(), 5);
        }
        assert!(logs_contain("Attempt failed, retrying"));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        for k in [1usize, 3] {
            let source = memory_with(SOURCE, rows(5)).await;
            let destination = FlakyConnector::new(MemoryConnector::new()).fail_appends(k);
            let engine = SyncEngine::new(source, destination.clone());

            let err = engine
                .table_sync_full(SOURCE, DEST, IfExists::Drop, None, &options(2).with_retries(k))
                .await
                .unwrap_err();

            match err {
                SyncError::Connector(DbError::Write(message)) => {
                    assert_eq!(message, "injected append failure")
                }
                other => panic!("unexpected error: {other:?}"),
            }
            assert!(!destination.inner().table_exists(DEST).await.unwrap());
            assert_eq!(engine.metrics().snapshot().failure_count, 1);
        }
        assert!(logs_contain("Retry budget exhausted"));
    }

    // Scenario: the source reports more rows than it can return, as when rows
    // are deleted after the count is taken.
    // Expected Outcome: the copy stops at the first empty chunk with a
    // warning, having copied every real row.
    #[traced_test]
    #[tokio::test]
    async fn test_full_sync_stops_when_source_runs_dry() {
        let source = FlakyConnector::new(memory_with(SOURCE, rows(3)).await).overstate_row_count(5);
        let destination = MemoryConnector::new();
        let engine = SyncEngine::new(source, destination.clone());

        let report = engine
            .table_sync_full(SOURCE, DEST, IfExists::Drop, Some("pk"), &options(2))
            .await
            .unwrap();

        assert_eq!(report.rows_copied, 3);
        assert_eq!(report.chunks, 2);
        assert_eq!(report.row_count_match, Some(false));
        assert_eq!(destination.row_count(DEST).await.unwrap(), 3);
        assert!(logs_contain("Source ran out of rows"));
    }

    // Scenario: the first chunk's fetch fails once.
    // Expected Outcome: the whole chunk is redone, no row is duplicated.
    #[tokio::test]
    async fn test_failed_fetch_redoes_chunk() {
        let source = FlakyConnector::new(memory_with(SOURCE, rows(4)).await).fail_fetches(1);
        let destination = MemoryConnector::new();
        let engine = SyncEngine::new(source, destination.clone());

        engine
            .table_sync_full(SOURCE, DEST, IfExists::Drop, Some("pk"), &options(3).with_retries(2))
            .await
            .unwrap();

        assert_eq!(destination.row_count(DEST).await.unwrap(), 4);
        assert!(destination.distinct_primary_key(DEST, "pk").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_options_fail_before_io() {
        let source = FlakyConnector::new(memory_with(SOURCE, rows(2)).await);
        let destination = FlakyConnector::new(MemoryConnector::new());
        let engine = SyncEngine::new(source.clone(), destination.clone());

        let err = engine
            .table_sync_full(SOURCE, DEST, IfExists::Drop, None, &options(0))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::InvalidArgument(_)));
        assert_eq!(source.calls() + destination.calls(), 0);
    }

    #[tokio::test]
    async fn test_job_with_unknown_policy_is_rejected() {
        let err = SyncJob::from_json(
            r#"{"source_table": "src", "destination_table": "dst", "mode": "full", "if_exists": "replace"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_run_dispatches_full_job() {
        let source = memory_with(SOURCE, rows(3)).await;
        let destination = MemoryConnector::new();
        let engine = SyncEngine::new(source, destination.clone());
        let job = SyncJob::full(SOURCE, DEST, IfExists::Drop).with_options(options(2));

        let report = engine.run(&job).await.unwrap();
        assert_eq!(report.rows_copied, 3);
        assert_eq!(destination.row_count(DEST).await.unwrap(), 3);
    }

    /// Destination whose column listing always fails.
    struct BrokenColumns(MemoryConnector);

    #[async_trait::async_trait]
    impl DataStoreConnector for BrokenColumns {
        fn kind(&self) -> connectors::connector::DatabaseKind {
            self.0.kind()
        }

        async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
            self.0.table_exists(table).await
        }

        async fn drop_table(&self, table: &str) -> Result<(), DbError> {
            self.0.drop_table(table).await
        }

        async fn truncate_table(&self, table: &str) -> Result<(), DbError> {
            self.0.truncate_table(table).await
        }

        async fn columns(&self, _table: &str) -> Result<Vec<String>, DbError> {
            Err(DbError::Unknown("connection reset".into()))
        }

        async fn row_count(&self, table: &str) -> Result<u64, DbError> {
            self.0.row_count(table).await
        }

        async fn get_rows(
            &self,
            table: &str,
            offset: usize,
            chunk_size: usize,
            order_by: Option<&str>,
        ) -> Result<Vec<RowData>, DbError> {
            self.0.get_rows(table, offset, chunk_size, order_by).await
        }

        async fn get_new_rows(
            &self,
            table: &str,
            primary_key: &str,
            cutoff: Option<&Value>,
            offset: usize,
            chunk_size: usize,
        ) -> Result<Vec<RowData>, DbError> {
            self.0
                .get_new_rows(table, primary_key, cutoff, offset, chunk_size)
                .await
        }

        async fn new_rows_count(
            &self,
            table: &str,
            primary_key: &str,
            cutoff: Option<&Value>,
        ) -> Result<u64, DbError> {
            self.0.new_rows_count(table, primary_key, cutoff).await
        }

        async fn max_primary_key(
            &self,
            table: &str,
            primary_key: &str,
        ) -> Result<Option<Value>, DbError> {
            self.0.max_primary_key(table, primary_key).await
        }

        async fn distinct_primary_key(
            &self,
            table: &str,
            primary_key: &str,
        ) -> Result<bool, DbError> {
            self.0.distinct_primary_key(table, primary_key).await
        }

        async fn bulk_append(
            &self,
            table: &str,
            rows: &[RowData],
            options: &connectors::connector::WriteOptions,
        ) -> Result<u64, DbError> {
            self.0.bulk_append(table, rows, options).await
        }
    }
}
