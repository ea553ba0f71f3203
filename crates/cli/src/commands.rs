use clap::{Args, Subcommand};
use connectors::connector::{PROP_CREATE_TABLE, PROP_INSERT_BATCH_SIZE, WriteOptions};
use engine_processing::job::{DEFAULT_CHUNK_SIZE, DEFAULT_RETRIES, SyncOptions};

#[derive(Subcommand)]
pub enum Commands {
    /// Replace the destination table with the source table's rows
    Full {
        #[command(flatten)]
        connections: ConnectionArgs,

        #[arg(long, help = "Table to read from")]
        source_table: String,

        #[arg(long, help = "Table to write to")]
        destination_table: String,

        #[arg(
            long,
            default_value = "drop",
            help = "What to do with an existing destination: drop, truncate or drop_if_needed"
        )]
        if_exists: String,

        #[arg(long, help = "Column the source is read in order of")]
        order_by: Option<String>,

        #[command(flatten)]
        tuning: TuningArgs,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Append source rows above the destination's highest primary key
    Incremental {
        #[command(flatten)]
        connections: ConnectionArgs,

        #[arg(long, help = "Table to read from")]
        source_table: String,

        #[arg(long, help = "Table to write to")]
        destination_table: String,

        #[arg(long, help = "Monotonic key column used as the watermark")]
        primary_key: String,

        #[arg(long, help = "Skip the distinct primary key check on the source")]
        no_distinct_check: bool,

        #[command(flatten)]
        tuning: TuningArgs,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Run a sync described by a JSON job file
    Run {
        #[arg(long, help = "Job file path")]
        job: String,

        #[command(flatten)]
        connections: ConnectionArgs,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Test a connection string
    TestConn {
        /// Data format: "mysql" or "pg"; inferred from the URL scheme when omitted
        #[arg(long)]
        format: Option<String>,

        /// Connection string
        #[arg(long)]
        conn_str: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    #[arg(long, help = "Source connection string (defaults to DBSYNC_SOURCE_URL)")]
    pub source: Option<String>,

    #[arg(
        long,
        help = "Destination connection string (defaults to DBSYNC_DESTINATION_URL)"
    )]
    pub destination: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TuningArgs {
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, help = "Rows per fetch and append")]
    pub chunk_size: usize,

    #[arg(long, default_value_t = DEFAULT_RETRIES, help = "Attempts per chunk")]
    pub retries: usize,

    #[arg(long, help = "Skip the row count comparison after the copy")]
    pub skip_row_count: bool,

    #[arg(
        long,
        value_parser = clap::value_parser!(i64).range(1..),
        help = "Rows per INSERT statement on the destination"
    )]
    pub insert_batch_size: Option<i64>,

    #[arg(long, help = "Fail instead of creating a missing destination table")]
    pub no_create_table: bool,
}

impl TuningArgs {
    pub fn options(&self) -> SyncOptions {
        let mut write = WriteOptions::append().with_property(PROP_CREATE_TABLE, !self.no_create_table);
        if let Some(size) = self.insert_batch_size {
            write = write.with_property(PROP_INSERT_BATCH_SIZE, size);
        }

        SyncOptions::default()
            .with_chunk_size(self.chunk_size)
            .with_retries(self.retries)
            .with_verify_row_count(!self.skip_row_count)
            .with_write_options(write)
    }
}
