use crate::{pagination::cursor::Cursor, records::row::RowData};

/// One materialized batch of rows moved in a single fetch+append cycle.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub rows: Vec<RowData>,
    pub cursor: Cursor, // window this chunk was read from
    pub ts: chrono::DateTime<chrono::Utc>,
}

impl Chunk {
    pub fn new(table: &str, cursor: Cursor, rows: Vec<RowData>) -> Self {
        Chunk {
            id: format!("{table}@{cursor}"),
            rows,
            cursor,
            ts: chrono::Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.rows.iter().map(|r| r.size_bytes()).sum()
    }
}
