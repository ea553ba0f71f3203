use crate::sql::base::dialect::TableName;
use model::pagination::cursor::Cursor;

pub struct FetchRowsRequest {
    pub table: TableName,
    pub cursor: Cursor,
    pub limit: usize,
}

pub struct FetchRowsRequestBuilder {
    table: TableName,
    cursor: Cursor,
    limit: usize,
}

impl FetchRowsRequestBuilder {
    pub fn new(table: TableName) -> Self {
        FetchRowsRequestBuilder {
            table,
            cursor: Cursor::Offset {
                offset: 0,
                order_by: None,
            },
            limit: 0,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn build(self) -> FetchRowsRequest {
        FetchRowsRequest {
            table: self.table,
            cursor: self.cursor,
            limit: self.limit,
        }
    }
}
