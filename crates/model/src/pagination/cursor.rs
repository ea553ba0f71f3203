use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a chunk inside the source table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Cursor {
    /// Offset into the table's row sequence, optionally ordered by a column.
    Offset {
        offset: usize,
        order_by: Option<String>,
    },

    /// Rows whose `column` is strictly greater than `after`, ordered by
    /// `column`, skipping the first `offset` of them. `after = None` means
    /// no lower bound.
    Watermark {
        column: String,
        after: Option<Value>,
        offset: usize,
    },
}

impl Cursor {
    pub fn offset(&self) -> usize {
        match self {
            Cursor::Offset { offset, .. } | Cursor::Watermark { offset, .. } => *offset,
        }
    }

    /// Same window, moved forward by `rows`.
    pub fn advance(&self, rows: usize) -> Cursor {
        match self {
            Cursor::Offset { offset, order_by } => Cursor::Offset {
                offset: offset + rows,
                order_by: order_by.clone(),
            },
            Cursor::Watermark {
                column,
                after,
                offset,
            } => Cursor::Watermark {
                column: column.clone(),
                after: after.clone(),
                offset: offset + rows,
            },
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Offset { offset, .. } => write!(f, "offset:{offset}"),
            Cursor::Watermark {
                column,
                after: Some(after),
                offset,
            } => write!(f, "{column}>{after}+{offset}"),
            Cursor::Watermark {
                column,
                after: None,
                offset,
            } => write!(f, "{column}+{offset}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_keeps_window() {
        let cursor = Cursor::Watermark {
            column: "id".into(),
            after: Some(Value::Int(10)),
            offset: 0,
        };
        let next = cursor.advance(5);
        assert_eq!(next.offset(), 5);
        assert_eq!(next.to_string(), "id>10+5");
    }
}
