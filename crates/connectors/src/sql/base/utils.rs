use crate::{
    connector::{WriteMode, WriteOptions},
    sql::base::error::DbError,
};
use model::{core::data_type::DataType, records::row::RowData};

/// Decides what a bulk append must do before inserting: `Ok(true)` means the
/// table has to be created first.
pub fn prepare_append(table: &str, exists: bool, options: &WriteOptions) -> Result<bool, DbError> {
    match (exists, options.mode) {
        (true, WriteMode::Fail) => Err(DbError::TableExists(table.to_string())),
        (true, WriteMode::Append) => Ok(false),
        (false, _) if options.create_table() => Ok(true),
        (false, _) => Err(DbError::TableNotFound(table.to_string())),
    }
}

/// Column names and types for a new table, taken from the first row. A column
/// that is NULL in the first row takes the type of its first non-null value.
pub fn infer_columns(rows: &[RowData]) -> Vec<(String, DataType)> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };

    first
        .field_values
        .iter()
        .map(|field| {
            let data_type = if field.data_type == DataType::Null {
                rows.iter()
                    .filter_map(|row| row.get(&field.name))
                    .find(|f| f.value.is_some())
                    .map(|f| f.data_type.clone())
                    .unwrap_or(DataType::Null)
            } else {
                field.data_type.clone()
            };
            (field.name.clone(), data_type)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::PROP_CREATE_TABLE;
    use model::core::value::Value;

    #[test]
    fn test_prepare_append_modes() {
        let append = WriteOptions::append();
        assert!(prepare_append("t", false, &append).unwrap());
        assert!(!prepare_append("t", true, &append).unwrap());

        let fail = WriteOptions::append().with_mode(WriteMode::Fail);
        assert!(matches!(
            prepare_append("t", true, &fail),
            Err(DbError::TableExists(_))
        ));

        let no_create = WriteOptions::append().with_property(PROP_CREATE_TABLE, false);
        assert!(matches!(
            prepare_append("t", false, &no_create),
            Err(DbError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_infer_columns_skips_leading_nulls() {
        let rows = vec![
            RowData::from_pairs("t", [("id", Value::Int(1)), ("note", Value::Null)]),
            RowData::from_pairs("t", [("id", Value::Int(2)), ("note", Value::from("x"))]),
        ];
        assert_eq!(
            infer_columns(&rows),
            vec![
                ("id".to_string(), DataType::Long),
                ("note".to_string(), DataType::String)
            ]
        );
    }
}
