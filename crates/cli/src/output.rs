use crate::error::CliError;
use engine_processing::job::SyncReport;

/// Prints the report as JSON, or writes it to `path` when given.
pub async fn emit_report(report: &SyncReport, path: Option<&str>) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report)?;
    match path {
        Some(path) => tokio::fs::write(path, json).await?,
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_processing::job::SyncKind;

    #[tokio::test]
    async fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = SyncReport::new(SyncKind::Full, "src", "dst");

        emit_report(&report, path.to_str()).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["kind"], "full");
        assert_eq!(written["outcome"], "copied");
        assert_eq!(written["row_count_match"], serde_json::Value::Null);
    }
}
