//! JSON and CSV export for [`DispatchResult`].

use super::results::DispatchResult;
use anyhow::{Context, Result};
use std::path::Path;

impl DispatchResult {
    /// Write status, totals, and objective values as pretty JSON.
    pub fn to_json(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("serializing DispatchResult to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing JSON to {}", path.display()))?;
        Ok(())
    }

    /// Convert to JSON value (for stdout)
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).context("converting DispatchResult to JSON value")
    }

    /// One row per step: every link key, then `storage_cumulative`.
    pub fn to_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("creating CSV writer for {}", path.display()))?;

        let mut header = vec!["step"];
        header.extend(self.flows.iter().map(|series| series.key));
        header.push("storage_cumulative");
        wtr.write_record(&header).context("writing CSV header")?;

        for step in 0..self.horizon {
            let mut record = Vec::with_capacity(header.len());
            record.push(step.to_string());
            record.extend(self.flows.iter().map(|series| series.values[step].to_string()));
            record.push(self.storage_cumulative[step].to_string());
            wtr.write_record(&record)
                .with_context(|| format!("writing CSV record for step {step}"))?;
        }

        wtr.flush().context("flushing CSV writer")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexicographic::{ObjectiveValue, SolveStatus};
    use super::super::results::LinkSeries;
    use super::*;
    use hubflow_core::Link;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn create_test_result() -> DispatchResult {
        let flows = Link::all()
            .map(|link| LinkSeries {
                link,
                key: link.key(),
                values: vec![link.index() as f64, 0.5],
            })
            .collect();
        let mut totals = BTreeMap::new();
        totals.insert("import_cost".to_string(), 42.0);
        DispatchResult {
            horizon: 2,
            status: SolveStatus::Optimal,
            flows,
            storage_cumulative: vec![25.0, 25.5],
            totals,
            objectives: vec![ObjectiveValue {
                name: "import_cost".into(),
                priority: 0,
                value: 42.0,
            }],
            phases: Vec::new(),
        }
    }

    #[test]
    fn test_to_json_value() {
        let json = create_test_result().to_json_value().unwrap();
        assert_eq!(json["status"]["status"], "optimal");
        assert_eq!(json["totals"]["import_cost"], 42.0);
        assert_eq!(json["objectives"][0]["name"], "import_cost");
        assert!(json.get("flows").is_none());
    }

    #[test]
    fn test_to_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.json");
        create_test_result().to_json(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"horizon\": 2"));
    }

    #[test]
    fn test_to_csv_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flows.csv");
        create_test_result().to_csv(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        let header: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(header[0], "step");
        assert_eq!(header[1], "hp_lake_lt");
        assert_eq!(header.len(), Link::COUNT + 2);
        assert_eq!(*header.last().unwrap(), "storage_cumulative");
        assert!(lines[2].starts_with("1,0.5,"));
        assert!(lines[2].ends_with(",25.5"));
    }
}
