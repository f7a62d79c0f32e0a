use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

const LOG_FILE: &str = "run_log.jsonl";
const MAX_ENTRIES: usize = 500;

#[derive(Debug, Serialize)]
pub struct RunLogEntry<'a> {
    pub timestamp: &'a str,
    pub action: &'a str,
    pub source: &'a str,
    pub artifact: Option<&'a Path>,
    pub status: &'a str,
}

/// Appends one entry to the run log next to the artifacts. The log is advisory;
/// callers downgrade failures here to warnings.
pub fn record(
    out_dir: &Path,
    action: &str,
    source: &str,
    artifact: Option<&Path>,
    status: &str,
) -> Result<()> {
    let log_path = log_path(out_dir);
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".into());
    let entry = RunLogEntry {
        timestamp: &timestamp,
        action,
        source,
        artifact,
        status,
    };
    let json = serde_json::to_string(&entry)?;
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;
    writeln!(file, "{json}")?;
    truncate_log(&log_path)?;
    Ok(())
}

pub fn log_path(out_dir: &Path) -> PathBuf {
    out_dir.join(LOG_FILE)
}

fn truncate_log(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let reader = BufReader::new(file);
    let lines: Vec<_> = reader.lines().collect::<Result<_, _>>()?;
    if lines.len() <= MAX_ENTRIES {
        return Ok(());
    }
    let keep = &lines[lines.len() - MAX_ENTRIES..];
    fs::write(path, keep.join("\n") + "\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn record_appends_parseable_json_lines() {
        let temp = tempdir().expect("temp dir");
        record(
            temp.path(),
            "encode",
            "hello",
            Some(Path::new("Results/12-00-00_x.png")),
            "written",
        )
        .expect("record");
        record(temp.path(), "encode", "boom", None, "failed").expect("record");

        let contents = fs::read_to_string(log_path(temp.path())).expect("read log");
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).expect("valid json");
            assert_eq!(value["action"], "encode");
        }
    }
}
