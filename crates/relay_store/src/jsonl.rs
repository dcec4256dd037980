//! Line-delimited JSON persistence shared by every store.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const JSONL_EXTENSION: &str = "jsonl";

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory {}", path.display()))
}

pub fn jsonl_name(stem: &str) -> String {
    format!("{stem}.{JSONL_EXTENSION}")
}

pub fn append_jsonl<T: Serialize>(path: &Path, entries: &[T]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {} for appending", path.display()))?;

    let mut writer = BufWriter::new(file);
    for entry in entries {
        serde_json::to_writer(&mut writer, entry)
            .with_context(|| format!("failed to serialize entry for {}", path.display()))?;
        writer
            .write_all(b"\n")
            .with_context(|| format!("failed to write newline to {}", path.display()))?;
    }

    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))
}

pub fn read_jsonl<T>(path: &Path) -> Result<Vec<T>>
where
    T: DeserializeOwned,
{
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| {
            format!("failed to read line {} from {}", line_idx + 1, path.display())
        })?;

        if line.trim().is_empty() {
            continue;
        }

        let entry = serde_json::from_str(&line).with_context(|| {
            format!(
                "failed to deserialize line {} from {}",
                line_idx + 1,
                path.display()
            )
        })?;

        entries.push(entry);
    }

    Ok(entries)
}

/// Last line of the file, i.e. the live snapshot of an append-per-save row.
pub fn read_last_snapshot<T>(path: &Path) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut last = None;
    for line in reader.lines() {
        let line =
            line.with_context(|| format!("failed to read line from {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: T = serde_json::from_str(&line)
            .with_context(|| format!("failed to parse snapshot from {}", path.display()))?;
        last = Some(entry);
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        n: u32,
    }

    #[test]
    fn append_then_read_last() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(jsonl_name("rows"));

        assert_eq!(read_last_snapshot::<Row>(&path).unwrap(), None);

        append_jsonl(&path, &[Row { n: 1 }, Row { n: 2 }]).unwrap();
        append_jsonl(&path, &[Row { n: 3 }]).unwrap();

        assert_eq!(read_jsonl::<Row>(&path).unwrap().len(), 3);
        assert_eq!(read_last_snapshot::<Row>(&path).unwrap(), Some(Row { n: 3 }));
    }
}
