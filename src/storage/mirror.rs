//! JSONL storage for mirrored objects
//!
//! A mirror is a local deployment target: every deployed object is stored in
//! `{dir}/objects.jsonl` with one JSON object per line. Uses file locking on
//! `{dir}/.lock` for concurrent access safety.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

/// An object stored in a mirror
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorRecord {
    /// Object kind, e.g. `classic/dashboard` or `bucket`
    pub kind: String,

    /// Identifying key within the kind (name, external id, bucket name, ...)
    pub key: String,

    /// Id assigned by the mirror, or the origin id the object was created with
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub payload: String,

    pub updated_at: DateTime<Utc>,
}

/// Values written by an upsert
#[derive(Debug, Clone)]
pub struct MirrorWrite<'a> {
    pub kind: &'a str,
    pub key: &'a str,
    pub origin_id: Option<&'a str>,
    pub name: Option<&'a str>,
    pub payload: &'a [u8],
}

/// Store for mirrored objects in JSONL format
#[derive(Debug, Clone)]
pub struct MirrorStore {
    dir: PathBuf,
}

impl MirrorStore {
    /// Creates a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the path to the store file
    pub fn path(&self) -> PathBuf {
        self.dir.join("objects.jsonl")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock_file(&self) -> Result<File> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;

        let path = self.dir.join(".lock");
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))
    }

    /// Reads all records from the store
    pub fn read_all(&self) -> Result<Vec<MirrorRecord>> {
        if !self.path().exists() {
            return Ok(Vec::new());
        }

        let lock = self.lock_file()?;
        lock.lock_shared()
            .context("Failed to acquire read lock on mirror")?;

        // Lock is released when `lock` is dropped
        self.read_unlocked()
    }

    fn read_unlocked(&self) -> Result<Vec<MirrorRecord>> {
        let path = self.path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)
            .with_context(|| format!("Failed to open mirror: {}", path.display()))?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let record: MirrorRecord = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse mirror record at line {}", line_num + 1))?;
            records.push(record);
        }

        Ok(records)
    }

    fn write_unlocked(&self, records: &[MirrorRecord]) -> Result<()> {
        let path = self.path();
        let temp_path = path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            let mut writer = BufWriter::new(&file);

            // Sort by kind and key for consistent output
            let mut sorted: Vec<_> = records.iter().collect();
            sorted.sort_by(|a, b| (&a.kind, &a.key).cmp(&(&b.kind, &b.key)));

            for record in sorted {
                let line = serde_json::to_string(record).context("Failed to serialize record")?;
                writeln!(writer, "{}", line).context("Failed to write record")?;
            }

            writer.flush().context("Failed to flush mirror")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    /// Finds a record by kind and key
    pub fn find(&self, kind: &str, key: &str) -> Result<Option<MirrorRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|r| r.kind == kind && r.key == key))
    }

    /// Creates or updates a record
    ///
    /// An existing record is matched by origin id first, then by key, and keeps
    /// its id. New records take the origin id, or `new_id()` without one.
    pub fn upsert(
        &self,
        write: MirrorWrite<'_>,
        new_id: impl FnOnce() -> String,
    ) -> Result<MirrorRecord> {
        let lock = self.lock_file()?;
        lock.lock_exclusive()
            .context("Failed to acquire write lock on mirror")?;

        let mut records = self.read_unlocked()?;

        let existing = write
            .origin_id
            .and_then(|origin| {
                records
                    .iter()
                    .position(|r| r.kind == write.kind && r.id == origin)
            })
            .or_else(|| {
                records
                    .iter()
                    .position(|r| r.kind == write.kind && r.key == write.key)
            });

        let id = match existing {
            Some(pos) => records.remove(pos).id,
            None => write.origin_id.map(str::to_string).unwrap_or_else(new_id),
        };

        let record = MirrorRecord {
            kind: write.kind.to_string(),
            key: write.key.to_string(),
            id,
            name: write.name.map(str::to_string),
            payload: String::from_utf8_lossy(write.payload).into_owned(),
            updated_at: Utc::now(),
        };
        records.push(record.clone());

        self.write_unlocked(&records)?;
        Ok(record)
    }

    /// Removes a record by kind and key
    pub fn remove(&self, kind: &str, key: &str) -> Result<bool> {
        let lock = self.lock_file()?;
        lock.lock_exclusive()
            .context("Failed to acquire write lock on mirror")?;

        let mut records = self.read_unlocked()?;
        let len_before = records.len();
        records.retain(|r| !(r.kind == kind && r.key == key));

        let removed = records.len() != len_before;
        if removed {
            self.write_unlocked(&records)?;
        }
        Ok(removed)
    }
}
