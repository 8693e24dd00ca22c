//! File-backed store: one JSON document per line.
//!
//! `fingerprints.jsonl` and `scans.jsonl` live in a single directory. Appends
//! are serialized through a mutex; clearing rewrites the fingerprint file
//! atomically. Lines that fail to decode are skipped with a warning so one
//! corrupt record cannot block localization.

use crate::store::{FingerprintStore, StoreError, StoreResult};
use crate::types::{Fingerprint, ScanRecord};
use crate::util::write_atomic;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Mutex;

pub const FINGERPRINT_FILE: &str = "fingerprints.jsonl";
pub const SCAN_FILE: &str = "scans.jsonl";

pub struct JsonlStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            StoreError::Unavailable(format!("create store dir {}: {e}", dir.display()))
        })?;
        tracing::info!(dir = %dir.display(), "jsonl store opened");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn append<T: Serialize>(&self, file: &str, doc: &T) -> StoreResult<()> {
        let mut line =
            serde_json::to_string(doc).map_err(|e| StoreError::Encoding(e.to_string()))?;
        line.push('\n');
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(file))
            .map_err(|e| io_err(file, &e))?;
        f.write_all(line.as_bytes()).map_err(|e| io_err(file, &e))
    }

    fn read_all<T: DeserializeOwned>(&self, file: &str) -> StoreResult<Vec<T>> {
        let f = match fs::File::open(self.path(file)) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(file, &e)),
        };
        let mut out = Vec::new();
        for (idx, line) in BufReader::new(f).lines().enumerate() {
            let line = line.map_err(|e| io_err(file, &e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(&line) {
                Ok(doc) => out.push(doc),
                Err(e) => {
                    tracing::warn!(file, line = idx + 1, error = %e, "skipping corrupt record");
                }
            }
        }
        Ok(out)
    }
}

fn io_err(file: &str, e: &std::io::Error) -> StoreError {
    match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => {
            StoreError::Unavailable(format!("{file}: {e}"))
        }
        _ => StoreError::Io(format!("{file}: {e}")),
    }
}

impl FingerprintStore for JsonlStore {
    fn insert_fingerprint(&self, fp: Fingerprint) -> StoreResult<()> {
        self.append(FINGERPRINT_FILE, &fp)
    }

    fn insert_scan(&self, rec: ScanRecord) -> StoreResult<()> {
        self.append(SCAN_FILE, &rec)
    }

    fn fingerprints(&self) -> StoreResult<Vec<Fingerprint>> {
        self.read_all(FINGERPRINT_FILE)
    }

    fn clear_fingerprints(&self) -> StoreResult<usize> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?;
        let n = self.read_all::<Fingerprint>(FINGERPRINT_FILE)?.len();
        write_atomic(&self.path(FINGERPRINT_FILE), b"")
            .map_err(|e| io_err(FINGERPRINT_FILE, &e))?;
        Ok(n)
    }

    fn scans(&self) -> StoreResult<Vec<ScanRecord>> {
        self.read_all(SCAN_FILE)
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}
