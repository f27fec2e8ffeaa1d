use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One journal line. Replay applies entries in file order; the last write wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum JournalEntry<T> {
    Put { record: T },
    Delete { id: String },
}

/// Append-only JSON-lines log backing one table.
///
/// A truncated final line (crash mid-write) is dropped on replay; a corrupt
/// line anywhere else fails the replay.
pub struct Journal {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    fsync: bool,
}

impl Journal {
    /// Open (or create) the journal at `path` for appending.
    pub fn open(path: &Path, fsync: bool) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
            fsync,
        })
    }

    /// Write one entry and flush it to the OS (and to disk when `fsync` is set).
    /// Failures name the journal file.
    pub fn append<T: Serialize>(&self, entry: &JournalEntry<T>) -> io::Result<()> {
        self.write_line(entry)
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {e}", self.path.display())))
    }

    fn write_line<T: Serialize>(&self, entry: &JournalEntry<T>) -> io::Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("journal writer lock poisoned"))?;
        writer.write_all(&line)?;
        writer.flush()?;
        if self.fsync {
            writer.get_ref().sync_data()?;
        }
        Ok(())
    }

    /// Read every valid entry from `path`. A missing file replays as empty.
    pub fn replay<T: DeserializeOwned>(path: &Path) -> io::Result<Vec<JournalEntry<T>>> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let complete = contents.ends_with('\n');
        let lines: Vec<&str> = contents.lines().collect();
        let mut entries = Vec::with_capacity(lines.len());

        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(e) if !complete && index + 1 == lines.len() => {
                    tracing::warn!(
                        target: "staybook-db",
                        path = %path.display(),
                        error = %e,
                        "dropping truncated journal tail"
                    );
                }
                Err(e) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("{}:{}: {e}", path.display(), index + 1),
                    ));
                }
            }
        }

        Ok(entries)
    }
}
