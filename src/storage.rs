use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::model::Record;

/// A single named slot holding the JSON array of every record.
///
/// The slot is always rewritten whole; there are no partial updates.
#[derive(Debug, Clone)]
pub struct Slot {
    pub file_path: PathBuf,
}

impl Slot {
    pub fn new(dir: &Path, name: &str) -> Self {
        Self { file_path: dir.join(format!("{}.json", name)) }
    }

    /// Persisted records, or an empty sequence when the slot is missing or unreadable.
    pub fn load(&self) -> Vec<Record> {
        let file = match File::open(&self.file_path) {
            Ok(file) => file,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("could not open {}: {}", self.file_path.display(), e);
                }
                return Vec::new();
            }
        };

        match serde_json::from_reader::<_, Vec<Record>>(BufReader::new(file)) {
            Ok(records) => {
                info!("loaded {} records from {}", records.len(), self.file_path.display());
                records
            }
            Err(e) => {
                warn!("ignoring invalid payload in {}: {}", self.file_path.display(), e);
                Vec::new()
            }
        }
    }

    /// Overwrite the whole payload. Writes a sibling temp file, then renames it over the slot.
    pub fn replace_all(&self, records: &[Record]) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.file_path.with_extension("json.tmp");
        write_json(&tmp_path, records, false)?;
        fs::rename(&tmp_path, &self.file_path)?;
        info!("persisted {} records to {}", records.len(), self.file_path.display());
        Ok(())
    }
}

/// Write the pretty-printed collection to `dir/file_name` and return the path.
pub fn export(records: &[Record], dir: &Path, file_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    write_json(&path, records, true)?;
    info!("exported {} records to {}", records.len(), path.display());
    Ok(path)
}

/// Read an exported file back. Malformed files are errors, unlike `Slot::load`.
pub fn import(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path)?;
    let records: Vec<Record> = serde_json::from_reader(BufReader::new(file))?;
    info!("imported {} records from {}", records.len(), path.display());
    Ok(records)
}

fn write_json(path: &Path, records: &[Record], pretty: bool) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, records)?;
    } else {
        serde_json::to_writer(&mut writer, records)?;
    }
    writer.flush()?;
    Ok(())
}
