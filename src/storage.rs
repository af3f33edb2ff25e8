use crate::config::atomic_rename;
use crate::error::{CoreError, CoreResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

pub(crate) const SAVE_DATE_FORMAT: &str = "%m/%d/%Y, %H:%M:%S";

/// On-disk stats of one pet. Fields missing from an older file fall back to
/// a barely-alive pet rather than failing the load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct PetRecord {
    #[serde(default = "one")]
    pub(crate) health: f64,
    #[serde(default)]
    pub(crate) fatigue: f64,
    #[serde(default)]
    pub(crate) sleep: f64,
    #[serde(default)]
    pub(crate) experience: f64,
    #[serde(default)]
    pub(crate) resting: bool,
    #[serde(default)]
    pub(crate) save_date: Option<String>,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    properties: PetRecord,
}

type SaveFile = BTreeMap<String, Entry>;

pub(crate) fn format_save_date(t: NaiveDateTime) -> String {
    t.format(SAVE_DATE_FORMAT).to_string()
}

pub(crate) fn parse_save_date(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, SAVE_DATE_FORMAT).ok()
}

/// One `save_<Name>.json` per pet, all in a single directory.
#[derive(Clone, Debug)]
pub(crate) struct PetStore {
    dir: PathBuf,
}

impl PetStore {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub(crate) fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("save_{name}.json"))
    }

    /// `Ok(None)` when the pet has never been saved.
    pub(crate) fn load_record(&self, name: &str) -> CoreResult<Option<PetRecord>> {
        let path = self.path_for(name);
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut file: SaveFile = serde_json::from_str(&text)
            .map_err(|e| CoreError::Persistence(format!("{}: {e}", path.display())))?;
        match file.remove(name) {
            Some(entry) => Ok(Some(entry.properties)),
            None => Err(CoreError::Persistence(format!(
                "{} has no entry for '{name}'",
                path.display()
            ))),
        }
    }

    pub(crate) fn save_record(&self, name: &str, record: &PetRecord) -> CoreResult<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = SaveFile::new();
        file.insert(
            name.to_string(),
            Entry {
                properties: record.clone(),
            },
        );
        let path = self.path_for(name);
        write_atomic(&path, &serde_json::to_vec_pretty(&file)?)?;
        tracing::info!("saved '{name}' to {}", path.display());
        Ok(())
    }

    /// Removing a pet that was never saved is fine.
    pub(crate) fn delete(&self, name: &str) -> CoreResult<()> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => {
                tracing::info!("deleted save for '{name}'");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn list_pets(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let file = e.file_name().into_string().ok()?;
                let name = file.strip_prefix("save_")?.strip_suffix(".json")?;
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect();
        names.sort();
        names
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)
}
