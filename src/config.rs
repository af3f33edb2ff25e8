use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) fps_cap: u32,
    pub(crate) enable_color: bool,
    pub(crate) frame_delay_ms: u64,
    pub(crate) game_tick_ms: u64,
    pub(crate) game_update_ms: u64,
    pub(crate) stop_timeout_ms: u64,
    pub(crate) sleep_threshold: f64,
    pub(crate) assets_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 100,
            enable_color: true,
            frame_delay_ms: 200,
            game_tick_ms: 50,
            game_update_ms: 50,
            stop_timeout_ms: 500,
            sleep_threshold: 20.0,
            assets_dir: None,
        }
    }
}

impl Settings {
    pub(crate) fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms.max(1))
    }

    pub(crate) fn game_timing(&self) -> GameTiming {
        GameTiming {
            tick: Duration::from_millis(self.game_tick_ms.max(1)),
            update_interval: Duration::from_millis(self.game_update_ms.max(1)),
        }
    }

    pub(crate) fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub(crate) fn assets_dir(&self) -> PathBuf {
        self.assets_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/assets")))
    }
}

/// Draw and simulation cadence of a mini-game thread.
#[derive(Clone, Copy, Debug)]
pub(crate) struct GameTiming {
    pub(crate) tick: Duration,
    pub(crate) update_interval: Duration,
}

impl Default for GameTiming {
    fn default() -> Self {
        Settings::default().game_timing()
    }
}

pub(crate) struct Paths {
    pub(crate) save_dir: PathBuf,
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "termipet", "Termipet")
        .context("could not resolve project directories")?;
    let data = proj.data_local_dir().to_path_buf();
    let save_dir = data.join("saves");
    fs::create_dir_all(&save_dir)
        .with_context(|| format!("could not create {}", save_dir.display()))?;
    Ok(Paths {
        save_dir,
        settings_path: data.join("settings.json"),
        log_path: data.join("termipet.log"),
    })
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        match serde_json::from_str::<Settings>(&s) {
            Ok(v) => return v,
            Err(e) => tracing::warn!("ignoring {}: {e}", path.display()),
        }
    }
    Settings::default()
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> std::io::Result<()> {
    // rename over an existing file is not atomic everywhere; remove first.
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "frame_delay_ms": 120 }"#).unwrap();

        let s = load_settings(&path);
        assert_eq!(s.frame_delay_ms, 120);
        assert_eq!(s.game_tick_ms, 50);
        assert_eq!(s.sleep_threshold, 20.0);
    }

    #[test]
    fn corrupt_settings_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(load_settings(&path).stop_timeout_ms, 500);
    }

    #[test]
    fn settings_survive_atomic_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut s = Settings::default();
        s.enable_color = false;
        save_settings_atomic(&path, &s).unwrap();
        save_settings_atomic(&path, &s).unwrap();
        assert!(!load_settings(&path).enable_color);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
