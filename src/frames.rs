use crate::error::{CoreError, CoreResult};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Frame {
    pub(crate) lines: Vec<String>,
}

impl Frame {
    pub(crate) fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_owned).collect(),
        }
    }
}

/// Ordered, never-empty list of frames for one animation.
#[derive(Clone, Debug)]
pub(crate) struct FrameSequence {
    frames: Vec<Frame>,
}

impl FrameSequence {
    pub(crate) fn new(frames: Vec<Frame>) -> Option<Self> {
        if frames.is_empty() {
            None
        } else {
            Some(Self { frames })
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn get(&self, counter: usize) -> &Frame {
        &self.frames[counter % self.frames.len()]
    }
}

/// Reads `<root>/animations/<name>/*.txt`, sorted by file name.
pub(crate) struct FrameStore {
    root: PathBuf,
    cache: HashMap<String, Arc<FrameSequence>>,
}

impl FrameStore {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    pub(crate) fn load(&mut self, name: &str) -> CoreResult<Arc<FrameSequence>> {
        if let Some(seq) = self.cache.get(name) {
            return Ok(Arc::clone(seq));
        }
        let dir = self.root.join("animations").join(name);
        let seq = Arc::new(read_dir_frames(&dir).ok_or_else(|| CoreError::AssetNotFound {
            name: name.to_string(),
            dir: dir.clone(),
        })?);
        tracing::debug!("loaded {} frames for '{name}'", seq.len());
        self.cache.insert(name.to_string(), Arc::clone(&seq));
        Ok(seq)
    }
}

fn read_dir_frames(dir: &Path) -> Option<FrameSequence> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    let frames = files
        .iter()
        .filter_map(|p| match fs::read_to_string(p) {
            Ok(text) => Some(Frame::parse(&text)),
            Err(e) => {
                tracing::warn!("skipping frame {}: {e}", p.display());
                None
            }
        })
        .collect();
    FrameSequence::new(frames)
}
