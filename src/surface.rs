use crate::error::{CoreError, CoreResult};
use crate::theme::ColorToken;
use parking_lot::Mutex;
use std::sync::Arc;

/// Addressable character grid an activity paints on.
pub(crate) trait Surface: Send {
    /// (rows, cols)
    fn size(&self) -> (u16, u16);
    fn clear(&mut self);
    fn write_glyph(&mut self, row: u16, col: u16, ch: char, color: ColorToken) -> CoreResult<()>;
    /// Publishes everything written since the last flush.
    fn flush(&mut self) -> CoreResult<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Glyph {
    pub(crate) ch: char,
    pub(crate) color: ColorToken,
}

impl Default for Glyph {
    fn default() -> Self {
        Self {
            ch: ' ',
            color: ColorToken::Plain,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct GlyphGrid {
    pub(crate) rows: u16,
    pub(crate) cols: u16,
    pub(crate) glyphs: Vec<Glyph>,
}

impl GlyphGrid {
    pub(crate) fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            glyphs: vec![Glyph::default(); rows as usize * cols as usize],
        }
    }

    pub(crate) fn get(&self, row: u16, col: u16) -> Option<Glyph> {
        if row < self.rows && col < self.cols {
            Some(self.glyphs[row as usize * self.cols as usize + col as usize])
        } else {
            None
        }
    }

    fn set(&mut self, row: u16, col: u16, g: Glyph) -> CoreResult<()> {
        if row >= self.rows || col >= self.cols {
            return Err(CoreError::Render { row, col });
        }
        let i = row as usize * self.cols as usize + col as usize;
        self.glyphs[i] = g;
        Ok(())
    }

    fn clear(&mut self) {
        self.glyphs.fill(Glyph::default());
    }

    #[cfg(test)]
    pub(crate) fn row_text(&self, row: u16) -> String {
        (0..self.cols)
            .filter_map(|c| self.get(row, c).map(|g| g.ch))
            .collect()
    }
}

/// Screen region shared between an activity thread (writer) and the
/// render pass (reader).
#[derive(Clone)]
pub(crate) struct Pane {
    front: Arc<Mutex<GlyphGrid>>,
}

impl Pane {
    pub(crate) fn new(rows: u16, cols: u16) -> Self {
        Self {
            front: Arc::new(Mutex::new(GlyphGrid::new(rows, cols))),
        }
    }

    pub(crate) fn size(&self) -> (u16, u16) {
        let g = self.front.lock();
        (g.rows, g.cols)
    }

    /// A fresh writer with its own staging buffer.
    pub(crate) fn surface(&self) -> PaneSurface {
        let (rows, cols) = self.size();
        PaneSurface {
            staging: GlyphGrid::new(rows, cols),
            front: Arc::clone(&self.front),
        }
    }

    pub(crate) fn snapshot(&self) -> GlyphGrid {
        self.front.lock().clone()
    }
}

pub(crate) struct PaneSurface {
    staging: GlyphGrid,
    front: Arc<Mutex<GlyphGrid>>,
}

impl Surface for PaneSurface {
    fn size(&self) -> (u16, u16) {
        (self.staging.rows, self.staging.cols)
    }

    fn clear(&mut self) {
        self.staging.clear();
    }

    fn write_glyph(&mut self, row: u16, col: u16, ch: char, color: ColorToken) -> CoreResult<()> {
        self.staging.set(row, col, Glyph { ch, color })
    }

    fn flush(&mut self) -> CoreResult<()> {
        let mut front = self.front.lock();
        if front.rows != self.staging.rows || front.cols != self.staging.cols {
            // pane was re-laid out under us; this writer is stale
            return Err(CoreError::Render {
                row: self.staging.rows,
                col: self.staging.cols,
            });
        }
        front.glyphs.copy_from_slice(&self.staging.glyphs);
        Ok(())
    }
}
