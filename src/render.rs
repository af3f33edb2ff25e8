use crate::orchestrator::Orchestrator;
use crate::pet::Pet;
use crate::surface::GlyphGrid;
use crate::theme::{ColorToken, HISTORY_SHADES};
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

pub(crate) const MIN_COLS: u16 = 72;
pub(crate) const MIN_ROWS: u16 = 31;
const SIDE_W: u16 = 38;
const STATUS_H: u16 = 13;
const HISTORY_H: u16 = 5;
const PROMPT: &str = "C:> ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    #[cfg(test)]
    fn row_text(&self, y: u16) -> String {
        (0..self.w).map(|x| self.cells[self.idx(x, y)].ch).collect()
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        // the old picture is gone; repaint everything
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

pub(crate) fn token_color(token: ColorToken, enable_color: bool) -> Color {
    if !enable_color {
        return match token {
            ColorToken::Grey => Color::DarkGrey,
            _ => Color::White,
        };
    }
    match token {
        ColorToken::Plain => Color::White,
        ColorToken::Red => Color::Red,
        ColorToken::Yellow => Color::Yellow,
        ColorToken::Green => Color::Green,
        ColorToken::Cyan => Color::Cyan,
        ColorToken::Blue => Color::Blue,
        ColorToken::Magenta => Color::Magenta,
        ColorToken::Pink => Color::AnsiValue(213),
        ColorToken::Grey => Color::DarkGrey,
        ColorToken::Bright => Color::Rgb {
            r: 255,
            g: 255,
            b: 255,
        },
    }
}

/* -----------------------------
   Layout
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Rect {
    pub(crate) x: u16,
    pub(crate) y: u16,
    pub(crate) w: u16,
    pub(crate) h: u16,
}

impl Rect {
    /// Inside of the border.
    pub(crate) fn inner(&self) -> Rect {
        Rect {
            x: self.x + 1,
            y: self.y + 1,
            w: self.w.saturating_sub(2),
            h: self.h.saturating_sub(2),
        }
    }
}

/// Status panel and legend down the left, the activity pane on the right,
/// command line and history along the bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    pub(crate) status: Rect,
    pub(crate) legend: Rect,
    pub(crate) pane: Rect,
    pub(crate) input_row: u16,
    pub(crate) history_top: u16,
}

impl Layout {
    /// `None` when the terminal is too small to hold every region.
    pub(crate) fn compute(cols: u16, rows: u16) -> Option<Layout> {
        if cols < MIN_COLS || rows < MIN_ROWS {
            return None;
        }
        let top_h = rows - HISTORY_H - 1;
        Some(Layout {
            status: Rect {
                x: 0,
                y: 0,
                w: SIDE_W,
                h: STATUS_H,
            },
            legend: Rect {
                x: 0,
                y: STATUS_H,
                w: SIDE_W,
                h: top_h - STATUS_H,
            },
            pane: Rect {
                x: SIDE_W,
                y: 0,
                w: cols - SIDE_W,
                h: top_h,
            },
            input_row: top_h,
            history_top: top_h + 1,
        })
    }

    /// Size of the surface activities draw on, as (rows, cols).
    pub(crate) fn pane_size(&self) -> (u16, u16) {
        let inner = self.pane.inner();
        (inner.h, inner.w)
    }
}

/* -----------------------------
   Drawing
------------------------------ */

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

/// Text clipped to `max` columns.
fn draw_clipped(buf: &mut CellBuffer, x: u16, y: u16, s: &str, max: u16, fg: Color) {
    let clipped: String = s.chars().take(max as usize).collect();
    draw_text(buf, x, y, &clipped, fg, Color::Black);
}

fn draw_box(buf: &mut CellBuffer, r: Rect, title: &str, fg: Color) {
    if r.w < 2 || r.h < 2 {
        return;
    }
    let cell = |ch| Cell {
        ch,
        fg,
        bg: Color::Black,
    };
    let (x1, y1) = (r.x + r.w - 1, r.y + r.h - 1);
    for x in r.x + 1..x1 {
        buf.set(x, r.y, cell('═'));
        buf.set(x, y1, cell('═'));
    }
    for y in r.y + 1..y1 {
        buf.set(r.x, y, cell('│'));
        buf.set(x1, y, cell('│'));
    }
    buf.set(r.x, r.y, cell('╒'));
    buf.set(x1, r.y, cell('╕'));
    buf.set(r.x, y1, cell('╘'));
    buf.set(x1, y1, cell('╛'));
    if !title.is_empty() {
        draw_clipped(buf, r.x + 2, r.y, &format!(" {title} "), r.w.saturating_sub(4), fg);
    }
}

fn portrait(pet: &Pet) -> Vec<String> {
    let mood = if pet.resting { "zzz" } else { "" };
    vec![
        format!("(`')     Health:  {:>6.1}", pet.health),
        format!(" \\/      Fatigue: {:>6.1}", pet.fatigue),
        format!("         Sleepy:  {:>6.1}", pet.sleepiness),
        "      ^".to_string(),
        "   __/_\\__".to_string(),
        format!("  /__ 0 __\\   EXP: {:.1}", pet.experience),
        format!("     |||      {mood}"),
        "     |||".to_string(),
        "      V".to_string(),
    ]
}

fn draw_status(buf: &mut CellBuffer, r: Rect, pet: &Pet, color: bool) {
    let fg = token_color(ColorToken::Plain, color);
    draw_box(buf, r, "PET", fg);
    let inner = r.inner();
    let name_fg = token_color(ColorToken::Bright, color);
    let title = format!("Monster's name: {}", pet.name);
    draw_clipped(buf, inner.x + 1, inner.y, &title, inner.w - 1, name_fg);
    let body_fg = token_color(ColorToken::Green, color);
    for (i, line) in portrait(pet).iter().enumerate() {
        let y = inner.y + 2 + i as u16;
        if y >= inner.y + inner.h {
            break;
        }
        draw_clipped(buf, inner.x + 1, y, line, inner.w - 1, body_fg);
    }
}

fn draw_legend(buf: &mut CellBuffer, r: Rect, orch: &Orchestrator, color: bool) {
    let fg = token_color(ColorToken::Plain, color);
    draw_box(buf, r, "COMMANDS AVAILABLE", fg);
    let inner = r.inner();
    for (i, (name, desc)) in orch.catalog().legend().enumerate() {
        if i as u16 >= inner.h {
            break;
        }
        let entry = format!("- {name}: {desc}");
        draw_clipped(buf, inner.x + 1, inner.y + i as u16, &entry, inner.w - 1, fg);
    }
}

fn draw_pane(buf: &mut CellBuffer, r: Rect, grid: &GlyphGrid, title: &str, color: bool) {
    draw_box(buf, r, title, token_color(ColorToken::Plain, color));
    let inner = r.inner();
    for row in 0..grid.rows.min(inner.h) {
        for col in 0..grid.cols.min(inner.w) {
            if let Some(g) = grid.get(row, col) {
                buf.set(
                    inner.x + col,
                    inner.y + row,
                    Cell {
                        ch: g.ch,
                        fg: token_color(g.color, color),
                        bg: Color::Black,
                    },
                );
            }
        }
    }
}

fn draw_input(buf: &mut CellBuffer, y: u16, line: &str, notice: Option<&str>, color: bool) {
    let fg = token_color(ColorToken::Plain, color);
    let text = format!("{PROMPT}{line}");
    draw_text(buf, 0, y, &text, fg, Color::Black);
    let cursor_x = text.chars().count() as u16;
    draw_text(buf, cursor_x, y, "_", token_color(ColorToken::Red, color), Color::Black);
    if let Some(n) = notice {
        let x = (cursor_x + 3).max(SIDE_W);
        draw_text(buf, x, y, n, token_color(ColorToken::Yellow, color), Color::Black);
    }
}

fn draw_history<'a>(
    buf: &mut CellBuffer,
    top: u16,
    entries: impl Iterator<Item = &'a str>,
    color: bool,
) {
    let entries: Vec<&str> = entries.collect();
    // newest sits on the brightest shade
    let offset = HISTORY_SHADES.len() - entries.len().min(HISTORY_SHADES.len());
    for (i, entry) in entries.iter().take(HISTORY_SHADES.len()).enumerate() {
        let shade = HISTORY_SHADES[offset + i];
        draw_text(buf, 0, top + i as u16, entry, token_color(shade, color), Color::Black);
    }
}

fn draw_too_small(buf: &mut CellBuffer, color: bool) {
    let fg = token_color(ColorToken::Yellow, color);
    let lines = [
        "Terminal too small".to_string(),
        format!("need {MIN_COLS}x{MIN_ROWS}, have {}x{}", buf.w, buf.h),
    ];
    let top = buf.h / 2;
    for (i, line) in lines.iter().enumerate() {
        let len = line.chars().count() as u16;
        let x = buf.w.saturating_sub(len) / 2;
        draw_text(buf, x, top.saturating_sub(1) + i as u16, line, fg, Color::Black);
    }
}

/// Paints one whole screen into `buf` from the orchestrator's state and the
/// latest committed pane contents.
pub(crate) fn compose(
    buf: &mut CellBuffer,
    layout: Option<&Layout>,
    orch: &Orchestrator,
    pane: &GlyphGrid,
    color: bool,
) {
    buf.clear();
    let Some(layout) = layout else {
        draw_too_small(buf, color);
        return;
    };
    draw_status(buf, layout.status, orch.pet(), color);
    draw_legend(buf, layout.legend, orch, color);
    let title = orch.activity_name().unwrap_or("");
    draw_pane(buf, layout.pane, pane, title, color);
    draw_input(buf, layout.input_row, orch.line(), orch.notice(), color);
    draw_history(buf, layout.history_top, orch.history(), color);
}
