use super::snake::Snake;
use super::space::SpaceDefense;
use super::{GameLogic, GameState};
use crate::error::CoreResult;
use crate::surface::Surface;
use crate::theme::ColorToken;
use std::time::Duration;

const MESSAGE_TTL: Duration = Duration::from_millis(1500);
const SHIP_FRAMES: [char; 2] = ['▲', '△'];

/// Drawing side of a mini-game. `pass` counts draw passes since start.
pub(crate) trait Paint {
    fn paint(&self, s: &mut dyn Surface, pass: u64) -> CoreResult<()>;
}

pub(crate) trait MiniGame: GameLogic + Paint {}

impl<T: GameLogic + Paint> MiniGame for T {}

/* -----------------------------
   Clipped drawing helpers
------------------------------ */

fn put(s: &mut dyn Surface, row: i32, col: i32, ch: char, color: ColorToken) -> CoreResult<()> {
    let (rows, cols) = s.size();
    if row < 0 || col < 0 || row >= rows as i32 || col >= cols as i32 {
        return Ok(());
    }
    s.write_glyph(row as u16, col as u16, ch, color)
}

fn text(s: &mut dyn Surface, row: i32, col: i32, line: &str, color: ColorToken) -> CoreResult<()> {
    for (i, ch) in line.chars().enumerate() {
        put(s, row, col + i as i32, ch, color)?;
    }
    Ok(())
}

fn centered_col(s: &dyn Surface, line: &str) -> i32 {
    let cols = s.size().1 as i32;
    ((cols - line.chars().count() as i32) / 2).max(1)
}

pub(crate) fn border(s: &mut dyn Surface, color: ColorToken) -> CoreResult<()> {
    let (rows, cols) = s.size();
    let (rows, cols) = (rows as i32, cols as i32);
    if rows < 2 || cols < 2 {
        return Ok(());
    }
    for x in 1..cols - 1 {
        put(s, 0, x, '─', color)?;
        put(s, rows - 1, x, '─', color)?;
    }
    for y in 1..rows - 1 {
        put(s, y, 0, '│', color)?;
        put(s, y, cols - 1, '│', color)?;
    }
    put(s, 0, 0, '┌', color)?;
    put(s, 0, cols - 1, '┐', color)?;
    put(s, rows - 1, 0, '└', color)?;
    put(s, rows - 1, cols - 1, '┘', color)
}

fn center_box(s: &mut dyn Surface, lines: &[String]) -> CoreResult<()> {
    let rows = s.size().0 as i32;
    let top = ((rows - lines.len() as i32) / 2).max(1);
    for (i, line) in lines.iter().enumerate() {
        let color = if i == 1 {
            ColorToken::Bright
        } else {
            ColorToken::Plain
        };
        let col = centered_col(s, line);
        text(s, top + i as i32, col, line, color)?;
    }
    Ok(())
}

fn game_over_box(score: u32) -> Vec<String> {
    vec![
        "+------------------+".into(),
        "|    GAME  OVER    |".into(),
        "+------------------+".into(),
        format!("|  Score: {score:6}   |"),
        "+------------------+".into(),
        "| [R] Restart      |".into(),
        "| [Q] Quit to Menu |".into(),
        "+------------------+".into(),
    ]
}

fn paused_box(score: u32) -> Vec<String> {
    vec![
        "+------------------+".into(),
        "|      PAUSED      |".into(),
        "+------------------+".into(),
        format!("|  Score: {score:6}   |"),
        "+------------------+".into(),
        "| [P] Resume       |".into(),
        "| [Q] Quit to Menu |".into(),
        "+------------------+".into(),
    ]
}

fn win_box(score: u32, level: u32, message: &str) -> Vec<String> {
    let msg: String = message.chars().take(16).collect();
    vec![
        "+------------------+".into(),
        "|     VICTORY!     |".into(),
        "+------------------+".into(),
        format!("|  Score: {score:6}   |"),
        format!("|  Level: {level:6}   |"),
        "+------------------+".into(),
        format!("| {msg:^16} |"),
        "+------------------+".into(),
        "| [N] Next Level   |".into(),
        "| [Q] Quit to Menu |".into(),
        "+------------------+".into(),
    ]
}

/* -----------------------------
   Snake
------------------------------ */

impl Paint for Snake {
    fn paint(&self, s: &mut dyn Surface, _pass: u64) -> CoreResult<()> {
        border(s, ColorToken::Plain)?;
        match self.state {
            GameState::GameOver => return center_box(s, &game_over_box(self.score)),
            GameState::Paused => return center_box(s, &paused_box(self.score)),
            _ => {}
        }

        let inside =
            |(r, c): (i32, i32)| r >= 1 && r < self.height - 1 && c >= 1 && c < self.width - 1;
        for &cell in &self.body {
            if inside(cell) {
                put(s, cell.0, cell.1, '█', ColorToken::Green)?;
            }
        }
        if inside(self.food) {
            put(s, self.food.0, self.food.1, '●', ColorToken::Red)?;
        }

        text(s, 0, 2, &format!(" Score: {} ", self.score), ColorToken::Bright)?;
        let controls = " WASD: Move | P: Pause | Q: Quit ";
        let rows = s.size().0 as i32;
        let col = centered_col(s, controls);
        text(s, rows - 1, col, controls, ColorToken::Plain)
    }
}

/* -----------------------------
   Space-Defense
------------------------------ */

impl Paint for SpaceDefense {
    fn paint(&self, s: &mut dyn Surface, pass: u64) -> CoreResult<()> {
        border(s, ColorToken::Plain)?;
        let title = " SPACE DEFENSE ";
        let col = centered_col(s, title);
        text(s, 0, col, title, ColorToken::Bright)?;

        match self.state {
            GameState::GameOver => return center_box(s, &game_over_box(self.score)),
            GameState::Paused => return center_box(s, &paused_box(self.score)),
            GameState::Win => return center_box(s, &win_box(self.score, self.level, &self.message)),
            GameState::Playing => {}
        }

        let (h, w) = (self.height, self.width);
        let inside = |y: i32, x: i32| y >= 2 && y < h - 1 && x >= 2 && x < w - 1;

        let hud = format!(
            "Score: {:06} │ Level: {} │ Lives: {} │ Shield: {}%",
            self.score,
            self.level,
            "♥".repeat(self.lives as usize),
            self.shield
        );
        let hud: String = hud.chars().take((w - 4).max(0) as usize).collect();
        text(s, 1, 2, &hud, ColorToken::Plain)?;

        for e in self.enemies.iter().filter(|e| e.alive) {
            if inside(e.y, e.x) {
                let color =
                    [ColorToken::Magenta, ColorToken::Cyan, ColorToken::Green][e.tier.min(2)];
                put(s, e.y, e.x, e.glyph(), color)?;
            }
        }

        let ship = SHIP_FRAMES[((pass / 4) % 2) as usize];
        let (py, px) = (self.player_y, self.player_x);
        if inside(py, px) {
            put(s, py, px, ship, ColorToken::Bright)?;
            if inside(py, px - 1) {
                put(s, py, px - 1, '<', ColorToken::Bright)?;
            }
            if inside(py, px + 1) {
                put(s, py, px + 1, '>', ColorToken::Bright)?;
            }
        }

        for &(y, x) in &self.bullets {
            if inside(y, x) {
                put(s, y, x, '│', ColorToken::Yellow)?;
            }
        }
        for &(y, x) in &self.enemy_bullets {
            if inside(y, x) {
                put(s, y, x, '•', ColorToken::Red)?;
            }
        }
        for b in &self.bunkers {
            if inside(b.y, b.x) {
                let ch = match b.health {
                    3 => '█',
                    2 => '▓',
                    _ => '▒',
                };
                put(s, b.y, b.x, ch, ColorToken::Green)?;
            }
        }

        let fresh = self
            .message_at
            .is_some_and(|t| t.elapsed() < MESSAGE_TTL);
        if fresh && !self.message.is_empty() {
            let col = centered_col(s, &self.message).max(2);
            text(s, h - 3, col, &self.message, ColorToken::Bright)?;
        }

        let controls = "A/D: Move │ Space: Shoot │ P: Pause │ Q: Quit";
        let col = centered_col(s, controls).max(2);
        text(s, h - 2, col, controls, ColorToken::Plain)
    }
}
