pub(crate) mod paint;
pub(crate) mod snake;
pub(crate) mod space;

pub(crate) use paint::{MiniGame, Paint};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum GameState {
    Playing,
    Paused,
    GameOver,
    Win,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub(crate) fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    /// (d_row, d_col)
    pub(crate) fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (-1, 0),
            Dir::Down => (1, 0),
            Dir::Left => (0, -1),
            Dir::Right => (0, 1),
        }
    }
}

/// A key as a game sees it, after WASD has been folded into arrows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum GameKey {
    Arrow(Dir),
    Char(char),
}

/// Simulation side of a mini-game. Knows nothing about drawing.
pub(crate) trait GameLogic: Send {
    fn update(&mut self);
    fn reset(&mut self);
    fn score(&self) -> u32;
    fn state(&self) -> GameState;

    /// Playing ⇄ Paused. Returns false when the state allows neither.
    fn toggle_pause(&mut self) -> bool;

    /// Game-specific keys. Returns whether the key was used.
    fn handle_key(&mut self, key: GameKey) -> bool;

    fn supports_levels(&self) -> bool {
        false
    }

    /// Win → Playing on the next level. Returns whether it happened.
    fn next_level(&mut self) -> bool {
        false
    }
}

pub(crate) fn flip_pause(state: &mut GameState) -> bool {
    match *state {
        GameState::Playing => *state = GameState::Paused,
        GameState::Paused => *state = GameState::Playing,
        _ => return false,
    }
    true
}
