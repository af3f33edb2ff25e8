use super::{flip_pause, Dir, GameKey, GameLogic, GameState};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::VecDeque;

/// (row, col)
pub(crate) type Cell = (i32, i32);

pub(crate) const FOOD_POINTS: u32 = 10;

/// Snake on a wrapped arena. Row 0/col 0 and the last row/col are the
/// border; the snake lives strictly inside.
pub(crate) struct Snake {
    pub(crate) height: i32,
    pub(crate) width: i32,
    pub(crate) body: VecDeque<Cell>,
    pub(crate) heading: Dir,
    pub(crate) food: Cell,
    pub(crate) score: u32,
    pub(crate) state: GameState,
    rng: StdRng,
}

impl Snake {
    pub(crate) fn new(height: i32, width: i32) -> Self {
        Self::with_rng(height, width, StdRng::from_entropy())
    }

    pub(crate) fn with_rng(height: i32, width: i32, rng: StdRng) -> Self {
        let mut s = Self {
            height: height.max(4),
            width: width.max(4),
            body: VecDeque::new(),
            heading: Dir::Right,
            food: (1, 1),
            score: 0,
            state: GameState::Playing,
            rng,
        };
        s.reset();
        s
    }

    fn interior_cells(&self) -> usize {
        ((self.height - 2) * (self.width - 2)) as usize
    }

    pub(crate) fn place_food(&mut self) {
        if self.body.len() >= self.interior_cells() {
            // nowhere left; leave the old food under the body
            return;
        }
        loop {
            let cell = (
                self.rng.gen_range(1..=self.height - 2),
                self.rng.gen_range(1..=self.width - 2),
            );
            if !self.body.contains(&cell) {
                self.food = cell;
                return;
            }
        }
    }

    fn wrap(&self, (mut row, mut col): Cell) -> Cell {
        if row <= 0 {
            row = self.height - 2;
        } else if row >= self.height - 1 {
            row = 1;
        }
        if col <= 0 {
            col = self.width - 2;
        } else if col >= self.width - 1 {
            col = 1;
        }
        (row, col)
    }

    pub(crate) fn head(&self) -> Cell {
        self.body[0]
    }
}

impl GameLogic for Snake {
    fn update(&mut self) {
        if self.state != GameState::Playing {
            return;
        }
        let (hr, hc) = self.head();
        let (dr, dc) = self.heading.delta();
        let next = self.wrap((hr + dr, hc + dc));

        if self.body.contains(&next) {
            self.state = GameState::GameOver;
            return;
        }

        self.body.push_front(next);
        if next == self.food {
            self.score += FOOD_POINTS;
            self.place_food();
        } else {
            self.body.pop_back();
        }
    }

    fn reset(&mut self) {
        self.body = VecDeque::from([(self.height / 2, self.width / 4)]);
        self.heading = Dir::Right;
        self.score = 0;
        self.state = GameState::Playing;
        self.place_food();
    }

    fn score(&self) -> u32 {
        self.score
    }

    fn state(&self) -> GameState {
        self.state
    }

    fn toggle_pause(&mut self) -> bool {
        flip_pause(&mut self.state)
    }

    fn handle_key(&mut self, key: GameKey) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        let GameKey::Arrow(dir) = key else {
            return false;
        };
        if self.body.len() > 1 && dir == self.heading.opposite() {
            return false;
        }
        self.heading = dir;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snake() -> Snake {
        Snake::with_rng(15, 30, StdRng::seed_from_u64(7))
    }

    fn wrapped_distance(s: &Snake, a: Cell, b: Cell) -> i32 {
        let span_r = s.height - 2;
        let span_c = s.width - 2;
        let dr = (a.0 - b.0).abs();
        let dc = (a.1 - b.1).abs();
        dr.min(span_r - dr) + dc.min(span_c - dc)
    }

    #[test]
    fn reset_puts_single_cell_mid_left_heading_right() {
        let s = snake();
        assert_eq!(s.body, VecDeque::from([(7, 7)]));
        assert_eq!(s.heading, Dir::Right);
        assert_eq!(s.score, 0);
        assert_eq!(s.state, GameState::Playing);
        assert!(!s.body.contains(&s.food));
    }

    #[test]
    fn eating_food_scores_and_grows_by_one() {
        let mut s = snake();
        s.body = VecDeque::from([(5, 5)]);
        s.heading = Dir::Right;
        s.food = (5, 6);
        s.update();
        assert_eq!(s.head(), (5, 6));
        assert_eq!(s.body.len(), 2);
        assert_eq!(s.score, 10);
        assert_ne!(s.food, (5, 6));
        assert!(!s.body.contains(&s.food));
    }

    #[test]
    fn plain_move_keeps_length() {
        let mut s = snake();
        s.body = VecDeque::from([(5, 5), (5, 4), (5, 3)]);
        s.food = (1, 1);
        s.update();
        assert_eq!(s.body, VecDeque::from([(5, 6), (5, 5), (5, 4)]));
    }

    #[test]
    fn leaving_the_arena_wraps_around() {
        let mut s = snake();
        s.food = (1, 1);
        s.body = VecDeque::from([(5, 28)]);
        s.update();
        assert_eq!(s.head(), (5, 1));

        s.body = VecDeque::from([(1, 10)]);
        s.heading = Dir::Up;
        s.update();
        assert_eq!(s.head(), (13, 10));

        s.heading = Dir::Down;
        s.update();
        assert_eq!(s.head(), (1, 10));
    }

    #[test]
    fn head_moves_one_cell_per_tick() {
        let mut s = snake();
        let dirs = [Dir::Up, Dir::Left, Dir::Down, Dir::Right];
        for i in 0..400 {
            let before = s.head();
            s.handle_key(GameKey::Arrow(dirs[(i / 7) % 4]));
            let len = s.body.len();
            let score = s.score;
            s.update();
            if s.state != GameState::Playing {
                break;
            }
            assert_eq!(wrapped_distance(&s, before, s.head()), 1);
            let grew = s.score > score;
            assert_eq!(s.body.len(), if grew { len + 1 } else { len });
        }
    }

    #[test]
    fn reversal_is_ignored_when_longer_than_one() {
        let mut s = snake();
        s.body = VecDeque::from([(5, 5), (5, 4)]);
        assert!(!s.handle_key(GameKey::Arrow(Dir::Left)));
        assert_eq!(s.heading, Dir::Right);
        assert!(s.handle_key(GameKey::Arrow(Dir::Up)));
        assert_eq!(s.heading, Dir::Up);
    }

    #[test]
    fn single_cell_may_turn_around() {
        let mut s = snake();
        assert!(s.handle_key(GameKey::Arrow(Dir::Left)));
        assert_eq!(s.heading, Dir::Left);
    }

    #[test]
    fn running_into_itself_is_game_over() {
        let mut s = snake();
        s.food = (1, 1);
        s.body = VecDeque::from([(5, 5), (5, 6), (6, 6), (6, 5), (6, 4)]);
        s.heading = Dir::Down;
        s.update();
        assert_eq!(s.state, GameState::GameOver);
        assert_eq!(s.body.len(), 5);

        // frozen until reset
        s.update();
        assert!(!s.handle_key(GameKey::Arrow(Dir::Up)));
        assert!(!s.toggle_pause());
        s.reset();
        assert_eq!(s.state, GameState::Playing);
        assert_eq!(s.body.len(), 1);
    }

    #[test]
    fn paused_snake_does_not_move() {
        let mut s = snake();
        assert!(s.toggle_pause());
        let before = s.body.clone();
        s.update();
        assert_eq!(s.body, before);
        assert!(!s.handle_key(GameKey::Arrow(Dir::Up)));
        assert!(s.toggle_pause());
        assert_eq!(s.state, GameState::Playing);
    }
}
