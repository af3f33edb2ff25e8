use super::{flip_pause, Dir, GameKey, GameLogic, GameState};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::time::{Duration, Instant};

pub(crate) const TIER_GLYPHS: [char; 3] = ['◉', '◈', '◆'];

const START_LIVES: u32 = 3;
const FULL_SHIELD: u32 = 100;
const SHIELD_HIT: u32 = 25;
const MAX_PLAYER_BULLETS: usize = 3;
const SHOT_COOLDOWN: Duration = Duration::from_millis(300);
const ENEMY_STEP_START: f32 = 0.8;
const ENEMY_STEP_MIN: f32 = 0.3;
const SHOOT_CHANCE_START: f64 = 0.02;
const SHOOT_CHANCE_MAX: f64 = 0.08;
/// Enemies this many rows above the ship have landed.
const LANDING_MARGIN: i32 = 2;
const BUNKER_HEALTH: u8 = 3;

/// (row, col)
pub(crate) type Shot = (i32, i32);

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Enemy {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) alive: bool,
    pub(crate) tier: usize,
    pub(crate) points: u32,
}

impl Enemy {
    pub(crate) fn glyph(&self) -> char {
        TIER_GLYPHS[self.tier.min(TIER_GLYPHS.len() - 1)]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Bunker {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) health: u8,
}

/// Wave shooter: a marching enemy grid, three bunkers and one ship.
pub(crate) struct SpaceDefense {
    pub(crate) height: i32,
    pub(crate) width: i32,
    pub(crate) score: u32,
    pub(crate) state: GameState,
    pub(crate) level: u32,

    pub(crate) player_x: i32,
    pub(crate) player_y: i32,
    pub(crate) lives: u32,
    pub(crate) shield: u32,

    pub(crate) bullets: Vec<Shot>,
    pub(crate) enemy_bullets: Vec<Shot>,
    pub(crate) enemies: Vec<Enemy>,
    pub(crate) bunkers: Vec<Bunker>,

    pub(crate) enemy_dir: i32,
    pub(crate) enemy_step: f32,
    pub(crate) shoot_chance: f64,
    sweep_clock: Duration,
    update_dt: Duration,
    last_shot: Option<Instant>,

    pub(crate) message: String,
    pub(crate) message_at: Option<Instant>,
    rng: StdRng,
}

impl SpaceDefense {
    pub(crate) fn new(height: i32, width: i32, update_dt: Duration) -> Self {
        Self::with_rng(height, width, update_dt, StdRng::from_entropy())
    }

    /// Arena one cell inside a pane of `(rows, cols)` on every side.
    pub(crate) fn for_pane(rows: u16, cols: u16, update_dt: Duration) -> Self {
        Self::new(rows as i32 - 2, cols as i32 - 2, update_dt)
    }

    pub(crate) fn with_rng(height: i32, width: i32, update_dt: Duration, rng: StdRng) -> Self {
        let mut g = Self {
            height: height.max(12),
            width: width.max(12),
            score: 0,
            state: GameState::Playing,
            level: 1,
            player_x: 0,
            player_y: 0,
            lives: START_LIVES,
            shield: FULL_SHIELD,
            bullets: Vec::new(),
            enemy_bullets: Vec::new(),
            enemies: Vec::new(),
            bunkers: Vec::new(),
            enemy_dir: 1,
            enemy_step: ENEMY_STEP_START,
            shoot_chance: SHOOT_CHANCE_START,
            sweep_clock: Duration::ZERO,
            update_dt,
            last_shot: None,
            message: String::new(),
            message_at: None,
            rng,
        };
        g.reset();
        g
    }

    fn build_enemies(&mut self) {
        let extra = (self.level.saturating_sub(1)).min(2) as i32;
        let rows = 4 + extra;
        let cols = 8 + extra;
        let (x0, max_gap) = if self.level == 1 { (3, 4) } else { (2, 3) };
        let gap = ((self.width - 2 * x0) / cols).clamp(1, max_gap);

        self.enemies.clear();
        for row in 0..rows {
            let tier = (row as usize).min(2);
            for col in 0..cols {
                self.enemies.push(Enemy {
                    x: x0 + col * gap,
                    y: 2 + row * 2,
                    alive: true,
                    tier,
                    points: (3 - tier as u32) * self.level,
                });
            }
        }
        self.enemy_dir = 1;
        self.sweep_clock = Duration::ZERO;
    }

    fn build_bunkers(&mut self) {
        self.bunkers.clear();
        for i in 0..3 {
            let center_x = self.width / 4 * (i + 1);
            for dy in 0..3 {
                for dx in 0..5 {
                    let solid =
                        dy == 2 || (dy == 1 && (1..=3).contains(&dx)) || (dy == 0 && dx == 2);
                    if solid {
                        self.bunkers.push(Bunker {
                            x: center_x - 2 + dx,
                            y: self.height - 8 + dy,
                            health: BUNKER_HEALTH,
                        });
                    }
                }
            }
        }
    }

    fn show_message(&mut self, msg: impl Into<String>) {
        self.message = msg.into();
        self.message_at = Some(Instant::now());
    }

    pub(crate) fn alive_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.alive).count()
    }

    pub(crate) fn move_player(&mut self, dx: i32) {
        let nx = self.player_x + dx;
        if (2..self.width - 2).contains(&nx) {
            self.player_x = nx;
        }
    }

    pub(crate) fn shoot(&mut self) -> bool {
        self.shoot_at(Instant::now())
    }

    pub(crate) fn shoot_at(&mut self, now: Instant) -> bool {
        let cooled = self
            .last_shot
            .map_or(true, |t| now.saturating_duration_since(t) >= SHOT_COOLDOWN);
        if !cooled || self.bullets.len() >= MAX_PLAYER_BULLETS {
            return false;
        }
        self.bullets.push((self.player_y - 1, self.player_x));
        self.last_shot = Some(now);
        true
    }

    /// Moves shots one row; a shot standing on a bunker damages it instead.
    fn advance_shots(shots: &mut Vec<Shot>, bunkers: &mut Vec<Bunker>, dy: i32, height: i32) {
        shots.retain_mut(|(y, x)| {
            if let Some(b) = bunkers.iter_mut().find(|b| b.x == *x && b.y == *y) {
                b.health = b.health.saturating_sub(1);
                return false;
            }
            *y += dy;
            *y > 0 && *y < height
        });
        bunkers.retain(|b| b.health > 0);
    }

    /// Returns false when the grid landed.
    fn sweep_enemies(&mut self) -> bool {
        let dir = self.enemy_dir;
        let width = self.width;
        let at_edge = self
            .enemies
            .iter()
            .filter(|e| e.alive)
            .any(|e| (dir < 0 && e.x <= 1) || (dir > 0 && e.x >= width - 2));

        if !at_edge {
            for e in self.enemies.iter_mut().filter(|e| e.alive) {
                e.x += dir;
            }
            return true;
        }

        self.enemy_dir = -dir;
        let landing = self.player_y - LANDING_MARGIN;
        let mut landed = false;
        for e in self.enemies.iter_mut().filter(|e| e.alive) {
            e.y += 1;
            landed |= e.y >= landing;
        }
        !landed
    }

    fn enemy_fire(&mut self) {
        if !self.rng.gen_bool(self.shoot_chance.clamp(0.0, 1.0)) {
            return;
        }
        let alive: Vec<&Enemy> = self.enemies.iter().filter(|e| e.alive).collect();
        if let Some(shooter) = alive.choose(&mut self.rng) {
            self.enemy_bullets.push((shooter.y + 1, shooter.x));
        }
    }

    fn resolve_collisions(&mut self) {
        let mut gained = Vec::new();
        let enemies = &mut self.enemies;
        self.bullets.retain(|&(by, bx)| {
            let hit = enemies
                .iter_mut()
                .find(|e| e.alive && (e.x - bx).abs() <= 1 && (e.y - by).abs() <= 1);
            match hit {
                Some(e) => {
                    e.alive = false;
                    gained.push(e.points);
                    false
                }
                None => true,
            }
        });
        for pts in gained {
            self.score += pts;
            self.show_message(format!("+{pts} pts!"));
        }

        let (px, py) = (self.player_x, self.player_y);
        let before = self.enemy_bullets.len();
        self.enemy_bullets
            .retain(|&(y, x)| !((x - px).abs() <= 2 && (y - py).abs() <= 1));
        for _ in self.enemy_bullets.len()..before {
            self.shield = self.shield.saturating_sub(SHIELD_HIT);
            if self.shield == 0 {
                self.lives = self.lives.saturating_sub(1);
                self.shield = FULL_SHIELD;
                self.show_message("SHIP HIT!");
            }
            if self.lives == 0 {
                self.state = GameState::GameOver;
                self.show_message("Game Over!");
                return;
            }
        }
    }
}

impl GameLogic for SpaceDefense {
    fn update(&mut self) {
        if self.state != GameState::Playing {
            return;
        }

        Self::advance_shots(&mut self.bullets, &mut self.bunkers, -1, self.height);

        self.sweep_clock += self.update_dt;
        if self.sweep_clock.as_secs_f32() >= self.enemy_step {
            self.sweep_clock = Duration::ZERO;
            if !self.sweep_enemies() {
                self.state = GameState::GameOver;
                self.show_message("Invaders reached Earth!");
                return;
            }
        }

        self.enemy_fire();
        Self::advance_shots(&mut self.enemy_bullets, &mut self.bunkers, 1, self.height);
        self.resolve_collisions();

        if self.state == GameState::Playing && self.alive_count() == 0 {
            self.state = GameState::Win;
            self.score += 100 * self.level;
            self.show_message(format!("Level {} Complete!", self.level));
        }
    }

    fn reset(&mut self) {
        self.score = 0;
        self.state = GameState::Playing;
        self.level = 1;
        self.player_x = self.width / 2;
        self.player_y = self.height - 3;
        self.lives = START_LIVES;
        self.shield = FULL_SHIELD;
        self.bullets.clear();
        self.enemy_bullets.clear();
        self.enemy_step = ENEMY_STEP_START;
        self.shoot_chance = SHOOT_CHANCE_START;
        self.last_shot = None;
        self.message.clear();
        self.message_at = None;
        self.build_enemies();
        self.build_bunkers();
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
        match key {
            GameKey::Arrow(Dir::Left) => {
                self.move_player(-1);
                true
            }
            GameKey::Arrow(Dir::Right) => {
                self.move_player(1);
                true
            }
            GameKey::Char(' ' | 'k' | 'K') => self.shoot(),
            _ => false,
        }
    }

    fn supports_levels(&self) -> bool {
        true
    }

    fn next_level(&mut self) -> bool {
        if self.state != GameState::Win {
            return false;
        }
        self.level += 1;
        self.enemy_step = (self.enemy_step * 0.9).max(ENEMY_STEP_MIN);
        self.shoot_chance = (self.shoot_chance * 1.3).min(SHOOT_CHANCE_MAX);
        self.build_enemies();
        self.bullets.clear();
        self.enemy_bullets.clear();
        self.player_x = self.width / 2;
        self.shield = FULL_SHIELD;
        self.state = GameState::Playing;
        self.show_message(format!("LEVEL {}", self.level));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Layout, MIN_COLS, MIN_ROWS};
    use pretty_assertions::assert_eq;

    const DT: Duration = Duration::from_millis(50);

    fn game() -> SpaceDefense {
        SpaceDefense::with_rng(20, 40, DT, StdRng::seed_from_u64(3))
    }

    fn quiet(mut g: SpaceDefense) -> SpaceDefense {
        g.shoot_chance = 0.0;
        g
    }

    #[test]
    fn reset_builds_level_one() {
        let g = game();
        assert_eq!((g.player_x, g.player_y), (20, 17));
        assert_eq!((g.lives, g.shield), (3, 100));
        assert_eq!(g.enemies.len(), 32);
        assert_eq!(g.enemies[0].x, 3);
        assert_eq!(g.enemies[1].x, 7);
        let tiers: Vec<usize> = g.enemies.iter().step_by(8).map(|e| e.tier).collect();
        assert_eq!(tiers, vec![0, 1, 2, 2]);
        let points: Vec<u32> = g.enemies.iter().step_by(8).map(|e| e.points).collect();
        assert_eq!(points, vec![3, 2, 1, 1]);
        // three triangles of 1 + 3 + 5 cells
        assert_eq!(g.bunkers.len(), 27);
        assert!(g.bunkers.iter().all(|b| b.y >= 12 && b.y <= 14));
    }

    #[test]
    fn bullet_on_enemy_kills_it_and_scores() {
        let mut g = quiet(game());
        for (i, e) in g.enemies.iter_mut().enumerate() {
            e.alive = i == 9 || i == 31;
        }
        let target = g.enemies[9].clone();
        g.bullets.push((target.y, target.x));
        g.update();
        assert!(!g.enemies[9].alive);
        assert!(g.bullets.is_empty());
        assert_eq!(g.score, target.points);
        assert_eq!(g.alive_count(), 1);
        assert_eq!(g.state, GameState::Playing);
    }

    #[test]
    fn one_bullet_kills_only_one_enemy() {
        let mut g = quiet(game());
        // every enemy is inside the hit box
        g.enemies.iter_mut().for_each(|e| e.x = 10);
        g.bullets.push((g.enemies[0].y + 1, 10));
        g.update();
        assert_eq!(g.alive_count(), 31);
    }

    #[test]
    fn shots_chip_bunkers_away() {
        let mut g = quiet(game());
        let b = g.bunkers[0].clone();
        for expected in [2, 1] {
            g.bullets.push((b.y, b.x));
            g.update();
            let left = g.bunkers.iter().find(|c| c.x == b.x && c.y == b.y).unwrap();
            assert_eq!(left.health, expected);
        }
        g.enemy_bullets.push((b.y, b.x));
        g.update();
        assert!(!g.bunkers.iter().any(|c| c.x == b.x && c.y == b.y));
        assert!(g.enemy_bullets.is_empty());
    }

    #[test]
    fn bullets_leave_the_arena() {
        let mut g = quiet(game());
        g.bullets.push((1, 1));
        g.enemy_bullets.push((19, 1));
        g.update();
        assert!(g.bullets.is_empty());
        assert!(g.enemy_bullets.is_empty());
    }

    #[test]
    fn grid_sweeps_on_its_cadence() {
        let mut g = quiet(game());
        let x0 = g.enemies[0].x;
        for _ in 0..15 {
            g.update();
        }
        assert_eq!(g.enemies[0].x, x0);
        g.update();
        assert_eq!(g.enemies[0].x, x0 + 1);
    }

    #[test]
    fn grid_reverses_and_drops_at_the_edge() {
        let mut g = quiet(game());
        let shift = g.width - 2 - g.enemies.last().unwrap().x;
        g.enemies.iter_mut().for_each(|e| e.x += shift);
        let y0 = g.enemies[0].y;
        for _ in 0..16 {
            g.update();
        }
        assert_eq!(g.enemy_dir, -1);
        assert_eq!(g.enemies[0].y, y0 + 1);
    }

    #[test]
    fn landing_ends_the_game() {
        let mut g = quiet(game());
        let x = g.width - 2;
        g.enemies.iter_mut().for_each(|e| e.alive = false);
        g.enemies[0] = Enemy {
            x,
            y: g.player_y - 3,
            alive: true,
            tier: 0,
            points: 3,
        };
        for _ in 0..16 {
            g.update();
        }
        assert_eq!(g.state, GameState::GameOver);
    }

    #[test]
    fn hits_drain_shield_then_lives() {
        let mut g = quiet(game());
        let (px, py) = (g.player_x, g.player_y);
        let mut seen_zero_lives_without_game_over = false;
        for _ in 0..20 {
            g.enemy_bullets.push((py - 1, px + 2));
            g.update();
            assert!(g.shield <= 100);
            if g.lives == 0 && g.state != GameState::GameOver {
                seen_zero_lives_without_game_over = true;
            }
            if g.state == GameState::GameOver {
                break;
            }
        }
        assert_eq!(g.state, GameState::GameOver);
        assert_eq!(g.lives, 0);
        assert!(!seen_zero_lives_without_game_over);
    }

    #[test]
    fn fourth_hit_costs_a_life() {
        let mut g = quiet(game());
        for _ in 0..4 {
            g.enemy_bullets.push((g.player_y, g.player_x));
            g.update();
        }
        assert_eq!((g.lives, g.shield), (2, 100));
    }

    #[test]
    fn enemies_never_revive_during_play() {
        let mut g = game();
        g.shoot_chance = 0.5;
        let now = Instant::now();
        for i in 0..600u64 {
            let before: Vec<bool> = g.enemies.iter().map(|e| e.alive).collect();
            g.shoot_at(now + SHOT_COOLDOWN * i as u32);
            g.move_player(if (i / 10) % 2 == 0 { 1 } else { -1 });
            g.update();
            for (was, is) in before.iter().zip(g.enemies.iter().map(|e| e.alive)) {
                assert!(*was || !is);
            }
            if g.state != GameState::Playing {
                break;
            }
        }
    }

    #[test]
    fn shooting_is_rate_limited_and_capped() {
        let mut g = quiet(game());
        let t = Instant::now();
        assert!(g.shoot_at(t));
        assert!(!g.shoot_at(t + Duration::from_millis(100)));
        assert!(g.shoot_at(t + Duration::from_millis(300)));
        assert!(g.shoot_at(t + Duration::from_millis(600)));
        assert!(!g.shoot_at(t + Duration::from_millis(900)));
        assert_eq!(g.bullets.len(), 3);
    }

    #[test]
    fn ship_stays_inside() {
        let mut g = game();
        for _ in 0..100 {
            g.handle_key(GameKey::Arrow(Dir::Left));
        }
        assert_eq!(g.player_x, 2);
        for _ in 0..100 {
            g.handle_key(GameKey::Arrow(Dir::Right));
        }
        assert_eq!(g.player_x, g.width - 3);
    }

    #[test]
    fn clearing_the_grid_wins_and_next_level_scales_up() {
        let mut g = quiet(game());
        assert!(!g.next_level());
        g.enemies.iter_mut().for_each(|e| e.alive = false);
        g.update();
        assert_eq!(g.state, GameState::Win);
        assert_eq!(g.score, 100);

        assert!(g.next_level());
        assert_eq!(g.state, GameState::Playing);
        assert_eq!(g.level, 2);
        assert_eq!(g.enemies.len(), 5 * 9);
        assert_eq!(g.enemies[0].points, 6);
        assert!((g.enemy_step - 0.72).abs() < 1e-6);
        assert_eq!(g.shield, 100);
    }

    #[test]
    fn level_growth_is_capped() {
        let mut g = quiet(game());
        for _ in 0..10 {
            g.enemies.iter_mut().for_each(|e| e.alive = false);
            g.update();
            assert!(g.next_level());
        }
        assert_eq!(g.enemies.len(), 6 * 10);
        assert!(g.enemy_step >= ENEMY_STEP_MIN);
        assert!(g.shoot_chance <= SHOOT_CHANCE_MAX);
    }

    #[test]
    fn reset_leaves_game_over() {
        let mut g = quiet(game());
        g.state = GameState::GameOver;
        g.update();
        assert!(!g.toggle_pause());
        g.reset();
        assert_eq!(g.state, GameState::Playing);
        assert_eq!(g.score, 0);
    }

    #[test]
    fn smallest_layout_keeps_every_wave_above_bunkers_and_landing() {
        let layout = Layout::compute(MIN_COLS, MIN_ROWS).unwrap();
        let (rows, cols) = layout.pane_size();
        let mut g = quiet(SpaceDefense::for_pane(rows, cols, DT));
        let top_bunker = g.bunkers.iter().map(|b| b.y).min().unwrap();
        for _ in 0..3 {
            let lowest = g.enemies.iter().map(|e| e.y).max().unwrap();
            assert!(lowest < top_bunker, "level {} overlaps bunkers", g.level);
            assert!(
                lowest + 1 < g.player_y - LANDING_MARGIN,
                "level {} lands on its first drop",
                g.level
            );
            g.enemies.iter_mut().for_each(|e| e.alive = false);
            g.update();
            assert!(g.next_level());
        }
    }
}
