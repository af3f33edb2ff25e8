//! The single activity slot and everything that decides what goes in it.

use crate::activity::{self, ActivityHandle, ActivityKind, GameInput};
use crate::commands::{Catalog, Command, CommandKind, Effect};
use crate::config::Settings;
use crate::error::CoreError;
use crate::frames::FrameStore;
use crate::input::{ControlKey, Input};
use crate::pet::Pet;
use crate::storage::PetStore;
use crate::surface::{Pane, Surface};
use chrono::Local;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub(crate) const HISTORY_LEN: usize = 5;
const MAX_LINE: usize = 32;
const WELCOME_FOR: Duration = Duration::from_secs(3);
const DEATH_GRACE: Duration = Duration::from_secs(2);
const FAREWELL_GRACE: Duration = Duration::from_secs(1);
const GAME_FATIGUE: f64 = 5.0;
const GAME_SLEEPINESS: f64 = 5.0;

/// Hands out fresh surfaces for the activity pane.
pub(crate) trait SurfaceFactory {
    fn size(&self) -> (u16, u16);
    fn make(&mut self) -> Box<dyn Surface>;
}

impl SurfaceFactory for Pane {
    fn size(&self) -> (u16, u16) {
        Pane::size(self)
    }

    fn make(&mut self) -> Box<dyn Surface> {
        Box::new(self.surface())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Welcome { until: Instant },
    Running,
    Closing { at: Instant },
    Done,
}

pub(crate) struct Orchestrator {
    pet: Pet,
    store: PetStore,
    frames: FrameStore,
    catalog: Catalog,
    settings: Settings,
    surfaces: Box<dyn SurfaceFactory>,
    current: Option<ActivityHandle>,
    phase: Phase,
    line: String,
    history: VecDeque<String>,
    notice: Option<String>,
}

impl Orchestrator {
    pub(crate) fn new(
        pet: Pet,
        store: PetStore,
        settings: Settings,
        surfaces: Box<dyn SurfaceFactory>,
    ) -> Self {
        Self {
            pet,
            store,
            frames: FrameStore::new(settings.assets_dir()),
            catalog: Catalog::standard(),
            settings,
            surfaces,
            current: None,
            phase: Phase::Running,
            line: String::new(),
            history: VecDeque::with_capacity(HISTORY_LEN),
            notice: None,
        }
    }

    pub(crate) fn pet(&self) -> &Pet {
        &self.pet
    }

    pub(crate) fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub(crate) fn line(&self) -> &str {
        &self.line
    }

    /// Oldest first.
    pub(crate) fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    pub(crate) fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub(crate) fn activity_name(&self) -> Option<&str> {
        self.current.as_ref().map(|h| h.name())
    }

    pub(crate) fn is_running(&self) -> bool {
        self.phase != Phase::Done
    }

    /// Plays the welcome animation; `idle` follows once it has run its course.
    pub(crate) fn begin(&mut self, now: Instant) {
        self.dispatch("fire", now);
        self.phase = Phase::Welcome {
            until: now + WELCOME_FOR,
        };
    }

    /// One foreground iteration: input, then dispatch, then the death and
    /// sleep checks, then the pet tick.
    pub(crate) fn step(&mut self, inputs: &[Input], now: Instant) {
        if self.phase == Phase::Done {
            return;
        }
        for &input in inputs {
            self.handle_input(input, now);
        }

        match self.phase {
            Phase::Closing { at } => {
                if now >= at {
                    self.phase = Phase::Done;
                }
                return;
            }
            Phase::Welcome { until } if now >= until => {
                self.dispatch("idle", now);
            }
            _ => {}
        }

        if self.pet.alive && self.pet.is_dead() {
            tracing::info!("'{}' has died", self.pet.name);
            self.dispatch("kill", now);
            return;
        }
        if self.pet.sleepiness >= self.settings.sleep_threshold && !self.pet.resting {
            self.dispatch("sleep", now);
        }

        self.pet.tick_at(now);
    }

    fn handle_input(&mut self, input: Input, now: Instant) {
        if matches!(self.phase, Phase::Closing { .. } | Phase::Done) {
            return;
        }
        if input == Input::Control(ControlKey::Interrupt) {
            tracing::info!("interrupted");
            self.stop_current();
            self.phase = Phase::Done;
            return;
        }

        if let Some(handle) = &self.current {
            match handle.offer_input(input) {
                GameInput::Consumed => return,
                GameInput::Quit => {
                    self.leave_game(now);
                    return;
                }
                GameInput::Ignored => {}
            }
        }

        match input {
            Input::Char(ch) if self.line.chars().count() < MAX_LINE => self.line.push(ch),
            Input::Control(ControlKey::Backspace) => {
                self.line.pop();
            }
            Input::Control(ControlKey::Enter) => {
                let cmd = self.line.trim().to_lowercase();
                self.line.clear();
                if cmd.is_empty() {
                    return;
                }
                if self.history.len() == HISTORY_LEN {
                    self.history.pop_front();
                }
                self.history.push_back(cmd.clone());
                self.dispatch(&cmd, now);
            }
            _ => {}
        }
    }

    /// Replaces the running activity with `name`. Unknown names only leave a
    /// notice.
    pub(crate) fn dispatch(&mut self, name: &str, now: Instant) {
        let Some(cmd) = self.catalog.get(name).copied() else {
            tracing::debug!("unknown command '{name}'");
            self.notice = Some(format!("unknown command '{name}'"));
            return;
        };
        self.notice = None;
        if matches!(self.phase, Phase::Welcome { .. }) {
            self.phase = Phase::Running;
        }

        self.stop_current();
        self.pet.awake();
        match cmd.effect {
            Effect::None => {}
            Effect::Rest => self.pet.rest_at(now),
            Effect::DeleteSave => {
                self.pet.alive = false;
                if let Err(e) = self.store.delete(&self.pet.name) {
                    tracing::warn!("could not delete save: {e}");
                }
            }
        }
        self.start(&cmd);

        if cmd.ends_session {
            let grace = if cmd.effect == Effect::DeleteSave {
                DEATH_GRACE
            } else {
                FAREWELL_GRACE
            };
            self.phase = Phase::Closing { at: now + grace };
        }
    }

    fn start(&mut self, cmd: &Command) {
        let handle = match cmd.kind {
            CommandKind::Animation => match self.frames.load(cmd.name) {
                Ok(frames) => activity::start_animation(
                    cmd.name,
                    frames,
                    self.surfaces.make(),
                    cmd.colors(),
                    self.settings.frame_delay(),
                    self.settings.stop_timeout(),
                ),
                Err(e) => {
                    tracing::warn!("{e}");
                    self.notice = Some(e.to_string());
                    return;
                }
            },
            CommandKind::MiniGame(make) => {
                let (rows, cols) = self.surfaces.size();
                let timing = self.settings.game_timing();
                activity::start_mini_game(
                    cmd.name,
                    make(rows, cols, timing),
                    self.surfaces.make(),
                    timing,
                    self.settings.stop_timeout(),
                )
            }
        };
        self.current = Some(handle);
    }

    /// Stops whatever runs in the slot. A mini-game's score turns into
    /// experience, also when the game had to be abandoned.
    fn stop_current(&mut self) {
        let Some(mut handle) = self.current.take() else {
            return;
        };
        let score = match handle.stop() {
            Ok(score) => score,
            Err(CoreError::ActivityStopTimeout { score }) => {
                tracing::warn!("'{}' did not stop in time, abandoned", handle.name());
                score
            }
            Err(e) => {
                tracing::warn!("stopping '{}': {e}", handle.name());
                0
            }
        };
        if handle.kind() == ActivityKind::MiniGame {
            self.pet.experience += score as f64;
            tracing::info!("'{}' earned {score} xp", handle.name());
        }
    }

    fn leave_game(&mut self, now: Instant) {
        self.stop_current();
        self.pet.sleepiness += GAME_SLEEPINESS;
        self.pet.fatigue += GAME_FATIGUE;
        self.dispatch("idle", now);
    }

    /// Points the slot at a new pane (after a resize) and restarts the
    /// current command on it.
    pub(crate) fn replace_surfaces(&mut self, surfaces: Box<dyn SurfaceFactory>) {
        self.surfaces = surfaces;
        let Some(name) = self.activity_name().map(str::to_owned) else {
            return;
        };
        self.stop_current();
        if let Some(cmd) = self.catalog.get(&name).copied() {
            self.start(&cmd);
        }
    }

    /// Stops the activity and saves a living pet.
    pub(crate) fn shutdown(&mut self) {
        self.stop_current();
        if self.pet.alive {
            if let Err(e) = self.pet.save(&self.store, Local::now().naive_local()) {
                tracing::warn!("could not save '{}': {e}", self.pet.name);
            }
        }
        self.phase = Phase::Done;
    }
}
