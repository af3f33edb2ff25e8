//! Background activities: looping animations and mini-games.
//!
//! Every activity runs on its own thread and writes to a surface through a
//! [`FencedSurface`]. Stopping is cooperative: the thread notices the stop
//! request between frames or ticks. Once [`ActivityHandle::stop`] returns
//! the fence is closed, so a thread that is slow to exit can no longer reach
//! the screen.

use crate::config::GameTiming;
use crate::error::{CoreError, CoreResult};
use crate::frames::{Frame, FrameSequence};
use crate::games::{Dir, GameKey, GameState, MiniGame};
use crate::input::{ControlKey, Input};
use crate::surface::Surface;
use crate::theme::{ColorMap, ColorToken};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const PACE_SLICE: Duration = Duration::from_millis(10);
const INPUT_LOCK_WAIT: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ActivityKind {
    Animation,
    MiniGame,
}

/// What a keystroke did when offered to a running mini-game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum GameInput {
    Consumed,
    Ignored,
    Quit,
}

/* -----------------------------
   Stop request + write fence
------------------------------ */

#[derive(Default)]
struct SignalInner {
    requested: AtomicBool,
    fence_closed: RwLock<bool>,
}

#[derive(Clone, Default)]
pub(crate) struct StopSignal {
    inner: Arc<SignalInner>,
}

impl StopSignal {
    pub(crate) fn request(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Waits for any in-flight write, then refuses all later ones.
    pub(crate) fn close_fence(&self) {
        *self.inner.fence_closed.write() = true;
    }

    fn guarded<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let closed = self.inner.fence_closed.read();
        if *closed {
            None
        } else {
            Some(f())
        }
    }
}

pub(crate) struct FencedSurface {
    inner: Box<dyn Surface>,
    signal: StopSignal,
}

impl FencedSurface {
    pub(crate) fn new(inner: Box<dyn Surface>, signal: StopSignal) -> Self {
        Self { inner, signal }
    }
}

impl Surface for FencedSurface {
    fn size(&self) -> (u16, u16) {
        self.inner.size()
    }

    fn clear(&mut self) {
        let inner = &mut self.inner;
        self.signal.guarded(|| inner.clear());
    }

    fn write_glyph(&mut self, row: u16, col: u16, ch: char, color: ColorToken) -> CoreResult<()> {
        let inner = &mut self.inner;
        self.signal
            .guarded(|| inner.write_glyph(row, col, ch, color))
            .unwrap_or(Ok(()))
    }

    fn flush(&mut self) -> CoreResult<()> {
        let inner = &mut self.inner;
        self.signal.guarded(|| inner.flush()).unwrap_or(Ok(()))
    }
}

/// Sleeps for `total`, waking early once a stop is requested.
fn pace(total: Duration, signal: &StopSignal) {
    let end = Instant::now() + total;
    loop {
        if signal.is_requested() {
            return;
        }
        let now = Instant::now();
        if now >= end {
            return;
        }
        thread::sleep((end - now).min(PACE_SLICE));
    }
}

/* -----------------------------
   Handle
------------------------------ */

pub(crate) struct ActivityHandle {
    name: String,
    kind: ActivityKind,
    signal: StopSignal,
    done: mpsc::Receiver<()>,
    thread: Option<JoinHandle<()>>,
    game: Option<Arc<Mutex<Box<dyn MiniGame>>>>,
    score: Arc<AtomicU32>,
    stop_timeout: Duration,
    stopped_with: Option<u32>,
}

impl ActivityHandle {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn kind(&self) -> ActivityKind {
        self.kind
    }

    pub(crate) fn score(&self) -> u32 {
        self.score.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn game_state(&self) -> Option<GameState> {
        let game = self.game.as_ref()?;
        let g = game.try_lock_for(INPUT_LOCK_WAIT)?;
        Some(g.state())
    }

    /// Offers a keystroke to the running mini-game. Game keys go to the
    /// game first; pause, reset, next level and quit are handled the same
    /// way for every game.
    pub(crate) fn offer_input(&self, input: Input) -> GameInput {
        let Some(game) = &self.game else {
            return GameInput::Ignored;
        };
        if self.stopped_with.is_some() {
            return GameInput::Ignored;
        }
        let key = match input {
            Input::Control(ControlKey::Esc) => return GameInput::Quit,
            Input::Control(ControlKey::Up) => GameKey::Arrow(Dir::Up),
            Input::Control(ControlKey::Down) => GameKey::Arrow(Dir::Down),
            Input::Control(ControlKey::Left) => GameKey::Arrow(Dir::Left),
            Input::Control(ControlKey::Right) => GameKey::Arrow(Dir::Right),
            Input::Control(_) => return GameInput::Ignored,
            Input::Char(ch) => fold_wasd(ch),
        };

        let Some(mut g) = game.try_lock_for(INPUT_LOCK_WAIT) else {
            tracing::debug!("game busy, dropping key {key:?}");
            return GameInput::Ignored;
        };
        if g.handle_key(key) {
            self.score.store(g.score(), Ordering::SeqCst);
            return GameInput::Consumed;
        }

        let outcome = match key {
            GameKey::Char('p' | 'P') if g.toggle_pause() => GameInput::Consumed,
            GameKey::Char('r' | 'R')
                if matches!(g.state(), GameState::GameOver | GameState::Win) =>
            {
                g.reset();
                GameInput::Consumed
            }
            GameKey::Char('n' | 'N') if g.supports_levels() && g.next_level() => {
                GameInput::Consumed
            }
            GameKey::Char('q' | 'Q') => GameInput::Quit,
            _ => GameInput::Ignored,
        };
        self.score.store(g.score(), Ordering::SeqCst);
        outcome
    }

    /// Stops the activity and returns its last score. The score is taken
    /// before signalling so a concurrent reset cannot zero it. If the thread
    /// does not exit within the timeout the handle is abandoned, but its
    /// writes are still fenced off.
    pub(crate) fn stop(&mut self) -> CoreResult<u32> {
        if let Some(score) = self.stopped_with {
            return Ok(score);
        }
        let score = self.score();
        self.signal.request();

        let exited = match self.done.recv_timeout(self.stop_timeout) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => true,
            Err(mpsc::RecvTimeoutError::Timeout) => false,
        };
        self.signal.close_fence();
        self.stopped_with = Some(score);

        if exited {
            if let Some(t) = self.thread.take() {
                if t.join().is_err() {
                    tracing::warn!("activity '{}' panicked", self.name);
                }
            }
            tracing::info!("stopped {:?} '{}' (score {score})", self.kind, self.name);
            Ok(score)
        } else {
            // detach; the fence keeps it off the screen
            self.thread.take();
            Err(CoreError::ActivityStopTimeout { score })
        }
    }
}

impl Drop for ActivityHandle {
    fn drop(&mut self) {
        if self.stopped_with.is_none() {
            self.signal.request();
            self.signal.close_fence();
        }
    }
}

fn fold_wasd(ch: char) -> GameKey {
    match ch {
        'w' | 'W' => GameKey::Arrow(Dir::Up),
        's' | 'S' => GameKey::Arrow(Dir::Down),
        'a' | 'A' => GameKey::Arrow(Dir::Left),
        'd' | 'D' => GameKey::Arrow(Dir::Right),
        other => GameKey::Char(other),
    }
}

/* -----------------------------
   Engine
------------------------------ */

fn spawn(
    name: &str,
    kind: ActivityKind,
    stop_timeout: Duration,
    game: Option<Arc<Mutex<Box<dyn MiniGame>>>>,
    score: Arc<AtomicU32>,
    signal: StopSignal,
    body: impl FnOnce() + Send + 'static,
) -> ActivityHandle {
    let (done_tx, done) = mpsc::channel::<()>();
    let thread = thread::Builder::new()
        .name(format!("activity-{name}"))
        .spawn(move || {
            // dropped on exit, panics included
            let _done = done_tx;
            body();
        });
    let thread = match thread {
        Ok(t) => Some(t),
        Err(e) => {
            tracing::warn!("could not spawn activity '{name}': {e}");
            None
        }
    };
    tracing::info!("started {kind:?} '{name}'");
    ActivityHandle {
        name: name.to_string(),
        kind,
        signal,
        done,
        thread,
        game,
        score,
        stop_timeout,
        stopped_with: None,
    }
}

pub(crate) fn start_animation(
    name: &str,
    frames: Arc<FrameSequence>,
    surface: Box<dyn Surface>,
    colors: ColorMap,
    frame_delay: Duration,
    stop_timeout: Duration,
) -> ActivityHandle {
    let signal = StopSignal::default();
    let mut surface = FencedSurface::new(surface, signal.clone());
    let sig = signal.clone();
    let label = name.to_string();
    spawn(
        name,
        ActivityKind::Animation,
        stop_timeout,
        None,
        Arc::new(AtomicU32::new(0)),
        signal,
        move || {
            let mut index = 0usize;
            while !sig.is_requested() {
                if let Err(e) = draw_frame(&mut surface, frames.get(index), &colors) {
                    tracing::debug!("'{label}' skipped frame {index}: {e}");
                }
                index = (index + 1) % frames.len();
                pace(frame_delay, &sig);
            }
        },
    )
}

fn draw_frame(s: &mut dyn Surface, frame: &Frame, colors: &ColorMap) -> CoreResult<()> {
    s.clear();
    let (rows, cols) = s.size();
    for (row, line) in frame.lines.iter().enumerate() {
        if row + 1 >= rows as usize {
            break;
        }
        for (col, ch) in line.chars().enumerate() {
            if col >= cols as usize {
                break;
            }
            s.write_glyph(row as u16, col as u16, ch, colors.color_of(ch))?;
        }
    }
    s.flush()
}

pub(crate) fn start_mini_game(
    name: &str,
    game: Box<dyn MiniGame>,
    surface: Box<dyn Surface>,
    timing: GameTiming,
    stop_timeout: Duration,
) -> ActivityHandle {
    let signal = StopSignal::default();
    let mut surface = FencedSurface::new(surface, signal.clone());
    let score = Arc::new(AtomicU32::new(game.score()));
    let game = Arc::new(Mutex::new(game));

    let sig = signal.clone();
    let shared = Arc::clone(&game);
    let score_out = Arc::clone(&score);
    let label = name.to_string();
    spawn(
        name,
        ActivityKind::MiniGame,
        stop_timeout,
        Some(game),
        score,
        signal,
        move || {
            let mut last_update = Instant::now();
            let mut pass = 0u64;
            while !sig.is_requested() {
                {
                    let mut g = shared.lock();
                    let now = Instant::now();
                    if now.saturating_duration_since(last_update) >= timing.update_interval {
                        g.update();
                        last_update = now;
                        score_out.store(g.score(), Ordering::SeqCst);
                    }
                    surface.clear();
                    let painted = g.paint(&mut surface, pass).and_then(|_| surface.flush());
                    if let Err(e) = painted {
                        tracing::debug!("'{label}' skipped draw pass {pass}: {e}");
                    }
                }
                pass += 1;
                pace(timing.tick, &sig);
            }
        },
    )
}
