use crate::config::{save_settings_atomic, Paths, Settings};
use crate::input::collect_input_nonblocking;
use crate::orchestrator::Orchestrator;
use crate::pet::Pet;
use crate::render::{compose, Layout, Terminal};
use crate::storage::PetStore;
use crate::surface::Pane;
use chrono::Local;
use std::time::{Duration, Instant};

pub(crate) struct App {
    settings: Settings,
    paths: Paths,
    term: Terminal,
    orch: Orchestrator,
    pane: Pane,
    layout: Option<Layout>,
}

/// Pane matching the current layout; a 1×1 stand-in while the terminal is
/// too small.
fn pane_for(layout: Option<&Layout>) -> Pane {
    let (rows, cols) = layout.map_or((1, 1), Layout::pane_size);
    Pane::new(rows.max(1), cols.max(1))
}

impl App {
    fn init(pet_name: &str, settings: Settings, paths: Paths) -> anyhow::Result<Self> {
        let store = PetStore::new(&paths.save_dir);
        let pet = Pet::load(pet_name, &store, Local::now().naive_local(), &mut rand::thread_rng());

        let term = Terminal::begin()?;
        let layout = Layout::compute(term.cols, term.rows);
        let pane = pane_for(layout.as_ref());
        let orch = Orchestrator::new(pet, store, settings.clone(), Box::new(pane.clone()));

        Ok(Self {
            settings,
            paths,
            term,
            orch,
            pane,
            layout,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);

        self.orch.begin(Instant::now());
        while self.orch.is_running() {
            if self.term.resize_if_needed()? {
                self.relayout();
            }

            let inputs = collect_input_nonblocking()?;
            self.orch.step(&inputs, Instant::now());

            compose(
                &mut self.term.cur,
                self.layout.as_ref(),
                &self.orch,
                &self.pane.snapshot(),
                self.settings.enable_color,
            );
            self.term.present(true)?;

            spin_sleep(frame_dt, Instant::now());
        }
        Ok(())
    }

    fn relayout(&mut self) {
        self.layout = Layout::compute(self.term.cols, self.term.rows);
        tracing::info!(
            "terminal resized to {}x{} ({})",
            self.term.cols,
            self.term.rows,
            if self.layout.is_some() { "ok" } else { "too small" }
        );
        self.pane = pane_for(self.layout.as_ref());
        self.orch.replace_surfaces(Box::new(self.pane.clone()));
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.orch.shutdown();
        self.term.end()?;
        save_settings_atomic(&self.paths.settings_path, &self.settings)?;
        Ok(())
    }
}

/// Runs one session for `pet_name` and restores the terminal whatever
/// happens inside the loop.
pub(crate) fn run(pet_name: &str, settings: Settings, paths: Paths) -> anyhow::Result<()> {
    let mut app = App::init(pet_name, settings, paths)?;
    let result = app.run();
    let finished = app.finish();
    result.and(finished)
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
