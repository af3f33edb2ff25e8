mod activity;
mod app;
mod commands;
mod config;
mod error;
mod frames;
mod games;
mod input;
mod orchestrator;
mod pet;
mod render;
mod storage;
mod surface;
mod theme;

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, LeaveAlternateScreen},
};
use std::{
    fs::File,
    io::{self, BufRead, Write},
    panic,
    path::Path,
    sync::Mutex,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    let paths = config::project_paths()?;
    init_logging(&paths.log_path)?;
    let settings = config::load_settings(&paths.settings_path);

    let store = storage::PetStore::new(&paths.save_dir);
    let Some(name) = prompt_pet_name(&store.list_pets(), io::stdin().lock(), io::stdout())? else {
        println!("\nToo bad!");
        return Ok(());
    };

    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));

    tracing::info!("session start for '{name}'");
    app::run(&name, settings, paths)?;
    println!("Goodbye! {name} has been saved.");
    Ok(())
}

/// Logs go to a file; the terminal belongs to the UI while raw mode is on.
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("could not open {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_thread_names(true)
                .with_writer(Mutex::new(file)),
        )
        .with(filter)
        .init();
    Ok(())
}

/// First letter upper case, the rest lower case.
fn capitalise(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Asks until a non-empty name is given. `None` on end of input.
fn prompt_pet_name(
    existing: &[String],
    mut input: impl BufRead,
    mut out: impl Write,
) -> Result<Option<String>> {
    writeln!(out, "{}", "=".repeat(40))?;
    writeln!(out, "Welcome to Termipet!")?;
    writeln!(out, "{}", "=".repeat(40))?;
    if existing.is_empty() {
        writeln!(out, "No pets yet.")?;
    } else {
        writeln!(out, "Your pets |")?;
        writeln!(out, "          V")?;
        for pet in existing {
            writeln!(out, "{pet}")?;
        }
    }

    loop {
        write!(out, "Which pet are you choosing? Entering a new name means creating a new pet! ")?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let name = line.trim();
        if !name.is_empty() {
            return Ok(Some(capitalise(name)));
        }
        writeln!(out, "Please enter a name for your pet!")?;
    }
}
