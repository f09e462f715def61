//! prt - Parrot CLI
//!
//! Record desktop macros and play them back.
//!
//! Supported for playback: Windows (SendInput with fallbacks). Recording
//! works wherever the global listener can install its hooks.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::bounded;
use tracing_subscriber::EnvFilter;

use parrot_core::InputInjector;
use parrot_recorder::prelude::*;
use parrot_recorder::{next_title, serialize_macro};

#[derive(Parser)]
#[command(name = "prt")]
#[command(about = "Parrot - desktop macro recording and replay")]
#[command(version)]
struct Cli {
    /// Macro store file (defaults to the per-user data dir)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a macro until Ctrl-C
    Record {
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Play a saved macro
    Play {
        /// Macro id or title
        name: String,
        /// Override the macro's stored repetition count
        #[arg(short, long)]
        repetitions: Option<u32>,
        /// Ignore recorded pauses, replay with a minimal fixed gap
        #[arg(long)]
        no_pauses: bool,
        /// Restore the cursor and use stealth clicks where possible
        #[arg(long)]
        preserve_cursor: bool,
    },
    /// List saved macros
    List,
    /// Print one macro as JSON
    Show { name: String },
    /// Delete a macro
    Delete { name: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let store = MacroStore::new(store_path(cli.store)?);

    match cli.command {
        Commands::Record { title } => record(&store, title),
        Commands::Play {
            name,
            repetitions,
            no_pauses,
            preserve_cursor,
        } => play(&store, &name, repetitions, no_pauses, preserve_cursor),
        Commands::List => list(&store),
        Commands::Show { name } => show(&store, &name),
        Commands::Delete { name } => delete(&store, &name),
    }
}

fn store_path(overridden: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = overridden {
        return Ok(path);
    }
    let dirs = directories::ProjectDirs::from("rs", "parrot", "parrot")
        .ok_or_else(|| anyhow!("could not determine a data directory; pass --store"))?;
    Ok(dirs.data_dir().join("macros.json"))
}

fn record(store: &MacroStore, title: Option<String>) -> Result<()> {
    let recorder = Recorder::new();

    // Ctrl-C stands in for the global stop hotkey: it routes through the
    // recorder's external-stop seam, which wakes the main thread.
    let (stop_tx, stop_rx) = bounded::<()>(1);
    recorder.set_on_stop_requested(move || {
        let _ = stop_tx.try_send(());
    });
    {
        let recorder = recorder.clone();
        ctrlc::set_handler(move || recorder.request_stop())
            .context("failed to install Ctrl-C handler")?;
    }

    recorder.start();
    println!("Recording... press Ctrl-C to stop.");
    let _ = stop_rx.recv();

    let events = recorder.stop();
    if events.is_empty() {
        bail!("nothing recorded");
    }

    let existing = store.load()?;
    let title = title.unwrap_or_else(|| next_title(&existing));
    let m = Macro::new(title, events);
    println!("Saved '{}' ({} events) as {}", m.title, m.events.len(), m.id);
    store.add(m)?;
    Ok(())
}

#[cfg(target_os = "windows")]
fn injector() -> Result<Arc<dyn InputInjector>> {
    Ok(Arc::new(parrot_core::WindowsInjector::new()))
}

#[cfg(not(target_os = "windows"))]
fn injector() -> Result<Arc<dyn InputInjector>> {
    bail!("playback needs the Windows injection backends; this platform has none")
}

fn play(
    store: &MacroStore,
    name: &str,
    repetitions: Option<u32>,
    no_pauses: bool,
    preserve_cursor: bool,
) -> Result<()> {
    let m = find(store, name)?;
    let player = Player::new(injector()?);

    {
        let player = player.clone();
        ctrlc::set_handler(move || player.stop())
            .context("failed to install Ctrl-C handler")?;
    }

    let repetitions = repetitions.unwrap_or(m.repetitions);
    let with_pauses = !no_pauses && m.with_pauses;
    let options = PlaybackOptions {
        preserve_cursor: preserve_cursor || m.preserve_cursor,
    };

    println!(
        "Playing '{}' x{} ({} events). Ctrl-C cancels.",
        m.title,
        repetitions.max(1),
        m.events.len()
    );

    // Playback blocks its thread; keep it off the main one so Ctrl-C
    // handling stays responsive.
    let worker = {
        let player = player.clone();
        let events = m.events;
        thread::spawn(move || player.play(&events, with_pauses, repetitions, options))
    };
    let outcome = worker
        .join()
        .map_err(|_| anyhow!("playback worker panicked"))?;

    match outcome {
        PlaybackOutcome::Completed => println!("Playback completed."),
        PlaybackOutcome::Cancelled => println!("Playback cancelled."),
    }
    Ok(())
}

fn find(store: &MacroStore, name: &str) -> Result<Macro> {
    let macros = store.load()?;
    macros
        .into_iter()
        .find(|m| m.id == name || m.title == name)
        .ok_or_else(|| anyhow!("no macro with id or title '{name}'"))
}

fn list(store: &MacroStore) -> Result<()> {
    let macros = store.load()?;
    if macros.is_empty() {
        println!("No macros recorded yet.");
        return Ok(());
    }
    for m in macros {
        println!(
            "{}  {:<28} {:>5} events  x{}{}",
            m.id,
            m.title,
            m.events.len(),
            m.repetitions,
            if m.favorite { "  *" } else { "" }
        );
    }
    Ok(())
}

fn show(store: &MacroStore, name: &str) -> Result<()> {
    let m = find(store, name)?;
    let bytes = serialize_macro(&m)?;
    println!("{}", String::from_utf8_lossy(&bytes));
    Ok(())
}

fn delete(store: &MacroStore, name: &str) -> Result<()> {
    let m = find(store, name)?;
    store.remove(&m.id)?;
    println!("Deleted '{}'", m.title);
    Ok(())
}
