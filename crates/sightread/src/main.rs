//! sightread binary - generate phrases and practice against MIDI input

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sightread::midi::parse_hex_message;
use sightread::{ChordGenerator, GenerationConfig, Phrase, Session, SessionEvent, StaffSequence, TimingTable};
use sightread_conf::TrainerConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Sight-reading trainer
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file used in place of ./sightread.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one phrase and print its ABC markup
    Generate {
        /// RNG seed for a reproducible phrase
        #[arg(long)]
        seed: Option<u64>,

        /// Print markup, timing table and chords as JSON
        #[arg(long)]
        json: bool,
    },

    /// Practice against MIDI messages read from stdin, one hex message per line
    Practice {
        /// RNG seed for reproducible phrases
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Serialize)]
struct PhraseOutput<'a> {
    abc: &'a str,
    timing_table: &'a TimingTable,
    top: &'a StaffSequence,
    bottom: &'a StaffSequence,
}

fn generator(seed: Option<u64>) -> ChordGenerator {
    match seed {
        Some(seed) => ChordGenerator::with_seed(seed),
        None => ChordGenerator::new(),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn generate(config: &GenerationConfig, seed: Option<u64>, json: bool) -> Result<()> {
    let phrase = Phrase::build(config, &mut generator(seed))?;

    if json {
        let output = PhraseOutput {
            abc: &phrase.abc,
            timing_table: &phrase.table,
            top: &phrase.top,
            bottom: &phrase.bottom,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", phrase.abc);
    }
    Ok(())
}

fn practice(config: GenerationConfig, seed: Option<u64>) -> Result<()> {
    let mut session = Session::with_generator(config, generator(seed))?;
    let mut stdout = io::stdout().lock();

    writeln!(stdout, "{}", session.phrase().abc)?;
    report_expected(&mut stdout, &session)?;

    for line in io::stdin().lock().lines() {
        let line = line.context("reading MIDI input")?;
        let Some(message) = parse_hex_message(&line) else {
            if !line.trim().is_empty() {
                warn!("ignoring malformed input line: {:?}", line);
            }
            continue;
        };

        let Some(event) = session.handle_midi(&message)? else {
            continue;
        };
        writeln!(stdout, "{}", serde_json::to_string(&event)?)?;

        match event {
            SessionEvent::Advanced { .. } => report_expected(&mut stdout, &session)?,
            SessionEvent::Regenerated => {
                writeln!(stdout, "{}", session.phrase().abc)?;
                report_expected(&mut stdout, &session)?;
            }
            SessionEvent::Waiting | SessionEvent::Wrong { .. } => {}
        }
    }

    info!("input closed at slot {}", session.cursor());
    Ok(())
}

fn report_expected(out: &mut impl Write, session: &Session) -> Result<()> {
    let expected: Vec<u8> = session
        .expected_midi()
        .map(|set| set.iter().copied().collect())
        .unwrap_or_default();
    writeln!(out, "# slot {} expects {:?}", session.cursor(), expected)?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (trainer, sources) = TrainerConfig::load_with_sources_from(args.config.as_deref())
        .context("loading configuration")?;
    init_tracing(&trainer.telemetry.log_level);

    for path in &sources.files {
        info!("loaded config from {}", path.display());
    }
    for var in &sources.env_overrides {
        info!("  override: {}", var);
    }

    match args.command {
        Command::Config => {
            print!("{}", trainer.to_toml());
            Ok(())
        }
        Command::Generate { seed, json } => {
            let config = GenerationConfig::from_settings(&trainer.generation)
                .context("invalid generation settings")?;
            generate(&config, seed, json)
        }
        Command::Practice { seed } => {
            let config = GenerationConfig::from_settings(&trainer.generation)
                .context("invalid generation settings")?;
            practice(config, seed)
        }
    }
}
