use clap::Parser;
use clap::builder::TypedValueParser;
use log::{error, info};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use decksheet::{DeckRequest, OverrideTable, ScryfallClient, Settings, SheetLayout};

/// Turn decklists into card sheets that can be imported into Tabletop Simulator.
/// Every deck lives in its own folder containing a decklist.txt, each line of
/// which is a quantity, a tab and a card name.
#[derive(Parser, Debug)]
#[command(version)]
struct Opts {
    /// deck folder names, asked for interactively when missing
    decks: Vec<String>,
    /// folder containing the deck folders
    #[arg(long, default_value = "Decklists")]
    decklists_dir: PathBuf,
    /// template image of 4060x4060 pixels, a blank sheet by default
    #[arg(long)]
    template: Option<PathBuf>,
    /// JSON object mapping card names to image urls, overrides the lookup
    #[arg(long)]
    overrides: Option<PathBuf>,
    /// number of concurrent downloads per deck
    #[arg(long, default_value_t = decksheet::DEFAULT_JOBS, value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    jobs: usize,
    /// delete leftovers in an existing output folder
    #[arg(long)]
    clean: bool,
    /// log debug messages
    #[arg(short, long)]
    verbose: bool,
    /// also write the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn setup_logger(verbose: bool, log_file: Option<&PathBuf>) -> Result<(), fern::InitError> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Warn)
        .level_for("decksheet", level)
        .chain(std::io::stderr());
    if let Some(path) = log_file {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }
    dispatch.apply()?;
    Ok(())
}

fn prompt_deck_names() -> std::io::Result<Vec<String>> {
    print!("Enter the names of folders to create a template image for, separated by tabs: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(split_deck_names(&line))
}

fn split_deck_names(line: &str) -> Vec<String> {
    line.trim_end_matches(['\r', '\n'])
        .split('\t')
        .filter(|s| !s.trim().is_empty())
        .map(String::from)
        .collect()
}

fn load_overrides(extra: Option<&PathBuf>) -> decksheet::Result<OverrideTable> {
    let mut overrides = OverrideTable::builtin()?;
    if let Some(path) = extra {
        overrides.merge(OverrideTable::from_file(path)?);
    }
    info!("{} image url overrides", overrides.len());
    Ok(overrides)
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Opts::parse();
    if let Err(e) = setup_logger(opts.verbose, opts.log_file.as_ref()) {
        eprintln!("couldn't set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    let decks = if opts.decks.is_empty() {
        match prompt_deck_names() {
            Ok(decks) => decks,
            Err(e) => {
                error!("couldn't read deck names: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        opts.decks.clone()
    };

    let overrides = match load_overrides(opts.overrides.as_ref()) {
        Ok(overrides) => Arc::new(overrides),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let client = match ScryfallClient::new() {
        Ok(client) => client,
        Err(e) => {
            error!("couldn't create http client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let settings = Settings {
        layout: SheetLayout::TABLETOP,
        template: opts.template.clone(),
        jobs: opts.jobs,
        clean: opts.clean,
    };

    println!("Working...");
    let mut failed = 0;
    for deck in decks.iter() {
        let request = DeckRequest::in_folder(&opts.decklists_dir, deck);
        match decksheet::process_deck(&request, &settings, &client, overrides.clone()).await {
            Ok(_) => println!("Done with {}", deck),
            Err(e) => {
                error!("{}: {}", deck, e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        error!("{} of {} decks failed", failed, decks.len());
        ExitCode::FAILURE
    } else {
        println!("DONE WITH ALL!");
        ExitCode::SUCCESS
    }
}
