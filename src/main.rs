//! rd-nurse CLI - checks a Rhythm Doctor level for illegal oneshots and holds

use clap::{ArgAction, CommandFactory, Parser};
use rd_nurse::{check_level, parse_level, CheckOptions, LevelResult};
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "rd-nurse", version)]
#[command(about = "Checks a Rhythm Doctor level for illegal oneshots and holds", long_about = None)]
struct Cli {
    /// Level file to check (reads stdin when omitted)
    file: Option<PathBuf>,

    /// Ignore the voice sources of the cues
    #[arg(short = 's', long)]
    ignore_source: bool,

    /// Make squareshots stop oneshot patterns
    #[arg(short = 'p', long)]
    interruptible_pattern: bool,

    /// Enable triangleshots
    #[arg(short = 't', long)]
    triangleshot: bool,

    /// TOML file with check options; flags given here are added to it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print findings as JSON
    #[arg(long)]
    json: bool,

    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> CheckOptions {
        CheckOptions {
            ignore_voice_source: self.ignore_source,
            interruptible_pattern: self.interruptible_pattern,
            triangleshot: self.triangleshot,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_input(file: Option<&Path>) -> LevelResult<String> {
    if let Some(path) = file {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        warn!("Reading from stdin which is a terminal");
    }
    let mut text = String::new();
    stdin.read_to_string(&mut text)?;
    Ok(text)
}

fn run(cli: &Cli) -> LevelResult<ExitCode> {
    let mut options = cli.options();
    if let Some(path) = &cli.config {
        options = options.union(CheckOptions::load(path)?);
    }

    let text = read_input(cli.file.as_deref())?;
    if text.is_empty() {
        Cli::command().print_help()?;
        return Ok(ExitCode::from(2));
    }

    let level = parse_level(&text)?;
    let result = check_level(&level, &options);
    if result.has_burnshot {
        warn!("Level contains burnshots; results may be incorrect");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result.findings())?);
    } else {
        print!("{}", result.to_text(&level.time_index));
    }

    Ok(if result.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::from(2)
        }
    }
}
