//! Stringy command-line client.
//!
//! Resolves `stringy.IStringy@1.0` and runs the selected operations on one
//! input string, printing one tagged line (or block) per operation. With no
//! operation selected it only resolves the service and reports the handle.

use anyhow::Result;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use stringy_core::{
    ByteString, CharacterSequence, ServiceLocator, ServiceRegistry, StringyClient, Summary,
};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

/// Usage errors and failed calls.
const EXIT_FAILURE: u8 = 255;
/// The service could not be resolved.
const EXIT_UNRESOLVED: u8 = 254;

#[derive(Parser, Debug)]
#[command(name = "stringycl")]
#[command(about = "Call the Stringy string service")]
#[command(disable_help_flag = true)]
struct Args {
    /// Reverse the input string
    #[arg(short = 'r')]
    reverse: bool,

    /// Hash the input string
    #[arg(short = 'h')]
    hash: bool,

    /// Split the input string
    #[arg(short = 's')]
    split: bool,

    /// Print the summary of the input string
    #[arg(short = 'S')]
    summary: bool,

    /// Registry database (defaults to the per-user config directory)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Log resolution and call details to stderr
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Text to operate on
    input: String,
}

impl Args {
    fn any_operation(&self) -> bool {
        self.reverse || self.hash || self.split || self.summary
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_FAILURE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let log_level = if args.verbose { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let registry = match &args.registry {
        Some(path) => ServiceRegistry::open_at(path)?,
        None => ServiceRegistry::open()?,
    };
    let locator = ServiceLocator::new(registry);

    let client = match StringyClient::connect(&locator).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Unable to get stringy service interface: {}", e);
            return Ok(ExitCode::from(EXIT_UNRESOLVED));
        }
    };

    if !args.any_operation() {
        let handle = client.handle();
        println!(
            "[debug] {} at {} (PID {})",
            handle.descriptor(),
            handle.addr(),
            handle.instance_pid()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let input = ByteString::from(args.input.as_str());
    debug!("Input is {} byte(s)", input.len());

    if args.reverse {
        if let Err(e) = client.reverse(&input, print_reverse).await {
            eprintln!("Unable to reverse input string ({}). Err: {}", args.input, e);
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
    }

    if args.hash {
        match client.hash(&input).await {
            Ok(hash) => println!("[hash] {}", hash),
            Err(e) => {
                eprintln!("Unable to hash input string ({}). Err: {}", args.input, e);
                return Ok(ExitCode::from(EXIT_FAILURE));
            }
        }
    }

    if args.split {
        if let Err(e) = client.split(&input, print_split).await {
            eprintln!("Unable to split input string ({}). Err: {}", args.input, e);
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
    }

    if args.summary {
        if let Err(e) = client.summarize(&input, print_summary).await {
            eprintln!("Unable to summarize input string ({}). Err: {}", args.input, e);
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_reverse(reversed: ByteString) {
    println!("[reverse] {}", reversed.to_string_lossy());
}

fn print_split(chars: CharacterSequence) {
    println!("[split] total size: {}", chars.len());
    let rendered: String = chars
        .iter()
        .map(|c| format!("{} ", c as u8 as char))
        .collect();
    println!("[split] characters: {}", rendered);
}

fn print_summary(summary: Summary) {
    println!(
        "[summary] count: {}, hash: {}",
        summary.char_count, summary.hash
    );
}
