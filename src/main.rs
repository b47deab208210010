//! Aro CLI entry point.

use aro::cli::commands;
use aro::cli::{Cli, Commands};
use aro::error::Error;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.silent {
        aro::SILENT.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info,reqwest=info,hyper_util=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let state = cli.state.as_ref();
    let offline = cli.offline;

    match &cli.command {
        Commands::Init { force } => commands::init::execute(state, *force, json),
        Commands::Version => commands::version::execute(json),

        // Session
        Commands::Login(args) => commands::session::login(args, state, json),
        Commands::Signup(args) => commands::session::signup(args, state, json),
        Commands::Logout => commands::session::logout(state, json),
        Commands::Status => commands::status::execute(state, json),

        // Cache edits
        Commands::Workout { command } => commands::workout::execute(command, state, offline, json),
        Commands::Tag { command } => commands::tag::execute(command, state, offline, json),
        Commands::Weight { command } => commands::record::weight(command, state, offline, json),
        Commands::Period { command } => commands::record::period(command, state, offline, json),
        Commands::Settings { command } => commands::record::settings(command, state, offline, json),

        // Sync
        Commands::Sync => commands::sync::push(state, json),
        Commands::Fetch { collection, all } => commands::sync::fetch(collection, *all, state, json),

        Commands::Plot { command } => commands::plot::execute(command, state, json),

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
