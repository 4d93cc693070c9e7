//! pwsh-bridge command-line driver
//!
//! Reads commands from stdin, one per line, runs them in a single shell
//! session and prints each result as JSON on stdout. Errors go to stderr.

use anyhow::{bail, Context};
use std::env;
use std::path::PathBuf;
use std::process;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use pwsh_bridge::{handle_startup_error, load_config, ExecRequest, Session};

/// Command line options
#[derive(Debug, Default)]
struct CliArgs {
    /// Configuration file path
    config_path: Option<PathBuf>,
    /// Shells to try first, in order
    shells: Vec<String>,
    /// Enable debug logging
    debug: bool,
    /// Per-command timeout override in milliseconds
    timeout_ms: Option<u64>,
}

impl CliArgs {
    fn parse() -> anyhow::Result<Self> {
        Self::parse_from(env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut cli = CliArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = args.next().context("Missing config file path")?;
                    cli.config_path = Some(PathBuf::from(path));
                }
                "--shell" | "-s" => {
                    let shell = args.next().context("Missing shell name")?;
                    cli.shells.push(shell);
                }
                "--timeout" | "-t" => {
                    let value = args.next().context("Missing timeout value")?;
                    let ms = value
                        .parse::<u64>()
                        .with_context(|| format!("Invalid timeout: {}", value))?;
                    cli.timeout_ms = Some(ms);
                }
                "--debug" | "-d" => cli.debug = true,
                "--help" | "-h" => {
                    print_help();
                    process::exit(0);
                }
                "--version" | "-v" => {
                    println!("{} v{}", pwsh_bridge::NAME, pwsh_bridge::VERSION);
                    process::exit(0);
                }
                other => bail!("Unknown option: {}", other),
            }
        }

        Ok(cli)
    }
}

fn print_help() {
    println!("{} - {}", pwsh_bridge::NAME, pwsh_bridge::DESCRIPTION);
    println!();
    println!("USAGE:");
    println!("    pwsh-bridge [OPTIONS] < commands.ps1");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>    Path to configuration file (.toml or .json)");
    println!("    -s, --shell <NAME>     Shell executable to try first (repeatable)");
    println!("    -t, --timeout <MS>     Per-command timeout in milliseconds (0 disables)");
    println!("    -d, --debug            Enable debug logging");
    println!("    -h, --help             Print this help message");
    println!("    -v, --version          Print version information");
    println!();
    println!("CONFIGURATION:");
    println!("    Without --config, the first config.toml or config.json found in");
    println!("    $XDG_CONFIG_HOME/pwsh-bridge, the user config directory,");
    println!("    ~/.pwsh-bridge and ./.pwsh-bridge is used.");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG               Set logging level (error, warn, info, debug, trace)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse().unwrap_or_else(|e| {
        eprintln!("Failed to parse arguments: {}", e);
        print_help();
        process::exit(2);
    });

    let log_level = if args.debug { "debug" } else { "warn" };
    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from(env_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let mut config = load_config(args.config_path.as_deref())?;
    if !args.shells.is_empty() {
        let mut shells = args.shells.clone();
        shells.append(&mut config.additional_shells);
        config.additional_shells = shells;
    }
    if let Some(ms) = args.timeout_ms {
        config.timeouts.command_ms = ms;
    }
    config.auto_start = true;

    let mut session = match Session::launch(config).await {
        Ok(session) => session,
        Err(e) => {
            error!("Session failed to start: {}", e);
            eprintln!("{}", handle_startup_error(&e));
            process::exit(1);
        }
    };
    info!("Session ready on '{}'", session.shell());

    let mut failures = 0usize;
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = line.trim();
        if command.is_empty() || command.starts_with('#') {
            continue;
        }
        debug!("Running: {}", command);

        match session.exec(ExecRequest::new(command)).await {
            Ok(output) => {
                let mut rendered = serde_json::to_string(&output.value)?;
                if output.timeout {
                    rendered = format!("{{\"timeout\":true,\"value\":{}}}", rendered);
                }
                rendered.push('\n');
                stdout.write_all(rendered.as_bytes()).await?;
                stdout.flush().await?;
            }
            Err(e) => {
                failures += 1;
                eprintln!("Error: {}", e);
            }
        }
    }

    session.shutdown().await?;

    if failures > 0 {
        process::exit(1);
    }
    Ok(())
}
