//! Pomodoro Cycle CLI
//!
//! Alternates focused work and short breaks:
//! - 25 minutes of work by default (1-180)
//! - 5 minutes of break by default (1-60)
//! - The cycle repeats until paused or reset

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use pomocycle::cli::{default_socket_path, Cli, Commands, Display, IpcClient};
use pomocycle::run_daemon;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins over the verbose flag.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let socket_path = match cli.socket {
        Some(path) => path,
        None => default_socket_path()?,
    };
    tracing::debug!(socket = %socket_path.display(), "Using daemon socket");

    match command {
        Commands::Start => {
            let response = client(socket_path).start().await?;
            Display::show_command_result(&response);
        }
        Commands::Pause => {
            let response = client(socket_path).pause().await?;
            Display::show_command_result(&response);
        }
        Commands::Toggle => {
            let response = client(socket_path).toggle().await?;
            Display::show_command_result(&response);
        }
        Commands::Reset => {
            let response = client(socket_path).reset().await?;
            Display::show_command_result(&response);
        }
        Commands::Work { minutes } => {
            let response = client(socket_path).set_work(minutes).await?;
            Display::show_command_result(&response);
        }
        Commands::Break { minutes } => {
            let response = client(socket_path).set_break(minutes).await?;
            Display::show_command_result(&response);
        }
        Commands::Status => {
            let response = client(socket_path).status().await?;
            Display::show_status(&response);
        }
        Commands::Watch => {
            client(socket_path)
                .watch(Display::show_watch_update)
                .await?;
        }
        Commands::Daemon(args) => {
            run_daemon(&socket_path, args.timer_config()).await?;
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
        }
    }

    Ok(())
}

fn client(socket_path: PathBuf) -> IpcClient {
    IpcClient::with_socket_path(socket_path)
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
