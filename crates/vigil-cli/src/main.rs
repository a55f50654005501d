mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::daemon::{run_daemon_process, run_foreground, show_status, start_daemon, stop_daemon};
use vigil_core::config::get_data_dir;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Keep the display awake from a menu widget", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the background daemon
    Start,
    /// (Internal) Run the daemon process
    #[command(hide = true)]
    DaemonInternalStart,
    /// Run the daemon in the foreground
    Run,
    /// Stop the background daemon
    Stop,
    /// Check daemon status and accumulated time
    Status,
    /// Show the widget and keep the display awake
    Show,
    /// Hide the widget and let the display sleep
    Hide,
    /// Flip widget visibility
    Toggle,
    /// Show the total time the display was kept awake
    Stats {
        /// Reset the total after showing it
        #[arg(short, long)]
        reset: bool,
    },
    /// Reset the accumulated total to zero
    Reset,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::DaemonInternalStart) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .init();
    }

    let data_dir = get_data_dir()?;

    match cli.command {
        Commands::Start => start_daemon(&data_dir).await,
        Commands::DaemonInternalStart => run_daemon_process(&data_dir).await,
        Commands::Run => run_foreground(&data_dir).await,
        Commands::Stop => stop_daemon(&data_dir).await,
        Commands::Status => show_status(&data_dir).await,
        Commands::Show => commands::control::show(&data_dir).await,
        Commands::Hide => commands::control::hide(&data_dir).await,
        Commands::Toggle => commands::control::toggle(&data_dir).await,
        Commands::Stats { reset } => commands::control::stats(&data_dir, reset).await,
        Commands::Reset => commands::control::reset(&data_dir).await,
        Commands::Config => commands::config::handle_config_show(&data_dir),
    }
}
