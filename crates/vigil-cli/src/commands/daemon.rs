/// Daemon lifecycle management commands
use anyhow::{bail, Result};
use std::{env, path::Path, process::Command, time::Duration};
use sysinfo::{Pid, System};
use vigil_core::{
    config::Config,
    daemon_control::{DaemonControl, LOG_FILE_NAME},
    ipc::{IpcClient, IpcRequest, IpcResponse},
    Daemon,
};

use super::control::format_clock;

/// How long `stop` waits for a graceful exit before killing the process.
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(3);

pub async fn start_daemon(data_dir: &Path) -> Result<()> {
    let control = DaemonControl::new(data_dir);

    // 1. Check if daemon is already running
    if let Some(running) = running_daemon(&control).await {
        log::info!("Daemon is already running ({running}).");
        return Ok(());
    }
    control.remove_pid()?;

    log::info!("Starting vigil daemon...");

    // 2. Spawn a new process for the daemon
    let current_exe = env::current_exe()?;
    let current_dir = env::current_dir()?;
    let child = Command::new(current_exe)
        .arg("daemon-internal-start")
        .current_dir(current_dir)
        .spawn()?;

    // 3. In parent process, write PID and exit
    log::info!("Daemon process started with PID: {}", child.id());
    control.write_pid(child.id())?;

    Ok(())
}

pub async fn run_daemon_process(data_dir: &Path) -> Result<()> {
    // This is the detached daemon process
    // We must set up logging here, as this is a new process.
    if let Err(e) = setup_daemon_logging(data_dir) {
        // If logging fails, we have no way to report errors. Panicking is the only option.
        panic!("Failed to set up daemon logging: {e}");
    }
    log::info!("Daemon process started internally.");

    if let Err(e) = daemon_main_logic(data_dir).await {
        log::error!("Daemon main logic exited with a fatal error: {e:#}");
        return Err(e);
    }

    Ok(())
}

/// Run the daemon attached to the terminal (logs go to stderr).
pub async fn run_foreground(data_dir: &Path) -> Result<()> {
    let control = DaemonControl::new(data_dir);
    if let Some(running) = running_daemon(&control).await {
        bail!("Daemon is already running ({running}). Stop it with `vigil stop` first.");
    }

    control.write_pid(std::process::id())?;
    let result = daemon_main_logic(data_dir).await;
    control.remove_pid()?;
    result
}

/// Describe a daemon that is already up, either by a live PID from the PID file
/// or by a socket that still answers. A stale or corrupt PID file does not count.
async fn running_daemon(control: &DaemonControl) -> Option<String> {
    match control.get_pid() {
        Ok(Some(pid)) if is_process_alive(pid) => return Some(format!("PID: {pid}")),
        Ok(_) => {}
        Err(e) => log::warn!("Ignoring unreadable PID file: {e:#}"),
    }

    let answers = control.sock_path().exists()
        && IpcClient::new(control.sock_path())
            .send_command(IpcRequest::Status)
            .await
            .is_ok();
    answers.then(|| format!("socket: {}", control.sock_path().display()))
}

async fn daemon_main_logic(data_dir: &Path) -> Result<()> {
    let config = Config::load(data_dir)?;
    let mut daemon = Daemon::new(&config, data_dir)?;
    daemon.run_with_signals().await
}

pub async fn stop_daemon(data_dir: &Path) -> Result<()> {
    let control = DaemonControl::new(data_dir);

    let Some(pid) = control.get_pid()? else {
        if control.sock_path().exists() {
            let client = IpcClient::new(control.sock_path());
            if let Ok(IpcResponse::Shutdown) = client.send_command(IpcRequest::Shutdown).await {
                log::info!("Daemon without a PID file asked to shut down.");
                return Ok(());
            }
        }
        log::info!("Daemon is not running (no PID file).");
        // Also remove socket if it exists for consistency
        control.remove_socket()?;
        return Ok(());
    };

    log::info!("Stopping vigil daemon (PID: {pid})...");
    let client = IpcClient::new(control.sock_path());

    match client.send_command(IpcRequest::Shutdown).await {
        Ok(IpcResponse::Shutdown) => {
            log::info!("Daemon shutdown signal sent. Waiting for process to exit...");
            if wait_for_exit(pid, STOP_GRACE_PERIOD).await {
                log::info!("Daemon stopped successfully.");
            } else {
                log::warn!("Daemon did not stop gracefully. Force killing...");
                kill_process(pid);
            }
        }
        Ok(resp) => log::error!("Received unexpected response from daemon: {resp:?}"),
        Err(e) => {
            log::error!("Failed to send shutdown command: {e}. Forcing cleanup.");
            kill_process(pid);
        }
    }

    // Cleanup
    control.remove_pid()?;
    control.remove_socket()?;

    Ok(())
}

pub async fn show_status(data_dir: &Path) -> Result<()> {
    let control = DaemonControl::new(data_dir);

    if !control.sock_path().exists() {
        println!("Daemon Status: Not running");
        return Ok(());
    }

    let client = IpcClient::new(control.sock_path());
    match client.send_command(IpcRequest::Status).await {
        Ok(IpcResponse::Status {
            visible,
            active,
            total_seconds,
            label,
            active_since,
        }) => {
            println!("Daemon Status: Running");
            println!("\n{label}");
            println!("  Widget: {}", if visible { "shown" } else { "hidden" });
            println!(
                "  Display sleep prevention: {}",
                if active { "ACTIVE" } else { "off" }
            );
            if let Some(since) = active_since {
                println!(
                    "  Active since: {}",
                    since.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
                );
            }
            println!("\nTotal Active: {}", format_clock(total_seconds));
        }
        Ok(_) => anyhow::bail!("Unexpected response from daemon"),
        Err(e) => {
            log::error!("Failed to get status: {e}");
            println!("Daemon Status: Not running (or not responding)");
        }
    }
    Ok(())
}

fn is_process_alive(pid: u32) -> bool {
    let mut sys = System::new();
    sys.refresh_process(Pid::from_u32(pid))
}

async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let step = Duration::from_millis(100);
    let mut waited = Duration::ZERO;
    while waited < timeout {
        if !is_process_alive(pid) {
            return true;
        }
        tokio::time::sleep(step).await;
        waited += step;
    }
    !is_process_alive(pid)
}

fn kill_process(pid: u32) {
    let mut sys = System::new();
    if sys.refresh_process(Pid::from_u32(pid)) {
        if let Some(process) = sys.process(Pid::from_u32(pid)) {
            if process.kill() {
                log::info!("Process killed.");
            }
        }
    }
}

fn setup_daemon_logging(data_dir: &Path) -> Result<()> {
    use std::fs::{create_dir_all, OpenOptions};

    let log_path = data_dir.join(LOG_FILE_NAME);

    if let Some(parent) = log_path.parent() {
        create_dir_all(parent)?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Debug)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_nothing_running_in_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let control = DaemonControl::new(dir.path());
        assert_eq!(running_daemon(&control).await, None);
    }

    #[tokio::test]
    async fn test_live_pid_counts_as_running() {
        let dir = tempfile::tempdir().unwrap();
        let control = DaemonControl::new(dir.path());
        control.write_pid(std::process::id()).unwrap();

        let running = running_daemon(&control).await.unwrap();
        assert!(running.contains(&std::process::id().to_string()));
    }

    #[tokio::test]
    async fn test_corrupt_pid_and_dead_socket_are_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let control = DaemonControl::new(dir.path());
        std::fs::write(control.pid_file(), "garbage").unwrap();
        std::fs::write(control.sock_path(), "").unwrap();

        assert_eq!(running_daemon(&control).await, None);
    }

    #[tokio::test]
    async fn test_run_foreground_refuses_when_daemon_is_live() {
        let dir = tempfile::tempdir().unwrap();
        let control = DaemonControl::new(dir.path());
        control.write_pid(std::process::id()).unwrap();

        assert!(run_foreground(dir.path()).await.is_err());
        // The live daemon's PID file is left alone.
        assert_eq!(control.get_pid().unwrap(), Some(std::process::id()));
    }
}
