/// Widget control command handlers (show, hide, toggle, stats, reset)
use anyhow::{bail, Result};
use std::path::Path;
use vigil_core::{
    daemon_control::DaemonControl,
    ipc::{IpcClient, IpcRequest, IpcResponse},
};

/// Render whole seconds as `HH:MM:SS`.
pub fn format_clock(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

fn describe_visibility(visible: bool, active: bool) -> String {
    match (visible, active) {
        (true, true) => String::from("Widget shown, keeping display awake"),
        (true, false) => String::from("Widget shown, but the display assertion was denied"),
        (false, _) => String::from("Widget hidden, display may sleep"),
    }
}

async fn send(data_dir: &Path, request: IpcRequest) -> Result<Option<IpcResponse>> {
    let control = DaemonControl::new(data_dir);
    if !control.sock_path().exists() {
        println!("Daemon is not running. Start it with `vigil start`.");
        return Ok(None);
    }

    let client = IpcClient::new(control.sock_path());
    match client.send_command(request).await {
        Ok(response) => Ok(Some(response)),
        Err(e) => {
            log::error!("Failed to reach daemon: {e}");
            println!("Daemon is not responding. Try `vigil stop` then `vigil start`.");
            Ok(None)
        }
    }
}

async fn visibility_command(data_dir: &Path, request: IpcRequest) -> Result<()> {
    match send(data_dir, request).await? {
        Some(IpcResponse::Visibility { visible, active }) => {
            println!("{}", describe_visibility(visible, active));
            Ok(())
        }
        Some(other) => bail!("Unexpected response from daemon: {other:?}"),
        None => Ok(()),
    }
}

pub async fn show(data_dir: &Path) -> Result<()> {
    visibility_command(data_dir, IpcRequest::Show).await
}

pub async fn hide(data_dir: &Path) -> Result<()> {
    visibility_command(data_dir, IpcRequest::Hide).await
}

pub async fn toggle(data_dir: &Path) -> Result<()> {
    visibility_command(data_dir, IpcRequest::Toggle).await
}

pub async fn stats(data_dir: &Path, reset: bool) -> Result<()> {
    match send(data_dir, IpcRequest::Stats { reset }).await? {
        Some(IpcResponse::Stats {
            total_seconds,
            message,
            reset,
        }) => {
            println!("{message}");
            println!("({})", format_clock(total_seconds));
            if reset {
                println!("\nStatistics reset.");
            }
            Ok(())
        }
        Some(other) => bail!("Unexpected response from daemon: {other:?}"),
        None => Ok(()),
    }
}

pub async fn reset(data_dir: &Path) -> Result<()> {
    match send(data_dir, IpcRequest::Reset).await? {
        Some(IpcResponse::Reset) => {
            println!("Statistics reset.");
            Ok(())
        }
        Some(other) => bail!("Unexpected response from daemon: {other:?}"),
        None => Ok(()),
    }
}
