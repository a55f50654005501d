use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
};

use crate::app::AppContext;
use crate::format::{format_total, menu_label, stats_message};
use crate::presentation::{StatsChoice, StatsSummary, StatsView};

/// IPC request from CLI to daemon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcRequest {
    Status,
    Show,
    Hide,
    Toggle,
    /// Open the stats view; `reset` answers its reset prompt up front.
    Stats { reset: bool },
    Reset,
    Shutdown,
}

/// IPC response from daemon to CLI
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcResponse {
    Status {
        visible: bool,
        active: bool,
        total_seconds: u64,
        label: String,
        active_since: Option<DateTime<Utc>>,
    },
    Visibility {
        visible: bool,
        active: bool,
    },
    Stats {
        total_seconds: u64,
        message: String,
        reset: bool,
    },
    Reset,
    Shutdown,
}

#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    /// Send one request and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable or replies with garbage
    pub async fn send_command(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;

        let encoded = bincode::serialize(&request)?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        let response: IpcResponse = bincode::deserialize(&buffer)?;

        Ok(response)
    }
}

/// Answers the stats view's reset prompt with a choice made by the caller.
struct RemoteStatsView {
    reset: bool,
    summary: std::sync::Mutex<Option<StatsSummary>>,
}

impl StatsView for RemoteStatsView {
    fn present(&self, summary: &StatsSummary) -> StatsChoice {
        if let Ok(mut seen) = self.summary.lock() {
            *seen = Some(summary.clone());
        }
        if self.reset {
            StatsChoice::Reset
        } else {
            StatsChoice::Dismiss
        }
    }
}

pub struct DaemonIpcHandler {
    app: Arc<AppContext>,
    shutdown_signal: Arc<AtomicBool>,
}

impl DaemonIpcHandler {
    pub fn new(app: Arc<AppContext>, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            app,
            shutdown_signal,
        }
    }

    /// Apply `request` to the app and build the reply.
    pub async fn respond(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Status => {
                let snapshot = self.app.snapshot().await;
                IpcResponse::Status {
                    visible: snapshot.visible,
                    active: snapshot.active,
                    total_seconds: snapshot.total.as_secs(),
                    label: menu_label(&format_total(snapshot.total)),
                    active_since: snapshot.active_since,
                }
            }
            IpcRequest::Show => {
                let active = self.app.show().await;
                IpcResponse::Visibility {
                    visible: true,
                    active,
                }
            }
            IpcRequest::Hide => {
                self.app.hide().await;
                IpcResponse::Visibility {
                    visible: false,
                    active: false,
                }
            }
            IpcRequest::Toggle => {
                let visible = self.app.toggle().await;
                let active = self.app.snapshot().await.active;
                IpcResponse::Visibility { visible, active }
            }
            IpcRequest::Stats { reset } => {
                let view = RemoteStatsView {
                    reset,
                    summary: std::sync::Mutex::new(None),
                };
                let choice = self.app.open_stats(&view).await;
                let total = view
                    .summary
                    .into_inner()
                    .ok()
                    .flatten()
                    .map(|s| s.total)
                    .unwrap_or_default();
                IpcResponse::Stats {
                    total_seconds: total.as_secs(),
                    message: stats_message(total),
                    reset: choice == StatsChoice::Reset,
                }
            }
            IpcRequest::Reset => {
                self.app.reset().await;
                IpcResponse::Reset
            }
            IpcRequest::Shutdown => {
                self.shutdown_signal.store(true, Ordering::SeqCst);
                IpcResponse::Shutdown
            }
        }
    }

    pub async fn handle(
        &self,
        stream: &mut UnixStream,
        request: IpcRequest,
    ) -> Result<(), anyhow::Error> {
        log::debug!("IPC request: {request:?}");
        let response = self.respond(request).await;

        let encoded = bincode::serialize(&response)?;
        stream.write_all(&encoded).await?;
        Ok(())
    }
}

/// Bind the control socket. A leftover socket file is replaced only when
/// nothing is listening on it.
///
/// # Errors
///
/// Returns [`io::ErrorKind::AddrInUse`] if another daemon answers on `sock_path`,
/// or an error if the stale socket cannot be removed or binding fails
pub async fn bind(sock_path: &Path) -> io::Result<UnixListener> {
    if sock_path.exists() {
        match UnixStream::connect(sock_path).await {
            Ok(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::AddrInUse,
                    format!("another daemon is listening on {}", sock_path.display()),
                ));
            }
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                log::warn!("Removing stale socket {}", sock_path.display());
                fs::remove_file(sock_path)?;
            }
            Err(e) => return Err(e),
        }
    }
    UnixListener::bind(sock_path)
}

pub async fn serve(handler: Arc<DaemonIpcHandler>, listener: UnixListener) -> io::Result<()> {
    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    match stream.read_to_end(&mut buf).await {
                        Ok(n) if n > 0 => match bincode::deserialize::<IpcRequest>(&buf) {
                            Ok(request) => {
                                if let Err(e) = handler.handle(&mut stream, request).await {
                                    log::error!("IPC handle error: {e}");
                                }
                            }
                            Err(e) => {
                                log::error!("IPC deserialize error: {e}");
                            }
                        },
                        Ok(_) => {} // Connection closed
                        Err(e) => {
                            log::error!("IPC read error: {e}");
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }
}
