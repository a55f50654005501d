use crate::{
    app::AppContext,
    clock::SystemClock,
    config::Config,
    daemon_control::SOCKET_FILE_NAME,
    ipc::{bind, serve, DaemonIpcHandler},
    power::create_inhibitor,
    presentation::{MenuState, PresentationSink},
    tracker::SessionTracker,
};
use anyhow::{Context, Result};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    signal::unix::{signal, SignalKind},
    time::interval,
};
use vigil_storage::{Database, SqliteStatsStore};

/// How often the main loop checks for a shutdown request.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct Daemon {
    app: Arc<AppContext>,
    ipc_handler: Arc<DaemonIpcHandler>,
    shutdown_signal: Arc<AtomicBool>,
    sock_path: PathBuf,
    start_active: bool,
}

impl Daemon {
    /// Wire the production tracker: `SQLite` stats, `keepawake` inhibitor, menu sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings database cannot be opened
    pub fn new(config: &Config, data_dir: &Path) -> Result<Self> {
        let db = Database::new(&config.database_path(data_dir))
            .context("Failed to open settings database")?;
        let store = SqliteStatsStore::new(db);

        let sink = Arc::new(MenuState::new());
        match store.mark_launched() {
            Ok(true) => sink.first_launch(),
            Ok(false) => {}
            Err(e) => log::warn!("Could not read first-launch flag: {e}"),
        }

        let tracker = SessionTracker::new(
            create_inhibitor(),
            Box::new(store),
            sink.clone(),
            Arc::new(SystemClock),
            config.assertion_reason.clone(),
        );
        let app = Arc::new(AppContext::new(tracker, sink, config.refresh_interval()));

        Ok(Self::from_app(
            app,
            data_dir.join(SOCKET_FILE_NAME),
            config.start_active,
        ))
    }

    #[must_use]
    pub fn from_app(app: Arc<AppContext>, sock_path: PathBuf, start_active: bool) -> Self {
        let shutdown_signal = Arc::new(AtomicBool::new(false));
        Self {
            ipc_handler: Arc::new(DaemonIpcHandler::new(app.clone(), shutdown_signal.clone())),
            app,
            shutdown_signal,
            sock_path,
            start_active,
        }
    }

    #[must_use]
    pub fn app(&self) -> Arc<AppContext> {
        self.app.clone()
    }

    /// Serve IPC until Shutdown, Ctrl-C, SIGTERM or SIGHUP, then close the session.
    ///
    /// # Errors
    ///
    /// Returns an error if another daemon already serves the socket, or if the
    /// control socket or signal handlers cannot be set up
    pub async fn run_with_signals(&mut self) -> Result<()> {
        let listener = bind(&self.sock_path)
            .await
            .with_context(|| format!("Failed to bind {}", self.sock_path.display()))?;
        let ipc_handler = self.ipc_handler.clone();
        let ipc_task = tokio::spawn(async move {
            if let Err(e) = serve(ipc_handler, listener).await {
                log::error!("IPC listener failed: {e}");
            }
        });

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;

        self.app.launch(self.start_active).await;
        log::info!("Daemon started with signal handling and IPC");

        let mut poll = interval(SHUTDOWN_POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = poll.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received Ctrl-C, shutting down...");
                    self.shutdown_signal.store(true, Ordering::SeqCst);
                }
                _ = sigterm.recv() => {
                    log::info!("Received SIGTERM, shutting down...");
                    self.shutdown_signal.store(true, Ordering::SeqCst);
                }
                _ = sighup.recv() => {
                    log::info!("Received SIGHUP, shutting down...");
                    self.shutdown_signal.store(true, Ordering::SeqCst);
                }
            }

            if self.shutdown_signal.load(Ordering::SeqCst) {
                break;
            }
        }

        // Close the open session before exiting
        ipc_task.abort();
        self.app.shutdown().await;
        if self.sock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.sock_path) {
                log::warn!("Failed to remove socket: {e}");
            }
        }
        log::info!("Daemon shut down gracefully.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::{IpcClient, IpcRequest, IpcResponse};
    use crate::test_support::Harness;

    #[tokio::test]
    async fn test_daemon_serves_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("vigil.sock");

        let h = Harness::new();
        let (store, inhibitor, clock) = (h.store.clone(), h.inhibitor.clone(), h.clock.clone());
        let app = Arc::new(AppContext::new(
            h.tracker,
            h.sink.clone(),
            Duration::from_secs(60),
        ));
        let mut daemon = Daemon::from_app(app, sock_path.clone(), true);
        let running = tokio::spawn(async move { daemon.run_with_signals().await });

        let client = IpcClient::new(&sock_path);
        let mut status = None;
        for _ in 0..100 {
            if let Ok(response) = client.send_command(IpcRequest::Status).await {
                status = Some(response);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        match status {
            Some(IpcResponse::Status { visible, active, .. }) => {
                assert!(visible);
                assert!(active);
            }
            other => panic!("daemon never answered status: {other:?}"),
        }
        assert_eq!(inhibitor.held(), 1);

        clock.advance(Duration::from_secs(75));
        assert_eq!(
            client.send_command(IpcRequest::Shutdown).await.unwrap(),
            IpcResponse::Shutdown
        );
        running.await.unwrap().unwrap();

        assert_eq!(store.saved(), Some(Duration::from_secs(75)));
        assert_eq!(inhibitor.held(), 0);
        assert!(!sock_path.exists());
    }

    #[tokio::test]
    async fn test_second_daemon_on_same_socket_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("vigil.sock");

        let first = Harness::new();
        let (store, inhibitor, clock) = (
            first.store.clone(),
            first.inhibitor.clone(),
            first.clock.clone(),
        );
        let app = Arc::new(AppContext::new(
            first.tracker,
            first.sink.clone(),
            Duration::from_secs(60),
        ));
        let mut daemon = Daemon::from_app(app, sock_path.clone(), true);
        let running = tokio::spawn(async move { daemon.run_with_signals().await });

        let client = IpcClient::new(&sock_path);
        let mut up = false;
        for _ in 0..100 {
            if client.send_command(IpcRequest::Status).await.is_ok() {
                up = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(up, "first daemon never answered");

        let second = Harness::new();
        let second_inhibitor = second.inhibitor.clone();
        let app = Arc::new(AppContext::new(
            second.tracker,
            second.sink.clone(),
            Duration::from_secs(60),
        ));
        let mut intruder = Daemon::from_app(app, sock_path.clone(), true);
        assert!(intruder.run_with_signals().await.is_err());
        assert_eq!(second_inhibitor.held(), 0);
        assert!(sock_path.exists());

        // Shutdown still reaches the first daemon, which flushes its session.
        clock.advance(Duration::from_secs(75));
        assert_eq!(
            client.send_command(IpcRequest::Shutdown).await.unwrap(),
            IpcResponse::Shutdown
        );
        running.await.unwrap().unwrap();
        assert_eq!(store.saved(), Some(Duration::from_secs(75)));
        assert_eq!(inhibitor.held(), 0);
    }

    #[tokio::test]
    async fn test_new_marks_first_launch_and_loads_total() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            start_active: false,
            ..Config::default()
        };

        {
            let db = Database::new(&config.database_path(dir.path())).unwrap();
            let store = SqliteStatsStore::new(db);
            vigil_storage::StatsPersistence::save(&store, Duration::from_secs(120)).unwrap();
        }

        let daemon = Daemon::new(&config, dir.path()).unwrap();
        let snapshot = daemon.app().snapshot().await;
        assert!(!snapshot.active);
        assert_eq!(snapshot.total, Duration::from_secs(120));

        let db = Database::new(&config.database_path(dir.path())).unwrap();
        assert!(SqliteStatsStore::new(db).has_launched_before().unwrap());
    }
}
