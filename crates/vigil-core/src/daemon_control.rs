use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const PID_FILE_NAME: &str = "vigil.pid";
pub const SOCKET_FILE_NAME: &str = "vigil.sock";
pub const LOG_FILE_NAME: &str = "vigil.log";

/// PID file and socket locations for the background daemon
pub struct DaemonControl {
    pid_file: PathBuf,
    sock_path: PathBuf,
}

impl DaemonControl {
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            pid_file: data_dir.join(PID_FILE_NAME),
            sock_path: data_dir.join(SOCKET_FILE_NAME),
        }
    }

    #[must_use]
    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    #[must_use]
    pub fn sock_path(&self) -> &Path {
        &self.sock_path
    }

    /// Get PID of the recorded daemon, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the PID file exists but cannot be read or parsed
    pub fn get_pid(&self) -> Result<Option<u32>> {
        if !self.pid_file.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.pid_file)
            .with_context(|| format!("Failed to read {}", self.pid_file.display()))?;
        let pid = contents
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Corrupt PID file {}", self.pid_file.display()))?;
        Ok(Some(pid))
    }

    /// # Errors
    ///
    /// Returns an error if the PID file cannot be written
    pub fn write_pid(&self, pid: u32) -> Result<()> {
        if let Some(parent) = self.pid_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.pid_file, pid.to_string())?;
        Ok(())
    }

    /// Remove PID file
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed
    pub fn remove_pid(&self) -> Result<()> {
        if self.pid_file.exists() {
            std::fs::remove_file(&self.pid_file)?;
        }
        Ok(())
    }

    /// Remove a leftover socket file
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed
    pub fn remove_socket(&self) -> Result<()> {
        if self.sock_path.exists() {
            std::fs::remove_file(&self.sock_path)?;
        }
        Ok(())
    }
}
