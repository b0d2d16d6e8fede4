//! Wallet backend process boundary
//!
//! The wallet itself is zingo-cli, normally running inside a container and
//! reached with `docker exec -i`. Commands go in on stdin followed by `quit`;
//! results come back on stdout.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::{BackendConfig, Config};
use crate::error::{Error, Result};

/// Whether zingo-cli may sync with the chain when it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Launch with `--nosync` (plain queries and sends)
    Skip,

    /// Launch without `--nosync` (the `sync` command itself)
    Allow,
}

/// Executes one command against the wallet and returns its raw stdout
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Run `command` and return stdout
    ///
    /// Fails with `BackendUnavailable` when the process cannot be started or
    /// exits non-zero, and with `Timeout` when `timeout` elapses first.
    async fn run(&self, command: &str, mode: SyncMode, timeout: Duration) -> Result<String>;
}

/// zingo-cli launched as a child process
#[derive(Debug, Clone)]
pub struct ZingoCliBackend {
    docker_bin: String,
    container: Option<String>,
    cli_bin: String,
    data_dir: PathBuf,
    server_uri: String,
}

impl ZingoCliBackend {
    /// Create a backend from loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.backend,
            config.wallet.data_dir.clone(),
            config.wallet.lightwalletd_uri.clone(),
        )
    }

    pub fn new(backend: &BackendConfig, data_dir: PathBuf, server_uri: String) -> Self {
        let container = Some(backend.container.trim().to_string()).filter(|c| !c.is_empty());

        Self {
            docker_bin: backend.docker_bin.clone(),
            container,
            cli_bin: backend.cli_bin.clone(),
            data_dir,
            server_uri,
        }
    }

    /// Program and arguments for one invocation
    pub fn command_line(&self, mode: SyncMode) -> (String, Vec<String>) {
        let mut args = Vec::new();

        let program = match &self.container {
            Some(container) => {
                args.extend([
                    "exec".to_string(),
                    "-i".to_string(),
                    container.clone(),
                    self.cli_bin.clone(),
                ]);
                self.docker_bin.clone()
            }
            None => self.cli_bin.clone(),
        };

        args.extend([
            "--data-dir".to_string(),
            self.data_dir.display().to_string(),
            "--server".to_string(),
            self.server_uri.clone(),
        ]);

        if mode == SyncMode::Skip {
            args.push("--nosync".to_string());
        }

        (program, args)
    }

    async fn spawn_and_wait(&self, command: &str, mode: SyncMode) -> Result<String> {
        let (program, args) = self.command_line(mode);

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::BackendUnavailable(format!("Failed to start {}: {}", program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let input = format!("{}\nquit\n", command);
            // A CLI that exits before reading stdin shows up in the exit status
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                debug!("Failed to write command to {}: {}", program, e);
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::BackendUnavailable(format!("Failed to wait for {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::BackendUnavailable(format!(
                "Command failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl WalletBackend for ZingoCliBackend {
    fn name(&self) -> &'static str {
        "zingo-cli"
    }

    async fn run(&self, command: &str, mode: SyncMode, timeout: Duration) -> Result<String> {
        debug!("zingo-cli <- {} ({:?})", command_word(command), mode);

        // Dropping the future kills the child (kill_on_drop)
        match tokio::time::timeout(timeout, self.spawn_and_wait(command, mode)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "zingo-cli command '{}' timed out after {:?}",
                    command_word(command),
                    timeout
                );
                Err(Error::Timeout {
                    command: command_word(command).to_string(),
                    secs: timeout.as_secs(),
                })
            }
        }
    }
}

/// First word of a command, so memos and addresses stay out of logs
pub fn command_word(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(container: &str, cli_bin: &str) -> ZingoCliBackend {
        let config = BackendConfig {
            container: container.to_string(),
            cli_bin: cli_bin.to_string(),
            ..BackendConfig::default()
        };
        ZingoCliBackend::new(
            &config,
            PathBuf::from("/var/zingo"),
            "http://lightwalletd:9067".to_string(),
        )
    }

    #[test]
    fn test_docker_exec_command_line() {
        let (program, args) = backend("zeckit-zingo-wallet", "zingo-cli").command_line(SyncMode::Skip);
        assert_eq!(program, "docker");
        assert_eq!(
            args,
            vec![
                "exec",
                "-i",
                "zeckit-zingo-wallet",
                "zingo-cli",
                "--data-dir",
                "/var/zingo",
                "--server",
                "http://lightwalletd:9067",
                "--nosync",
            ]
        );
    }

    #[test]
    fn test_sync_mode_omits_nosync() {
        let (_, args) = backend("zeckit-zingo-wallet", "zingo-cli").command_line(SyncMode::Allow);
        assert!(!args.iter().any(|a| a == "--nosync"));
    }

    #[test]
    fn test_local_binary_command_line() {
        let (program, args) = backend("  ", "/usr/local/bin/zingo-cli").command_line(SyncMode::Skip);
        assert_eq!(program, "/usr/local/bin/zingo-cli");
        assert_eq!(args[0], "--data-dir");
    }

    #[test]
    fn test_command_word() {
        assert_eq!(command_word("send u1abc 100 \"memo\""), "send");
        assert_eq!(command_word("  balance "), "balance");
        assert_eq!(command_word(""), "");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let backend = backend("", "/nonexistent/zingo-cli-for-tests");
        let result = backend
            .run("balance", SyncMode::Skip, Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(Error::BackendUnavailable(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_unavailable() {
        // `false` ignores its arguments and exits 1
        let backend = backend("", "false");
        let result = backend
            .run("balance", SyncMode::Skip, Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(Error::BackendUnavailable(_))));
    }
}
