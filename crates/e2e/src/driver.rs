//! Driver management - spawning and health checking chromedriver

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to a running chromedriver process
pub struct DriverHandle {
    child: Child,
    pub base_url: String,
    pub port: u16,
}

impl DriverHandle {
    /// Spawn chromedriver and wait until it accepts sessions
    pub async fn spawn(config: DriverConfig) -> E2eResult<Self> {
        let port = match config.port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let base_url = format!("http://127.0.0.1:{}", port);

        info!("Spawning {} on port {}", config.binary_path.display(), port);

        let mut cmd = Command::new(&config.binary_path);
        cmd.arg(format!("--port={}", port));

        if config.verbose {
            cmd.arg("--verbose")
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            cmd.arg("--silent")
                .stdout(Stdio::null())
                .stderr(Stdio::null());
        }

        let child = cmd.spawn().map_err(|e| {
            E2eError::DriverStartup(format!(
                "Failed to spawn {}: {}",
                config.binary_path.display(),
                e
            ))
        })?;

        let handle = DriverHandle {
            child,
            base_url: base_url.clone(),
            port,
        };

        // Wait for driver to report ready
        handle.wait_for_ready(config.startup_timeout).await?;

        info!("chromedriver is ready at {}", base_url);
        Ok(handle)
    }

    /// Poll `/status` until the driver reports it is ready
    async fn wait_for_ready(&self, timeout_duration: Duration) -> E2eResult<()> {
        let status_url = format!("{}/status", self.base_url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&status_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let body: serde_json::Value = resp.json().await?;
                    if body["value"]["ready"].as_bool().unwrap_or(false) {
                        return Ok(());
                    }
                    warn!("chromedriver not ready: {}", body["value"]["message"]);
                }
                Ok(resp) => {
                    warn!("Status check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for chromedriver to start...");
                    }
                    // Connection refused is expected while the driver is starting
                    if !e.is_connect() {
                        warn!("Status check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::DriverHealthCheck(attempts))
    }

    /// Get the base URL for this driver
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the driver
    pub fn stop(&mut self) -> E2eResult<()> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }

        info!("Stopping chromedriver (pid: {})", self.child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(200));
            }
        }

        // Force kill if still running
        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Configuration for spawning chromedriver
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Path to the chromedriver binary
    pub binary_path: PathBuf,

    /// Port to listen on (None = find free port)
    pub port: Option<u16>,

    /// Timeout for driver startup
    pub startup_timeout: Duration,

    /// Pass driver logs through to the console
    pub verbose: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("chromedriver"),
            port: None,
            startup_timeout: Duration::from_secs(30),
            verbose: false,
        }
    }
}

/// Find a free port to use
fn find_free_port() -> E2eResult<u16> {
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Whether `binary` resolves to an executable, either as a path or on `PATH`
pub fn driver_available(binary: &std::path::Path) -> bool {
    if binary.components().count() > 1 {
        return binary.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(binary).is_file()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_free_port() {
        let port1 = find_free_port().unwrap();
        let port2 = find_free_port().unwrap();

        // Ports should be in valid range
        assert!(port1 > 1024);
        assert!(port2 > 1024);
    }

    #[test]
    fn test_missing_driver_is_not_available() {
        assert!(!driver_available(std::path::Path::new("/nonexistent/chromedriver")));
        assert!(!driver_available(std::path::Path::new("no-such-chromedriver-binary")));
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_fails() {
        let config = DriverConfig {
            binary_path: PathBuf::from("/nonexistent/chromedriver"),
            startup_timeout: Duration::from_millis(100),
            ..Default::default()
        };

        let err = DriverHandle::spawn(config).await.err().unwrap();
        assert!(matches!(err, E2eError::DriverStartup(_)));
    }
}
