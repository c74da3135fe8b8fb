//! Server management - spawning and health checking the login server

use loginlab_common::Locale;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to the server under test
///
/// Either a child process owned by this handle or an externally managed
/// server reachable at a fixed URL.
pub struct ServerHandle {
    child: Option<Child>,
    pub base_url: String,
}

impl ServerHandle {
    /// Spawn `loginlab-web`, or attach to `external_url` when set
    pub async fn spawn(config: ServerConfig) -> E2eResult<Self> {
        if let Some(url) = &config.external_url {
            let mut handle = ServerHandle {
                child: None,
                base_url: url.trim_end_matches('/').to_string(),
            };
            handle.wait_for_healthy(config.startup_timeout).await?;
            info!("Using external server at {}", handle.base_url);
            return Ok(handle);
        }

        let port = match config.port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let base_url = format!("http://127.0.0.1:{}", port);

        info!("Spawning login server on port {}", port);

        let mut cmd = Command::new(&config.binary_path);
        cmd.env("LOGINLAB_WEB_HOST", "127.0.0.1")
            .env("LOGINLAB_WEB_PORT", port.to_string())
            .env("LOGINLAB_LOCALE", config.locale.as_str())
            // A config file from the caller's environment must not change the allow-list.
            .env_remove("LOGINLAB_CONFIG")
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!(
                "Failed to spawn {}: {}",
                config.binary_path.display(),
                e
            ))
        })?;

        let mut handle = ServerHandle {
            child: Some(child),
            base_url,
        };

        // Wait for server to be healthy
        handle.wait_for_healthy(config.startup_timeout).await?;

        info!("Server is healthy at {}", handle.base_url);
        Ok(handle)
    }

    /// Wait for the server to respond to health checks. Fails early if an
    /// owned child process exits first.
    async fn wait_for_healthy(&mut self, timeout_duration: Duration) -> E2eResult<()> {
        let health_url = format!("{}/api/health", self.base_url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            if let Some(child) = self.child.as_mut() {
                if let Some(status) = child.try_wait()? {
                    self.child = None;
                    return Err(E2eError::ServerStartup(format!(
                        "server exited during startup: {}",
                        status
                    )));
                }
            }

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server to start...");
                    }
                    // Connection refused is expected while server is starting
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    /// Get the base URL for this server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server if this handle owns it
    pub fn stop(&mut self) -> E2eResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        info!("Stopping server (pid: {})", child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                for _ in 0..10 {
                    if matches!(child.try_wait(), Ok(Some(_))) {
                        return Ok(());
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
            }
        }

        // Force kill if still running
        let _ = child.kill();
        child.wait()?;

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Configuration for spawning a server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the loginlab-web binary
    pub binary_path: PathBuf,

    /// Port to listen on (None = find free port)
    pub port: Option<u16>,

    /// Timeout for server startup
    pub startup_timeout: Duration,

    /// Locale the server renders messages in
    pub locale: Locale,

    /// Use an already running server instead of spawning one
    pub external_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            port: None,
            startup_timeout: Duration::from_secs(30),
            locale: Locale::default(),
            external_url: None,
        }
    }
}

/// `target/debug/loginlab-web` at the workspace root
pub fn default_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../target/debug")
        .join(format!("loginlab-web{}", std::env::consts::EXE_SUFFIX))
}

/// Find a free port to use
pub fn find_free_port() -> std::io::Result<u16> {
    use std::net::TcpListener;

    Ok(TcpListener::bind("127.0.0.1:0")?.local_addr()?.port())
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
    fn test_default_binary_path() {
        let path = default_binary_path();
        assert!(path.ends_with(format!("loginlab-web{}", std::env::consts::EXE_SUFFIX)));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_startup() {
        let config = ServerConfig {
            binary_path: PathBuf::from("/nonexistent/loginlab-web"),
            startup_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let err = ServerHandle::spawn(config).await.err().unwrap();
        assert!(matches!(err, E2eError::ServerStartup(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_early_exit_fails_fast() {
        let config = ServerConfig {
            binary_path: PathBuf::from("false"),
            startup_timeout: Duration::from_secs(20),
            ..Default::default()
        };
        let start = std::time::Instant::now();
        let err = ServerHandle::spawn(config).await.err().unwrap();
        assert!(matches!(err, E2eError::ServerStartup(msg) if msg.contains("exited")));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_external_server_unreachable() {
        let port = find_free_port().unwrap();
        let config = ServerConfig {
            external_url: Some(format!("http://127.0.0.1:{}/", port)),
            startup_timeout: Duration::from_millis(300),
            ..Default::default()
        };
        let err = ServerHandle::spawn(config).await.err().unwrap();
        assert!(matches!(err, E2eError::ServerHealthCheck(n) if n >= 1));
    }
}
