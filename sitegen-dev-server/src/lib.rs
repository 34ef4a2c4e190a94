use anyhow::Result;
use axum::Router;
use std::{net::SocketAddr, path::PathBuf};
use tower_http::services::ServeDir;
use tracing::info;

/// Configuration for the static file server
#[derive(Debug, Clone)]
pub struct StaticServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to serve on
    pub port: u16,
    /// Directory to serve
    pub root: PathBuf,
}

impl Default for StaticServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            root: PathBuf::from("./public"),
        }
    }
}

impl StaticServerConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Serves a generated site. Directory requests get their `index.html`.
pub struct StaticServer {
    config: StaticServerConfig,
}

impl StaticServer {
    pub fn new(config: StaticServerConfig) -> Self {
        Self { config }
    }

    pub fn router(&self) -> Router {
        Router::new().fallback_service(ServeDir::new(&self.config.root))
    }

    /// Bind and serve until the process exits.
    pub async fn run(self) -> Result<()> {
        if !self.config.root.exists() {
            return Err(anyhow::anyhow!(
                "Root directory does not exist: {}",
                self.config.root.display()
            ));
        }

        let addr = self.config.addr()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(root = %self.config.root.display(), "serving at http://{addr}");
        println!("Serving at http://{addr}");

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
