//! Hive node - the application entry point.
//!
//! Architecture:
//! - Single process with one shared document store
//! - Voting core ([`VotingSystem`]) over that store
//! - HTTP API and live vote feed for the mobile clients

use crate::activity::{ActivityLog, StoreActivitySink};
use crate::api;
use crate::cascade;
use crate::error::{Error, Result};
use crate::storage::{DocumentStore, MemoryStore, RocksStore};
use crate::voting::VotingSystem;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Which document store backend to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// RocksDB under the data directory
    Rocks,
    /// In-memory, lost on exit
    Memory,
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rocksdb" | "rocks" => Ok(StoreBackend::Rocks),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(Error::Config(format!("unknown store backend: {}", other))),
        }
    }
}

/// Configuration for a hive node.
#[derive(Debug, Clone)]
pub struct HiveConfig {
    /// Data directory for storage
    pub data_dir: PathBuf,

    /// HTTP API listen address
    pub api_addr: SocketAddr,

    /// Store backend
    pub store: StoreBackend,
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./hive-data"),
            api_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            store: StoreBackend::Rocks,
        }
    }
}

impl HiveConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let data_dir = lookup("HIVE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let api_addr = match lookup("HIVE_API_ADDR") {
            Some(addr) => addr
                .parse()
                .map_err(|_| Error::Config(format!("invalid HIVE_API_ADDR: {}", addr)))?,
            None => defaults.api_addr,
        };

        let store = match lookup("HIVE_STORE") {
            Some(backend) => backend.parse()?,
            None => defaults.store,
        };

        Ok(Self {
            data_dir,
            api_addr,
            store,
        })
    }
}

/// Shared state for API handlers.
pub struct HiveState {
    pub voting: VotingSystem,
    pub config: HiveConfig,
}

/// A hive node instance.
pub struct HiveNode {
    state: Arc<HiveState>,
    config: HiveConfig,
}

impl HiveNode {
    /// Create a node: open storage, then finish interrupted group deletions
    /// and vote executions.
    pub fn new(config: HiveConfig) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.store {
            StoreBackend::Rocks => {
                std::fs::create_dir_all(&config.data_dir)?;
                Arc::new(RocksStore::open(&config.data_dir)?)
            }
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };

        let resumed = cascade::resume_group_deletions(store.as_ref())?;
        if resumed > 0 {
            tracing::info!("Completed {} interrupted group deletions", resumed);
        }

        let activity = ActivityLog::new(Arc::new(StoreActivitySink::new(Arc::clone(&store))));
        let voting = VotingSystem::new(store, activity);

        let settled = voting.resume_executing_votes()?;
        if settled > 0 {
            tracing::info!("Completed {} interrupted vote executions", settled);
        }

        let state = Arc::new(HiveState {
            voting,
            config: config.clone(),
        });

        Ok(Self { state, config })
    }

    /// Get the shared state (for API handlers).
    pub fn state(&self) -> Arc<HiveState> {
        Arc::clone(&self.state)
    }

    /// Run the HTTP API until the listener fails.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Hive node starting");
        tracing::info!("  API: http://{}", self.config.api_addr);
        tracing::info!("  Store: {:?}", self.config.store);
        tracing::info!("  Data: {:?}", self.config.data_dir);

        let app = api::build_router(self.state());

        let listener = tokio::net::TcpListener::bind(self.config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.api_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
