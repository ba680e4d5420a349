use std::{io::ErrorKind, path::PathBuf, sync::Arc};

use tokio::sync::Mutex;

use pifire_common::{RuntimeConfig, ServerConfig};

/// Persists [`RuntimeConfig`] as `runtime.json` under `$PIFIRE_DATA_DIR`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    runtime_path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        let data_dir = std::env::var("PIFIRE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.pifire"));
        Self::with_dir(data_dir)
    }

    pub fn with_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            runtime_path: Arc::new(data_dir.into().join("runtime.json")),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// A missing file yields defaults.
    pub async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(self.runtime_path.as_ref()).await {
            Ok(raw) => Ok(serde_json::from_slice::<RuntimeConfig>(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn save_runtime_config(&self, runtime: &RuntimeConfig) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let path = self.runtime_path.as_ref().clone();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(runtime)?;
        tokio::fs::write(path, payload).await?;
        Ok(())
    }

    /// Rewrites only the server section, keeping any bridge tunables on disk.
    pub async fn save_server(&self, server: &ServerConfig) -> anyhow::Result<()> {
        let mut runtime = self.load_runtime_config().await?;
        runtime.server = server.clone();
        self.save_runtime_config(&runtime).await
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
