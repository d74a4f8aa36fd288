use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::models::{OutputFormat, ResultKind, SnapshotDefaults};

/// 默认参数的部分更新
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDefaultsUpdate {
    pub format: Option<OutputFormat>,
    pub quality: Option<f64>,
    pub result: Option<ResultKind>,
}

pub struct SettingsManager {
    path: PathBuf,
    data: RwLock<SnapshotDefaults>,
}

impl SettingsManager {
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let initial = match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                serde_json::from_slice::<SnapshotDefaults>(&bytes).unwrap_or_default()
            }
            _ => {
                let default = SnapshotDefaults::default();
                let json = serde_json::to_string_pretty(&default)?;
                tokio::fs::write(&path, json).await?;
                default
            }
        };

        Ok(Self {
            path,
            data: RwLock::new(initial),
        })
    }

    pub async fn get(&self) -> SnapshotDefaults {
        self.data.read().await.clone()
    }

    pub async fn update(&self, update: SnapshotDefaultsUpdate) -> Result<SnapshotDefaults> {
        let mut defaults = self.data.write().await;

        if let Some(format) = update.format {
            defaults.format = format;
        }
        if let Some(quality) = update.quality {
            if !(0.0..=1.0).contains(&quality) {
                anyhow::bail!("quality 必须在 [0, 1] 之间: {}", quality);
            }
            defaults.quality = quality;
        }
        if let Some(result) = update.result {
            defaults.result = result;
        }

        self.save(&defaults).await?;
        Ok(defaults.clone())
    }

    async fn save(&self, defaults: &SnapshotDefaults) -> Result<()> {
        let json = serde_json::to_string_pretty(defaults)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
