use std::fs;
use std::path::PathBuf;

use serde_json::json;

use crate::config::AppConfig;
use crate::logging::{LogLevel, Logger};

use super::{
    expand_home_path, BackendQueue, MemoryBackendQueue, SledBackendQueue, SledMode,
    StorageEngine, StorageError,
};

pub struct StorageFacade {
    engine: StorageEngine,
    data_path: Option<PathBuf>,
    backend: Box<dyn BackendQueue>,
}

impl StorageFacade {
    pub fn initialize(app_config: &AppConfig, logger: &Logger) -> Result<Self, StorageError> {
        let Some(engine) = StorageEngine::parse(&app_config.storage.engine) else {
            return Err(StorageError::UnsupportedEngine {
                engine: app_config.storage.engine.clone(),
            });
        };

        let (data_path, backend): (Option<PathBuf>, Box<dyn BackendQueue>) = match engine {
            StorageEngine::Memory => {
                let backend: Box<dyn BackendQueue> = Box::new(MemoryBackendQueue::new());
                (None, backend)
            }
            StorageEngine::Sled => {
                let data_path = expand_home_path(&app_config.storage.path)?;
                let mode = app_config
                    .storage
                    .sled
                    .mode
                    .as_deref()
                    .map(|raw| {
                        SledMode::parse(raw).ok_or_else(|| StorageError::InvalidSledMode {
                            mode: raw.to_owned(),
                        })
                    })
                    .transpose()?;

                logger.log(
                    LogLevel::Debug,
                    "storage::init",
                    "Opening sled spool",
                    Some(json!({
                        "configured_path": app_config.storage.path,
                        "resolved_path": data_path.display().to_string(),
                        "cache_capacity": app_config.storage.sled.cache_capacity,
                        "mode": app_config.storage.sled.mode,
                    })),
                );

                fs::create_dir_all(&data_path).map_err(|source| StorageError::CreateDataDir {
                    path: data_path.clone(),
                    source,
                })?;
                let backend =
                    SledBackendQueue::open(&data_path, app_config.storage.sled.cache_capacity, mode)?;
                (Some(data_path), Box::new(backend) as Box<dyn BackendQueue>)
            }
        };

        logger.log(
            LogLevel::Info,
            "storage::init",
            "Storage facade initialized",
            Some(json!({
                "engine": engine.as_str(),
                "resolved_path": data_path.as_ref().map(|path| path.display().to_string()),
                "depth": backend.depth()?,
            })),
        );

        Ok(Self {
            engine,
            data_path,
            backend,
        })
    }

    pub fn engine(&self) -> StorageEngine {
        self.engine
    }

    pub fn data_path(&self) -> Option<&PathBuf> {
        self.data_path.as_ref()
    }

    pub fn backend(&self) -> &dyn BackendQueue {
        self.backend.as_ref()
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.backend.flush()
    }
}
