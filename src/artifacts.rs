//! Saving and loading of configs, model weights, and optimizer state under
//! an artifacts directory.

use crate::optim::OptimConfigExt;
use burn::module::AutodiffModule;
use burn::optim::Optimizer;
use burn::prelude::*;
use burn::record::{
    FileRecorder, FullPrecisionSettings, NamedMpkFileRecorder, Recorder, RecorderError,
};
use burn::tensor::backend::AutodiffBackend;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File recorder used for every tensor artifact. Full precision keeps
/// save/load round-trips exact.
pub type StoreRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

pub const MODEL_CONFIG_NAME: &'static str = "model_config";
pub const TRAINING_CONFIG_NAME: &'static str = "training_config";
pub const MODEL_NAME: &'static str = "model";
pub const OPTIM_NAME: &'static str = "optim";

pub trait ModelConfigExt<B: Backend>: Config {
    type Model: Module<B>;
    fn init(&self, device: &B::Device) -> Self::Model;
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to record {path:?}: {source}")]
    Record {
        path: PathBuf,
        #[source]
        source: RecorderError,
    },
    #[error("invalid config {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },
}

/// Directory holding persisted configs, model weights, and optimizer state.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Opens the directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ArtifactError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_config<C: Config>(&self, name: &str, config: &C) -> Result<PathBuf, ArtifactError> {
        let path = self.dir.join(name).with_added_extension("json");
        config.save(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!("saved config to {:?}", path);
        Ok(path)
    }

    pub fn load_config<C: Config>(&self, name: &str) -> Result<Option<C>, ArtifactError> {
        let path = self.dir.join(name).with_added_extension("json");
        if !exists(&path)? {
            return Ok(None);
        }
        let config = C::load(&path).map_err(|err| ArtifactError::Config {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        tracing::info!("loaded config from {:?}", path);
        Ok(Some(config))
    }

    pub fn load_or_save_config<C: Config>(
        &self,
        name: &str,
        default: impl FnOnce() -> C,
    ) -> Result<C, ArtifactError> {
        if let Some(config) = self.load_config(name)? {
            return Ok(config);
        }
        let config = default();
        self.save_config(name, &config)?;
        Ok(config)
    }

    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M) -> Result<PathBuf, ArtifactError> {
        let path = self.dir.join(MODEL_NAME);
        let path_ext = self.record_path::<B>(MODEL_NAME);
        model
            .clone()
            .save_file(path, &StoreRecorder::new()) // ext added automatically
            .map_err(|source| ArtifactError::Record {
                path: path_ext.clone(),
                source,
            })?;
        tracing::info!("saved model to {:?}", path_ext);
        Ok(path_ext)
    }

    /// Returns `Ok(None)` when no model file exists yet.
    pub fn load_model<B: Backend, MC: ModelConfigExt<B>>(
        &self,
        model_config: &MC,
        device: &B::Device,
    ) -> Result<Option<MC::Model>, ArtifactError> {
        let path = self.dir.join(MODEL_NAME);
        let path_ext = self.record_path::<B>(MODEL_NAME);
        if !exists(&path_ext)? {
            return Ok(None);
        }
        let model = model_config
            .init(device)
            .load_file(path, &StoreRecorder::new(), device) // ext added automatically
            .map_err(|source| ArtifactError::Record {
                path: path_ext.clone(),
                source,
            })?;
        tracing::info!("loaded model from {:?}", path_ext);
        Ok(Some(model))
    }

    pub fn load_or_save_model<B: Backend, MC: ModelConfigExt<B>>(
        &self,
        model_config: &MC,
        device: &B::Device,
    ) -> Result<MC::Model, ArtifactError> {
        if let Some(model) = self.load_model(model_config, device)? {
            return Ok(model);
        }
        tracing::info!("initializing new model");
        let model = model_config.init(device);
        self.save_model(&model)?;
        Ok(model)
    }

    pub fn save_optim<AutoB, AutoM>(
        &self,
        optim: &impl Optimizer<AutoM, AutoB>,
    ) -> Result<PathBuf, ArtifactError>
    where
        AutoB: AutodiffBackend,
        AutoM: AutodiffModule<AutoB>,
    {
        let path = self.dir.join(OPTIM_NAME);
        let path_ext = self.record_path::<AutoB>(OPTIM_NAME);
        let record = optim.to_record();
        StoreRecorder::new()
            .record(record, path) // ext added automatically
            .map_err(|source| ArtifactError::Record {
                path: path_ext.clone(),
                source,
            })?;
        tracing::info!("saved optimizer state to {:?}", path_ext);
        Ok(path_ext)
    }

    /// Returns `Ok(None)` when no optimizer file exists yet.
    pub fn load_optim<AutoB, AutoM, OC>(
        &self,
        optim_config: &OC,
        device: &AutoB::Device,
    ) -> Result<Option<OC::Adaptor>, ArtifactError>
    where
        AutoB: AutodiffBackend,
        AutoM: AutodiffModule<AutoB>,
        OC: OptimConfigExt<AutoB, AutoM>,
    {
        let path = self.dir.join(OPTIM_NAME);
        let path_ext = self.record_path::<AutoB>(OPTIM_NAME);
        if !exists(&path_ext)? {
            return Ok(None);
        }
        let record = StoreRecorder::new()
            .load(path, device) // ext added automatically
            .map_err(|source| ArtifactError::Record {
                path: path_ext.clone(),
                source,
            })?;
        let optim = optim_config.init().load_record(record);
        tracing::info!("loaded optimizer state from {:?}", path_ext);
        Ok(Some(optim))
    }

    pub fn load_or_save_optim<AutoB, AutoM, OC>(
        &self,
        optim_config: &OC,
        device: &AutoB::Device,
    ) -> Result<OC::Adaptor, ArtifactError>
    where
        AutoB: AutodiffBackend,
        AutoM: AutodiffModule<AutoB>,
        OC: OptimConfigExt<AutoB, AutoM>,
    {
        if let Some(optim) = self.load_optim(optim_config, device)? {
            return Ok(optim);
        }
        tracing::info!("initializing new optimizer");
        let optim = optim_config.init();
        self.save_optim(&optim)?;
        Ok(optim)
    }

    fn record_path<B: Backend>(&self, name: &str) -> PathBuf {
        let file_ext = <StoreRecorder as FileRecorder<B>>::file_extension();
        self.dir.join(name).with_added_extension(file_ext)
    }
}

fn exists(path: &Path) -> Result<bool, ArtifactError> {
    std::fs::exists(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}
