use std::env;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Environment variable overriding the models directory
pub const MODELS_DIR_ENV: &str = "FASTTEXT_PARALLEL_MODELS";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Hash mismatch for {path:?}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

/// The published fastText language identification models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinModel {
    /// `lid.176.bin`, the full-size model
    Lid176,
    /// `lid.176.ftz`, the quantized model
    Lid176Compressed,
}

impl BuiltinModel {
    pub fn get_model_info(&self) -> ModelInfo {
        let file_name = match self {
            Self::Lid176 => "lid.176.bin",
            Self::Lid176Compressed => "lid.176.ftz",
        };
        ModelInfo::new(file_name)
    }
}

/// A model file expected inside the models directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub file_name: String,
    /// Lowercase hex SHA-256 the file must match, when pinned
    pub sha256: Option<String>,
}

impl ModelInfo {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self { file_name: file_name.into(), sha256: None }
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into().to_ascii_lowercase());
        self
    }
}

/// Locates model files in a local directory. Nothing is ever downloaded.
#[derive(Debug, Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> Self {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var(MODELS_DIR_ENV) {
            return PathBuf::from(path);
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("fasttext-parallel").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("fasttext-parallel").join("models");
        }

        env::temp_dir().join("fasttext-parallel").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> Self {
        Self { models_dir: models_dir.as_ref().to_path_buf() }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_model_path(&self, info: &ModelInfo) -> PathBuf {
        self.models_dir.join(&info.file_name)
    }

    pub fn is_model_available(&self, info: &ModelInfo) -> bool {
        let path = self.get_model_path(info);
        log::debug!("Checking for model at {:?} (exists: {})", path, path.exists());
        path.is_file()
    }

    /// Checks the file against its pinned hash. Unpinned models only need to exist.
    pub fn verify_model(&self, info: &ModelInfo) -> Result<bool, ModelError> {
        let path = self.get_model_path(info);
        if !path.is_file() {
            return Ok(false);
        }
        match &info.sha256 {
            Some(expected) => Ok(&hash_file(&path)? == expected),
            None => Ok(true),
        }
    }

    /// Returns the path of a present and verified model file.
    pub fn resolve(&self, info: &ModelInfo) -> Result<PathBuf, ModelError> {
        let path = self.get_model_path(info);
        if !path.is_file() {
            return Err(ModelError::NotFound(path));
        }
        if let Some(expected) = &info.sha256 {
            let actual = hash_file(&path)?;
            if &actual != expected {
                log::error!("Model hash mismatch for {:?}: expected {}, got {}", path, expected, actual);
                return Err(ModelError::HashMismatch {
                    path,
                    expected: expected.clone(),
                    actual,
                });
            }
            log::info!("Model file {:?} verified", path);
        }
        Ok(path)
    }
}

fn hash_file(path: &Path) -> Result<String, ModelError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
