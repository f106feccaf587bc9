use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info};

use super::classifier::{Classifier, ClassifierStats};
use super::error::ClassifierError;
use super::labels::{LabelCodes, LabelMode, LabelRemapper, LabelSet};
use super::model::ModelLoader;
use crate::diagnostics::{DiagnosticSink, LogSink};
use crate::model_manager::{BuiltinModel, ModelManager};
use crate::runtime::{create_thread_pool, RuntimeConfig};

/// Collects load-time configuration and opens a model.
///
/// Everything that changes the meaning of results, in particular whether
/// labels come out as strings or as codes, is fixed here and cannot change
/// once the [`Classifier`] exists.
pub struct ClassifierBuilder {
    runtime_config: RuntimeConfig,
    label_codes: Option<LabelCodes>,
    diagnostics: Arc<dyn DiagnosticSink>,
    loader: Option<Arc<dyn ModelLoader>>,
    model_manager: Option<ModelManager>,
}

impl std::fmt::Debug for ClassifierBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierBuilder")
            .field("runtime_config", &self.runtime_config)
            .field("label_codes", &self.label_codes.as_ref().map(LabelCodes::len))
            .field("has_loader", &self.loader.is_some())
            .field("model_manager", &self.model_manager)
            .finish()
    }
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBuilder {
    /// Creates a builder with the default runtime configuration, diagnostics
    /// routed to `log`, and the fastText loader when that feature is enabled.
    pub fn new() -> Self {
        Self {
            runtime_config: RuntimeConfig::default(),
            label_codes: None,
            diagnostics: Arc::new(LogSink),
            loader: default_loader(),
            model_manager: None,
        }
    }

    /// Sets the worker pool configuration
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Shorthand for a runtime config with `num_threads` workers
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.runtime_config.num_threads = num_threads;
        self
    }

    /// Emit label codes instead of native labels. Every label of the model
    /// must have a code, which is checked when the model is loaded.
    pub fn with_label_codes(mut self, codes: LabelCodes) -> Self {
        self.label_codes = Some(codes);
        self
    }

    /// Where loader diagnostics go; pass [`NullSink`](crate::NullSink) to silence them
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Replaces the collaborator that reads model files
    pub fn with_loader(mut self, loader: Arc<dyn ModelLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Where [`load_builtin`](Self::load_builtin) looks for model files.
    /// Defaults to [`ModelManager::new_default`].
    pub fn with_model_manager(mut self, manager: ModelManager) -> Self {
        self.model_manager = Some(manager);
        self
    }

    /// Loads a published model from the local models directory
    pub fn load_builtin(mut self, model: BuiltinModel) -> Result<Classifier, ClassifierError> {
        let manager = self.model_manager.take().unwrap_or_else(ModelManager::new_default);
        let path = manager.resolve(&model.get_model_info())?;
        self.load(path)
    }

    /// Opens the model at `path` and returns a ready classifier.
    ///
    /// # Errors
    /// * `LoadError` if the file is missing, the loader rejects it, the model
    ///   reports no labels or duplicate labels, or the worker pool cannot start
    /// * `UnmappedLabel` if label codes were configured and one of the model's
    ///   labels has no code
    pub fn load(self, path: impl AsRef<Path>) -> Result<Classifier, ClassifierError> {
        let path = path.as_ref();
        debug!("Loading model from {:?}", path);

        let loader = self.loader.ok_or_else(|| {
            ClassifierError::load(
                path,
                &anyhow::anyhow!("no model loader configured; enable the `fasttext` feature or call with_loader()"),
            )
        })?;
        if !path.is_file() {
            return Err(ClassifierError::load(path, &anyhow::anyhow!("model file not found")));
        }

        let loaded = loader.open(path, self.diagnostics.as_ref()).map_err(|e| {
            error!("Failed to load model {:?}: {:#}", path, e);
            ClassifierError::load(path, &e)
        })?;

        if loaded.labels.is_empty() {
            return Err(ClassifierError::load(path, &anyhow::anyhow!("model has no labels")));
        }
        let labels = LabelSet::new(loaded.labels).map_err(|e| ClassifierError::LoadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let label_mode = match self.label_codes {
            Some(codes) => {
                codes.validate_coverage(&labels)?;
                debug!("All {} labels have codes", labels.len());
                LabelMode::Remapped(LabelRemapper::new(codes))
            }
            None => LabelMode::Native,
        };

        let pool = create_thread_pool(&self.runtime_config).map_err(|e| ClassifierError::LoadError {
            path: path.to_path_buf(),
            reason: format!("failed to start worker pool: {}", e),
        })?;

        info!(
            "Model loaded from {:?}: {} labels, {} workers",
            path,
            labels.len(),
            pool.current_num_threads()
        );

        Ok(Classifier {
            model_path: path.to_path_buf(),
            labels: Arc::new(labels),
            scorer: Arc::from(loaded.scorer),
            label_mode,
            pool: Arc::new(pool),
            runtime_config: self.runtime_config,
            stats: ClassifierStats::default(),
        })
    }
}

#[cfg(feature = "fasttext")]
fn default_loader() -> Option<Arc<dyn ModelLoader>> {
    Some(Arc::new(crate::backends::fasttext::FastTextLoader))
}

#[cfg(not(feature = "fasttext"))]
fn default_loader() -> Option<Arc<dyn ModelLoader>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::model::{LoadedModel, TextScorer};
    use crate::diagnostics::NullSink;
    use crate::model_manager::ModelError;

    struct FixedLoader(Vec<&'static str>);

    struct Uniform(usize);

    impl TextScorer for Uniform {
        fn score(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(vec![1.0 / self.0 as f32; self.0])
        }
    }

    impl ModelLoader for FixedLoader {
        fn open(&self, _path: &Path, diagnostics: &dyn DiagnosticSink) -> anyhow::Result<LoadedModel> {
            diagnostics.emit(log::Level::Info, "fixed loader");
            Ok(LoadedModel {
                labels: self.0.iter().map(|l| l.to_string()).collect(),
                scorer: Box::new(Uniform(self.0.len())),
            })
        }
    }

    fn model_file() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    fn builder(labels: Vec<&'static str>) -> ClassifierBuilder {
        ClassifierBuilder::new()
            .with_loader(Arc::new(FixedLoader(labels)))
            .with_diagnostics(Arc::new(NullSink))
            .with_threads(2)
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let result = builder(vec!["en"]).load("/nonexistent/lid.176.bin");
        match result {
            Err(ClassifierError::LoadError { path, .. }) => {
                assert_eq!(path, Path::new("/nonexistent/lid.176.bin"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_and_empty_labels_rejected() {
        let file = model_file();
        assert!(matches!(
            builder(vec!["en", "en"]).load(file.path()),
            Err(ClassifierError::LoadError { .. })
        ));
        assert!(matches!(builder(vec![]).load(file.path()), Err(ClassifierError::LoadError { .. })));
    }

    #[test]
    fn test_codes_validated_eagerly() {
        let file = model_file();
        let codes = LabelCodes::new([("en", 0)]).unwrap();
        let result = builder(vec!["en", "zh"]).with_label_codes(codes).load(file.path());
        match result {
            Err(ClassifierError::UnmappedLabel { label }) => assert_eq!(label, "zh"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_ready_classifier() {
        let file = model_file();
        let classifier = builder(vec!["en", "zh"]).load(file.path()).unwrap();
        let info = classifier.info();
        assert_eq!(info.num_labels, 2);
        assert_eq!(info.num_threads, 2);
        assert!(!info.remapped);
    }

    #[test]
    fn test_load_builtin_from_models_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lid.176.bin"), b"model").unwrap();

        let classifier = builder(vec!["__label__en", "__label__zh"])
            .with_model_manager(ModelManager::new(dir.path()))
            .load_builtin(BuiltinModel::Lid176)
            .unwrap();
        assert_eq!(classifier.model_path(), dir.path().join("lid.176.bin"));
        assert_eq!(classifier.info().num_labels, 2);

        let missing = builder(vec!["__label__en"])
            .with_model_manager(ModelManager::new(dir.path()))
            .load_builtin(BuiltinModel::Lid176Compressed);
        match missing {
            Err(ClassifierError::ModelManager(ModelError::NotFound(path))) => {
                assert_eq!(path, dir.path().join("lid.176.ftz"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
