#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use env_logger::{Builder, Env};
use fasttext_parallel::{
    Classifier, ClassifierBuilder, DiagnosticSink, LabelCodes, LoadedModel, ModelLoader, NullSink,
    TextScorer,
};
use tempfile::NamedTempFile;

pub const EN: &str = "__label__en";
pub const ZH: &str = "__label__zh";

// Initialize test logger
pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

/// Writes a model file listing one label per line.
pub fn model_file(labels: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "script-model").unwrap();
    for label in labels {
        writeln!(file, "{}", label).unwrap();
    }
    file
}

/// Reads the label list written by [`model_file`] and scores texts by script:
/// Han characters vote for `__label__zh`, ASCII letters for `__label__en`.
/// Every other label gets probability zero.
#[derive(Default)]
pub struct ScriptLoader {
    /// Makes workers sleep a pseudo-random time before answering
    pub jitter: bool,
}

impl ModelLoader for ScriptLoader {
    fn open(&self, path: &Path, diagnostics: &dyn DiagnosticSink) -> anyhow::Result<LoadedModel> {
        let content = std::fs::read_to_string(path).context("cannot read model")?;
        let mut lines = content.lines();
        if lines.next() != Some("script-model") {
            bail!("bad magic");
        }
        let labels: Vec<String> = lines.map(str::to_string).collect();
        diagnostics.emit(log::Level::Debug, &format!("{} labels", labels.len()));
        let scorer = ScriptScorer {
            en: labels.iter().position(|l| l == EN),
            zh: labels.iter().position(|l| l == ZH),
            num_labels: labels.len(),
            jitter: self.jitter.then(|| AtomicU64::new(0x9E37_79B9_7F4A_7C15)),
        };
        Ok(LoadedModel { labels, scorer: Box::new(scorer) })
    }
}

struct ScriptScorer {
    en: Option<usize>,
    zh: Option<usize>,
    num_labels: usize,
    jitter: Option<AtomicU64>,
}

impl TextScorer for ScriptScorer {
    fn score(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        if let Some(state) = &self.jitter {
            // xorshift step shared by all workers; only affects timing
            let mut x = state.load(Ordering::Relaxed);
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            state.store(x, Ordering::Relaxed);
            thread::sleep(Duration::from_micros(x % 400));
        }
        if text.is_empty() {
            bail!("empty text");
        }
        let han = text.chars().filter(|c| ('\u{4e00}'..='\u{9fff}').contains(c)).count() as f32;
        let latin = text.chars().filter(|c| c.is_ascii_alphabetic()).count() as f32;

        let mut probs = vec![0.0; self.num_labels];
        let total = han + latin + 0.2;
        if let Some(i) = self.en {
            probs[i] = (latin + 0.1) / total;
        }
        if let Some(i) = self.zh {
            probs[i] = (han + 0.1) / total;
        }
        Ok(probs)
    }
}

pub fn builder(jitter: bool) -> ClassifierBuilder {
    init();
    Classifier::builder()
        .with_loader(Arc::new(ScriptLoader { jitter }))
        .with_diagnostics(Arc::new(NullSink))
}

pub fn en_zh_codes() -> LabelCodes {
    LabelCodes::new([(EN, 0), (ZH, 1)]).unwrap()
}
