use std::num::NonZeroUsize;
use std::thread;

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Default bound of the channel carrying finished results back to the caller
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Worker threads in the scoring pool; 0 sizes the pool to the available parallelism
    pub num_threads: usize,
    /// Results that may be in flight between workers and the collector
    pub channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            num_threads: 0, // Let the hardware decide
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RuntimeConfig {
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Number of workers the pool will actually run
    pub fn effective_threads(&self) -> usize {
        if self.num_threads > 0 {
            return self.num_threads;
        }
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }
}

/// Builds the bounded worker pool shared by every batch of one loaded model.
pub fn create_thread_pool(config: &RuntimeConfig) -> Result<ThreadPool, ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(config.effective_threads())
        .thread_name(|i| format!("fasttext-worker-{}", i))
        .build()
}
