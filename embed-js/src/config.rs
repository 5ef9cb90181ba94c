//! Engine configuration
//!
//! Every limit defaults to `None`, which leaves the engine's own default in
//! place.

use rquickjs::Runtime;

/// Settings applied to the runtime when an [`EngineHandle`](crate::EngineHandle) is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Heap limit in bytes
    pub memory_limit: Option<usize>,
    /// Native stack limit in bytes
    pub max_stack_size: Option<usize>,
    /// Allocation volume in bytes that triggers a GC cycle
    pub gc_threshold: Option<usize>,
    /// Run queued Promise jobs after each evaluation
    pub drain_jobs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_limit: None,
            max_stack_size: None,
            gc_threshold: None,
            drain_jobs: true,
        }
    }
}

impl EngineConfig {
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    pub fn with_max_stack_size(mut self, bytes: usize) -> Self {
        self.max_stack_size = Some(bytes);
        self
    }

    pub fn with_gc_threshold(mut self, bytes: usize) -> Self {
        self.gc_threshold = Some(bytes);
        self
    }

    pub fn with_drain_jobs(mut self, drain: bool) -> Self {
        self.drain_jobs = drain;
        self
    }

    pub(crate) fn apply(&self, runtime: &Runtime) {
        if let Some(limit) = self.memory_limit {
            tracing::debug!("JS memory limit: {} bytes", limit);
            runtime.set_memory_limit(limit);
        }
        if let Some(size) = self.max_stack_size {
            tracing::debug!("JS max stack size: {} bytes", size);
            runtime.set_max_stack_size(size);
        }
        if let Some(threshold) = self.gc_threshold {
            tracing::debug!("JS GC threshold: {} bytes", threshold);
            runtime.set_gc_threshold(threshold);
        }
    }
}
