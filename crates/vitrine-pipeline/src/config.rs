//! Pipeline configuration — plain data, owned by the pipeline and injected
//! into the realm and translator at use sites.

use vitrine_realm::RealmConfig;
use vitrine_trace::FramePolicy;

/// Configuration for one playground pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Debounce quiet window in milliseconds.
    pub debounce_ms: f64,
    /// Realm evaluation budget per entry into user code.
    pub gas_limit: u64,
    /// Realm call depth limit.
    pub max_call_depth: usize,
    /// Maximum queued deferred tasks.
    pub max_tasks: usize,
    /// Which stack frames survive translation.
    pub frame_policy: FramePolicy,
    /// Local-store key holding the last-edited source.
    pub storage_key: String,
    /// Example loaded when neither a share link nor stored text exists.
    pub default_example: String,
}

impl PipelineConfig {
    /// The realm limits carved out of this configuration.
    pub fn realm_config(&self) -> RealmConfig {
        RealmConfig {
            gas_limit: self.gas_limit,
            max_call_depth: self.max_call_depth,
            max_tasks: self.max_tasks,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250.0,
            gas_limit: 1_000_000,
            max_call_depth: 128,
            max_tasks: 64,
            frame_policy: FramePolicy::default(),
            storage_key: "vitrine.playground.source".to_string(),
            default_example: "counter".to_string(),
        }
    }
}
