//! The execution realm.
//!
//! One realm lives for the whole host session. Each run tears down the
//! previous generation's resources (mount surface, deferred tasks, module
//! globals) before executing the next compiled module in a fresh scope that
//! contains only registered imports and the capability allow-list.
//!
//! Errors never escape: every failure — the initial synchronous run, a
//! deferred task, an event handler — is reduced to a [`RawError`] at this
//! boundary. Deferred failures carry their generation so the pipeline can
//! discard results from superseded runs.

use std::collections::BTreeMap;

use tracing::{debug, warn};
use vitrine_parser::parse_source;
use vitrine_types::{RawError, RawFrame, SourceFile};

use crate::error::Trap;
use crate::evaluator::Evaluator;
use crate::surface::Element;
use crate::value::{Builtin, Value};

/// Resolved specifier the `vane` UI module is registered under.
pub const VANE_RESOLVED: &str = "vitrine:vane";

/// The `vane` module's exports: element creation, mounting, deferred
/// scheduling, and captured logging.
pub fn vane_module() -> Vec<(String, Value)> {
    vec![
        ("h".to_string(), Value::Builtin(Builtin::H)),
        ("mount".to_string(), Value::Builtin(Builtin::Mount)),
        ("defer".to_string(), Value::Builtin(Builtin::Defer)),
        ("log".to_string(), Value::Builtin(Builtin::Log)),
        ("throw".to_string(), Value::Builtin(Builtin::Throw)),
    ]
}

/// Execution limits for one realm.
#[derive(Debug, Clone)]
pub struct RealmConfig {
    /// Evaluation steps per entry into user code.
    pub gas_limit: u64,
    /// Maximum call depth.
    pub max_call_depth: usize,
    /// Maximum queued deferred tasks; excess schedules are dropped.
    pub max_tasks: usize,
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self {
            gas_limit: 1_000_000,
            max_call_depth: 128,
            max_tasks: 64,
        }
    }
}

/// Modules executable code may import, keyed by resolved specifier.
///
/// Populated at startup, never mutated afterwards.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, BTreeMap<String, Value>>,
}

impl ModuleRegistry {
    pub fn register(&mut self, resolved: impl Into<String>, exports: Vec<(String, Value)>) {
        self.modules
            .insert(resolved.into(), exports.into_iter().collect());
    }

    fn lookup(&self, resolved: &str) -> Option<&BTreeMap<String, Value>> {
        self.modules.get(resolved)
    }

    /// Export names of a registered module.
    pub fn exports_of(&self, resolved: &str) -> Option<Vec<String>> {
        self.modules
            .get(resolved)
            .map(|exports| exports.keys().cloned().collect())
    }
}

/// One scheduled deferred task.
struct DeferredTask {
    due_ms: f64,
    generation: u64,
    callback: Value,
}

/// A failure from a deferred task or event dispatch, tagged with the
/// generation that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFailure {
    pub generation: u64,
    pub error: RawError,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub generation: u64,
    /// Whether the module mounted output.
    pub mounted: bool,
}

/// The isolated execution environment.
pub struct Realm {
    config: RealmConfig,
    registry: ModuleRegistry,
    /// Capability allow-list injected as globals before imports.
    exposed: Vec<(String, Value)>,
    /// Evaluator of the live generation (holds module globals).
    evaluator: Option<Evaluator>,
    surface: Option<Element>,
    tasks: Vec<DeferredTask>,
    /// Captured log output of the live generation.
    logs: Vec<String>,
    generation: u64,
}

impl Realm {
    pub fn new(config: RealmConfig) -> Self {
        Self {
            config,
            registry: ModuleRegistry::default(),
            exposed: Vec::new(),
            evaluator: None,
            surface: None,
            tasks: Vec::new(),
            logs: Vec::new(),
            generation: 0,
        }
    }

    /// Register the `vane` module (h/mount/defer/log/throw).
    pub fn install_vane(&mut self) {
        self.registry.register(VANE_RESOLVED, vane_module());
    }

    /// Register an additional module by resolved specifier.
    pub fn register_module(&mut self, resolved: impl Into<String>, exports: Vec<(String, Value)>) {
        self.registry.register(resolved, exports);
    }

    /// Expose a named capability to executed code.
    ///
    /// This is the entire allow-list: nothing else from the host is
    /// reachable inside the realm.
    pub fn expose(&mut self, name: impl Into<String>, value: Value) {
        self.exposed.push((name.into(), value));
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The mounted output of the live generation, if any.
    pub fn surface(&self) -> Option<&Element> {
        self.surface.as_ref()
    }

    /// Captured `log` output of the live generation.
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// Whether any live-generation task is due at `now`.
    pub fn has_due_tasks(&self, now_ms: f64) -> bool {
        self.tasks
            .iter()
            .any(|t| t.generation == self.generation && t.due_ms <= now_ms)
    }

    /// Earliest pending task deadline, for host scheduling.
    pub fn next_task_due(&self) -> Option<f64> {
        self.tasks
            .iter()
            .map(|t| t.due_ms)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Tear down the live generation without starting a new one.
    pub fn reset(&mut self) {
        self.surface = None;
        self.tasks.clear();
        self.logs.clear();
        self.evaluator = None;
    }

    /// Execute a compiled module as generation `generation`.
    ///
    /// The previous generation's surface, tasks, and globals are released
    /// first; a failed run leaves the realm empty rather than half-built.
    pub fn run(
        &mut self,
        module_text: &str,
        generation: u64,
        now_ms: f64,
    ) -> Result<RunSummary, RawError> {
        self.reset();
        self.generation = generation;

        let source_file = SourceFile::new("realm", module_text);
        let parsed = parse_source(&source_file);
        let module = match (parsed.module, parsed.errors.first()) {
            (Some(module), _) => module,
            (None, first) => {
                // The transformer emits parseable text; reaching this means
                // an internal bug, not a user error.
                let message = first
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "unparseable compiled module".to_string());
                return Err(RawError::new("SyntaxError", message));
            }
        };

        let mut evaluator = Evaluator::new(self.config.gas_limit, self.config.max_call_depth);

        // Minimal explicit scope: allow-listed capabilities, then imports
        // (imports shadow same-named capabilities).
        for (name, value) in &self.exposed {
            evaluator.env.define(name, value.clone());
        }
        for import in &module.imports {
            let exports = match self.registry.lookup(&import.specifier) {
                Some(exports) => exports,
                None => {
                    return Err(RawError::new(
                        "ReferenceError",
                        format!("no registered module \"{}\"", import.specifier),
                    ));
                }
            };
            for name in &import.names {
                match exports.get(&name.name) {
                    Some(value) => evaluator.env.define(&name.name, value.clone()),
                    None => {
                        return Err(RawError::new(
                            "ReferenceError",
                            format!(
                                "\"{}\" has no export named '{}'",
                                import.specifier, name.name
                            ),
                        ));
                    }
                }
            }
        }

        let outcome = evaluator.run_body(&module.body);
        self.absorb_effects(&mut evaluator, now_ms);

        match outcome {
            Ok(()) => {
                let summary = RunSummary {
                    generation,
                    mounted: self.surface.is_some(),
                };
                debug!(
                    target: "vitrine::realm",
                    generation,
                    mounted = summary.mounted,
                    tasks = self.tasks.len(),
                    "run ok"
                );
                self.evaluator = Some(evaluator);
                Ok(summary)
            }
            Err(trap) => {
                // A failed module does not keep running: drop its tasks and
                // globals, keep nothing mounted.
                self.tasks.clear();
                self.surface = None;
                let error = raw_error(trap);
                debug!(
                    target: "vitrine::realm",
                    generation,
                    name = %error.name,
                    "run failed"
                );
                Err(error)
            }
        }
    }

    /// Run every due deferred task. Tasks from superseded generations are
    /// discarded silently; failures from live tasks come back tagged.
    pub fn run_due_tasks(&mut self, now_ms: f64) -> Vec<TaskFailure> {
        let generation = self.generation;
        let all = std::mem::take(&mut self.tasks);
        let (ready, pending): (Vec<_>, Vec<_>) = all
            .into_iter()
            .filter(|t| t.generation == generation)
            .partition(|t| t.due_ms <= now_ms);
        self.tasks = pending;

        let mut failures = Vec::new();
        for task in ready {
            let Some(mut evaluator) = self.evaluator.take() else {
                break;
            };
            evaluator.refill_gas();
            let result = evaluator.call_value(task.callback, Vec::new());
            self.absorb_effects(&mut evaluator, now_ms);
            self.evaluator = Some(evaluator);
            if let Err(trap) = result {
                failures.push(TaskFailure {
                    generation: task.generation,
                    error: raw_error(trap),
                });
            }
        }
        failures
    }

    /// Invoke an event-handler prop on a mounted element (`path` walks
    /// child indices from the root). Returns `Ok(false)` when there is no
    /// such handler.
    pub fn dispatch(
        &mut self,
        path: &[usize],
        prop: &str,
        now_ms: f64,
    ) -> Result<bool, TaskFailure> {
        let handler = self
            .surface
            .as_ref()
            .and_then(|root| root.descendant(path))
            .and_then(|el| el.props.get(prop))
            .cloned();
        let Some(handler) = handler else {
            return Ok(false);
        };
        if !matches!(handler, Value::Func(_) | Value::Native(_) | Value::Builtin(_)) {
            return Ok(false);
        }
        let Some(mut evaluator) = self.evaluator.take() else {
            return Ok(false);
        };
        evaluator.refill_gas();
        let result = evaluator.call_value(handler, Vec::new());
        self.absorb_effects(&mut evaluator, now_ms);
        self.evaluator = Some(evaluator);
        match result {
            Ok(_) => Ok(true),
            Err(trap) => Err(TaskFailure {
                generation: self.generation,
                error: raw_error(trap),
            }),
        }
    }

    /// Move collected evaluator effects into realm state: mounted output
    /// replaces the surface, schedules become tasks of the live generation.
    fn absorb_effects(&mut self, evaluator: &mut Evaluator, now_ms: f64) {
        let effects = std::mem::take(&mut evaluator.effects);
        if let Some(element) = effects.mounted {
            self.surface = Some(element);
        }
        for (delay_ms, callback) in effects.scheduled {
            if self.tasks.len() >= self.config.max_tasks {
                warn!(
                    target: "vitrine::realm",
                    max = self.config.max_tasks,
                    "deferred task dropped: queue full"
                );
                continue;
            }
            self.tasks.push(DeferredTask {
                due_ms: now_ms + delay_ms,
                generation: self.generation,
                callback,
            });
        }
        self.logs.extend(effects.logs);
    }
}

/// Reduce a trap to the boundary error form: accumulated frames plus the
/// final `<module>` frame at the trap's outermost position.
fn raw_error(trap: Trap) -> RawError {
    let mut frames = trap.frames;
    frames.push(RawFrame {
        func: "<module>".to_string(),
        line: trap.span.start_line,
        col: trap.span.start_col,
        internal: false,
    });
    RawError::new(trap.error.error_name(), trap.error.to_string()).with_frames(frames)
}
