//! The debounced edit pipeline.
//!
//! State machine: Idle → Pending → Compiling → Running → Settled(ok|err).
//! The host drives it with a monotonic clock: `edit` on every keystroke,
//! `tick` on every animation frame. Each `tick` advances at most one phase,
//! so the at-most-one-in-flight discipline is observable: an edit arriving
//! during Compiling/Running is queued (latest only) and becomes the next
//! Pending cycle once the current one settles.
//!
//! Every cycle gets a fresh generation number. Deferred failures coming out
//! of the realm are compared against the current generation and dropped
//! when stale, so a superseded run can never annotate the editor.

use tracing::{debug, warn};
use vitrine_realm::{Element, Realm, TaskFailure};
use vitrine_trace::translate;
use vitrine_transform::{fingerprint, transform, CompiledModule, ImportMap, LineMap};
use vitrine_types::Diagnostic;

use crate::catalog::{Catalog, ExampleFetcher};
use crate::config::PipelineConfig;
use crate::ports::{EditorPort, OutputPort};
use crate::share::ShareLink;
use crate::store::KvStore;

/// Externally visible pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Pending,
    Compiling,
    Running,
    SettledOk,
    SettledErr,
}

/// Internal phase, carrying each phase's working data.
enum Phase {
    Idle,
    Pending { text: String, deadline: f64 },
    Compiling { text: String },
    Running { text: String, module: CompiledModule },
    Settled { ok: bool },
}

/// The orchestrator: debounce, transform, run, translate, persist.
pub struct Pipeline {
    config: PipelineConfig,
    import_map: ImportMap,
    realm: Realm,
    editor: Box<dyn EditorPort>,
    output: Box<dyn OutputPort>,
    store: Box<dyn KvStore>,
    fetcher: Box<dyn ExampleFetcher>,
    catalog: Catalog,

    phase: Phase,
    /// Monotonically increasing cycle tag.
    generation: u64,
    /// Latest edit that arrived while a cycle was in flight.
    queued: Option<String>,
    /// Offset table of the live compiled module.
    live_map: Option<LineMap>,
    /// Fingerprint of the source the live module was compiled from.
    live_fingerprint: Option<String>,
    /// Current editor text, tracked for share links.
    current_text: String,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: PipelineConfig,
        import_map: ImportMap,
        realm: Realm,
        catalog: Catalog,
        editor: Box<dyn EditorPort>,
        output: Box<dyn OutputPort>,
        store: Box<dyn KvStore>,
        fetcher: Box<dyn ExampleFetcher>,
    ) -> Self {
        Self {
            config,
            import_map,
            realm,
            editor,
            output,
            store,
            fetcher,
            catalog,
            phase: Phase::Idle,
            generation: 0,
            queued: None,
            live_map: None,
            live_fingerprint: None,
            current_text: String::new(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> PipelineState {
        match &self.phase {
            Phase::Idle => PipelineState::Idle,
            Phase::Pending { .. } => PipelineState::Pending,
            Phase::Compiling { .. } => PipelineState::Compiling,
            Phase::Running { .. } => PipelineState::Running,
            Phase::Settled { ok: true } => PipelineState::SettledOk,
            Phase::Settled { ok: false } => PipelineState::SettledErr,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn surface(&self) -> Option<&Element> {
        self.realm.surface()
    }

    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Preload an example body into the catalog cache (hosts that bundle
    /// example sources instead of fetching).
    pub fn preload_example(&mut self, slug: impl Into<String>, body: impl Into<String>) {
        self.catalog.preload(slug, body);
    }

    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    /// A `?code=...` query for the current text.
    pub fn share_query(&self) -> String {
        crate::share::to_query(&ShareLink::Code(self.current_text.clone()))
    }

    /// Earliest deadline the host should wake the pipeline for: the
    /// debounce deadline or the next realm task, whichever comes first.
    pub fn next_deadline(&self) -> Option<f64> {
        let debounce = match &self.phase {
            Phase::Pending { deadline, .. } => Some(*deadline),
            _ => None,
        };
        match (debounce, self.realm.next_task_due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ── Boot ──────────────────────────────────────────────────────────────

    /// Load the initial source document and start the first cycle.
    ///
    /// Precedence: link-provided code > link-provided example slug >
    /// locally stored last-edited text > default example.
    pub fn boot(&mut self, link: Option<ShareLink>, now: f64) {
        let text = self.initial_text(link);
        self.editor.set_text(&text);
        self.current_text = text.clone();
        // First cycle compiles immediately — nothing useful to debounce.
        self.phase = Phase::Pending {
            text,
            deadline: now,
        };
    }

    fn initial_text(&mut self, link: Option<ShareLink>) -> String {
        match link {
            Some(ShareLink::Code(code)) => return code,
            Some(ShareLink::Example(slug)) => {
                match self.catalog.body(&slug, self.fetcher.as_ref()) {
                    Ok(body) => return body,
                    Err(err) => {
                        warn!(target: "vitrine::pipeline", %err, slug, "linked example unavailable");
                    }
                }
            }
            None => {}
        }
        if let Some(stored) = self.store.get(&self.config.storage_key) {
            return stored;
        }
        let slug = self.config.default_example.clone();
        match self.catalog.body(&slug, self.fetcher.as_ref()) {
            Ok(body) => body,
            Err(err) => {
                warn!(target: "vitrine::pipeline", %err, slug, "default example unavailable");
                String::new()
            }
        }
    }

    /// Load a named example into the editor and start a cycle for it.
    pub fn select_example(&mut self, slug: &str, now: f64) -> bool {
        match self.catalog.body(slug, self.fetcher.as_ref()) {
            Ok(body) => {
                self.editor.set_text(&body);
                self.edit(body, now);
                true
            }
            Err(err) => {
                warn!(target: "vitrine::pipeline", %err, slug, "example unavailable");
                false
            }
        }
    }

    // ── Edits ─────────────────────────────────────────────────────────────

    /// A keystroke happened. Restarts the quiet window; only the latest
    /// edit within it survives. During an in-flight cycle the edit is
    /// queued instead (latest only) — the cycle is never cancelled.
    pub fn edit(&mut self, text: String, now: f64) {
        self.current_text = text.clone();
        match self.phase {
            Phase::Idle | Phase::Pending { .. } | Phase::Settled { .. } => {
                self.phase = Phase::Pending {
                    text,
                    deadline: now + self.config.debounce_ms,
                };
            }
            Phase::Compiling { .. } | Phase::Running { .. } => {
                self.queued = Some(text);
            }
        }
    }

    // ── Clock ─────────────────────────────────────────────────────────────

    /// Advance the pipeline by at most one phase, and pump the realm's
    /// deferred tasks. Call once per animation frame.
    pub fn tick(&mut self, now: f64) -> PipelineState {
        self.pump_tasks(now);

        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {
                self.phase = Phase::Idle;
            }
            Phase::Pending { text, deadline } => {
                if now >= deadline {
                    self.phase = Phase::Compiling { text };
                } else {
                    self.phase = Phase::Pending { text, deadline };
                }
            }
            Phase::Compiling { text } => self.step_compile(text),
            Phase::Running { text, module } => self.step_run(text, module, now),
            Phase::Settled { ok } => {
                match self.queued.take() {
                    Some(text) => {
                        self.phase = Phase::Pending {
                            text,
                            deadline: now + self.config.debounce_ms,
                        };
                    }
                    None => self.phase = Phase::Settled { ok },
                }
            }
        }
        self.state()
    }

    /// Compiling → Running | Settled(err).
    fn step_compile(&mut self, text: String) {
        self.generation += 1;
        let generation = self.generation;

        // Identical source: the live module already embodies this text —
        // skip the cycle entirely.
        if self.live_fingerprint.as_deref() == Some(fingerprint(&text).as_str()) {
            debug!(target: "vitrine::pipeline", generation, "source unchanged, cycle skipped");
            self.phase = Phase::Settled { ok: true };
            return;
        }

        match transform(&text, &self.import_map) {
            Ok(module) => {
                debug!(
                    target: "vitrine::pipeline",
                    generation,
                    lines = module.line_map.source_lines,
                    "compiled"
                );
                self.phase = Phase::Running { text, module };
            }
            Err(errors) => {
                let diagnostic = Diagnostic::from(&errors);
                debug!(
                    target: "vitrine::pipeline",
                    generation,
                    errors = errors.total_errors,
                    "compile failed, execution skipped"
                );
                self.settle_err(text, diagnostic);
            }
        }
    }

    /// Running → Settled(ok|err).
    fn step_run(&mut self, text: String, module: CompiledModule, now: f64) {
        self.live_map = Some(module.line_map.clone());
        self.live_fingerprint = Some(module.fingerprint.clone());
        match self.realm.run(&module.text, self.generation, now) {
            Ok(summary) => {
                debug!(
                    target: "vitrine::pipeline",
                    generation = summary.generation,
                    mounted = summary.mounted,
                    "run ok"
                );
                self.settle_ok(text);
            }
            Err(raw) => {
                let map = self.live_map.clone().unwrap_or_default();
                let diagnostic = translate(&raw, &map, self.config.frame_policy);
                self.settle_err(text, diagnostic);
            }
        }
    }

    /// Run due realm tasks; surface failures from the live generation,
    /// silently drop the rest.
    fn pump_tasks(&mut self, now: f64) {
        if !self.realm.has_due_tasks(now) {
            return;
        }
        let failures = self.realm.run_due_tasks(now);
        let mut surfaced = false;
        for failure in failures {
            if self.surface_late_failure(&failure) {
                surfaced = true;
            }
        }
        if !surfaced {
            // Tasks ran and may have re-rendered without failing.
            self.output.surface_changed();
        }
    }

    fn surface_late_failure(&mut self, failure: &TaskFailure) -> bool {
        if failure.generation != self.generation {
            debug!(
                target: "vitrine::pipeline",
                stale = failure.generation,
                current = self.generation,
                "stale deferred failure dropped"
            );
            return false;
        }
        let map = self.live_map.clone().unwrap_or_default();
        let diagnostic = translate(&failure.error, &map, self.config.frame_policy);
        self.apply_error_outputs(&diagnostic);
        self.phase = Phase::Settled { ok: false };
        true
    }

    /// Invoke an event-handler prop on the mounted surface. Errors are
    /// surfaced exactly like deferred-task failures.
    pub fn dispatch(&mut self, path: &[usize], prop: &str, now: f64) {
        match self.realm.dispatch(path, prop, now) {
            Ok(handled) => {
                if handled {
                    self.output.surface_changed();
                }
            }
            Err(failure) => {
                self.surface_late_failure(&failure);
            }
        }
    }

    // ── Settling ──────────────────────────────────────────────────────────

    fn settle_ok(&mut self, text: String) {
        self.editor.clear_annotations();
        self.output.clear_diagnostic();
        self.output.surface_changed();
        self.persist(&text);
        self.phase = Phase::Settled { ok: true };
    }

    fn settle_err(&mut self, text: String, diagnostic: Diagnostic) {
        self.apply_error_outputs(&diagnostic);
        self.persist(&text);
        self.phase = Phase::Settled { ok: false };
    }

    /// Settled(error) drives two outputs: an inline annotation at the
    /// translated position (when one exists) and the output pane summary.
    fn apply_error_outputs(&mut self, diagnostic: &Diagnostic) {
        self.editor.clear_annotations();
        // The first translated user frame carries the most precise position
        // (its column may legitimately be absent inside rewritten markup);
        // compile diagnostics have no frames and use their span instead.
        let position = diagnostic
            .frames
            .iter()
            .find(|f| f.translated && !f.internal)
            .and_then(|f| f.line.map(|line| (line, f.col)))
            .or_else(|| diagnostic.span.map(|s| (s.start_line, Some(s.start_col))));
        if let Some((line, col)) = position {
            self.editor.annotate(line, col, &diagnostic.summary());
        }
        self.output.show_diagnostic(diagnostic);
    }

    /// Best-effort write of the settled text. Failures are logged, never
    /// propagated — persistence must not block the pipeline.
    fn persist(&mut self, text: &str) {
        if let Err(err) = self.store.set(&self.config.storage_key, text) {
            warn!(target: "vitrine::pipeline", %err, "persist failed");
        }
    }
}
