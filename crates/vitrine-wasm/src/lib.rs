//! Vitrine playground core as a WASM module for browser environments.
//!
//! This crate exposes the edit pipeline via `wasm-bindgen`, suitable for
//! driving from the documentation site's page script.
//!
//! # Usage (JavaScript)
//!
//! ```js
//! import init, { Session, version } from 'vitrine-wasm';
//!
//! await init();
//!
//! const session = new Session(catalogJson, localStorage.getItem(KEY));
//! session.preload_example('counter', counterSource);
//! session.boot(location.search, performance.now());
//!
//! editor.onChange(text => session.edit(text, performance.now()));
//! function frame(now) {
//!   const { state, events } = JSON.parse(session.tick(now));
//!   for (const event of events) apply(event);   // set_text / annotate / ...
//!   requestAnimationFrame(frame);
//! }
//! ```
//!
//! The host applies drained events to the editor widget, the output pane,
//! and `localStorage`; the core never touches the DOM itself.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use vitrine_pipeline::{
    import_map_for, parse_query, Catalog, EditorPort, ExampleEntry, ExampleFetcher, KvStore,
    MemoryStore, OutputPort, Pipeline, PipelineConfig, PipelineState, StoreError,
};
use vitrine_realm::Realm;
use vitrine_types::Diagnostic;

type EventBuffer = Rc<RefCell<Vec<serde_json::Value>>>;

// ─────────────────────────────────────────────────────────────────────
// Buffered ports: pipeline output becomes a JSON event stream the host
// drains on every tick
// ─────────────────────────────────────────────────────────────────────

struct BufferedEditor {
    events: EventBuffer,
}

impl EditorPort for BufferedEditor {
    fn set_text(&mut self, text: &str) {
        self.events
            .borrow_mut()
            .push(serde_json::json!({ "type": "set_text", "text": text }));
    }
    fn annotate(&mut self, line: u32, col: Option<u32>, message: &str) {
        self.events.borrow_mut().push(serde_json::json!({
            "type": "annotate", "line": line, "col": col, "message": message,
        }));
    }
    fn clear_annotations(&mut self) {
        self.events
            .borrow_mut()
            .push(serde_json::json!({ "type": "clear_annotations" }));
    }
}

struct BufferedOutput {
    events: EventBuffer,
}

impl OutputPort for BufferedOutput {
    fn show_diagnostic(&mut self, diagnostic: &Diagnostic) {
        let diagnostic = serde_json::to_value(diagnostic).unwrap_or_default();
        self.events
            .borrow_mut()
            .push(serde_json::json!({ "type": "diagnostic", "diagnostic": diagnostic }));
    }
    fn clear_diagnostic(&mut self) {
        self.events
            .borrow_mut()
            .push(serde_json::json!({ "type": "clear_diagnostic" }));
    }
    fn surface_changed(&mut self) {
        self.events
            .borrow_mut()
            .push(serde_json::json!({ "type": "surface" }));
    }
}

/// In-memory store that mirrors writes into the event stream so the host
/// can persist them to `localStorage`.
struct BufferedStore {
    inner: MemoryStore,
    events: EventBuffer,
}

impl KvStore for BufferedStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value)?;
        self.events
            .borrow_mut()
            .push(serde_json::json!({ "type": "store_write", "key": key, "value": value }));
        Ok(())
    }
}

/// Example bodies are preloaded by the host; there is nothing to fetch
/// inside the wasm module.
struct PreloadedOnly;

impl ExampleFetcher for PreloadedOnly {
    fn fetch(&self, slug: &str) -> Result<String, StoreError> {
        Err(StoreError::Fetch(format!("example '{slug}' not preloaded")))
    }
}

fn state_name(state: PipelineState) -> &'static str {
    match state {
        PipelineState::Idle => "idle",
        PipelineState::Pending => "pending",
        PipelineState::Compiling => "compiling",
        PipelineState::Running => "running",
        PipelineState::SettledOk => "settled_ok",
        PipelineState::SettledErr => "settled_err",
    }
}

// ─────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────

/// One playground session: a pipeline plus the event buffer its ports
/// write into.
#[wasm_bindgen]
pub struct Session {
    pipeline: Pipeline,
    events: EventBuffer,
}

#[wasm_bindgen]
impl Session {
    /// Create a session.
    ///
    /// `catalog_json` is the example list (`[{name, group, slug}, ...]`);
    /// `stored_text` is the host's `localStorage` value for the source key,
    /// if any.
    #[wasm_bindgen(constructor)]
    pub fn new(catalog_json: &str, stored_text: Option<String>) -> Result<Session, JsValue> {
        let entries: Vec<ExampleEntry> = serde_json::from_str(catalog_json)
            .map_err(|e| JsValue::from_str(&format!("bad catalog: {e}")))?;

        let config = PipelineConfig::default();
        let events: EventBuffer = Rc::new(RefCell::new(Vec::new()));

        let mut realm = Realm::new(config.realm_config());
        realm.install_vane();
        let import_map = import_map_for(realm.registry(), &[]);

        let mut store = BufferedStore {
            inner: MemoryStore::new(),
            events: events.clone(),
        };
        if let Some(text) = stored_text {
            // Seed without emitting a store_write back at the host
            store.inner.set(&config.storage_key, &text).ok();
        }

        let pipeline = Pipeline::new(
            config,
            import_map,
            realm,
            Catalog::new(entries),
            Box::new(BufferedEditor {
                events: events.clone(),
            }),
            Box::new(BufferedOutput {
                events: events.clone(),
            }),
            Box::new(store),
            Box::new(PreloadedOnly),
        );

        Ok(Session { pipeline, events })
    }

    /// Preload an example body (call before `boot`).
    pub fn preload_example(&mut self, slug: &str, body: &str) {
        self.pipeline.preload_example(slug, body);
    }

    /// Start the session. `query` is the page query string (share links).
    pub fn boot(&mut self, query: &str, now: f64) {
        self.pipeline.boot(parse_query(query), now);
    }

    /// Report a keystroke.
    pub fn edit(&mut self, text: &str, now: f64) {
        self.pipeline.edit(text.to_string(), now);
    }

    /// Advance the pipeline one step and drain pending events.
    ///
    /// Returns `{"state": "...", "events": [...]}` as a JSON string.
    pub fn tick(&mut self, now: f64) -> String {
        let state = self.pipeline.tick(now);
        let events: Vec<serde_json::Value> = self.events.borrow_mut().drain(..).collect();
        serde_json::json!({ "state": state_name(state), "events": events }).to_string()
    }

    /// Invoke an event-handler prop on the mounted surface.
    pub fn dispatch(&mut self, path: Vec<u32>, prop: &str, now: f64) -> String {
        let path: Vec<usize> = path.into_iter().map(|i| i as usize).collect();
        self.pipeline.dispatch(&path, prop, now);
        let events: Vec<serde_json::Value> = self.events.borrow_mut().drain(..).collect();
        serde_json::json!({ "state": state_name(self.pipeline.state()), "events": events })
            .to_string()
    }

    /// Load a named example into the editor.
    pub fn select_example(&mut self, slug: &str, now: f64) -> bool {
        self.pipeline.select_example(slug, now)
    }

    /// The mounted surface as JSON, or `"null"`.
    pub fn surface_json(&self) -> String {
        match self.pipeline.surface() {
            Some(element) => element.to_json().to_string(),
            None => "null".to_string(),
        }
    }

    /// Captured `log` output of the live run.
    pub fn logs(&self) -> Vec<String> {
        self.pipeline.realm().logs().to_vec()
    }

    /// The example catalog as structured JS values (for menu rendering).
    pub fn catalog(&self) -> JsValue {
        serde_wasm_bindgen::to_value(self.pipeline.catalog().entries()).unwrap_or(JsValue::NULL)
    }

    /// The example catalog as JSON.
    pub fn catalog_json(&self) -> String {
        serde_json::to_string(self.pipeline.catalog().entries()).unwrap_or_else(|_| "[]".into())
    }

    /// A `?code=...` query for the current editor text.
    pub fn share_query(&self) -> String {
        self.pipeline.share_query()
    }

    /// Earliest time the host should call `tick` again, or -1.
    pub fn next_deadline(&self) -> f64 {
        self.pipeline.next_deadline().unwrap_or(-1.0)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Free functions
// ─────────────────────────────────────────────────────────────────────

/// Encode source text for a `?code=` share link.
#[wasm_bindgen]
pub fn encode_share(text: &str) -> String {
    vitrine_pipeline::encode_share(text)
}

/// Decode a `?code=` payload back to source text, or `null`.
#[wasm_bindgen]
pub fn decode_share(encoded: &str) -> Option<String> {
    vitrine_pipeline::decode_share(encoded)
}

/// Return the playground core version string.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
