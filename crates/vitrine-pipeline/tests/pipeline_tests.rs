//! Integration tests for the debounced edit pipeline.
//!
//! Exercises the full core: debounce ordering, the at-most-one-in-flight
//! discipline, compile and runtime error surfacing (with line translation
//! through the whole stack), the unchanged-source short-circuit, deferred
//! failure attribution by generation, and persistence.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use vitrine_pipeline::{
    import_map_for, Catalog, EditorPort, ExampleEntry, ExampleFetcher, KvStore, MemoryStore,
    OutputPort, Pipeline, PipelineConfig, PipelineState, ShareLink, StoreError,
};
use vitrine_realm::{Realm, RealmConfig};
use vitrine_types::{Diagnostic, DiagnosticKind};

// ══════════════════════════════════════════════════════════════════════════════
// Recording test doubles
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct EditorLog {
    text: Option<String>,
    annotations: Vec<(u32, Option<u32>, String)>,
    clears: usize,
}

#[derive(Clone, Default)]
struct SharedEditor(Rc<RefCell<EditorLog>>);

impl EditorPort for SharedEditor {
    fn set_text(&mut self, text: &str) {
        self.0.borrow_mut().text = Some(text.to_string());
    }
    fn annotate(&mut self, line: u32, col: Option<u32>, message: &str) {
        self.0
            .borrow_mut()
            .annotations
            .push((line, col, message.to_string()));
    }
    fn clear_annotations(&mut self) {
        let mut log = self.0.borrow_mut();
        log.annotations.clear();
        log.clears += 1;
    }
}

#[derive(Default)]
struct OutputLog {
    shown: Option<Diagnostic>,
    surface_changes: usize,
}

#[derive(Clone, Default)]
struct SharedOutput(Rc<RefCell<OutputLog>>);

impl OutputPort for SharedOutput {
    fn show_diagnostic(&mut self, diagnostic: &Diagnostic) {
        self.0.borrow_mut().shown = Some(diagnostic.clone());
    }
    fn clear_diagnostic(&mut self) {
        self.0.borrow_mut().shown = None;
    }
    fn surface_changed(&mut self) {
        self.0.borrow_mut().surface_changes += 1;
    }
}

#[derive(Clone, Default)]
struct SharedStore(Rc<RefCell<MemoryStore>>);

impl KvStore for SharedStore {
    fn get(&self, key: &str) -> Option<String> {
        self.0.borrow().get(key)
    }
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.0.borrow_mut().set(key, value)
    }
}

struct MapFetcher(BTreeMap<String, String>);

impl ExampleFetcher for MapFetcher {
    fn fetch(&self, slug: &str) -> Result<String, StoreError> {
        self.0
            .get(slug)
            .cloned()
            .ok_or_else(|| StoreError::Fetch(format!("no body for {slug}")))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Fixtures
// ══════════════════════════════════════════════════════════════════════════════

const COUNTER_EXAMPLE: &str = "import { h, mount } from \"vane\"\n\nlet count = 0\n\nfn increment() {\n  count = count + 1\n  render()\n}\n\nfn render() {\n  mount(<button onclick={increment}>{count}</button>)\n}\n\nrender()";

fn mount_text_source(text: &str) -> String {
    format!("import {{ h, mount }} from \"vane\"\nmount(<p>{text}</p>)")
}

struct Fixture {
    pipeline: Pipeline,
    editor: SharedEditor,
    output: SharedOutput,
    store: SharedStore,
}

fn fixture_with_store(store: SharedStore) -> Fixture {
    let editor = SharedEditor::default();
    let output = SharedOutput::default();
    let mut realm = Realm::new(RealmConfig::default());
    realm.install_vane();
    let import_map = import_map_for(realm.registry(), &[]);
    let catalog = Catalog::new(vec![ExampleEntry::new("Counter", "Basics", "counter")]);
    let fetcher = MapFetcher(BTreeMap::from([(
        "counter".to_string(),
        COUNTER_EXAMPLE.to_string(),
    )]));
    let pipeline = Pipeline::new(
        PipelineConfig::default(),
        import_map,
        realm,
        catalog,
        Box::new(editor.clone()),
        Box::new(output.clone()),
        Box::new(store.clone()),
        Box::new(fetcher),
    );
    Fixture {
        pipeline,
        editor,
        output,
        store,
    }
}

fn fixture() -> Fixture {
    fixture_with_store(SharedStore::default())
}

/// Tick until the pipeline settles (bounded).
fn settle(pipeline: &mut Pipeline, now: f64) -> PipelineState {
    for _ in 0..6 {
        let state = pipeline.tick(now);
        if matches!(state, PipelineState::SettledOk | PipelineState::SettledErr) {
            return state;
        }
    }
    pipeline.state()
}

// ══════════════════════════════════════════════════════════════════════════════
// Boot & precedence
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_boot_default_example_runs() {
    let mut fx = fixture();
    fx.pipeline.boot(None, 0.0);
    assert_eq!(
        fx.editor.0.borrow().text.as_deref(),
        Some(COUNTER_EXAMPLE)
    );
    assert_eq!(settle(&mut fx.pipeline, 0.0), PipelineState::SettledOk);
    let surface = fx.pipeline.surface().expect("example mounted");
    assert_eq!(surface.text_content(), "0");
}

#[test]
fn test_boot_prefers_link_code_over_stored() {
    let store = SharedStore::default();
    store
        .0
        .borrow_mut()
        .set("vitrine.playground.source", "stored text")
        .unwrap();
    let mut fx = fixture_with_store(store);
    fx.pipeline
        .boot(Some(ShareLink::Code("let via_link = 1".into())), 0.0);
    assert_eq!(
        fx.editor.0.borrow().text.as_deref(),
        Some("let via_link = 1")
    );
}

#[test]
fn test_boot_prefers_stored_over_default() {
    let store = SharedStore::default();
    let edited = mount_text_source("edited");
    store
        .0
        .borrow_mut()
        .set("vitrine.playground.source", &edited)
        .unwrap();
    let mut fx = fixture_with_store(store);
    fx.pipeline.boot(None, 0.0);
    assert_eq!(fx.editor.0.borrow().text.as_deref(), Some(edited.as_str()));
}

#[test]
fn test_boot_link_example_beats_stored() {
    let store = SharedStore::default();
    store
        .0
        .borrow_mut()
        .set("vitrine.playground.source", "stored text")
        .unwrap();
    let mut fx = fixture_with_store(store);
    fx.pipeline
        .boot(Some(ShareLink::Example("counter".into())), 0.0);
    assert_eq!(
        fx.editor.0.borrow().text.as_deref(),
        Some(COUNTER_EXAMPLE)
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Debounce ordering
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_rapid_edits_collapse_to_one_cycle() {
    let mut fx = fixture();
    fx.pipeline.boot(None, 0.0);
    settle(&mut fx.pipeline, 0.0);
    assert_eq!(fx.pipeline.generation(), 1);

    fx.pipeline.edit(mount_text_source("A"), 1000.0);
    fx.pipeline.edit(mount_text_source("B"), 1050.0);
    fx.pipeline.edit(mount_text_source("C"), 1100.0);

    // Quiet window restarted by each edit: not due at 1300 (1100 + 250)
    assert_eq!(fx.pipeline.tick(1300.0), PipelineState::Pending);
    assert_eq!(settle(&mut fx.pipeline, 1400.0), PipelineState::SettledOk);

    // Exactly one compile/run cycle happened, with the last edit's text
    assert_eq!(fx.pipeline.generation(), 2);
    assert_eq!(fx.pipeline.surface().unwrap().text_content(), "C");
}

#[test]
fn test_edit_during_inflight_cycle_is_queued() {
    let mut fx = fixture();
    fx.pipeline.boot(None, 0.0);
    settle(&mut fx.pipeline, 0.0);

    fx.pipeline.edit(mount_text_source("first"), 1000.0);
    assert_eq!(fx.pipeline.tick(1300.0), PipelineState::Compiling);

    // An edit mid-cycle does not cancel the in-flight compile
    fx.pipeline.edit(mount_text_source("second"), 1301.0);
    assert_eq!(fx.pipeline.state(), PipelineState::Compiling);

    assert_eq!(fx.pipeline.tick(1302.0), PipelineState::Running);
    assert_eq!(fx.pipeline.tick(1303.0), PipelineState::SettledOk);
    assert_eq!(fx.pipeline.surface().unwrap().text_content(), "first");

    // The queued edit becomes the next Pending cycle
    assert_eq!(fx.pipeline.tick(1304.0), PipelineState::Pending);
    assert_eq!(settle(&mut fx.pipeline, 1700.0), PipelineState::SettledOk);
    assert_eq!(fx.pipeline.surface().unwrap().text_content(), "second");
    assert_eq!(fx.pipeline.generation(), 3);
}

#[test]
fn test_unchanged_source_skips_cycle() {
    let mut fx = fixture();
    fx.pipeline.boot(None, 0.0);
    settle(&mut fx.pipeline, 0.0);
    let realm_generation = fx.pipeline.realm().generation();

    fx.pipeline.edit(COUNTER_EXAMPLE.to_string(), 1000.0);
    assert_eq!(settle(&mut fx.pipeline, 1300.0), PipelineState::SettledOk);
    // The cycle was counted but the realm never re-ran
    assert_eq!(fx.pipeline.generation(), 2);
    assert_eq!(fx.pipeline.realm().generation(), realm_generation);
}

// ══════════════════════════════════════════════════════════════════════════════
// Compile failures
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_unresolved_import_settles_without_running() {
    let mut fx = fixture();
    fx.pipeline.boot(None, 0.0);
    settle(&mut fx.pipeline, 0.0);
    let realm_generation = fx.pipeline.realm().generation();

    fx.pipeline
        .edit("import { zap } from \"nowhere\"\nlet x = 1".to_string(), 1000.0);
    assert_eq!(settle(&mut fx.pipeline, 1300.0), PipelineState::SettledErr);

    let output = fx.output.0.borrow();
    let shown = output.shown.as_ref().expect("diagnostic shown");
    assert_eq!(shown.kind, DiagnosticKind::Compile);
    assert!(shown.message.contains("E200"));
    assert!(shown.message.contains("nowhere"));
    assert!(shown.frames.is_empty());

    // Execution was skipped entirely
    assert_eq!(fx.pipeline.realm().generation(), realm_generation);

    // Inline annotation points at the specifier on line 1
    let editor = fx.editor.0.borrow();
    assert_eq!(editor.annotations.len(), 1);
    assert_eq!(editor.annotations[0].0, 1);
}

#[test]
fn test_syntax_error_annotates_line() {
    let mut fx = fixture();
    fx.pipeline.boot(None, 0.0);
    settle(&mut fx.pipeline, 0.0);

    fx.pipeline
        .edit("import { h, mount } from \"vane\"\nlet = broken".to_string(), 1000.0);
    assert_eq!(settle(&mut fx.pipeline, 1300.0), PipelineState::SettledErr);
    let editor = fx.editor.0.borrow();
    assert_eq!(editor.annotations.len(), 1);
    assert_eq!(editor.annotations[0].0, 2);
}

// ══════════════════════════════════════════════════════════════════════════════
// Runtime failures & translation
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_runtime_error_reports_original_line() {
    let mut fx = fixture();
    fx.pipeline.boot(None, 0.0);
    settle(&mut fx.pipeline, 0.0);

    // throw sits on original line 4, two-space indented (column 3)
    let source = "import { h, mount, throw } from \"vane\"\n\nfn view() {\n  throw(\"boom\")\n}\n\nmount(view)";
    fx.pipeline.edit(source.to_string(), 1000.0);
    assert_eq!(settle(&mut fx.pipeline, 1300.0), PipelineState::SettledErr);

    let output = fx.output.0.borrow();
    let shown = output.shown.as_ref().expect("diagnostic shown");
    assert_eq!(shown.kind, DiagnosticKind::Runtime);
    assert_eq!(shown.message, "boom");
    assert_eq!(shown.name, "Error");

    let editor = fx.editor.0.borrow();
    assert_eq!(editor.annotations.len(), 1);
    let (line, col, message) = &editor.annotations[0];
    assert_eq!(*line, 4);
    assert_eq!(*col, Some(3));
    assert!(message.contains("boom"));
}

#[test]
fn test_failed_run_leaves_no_stale_render() {
    let mut fx = fixture();
    fx.pipeline.boot(None, 0.0);
    settle(&mut fx.pipeline, 0.0);
    assert!(fx.pipeline.surface().is_some());

    let source = "import { h, mount, throw } from \"vane\"\nfn view() {\n  throw(\"boom\")\n}\nmount(view)";
    fx.pipeline.edit(source.to_string(), 1000.0);
    assert_eq!(settle(&mut fx.pipeline, 1300.0), PipelineState::SettledErr);
    assert!(fx.pipeline.surface().is_none());
}

#[test]
fn test_success_clears_previous_error() {
    let mut fx = fixture();
    fx.pipeline.boot(None, 0.0);
    settle(&mut fx.pipeline, 0.0);

    fx.pipeline
        .edit("import { h } from \"vane\"\nlet = nope".to_string(), 1000.0);
    settle(&mut fx.pipeline, 1300.0);
    assert!(fx.output.0.borrow().shown.is_some());

    fx.pipeline.edit(mount_text_source("fixed"), 2000.0);
    assert_eq!(settle(&mut fx.pipeline, 2300.0), PipelineState::SettledOk);
    assert!(fx.output.0.borrow().shown.is_none());
    assert!(fx.editor.0.borrow().annotations.is_empty());
}

// ══════════════════════════════════════════════════════════════════════════════
// Deferred failures & generations
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_deferred_failure_surfaces_for_live_generation() {
    let mut fx = fixture();
    fx.pipeline.boot(None, 0.0);
    settle(&mut fx.pipeline, 0.0);

    let source = "import { h, mount, defer, throw } from \"vane\"\nmount(<p>ok</p>)\ndefer(50, fn() { throw(\"late boom\") })";
    fx.pipeline.edit(source.to_string(), 1000.0);
    assert_eq!(settle(&mut fx.pipeline, 1300.0), PipelineState::SettledOk);

    fx.pipeline.tick(1400.0);
    assert_eq!(fx.pipeline.state(), PipelineState::SettledErr);
    let output = fx.output.0.borrow();
    assert_eq!(
        output.shown.as_ref().map(|d| d.message.as_str()),
        Some("late boom")
    );
}

#[test]
fn test_stale_deferred_failure_is_suppressed() {
    let mut fx = fixture();
    fx.pipeline.boot(None, 0.0);
    settle(&mut fx.pipeline, 0.0);

    // This run schedules a failing task 500ms out
    let source = "import { h, mount, defer, throw } from \"vane\"\nmount(<p>ok</p>)\ndefer(500, fn() { throw(\"from superseded run\") })";
    fx.pipeline.edit(source.to_string(), 1000.0);
    assert_eq!(settle(&mut fx.pipeline, 1300.0), PipelineState::SettledOk);

    // A new edit starts compiling before the task fires; the generation
    // advances when the compile begins
    fx.pipeline.edit(mount_text_source("next"), 1350.0);
    assert_eq!(fx.pipeline.tick(1601.0), PipelineState::Compiling);

    // The old generation's failure fires now — it must be dropped, and the
    // new cycle must settle cleanly
    assert_eq!(fx.pipeline.tick(1900.0), PipelineState::Running);
    assert_eq!(fx.pipeline.tick(1901.0), PipelineState::SettledOk);
    assert!(fx.output.0.borrow().shown.is_none());
    assert_eq!(fx.pipeline.surface().unwrap().text_content(), "next");
}

// ══════════════════════════════════════════════════════════════════════════════
// Event dispatch through the pipeline
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_counter_dispatch_rerenders() {
    let mut fx = fixture();
    fx.pipeline.boot(None, 0.0);
    settle(&mut fx.pipeline, 0.0);
    assert_eq!(fx.pipeline.surface().unwrap().text_content(), "0");

    fx.pipeline.dispatch(&[], "onclick", 10.0);
    assert_eq!(fx.pipeline.surface().unwrap().text_content(), "1");
    assert!(fx.output.0.borrow().surface_changes > 0);
}

// ══════════════════════════════════════════════════════════════════════════════
// Persistence
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_settled_edit_is_stored_and_restored() {
    let store = SharedStore::default();
    let edited = mount_text_source("my edit");
    {
        let mut fx = fixture_with_store(store.clone());
        fx.pipeline.boot(None, 0.0);
        settle(&mut fx.pipeline, 0.0);
        fx.pipeline.edit(edited.clone(), 1000.0);
        settle(&mut fx.pipeline, 1300.0);
        assert_eq!(
            fx.store.0.borrow().get("vitrine.playground.source").as_deref(),
            Some(edited.as_str())
        );
    }

    // Reload without a share link: last edited text wins over the example
    let mut fx = fixture_with_store(store);
    fx.pipeline.boot(None, 5000.0);
    assert_eq!(fx.editor.0.borrow().text.as_deref(), Some(edited.as_str()));
}

#[test]
fn test_share_query_for_current_text() {
    let mut fx = fixture();
    fx.pipeline.boot(None, 0.0);
    settle(&mut fx.pipeline, 0.0);
    let query = fx.pipeline.share_query();
    match vitrine_pipeline::parse_query(&query) {
        Some(ShareLink::Code(text)) => assert_eq!(text, COUNTER_EXAMPLE),
        other => panic!("expected code link, got {other:?}"),
    }
}

#[test]
fn test_select_example_loads_and_runs() {
    let mut fx = fixture();
    fx.pipeline.boot(Some(ShareLink::Code("let x = 1".into())), 0.0);
    settle(&mut fx.pipeline, 0.0);
    assert!(fx.pipeline.select_example("counter", 100.0));
    assert_eq!(settle(&mut fx.pipeline, 400.0), PipelineState::SettledOk);
    assert_eq!(fx.pipeline.surface().unwrap().text_content(), "0");
    assert!(!fx.pipeline.select_example("missing", 500.0));
}
