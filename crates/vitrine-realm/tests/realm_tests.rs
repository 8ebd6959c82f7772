//! Integration tests for the realm runner.
//!
//! Tests key behaviours:
//! - mounting intrinsic elements and components
//! - capability allow-list isolation
//! - error capture (sync, component render, deferred tasks)
//! - stack frame accumulation
//! - generation teardown and stale-task discarding
//! - event dispatch and module-state mutation

use vitrine_realm::{NativeFn, Realm, RealmConfig, Value};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// A realm with the vane module installed.
fn realm() -> Realm {
    let mut realm = Realm::new(RealmConfig::default());
    realm.install_vane();
    realm
}

/// Run module text as generation 1 at t=0, panicking on failure.
fn run_ok(realm: &mut Realm, text: &str) {
    realm
        .run(text, 1, 0.0)
        .unwrap_or_else(|e| panic!("run failed: {}: {}", e.name, e.message));
}

const VANE: &str = "import { h, mount } from \"vitrine:vane\"";

// ══════════════════════════════════════════════════════════════════════════════
// Mounting
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_mount_simple_element() {
    let mut realm = realm();
    run_ok(
        &mut realm,
        &format!("{VANE}\nmount(h(\"div\", {{}}, [\"hello\"]))"),
    );
    let surface = realm.surface().expect("mounted");
    assert_eq!(surface.tag, "div");
    assert_eq!(surface.text_content(), "hello");
}

#[test]
fn test_run_without_mount_reports_unmounted() {
    let mut realm = realm();
    let summary = realm.run(&format!("{VANE}\nlet x = 1"), 1, 0.0).unwrap();
    assert!(!summary.mounted);
    assert!(realm.surface().is_none());
}

#[test]
fn test_mount_component_function() {
    let source = format!(
        "{VANE}\n\nfn view() {{\n  return h(\"p\", {{}}, [\"from view\"])\n}}\n\nmount(view)"
    );
    let mut realm = realm();
    run_ok(&mut realm, &source);
    assert_eq!(realm.surface().unwrap().text_content(), "from view");
}

#[test]
fn test_component_in_h_receives_props() {
    let source = format!(
        "{VANE}\n\nfn Badge(props, children) {{\n  return h(\"b\", {{}}, [props.label])\n}}\n\nmount(h(Badge, {{ \"label\": \"new\" }}, []))"
    );
    let mut realm = realm();
    run_ok(&mut realm, &source);
    assert_eq!(realm.surface().unwrap().text_content(), "new");
}

#[test]
fn test_number_children_become_text() {
    let mut realm = realm();
    run_ok(&mut realm, &format!("{VANE}\nmount(h(\"span\", {{}}, [42]))"));
    assert_eq!(realm.surface().unwrap().text_content(), "42");
}

#[test]
fn test_nil_and_false_children_render_nothing() {
    let mut realm = realm();
    run_ok(
        &mut realm,
        &format!("{VANE}\nmount(h(\"div\", {{}}, [nil, false, \"x\"]))"),
    );
    assert_eq!(realm.surface().unwrap().children.len(), 1);
}

#[test]
fn test_list_children_flatten() {
    let mut realm = realm();
    run_ok(
        &mut realm,
        &format!("{VANE}\nmount(h(\"ul\", {{}}, [[h(\"li\", {{}}, [\"a\"]), h(\"li\", {{}}, [\"b\"])]]))"),
    );
    assert_eq!(realm.surface().unwrap().children.len(), 2);
}

// ══════════════════════════════════════════════════════════════════════════════
// Isolation & capabilities
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_unknown_global_is_reference_error() {
    let mut realm = realm();
    let err = realm
        .run(&format!("{VANE}\nmount(h(\"div\", {{}}, [window]))"), 1, 0.0)
        .unwrap_err();
    assert_eq!(err.name, "ReferenceError");
    assert!(err.message.contains("window"));
}

#[test]
fn test_exposed_capability_is_callable() {
    let mut realm = realm();
    realm.expose(
        "greet",
        NativeFn::new("greet", |_args| Ok(Value::Str("hi from host".into()))),
    );
    run_ok(&mut realm, &format!("{VANE}\nmount(h(\"p\", {{}}, [greet()]))"));
    assert_eq!(realm.surface().unwrap().text_content(), "hi from host");
}

#[test]
fn test_capability_failure_is_captured() {
    let mut realm = realm();
    realm.expose(
        "flaky",
        NativeFn::new("flaky", |_args| Err("backend unavailable".into())),
    );
    let err = realm
        .run(&format!("{VANE}\nmount(h(\"p\", {{}}, [flaky()]))"), 1, 0.0)
        .unwrap_err();
    assert_eq!(err.name, "Error");
    assert!(err.message.contains("backend unavailable"));
}

#[test]
fn test_unregistered_module_import_fails() {
    let mut realm = realm();
    let err = realm
        .run("import { x } from \"vitrine:nope\"\nlet y = 1", 1, 0.0)
        .unwrap_err();
    assert_eq!(err.name, "ReferenceError");
    assert!(err.message.contains("vitrine:nope"));
}

#[test]
fn test_unknown_export_fails() {
    let mut realm = realm();
    let err = realm
        .run("import { teleport } from \"vitrine:vane\"\nlet y = 1", 1, 0.0)
        .unwrap_err();
    assert_eq!(err.name, "ReferenceError");
    assert!(err.message.contains("teleport"));
}

#[test]
fn test_registered_demo_module() {
    let mut realm = realm();
    realm.register_module(
        "vitrine:demo-api",
        vec![(
            "users".to_string(),
            NativeFn::new("users", |_args| {
                Ok(Value::List(std::rc::Rc::new(vec![
                    Value::Str("ada".into()),
                    Value::Str("grace".into()),
                ])))
            }),
        )],
    );
    let source = format!(
        "{VANE}\nimport {{ users }} from \"vitrine:demo-api\"\nmount(h(\"div\", {{}}, [users()]))"
    );
    run_ok(&mut realm, &source);
    assert_eq!(realm.surface().unwrap().text_content(), "ada grace");
}

// ══════════════════════════════════════════════════════════════════════════════
// Error capture & stack frames
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_throw_in_render_path() {
    let source = "import { h, mount, throw } from \"vitrine:vane\"\n\nfn view() {\n  throw(\"boom\")\n}\n\nmount(view)";
    let mut realm = realm();
    let err = realm.run(source, 1, 0.0).unwrap_err();
    assert_eq!(err.name, "Error");
    assert_eq!(err.message, "boom");
    // No stale output after a failed run
    assert!(realm.surface().is_none());
}

#[test]
fn test_frames_innermost_first() {
    let source = "import { h, mount, throw } from \"vitrine:vane\"\n\nfn inner() {\n  throw(\"boom\")\n}\n\nfn outer() {\n  return inner()\n}\n\nmount(h(\"div\", {}, [outer()]))";
    let mut realm = realm();
    let err = realm.run(source, 1, 0.0).unwrap_err();
    let names: Vec<&str> = err.frames.iter().map(|f| f.func.as_str()).collect();
    assert_eq!(names, vec!["throw", "inner", "outer", "<module>"]);
    // throw() sits on line 4; inner() is called from line 8
    assert_eq!(err.frames[1].line, 4);
    assert_eq!(err.frames[2].line, 8);
    assert!(err.frames[0].internal);
    assert!(!err.frames[1].internal);
}

#[test]
fn test_component_render_error_has_h_frame() {
    let source = "import { h, mount, throw } from \"vitrine:vane\"\nfn Broken(props, children) {\n  throw(\"render fail\")\n}\nmount(h(Broken, {}, []))";
    let mut realm = realm();
    let err = realm.run(source, 1, 0.0).unwrap_err();
    let names: Vec<&str> = err.frames.iter().map(|f| f.func.as_str()).collect();
    assert_eq!(names, vec!["throw", "Broken", "h", "<module>"]);
    assert!(err.frames[2].internal);
}

#[test]
fn test_type_error_name() {
    let mut realm = realm();
    let err = realm
        .run(&format!("{VANE}\nlet x = 1 + h(\"div\", {{}}, [])"), 1, 0.0)
        .unwrap_err();
    assert_eq!(err.name, "TypeError");
}

#[test]
fn test_division_by_zero_traps() {
    let mut realm = realm();
    let err = realm.run(&format!("{VANE}\nlet x = 1 / 0"), 1, 0.0).unwrap_err();
    assert_eq!(err.name, "RangeError");
    assert!(err.message.contains("division by zero"));
}

#[test]
fn test_runaway_recursion_is_bounded() {
    let source = format!("{VANE}\nfn loop_forever() {{\n  return loop_forever()\n}}\nloop_forever()");
    let mut realm = realm();
    let err = realm.run(&source, 1, 0.0).unwrap_err();
    assert_eq!(err.name, "RangeError");
}

// ══════════════════════════════════════════════════════════════════════════════
// Deferred tasks & generations
// ══════════════════════════════════════════════════════════════════════════════

const TIMER_SOURCE: &str = "import { h, mount, defer } from \"vitrine:vane\"\n\nlet state = \"waiting\"\n\nfn render() {\n  mount(h(\"p\", {}, [state]))\n}\n\nfn update() {\n  state = \"done\"\n  render()\n}\n\ndefer(100, update)\nrender()";

#[test]
fn test_deferred_task_runs_when_due() {
    let mut realm = realm();
    run_ok(&mut realm, TIMER_SOURCE);
    assert_eq!(realm.surface().unwrap().text_content(), "waiting");
    assert_eq!(realm.next_task_due(), Some(100.0));

    assert!(realm.run_due_tasks(50.0).is_empty());
    assert_eq!(realm.surface().unwrap().text_content(), "waiting");

    assert!(realm.run_due_tasks(150.0).is_empty());
    assert_eq!(realm.surface().unwrap().text_content(), "done");
    assert_eq!(realm.next_task_due(), None);
}

#[test]
fn test_new_run_tears_down_previous_tasks() {
    let mut realm = realm();
    run_ok(&mut realm, TIMER_SOURCE);
    // A new generation supersedes the old run and its timers wholesale
    realm
        .run(&format!("{VANE}\nmount(h(\"p\", {{}}, [\"fresh\"]))"), 2, 60.0)
        .unwrap();
    assert!(realm.run_due_tasks(500.0).is_empty());
    assert_eq!(realm.surface().unwrap().text_content(), "fresh");
    assert_eq!(realm.generation(), 2);
}

#[test]
fn test_task_failure_is_tagged_with_generation() {
    let source = format!("{VANE}\nimport {{ defer }} from \"vitrine:vane\"\ndefer(10, fn() {{ missing() }})\nmount(h(\"p\", {{}}, [\"ok\"]))");
    let mut realm = realm();
    realm.run(&source, 7, 0.0).unwrap();
    let failures = realm.run_due_tasks(20.0);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].generation, 7);
    assert_eq!(failures[0].error.name, "ReferenceError");
}

#[test]
fn test_task_can_schedule_followup() {
    let source = "import { h, mount, defer } from \"vitrine:vane\"\nlet n = 0\nfn tick() {\n  n = n + 1\n  defer(10, tick)\n  mount(h(\"i\", {}, [n]))\n}\ndefer(10, tick)\nmount(h(\"i\", {}, [n]))";
    let mut realm = realm();
    run_ok(&mut realm, source);
    realm.run_due_tasks(10.0);
    realm.run_due_tasks(20.0);
    realm.run_due_tasks(30.0);
    assert_eq!(realm.surface().unwrap().text_content(), "3");
}

// ══════════════════════════════════════════════════════════════════════════════
// Event dispatch
// ══════════════════════════════════════════════════════════════════════════════

const COUNTER_SOURCE: &str = "import { h, mount } from \"vitrine:vane\"\n\nlet count = 0\n\nfn increment() {\n  count = count + 1\n  render()\n}\n\nfn render() {\n  mount(h(\"div\", {}, [\n    h(\"button\", { \"onclick\": increment }, [\"+1\"]),\n    h(\"span\", {}, [count]),\n  ]))\n}\n\nrender()";

#[test]
fn test_counter_dispatch_updates_surface() {
    let mut realm = realm();
    run_ok(&mut realm, COUNTER_SOURCE);
    assert_eq!(realm.surface().unwrap().text_content(), "+1 0");

    assert_eq!(realm.dispatch(&[0], "onclick", 0.0), Ok(true));
    assert_eq!(realm.surface().unwrap().text_content(), "+1 1");

    realm.dispatch(&[0], "onclick", 0.0).unwrap();
    realm.dispatch(&[0], "onclick", 0.0).unwrap();
    assert_eq!(realm.surface().unwrap().text_content(), "+1 3");
}

#[test]
fn test_dispatch_missing_handler_is_noop() {
    let mut realm = realm();
    run_ok(&mut realm, COUNTER_SOURCE);
    assert_eq!(realm.dispatch(&[1], "onclick", 0.0), Ok(false));
    assert_eq!(realm.dispatch(&[0], "onhover", 0.0), Ok(false));
}

#[test]
fn test_dispatch_error_is_captured() {
    let source = "import { h, mount, throw } from \"vitrine:vane\"\nfn explode() {\n  throw(\"clicked too hard\")\n}\nmount(h(\"button\", { \"onclick\": explode }, [\"go\"]))";
    let mut realm = realm();
    run_ok(&mut realm, source);
    let failure = realm.dispatch(&[], "onclick", 0.0).unwrap_err();
    assert_eq!(failure.error.message, "clicked too hard");
    assert_eq!(failure.generation, 1);
}

// ══════════════════════════════════════════════════════════════════════════════
// Logs
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_log_capture() {
    let source = "import { h, mount, log } from \"vitrine:vane\"\nlog(\"ready\", 2)\nmount(h(\"i\", {}, []))";
    let mut realm = realm();
    run_ok(&mut realm, source);
    assert_eq!(realm.logs(), &["ready 2".to_string()]);
}
