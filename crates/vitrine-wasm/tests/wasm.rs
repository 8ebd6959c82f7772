//! Browser-side smoke tests. Run with `wasm-pack test --headless`.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

use vitrine_wasm::{decode_share, encode_share, Session};

wasm_bindgen_test_configure!(run_in_browser);

const CATALOG: &str = r#"[{"name": "Counter", "group": "Basics", "slug": "counter"}]"#;

#[wasm_bindgen_test]
fn share_round_trip() {
    let text = "mount(<p>héllo 世界</p>)";
    assert_eq!(decode_share(&encode_share(text)).as_deref(), Some(text));
}

#[wasm_bindgen_test]
fn bad_catalog_is_rejected() {
    assert!(Session::new("not json", None).is_err());
}

#[wasm_bindgen_test]
fn session_settles_in_browser() {
    let mut session = Session::new(CATALOG, None).expect("session");
    session.preload_example(
        "counter",
        "import { h, mount } from \"vane\"\nmount(<p>hi</p>)",
    );
    session.boot("", 0.0);
    let mut state = String::new();
    for i in 0..6 {
        let tick: serde_json::Value =
            serde_json::from_str(&session.tick(i as f64)).expect("tick json");
        state = tick["state"].as_str().unwrap_or("").to_string();
        if state == "settled_ok" {
            break;
        }
    }
    assert_eq!(state, "settled_ok");
}
