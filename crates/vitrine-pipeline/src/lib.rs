//! Debounced edit pipeline and persistence for the vitrine playground.
//!
//! ```text
//! keystroke → debounce → transform → realm run → (ok | diagnostic)
//!                                                  ↓
//!                         editor annotation + output pane, local store
//! ```
//!
//! The pipeline owns the realm, the import map, the example catalog, and
//! the host ports; the host owns the clock and drives `tick`.

mod catalog;
mod config;
mod pipeline;
mod ports;
mod share;
mod store;

pub use catalog::{Catalog, ExampleEntry, ExampleFetcher};
pub use config::PipelineConfig;
pub use pipeline::{Pipeline, PipelineState};
pub use ports::{EditorPort, OutputPort};
pub use share::{decode_share, encode_share, parse_query, to_query, ShareLink};
pub use store::{KvStore, MemoryStore, StoreError};

use vitrine_realm::ModuleRegistry;
use vitrine_transform::ImportMap;

/// Build the import map for a module registry: the `vane` bare specifier
/// plus any extra `(bare, resolved)` pairs, with export lists read from the
/// registry so transform-time checking matches what the realm will bind.
pub fn import_map_for(registry: &ModuleRegistry, extra: &[(&str, &str)]) -> ImportMap {
    let mut map = ImportMap::new();
    if let Some(exports) = registry.exports_of(vitrine_realm::VANE_RESOLVED) {
        map.insert("vane", vitrine_realm::VANE_RESOLVED, exports);
    }
    for (bare, resolved) in extra {
        if let Some(exports) = registry.exports_of(resolved) {
            map.insert(*bare, *resolved, exports);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_realm::{Realm, RealmConfig};

    #[test]
    fn test_import_map_matches_registry() {
        let mut realm = Realm::new(RealmConfig::default());
        realm.install_vane();
        let map = import_map_for(realm.registry(), &[]);
        let target = map.resolve("vane").expect("vane mapped");
        assert_eq!(target.resolved, vitrine_realm::VANE_RESOLVED);
        assert!(target.exports.iter().any(|e| e == "h"));
        assert!(target.exports.iter().any(|e| e == "mount"));
    }
}
