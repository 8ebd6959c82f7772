//! Realm Runner: isolated evaluation of compiled playground modules.
//!
//! Executes the compiled module text the transformer produced, with a
//! global scope containing nothing but registered imports and an explicit
//! capability allow-list. Captures every failure — synchronous, deferred,
//! or raised inside a component render — as a [`vitrine_types::RawError`]
//! in compiled coordinates, for the stack trace translator to map back.

mod env;
mod error;
mod evaluator;
mod realm;
mod surface;
mod value;

pub use env::Environment;
pub use error::{EvalError, EvalResult, Trap};
pub use evaluator::{Effects, Evaluator};
pub use realm::{
    vane_module, ModuleRegistry, Realm, RealmConfig, RunSummary, TaskFailure, VANE_RESOLVED,
};
pub use surface::{Element, ElementChild};
pub use value::{Builtin, FuncValue, NativeFn, Value};
