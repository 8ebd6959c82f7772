//! Runtime values of the example language.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use vitrine_types::ast::Block;
use vitrine_types::Span;

use crate::surface::Element;

/// A runtime value.
///
/// Compound values are reference-counted — the realm is single-threaded
/// (one run at a time, driven by the host UI), so `Rc` is sufficient.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Rc<Vec<Value>>),
    Object(Rc<BTreeMap<String, Value>>),
    Element(Rc<Element>),
    /// User-defined function (`fn` declaration or lambda).
    Func(Rc<FuncValue>),
    /// Host-provided capability function from the allow-list.
    Native(Rc<NativeFn>),
    /// Realm-intrinsic builtin.
    Builtin(Builtin),
}

/// A user function: parameters and body AST.
///
/// Free variables resolve against the realm's live environment at call
/// time, so module-level state mutated by an event handler or deferred
/// task is visible to later renders.
pub struct FuncValue {
    /// Declared name, or `"<fn>"` for lambdas.
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
    /// Declaration site, used as the call-site position when the host
    /// invokes the function directly (tasks, event dispatch).
    pub span: Span,
}

/// A host capability: a plain function over values. Errors come back as
/// messages, never as host panics.
pub struct NativeFn {
    pub name: String,
    #[allow(clippy::type_complexity)]
    pub f: Box<dyn Fn(Vec<Value>) -> Result<Value, String>>,
}

impl NativeFn {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(Vec<Value>) -> Result<Value, String> + 'static,
    ) -> Value {
        Value::Native(Rc::new(Self {
            name: name.into(),
            f: Box::new(f),
        }))
    }
}

/// Realm-intrinsic builtins. These need access to realm state (the mount
/// surface, the task queue), so they are dispatched by the evaluator rather
/// than boxed as closures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `h(tag, props, children)` — build an element, invoking component
    /// functions along the way.
    H,
    /// `mount(element | component)` — attach output to the surface.
    Mount,
    /// `defer(ms, fn)` — schedule a deferred task in the realm.
    Defer,
    /// `log(value)` — captured console output.
    Log,
    /// `throw(message)` — raise a runtime error.
    Throw,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::H => "h",
            Builtin::Mount => "mount",
            Builtin::Defer => "defer",
            Builtin::Log => "log",
            Builtin::Throw => "throw",
        }
    }
}

impl Value {
    /// The value's type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Element(_) => "element",
            Value::Func(_) => "function",
            Value::Native(_) => "function",
            Value::Builtin(_) => "function",
        }
    }

    /// Truthiness: `nil` and `false` are falsy, everything else truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Human-readable rendering, used by `log`, text children, and string
    /// concatenation.
    pub fn display_string(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Str(s) => s.clone(),
            Value::List(items) => {
                let inner = items
                    .iter()
                    .map(Value::display_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{inner}]")
            }
            Value::Object(fields) => {
                let inner = fields
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.display_string()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{inner}}}")
            }
            Value::Element(el) => format!("<{}>", el.tag),
            Value::Func(f) => format!("<fn {}>", f.name),
            Value::Native(n) => format!("<fn {}>", n.name),
            Value::Builtin(b) => format!("<fn {}>", b.name()),
        }
    }

    /// Convert to JSON for the host boundary. Functions are rendered as
    /// opaque markers — they never cross the boundary as callables.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Nil => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Element(el) => el.to_json(),
            Value::Func(_) | Value::Native(_) | Value::Builtin(_) => {
                serde_json::Value::String(self.display_string())
            }
        }
    }
}

/// Structural equality; functions compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Element(a), Value::Element(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

// Debug via the display rendering — closures inside NativeFn have no
// useful derive output.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_string())
    }
}
