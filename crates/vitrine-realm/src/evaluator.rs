//! Core expression and statement evaluator.
//!
//! Walks the compiled module's AST and produces [`Value`]s. The evaluator
//! lives for the whole generation: after the initial top-level run it keeps
//! its environment so deferred tasks and event dispatch see (and mutate)
//! module state. Gas metering bounds runaway loops; a call-depth limit
//! bounds runaway recursion.

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::trace;
use vitrine_types::ast::*;
use vitrine_types::{RawFrame, Span};

use crate::env::Environment;
use crate::error::{EvalError, EvalResult, Trap};
use crate::surface::{Element, ElementChild};
use crate::value::{Builtin, FuncValue, Value};

/// Side effects collected while evaluating: the mounted tree, scheduled
/// deferred tasks, and captured log output. The realm drains these after
/// every entry into user code.
#[derive(Default)]
pub struct Effects {
    pub mounted: Option<Element>,
    /// `(delay_ms, callback)` pairs from `defer`.
    pub scheduled: Vec<(f64, Value)>,
    pub logs: Vec<String>,
}

/// The core evaluator.
pub struct Evaluator {
    /// Variable environment (scoped). The global scope holds only import
    /// bindings and the capability allow-list.
    pub env: Environment,
    /// Gas counter — limits total steps to prevent infinite loops.
    gas: u64,
    /// Gas limit.
    gas_limit: u64,
    /// Call depth limit.
    max_call_depth: usize,
    /// Current call depth.
    call_depth: usize,
    /// Collected side effects, drained by the realm.
    pub(crate) effects: Effects,
}

impl Evaluator {
    /// Create a new evaluator with the given limits.
    pub fn new(gas_limit: u64, max_call_depth: usize) -> Self {
        Self {
            env: Environment::new(),
            gas: 0,
            gas_limit,
            max_call_depth,
            call_depth: 0,
            effects: Effects::default(),
        }
    }

    /// Consume one unit of gas. Returns a trap if exhausted.
    fn tick(&mut self, span: Span) -> EvalResult<()> {
        self.gas += 1;
        if self.gas > self.gas_limit {
            Err(Trap::new(EvalError::GasExhausted, span))
        } else {
            Ok(())
        }
    }

    /// Reset the gas budget. Each entry into user code (initial run, task,
    /// dispatch) gets a fresh budget.
    pub fn refill_gas(&mut self) {
        self.gas = 0;
    }

    // ══════════════════════════════════════════════════════════════════════
    // Top level
    // ══════════════════════════════════════════════════════════════════════

    /// Execute the module body. A top-level `return` stops execution
    /// without error.
    pub fn run_body(&mut self, body: &[Stmt]) -> EvalResult<()> {
        for stmt in body {
            match self.eval_stmt(stmt) {
                Ok(()) => {}
                Err(trap) => {
                    if matches!(trap.error, EvalError::Return(_)) {
                        return Ok(());
                    }
                    return Err(trap);
                }
            }
        }
        Ok(())
    }

    /// Call a callable value directly (deferred tasks, event dispatch).
    pub fn call_value(&mut self, callee: Value, args: Vec<Value>) -> EvalResult<Value> {
        let site = match &callee {
            Value::Func(f) => f.span,
            _ => Span::point(1, 1),
        };
        self.call(callee, args, site)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn eval_stmt(&mut self, stmt: &Stmt) -> EvalResult<()> {
        self.tick(stmt.span())?;
        match stmt {
            Stmt::Let(s) => {
                let value = self.eval_expr(&s.value)?;
                self.env.define(&s.name.name, value);
                Ok(())
            }
            Stmt::Assign(s) => {
                let value = self.eval_expr(&s.value)?;
                if self.env.set(&s.name.name, value) {
                    Ok(())
                } else {
                    Err(Trap::new(
                        EvalError::UndeclaredAssign(s.name.name.clone()),
                        s.name.span,
                    ))
                }
            }
            Stmt::Fn(s) => {
                let func = Value::Func(Rc::new(FuncValue {
                    name: s.name.name.clone(),
                    params: s.params.iter().map(|p| p.name.clone()).collect(),
                    body: s.body.clone(),
                    span: s.span,
                }));
                self.env.define(&s.name.name, func);
                Ok(())
            }
            Stmt::Return(s) => {
                let value = match &s.value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Nil,
                };
                Err(Trap::new(EvalError::Return(value), s.span))
            }
            Stmt::If(s) => self.eval_if(s),
            Stmt::Expr(expr) => {
                self.eval_expr(expr)?;
                Ok(())
            }
        }
    }

    fn eval_if(&mut self, ifs: &IfStmt) -> EvalResult<()> {
        let cond = self.eval_expr(&ifs.condition)?;
        if cond.is_truthy() {
            self.eval_block_scoped(&ifs.then_block)
        } else {
            match &ifs.else_branch {
                Some(ElseBranch::ElseIf(nested)) => self.eval_if(nested),
                Some(ElseBranch::Block(block)) => self.eval_block_scoped(block),
                None => Ok(()),
            }
        }
    }

    fn eval_block_scoped(&mut self, block: &Block) -> EvalResult<()> {
        self.env.push_scope();
        let result = self.eval_block(block);
        self.env.pop_scope();
        result
    }

    fn eval_block(&mut self, block: &Block) -> EvalResult<()> {
        for stmt in &block.stmts {
            self.eval_stmt(stmt)?;
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        self.tick(expr.span)?;
        match &expr.kind {
            ExprKind::NumberLit(n) => Ok(Value::Number(*n)),
            ExprKind::StringLit(s) => Ok(Value::Str(s.clone())),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::NilLit => Ok(Value::Nil),

            ExprKind::Identifier(name) => self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| Trap::new(EvalError::UndefinedVariable(name.clone()), expr.span)),

            ExprKind::ListLit(elems) => {
                let mut values = Vec::with_capacity(elems.len());
                for elem in elems {
                    values.push(self.eval_expr(elem)?);
                }
                Ok(Value::List(Rc::new(values)))
            }
            ExprKind::ObjectLit(entries) => {
                let mut fields = BTreeMap::new();
                for entry in entries {
                    let value = self.eval_expr(&entry.value)?;
                    fields.insert(entry.key.name.clone(), value);
                }
                Ok(Value::Object(Rc::new(fields)))
            }

            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, expr.span),
            ExprKind::Binary { left, op, right } => self.eval_binary(left, *op, right, expr.span),

            ExprKind::Call { callee, args } => {
                let callee_value = self.eval_expr(callee)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval_expr(arg)?);
                }
                self.call(callee_value, arg_values, expr.span)
            }
            ExprKind::Member { object, field } => {
                let value = self.eval_expr(object)?;
                match &value {
                    Value::Object(fields) => fields.get(&field.name).cloned().ok_or_else(|| {
                        Trap::new(EvalError::NoSuchField(field.name.clone()), field.span)
                    }),
                    other => Err(Trap::new(
                        EvalError::TypeMismatch(format!(
                            "cannot access field '{}' on {}",
                            field.name,
                            other.type_name()
                        )),
                        expr.span,
                    )),
                }
            }
            ExprKind::Lambda(lambda) => Ok(Value::Func(Rc::new(FuncValue {
                name: "<fn>".to_string(),
                params: lambda.params.iter().map(|p| p.name.clone()).collect(),
                body: lambda.body.clone(),
                span: lambda.span,
            }))),
            ExprKind::Paren(inner) => self.eval_expr(inner),

            // The transformer lowers every element before execution.
            ExprKind::Element(_) => {
                Err(Trap::new(EvalError::UnexpectedMarkup, expr.span))
            }
        }
    }

    // ── Operators ────────────────────────────────────────────────────────

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> EvalResult<Value> {
        let value = self.eval_expr(operand)?;
        match op {
            UnaryOp::Neg => match value {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(Trap::new(
                    EvalError::TypeMismatch(format!("cannot negate {}", other.type_name())),
                    span,
                )),
            },
            UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        }
    }

    fn eval_binary(
        &mut self,
        left: &Expr,
        op: BinOp,
        right: &Expr,
        span: Span,
    ) -> EvalResult<Value> {
        // Short-circuit for logical operators
        if op == BinOp::And {
            let lv = self.eval_expr(left)?;
            return if !lv.is_truthy() {
                Ok(lv)
            } else {
                self.eval_expr(right)
            };
        }
        if op == BinOp::Or {
            let lv = self.eval_expr(left)?;
            return if lv.is_truthy() {
                Ok(lv)
            } else {
                self.eval_expr(right)
            };
        }

        let lv = self.eval_expr(left)?;
        let rv = self.eval_expr(right)?;

        match op {
            BinOp::Add => self.eval_add(&lv, &rv, span),
            BinOp::Sub => self.eval_arith(&lv, &rv, |a, b| a - b, "-", span),
            BinOp::Mul => self.eval_arith(&lv, &rv, |a, b| a * b, "*", span),
            BinOp::Div => {
                if let (Value::Number(a), Value::Number(b)) = (&lv, &rv) {
                    if *b == 0.0 {
                        return Err(Trap::new(
                            EvalError::ArithmeticTrap("division by zero".into()),
                            span,
                        ));
                    }
                    Ok(Value::Number(a / b))
                } else {
                    Err(self.type_trap("divide", &lv, &rv, span))
                }
            }
            BinOp::Mod => {
                if let (Value::Number(a), Value::Number(b)) = (&lv, &rv) {
                    if *b == 0.0 {
                        return Err(Trap::new(
                            EvalError::ArithmeticTrap("modulo by zero".into()),
                            span,
                        ));
                    }
                    Ok(Value::Number(a % b))
                } else {
                    Err(self.type_trap("modulo", &lv, &rv, span))
                }
            }
            BinOp::Eq => Ok(Value::Bool(lv == rv)),
            BinOp::NotEq => Ok(Value::Bool(lv != rv)),
            BinOp::Less => self.eval_comparison(&lv, &rv, span, |o| o.is_lt()),
            BinOp::Greater => self.eval_comparison(&lv, &rv, span, |o| o.is_gt()),
            BinOp::LessEq => self.eval_comparison(&lv, &rv, span, |o| o.is_le()),
            BinOp::GreaterEq => self.eval_comparison(&lv, &rv, span, |o| o.is_ge()),
            BinOp::And | BinOp::Or => unreachable!("handled above"),
        }
    }

    fn eval_add(&self, lv: &Value, rv: &Value, span: Span) -> EvalResult<Value> {
        match (lv, rv) {
            (Value::Number(a), Value::Number(b)) => {
                let result = a + b;
                if result.is_nan() || result.is_infinite() {
                    Err(Trap::new(
                        EvalError::ArithmeticTrap("addition produced NaN/Infinity".into()),
                        span,
                    ))
                } else {
                    Ok(Value::Number(result))
                }
            }
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            // String concatenation coerces the primitive side
            (Value::Str(a), b @ (Value::Number(_) | Value::Bool(_) | Value::Nil)) => {
                Ok(Value::Str(format!("{a}{}", b.display_string())))
            }
            (a @ (Value::Number(_) | Value::Bool(_) | Value::Nil), Value::Str(b)) => {
                Ok(Value::Str(format!("{}{b}", a.display_string())))
            }
            _ => Err(self.type_trap("add", lv, rv, span)),
        }
    }

    fn eval_arith(
        &self,
        lv: &Value,
        rv: &Value,
        op: fn(f64, f64) -> f64,
        symbol: &str,
        span: Span,
    ) -> EvalResult<Value> {
        if let (Value::Number(a), Value::Number(b)) = (lv, rv) {
            let result = op(*a, *b);
            if result.is_nan() || result.is_infinite() {
                Err(Trap::new(
                    EvalError::ArithmeticTrap(format!("'{symbol}' produced NaN/Infinity")),
                    span,
                ))
            } else {
                Ok(Value::Number(result))
            }
        } else {
            Err(self.type_trap(symbol, lv, rv, span))
        }
    }

    fn eval_comparison(
        &self,
        lv: &Value,
        rv: &Value,
        span: Span,
        accept: fn(std::cmp::Ordering) -> bool,
    ) -> EvalResult<Value> {
        let ordering = match (lv, rv) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        };
        match ordering {
            Some(ordering) => Ok(Value::Bool(accept(ordering))),
            None => Err(self.type_trap("compare", lv, rv, span)),
        }
    }

    fn type_trap(&self, what: &str, lv: &Value, rv: &Value, span: Span) -> Trap {
        Trap::new(
            EvalError::TypeMismatch(format!(
                "cannot {what} {} and {}",
                lv.type_name(),
                rv.type_name()
            )),
            span,
        )
    }

    // ══════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════

    /// Call any callable value. `call_site` is the position the call was
    /// made from, in compiled coordinates.
    fn call(&mut self, callee: Value, args: Vec<Value>, call_site: Span) -> EvalResult<Value> {
        match callee {
            Value::Func(func) => self.call_func(&func, args, call_site),
            Value::Native(native) => self.in_frame(
                native.name.clone(),
                true,
                call_site,
                |_eval| {
                    (native.f)(args).map_err(|message| {
                        Trap::new(EvalError::Native(native.name.clone(), message), call_site)
                    })
                },
            ),
            Value::Builtin(builtin) => self.in_frame(
                builtin.name().to_string(),
                true,
                call_site,
                |eval| eval.eval_builtin(builtin, args, call_site),
            ),
            other => Err(Trap::new(
                EvalError::NotCallable(other.type_name().to_string()),
                call_site,
            )),
        }
    }

    /// Call a user function: fresh scope, bound parameters, `return`
    /// unwinding.
    fn call_func(&mut self, func: &FuncValue, args: Vec<Value>, call_site: Span) -> EvalResult<Value> {
        let name = func.name.clone();
        self.in_frame(name, false, call_site, |eval| {
            eval.env.push_scope();
            let mut args = args.into_iter();
            for param in &func.params {
                eval.env.define(param, args.next().unwrap_or(Value::Nil));
            }
            let result = eval.eval_block(&func.body);
            eval.env.pop_scope();
            match result {
                Ok(()) => Ok(Value::Nil),
                Err(trap) => {
                    if let EvalError::Return(value) = trap.error {
                        Ok(value)
                    } else {
                        Err(trap)
                    }
                }
            }
        })
    }

    /// Run `body` as one stack frame. On a propagating trap, record the
    /// frame (callee name at the trap's current position) and re-point the
    /// trap at this frame's call site, building the stack innermost-first
    /// as the trap unwinds.
    fn in_frame<T>(
        &mut self,
        name: String,
        internal: bool,
        call_site: Span,
        body: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        if self.call_depth >= self.max_call_depth {
            return Err(Trap::new(EvalError::StackOverflow, call_site));
        }
        self.call_depth += 1;
        let env_depth = self.env.depth();
        let result = body(self);
        self.call_depth -= 1;
        match result {
            Err(mut trap) => {
                // Unwind any scopes the failed frame left behind so the
                // evaluator stays usable for later tasks.
                if !matches!(trap.error, EvalError::Return(_)) {
                    self.env.unwind_to(env_depth);
                    trap.frames.push(RawFrame {
                        func: name,
                        line: trap.span.start_line,
                        col: trap.span.start_col,
                        internal,
                    });
                    trap.span = call_site;
                }
                Err(trap)
            }
            ok => ok,
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Builtins
    // ══════════════════════════════════════════════════════════════════════

    fn eval_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        call_site: Span,
    ) -> EvalResult<Value> {
        match builtin {
            Builtin::H => self.builtin_h(args, call_site),
            Builtin::Mount => self.builtin_mount(args, call_site),
            Builtin::Defer => self.builtin_defer(args, call_site),
            Builtin::Log => {
                let text = args
                    .iter()
                    .map(Value::display_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                trace!(target: "vitrine::realm", log = %text, "captured log");
                self.effects.logs.push(text);
                Ok(Value::Nil)
            }
            Builtin::Throw => {
                let message = args
                    .first()
                    .map(Value::display_string)
                    .unwrap_or_else(|| "error".to_string());
                Err(Trap::new(EvalError::Thrown(message), call_site))
            }
        }
    }

    /// `h(tag, props, children)` — the element-creation call markup lowers
    /// to. A string tag builds an intrinsic element; a function tag is a
    /// component invoked with `(props, children)`.
    fn builtin_h(&mut self, args: Vec<Value>, call_site: Span) -> EvalResult<Value> {
        let mut args = args.into_iter();
        let tag = args.next().unwrap_or(Value::Nil);
        let props = args.next().unwrap_or(Value::Nil);
        let children = args.next().unwrap_or(Value::Nil);

        let props_map = match &props {
            Value::Object(fields) => (**fields).clone(),
            Value::Nil => BTreeMap::new(),
            other => {
                return Err(Trap::new(
                    EvalError::TypeMismatch(format!(
                        "element props must be an object, got {}",
                        other.type_name()
                    )),
                    call_site,
                ));
            }
        };
        let child_values: Vec<Value> = match &children {
            Value::List(items) => (**items).clone(),
            Value::Nil => Vec::new(),
            other => vec![other.clone()],
        };

        match tag {
            Value::Str(name) => {
                let mut element = Element::new(name);
                element.props = props_map;
                flatten_children(&child_values, &mut element.children, call_site)?;
                Ok(Value::Element(Rc::new(element)))
            }
            component @ Value::Func(_) => {
                let rendered = self.call(
                    component,
                    vec![Value::Object(Rc::new(props_map)), children],
                    call_site,
                )?;
                match rendered {
                    element @ Value::Element(_) => Ok(element),
                    other => Err(Trap::new(
                        EvalError::TypeMismatch(format!(
                            "component must render an element, got {}",
                            other.type_name()
                        )),
                        call_site,
                    )),
                }
            }
            other => Err(Trap::new(
                EvalError::TypeMismatch(format!(
                    "element tag must be a string or component, got {}",
                    other.type_name()
                )),
                call_site,
            )),
        }
    }

    /// `mount(element | component)` — attach output to the surface.
    fn builtin_mount(&mut self, args: Vec<Value>, call_site: Span) -> EvalResult<Value> {
        let target = args.into_iter().next().unwrap_or(Value::Nil);
        let element = match target {
            Value::Element(el) => (*el).clone(),
            callable @ (Value::Func(_) | Value::Native(_)) => {
                match self.call(callable, Vec::new(), call_site)? {
                    Value::Element(el) => (*el).clone(),
                    other => {
                        return Err(Trap::new(
                            EvalError::TypeMismatch(format!(
                                "mounted component must render an element, got {}",
                                other.type_name()
                            )),
                            call_site,
                        ));
                    }
                }
            }
            other => {
                return Err(Trap::new(
                    EvalError::TypeMismatch(format!(
                        "mount expects an element or component, got {}",
                        other.type_name()
                    )),
                    call_site,
                ));
            }
        };
        self.effects.mounted = Some(element);
        Ok(Value::Nil)
    }

    /// `defer(ms, fn)` — schedule a deferred task.
    fn builtin_defer(&mut self, args: Vec<Value>, call_site: Span) -> EvalResult<Value> {
        let mut args = args.into_iter();
        let delay = match args.next() {
            Some(Value::Number(ms)) if ms >= 0.0 => ms,
            other => {
                return Err(Trap::new(
                    EvalError::TypeMismatch(format!(
                        "defer expects a non-negative delay in ms, got {}",
                        other.map(|v| v.type_name()).unwrap_or("nothing")
                    )),
                    call_site,
                ));
            }
        };
        let callback = match args.next() {
            Some(cb @ (Value::Func(_) | Value::Native(_) | Value::Builtin(_))) => cb,
            other => {
                return Err(Trap::new(
                    EvalError::TypeMismatch(format!(
                        "defer expects a callback, got {}",
                        other.map(|v| v.type_name()).unwrap_or("nothing")
                    )),
                    call_site,
                ));
            }
        };
        self.effects.scheduled.push((delay, callback));
        Ok(Value::Nil)
    }
}

/// Flatten child values into element children. Lists flatten recursively;
/// nil and booleans render nothing (conditional children); numbers and
/// strings become text.
fn flatten_children(
    values: &[Value],
    out: &mut Vec<ElementChild>,
    call_site: Span,
) -> EvalResult<()> {
    for value in values {
        match value {
            Value::Element(el) => out.push(ElementChild::Node((**el).clone())),
            Value::Str(s) => out.push(ElementChild::Text(s.clone())),
            Value::Number(_) => out.push(ElementChild::Text(value.display_string())),
            Value::Nil | Value::Bool(_) => {}
            Value::List(items) => flatten_children(items, out, call_site)?,
            other => {
                return Err(Trap::new(
                    EvalError::TypeMismatch(format!(
                        "cannot render {} as an element child",
                        other.type_name()
                    )),
                    call_site,
                ));
            }
        }
    }
    Ok(())
}
