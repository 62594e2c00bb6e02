//! Tree-walking evaluator for the guest dialect.
//!
//! Statement execution is written as mutually-recursive `async fn`s boxed
//! with [`futures::future::LocalBoxFuture`] (no `Send` bound — the whole
//! engine is single-threaded and cooperative per spec §5) so that the
//! periodic `N_STEPS`-step yield is a genuine `.await` point. Wrapping the
//! top-level run in `tokio::time::timeout` then gives the host-timer
//! cancellation semantics of spec §4.F for free: when the timeout elapses,
//! Tokio drops the in-flight future at its next await point — which is
//! exactly the "step loop short-circuited on its next check" the spec
//! describes — and whatever logs had accumulated are dropped along with it.

use super::ast::{BinOp, Expr, LogicalOp, PropKey, Stmt, UnOp};
use super::value::{GuestFunction, Scope, Value};
use crate::config::LogMode;
use crate::error::EngineError;
use futures::future::LocalBoxFuture;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: &'static str,
    pub msg: String,
}

/// What a statement's execution produced, for propagating `return`/
/// `break`/`continue` up through nested blocks without exceptions.
enum Completion {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct Interpreter {
    global: Scope,
    steps: Cell<u64>,
    n_steps: u64,
    sleep_ms: u64,
    logs: Rc<RefCell<Vec<LogEntry>>>,
}

impl Interpreter {
    pub fn new(n_steps: u64, sleep_ms: u64, log_mode: LogMode) -> Self {
        let global = Scope::root();
        let logs = Rc::new(RefCell::new(Vec::new()));
        bind_console(&global, log_mode, logs.clone());
        Interpreter {
            global,
            steps: Cell::new(0),
            n_steps: n_steps.max(1),
            sleep_ms,
            logs,
        }
    }

    pub fn global_scope(&self) -> &Scope {
        &self.global
    }

    pub fn bind_global(&self, name: impl Into<String>, value: Value) {
        self.global.declare(name, value);
    }

    pub fn take_logs(&self) -> Vec<LogEntry> {
        std::mem::take(&mut self.logs.borrow_mut())
    }

    /// Load a program's top-level statements, hoisting function
    /// declarations into the global scope before running the rest.
    pub async fn load_program(&self, program: &[Stmt]) -> Result<(), EngineError> {
        hoist_functions(program, &self.global);
        for stmt in program {
            if matches!(stmt, Stmt::FunctionDecl { .. }) {
                continue; // already hoisted
            }
            match self.exec_stmt(stmt, &self.global).await? {
                Completion::Normal => {}
                Completion::Return(_) => {
                    return Err(EngineError::EngineInternalError(
                        "top-level return outside any function".to_string(),
                    ))
                }
                Completion::Break | Completion::Continue => {
                    return Err(EngineError::EngineInternalError(
                        "top-level break/continue outside any loop".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    pub async fn call_function(&self, func: Value, args: Vec<Value>) -> Result<Value, EngineError> {
        match func {
            Value::Function(f) => self.call_guest_function(&f, args).await,
            Value::Native(f) => (f.func)(args),
            Value::Undefined => Err(EngineError::RuleExecutionFailure(
                "attempted to call undefined as a function".to_string(),
            )),
            other => Err(EngineError::RuleExecutionFailure(format!(
                "{} is not a function",
                other.type_name()
            ))),
        }
    }

    async fn call_guest_function(
        &self,
        f: &Rc<GuestFunction>,
        args: Vec<Value>,
    ) -> Result<Value, EngineError> {
        let call_scope = Scope::child(&f.closure);
        for (i, param) in f.params.iter().enumerate() {
            call_scope.declare(param.clone(), args.get(i).cloned().unwrap_or(Value::Undefined));
        }
        hoist_functions(&f.body, &call_scope);
        match self.exec_block(&f.body, &call_scope).await? {
            Completion::Return(v) => Ok(v),
            _ => Ok(Value::Undefined),
        }
    }

    /// Advance the cooperative step counter; every `n_steps` micro-steps,
    /// yield to the host loop via `tokio::time::sleep`. This is the only
    /// mechanism by which the guest releases the host (spec §4.F/§5).
    async fn tick(&self) {
        let n = self.steps.get() + 1;
        self.steps.set(n);
        if n % self.n_steps == 0 {
            tokio::time::sleep(Duration::from_millis(self.sleep_ms)).await;
        }
    }

    fn exec_block<'a>(
        &'a self,
        stmts: &'a [Stmt],
        scope: &'a Scope,
    ) -> LocalBoxFuture<'a, Result<Completion, EngineError>> {
        Box::pin(async move {
            for stmt in stmts {
                match self.exec_stmt(stmt, scope).await? {
                    Completion::Normal => {}
                    other => return Ok(other),
                }
            }
            Ok(Completion::Normal)
        })
    }

    fn exec_stmt<'a>(
        &'a self,
        stmt: &'a Stmt,
        scope: &'a Scope,
    ) -> LocalBoxFuture<'a, Result<Completion, EngineError>> {
        Box::pin(async move {
            self.tick().await;
            match stmt {
                Stmt::Expr(e) => {
                    self.eval_expr(e, scope).await?;
                    Ok(Completion::Normal)
                }
                Stmt::VarDecl(name, init) => {
                    let value = match init {
                        Some(e) => self.eval_expr(e, scope).await?,
                        None => Value::Undefined,
                    };
                    scope.declare(name.clone(), value);
                    Ok(Completion::Normal)
                }
                Stmt::Block(stmts) => {
                    let block_scope = Scope::child(scope);
                    self.exec_block(stmts, &block_scope).await
                }
                Stmt::If(cond, then_branch, else_branch) => {
                    if self.eval_expr(cond, scope).await?.truthy() {
                        self.exec_stmt(then_branch, scope).await
                    } else if let Some(else_branch) = else_branch {
                        self.exec_stmt(else_branch, scope).await
                    } else {
                        Ok(Completion::Normal)
                    }
                }
                Stmt::While(cond, body) => {
                    while self.eval_expr(cond, scope).await?.truthy() {
                        self.tick().await;
                        match self.exec_stmt(body, scope).await? {
                            Completion::Break => break,
                            Completion::Continue | Completion::Normal => {}
                            Completion::Return(v) => return Ok(Completion::Return(v)),
                        }
                    }
                    Ok(Completion::Normal)
                }
                Stmt::For {
                    init,
                    test,
                    update,
                    body,
                } => {
                    let loop_scope = Scope::child(scope);
                    if let Some(init) = init {
                        self.exec_stmt(init, &loop_scope).await?;
                    }
                    loop {
                        if let Some(test) = test {
                            if !self.eval_expr(test, &loop_scope).await?.truthy() {
                                break;
                            }
                        }
                        self.tick().await;
                        match self.exec_stmt(body, &loop_scope).await? {
                            Completion::Break => break,
                            Completion::Continue | Completion::Normal => {}
                            Completion::Return(v) => return Ok(Completion::Return(v)),
                        }
                        if let Some(update) = update {
                            self.eval_expr(update, &loop_scope).await?;
                        }
                    }
                    Ok(Completion::Normal)
                }
                Stmt::Return(e) => {
                    let value = match e {
                        Some(e) => self.eval_expr(e, scope).await?,
                        None => Value::Undefined,
                    };
                    Ok(Completion::Return(value))
                }
                Stmt::FunctionDecl { .. } => Ok(Completion::Normal), // hoisted already
                Stmt::Break => Ok(Completion::Break),
                Stmt::Continue => Ok(Completion::Continue),
            }
        })
    }

    fn eval_expr<'a>(&'a self, expr: &'a Expr, scope: &'a Scope) -> LocalBoxFuture<'a, Result<Value, EngineError>> {
        Box::pin(async move {
            self.tick().await;
            match expr {
                Expr::Number(n) => Ok(Value::Number(*n)),
                Expr::Str(s) => Ok(Value::str(s.clone())),
                Expr::Bool(b) => Ok(Value::Bool(*b)),
                Expr::Null => Ok(Value::Null),
                Expr::Undefined => Ok(Value::Undefined),
                Expr::Ident(name) => scope
                    .get(name)
                    .ok_or_else(|| EngineError::RuleExecutionFailure(format!("{name} is not defined"))),
                Expr::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.eval_expr(item, scope).await?);
                    }
                    Ok(Value::array(values))
                }
                Expr::Object(props) => {
                    let mut map = IndexMap::new();
                    for (key, value_expr) in props {
                        let key = match key {
                            PropKey::Ident(s) => s.clone(),
                            PropKey::Computed(e) => self.eval_expr(e, scope).await?.to_display_string(),
                        };
                        let value = self.eval_expr(value_expr, scope).await?;
                        map.insert(key, value);
                    }
                    Ok(Value::object(map))
                }
                Expr::Unary(op, inner) => {
                    let v = self.eval_expr(inner, scope).await?;
                    Ok(match op {
                        UnOp::Not => Value::Bool(!v.truthy()),
                        UnOp::Neg => Value::Number(-to_number(&v)),
                    })
                }
                Expr::Binary(op, lhs, rhs) => {
                    let l = self.eval_expr(lhs, scope).await?;
                    let r = self.eval_expr(rhs, scope).await?;
                    eval_binary(*op, &l, &r)
                }
                Expr::Logical(op, lhs, rhs) => {
                    let l = self.eval_expr(lhs, scope).await?;
                    match op {
                        LogicalOp::And => {
                            if l.truthy() {
                                self.eval_expr(rhs, scope).await
                            } else {
                                Ok(l)
                            }
                        }
                        LogicalOp::Or => {
                            if l.truthy() {
                                Ok(l)
                            } else {
                                self.eval_expr(rhs, scope).await
                            }
                        }
                    }
                }
                Expr::Conditional(cond, then_e, else_e) => {
                    if self.eval_expr(cond, scope).await?.truthy() {
                        self.eval_expr(then_e, scope).await
                    } else {
                        self.eval_expr(else_e, scope).await
                    }
                }
                Expr::Assign(target, value_expr) => {
                    let value = self.eval_expr(value_expr, scope).await?;
                    self.assign(target, value.clone(), scope).await?;
                    Ok(value)
                }
                Expr::Member { object, property } => {
                    let base = self.eval_expr(object, scope).await?;
                    let key = self.resolve_prop_key(property, scope).await?;
                    get_member(&base, &key)
                }
                Expr::Function { name, params, body } => Ok(Value::Function(Rc::new(GuestFunction {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    closure: scope.clone(),
                }))),
                Expr::Call { callee, args } => self.eval_call(callee, args, scope).await,
            }
        })
    }

    async fn resolve_prop_key(&self, key: &PropKey, scope: &Scope) -> Result<String, EngineError> {
        match key {
            PropKey::Ident(s) => Ok(s.clone()),
            PropKey::Computed(e) => Ok(self.eval_expr(e, scope).await?.to_display_string()),
        }
    }

    async fn assign(&self, target: &Expr, value: Value, scope: &Scope) -> Result<(), EngineError> {
        match target {
            Expr::Ident(name) => {
                if scope.assign(name, value) {
                    Ok(())
                } else {
                    Err(EngineError::RuleExecutionFailure(format!("{name} is not defined")))
                }
            }
            Expr::Member { object, property } => {
                let base = self.eval_expr(object, scope).await?;
                let key = self.resolve_prop_key(property, scope).await?;
                set_member(&base, &key, value)
            }
            _ => Err(EngineError::RuleExecutionFailure(
                "invalid assignment target".to_string(),
            )),
        }
    }

    async fn eval_call(&self, callee: &Expr, args: &[Expr], scope: &Scope) -> Result<Value, EngineError> {
        let mut arg_values = Vec::with_capacity(args.len());
        for a in args {
            arg_values.push(self.eval_expr(a, scope).await?);
        }

        if let Expr::Member { object, property } = callee {
            let base = self.eval_expr(object, scope).await?;
            let name = self.resolve_prop_key(property, scope).await?;
            if let Some(result) = self.try_builtin_method(&base, &name, &arg_values).await? {
                return Ok(result);
            }
            // Not a recognized built-in method: maybe a guest-defined
            // function stored as an object property (no `this` binding —
            // the guest dialect has no concept of method receivers beyond
            // plain closures).
            let member = get_member(&base, &name)?;
            return self.call_function(member, arg_values).await;
        }

        let func = self.eval_expr(callee, scope).await?;
        self.call_function(func, arg_values).await
    }

    /// Array/string methods that need to invoke a guest callback
    /// (`forEach`, `map`, `filter`, `some`, `every`, `find`) live here
    /// because they recurse back into [`Self::call_function`]; purely
    /// synchronous helpers live in [`array_method`]/[`string_method`].
    async fn try_builtin_method(
        &self,
        base: &Value,
        name: &str,
        args: &[Value],
    ) -> Result<Option<Value>, EngineError> {
        let Value::Array(items) = base else {
            return non_callback_method(base, name, args);
        };

        let needs_callback = matches!(name, "forEach" | "map" | "filter" | "some" | "every" | "find");
        if !needs_callback {
            return array_method(items, name, args);
        }

        let callback = args
            .first()
            .cloned()
            .ok_or_else(|| EngineError::RuleExecutionFailure(format!("Array.{name} requires a callback argument")))?;

        let snapshot: Vec<Value> = items.borrow().clone();
        match name {
            "forEach" => {
                for (i, item) in snapshot.iter().enumerate() {
                    self.call_function(callback.clone(), vec![item.clone(), Value::Number(i as f64)])
                        .await?;
                }
                Ok(Some(Value::Undefined))
            }
            "map" => {
                let mut out = Vec::with_capacity(snapshot.len());
                for (i, item) in snapshot.iter().enumerate() {
                    out.push(
                        self.call_function(callback.clone(), vec![item.clone(), Value::Number(i as f64)])
                            .await?,
                    );
                }
                Ok(Some(Value::array(out)))
            }
            "filter" => {
                let mut out = Vec::new();
                for (i, item) in snapshot.iter().enumerate() {
                    let keep = self
                        .call_function(callback.clone(), vec![item.clone(), Value::Number(i as f64)])
                        .await?;
                    if keep.truthy() {
                        out.push(item.clone());
                    }
                }
                Ok(Some(Value::array(out)))
            }
            "some" => {
                for (i, item) in snapshot.iter().enumerate() {
                    let hit = self
                        .call_function(callback.clone(), vec![item.clone(), Value::Number(i as f64)])
                        .await?;
                    if hit.truthy() {
                        return Ok(Some(Value::Bool(true)));
                    }
                }
                Ok(Some(Value::Bool(false)))
            }
            "every" => {
                for (i, item) in snapshot.iter().enumerate() {
                    let hit = self
                        .call_function(callback.clone(), vec![item.clone(), Value::Number(i as f64)])
                        .await?;
                    if !hit.truthy() {
                        return Ok(Some(Value::Bool(false)));
                    }
                }
                Ok(Some(Value::Bool(true)))
            }
            "find" => {
                for (i, item) in snapshot.iter().enumerate() {
                    let hit = self
                        .call_function(callback.clone(), vec![item.clone(), Value::Number(i as f64)])
                        .await?;
                    if hit.truthy() {
                        return Ok(Some(item.clone()));
                    }
                }
                Ok(Some(Value::Undefined))
            }
            _ => unreachable!("guarded by needs_callback"),
        }
    }
}

fn hoist_functions(stmts: &[Stmt], scope: &Scope) {
    for stmt in stmts {
        if let Stmt::FunctionDecl { name, params, body } = stmt {
            scope.declare(
                name.clone(),
                Value::Function(Rc::new(GuestFunction {
                    name: Some(name.clone()),
                    params: params.clone(),
                    body: body.clone(),
                    closure: scope.clone(),
                })),
            );
        }
    }
}

fn bind_console(scope: &Scope, mode: LogMode, logs: Rc<RefCell<Vec<LogEntry>>>) {
    let mut methods = IndexMap::new();
    for level in ["log", "info", "debug", "warn", "error"] {
        let mode = mode;
        let logs = logs.clone();
        let level_tag: &'static str = match level {
            "log" => "log",
            "info" => "info",
            "debug" => "debug",
            "warn" => "warn",
            _ => "error",
        };
        methods.insert(
            level.to_string(),
            Value::native(level_tag, move |args| {
                let msg = args
                    .iter()
                    .map(Value::to_display_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                match mode {
                    LogMode::Drop => {}
                    LogMode::Console => {
                        if level_tag == "error" || level_tag == "warn" {
                            eprintln!("[{level_tag}] {msg}");
                        } else {
                            println!("[{level_tag}] {msg}");
                        }
                    }
                    LogMode::Capture => logs.borrow_mut().push(LogEntry {
                        level: level_tag,
                        msg,
                    }),
                }
                Ok(Value::Undefined)
            }),
        );
    }
    scope.declare("console", Value::object(methods));
}

fn get_member(base: &Value, key: &str) -> Result<Value, EngineError> {
    match base {
        Value::Array(items) => {
            if key == "length" {
                return Ok(Value::Number(items.borrow().len() as f64));
            }
            if let Ok(idx) = key.parse::<usize>() {
                return Ok(items.borrow().get(idx).cloned().unwrap_or(Value::Undefined));
            }
            Ok(Value::Undefined)
        }
        Value::Str(s) => {
            if key == "length" {
                return Ok(Value::Number(s.chars().count() as f64));
            }
            if let Ok(idx) = key.parse::<usize>() {
                return Ok(s.chars().nth(idx).map(|c| Value::str(c.to_string())).unwrap_or(Value::Undefined));
            }
            Ok(Value::Undefined)
        }
        Value::Object(map) => Ok(map.borrow().get(key).cloned().unwrap_or(Value::Undefined)),
        Value::Null | Value::Undefined => Err(EngineError::RuleExecutionFailure(format!(
            "cannot read property '{key}' of {}",
            base.type_name()
        ))),
        _ => Ok(Value::Undefined),
    }
}

fn set_member(base: &Value, key: &str, value: Value) -> Result<(), EngineError> {
    match base {
        Value::Array(items) => {
            if let Ok(idx) = key.parse::<usize>() {
                let mut items = items.borrow_mut();
                if idx >= items.len() {
                    items.resize(idx + 1, Value::Undefined);
                }
                items[idx] = value;
                Ok(())
            } else {
                Err(EngineError::RuleExecutionFailure(format!(
                    "cannot set non-numeric property '{key}' on array"
                )))
            }
        }
        Value::Object(map) => {
            map.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }
        other => Err(EngineError::RuleExecutionFailure(format!(
            "cannot set property '{key}' on {}",
            other.type_name()
        ))),
    }
}

fn non_callback_method(base: &Value, name: &str, args: &[Value]) -> Result<Option<Value>, EngineError> {
    match base {
        Value::Str(s) => string_method(s, name, args),
        Value::Array(items) => array_method(items, name, args),
        _ => Ok(None),
    }
}

fn array_method(
    items: &Rc<RefCell<Vec<Value>>>,
    name: &str,
    args: &[Value],
) -> Result<Option<Value>, EngineError> {
    let snapshot = items.borrow().clone();
    Ok(match name {
        "includes" => {
            let needle = args.first().cloned().unwrap_or(Value::Undefined);
            Some(Value::Bool(snapshot.iter().any(|v| v.strict_eq(&needle))))
        }
        "indexOf" => {
            let needle = args.first().cloned().unwrap_or(Value::Undefined);
            let idx = snapshot.iter().position(|v| v.strict_eq(&needle));
            Some(Value::Number(idx.map(|i| i as f64).unwrap_or(-1.0)))
        }
        "join" => {
            let sep = args
                .first()
                .map(Value::to_display_string)
                .unwrap_or_else(|| ",".to_string());
            let parts: Vec<String> = snapshot.iter().map(Value::to_display_string).collect();
            Some(Value::str(parts.join(&sep)))
        }
        "slice" => {
            let len = snapshot.len() as i64;
            let start = args.first().map(to_number).unwrap_or(0.0) as i64;
            let end = args.get(1).map(to_number).unwrap_or(len as f64) as i64;
            let start = normalize_index(start, len);
            let end = normalize_index(end, len);
            if start < end {
                Some(Value::array(snapshot[start as usize..end as usize].to_vec()))
            } else {
                Some(Value::array(Vec::new()))
            }
        }
        "concat" => {
            let mut out = snapshot.clone();
            for a in args {
                if let Value::Array(other) = a {
                    out.extend(other.borrow().iter().cloned());
                } else {
                    out.push(a.clone());
                }
            }
            Some(Value::array(out))
        }
        "push" => {
            let mut items_mut = items.borrow_mut();
            for a in args {
                items_mut.push(a.clone());
            }
            Some(Value::Number(items_mut.len() as f64))
        }
        _ => None,
    })
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Result<Option<Value>, EngineError> {
    let arg0 = args.first().map(Value::to_display_string).unwrap_or_default();
    Ok(match name {
        "startsWith" => Some(Value::Bool(s.starts_with(&arg0))),
        "endsWith" => Some(Value::Bool(s.ends_with(&arg0))),
        "includes" => Some(Value::Bool(s.contains(&arg0))),
        "indexOf" => Some(Value::Number(
            s.find(&arg0).map(|b| s[..b].chars().count() as f64).unwrap_or(-1.0),
        )),
        "toLowerCase" => Some(Value::str(s.to_lowercase())),
        "toUpperCase" => Some(Value::str(s.to_uppercase())),
        "trim" => Some(Value::str(s.trim().to_string())),
        "split" => {
            let parts: Vec<Value> = if arg0.is_empty() {
                s.chars().map(|c| Value::str(c.to_string())).collect()
            } else {
                s.split(arg0.as_str()).map(Value::str).collect()
            };
            Some(Value::array(parts))
        }
        "slice" => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let start = args.first().map(to_number).unwrap_or(0.0) as i64;
            let end = args.get(1).map(to_number).unwrap_or(len as f64) as i64;
            let start = normalize_index(start, len);
            let end = normalize_index(end, len);
            if start < end {
                let slice: String = chars[start as usize..end as usize].iter().collect();
                Some(Value::str(slice))
            } else {
                Some(Value::str(""))
            }
        }
        _ => None,
    })
}

fn normalize_index(idx: i64, len: i64) -> i64 {
    let idx = if idx < 0 { (len + idx).max(0) } else { idx };
    idx.min(len)
}

/// JS-ish numeric coercion, deliberately not full ECMA-262: the guest
/// dialect's values all originate from JSON, so strings/numbers/booleans
/// are all this needs to cover.
fn to_number(v: &Value) -> f64 {
    match v {
        Value::Number(n) => *n,
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::Null => 0.0,
        Value::Str(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn eval_binary(op: BinOp, l: &Value, r: &Value) -> Result<Value, EngineError> {
    use BinOp::*;
    Ok(match op {
        Add => {
            if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) {
                Value::str(format!("{}{}", l.to_display_string(), r.to_display_string()))
            } else {
                Value::Number(to_number(l) + to_number(r))
            }
        }
        Sub => Value::Number(to_number(l) - to_number(r)),
        Mul => Value::Number(to_number(l) * to_number(r)),
        Div => Value::Number(to_number(l) / to_number(r)),
        Mod => Value::Number(to_number(l) % to_number(r)),
        Eq => Value::Bool(l.loose_eq(r)),
        NotEq => Value::Bool(!l.loose_eq(r)),
        StrictEq => Value::Bool(l.strict_eq(r)),
        StrictNotEq => Value::Bool(!l.strict_eq(r)),
        Lt | Lte | Gt | Gte => {
            let ordering = if let (Value::Str(a), Value::Str(b)) = (l, r) {
                a.as_ref().cmp(b.as_ref())
            } else {
                to_number(l)
                    .partial_cmp(&to_number(r))
                    .unwrap_or(std::cmp::Ordering::Greater)
            };
            let result = match op {
                Lt => ordering.is_lt(),
                Lte => ordering.is_le(),
                Gt => ordering.is_gt(),
                Gte => ordering.is_ge(),
                _ => unreachable!(),
            };
            Value::Bool(result)
        }
    })
}
