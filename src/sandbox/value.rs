//! Runtime values and lexical scopes for the guest dialect.

use super::ast::Block;
use crate::error::EngineError;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<IndexMap<String, Value>>>),
    Function(Rc<GuestFunction>),
    /// A host-provided function (`getInput`, `setOutput`, `console.*`).
    /// Never produced by guest source; only bound into the global scope
    /// before a program runs.
    Native(Rc<NativeFn>),
}

pub struct NativeFn {
    pub name: &'static str,
    pub func: Box<dyn Fn(Vec<Value>) -> Result<Value, EngineError>>,
}

pub struct GuestFunction {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Block,
    pub closure: Scope,
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(Rc::from(s.into()))
    }

    pub fn array(v: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(v)))
    }

    pub fn object(m: IndexMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(m)))
    }

    pub fn native(name: &'static str, func: impl Fn(Vec<Value>) -> Result<Value, EngineError> + 'static) -> Self {
        Value::Native(Rc::new(NativeFn {
            name,
            func: Box::new(func),
        }))
    }

    /// JS-style truthiness: `false`, `0`, `NaN`, `""`, `null`, `undefined`
    /// are falsy; everything else (including empty arrays/objects) is
    /// truthy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Native(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "object",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Native(_) => "function",
        }
    }

    /// `String(value)` / template-style coercion, used by `console.*` to
    /// space-join its arguments.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(a) => {
                let items: Vec<String> = a.borrow().iter().map(Value::to_display_string).collect();
                format!("[{}]", items.join(","))
            }
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(f) => format!("[function {}]", f.name.as_deref().unwrap_or("anonymous")),
            Value::Native(f) => format!("[native function {}]", f.name),
        }
    }

    pub fn loose_eq(&self, other: &Value) -> bool {
        // The guest dialect's rule scripts only ever compare like-typed
        // values in practice (strings/numbers/booleans from JSON data), so
        // `==` is implemented as same-type strict equality plus the
        // null/undefined equivalence, rather than full JS coercion rules.
        match (self, other) {
            (Value::Null, Value::Undefined) | (Value::Undefined, Value::Null) => true,
            _ => self.strict_eq(other),
        }
    }

    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

/// A lexical scope: a mutable variable map with a link to its parent.
/// Closures capture a `Scope` clone (an `Rc`), which is how
/// [`GuestFunction`] values keep their defining environment alive.
#[derive(Clone)]
pub struct Scope(Rc<RefCell<ScopeInner>>);

struct ScopeInner {
    vars: HashMap<String, Value>,
    parent: Option<Scope>,
}

impl Scope {
    pub fn root() -> Self {
        Scope(Rc::new(RefCell::new(ScopeInner {
            vars: HashMap::new(),
            parent: None,
        })))
    }

    pub fn child(parent: &Scope) -> Self {
        Scope(Rc::new(RefCell::new(ScopeInner {
            vars: HashMap::new(),
            parent: Some(parent.clone()),
        })))
    }

    pub fn declare(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.0.borrow().vars.get(name) {
            return Some(v.clone());
        }
        let parent = self.0.borrow().parent.clone();
        parent.and_then(|p| p.get(name))
    }

    /// Assign to an existing binding anywhere in the scope chain. Returns
    /// `false` if no such binding exists (the caller treats that as a
    /// `ReferenceError`-shaped failure, matching spec §4.F).
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if self.0.borrow().vars.contains_key(name) {
            self.0.borrow_mut().vars.insert(name.to_string(), value);
            return true;
        }
        let parent = self.0.borrow().parent.clone();
        match parent {
            Some(p) => p.assign(name, value),
            None => false,
        }
    }

    pub fn has(&self, name: &str) -> bool {
        if self.0.borrow().vars.contains_key(name) {
            return true;
        }
        let parent = self.0.borrow().parent.clone();
        parent.map(|p| p.has(name)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_js_semantics() {
        assert!(!Value::Number(0.0).truthy());
        assert!(!Value::Number(f64::NAN).truthy());
        assert!(!Value::str("").truthy());
        assert!(Value::str("0").truthy());
        assert!(Value::array(vec![]).truthy());
    }

    #[test]
    fn scope_chain_resolves_through_parents() {
        let root = Scope::root();
        root.declare("x", Value::Number(1.0));
        let child = Scope::child(&root);
        assert!(matches!(child.get("x"), Some(Value::Number(n)) if n == 1.0));
        assert!(child.assign("x", Value::Number(2.0)));
        assert!(matches!(root.get("x"), Some(Value::Number(n)) if n == 2.0));
        assert!(!child.assign("never_declared", Value::Null));
    }
}
