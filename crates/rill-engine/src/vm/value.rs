//! Runtime values

use super::callable::Proc;
use super::object::{ClassId, Exception, Object};
use std::fmt;
use std::rc::Rc;

/// A Rill value.
///
/// Immediates (`nil`, booleans, numbers) are stored inline; everything else
/// is reference counted and recorded in the VM's allocation arena when it
/// is created during execution.
#[derive(Clone, Default)]
pub enum Value {
    /// `nil`
    #[default]
    Nil,
    /// `true` / `false`
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Immutable string
    Str(Rc<str>),
    /// Plain object
    Object(Rc<Object>),
    /// Exception instance
    Exception(Rc<Exception>),
    /// Callable unit
    Proc(Rc<Proc>),
}

impl Value {
    /// Only `nil` and `false` are falsy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Whether the value lives on the heap
    pub fn is_heap(&self) -> bool {
        matches!(
            self,
            Value::Str(_) | Value::Object(_) | Value::Exception(_) | Value::Proc(_)
        )
    }

    /// Class of the value
    pub fn class_id(&self) -> ClassId {
        match self {
            Value::Nil => ClassId::NIL,
            Value::Bool(true) => ClassId::TRUE,
            Value::Bool(false) => ClassId::FALSE,
            Value::Int(_) => ClassId::INTEGER,
            Value::Float(_) => ClassId::FLOAT,
            Value::Str(_) => ClassId::STRING,
            Value::Object(obj) => obj.class,
            Value::Exception(exc) => exc.class,
            Value::Proc(_) => ClassId::PROC,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_exception(&self) -> Option<&Rc<Exception>> {
        match self {
            Value::Exception(exc) => Some(exc),
            _ => None,
        }
    }

    /// Debug-style rendering used in error messages
    pub fn inspect(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Str(s) => format!("{:?}", &**s),
            Value::Object(obj) => format!("#<{}>", obj.class_name),
            Value::Exception(exc) => format!("#<{}: {}>", exc.class_name, exc.message),
            Value::Proc(_) => "#<Proc>".to_string(),
            other => other.to_string(),
        }
    }
}

/// String conversion, as done by `puts` and `str`
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Value::Float(x) if x.is_nan() => write!(f, "NaN"),
            Value::Float(x) if x.is_infinite() => {
                write!(f, "{}", if *x > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Object(obj) => write!(f, "#<{}>", obj.class_name),
            Value::Exception(exc) => f.write_str(&exc.message),
            Value::Proc(_) => f.write_str("#<Proc>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}

/// Value equality as seen by `==`: numbers compare across Integer/Float,
/// strings by content, heap objects by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            (Value::Proc(a), Value::Proc(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}
