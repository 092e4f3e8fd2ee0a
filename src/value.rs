use crate::context::Callable;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Shared, mutable array storage. Cloning the handle aliases the same elements, which is
/// what lets `a[i]=v` mutate the array a variable is bound to.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Runtime value produced and consumed by the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Text(String),
    Array(ArrayRef),
    Callable(Callable),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("type error: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("integer remainder by zero")]
    DivisionByZero,
    #[error("cannot store an array inside itself")]
    CyclicArray,
}

impl Value {
    pub fn integer(value: i64) -> Self {
        Value::Integer(value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// Wraps elements in a fresh array with its own storage.
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(values)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Callable(_) => "function",
        }
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    pub fn as_integer(&self) -> Result<i64, ValueError> {
        match self {
            Value::Integer(value) => Ok(*value),
            other => Err(other.mismatch("integer")),
        }
    }

    pub fn as_text(&self) -> Result<&str, ValueError> {
        match self {
            Value::Text(text) => Ok(text),
            other => Err(other.mismatch("text")),
        }
    }

    pub fn into_text(self) -> Result<String, ValueError> {
        match self {
            Value::Text(text) => Ok(text),
            other => Err(other.mismatch("text")),
        }
    }

    pub fn as_array(&self) -> Result<&ArrayRef, ValueError> {
        match self {
            Value::Array(values) => Ok(values),
            other => Err(other.mismatch("array")),
        }
    }

    pub fn as_callable(&self) -> Result<&Callable, ValueError> {
        match self {
            Value::Callable(callable) => Ok(callable),
            other => Err(other.mismatch("function")),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::text(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::array(values)
    }
}

impl From<Callable> for Value {
    fn from(callable: Callable) -> Self {
        Value::Callable(callable)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{value}"),
            Value::Text(text) => f.write_str(text),
            Value::Array(values) => {
                f.write_str("[")?;
                for (i, value) in values.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Value::Callable(callable) => write!(f, "{callable}"),
        }
    }
}

/// Character count of text or element count of an array.
pub fn length(value: &Value) -> Result<usize, ValueError> {
    match value {
        Value::Text(text) => Ok(text.chars().count()),
        Value::Array(values) => Ok(values.borrow().len()),
        other => Err(other.mismatch("text or array")),
    }
}

/// New value of the same kind with the characters or elements in reverse order.
pub fn reverse(value: &Value) -> Result<Value, ValueError> {
    match value {
        Value::Text(text) => Ok(Value::Text(text.chars().rev().collect())),
        Value::Array(values) => Ok(Value::array(
            values.borrow().iter().rev().cloned().collect(),
        )),
        other => Err(other.mismatch("text or array")),
    }
}

/// Suffix starting at `start`. `start == len` yields an empty value; anything outside
/// `0..=len` is rejected rather than clamped.
pub fn slice(value: &Value, start: i64) -> Result<Value, ValueError> {
    let len = length(value)?;
    let offset = usize::try_from(start)
        .ok()
        .filter(|offset| *offset <= len)
        .ok_or(ValueError::IndexOutOfRange { index: start, len })?;
    match value {
        Value::Text(text) => Ok(Value::Text(text.chars().skip(offset).collect())),
        Value::Array(values) => Ok(Value::array(values.borrow()[offset..].to_vec())),
        other => Err(other.mismatch("text or array")),
    }
}

/// Concatenates an array of text elements with no separator.
pub fn join(values: &ArrayRef) -> Result<Value, ValueError> {
    let mut joined = String::new();
    for value in values.borrow().iter() {
        joined.push_str(value.as_text()?);
    }
    Ok(Value::Text(joined))
}

/// One single-character text element per character of `text`.
pub fn split_chars(text: &str) -> Value {
    Value::array(text.chars().map(|ch| Value::Text(ch.to_string())).collect())
}

/// Escapes every regex metacharacter so `text` matches itself literally.
pub fn escape_for_pattern(text: &str) -> String {
    regex::escape(text)
}

/// Fresh storage holding the same elements in the same order.
pub fn copy_of(values: &ArrayRef) -> ArrayRef {
    Rc::new(RefCell::new(values.borrow().clone()))
}

/// Element at `index`, bounds-checked.
pub fn get_index(values: &ArrayRef, index: i64) -> Result<Value, ValueError> {
    let values = values.borrow();
    let len = values.len();
    usize::try_from(index)
        .ok()
        .and_then(|offset| values.get(offset).cloned())
        .ok_or(ValueError::IndexOutOfRange { index, len })
}

/// True when `target` is `value` itself or any array nested inside it.
fn reaches(value: &Value, target: &ArrayRef) -> bool {
    let Value::Array(root) = value else {
        return false;
    };
    let mut seen = HashSet::new();
    let mut pending = vec![Rc::clone(root)];
    while let Some(array) = pending.pop() {
        if Rc::ptr_eq(&array, target) {
            return true;
        }
        if !seen.insert(Rc::as_ptr(&array)) {
            continue;
        }
        for element in array.borrow().iter() {
            if let Value::Array(inner) = element {
                pending.push(Rc::clone(inner));
            }
        }
    }
    false
}

/// Overwrites the element at `index` in place. The array length never changes, and an
/// array may not end up containing itself.
pub fn set_index(values: &ArrayRef, index: i64, value: Value) -> Result<(), ValueError> {
    if reaches(&value, values) {
        return Err(ValueError::CyclicArray);
    }
    let mut values = values.borrow_mut();
    let len = values.len();
    let slot = usize::try_from(index)
        .ok()
        .and_then(|offset| values.get_mut(offset))
        .ok_or(ValueError::IndexOutOfRange { index, len })?;
    *slot = value;
    Ok(())
}

/// Remainder with the sign of the dividend, as Rust's `%` on integers.
pub fn remainder(dividend: i64, divisor: i64) -> Result<i64, ValueError> {
    if divisor == 0 {
        return Err(ValueError::DivisionByZero);
    }
    // i64::MIN % -1 overflows; the mathematical result is 0.
    Ok(dividend.wrapping_rem(divisor))
}
