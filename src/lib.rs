//! Interpreter for the small subset of JavaScript used by self-contained string and
//! array shuffling routines: extract one named function from a larger script, then
//! evaluate it against host-supplied arguments.
pub mod ast;
pub mod context;
pub mod executor;
pub mod extract;
pub mod parser;
pub mod value;

use thiserror::Error;

pub use context::{Callable, Limits, SourceContext, DEFAULT_RECURSION_BUDGET};
pub use value::Value;

#[derive(Debug, Error)]
pub enum JsError {
    #[error(transparent)]
    Extraction(#[from] extract::ExtractError),
    #[error(transparent)]
    Syntax(#[from] parser::ParseError),
    #[error(transparent)]
    Value(#[from] value::ValueError),
    #[error("recursion limit reached")]
    RecursionLimit,
    #[error("script text already released, cannot extract `{name}`")]
    ContextReleased { name: String },
    #[error("undefined variable `{name}`")]
    UnboundVariable { name: String },
    #[error("function `{function}` called without a value for `{param}`")]
    MissingArgument { function: String, param: String },
}

/// Entry point for host code: extracts `name` from a script once and evaluates it.
///
/// The script text is released after the first evaluation. Functions reached during that
/// evaluation stay cached, so later calls succeed only if they need nothing new.
pub struct JsFunction {
    context: SourceContext,
    entry: Callable,
}

impl JsFunction {
    pub fn new(code: impl Into<String>, name: &str) -> Result<Self, JsError> {
        Self::with_limits(code, name, Limits::default())
    }

    pub fn with_limits(code: impl Into<String>, name: &str, limits: Limits) -> Result<Self, JsError> {
        let context = SourceContext::with_limits(code, limits);
        let entry = context.get_or_extract(name)?;
        Ok(Self { context, entry })
    }

    /// Evaluates the entry function with positional arguments. Array arguments are copied
    /// first so the caller's arrays are never mutated.
    pub fn eval(&self, args: Vec<Value>) -> Result<Value, JsError> {
        let args: Vec<Value> = args
            .into_iter()
            .map(|arg| match arg {
                Value::Array(values) => Value::Array(value::copy_of(&values)),
                other => other,
            })
            .collect();
        let result = self.entry.call(&args);
        self.context.release();
        result
    }

    pub fn eval_one(&self, arg: impl Into<Value>) -> Result<Value, JsError> {
        self.eval(vec![arg.into()])
    }

    pub fn entry(&self) -> &Callable {
        &self.entry
    }

    pub fn context(&self) -> &SourceContext {
        &self.context
    }
}
