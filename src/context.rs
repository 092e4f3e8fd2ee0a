use crate::executor::Executor;
use crate::extract;
use crate::value::Value;
use crate::JsError;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Nested-expression quota every statement starts from.
pub const DEFAULT_RECURSION_BUDGET: i32 = 20;

/// Evaluation limits carried by a [`SourceContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Budget each statement starts with. Indexing and `slice` arguments consume one unit;
    /// calling another function does not, the callee starts again from this value.
    pub recursion_budget: i32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            recursion_budget: DEFAULT_RECURSION_BUDGET,
        }
    }
}

impl Limits {
    pub fn with_recursion_budget(mut self, budget: i32) -> Self {
        self.recursion_budget = budget;
        self
    }
}

/// Compiled function: parameter names and the raw text of each statement.
#[derive(Debug, PartialEq, Eq)]
pub struct Function {
    name: String,
    params: Vec<String>,
    statements: Vec<String>,
}

impl Function {
    pub(crate) fn new(name: String, params: Vec<String>, statements: Vec<String>) -> Self {
        Self {
            name,
            params,
            statements,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

struct ContextInner {
    code: RefCell<Option<String>>,
    functions: RefCell<HashMap<String, Rc<Function>>>,
    extractions: Cell<usize>,
    limits: Limits,
}

/// Owns the script text and the cache of functions already extracted from it.
///
/// Handles are cheap to clone and all refer to the same cache. The cache only holds
/// [`Function`]s, never [`Callable`]s, so there is no reference cycle back to the context.
#[derive(Clone)]
pub struct SourceContext {
    inner: Rc<ContextInner>,
}

impl SourceContext {
    pub fn new(code: impl Into<String>) -> Self {
        Self::with_limits(code, Limits::default())
    }

    pub fn with_limits(code: impl Into<String>, limits: Limits) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                code: RefCell::new(Some(code.into())),
                functions: RefCell::new(HashMap::new()),
                extractions: Cell::new(0),
                limits,
            }),
        }
    }

    pub fn limits(&self) -> Limits {
        self.inner.limits
    }

    /// Returns the cached function or extracts it from the script text on first use.
    pub fn get_or_extract(&self, name: &str) -> Result<Callable, JsError> {
        if let Some(function) = self.inner.functions.borrow().get(name) {
            return Ok(self.bind(Rc::clone(function)));
        }

        let function = {
            let code = self.inner.code.borrow();
            let code = code.as_deref().ok_or_else(|| JsError::ContextReleased {
                name: name.to_string(),
            })?;
            self.inner.extractions.set(self.inner.extractions.get() + 1);
            Rc::new(extract::extract_function(code, name)?)
        };
        debug!(
            function = name,
            params = function.params().len(),
            statements = function.statements().len(),
            "extracted function"
        );

        self.inner
            .functions
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&function));
        Ok(self.bind(function))
    }

    /// Drops the script text. Functions already extracted stay callable.
    pub fn release(&self) {
        if self.inner.code.borrow_mut().take().is_some() {
            debug!(cached = self.cached_functions(), "released script text");
        }
    }

    pub fn is_released(&self) -> bool {
        self.inner.code.borrow().is_none()
    }

    /// Number of times the extractor has run against the script text.
    pub fn extraction_count(&self) -> usize {
        self.inner.extractions.get()
    }

    pub fn cached_functions(&self) -> usize {
        self.inner.functions.borrow().len()
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.inner.functions.borrow().contains_key(name)
    }

    fn bind(&self, function: Rc<Function>) -> Callable {
        Callable {
            function,
            context: self.clone(),
        }
    }
}

impl fmt::Debug for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceContext")
            .field("released", &self.is_released())
            .field("cached_functions", &self.cached_functions())
            .field("limits", &self.inner.limits)
            .finish()
    }
}

/// A compiled function bound to the context it was extracted from, so callees it
/// names resolve against the same script and cache.
#[derive(Clone)]
pub struct Callable {
    function: Rc<Function>,
    context: SourceContext,
}

impl Callable {
    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn name(&self) -> &str {
        self.function.name()
    }

    pub fn context(&self) -> &SourceContext {
        &self.context
    }

    /// Invokes the function with positional arguments.
    pub fn call(&self, args: &[Value]) -> Result<Value, JsError> {
        Executor::new(&self.context).invoke(&self.function, args)
    }

    /// True when both handles share the same compiled function.
    pub fn same_function(&self, other: &Callable) -> bool {
        Rc::ptr_eq(&self.function, &other.function)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.same_function(other)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callable").field(&self.function).finish()
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "function {}({})",
            self.function.name,
            self.function.params.join(",")
        )
    }
}
