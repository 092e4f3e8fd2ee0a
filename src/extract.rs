//! Locates a named function in raw script text and compiles it into a [`Function`].
//!
//! Two declaration shapes are recognised: `function NAME(args){body}` and the assignment
//! form `;NAME = function(args){body}` (the assignment may also follow `{`). The body runs
//! up to the first `}`, so functions containing nested blocks are cut short.
use crate::context::Function;
use crate::value::escape_for_pattern;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Any function declaration in either recognised shape; used to list what a script offers.
static ANY_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:function (?P<decl>[A-Za-z_$][\w$]*)|[{;](?P<assign>[A-Za-z_$][\w$]*)\s*=\s*function)\([a-z,]+\)\{[^}]+\}",
    )
    .expect("function listing pattern must compile")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("could not find JS function `{name}`")]
    FunctionNotFound { name: String },
    #[error("JS function `{name}` has no statements")]
    EmptyBody { name: String },
    #[error("cannot build lookup pattern for `{name}`: {message}")]
    InvalidPattern { name: String, message: String },
}

fn declaration_pattern(name: &str) -> Result<Regex, ExtractError> {
    let escaped = escape_for_pattern(name);
    let pattern = format!(
        r"(?:function {escaped}|[{{;]{escaped}\s*=\s*function)\((?P<args>[a-z,]+)\)\{{(?P<code>[^}}]+)\}}"
    );
    Regex::new(&pattern).map_err(|err| ExtractError::InvalidPattern {
        name: name.to_string(),
        message: err.to_string(),
    })
}

/// Finds the first declaration of `name` in `code`.
pub fn extract_function(code: &str, name: &str) -> Result<Function, ExtractError> {
    let pattern = declaration_pattern(name)?;
    let captures = pattern
        .captures(code)
        .ok_or_else(|| ExtractError::FunctionNotFound {
            name: name.to_string(),
        })?;

    let params = split_params(&captures["args"]);
    let statements = split_statements(&captures["code"]);
    if statements.is_empty() {
        return Err(ExtractError::EmptyBody {
            name: name.to_string(),
        });
    }

    Ok(Function::new(name.to_string(), params, statements))
}

fn split_params(args: &str) -> Vec<String> {
    args.split(',')
        .filter(|param| !param.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits a body on `;`, dropping empty fragments.
pub fn split_statements(body: &str) -> Vec<String> {
    body.split(';')
        .filter(|stmt| !stmt.is_empty())
        .map(str::to_string)
        .collect()
}

/// Names of every function declared in `code`, in order of appearance.
pub fn function_names(code: &str) -> Vec<String> {
    ANY_FUNCTION
        .captures_iter(code)
        .filter_map(|caps| caps.name("decl").or_else(|| caps.name("assign")))
        .map(|name| name.as_str().to_string())
        .collect()
}
