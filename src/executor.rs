use crate::ast::{Argument, Expr, Member, Statement};
use crate::context::{Callable, Function, SourceContext};
use crate::extract::ExtractError;
use crate::parser::{parse_expression, parse_statement};
use crate::value::{self, Value};
use crate::JsError;
use indexmap::IndexMap;
use tracing::trace;

/// Flat variable frame for one function invocation.
pub type Environment = IndexMap<String, Value>;

/// Statement and expression interpreter for functions extracted from one context.
pub struct Executor<'c> {
    context: &'c SourceContext,
}

impl<'c> Executor<'c> {
    pub fn new(context: &'c SourceContext) -> Self {
        Self { context }
    }

    /// Runs every statement of `function` in a fresh frame seeded with `args`. The value
    /// of the last statement is the result; `return` does not stop execution early.
    pub fn invoke(&self, function: &Function, args: &[Value]) -> Result<Value, JsError> {
        let mut env = Environment::with_capacity(function.params().len());
        for (position, param) in function.params().iter().enumerate() {
            let arg = args
                .get(position)
                .cloned()
                .ok_or_else(|| JsError::MissingArgument {
                    function: function.name().to_string(),
                    param: param.clone(),
                })?;
            env.insert(param.clone(), arg);
        }

        let budget = self.context.limits().recursion_budget;
        let mut result = None;
        for stmt in function.statements() {
            trace!(function = function.name(), stmt = stmt.as_str(), "executing statement");
            result = Some(self.exec_statement(stmt, &mut env, budget)?);
        }
        result.ok_or_else(|| {
            ExtractError::EmptyBody {
                name: function.name().to_string(),
            }
            .into()
        })
    }

    /// Executes one statement and returns its value.
    pub fn exec_statement(
        &self,
        text: &str,
        env: &mut Environment,
        budget: i32,
    ) -> Result<Value, JsError> {
        match parse_statement(text)? {
            Statement::Assign { target, value } => {
                let value = self.eval_expr(value, env, budget)?;
                env.insert(target.to_string(), value.clone());
                Ok(value)
            }
            Statement::AssignIndex {
                target,
                index,
                value,
            } => {
                let index = self.eval_expr(index, env, budget)?.as_integer()?;
                let value = self.eval_expr(value, env, budget)?;
                let array = lookup(env, target)?.as_array()?;
                value::set_index(array, index, value.clone())?;
                Ok(value)
            }
            Statement::Return(expr) => self.eval_expr(expr, env, budget),
        }
    }

    /// Evaluates one expression. Indexing and `slice` arguments are evaluated with one
    /// less unit of budget; evaluation fails once the budget drops below zero.
    pub fn eval_expr(&self, text: &str, env: &Environment, budget: i32) -> Result<Value, JsError> {
        if budget < 0 {
            return Err(JsError::RecursionLimit);
        }

        match parse_expression(text)? {
            Expr::Integer(value) => Ok(Value::Integer(value)),
            Expr::Variable(name) => lookup(env, name).cloned(),
            Expr::Member { receiver, member } => {
                let receiver = lookup(env, receiver)?;
                self.eval_member(receiver, member, env, budget)
            }
            Expr::Index { receiver, index } => {
                let array = lookup(env, receiver)?.as_array()?;
                let index = self.eval_expr(index, env, budget - 1)?.as_integer()?;
                Ok(value::get_index(array, index)?)
            }
            Expr::Remainder { left, right } => {
                let left = self.eval_expr(left, env, budget)?.as_integer()?;
                let right = self.eval_expr(right, env, budget)?.as_integer()?;
                Ok(Value::Integer(value::remainder(left, right)?))
            }
            Expr::Call { name, args } => self.eval_call(name, &args, env),
        }
    }

    fn eval_member(
        &self,
        receiver: &Value,
        member: Member<'_>,
        env: &Environment,
        budget: i32,
    ) -> Result<Value, JsError> {
        let result = match member {
            Member::Split => value::split_chars(receiver.as_text()?),
            Member::Join => value::join(receiver.as_array()?)?,
            Member::Length => Value::Integer(value::length(receiver)? as i64),
            Member::Reverse => value::reverse(receiver)?,
            Member::Slice(index) => {
                let start = self.eval_expr(index, env, budget - 1)?.as_integer()?;
                value::slice(receiver, start)?
            }
        };
        Ok(result)
    }

    /// Resolves the callee through the context cache. The callee's statements start from
    /// the full budget again, whatever this expression had left.
    fn eval_call(
        &self,
        name: &str,
        args: &[Argument<'_>],
        env: &Environment,
    ) -> Result<Value, JsError> {
        let callee: Callable = self.context.get_or_extract(name)?;
        let args = args
            .iter()
            .map(|arg| match arg {
                Argument::Integer(value) => Ok(Value::Integer(*value)),
                Argument::Variable(name) => lookup(env, name).cloned(),
            })
            .collect::<Result<Vec<_>, JsError>>()?;
        trace!(function = name, args = args.len(), "calling function");
        self.invoke(callee.function(), &args)
    }
}

fn lookup<'e>(env: &'e Environment, name: &str) -> Result<&'e Value, JsError> {
    env.get(name).ok_or_else(|| JsError::UnboundVariable {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Limits;
    use crate::parser::ParseError;
    use crate::value::ValueError;

    fn context() -> SourceContext {
        SourceContext::new("")
    }

    fn env(bindings: &[(&str, Value)]) -> Environment {
        bindings
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn ints(values: &[i64]) -> Value {
        Value::array(values.iter().copied().map(Value::integer).collect())
    }

    /// `a[a[...a[0]...]]` with `depth` index operations.
    fn nested_index(depth: usize) -> String {
        let mut expr = String::from("0");
        for _ in 0..depth {
            expr = format!("a[{expr}]");
        }
        expr
    }

    #[test]
    fn assignment_binds_and_overwrites() {
        let ctx = context();
        let exec = Executor::new(&ctx);
        let mut frame = env(&[("a", Value::integer(1))]);
        assert_eq!(exec.exec_statement("b=a", &mut frame, 20).unwrap(), Value::integer(1));
        assert_eq!(exec.exec_statement("var b=7", &mut frame, 20).unwrap(), Value::integer(7));
        assert_eq!(frame.get("b"), Some(&Value::integer(7)));
    }

    #[test]
    fn indexed_assignment_mutates_bound_array() {
        let ctx = context();
        let exec = Executor::new(&ctx);
        let shared = ints(&[1, 2, 3]);
        let mut frame = env(&[("a", shared.clone()), ("v", Value::integer(9))]);

        assert_eq!(exec.exec_statement("a[1]=v", &mut frame, 20).unwrap(), Value::integer(9));
        assert_eq!(exec.exec_statement("return a", &mut frame, 20).unwrap(), ints(&[1, 9, 3]));
        assert_eq!(shared, ints(&[1, 9, 3]));
    }

    #[test]
    fn indexed_assignment_outside_array_fails() {
        let ctx = context();
        let exec = Executor::new(&ctx);
        let mut frame = env(&[("a", ints(&[1]))]);
        let err = exec.exec_statement("a[1]=5", &mut frame, 20).unwrap_err();
        assert!(matches!(
            err,
            JsError::Value(ValueError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert_eq!(frame["a"], ints(&[1]));
    }

    #[test]
    fn indexed_assignment_to_text_is_a_type_error() {
        let ctx = context();
        let exec = Executor::new(&ctx);
        let mut frame = env(&[("a", Value::text("ab"))]);
        assert!(matches!(
            exec.exec_statement("a[0]=1", &mut frame, 20),
            Err(JsError::Value(ValueError::TypeMismatch { .. }))
        ));
    }

    #[test]
    fn unknown_statement_is_a_syntax_error() {
        let ctx = context();
        let exec = Executor::new(&ctx);
        let err = exec.exec_statement("while(1)", &mut Environment::new(), 20).unwrap_err();
        assert!(matches!(err, JsError::Syntax(ParseError::UnknownStatement { .. })));
    }

    #[test]
    fn member_operations() {
        let ctx = context();
        let exec = Executor::new(&ctx);
        let frame = env(&[
            ("s", Value::text("abcde")),
            ("c", Value::array(vec![Value::text("x"), Value::text("y")])),
            ("n", Value::integer(2)),
        ]);
        let eval = |text| exec.eval_expr(text, &frame, 20).unwrap();

        assert_eq!(eval("s.length"), Value::integer(5));
        assert_eq!(eval("s.reverse()"), Value::text("edcba"));
        assert_eq!(eval("s.slice(n)"), Value::text("cde"));
        assert_eq!(eval("c.join(\"\")"), Value::text("xy"));
        assert_eq!(
            eval("s.split(\"\")"),
            Value::array("abcde".chars().map(|ch| Value::text(ch.to_string())).collect())
        );
        assert_eq!(eval("c.length%n"), Value::integer(0));
    }

    #[test]
    fn length_of_integer_is_a_type_error() {
        let ctx = context();
        let exec = Executor::new(&ctx);
        let frame = env(&[("n", Value::integer(2))]);
        assert!(matches!(
            exec.eval_expr("n.length", &frame, 20),
            Err(JsError::Value(ValueError::TypeMismatch { found: "integer", .. }))
        ));
    }

    #[test]
    fn remainder_uses_truncating_sign() {
        let ctx = context();
        let exec = Executor::new(&ctx);
        let frame = env(&[("a", Value::integer(-7)), ("b", Value::integer(3))]);
        assert_eq!(exec.eval_expr("a%b", &frame, 20).unwrap(), Value::integer(-1));
        assert_eq!(exec.eval_expr("b%a", &frame, 20).unwrap(), Value::integer(3));
    }

    #[test]
    fn missing_binding_is_reported() {
        let ctx = context();
        let exec = Executor::new(&ctx);
        let err = exec.eval_expr("zz", &Environment::new(), 20).unwrap_err();
        assert!(matches!(err, JsError::UnboundVariable { ref name } if name == "zz"));
    }

    #[test]
    fn indexing_a_non_array_is_a_type_error() {
        let ctx = context();
        let exec = Executor::new(&ctx);
        let frame = env(&[("a", Value::integer(4))]);
        assert!(matches!(
            exec.eval_expr("a[0]", &frame, 20),
            Err(JsError::Value(ValueError::TypeMismatch { .. }))
        ));
    }

    #[test]
    fn nesting_within_budget_succeeds() {
        let ctx = context();
        let exec = Executor::new(&ctx);
        let frame = env(&[("a", ints(&[0, 0]))]);
        assert_eq!(exec.eval_expr(&nested_index(20), &frame, 20).unwrap(), Value::integer(0));
    }

    #[test]
    fn nesting_past_budget_fails() {
        let ctx = context();
        let exec = Executor::new(&ctx);
        let frame = env(&[("a", ints(&[0, 0]))]);
        assert!(matches!(
            exec.eval_expr(&nested_index(21), &frame, 20),
            Err(JsError::RecursionLimit)
        ));
    }

    #[test]
    fn slice_argument_consumes_budget() {
        let ctx = context();
        let exec = Executor::new(&ctx);
        let frame = env(&[("a", ints(&[0, 0])), ("s", Value::text("abc"))]);
        let within = format!("s.slice({})", nested_index(1));
        let past = format!("s.slice({})", nested_index(2));
        assert_eq!(exec.eval_expr(&within, &frame, 2).unwrap(), Value::text("abc"));
        assert!(matches!(
            exec.eval_expr(&past, &frame, 2),
            Err(JsError::RecursionLimit)
        ));
    }

    #[test]
    fn callee_starts_from_a_fresh_budget() {
        let script = "function inner(a){return a[a[0]]};function outer(a){return a[a[inner(a)]]}";
        let ctx = SourceContext::with_limits(script, Limits::default().with_recursion_budget(2));
        let outer = ctx.get_or_extract("outer").unwrap();
        assert_eq!(outer.call(&[ints(&[0, 0])]).unwrap(), Value::integer(0));
        assert_eq!(ctx.extraction_count(), 2);
    }

    #[test]
    fn call_arguments_bind_positionally() {
        let script = "function pick(a,b){return a[b]}";
        let ctx = SourceContext::new(script);
        let exec = Executor::new(&ctx);
        let frame = env(&[("x", ints(&[4, 5, 6]))]);
        assert_eq!(exec.eval_expr("pick(x,2)", &frame, 20).unwrap(), Value::integer(6));
        assert_eq!(exec.eval_expr("pick(x,0)", &frame, 20).unwrap(), Value::integer(4));
        assert_eq!(ctx.extraction_count(), 1);
    }

    #[test]
    fn too_few_arguments_is_an_error() {
        let ctx = SourceContext::new("function pick(a,b){return a}");
        let pick = ctx.get_or_extract("pick").unwrap();
        assert!(matches!(
            pick.call(&[Value::integer(1)]),
            Err(JsError::MissingArgument { ref param, .. }) if param == "b"
        ));
        assert_eq!(pick.call(&[Value::integer(1), Value::integer(2), Value::integer(3)]).unwrap(), Value::integer(1));
    }

    #[test]
    fn every_statement_runs_after_return() {
        let ctx = SourceContext::new("function go(a){return a;a[0]=5}");
        let go = ctx.get_or_extract("go").unwrap();
        let input = ints(&[1]);
        assert_eq!(go.call(&[input.clone()]).unwrap(), Value::integer(5));
        assert_eq!(input, ints(&[5]));
    }
}
