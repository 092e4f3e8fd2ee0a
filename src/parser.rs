use crate::ast::{Argument, Expr, Member, Statement};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("grammar pattern must compile")
}

static ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| pattern(r"^(?P<out>[a-z]+)(?:\[(?P<index>.+?)\])?=(?P<expr>.*)$"));
static MEMBER: Lazy<Regex> = Lazy::new(|| pattern(r"^(?P<in>[a-z]+)\.(?P<member>.*)$"));
static SLICE: Lazy<Regex> = Lazy::new(|| pattern(r"^slice\((?P<idx>.*)\)$"));
static INDEX: Lazy<Regex> = Lazy::new(|| pattern(r"^(?P<in>[a-z]+)\[(?P<idx>.+)\]$"));
static REMAINDER: Lazy<Regex> = Lazy::new(|| pattern(r"^(?P<a>.+?)%(?P<b>.+?)$"));
static CALL: Lazy<Regex> =
    Lazy::new(|| pattern(r"^(?P<func>[a-zA-Z]+)\((?P<args>[a-z0-9,]+)\)$"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("cannot determine left side of statement `{text}`")]
    UnknownStatement { text: String },
    #[error("unsupported JS expression `{text}`")]
    UnsupportedExpression { text: String },
    #[error("integer literal `{text}` is out of range")]
    IntegerOutOfRange { text: String },
    #[error("empty argument in call `{text}`")]
    EmptyArgument { text: String },
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn is_alpha(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_alphabetic())
}

fn parse_integer(text: &str) -> Result<i64, ParseError> {
    text.parse().map_err(|_| ParseError::IntegerOutOfRange {
        text: text.to_string(),
    })
}

/// Recognises an assignment (plain or indexed) or a `return`. A leading `var ` is ignored.
pub fn parse_statement(text: &str) -> Result<Statement<'_>, ParseError> {
    let stmt = text.strip_prefix("var ").unwrap_or(text);

    if let Some(caps) = ASSIGNMENT.captures(stmt) {
        let (Some(target), Some(value)) = (caps.name("out"), caps.name("expr")) else {
            return Err(ParseError::UnknownStatement {
                text: text.to_string(),
            });
        };
        return Ok(match caps.name("index") {
            Some(index) => Statement::AssignIndex {
                target: target.as_str(),
                index: index.as_str(),
                value: value.as_str(),
            },
            None => Statement::Assign {
                target: target.as_str(),
                value: value.as_str(),
            },
        });
    }

    if let Some(expr) = stmt.strip_prefix("return ") {
        return Ok(Statement::Return(expr));
    }

    Err(ParseError::UnknownStatement {
        text: text.to_string(),
    })
}

/// Tries each expression shape in priority order; the first match wins.
pub fn parse_expression(text: &str) -> Result<Expr<'_>, ParseError> {
    if is_digits(text) {
        return parse_integer(text).map(Expr::Integer);
    }

    if is_alpha(text) {
        return Ok(Expr::Variable(text));
    }

    // An unrecognised member falls through, so `a.length%b` still parses as a remainder.
    if let Some(caps) = MEMBER.captures(text) {
        if let (Some(receiver), Some(member)) = (caps.name("in"), caps.name("member")) {
            if let Some(member) = parse_member(member.as_str()) {
                return Ok(Expr::Member {
                    receiver: receiver.as_str(),
                    member,
                });
            }
        }
    }

    if let Some(caps) = INDEX.captures(text) {
        if let (Some(receiver), Some(index)) = (caps.name("in"), caps.name("idx")) {
            return Ok(Expr::Index {
                receiver: receiver.as_str(),
                index: index.as_str(),
            });
        }
    }

    if let Some(caps) = REMAINDER.captures(text) {
        if let (Some(left), Some(right)) = (caps.name("a"), caps.name("b")) {
            return Ok(Expr::Remainder {
                left: left.as_str(),
                right: right.as_str(),
            });
        }
    }

    if let Some(caps) = CALL.captures(text) {
        if let (Some(name), Some(args)) = (caps.name("func"), caps.name("args")) {
            let args = args
                .as_str()
                .split(',')
                .map(|arg| parse_argument(arg, text))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Expr::Call {
                name: name.as_str(),
                args,
            });
        }
    }

    Err(ParseError::UnsupportedExpression {
        text: text.to_string(),
    })
}

fn parse_member(member: &str) -> Option<Member<'_>> {
    match member {
        "split(\"\")" => Some(Member::Split),
        "join(\"\")" => Some(Member::Join),
        "length" => Some(Member::Length),
        "reverse()" => Some(Member::Reverse),
        _ => SLICE
            .captures(member)
            .and_then(|caps| caps.name("idx"))
            .map(|idx| Member::Slice(idx.as_str())),
    }
}

fn parse_argument<'a>(arg: &'a str, call: &str) -> Result<Argument<'a>, ParseError> {
    if arg.is_empty() {
        return Err(ParseError::EmptyArgument {
            text: call.to_string(),
        });
    }
    if is_digits(arg) {
        parse_integer(arg).map(Argument::Integer)
    } else {
        Ok(Argument::Variable(arg))
    }
}
