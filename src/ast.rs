/// Recognised shape of one statement. Sub-expressions stay as source text; they are
/// recognised lazily when evaluated so the recursion budget applies to each level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<'a> {
    /// `out=expr`
    Assign { target: &'a str, value: &'a str },
    /// `out[index]=expr`, mutating the bound array in place.
    AssignIndex {
        target: &'a str,
        index: &'a str,
        value: &'a str,
    },
    /// `return expr`
    Return(&'a str),
}

/// Recognised shape of one expression, in the priority order the parser tries them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr<'a> {
    Integer(i64),
    Variable(&'a str),
    Member { receiver: &'a str, member: Member<'a> },
    Index { receiver: &'a str, index: &'a str },
    Remainder { left: &'a str, right: &'a str },
    Call { name: &'a str, args: Vec<Argument<'a>> },
}

/// Members supported after `receiver.`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member<'a> {
    /// `split("")`
    Split,
    /// `join("")`
    Join,
    Length,
    /// `reverse()`
    Reverse,
    /// `slice(expr)`
    Slice(&'a str),
}

/// Call arguments are restricted to literals and bare names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument<'a> {
    Integer(i64),
    Variable(&'a str),
}
