use thiserror::Error;

use crate::model::Token;

/// Errors raised while tokenising source text.
#[derive(Debug, Error, PartialEq)]
pub enum LexError {
    #[error("invalid token \"{text}\" at character {offset}")]
    InvalidToken { text: String, offset: usize },
    #[error("unexpected character '{character}' at character {offset}")]
    UnexpectedCharacter { character: char, offset: usize },
}

/// Errors raised while desugaring or parsing a token tree.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    #[error("a quote mark must be followed by an expression")]
    DanglingQuote,
    #[error("unexpected token {0:?}")]
    UnexpectedToken(Token),
}

/// Runtime errors raised by the evaluator itself.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("variable \"{0}\" is not bound in any scope")]
    Unbound(String),
    #[error("{form} takes {expected} argument(s) but got {got}")]
    Arity {
        form: String,
        expected: usize,
        got: usize,
    },
    #[error("condition evaluated to {0}, which is not a boolean")]
    NonBooleanCondition(String),
    #[error("malformed arguments to {form}: {reason}")]
    MalformedArguments { form: String, reason: String },
    #[error("argument to eval must be of the form (quote X), not {0}")]
    MalformedEval(String),
    #[error("{0} is not a lambda and can't be called")]
    NotCallable(String),
    #[error("can't evaluate an empty application ()")]
    EmptyApplication,
    #[error("a block needs at least one expression")]
    EmptyBlock,
    #[error("malformed list: chain does not end in ()")]
    MalformedList,
    #[error("Something went wrong internally; popped a scope from an empty environment.")]
    ScopeUnderflow,
}

/// Errors raised by builtin procedures.
#[derive(Debug, Error, PartialEq)]
pub enum BuiltinError {
    #[error("{name} takes {expected} argument(s) but got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },
    #[error("{name} expects {expected}, not {got}")]
    Type {
        name: String,
        expected: String,
        got: String,
    },
    #[error("{0}: division by zero")]
    DivisionByZero(String),
    #[error("{0}: integer overflow")]
    Overflow(String),
    #[error("no builtin named \"{0}\"")]
    Unknown(String),
}
