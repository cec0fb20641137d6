use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::HashMap,
    fmt::{Debug, Display},
    rc::Rc,
};

use anyhow::{Result, bail};

use crate::error::EvalError;

/// A single mutable name -> value mapping. Shared between the environment
/// and any closures that hold it.
pub type Scope = Rc<RefCell<HashMap<String, Value>>>;

/// Create a fresh, empty scope.
pub fn new_scope() -> Scope {
    Rc::new(RefCell::new(HashMap::new()))
}

/// Convenience macro for building a proper list `Value` from its elements.
macro_rules! list {
    ($($value:expr),* $(,)?) => {
        $crate::value::Value::list(vec![$($value),*])
    };
}

#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(num) => num as f64,
            Self::Float(num) => num,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Self::Int(num) => num == 0,
            Self::Float(num) => num == 0.0,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(ours), Self::Int(theirs)) => ours == theirs,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(ours), Self::Int(theirs)) => ours.partial_cmp(theirs),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(num) => write!(f, "{num}"),
            Self::Float(num) => write!(f, "{num:?}"),
        }
    }
}

/// A mutable pair. Lists are chains of these terminated by `Value::Nil`.
pub struct Cons {
    car: RefCell<Value>,
    cdr: RefCell<Value>,
}

impl Cons {
    pub fn car(&self) -> Value {
        self.car.borrow().clone()
    }

    pub fn cdr(&self) -> Value {
        self.cdr.borrow().clone()
    }

    pub fn set_car(&self, value: Value) {
        *self.car.borrow_mut() = value;
    }

    pub fn set_cdr(&self, value: Value) {
        *self.cdr.borrow_mut() = value;
    }
}

impl Debug for Cons {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Cons")
            .field(&*self.car.borrow())
            .field(&*self.cdr.borrow())
            .finish()
    }
}

/// A user closure. The scope is replaced after every call, so a lambda
/// value carries state from one call to the next.
pub struct Lambda {
    params: Vec<String>,
    body: Value,
    scope: RefCell<Scope>,
}

impl Lambda {
    pub fn new(params: Vec<String>, body: Value) -> Self {
        Self {
            params,
            body,
            scope: RefCell::new(new_scope()),
        }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn scope(&self) -> Scope {
        Rc::clone(&self.scope.borrow())
    }

    pub fn set_scope(&self, scope: Scope) {
        *self.scope.borrow_mut() = scope;
    }
}

impl Debug for Lambda {
    // The scope is left out: it can contain this very lambda.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lambda")
            .field("params", &self.params)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// The one representation shared by program text and runtime data.
#[derive(Debug, Clone)]
pub enum Value {
    Number(Number),
    String(String),
    Boolean(bool),
    Nil,
    Cons(Rc<Cons>),
    Lambda(Rc<Lambda>),
}

impl PartialEq for Value {
    /// Atoms compare by value, pairs and lambdas by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(ours), Self::Number(theirs)) => ours == theirs,
            (Self::String(ours), Self::String(theirs)) => ours == theirs,
            (Self::Boolean(ours), Self::Boolean(theirs)) => ours == theirs,
            (Self::Nil, Self::Nil) => true,
            (Self::Cons(ours), Self::Cons(theirs)) => Rc::ptr_eq(ours, theirs),
            (Self::Lambda(ours), Self::Lambda(theirs)) => Rc::ptr_eq(ours, theirs),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(Number::Int(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(Number::Float(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl Value {
    pub fn cons(car: Value, cdr: Value) -> Value {
        Value::Cons(Rc::new(Cons {
            car: RefCell::new(car),
            cdr: RefCell::new(cdr),
        }))
    }

    /// Build a proper list, last element first.
    pub fn list(values: Vec<Value>) -> Value {
        values
            .into_iter()
            .rev()
            .fold(Value::Nil, |tail, value| Value::cons(value, tail))
    }

    /// Iterate the elements of a proper list. Yields an error if the chain
    /// ends in anything other than `Nil`.
    pub fn iter(&self) -> ListIter {
        ListIter {
            next: Some(self.clone()),
        }
    }

    pub fn to_vec(&self) -> Result<Vec<Value>> {
        self.iter().collect()
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Number(num) => !num.is_zero(),
            Self::String(string) => !string.is_empty(),
            Self::Boolean(boolean) => *boolean,
            Self::Nil => false,
            Self::Cons(_) | Self::Lambda(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(string) = self {
            Some(string)
        } else {
            None
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::Nil => "nil",
            Self::Cons(_) => "cons",
            Self::Lambda(_) => "lambda",
        }
    }
}

pub struct ListIter {
    next: Option<Value>,
}

impl Iterator for ListIter {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next.take()? {
            Value::Nil => None,
            Value::Cons(cell) => {
                self.next = Some(cell.cdr());
                Some(Ok(cell.car()))
            }
            _ => Some(Err(EvalError::MalformedList.into())),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_value(self, f, &mut Vec::new())
    }
}

/// `open` holds the cells currently being printed. Meeting one of them again
/// means the list is cyclic, which prints as `...`.
fn write_value(
    value: &Value,
    f: &mut std::fmt::Formatter<'_>,
    open: &mut Vec<Rc<Cons>>,
) -> std::fmt::Result {
    match value {
        Value::Number(num) => write!(f, "{num}"),
        Value::String(string) => write!(f, "{string}"),
        Value::Boolean(boolean) => write!(f, "{boolean}"),
        Value::Nil => write!(f, "()"),
        Value::Cons(cell) => write_list(cell, f, open),
        Value::Lambda(lambda) => write!(f, "<lambda ({})>", lambda.params.join(" ")),
    }
}

fn is_open(open: &[Rc<Cons>], cell: &Rc<Cons>) -> bool {
    open.iter().any(|seen| Rc::ptr_eq(seen, cell))
}

fn write_list(
    cell: &Rc<Cons>,
    f: &mut std::fmt::Formatter<'_>,
    open: &mut Vec<Rc<Cons>>,
) -> std::fmt::Result {
    if is_open(open, cell) {
        return write!(f, "...");
    }
    let depth = open.len();
    open.push(Rc::clone(cell));

    write!(f, "(")?;
    write_value(&cell.car(), f, open)?;
    let mut rest = cell.cdr();
    loop {
        match rest {
            Value::Nil => break,
            Value::Cons(next) if is_open(open, &next) => {
                write!(f, " ...")?;
                break;
            }
            Value::Cons(next) => {
                open.push(Rc::clone(&next));
                write!(f, " ")?;
                write_value(&next.car(), f, open)?;
                rest = next.cdr();
            }
            other => {
                write!(f, " . ")?;
                write_value(&other, f, open)?;
                break;
            }
        }
    }

    open.truncate(depth);
    write!(f, ")")
}

/// Fail with a malformed list error unless `value` is a proper list.
pub fn expect_list(value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Nil | Value::Cons(_) => value.to_vec(),
        _ => bail!(EvalError::MalformedList),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_round_trip_is_structural() {
        let values = vec![Value::from(4), Value::from("h"), Value::from(2.5)];
        let list = Value::list(values.clone());
        let back = list.to_vec().unwrap();
        assert_eq!(back, values);
        assert_ne!(list, Value::list(values));
    }

    #[test]
    fn cons_equality_is_identity() {
        let list = list![Value::from(1), Value::from(2)];
        let alias = list.clone();
        assert_eq!(list, alias);
        assert_ne!(list, list![Value::from(1), Value::from(2)]);
    }

    #[test]
    fn lambda_equality_is_identity() {
        let lambda = Value::Lambda(Rc::new(Lambda::new(vec![], Value::from(1))));
        let other = Value::Lambda(Rc::new(Lambda::new(vec![], Value::from(1))));
        assert_eq!(lambda, lambda.clone());
        assert_ne!(lambda, other);
    }

    #[test]
    fn atoms_compare_by_value() {
        assert_eq!(Value::from(2), Value::from(2.0));
        assert_eq!(Value::from("abc"), Value::from("abc"));
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::from(0), Value::from(false));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from(0.0).is_truthy());
        assert!(Value::from(-1).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(!Value::Nil.is_truthy());
        assert!(list![Value::from(0)].is_truthy());
        assert!(Value::from(true).is_truthy());
    }

    #[test]
    fn improper_list_fails_iteration() {
        let pair = Value::cons(Value::from(1), Value::from(2));
        let mut iter = pair.iter();
        assert_eq!(iter.next().unwrap().unwrap(), Value::from(1));
        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(
            err.downcast_ref::<EvalError>(),
            Some(&EvalError::MalformedList)
        );
        assert!(iter.next().is_none());
    }

    #[test]
    fn display() {
        assert_eq!(
            list![Value::from(1), list![Value::from("a")], Value::from(1.5)].to_string(),
            "(1 (a) 1.5)"
        );
        assert_eq!(Value::cons(Value::from(1), Value::from(2)).to_string(), "(1 . 2)");
        assert_eq!(Value::from(2.0).to_string(), "2.0");
        assert_eq!(Value::Nil.to_string(), "()");
    }

    #[test]
    fn display_cycles() {
        let looped = list![Value::from(1), Value::from(2)];
        let Value::Cons(cell) = &looped else {
            panic!("expected a cons cell")
        };
        if let Value::Cons(second) = cell.cdr() {
            second.set_cdr(looped.clone());
        }
        assert_eq!(looped.to_string(), "(1 2 ...)");

        let nested = list![Value::from(1), Value::from(2)];
        let Value::Cons(cell) = &nested else {
            panic!("expected a cons cell")
        };
        cell.set_car(nested.clone());
        assert_eq!(nested.to_string(), "(... 2)");
    }

    #[test]
    fn display_shared_tail_is_not_a_cycle() {
        let shared = list![Value::from(1)];
        let twice = list![shared.clone(), shared];
        assert_eq!(twice.to_string(), "((1) (1))");
    }
}
