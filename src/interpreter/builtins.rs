use std::{cmp::Ordering, collections::HashMap, rc::Rc};

use anyhow::{Error, Result, bail};
use lazy_static::lazy_static;

use crate::{
    error::BuiltinError,
    value::{Cons, Number, Value},
};

/// How many arguments a builtin accepts.
#[derive(Debug, Clone, Copy)]
enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exact(expected) => count == expected,
            Self::AtLeast(minimum) => count >= minimum,
            Self::Any => true,
        }
    }

    fn describe(self) -> String {
        match self {
            Self::Exact(expected) => expected.to_string(),
            Self::AtLeast(minimum) => format!("at least {minimum}"),
            Self::Any => "any number of".to_string(),
        }
    }
}

type BuiltinFn = fn(&str, &[Value]) -> Result<Value>;

struct Builtin {
    arity: Arity,
    func: BuiltinFn,
}

/// Convenience macro for a builtin table entry.
macro_rules! builtin {
    ($name:literal, $arity:expr, $func:expr) => {
        (
            $name,
            Builtin {
                arity: $arity,
                func: $func,
            },
        )
    };
}

lazy_static! {
    /// Every builtin procedure, by name.
    static ref BUILTINS: HashMap<&'static str, Builtin> = HashMap::from([
        // arithmetic
        builtin!("+", Arity::Any, plus),
        builtin!("-", Arity::Exact(2), minus),
        builtin!("/", Arity::Exact(2), divide),
        builtin!("//", Arity::Exact(2), floor_divide),
        builtin!("*", Arity::Any, times),
        builtin!("%", Arity::Exact(2), modulo),
        builtin!("**", Arity::Exact(2), power),
        builtin!("abs", Arity::Exact(1), absolute),
        // comparison and logic
        builtin!("=", Arity::AtLeast(2), equals),
        builtin!("!=", Arity::Exact(2), not_equals),
        builtin!("&&", Arity::AtLeast(2), logical_and),
        builtin!("||", Arity::AtLeast(2), logical_or),
        builtin!("!", Arity::Exact(1), logical_not),
        builtin!("<", Arity::Exact(2), |name, args| compare(name, args, Ordering::is_lt)),
        builtin!(">", Arity::Exact(2), |name, args| compare(name, args, Ordering::is_gt)),
        builtin!("<=", Arity::Exact(2), |name, args| compare(name, args, Ordering::is_le)),
        builtin!(">=", Arity::Exact(2), |name, args| compare(name, args, Ordering::is_ge)),
        // bitwise
        builtin!("^", Arity::Exact(2), |name, args| bitwise(name, args, |a, b| a ^ b)),
        builtin!("&", Arity::Exact(2), |name, args| bitwise(name, args, |a, b| a & b)),
        builtin!("|", Arity::Exact(2), |name, args| bitwise(name, args, |a, b| a | b)),
        // lists
        builtin!("cons", Arity::Exact(2), cons),
        builtin!("car", Arity::Exact(1), car),
        builtin!("cdr", Arity::Exact(1), cdr),
        builtin!("set_car", Arity::Exact(2), set_car),
        builtin!("set_cdr", Arity::Exact(2), set_cdr),
        builtin!("concat", Arity::Any, concat),
        builtin!("length", Arity::Exact(1), length),
        builtin!("list", Arity::Any, |_, args| Ok(Value::list(args.to_vec()))),
    ]);
}

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains_key(name)
}

/// Call the builtin `name` with already evaluated arguments.
pub fn handle(name: &str, args: &[Value]) -> Result<Value> {
    let Some(builtin) = BUILTINS.get(name) else {
        bail!(BuiltinError::Unknown(name.to_string()))
    };

    if !builtin.arity.accepts(args.len()) {
        bail!(BuiltinError::Arity {
            name: name.to_string(),
            expected: builtin.arity.describe(),
            got: args.len(),
        })
    }

    (builtin.func)(name, args)
}

fn type_error(name: &str, expected: &str, got: &Value) -> Error {
    BuiltinError::Type {
        name: name.to_string(),
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    }
    .into()
}

fn overflow(name: &str) -> Error {
    BuiltinError::Overflow(name.to_string()).into()
}

fn number(name: &str, value: &Value) -> Result<Number> {
    match value {
        Value::Number(num) => Ok(*num),
        other => Err(type_error(name, "a number", other)),
    }
}

fn integer(name: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Number(Number::Int(num)) => Ok(*num),
        other => Err(type_error(name, "an integer", other)),
    }
}

fn cell(name: &str, value: &Value) -> Result<Rc<Cons>> {
    match value {
        Value::Cons(cell) => Ok(Rc::clone(cell)),
        other => Err(type_error(name, "a cons cell", other)),
    }
}

fn elements(name: &str, value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Nil | Value::Cons(_) => value.to_vec(),
        other => Err(type_error(name, "a list", other)),
    }
}

/// Apply an integer operation when both sides are integers, otherwise the
/// float operation.
fn arithmetic(
    name: &str,
    first: Number,
    second: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Number> {
    match (first, second) {
        (Number::Int(a), Number::Int(b)) => int_op(a, b)
            .map(Number::Int)
            .ok_or_else(|| overflow(name)),
        _ => Ok(Number::Float(float_op(first.as_f64(), second.as_f64()))),
    }
}

fn pair(name: &str, args: &[Value]) -> Result<(Number, Number)> {
    Ok((number(name, &args[0])?, number(name, &args[1])?))
}

fn check_divisor(name: &str, divisor: Number) -> Result<()> {
    if divisor.is_zero() {
        bail!(BuiltinError::DivisionByZero(name.to_string()))
    }
    Ok(())
}

fn plus(name: &str, args: &[Value]) -> Result<Value> {
    let mut total = Number::Int(0);
    for arg in args {
        total = arithmetic(name, total, number(name, arg)?, i64::checked_add, |a, b| a + b)?;
    }
    Ok(Value::Number(total))
}

fn times(name: &str, args: &[Value]) -> Result<Value> {
    let mut total = Number::Int(1);
    for arg in args {
        total = arithmetic(name, total, number(name, arg)?, i64::checked_mul, |a, b| a * b)?;
    }
    Ok(Value::Number(total))
}

fn minus(name: &str, args: &[Value]) -> Result<Value> {
    let (a, b) = pair(name, args)?;
    Ok(Value::Number(arithmetic(name, a, b, i64::checked_sub, |a, b| a - b)?))
}

fn divide(name: &str, args: &[Value]) -> Result<Value> {
    let (a, b) = pair(name, args)?;
    check_divisor(name, b)?;
    Ok(Value::from(a.as_f64() / b.as_f64()))
}

fn floor_divide(name: &str, args: &[Value]) -> Result<Value> {
    let (a, b) = pair(name, args)?;
    check_divisor(name, b)?;
    let result = arithmetic(
        name,
        a,
        b,
        |a, b| {
            let quotient = a.checked_div(b)?;
            if a % b != 0 && ((a < 0) != (b < 0)) {
                Some(quotient - 1)
            } else {
                Some(quotient)
            }
        },
        |a, b| (a / b).floor(),
    )?;
    Ok(Value::Number(result))
}

/// The result takes the sign of the divisor.
fn modulo(name: &str, args: &[Value]) -> Result<Value> {
    let (a, b) = pair(name, args)?;
    check_divisor(name, b)?;
    let result = arithmetic(
        name,
        a,
        b,
        |a, b| {
            if b == -1 {
                return Some(0);
            }
            let remainder = a.checked_rem(b)?;
            if remainder != 0 && ((remainder < 0) != (b < 0)) {
                Some(remainder + b)
            } else {
                Some(remainder)
            }
        },
        |a, b| a - b * (a / b).floor(),
    )?;
    Ok(Value::Number(result))
}

fn power(name: &str, args: &[Value]) -> Result<Value> {
    let (base, exponent) = pair(name, args)?;
    match (base, exponent) {
        (Number::Int(base), Number::Int(exponent)) if exponent >= 0 => {
            let exponent = u32::try_from(exponent).map_err(|_| overflow(name))?;
            base.checked_pow(exponent)
                .map(Value::from)
                .ok_or_else(|| overflow(name))
        }
        _ => Ok(Value::from(base.as_f64().powf(exponent.as_f64()))),
    }
}

fn absolute(name: &str, args: &[Value]) -> Result<Value> {
    match number(name, &args[0])? {
        Number::Int(num) => num
            .checked_abs()
            .map(Value::from)
            .ok_or_else(|| overflow(name)),
        Number::Float(num) => Ok(Value::from(num.abs())),
    }
}

fn equals(_: &str, args: &[Value]) -> Result<Value> {
    let equal = match args.split_first() {
        Some((first, rest)) => rest.iter().all(|other| first == other),
        None => true,
    };
    Ok(Value::from(equal))
}

fn not_equals(_: &str, args: &[Value]) -> Result<Value> {
    Ok(Value::from(args[0] != args[1]))
}

fn logical_and(_: &str, args: &[Value]) -> Result<Value> {
    Ok(Value::from(args.iter().all(Value::is_truthy)))
}

fn logical_or(_: &str, args: &[Value]) -> Result<Value> {
    Ok(Value::from(args.iter().any(Value::is_truthy)))
}

fn logical_not(_: &str, args: &[Value]) -> Result<Value> {
    Ok(Value::from(!args[0].is_truthy()))
}

/// Numbers compare with numbers and strings with strings.
fn compare(name: &str, args: &[Value], accept: fn(Ordering) -> bool) -> Result<Value> {
    let ordering = match (&args[0], &args[1]) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(_), other) | (other, _) => {
            return Err(type_error(name, "two numbers or two strings", other));
        }
    };
    Ok(Value::from(ordering.is_some_and(accept)))
}

fn bitwise(name: &str, args: &[Value], op: fn(i64, i64) -> i64) -> Result<Value> {
    Ok(Value::from(op(integer(name, &args[0])?, integer(name, &args[1])?)))
}

fn cons(_: &str, args: &[Value]) -> Result<Value> {
    Ok(Value::cons(args[0].clone(), args[1].clone()))
}

fn car(name: &str, args: &[Value]) -> Result<Value> {
    Ok(cell(name, &args[0])?.car())
}

fn cdr(name: &str, args: &[Value]) -> Result<Value> {
    Ok(cell(name, &args[0])?.cdr())
}

fn set_car(name: &str, args: &[Value]) -> Result<Value> {
    cell(name, &args[0])?.set_car(args[1].clone());
    Ok(args[0].clone())
}

fn set_cdr(name: &str, args: &[Value]) -> Result<Value> {
    cell(name, &args[0])?.set_cdr(args[1].clone());
    Ok(args[0].clone())
}

fn concat(name: &str, args: &[Value]) -> Result<Value> {
    let mut joined = Vec::new();
    for arg in args {
        joined.extend(elements(name, arg)?);
    }
    Ok(Value::list(joined))
}

fn length(name: &str, args: &[Value]) -> Result<Value> {
    let count = elements(name, &args[0])?.len();
    i64::try_from(count)
        .map(Value::from)
        .map_err(|_| overflow(name))
}
