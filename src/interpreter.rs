mod builtins;
mod environment;

use std::{collections::HashSet, rc::Rc};

use anyhow::{Error, Result, bail};
use lazy_static::lazy_static;
use tracing::{debug, trace};

use environment::Environment;

use crate::{
    desugarer::desugar,
    error::EvalError,
    parser::parse,
    preprocessor::remove_comments,
    tokeniser::tokenise,
    value::{Lambda, Value, expect_list, new_scope},
};

/// Startup definitions written in the language itself.
pub const PRELUDE: &str = include_str!("../lisp/prelude.lisp");

lazy_static! {
    /// Forms which receive their arguments unevaluated.
    static ref KEYWORDS: HashSet<&'static str> =
        HashSet::from(["block", "if", "list", "lambda", "set", "def", "eval"]);
}

/// Owns the environment that every top-level form is evaluated in.
#[derive(Debug, Default)]
pub struct Interpreter {
    env: Environment,
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// A fresh interpreter with `source` already run in its global scope.
    pub fn with_startup(source: &str) -> Result<Self> {
        let mut interpreter = Self::new();
        interpreter.run(source)?;
        Ok(interpreter)
    }

    /// Run source text through the whole pipeline, evaluating each top-level
    /// form in order. Returns the value of the last form, if there was one.
    pub fn run(&mut self, source: &str) -> Result<Option<Value>> {
        let tokens = tokenise(&remove_comments(source))?;
        let mut result = None;
        for node in desugar(tokens)? {
            let form = parse(node)?;
            debug!(%form, "evaluating");
            result = Some(self.eval(&form)?);
        }
        Ok(result)
    }

    /// Evaluate a single form.
    pub fn eval(&mut self, node: &Value) -> Result<Value> {
        match node {
            Value::Number(_) | Value::Boolean(_) | Value::Lambda(_) => Ok(node.clone()),
            Value::String(name) => self.env.lookup(name),
            Value::Nil => bail!(EvalError::EmptyApplication),
            Value::Cons(cell) => self.apply(&cell.car(), &cell.cdr()),
        }
    }

    fn apply(&mut self, head: &Value, rest: &Value) -> Result<Value> {
        let args = rest.to_vec()?;
        let name = head.as_str();

        if name == Some("quote") {
            let [quoted] = exact("quote", args)?;
            return Ok(quoted);
        }

        if let Some(keyword) = name
            && KEYWORDS.contains(keyword)
        {
            return self.eval_keyword(keyword, args);
        }

        let values = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>>>()?;

        if let Some(builtin) = name
            && builtins::is_builtin(builtin)
        {
            return builtins::handle(builtin, &values);
        }

        match self.eval(head)? {
            Value::Lambda(lambda) => self.call(&lambda, values),
            other => bail!(EvalError::NotCallable(other.to_string())),
        }
    }

    fn eval_keyword(&mut self, keyword: &str, args: Vec<Value>) -> Result<Value> {
        match keyword {
            "block" => {
                self.env.push_empty_scope();
                let result = self.eval_sequence(&args);
                self.env.pop_scope()?;
                result
            }
            "if" => {
                let [condition, yes, no] = exact("if", args)?;
                match self.eval(&condition)? {
                    Value::Boolean(true) => self.eval(&yes),
                    Value::Boolean(false) => self.eval(&no),
                    other => bail!(EvalError::NonBooleanCondition(other.to_string())),
                }
            }
            "list" => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::list(values))
            }
            "lambda" => {
                let [params, body] = exact("lambda", args)?;
                let params = lambda_params(&params)?;
                Ok(Value::Lambda(Rc::new(Lambda::new(params, body))))
            }
            "set" | "def" => {
                let [target, expr] = exact(keyword, args)?;
                let name = match target {
                    Value::String(name) => name,
                    other => bail!(EvalError::MalformedArguments {
                        form: keyword.to_string(),
                        reason: format!("{other} is not a name"),
                    }),
                };
                let value = self.eval(&expr)?;
                if keyword == "set" {
                    self.env.set(&name, value.clone())?;
                } else {
                    self.env.define(&name, value.clone())?;
                }
                Ok(value)
            }
            "eval" => {
                let [argument] = exact("eval", args)?;
                match quoted_form(&argument) {
                    Some(code) => self.eval(&code),
                    None => bail!(EvalError::MalformedEval(argument.to_string())),
                }
            }
            other => bail!(
                "Something went wrong internally; no evaluation rule for the keyword {other}."
            ),
        }
    }

    /// Evaluate each statement in the current scope, returning the last value.
    fn eval_sequence(&mut self, statements: &[Value]) -> Result<Value> {
        let Some((last, init)) = statements.split_last() else {
            bail!(EvalError::EmptyBlock)
        };
        for statement in init {
            self.eval(statement)?;
        }
        self.eval(last)
    }

    /// Apply a closure to evaluated arguments.
    ///
    /// The closure's own scope is pushed below a fresh argument scope. After
    /// the body runs, a returned lambda takes over the argument scope and the
    /// called lambda takes back whatever its own scope has become.
    fn call(&mut self, lambda: &Rc<Lambda>, args: Vec<Value>) -> Result<Value> {
        if lambda.params().len() != args.len() {
            bail!(EvalError::Arity {
                form: format!("lambda ({})", lambda.params().join(" ")),
                expected: lambda.params().len(),
                got: args.len(),
            })
        }

        let arg_scope = new_scope();
        arg_scope
            .borrow_mut()
            .extend(lambda.params().iter().cloned().zip(args));

        trace!(params = ?lambda.params(), depth = self.env.depth(), "calling lambda");
        self.env.push_scope(lambda.scope());
        self.env.push_scope(arg_scope);
        let result = self.eval_body(lambda.body());
        let used_args = self.env.pop_scope()?;
        let closure_scope = self.env.pop_scope()?;
        let result = result?;

        if let Value::Lambda(returned) = &result {
            trace!(params = ?returned.params(), "returned lambda keeps the call's locals");
            returned.set_scope(used_args);
        }
        lambda.set_scope(closure_scope);

        Ok(result)
    }

    /// A body written as a `block` runs its statements straight in the
    /// argument scope, so its definitions are the call's locals.
    fn eval_body(&mut self, body: &Value) -> Result<Value> {
        if let Value::Cons(cell) = body
            && cell.car().as_str() == Some("block")
        {
            let statements = cell.cdr().to_vec()?;
            return self.eval_sequence(&statements);
        }
        self.eval(body)
    }
}

/// Destructure exactly `N` unevaluated arguments.
fn exact<const N: usize>(form: &str, args: Vec<Value>) -> Result<[Value; N]> {
    let got = args.len();
    args.try_into().map_err(|_| {
        Error::from(EvalError::Arity {
            form: form.to_string(),
            expected: N,
            got,
        })
    })
}

fn lambda_params(params: &Value) -> Result<Vec<String>> {
    let malformed = |reason: String| EvalError::MalformedArguments {
        form: "lambda".to_string(),
        reason,
    };

    let Ok(params) = expect_list(params) else {
        bail!(malformed(format!("parameters must be a list, not {params}")))
    };

    params
        .into_iter()
        .map(|param| match param {
            Value::String(name) => Ok(name),
            other => Err(malformed(format!("parameter {other} is not a name")).into()),
        })
        .collect()
}

/// The `X` of a literal `(quote X)` form.
fn quoted_form(value: &Value) -> Option<Value> {
    let Value::Cons(cell) = value else {
        return None;
    };
    if cell.car().as_str() != Some("quote") {
        return None;
    }
    let [inner]: [Value; 1] = cell.cdr().to_vec().ok()?.try_into().ok()?;
    Some(inner)
}
