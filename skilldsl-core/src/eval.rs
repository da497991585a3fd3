//! Tree-walking evaluator for skill compute expressions.
//!
//! An evaluation works against three stores:
//!
//! - bindings, copied on entry to each `let` and dropped on exit;
//! - the caller's state map, mutated in place by `set`;
//! - the emission map, filled by `emit` (last write per channel wins).
//!
//! State and emissions are threaded through every recursive call as
//! mutable borrows, so nested scopes always see the same two maps.
//!
//! Unknown forms never fail: they evaluate positionally to a list.

use std::cmp::Ordering;

use tracing::{debug, trace};

use crate::ast::{Number, Value, ValueMap};
use crate::error::EvalError;
use crate::parser::parse;
use crate::skill::SkillDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Deepest expression nesting evaluated before failing with
    /// [`EvalError::NestingTooDeep`].
    pub max_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig { max_depth: 64 }
    }
}

/// What to evaluate: DSL text (parsed first) or an already parsed tree.
#[derive(Debug, Clone, Copy)]
pub enum Program<'a> {
    Text(&'a str),
    Ast(&'a Value),
}

impl<'a> From<&'a str> for Program<'a> {
    fn from(text: &'a str) -> Self {
        Program::Text(text)
    }
}

impl<'a> From<&'a String> for Program<'a> {
    fn from(text: &'a String) -> Self {
        Program::Text(text)
    }
}

impl<'a> From<&'a Value> for Program<'a> {
    fn from(ast: &'a Value) -> Self {
        Program::Ast(ast)
    }
}

/// Result of one evaluation.
///
/// On error, `state` and `emissions` hold whatever had been written
/// before the fault.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
    pub value: Value,
    pub state: ValueMap,
    pub emissions: ValueMap,
    pub error: Option<EvalError>,
}

impl EvalOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvalConfig,
}

impl Evaluator {
    pub fn new(config: EvalConfig) -> Self {
        Evaluator { config }
    }

    pub fn evaluate<'a>(
        &self,
        program: impl Into<Program<'a>>,
        mut state: ValueMap,
        inputs: ValueMap,
    ) -> EvalOutcome {
        let parsed;
        let ast = match program.into() {
            Program::Ast(ast) => ast,
            Program::Text(text) => match parse(text) {
                Ok(form) => {
                    parsed = form.ast;
                    &parsed
                }
                Err(err) => {
                    debug!(error = %err, "evaluation input failed to parse");
                    return EvalOutcome {
                        value: Value::Nil,
                        state: ValueMap::new(),
                        emissions: ValueMap::new(),
                        error: Some(err.into()),
                    };
                }
            },
        };

        let mut emissions = ValueMap::new();
        let result = {
            let mut machine = Machine {
                state: &mut state,
                inputs: &inputs,
                emissions: &mut emissions,
                depth: 0,
                max_depth: self.config.max_depth,
            };
            machine.eval(ast, &ValueMap::new())
        };
        debug!(
            ok = result.is_ok(),
            emissions = emissions.len(),
            "evaluation finished"
        );

        match result {
            Ok(value) => EvalOutcome {
                value,
                state,
                emissions,
                error: None,
            },
            Err(err) => EvalOutcome {
                value: Value::Nil,
                state,
                emissions,
                error: Some(err),
            },
        }
    }

    /// Runs a skill's compute form from its declared initial state.
    ///
    /// A non-map state declaration starts from an empty state. A skill
    /// without compute yields nil and its initial state.
    pub fn run_skill(&self, skill: &SkillDescriptor, inputs: ValueMap) -> EvalOutcome {
        let state = skill.state_map().cloned().unwrap_or_default();
        let expression = match skill.compute.as_ref().map(|c| c.expression()) {
            None | Some(Ok(None)) => {
                return EvalOutcome {
                    value: Value::Nil,
                    state,
                    emissions: ValueMap::new(),
                    error: None,
                };
            }
            Some(Ok(Some(expression))) => expression,
            Some(Err(err)) => {
                return EvalOutcome {
                    value: Value::Nil,
                    state: ValueMap::new(),
                    emissions: ValueMap::new(),
                    error: Some(err.into()),
                };
            }
        };
        debug!(skill = %skill.id, "running skill compute");
        self.evaluate(&expression, state, inputs)
    }
}

/// Evaluates with the default configuration.
pub fn evaluate<'a>(program: impl Into<Program<'a>>, state: ValueMap, inputs: ValueMap) -> EvalOutcome {
    Evaluator::default().evaluate(program, state, inputs)
}

/// Which caller-supplied store a `get` target names.
#[derive(Clone, Copy)]
enum Store {
    State,
    Input,
}

fn store_marker(value: &Value) -> Option<Store> {
    match value {
        Value::Symbol(name) | Value::Str(name) => match name.as_str() {
            "state" => Some(Store::State),
            "input" => Some(Store::Input),
            _ => None,
        },
        _ => None,
    }
}

struct Machine<'s> {
    state: &'s mut ValueMap,
    inputs: &'s ValueMap,
    emissions: &'s mut ValueMap,
    depth: usize,
    max_depth: usize,
}

impl Machine<'_> {
    fn eval(&mut self, expr: &Value, scope: &ValueMap) -> Result<Value, EvalError> {
        if self.depth >= self.max_depth {
            return Err(EvalError::NestingTooDeep {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        let result = self.eval_node(expr, scope);
        self.depth -= 1;
        result
    }

    fn eval_node(&mut self, expr: &Value, scope: &ValueMap) -> Result<Value, EvalError> {
        match expr {
            Value::Nil
            | Value::Bool(_)
            | Value::Number(_)
            | Value::Str(_)
            | Value::Keyword(_) => Ok(expr.clone()),
            Value::Symbol(name) => Ok(scope.get(name).cloned().unwrap_or_else(|| expr.clone())),
            Value::Map(map) => {
                let mut evaluated = ValueMap::new();
                for (key, value) in map.iter() {
                    evaluated.insert(key, self.eval(value, scope)?);
                }
                Ok(Value::Map(evaluated))
            }
            Value::Vector(items) => Ok(Value::Vector(self.eval_all(items, scope)?)),
            Value::List(items) => match items.split_first() {
                None => Ok(expr.clone()),
                Some((Value::Symbol(name), operands)) => self.eval_form(name, operands, scope),
                Some(_) => Ok(Value::List(self.eval_all(items, scope)?)),
            },
        }
    }

    /// Dispatches a list form on its head symbol.
    ///
    /// Each group of forms lives in its own method so the frame kept on the
    /// stack for every nesting level stays small.
    fn eval_form(
        &mut self,
        name: &str,
        args: &[Value],
        scope: &ValueMap,
    ) -> Result<Value, EvalError> {
        match name {
            "+" | "-" | "*" | "/" => self.eval_arithmetic(name, args, scope),
            ">" => self.compare(name, args, scope, |ord| ord == Ordering::Greater),
            "<" => self.compare(name, args, scope, |ord| ord == Ordering::Less),
            ">=" => self.compare(name, args, scope, |ord| ord != Ordering::Less),
            "<=" => self.compare(name, args, scope, |ord| ord != Ordering::Greater),
            "=" => {
                let left = self.eval(operand(name, args, 0)?, scope)?;
                let right = self.eval(operand(name, args, 1)?, scope)?;
                Ok(Value::Bool(left.loose_eq(&right)))
            }
            "and" | "or" | "not" => self.eval_logic(name, args, scope),
            "if" => self.eval_if(args, scope),
            "do" | "seq" => self.eval_body(args, scope),
            "let" => self.eval_let(args, scope),
            "get" => self.eval_get(args, scope),
            "set" | "emit" => self.eval_write(name, args, scope),
            "sum" | "sum-values" | "count" | "merge" | "assoc" => {
                self.eval_collection(name, args, scope)
            }
            "str" => {
                let mut text = String::new();
                for arg in args {
                    text.push_str(&self.eval(arg, scope)?.to_text());
                }
                Ok(Value::Str(text))
            }
            _ => {
                trace!(form = name, "unrecognised form, evaluating positionally");
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::symbol(name));
                items.extend(self.eval_all(args, scope)?);
                Ok(Value::List(items))
            }
        }
    }

    fn eval_arithmetic(
        &mut self,
        name: &str,
        args: &[Value],
        scope: &ValueMap,
    ) -> Result<Value, EvalError> {
        if name == "+" {
            let mut total = Number::Int(0);
            for arg in args {
                if let Some(number) = self.eval(arg, scope)?.as_number() {
                    total = total.checked_add(number);
                }
            }
            return Ok(Value::Number(total));
        }

        let left = self.eval_number(name, args, 0, scope)?;
        if name == "-" && args.len() == 1 {
            return Ok(Value::Number(left.negate()));
        }
        let right = self.eval_number(name, args, 1, scope)?;
        let result = match name {
            "-" => left.checked_sub(right),
            "*" => left.checked_mul(right),
            _ if right.is_zero() => Number::Int(0),
            _ => Number::Float(left.as_f64() / right.as_f64()),
        };
        Ok(Value::Number(result))
    }

    fn eval_logic(&mut self, name: &str, args: &[Value], scope: &ValueMap) -> Result<Value, EvalError> {
        match name {
            "and" => {
                for arg in args {
                    if !self.eval(arg, scope)?.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            "or" => {
                for arg in args {
                    if self.eval(arg, scope)?.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            _ => {
                let value = self.eval(operand(name, args, 0)?, scope)?;
                Ok(Value::Bool(!value.is_truthy()))
            }
        }
    }

    fn eval_if(&mut self, args: &[Value], scope: &ValueMap) -> Result<Value, EvalError> {
        let condition = self.eval(operand("if", args, 0)?, scope)?;
        let then_branch = operand("if", args, 1)?;
        if condition.is_truthy() {
            self.eval(then_branch, scope)
        } else if let Some(else_branch) = args.get(2) {
            self.eval(else_branch, scope)
        } else {
            Ok(Value::Nil)
        }
    }

    /// `set` writes the state map, `emit` the emission map.
    fn eval_write(&mut self, name: &str, args: &[Value], scope: &ValueMap) -> Result<Value, EvalError> {
        let key = operand(name, args, 0)?.key_text();
        let value = self.eval(operand(name, args, 1)?, scope)?;
        let store = if name == "set" {
            &mut *self.state
        } else {
            &mut *self.emissions
        };
        store.insert(key, value.clone());
        Ok(value)
    }

    fn eval_collection(
        &mut self,
        name: &str,
        args: &[Value],
        scope: &ValueMap,
    ) -> Result<Value, EvalError> {
        let first = self.eval(operand(name, args, 0)?, scope)?;
        match name {
            "sum" => {
                let total = match &first {
                    Value::List(items) | Value::Vector(items) => sum_numbers(items.iter()),
                    Value::Map(map) => sum_numbers(map.values()),
                    _ => Number::Int(0),
                };
                Ok(Value::Number(total))
            }
            "sum-values" => {
                let total = match &first {
                    Value::Map(map) => sum_numbers(map.values()),
                    _ => Number::Int(0),
                };
                Ok(Value::Number(total))
            }
            "count" => {
                // Keywords and symbols are atoms here, not strings.
                let length = match &first {
                    Value::List(items) | Value::Vector(items) => items.len(),
                    Value::Map(map) => map.len(),
                    Value::Str(text) => text.chars().count(),
                    _ => 0,
                };
                Ok(Value::int(i64::try_from(length).unwrap_or(i64::MAX)))
            }
            "merge" => {
                let right = self.eval(operand(name, args, 1)?, scope)?;
                match (&first, right) {
                    (Value::Map(left), Value::Map(right)) => Ok(Value::Map(left.merged(&right))),
                    (_, right) => Ok(right),
                }
            }
            _ => {
                let key = operand(name, args, 1)?.key_text();
                let value = self.eval(operand(name, args, 2)?, scope)?;
                match first {
                    Value::Map(mut map) => {
                        map.insert(key, value);
                        Ok(Value::Map(map))
                    }
                    other => Err(EvalError::TypeMismatch {
                        form: name.to_string(),
                        detail: format!("expected a map, found {other}"),
                    }),
                }
            }
        }
    }

    fn eval_all(&mut self, items: &[Value], scope: &ValueMap) -> Result<Vec<Value>, EvalError> {
        items.iter().map(|item| self.eval(item, scope)).collect()
    }

    /// Evaluates forms in order and returns the last result, or nil.
    fn eval_body(&mut self, body: &[Value], scope: &ValueMap) -> Result<Value, EvalError> {
        let mut last = Value::Nil;
        for form in body {
            last = self.eval(form, scope)?;
        }
        Ok(last)
    }

    /// `(let [name expr ...] body...)` with sequential bindings.
    fn eval_let(&mut self, args: &[Value], scope: &ValueMap) -> Result<Value, EvalError> {
        let bindings = operand("let", args, 0)?;
        let Some(pairs) = bindings.as_seq() else {
            return Err(EvalError::TypeMismatch {
                form: "let".to_string(),
                detail: format!("bindings must be a vector, found {bindings}"),
            });
        };
        if pairs.len() % 2 != 0 {
            return Err(EvalError::TypeMismatch {
                form: "let".to_string(),
                detail: "bindings need an even number of forms".to_string(),
            });
        }

        let mut local = scope.clone();
        for pair in pairs.chunks(2) {
            let name = match &pair[0] {
                Value::Symbol(name) | Value::Keyword(name) | Value::Str(name) => name.clone(),
                other => {
                    return Err(EvalError::TypeMismatch {
                        form: "let".to_string(),
                        detail: format!("cannot bind to {other}"),
                    });
                }
            };
            let value = self.eval(&pair[1], &local)?;
            local.insert(name, value);
        }
        self.eval_body(&args[1..], &local)
    }

    /// `(get target key?)`; `state` and `input` name the caller's stores.
    fn eval_get(&mut self, args: &[Value], scope: &ValueMap) -> Result<Value, EvalError> {
        let target = self.eval(operand("get", args, 0)?, scope)?;
        let marker = store_marker(&target);
        let Some(key) = args.get(1) else {
            return Ok(match marker {
                Some(Store::State) => Value::Map(self.state.clone()),
                Some(Store::Input) => Value::Map(self.inputs.clone()),
                None => target,
            });
        };

        let map = match marker {
            Some(Store::State) => Some(&*self.state),
            Some(Store::Input) => Some(self.inputs),
            None => target.as_map(),
        };
        let Some(map) = map else {
            return Ok(Value::Nil);
        };
        let stripped = key.key_text();
        let found = map.get(&stripped).or_else(|| match key {
            Value::Keyword(name) => map.get(&format!(":{name}")),
            _ => None,
        });
        Ok(found.cloned().unwrap_or(Value::Nil))
    }

    fn eval_number(
        &mut self,
        form: &str,
        args: &[Value],
        index: usize,
        scope: &ValueMap,
    ) -> Result<Number, EvalError> {
        let value = self.eval(operand(form, args, index)?, scope)?;
        value.as_number().ok_or_else(|| EvalError::TypeMismatch {
            form: form.to_string(),
            detail: format!("operand {} is not a number: {value}", index + 1),
        })
    }

    fn compare(
        &mut self,
        form: &str,
        args: &[Value],
        scope: &ValueMap,
        predicate: impl FnOnce(Ordering) -> bool,
    ) -> Result<Value, EvalError> {
        let left = self.eval(operand(form, args, 0)?, scope)?;
        let right = self.eval(operand(form, args, 1)?, scope)?;
        let ordering = match (&left, &right) {
            (Value::Number(Number::Int(a)), Value::Number(Number::Int(b))) => Some(a.cmp(b)),
            (Value::Number(a), Value::Number(b)) => a.as_f64().partial_cmp(&b.as_f64()),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => {
                return Err(EvalError::TypeMismatch {
                    form: form.to_string(),
                    detail: format!("cannot order {left} and {right}"),
                });
            }
        };
        // NaN compares false under every ordering.
        Ok(Value::Bool(ordering.is_some_and(predicate)))
    }
}

fn operand<'v>(form: &str, args: &'v [Value], index: usize) -> Result<&'v Value, EvalError> {
    args.get(index).ok_or_else(|| EvalError::MissingOperand {
        form: form.to_string(),
        position: index + 1,
    })
}

/// Sum of the numeric members; everything else is skipped.
fn sum_numbers<'v>(values: impl Iterator<Item = &'v Value>) -> Number {
    values
        .filter_map(Value::as_number)
        .fold(Number::Int(0), Number::checked_add)
}
