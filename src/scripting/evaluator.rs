//! Built-in evaluator for hook scripts.
//!
//! Scripts are sandboxed: they only see the values in [`ScriptContext`], can only produce
//! messages, and stop with an error once they exceed the action or message budget.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use super::parser::{parse_script, BinaryOp, Expr};
use super::{
    ScriptContext, ScriptEffect, ScriptEvaluator, ScriptOutcome, ScriptSubject,
    MAX_ACTIONS_PER_SCRIPT, MAX_EXECUTION_TIME, MAX_MESSAGES_PER_SCRIPT, MAX_SCRIPT_LENGTH,
};
use crate::errors::GameError;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Number(i64),
    Bool(bool),
    Null,
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Null => false,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
        }
    }
}

/// Parses scripts once and evaluates the cached tree on every call.
pub struct DslEvaluator {
    cache: HashMap<String, Arc<Expr>>,
    rng: StdRng,
}

impl DslEvaluator {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            cache: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn compile(&mut self, script: &str) -> Result<Arc<Expr>, GameError> {
        if let Some(ast) = self.cache.get(script) {
            return Ok(ast.clone());
        }
        if script.chars().count() > MAX_SCRIPT_LENGTH {
            return Err(GameError::Script(format!(
                "script longer than {} characters",
                MAX_SCRIPT_LENGTH
            )));
        }
        let ast = Arc::new(parse_script(script).map_err(GameError::Script)?);
        self.cache.insert(script.to_string(), ast.clone());
        Ok(ast)
    }
}

impl Default for DslEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEvaluator for DslEvaluator {
    fn evaluate(
        &mut self,
        script: &str,
        context: &mut ScriptContext,
        subject: &ScriptSubject,
    ) -> Result<ScriptOutcome, GameError> {
        let ast = self.compile(script)?;
        let mut run = Run {
            context,
            subject,
            rng: &mut self.rng,
            started: Instant::now(),
            actions: 0,
            messages: 0,
            handled: None,
        };
        run.eval(&ast).map_err(GameError::Script)?;
        Ok(match run.handled {
            None => ScriptOutcome::NotHandled,
            Some(None) => ScriptOutcome::Handled,
            Some(Some(value)) => ScriptOutcome::HandledWithValue(value),
        })
    }
}

/// State for one evaluation.
struct Run<'a> {
    context: &'a mut ScriptContext,
    subject: &'a ScriptSubject,
    rng: &'a mut StdRng,
    started: Instant,
    actions: u8,
    messages: u8,
    handled: Option<Option<String>>,
}

impl Run<'_> {
    fn eval(&mut self, expr: &Expr) -> Result<Value, String> {
        if self.started.elapsed() > MAX_EXECUTION_TIME {
            return Err("Execution timeout".to_string());
        }
        match expr {
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Variable(name) => self.variable(name),
            Expr::Not(inner) => Ok(Value::Bool(!self.eval(inner)?.is_truthy())),
            Expr::Call { name, args } => self.call(name, args),
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }
            Expr::Sequence(items) => {
                let mut last = Value::Null;
                for item in items {
                    last = self.eval(item)?;
                }
                Ok(last)
            }
        }
    }

    fn variable(&self, name: &str) -> Result<Value, String> {
        let ctx = &*self.context;
        let value = match name {
            "name" => Value::Str(ctx.actor.clone()),
            "hp" => Value::Number(i64::from(ctx.hp)),
            "max_hp" => Value::Number(i64::from(ctx.max_hp)),
            "level" => Value::Number(i64::from(ctx.level)),
            "room" => Value::Str(ctx.room.clone()),
            "target" => ctx
                .target
                .clone()
                .map(Value::Str)
                .unwrap_or(Value::Null),
            "input" => ctx.input.clone().map(Value::Str).unwrap_or(Value::Null),
            "event" => Value::Str(ctx.event.name().to_string()),
            "hour" => Value::Number(i64::from(ctx.hour)),
            "self" => Value::Str(self.subject.name.clone()),
            _ => return Err(format!("Unknown variable: ${}", name)),
        };
        Ok(value)
    }

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value, String> {
        match op {
            BinaryOp::And => {
                if !self.eval(left)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(right)?.is_truthy()))
            }
            BinaryOp::Or => {
                if self.eval(left)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(right)?.is_truthy()))
            }
            BinaryOp::Equal => Ok(Value::Bool(self.eval(left)? == self.eval(right)?)),
            BinaryOp::NotEqual => Ok(Value::Bool(self.eval(left)? != self.eval(right)?)),
            _ => {
                let (l, r) = match (self.eval(left)?, self.eval(right)?) {
                    (Value::Number(l), Value::Number(r)) => (l, r),
                    _ => return Err(format!("'{}' requires numbers", op)),
                };
                let result = match op {
                    BinaryOp::Greater => l > r,
                    BinaryOp::Less => l < r,
                    BinaryOp::GreaterEqual => l >= r,
                    _ => l <= r,
                };
                Ok(Value::Bool(result))
            }
        }
    }

    fn call(&mut self, name: &str, args: &[Expr]) -> Result<Value, String> {
        if self.actions >= MAX_ACTIONS_PER_SCRIPT {
            return Err(format!("Action limit reached ({} max)", MAX_ACTIONS_PER_SCRIPT));
        }
        self.actions += 1;

        match name {
            "message" => {
                let text = self.text_arg(name, args)?;
                self.emit(ScriptEffect::Message(text))
            }
            "echo" => {
                let text = self.text_arg(name, args)?;
                self.emit(ScriptEffect::Echo(text))
            }
            "chance" => {
                let percent = match self.single_arg(name, args)? {
                    Value::Number(n) if (0..=100).contains(&n) => n,
                    _ => return Err("chance() expects a number 0-100".to_string()),
                };
                let roll: i64 = self.rng.gen_range(1..=100);
                Ok(Value::Bool(roll <= percent))
            }
            "handled" => {
                let value = match args {
                    [] => None,
                    [arg] => Some(self.eval(arg)?.as_text()),
                    _ => return Err(format!("handled() expects 0 or 1 arguments, got {}", args.len())),
                };
                self.handled = Some(value);
                Ok(Value::Bool(true))
            }
            "true" if args.is_empty() => Ok(Value::Bool(true)),
            "false" if args.is_empty() => Ok(Value::Bool(false)),
            "is_fighting" if args.is_empty() => Ok(Value::Bool(self.context.target.is_some())),
            _ => Err(format!("Unknown action: {}", name)),
        }
    }

    fn single_arg(&mut self, name: &str, args: &[Expr]) -> Result<Value, String> {
        match args {
            [arg] => self.eval(arg),
            _ => Err(format!("{}() expects 1 argument, got {}", name, args.len())),
        }
    }

    fn text_arg(&mut self, name: &str, args: &[Expr]) -> Result<String, String> {
        let raw = self.single_arg(name, args)?.as_text();
        Ok(self.substitute(&raw))
    }

    fn emit(&mut self, effect: ScriptEffect) -> Result<Value, String> {
        if self.messages >= MAX_MESSAGES_PER_SCRIPT {
            return Err(format!("Message limit reached ({} max)", MAX_MESSAGES_PER_SCRIPT));
        }
        self.messages += 1;
        self.context.effects.push(effect);
        Ok(Value::Bool(true))
    }

    /// Replace `$name`-style references inside message text.
    fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let len = after
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            match self.variable(&after[..len]) {
                Ok(value) => {
                    out.push_str(&value.as_text());
                    rest = &after[len..];
                }
                Err(_) => {
                    out.push('$');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::{ScriptType, SubjectKind};

    fn context(event: ScriptType) -> ScriptContext {
        ScriptContext {
            event,
            actor: "Mira".into(),
            level: 4,
            hp: 12,
            max_hp: 40,
            room: "Village Square".into(),
            target: None,
            input: Some("pray".into()),
            hour: 9,
            effects: Vec::new(),
        }
    }

    fn subject() -> ScriptSubject {
        ScriptSubject {
            kind: SubjectKind::Room,
            name: "Village Square".into(),
        }
    }

    fn run(script: &str, ctx: &mut ScriptContext) -> Result<ScriptOutcome, GameError> {
        DslEvaluator::seeded(1).evaluate(script, ctx, &subject())
    }

    #[test]
    fn handled_requires_explicit_call() {
        let mut ctx = context(ScriptType::Command);
        assert_eq!(run("message('hi')", &mut ctx).unwrap(), ScriptOutcome::NotHandled);
        assert_eq!(
            run("$input == 'pray' && handled()", &mut ctx).unwrap(),
            ScriptOutcome::Handled
        );
        assert_eq!(
            run("handled($hp)", &mut ctx).unwrap(),
            ScriptOutcome::HandledWithValue("12".into())
        );
    }

    #[test]
    fn messages_substitute_variables() {
        let mut ctx = context(ScriptType::Update);
        run("message('$name has $hp of $max_hp in $self, costs $5')", &mut ctx).unwrap();
        assert_eq!(
            ctx.effects,
            vec![ScriptEffect::Message(
                "Mira has 12 of 40 in Village Square, costs $5".into()
            )]
        );
    }

    #[test]
    fn chance_extremes_are_deterministic() {
        let mut ctx = context(ScriptType::Fight);
        assert_eq!(run("chance(0) && handled()", &mut ctx).unwrap(), ScriptOutcome::NotHandled);
        assert_eq!(run("chance(100) && handled()", &mut ctx).unwrap(), ScriptOutcome::Handled);
        assert!(run("chance(101)", &mut ctx).is_err());
    }

    #[test]
    fn limits_are_enforced() {
        let mut ctx = context(ScriptType::Update);
        let spam = "message('a'); message('b'); message('c'); message('d')";
        assert!(run(spam, &mut ctx).is_err());

        let long = format!("message('{}')", "x".repeat(MAX_SCRIPT_LENGTH));
        assert!(run(&long, &mut ctx).is_err());
    }

    #[test]
    fn unknown_names_are_errors() {
        let mut ctx = context(ScriptType::Init);
        assert!(run("teleport('x')", &mut ctx).is_err());
        assert!(run("$mana > 3", &mut ctx).is_err());
        assert!(run("$room > 3", &mut ctx).is_err());
    }
}
