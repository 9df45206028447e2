//! Restricted condition expressions.
//!
//! Conditions in documents (`enabled`, `conditional` values) are small
//! JavaScript-flavoured predicates. They are parsed into an AST and
//! evaluated against a [`ResolutionContext`]; nothing is ever executed.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! ternary    := or ( "?" ternary ":" ternary )?
//! or         := and ( "||" and )*
//! and        := equality ( "&&" equality )*
//! equality   := relational ( ("==" | "!=" | "===" | "!==") relational )*
//! relational := unary ( ("<" | "<=" | ">" | ">=") unary )*
//! unary      := "!" unary | member
//! member     := primary ( "." ident | "[" ternary "]" )*
//! primary    := number | string | true | false | null | undefined
//!             | ident | "(" ternary ")"
//! ```
//!
//! Unknown identifiers evaluate to `undefined`, which is loosely equal to
//! `null` and falsy.

use std::fmt;

use serde_json::Value;

use super::context::ResolutionContext;
use super::error::DomainError;
use crate::application::ports::ConditionEvaluator;

/// A parsed condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, DomainError> {
        let tokens = tokenize(source).map_err(|reason| invalid(source, reason))?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.ternary().map_err(|reason| invalid(source, reason))?;
        if let Some(token) = parser.peek() {
            return Err(invalid(source, format!("unexpected '{token}'")));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate to a value; `None` is `undefined`.
    pub fn evaluate(&self, ctx: &ResolutionContext) -> Option<Value> {
        eval(&self.root, ctx)
    }

    /// Evaluate and coerce to a boolean.
    pub fn is_true(&self, ctx: &ResolutionContext) -> bool {
        truthy(self.evaluate(ctx).as_ref())
    }

    /// Root identifiers this expression reads from the context.
    pub fn references(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_references(&self.root, &mut out);
        out.dedup();
        out
    }
}

fn invalid(source: &str, reason: impl Into<String>) -> DomainError {
    DomainError::InvalidExpression {
        expression: source.to_string(),
        reason: reason.into(),
    }
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "'{s}'"),
            Self::Ident(s) => write!(f, "{s}"),
            Self::Op(op) => write!(f, "{op}"),
        }
    }
}

const OPERATORS: [&str; 18] = [
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "<", ">", "!", "?", ":", "(", ")", ".", "[",
    "]",
];

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Negative number literal, only where a value may start.
        let value_may_start = !matches!(
            tokens.last(),
            Some(Token::Number(_) | Token::Str(_) | Token::Ident(_) | Token::Op(")" | "]"))
        );
        if c.is_ascii_digit()
            || (c == '-' && value_may_start && chars.get(i + 1).is_some_and(char::is_ascii_digit))
        {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let number = text
                .parse::<f64>()
                .map_err(|_| format!("invalid number '{text}'"))?;
            tokens.push(Token::Number(number));
            continue;
        }

        if c == '\'' || c == '"' {
            let quote = c;
            let mut text = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err("unterminated string".into()),
                    Some('\\') => {
                        let escaped = chars.get(i + 1).ok_or("unterminated string")?;
                        text.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => *other,
                        });
                        i += 2;
                    }
                    Some(&ch) if ch == quote => {
                        i += 1;
                        break;
                    }
                    Some(&ch) => {
                        text.push(ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Str(text));
            continue;
        }

        if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
        match OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            Some(op) => {
                tokens.push(Token::Op(op));
                i += op.len();
            }
            None => return Err(format!("unsupported character '{c}'")),
        }
    }

    Ok(tokens)
}

// ============================================================================
// AST + parser
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Option<Value>),
    Identifier(String),
    Member(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    And,
    Or,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Token::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, op: &str) -> Result<(), String> {
        if self.eat(op) {
            Ok(())
        } else {
            match self.peek() {
                Some(token) => Err(format!("expected '{op}', found '{token}'")),
                None => Err(format!("expected '{op}' at end of input")),
            }
        }
    }

    fn ternary(&mut self) -> Result<Expr, String> {
        let condition = self.or()?;
        if self.eat("?") {
            let then = self.ternary()?;
            self.expect(":")?;
            let otherwise = self.ternary()?;
            return Ok(Expr::Ternary(
                Box::new(condition),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(condition)
    }

    fn or(&mut self) -> Result<Expr, String> {
        let mut left = self.and()?;
        while self.eat("||") {
            let right = self.and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, String> {
        let mut left = self.equality()?;
        while self.eat("&&") {
            let right = self.equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, String> {
        let mut left = self.relational()?;
        loop {
            let op = if self.eat("===") {
                BinaryOp::StrictEq
            } else if self.eat("!==") {
                BinaryOp::StrictNe
            } else if self.eat("==") {
                BinaryOp::LooseEq
            } else if self.eat("!=") {
                BinaryOp::LooseNe
            } else {
                return Ok(left);
            };
            let right = self.relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn relational(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        loop {
            let op = if self.eat("<=") {
                BinaryOp::Le
            } else if self.eat(">=") {
                BinaryOp::Ge
            } else if self.eat("<") {
                BinaryOp::Lt
            } else if self.eat(">") {
                BinaryOp::Gt
            } else {
                return Ok(left);
            };
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat("!") {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.member()
    }

    fn member(&mut self) -> Result<Expr, String> {
        let mut target = self.primary()?;
        loop {
            if self.eat(".") {
                match self.tokens.get(self.pos).cloned() {
                    Some(Token::Ident(name)) => {
                        self.pos += 1;
                        target = Expr::Member(
                            Box::new(target),
                            Box::new(Expr::Literal(Some(Value::String(name)))),
                        );
                    }
                    Some(Token::Number(n)) if n.fract() == 0.0 && n >= 0.0 => {
                        self.pos += 1;
                        target = Expr::Member(
                            Box::new(target),
                            Box::new(Expr::Literal(Some(Value::from(n as u64)))),
                        );
                    }
                    _ => return Err("expected property name after '.'".into()),
                }
            } else if self.eat("[") {
                let index = self.ternary()?;
                self.expect("]")?;
                target = Expr::Member(Box::new(target), Box::new(index));
            } else {
                return Ok(target);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or("unexpected end of input")?;
        self.pos += 1;

        match token {
            Token::Number(n) => Ok(Expr::Literal(Some(number(n)))),
            Token::Str(s) => Ok(Expr::Literal(Some(Value::String(s)))),
            Token::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Some(Value::Bool(true))),
                "false" => Expr::Literal(Some(Value::Bool(false))),
                "null" => Expr::Literal(Some(Value::Null)),
                "undefined" => Expr::Literal(None),
                _ => Expr::Identifier(name),
            }),
            Token::Op("(") => {
                let inner = self.ternary()?;
                self.expect(")")?;
                Ok(inner)
            }
            Token::Op(op) => Err(format!("unexpected '{op}'")),
        }
    }
}

fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

// ============================================================================
// Evaluation
// ============================================================================

fn eval(expr: &Expr, ctx: &ResolutionContext) -> Option<Value> {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Identifier(name) => ctx.get(name).cloned(),
        Expr::Member(target, key) => {
            let target = eval(target, ctx)?;
            let key = eval(key, ctx)?;
            match (&target, &key) {
                (Value::Object(map), Value::String(k)) => map.get(k).cloned(),
                (Value::Array(items), Value::Number(n)) => {
                    items.get(n.as_u64()? as usize).cloned()
                }
                (Value::Array(items), Value::String(k)) if k == "length" => {
                    Some(Value::from(items.len()))
                }
                (Value::String(s), Value::String(k)) if k == "length" => {
                    Some(Value::from(s.chars().count()))
                }
                _ => None,
            }
        }
        Expr::Not(inner) => Some(Value::Bool(!truthy(eval(inner, ctx).as_ref()))),
        Expr::Ternary(condition, then, otherwise) => {
            if truthy(eval(condition, ctx).as_ref()) {
                eval(then, ctx)
            } else {
                eval(otherwise, ctx)
            }
        }
        Expr::Binary(op, left, right) => {
            let lhs = eval(left, ctx);
            match op {
                BinaryOp::And => {
                    if truthy(lhs.as_ref()) {
                        eval(right, ctx)
                    } else {
                        lhs
                    }
                }
                BinaryOp::Or => {
                    if truthy(lhs.as_ref()) {
                        lhs
                    } else {
                        eval(right, ctx)
                    }
                }
                _ => {
                    let rhs = eval(right, ctx);
                    Some(Value::Bool(compare(*op, lhs.as_ref(), rhs.as_ref())))
                }
            }
        }
    }
}

fn compare(op: BinaryOp, lhs: Option<&Value>, rhs: Option<&Value>) -> bool {
    match op {
        BinaryOp::StrictEq => strict_eq(lhs, rhs),
        BinaryOp::StrictNe => !strict_eq(lhs, rhs),
        BinaryOp::LooseEq => loose_eq(lhs, rhs),
        BinaryOp::LooseNe => !loose_eq(lhs, rhs),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (lhs, rhs) {
                (Some(Value::String(a)), Some(Value::String(b))) => a.partial_cmp(b),
                _ => to_number(lhs).partial_cmp(&to_number(rhs)),
            };
            match ordering {
                None => false,
                Some(ordering) => match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
            }
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("logical operators short-circuit in eval"),
    }
}

fn strict_eq(lhs: Option<&Value>, rhs: Option<&Value>) -> bool {
    match (lhs, rhs) {
        (None, None) => true,
        (Some(Value::Number(a)), Some(Value::Number(b))) => a.as_f64() == b.as_f64(),
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn loose_eq(lhs: Option<&Value>, rhs: Option<&Value>) -> bool {
    match (lhs, rhs) {
        (None | Some(Value::Null), None | Some(Value::Null)) => true,
        (None | Some(Value::Null), _) | (_, None | Some(Value::Null)) => false,
        (Some(Value::String(a)), Some(Value::String(b))) => a == b,
        (Some(a @ (Value::Number(_) | Value::String(_) | Value::Bool(_))), Some(b))
            if matches!(b, Value::Number(_) | Value::String(_) | Value::Bool(_)) =>
        {
            let (x, y) = (to_number(Some(a)), to_number(Some(b)));
            !x.is_nan() && x == y
        }
        (Some(a), Some(b)) => a == b,
    }
}

fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) if s.trim().is_empty() => 0.0,
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        Some(_) => f64::NAN,
    }
}

/// JavaScript-style truthiness; `None` is `undefined`.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

fn collect_references(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Identifier(name) => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        Expr::Member(target, key) => {
            collect_references(target, out);
            collect_references(key, out);
        }
        Expr::Not(inner) => collect_references(inner, out),
        Expr::Binary(_, l, r) => {
            collect_references(l, out);
            collect_references(r, out);
        }
        Expr::Ternary(c, t, f) => {
            collect_references(c, out);
            collect_references(t, out);
            collect_references(f, out);
        }
    }
}

/// Default [`ConditionEvaluator`]: parse with the restricted grammar, then
/// evaluate. Nothing is cached; conditions are short.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestrictedEvaluator;

impl ConditionEvaluator for RestrictedEvaluator {
    fn evaluate(&self, condition: &str, ctx: &ResolutionContext) -> Result<bool, DomainError> {
        Ok(Expression::parse(condition)?.is_true(ctx))
    }

    fn evaluate_value(
        &self,
        condition: &str,
        ctx: &ResolutionContext,
    ) -> Result<Option<Value>, DomainError> {
        Ok(Expression::parse(condition)?.evaluate(ctx))
    }

    fn references(&self, condition: &str) -> Result<Vec<String>, DomainError> {
        Ok(Expression::parse(condition)?.references())
    }
}
