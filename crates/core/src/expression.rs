// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Resource requirement expressions.
//!
//! A job's `requires` field is a program of one expression per line; the
//! job is eligible only when every expression holds against the resource
//! map. Each expression references one or more resource jobs through
//! `resource_id.attribute` terms.

use crate::id::{qualify, JobId};
use crate::resource::{Resource, ResourceMap};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Syntax error in a requirement expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid requirement {text:?}: {message}")]
pub struct ExpressionError {
    pub text: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Number(f64),
}

/// `resource_id.attribute`
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRef {
    pub resource_id: JobId,
    pub attribute: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Not(Box<Expr>),
    Compare { reference: AttributeRef, op: CompareOp, value: Literal },
    In { reference: AttributeRef, values: Vec<Literal> },
}

/// One line of a requirement program.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceExpression {
    text: String,
    expr: Expr,
    resource_ids: Vec<JobId>,
}

impl ResourceExpression {
    /// Parse one expression, qualifying resource ids with `namespace`.
    pub fn parse(text: &str, namespace: Option<&str>) -> Result<Self, ExpressionError> {
        let text = text.trim();
        let tokens = tokenize(text).map_err(|message| ExpressionError { text: text.to_string(), message })?;
        let mut parser = Parser { tokens, pos: 0, namespace };
        let expr = parser.expr().map_err(|message| ExpressionError { text: text.to_string(), message })?;
        if let Some(token) = parser.peek() {
            return Err(ExpressionError {
                text: text.to_string(),
                message: format!("unexpected trailing {token}"),
            });
        }
        let mut resource_ids = Vec::new();
        collect_ids(&expr, &mut resource_ids);
        Ok(Self { text: text.to_string(), expr, resource_ids })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Referenced resource ids in order of first appearance.
    pub fn resource_ids(&self) -> &[JobId] {
        &self.resource_ids
    }
}

impl fmt::Display for ResourceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// All expressions of a `requires` field.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementProgram {
    expressions: Vec<ResourceExpression>,
}

impl RequirementProgram {
    pub fn parse(text: &str, namespace: Option<&str>) -> Result<Self, ExpressionError> {
        let expressions = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| ResourceExpression::parse(line, namespace))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { expressions })
    }

    pub fn expressions(&self) -> &[ResourceExpression] {
        &self.expressions
    }

    /// Every resource id referenced by any expression.
    pub fn resource_ids(&self) -> BTreeSet<JobId> {
        self.expressions.iter().flat_map(|e| e.resource_ids().iter().cloned()).collect()
    }
}

/// Result of evaluating one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Satisfied,
    Unsatisfied,
    /// Some referenced resource has not been produced yet.
    CannotEvaluate { missing: Vec<JobId> },
}

/// Evaluates requirement expressions against resource facts.
pub trait RequirementEvaluator: Send + Sync {
    fn evaluate(&self, expression: &ResourceExpression, resources: &ResourceMap) -> Evaluation;
}

/// Evaluator for the built-in expression grammar.
///
/// An expression holds when some combination of records, one per
/// referenced resource id, satisfies it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleEvaluator;

impl RequirementEvaluator for SimpleEvaluator {
    fn evaluate(&self, expression: &ResourceExpression, resources: &ResourceMap) -> Evaluation {
        let missing: Vec<JobId> = expression
            .resource_ids()
            .iter()
            .filter(|id| !resources.contains(id.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Evaluation::CannotEvaluate { missing };
        }

        let pools: Vec<&[Resource]> = expression
            .resource_ids()
            .iter()
            .map(|id| resources.get(id.as_str()).unwrap_or(&[]))
            .collect();
        if pools.iter().any(|pool| pool.is_empty()) {
            return Evaluation::Unsatisfied;
        }

        // Odometer over one record index per referenced id
        let mut cursor = vec![0usize; pools.len()];
        loop {
            let binding = Binding { ids: expression.resource_ids(), pools: &pools, cursor: &cursor };
            if binding.eval(expression.expr()) {
                return Evaluation::Satisfied;
            }
            let mut slot = 0;
            loop {
                if slot == cursor.len() {
                    return Evaluation::Unsatisfied;
                }
                cursor[slot] += 1;
                if cursor[slot] < pools[slot].len() {
                    break;
                }
                cursor[slot] = 0;
                slot += 1;
            }
        }
    }
}

struct Binding<'a> {
    ids: &'a [JobId],
    pools: &'a [&'a [Resource]],
    cursor: &'a [usize],
}

impl Binding<'_> {
    fn value(&self, reference: &AttributeRef) -> Option<&str> {
        let slot = self.ids.iter().position(|id| *id == reference.resource_id)?;
        self.pools.get(slot)?.get(*self.cursor.get(slot)?)?.get(&reference.attribute)
    }

    fn eval(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Or(items) => items.iter().any(|e| self.eval(e)),
            Expr::And(items) => items.iter().all(|e| self.eval(e)),
            Expr::Not(inner) => !self.eval(inner),
            Expr::Compare { reference, op, value } => {
                self.value(reference).is_some_and(|actual| compare(actual, *op, value))
            }
            Expr::In { reference, values } => self
                .value(reference)
                .is_some_and(|actual| values.iter().any(|v| compare(actual, CompareOp::Eq, v))),
        }
    }
}

fn compare(actual: &str, op: CompareOp, expected: &Literal) -> bool {
    match (op, expected) {
        (CompareOp::Eq, Literal::Str(s)) => actual == s.as_str(),
        (CompareOp::Ne, Literal::Str(s)) => actual != s.as_str(),
        _ => {
            let rhs = match expected {
                Literal::Number(n) => *n,
                Literal::Str(s) => match s.trim().parse::<f64>() {
                    Ok(n) => n,
                    Err(_) => return false,
                },
            };
            let Ok(lhs) = actual.trim().parse::<f64>() else {
                return false;
            };
            match op {
                CompareOp::Eq => lhs == rhs,
                CompareOp::Ne => lhs != rhs,
                CompareOp::Lt => lhs < rhs,
                CompareOp::Le => lhs <= rhs,
                CompareOp::Gt => lhs > rhs,
                CompareOp::Ge => lhs >= rhs,
            }
        }
    }
}

fn collect_ids(expr: &Expr, out: &mut Vec<JobId>) {
    match expr {
        Expr::Or(items) | Expr::And(items) => items.iter().for_each(|e| collect_ids(e, out)),
        Expr::Not(inner) => collect_ids(inner, out),
        Expr::Compare { reference, .. } | Expr::In { reference, .. } => {
            if !out.contains(&reference.resource_id) {
                out.push(reference.resource_id.clone());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Op(CompareOp),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "{w:?}"),
            Token::Str(s) => write!(f, "string {s:?}"),
            Token::Op(op) => write!(f, "operator {op:?}"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::Comma => f.write_str("','"),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '/' | '+')
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | '[' | ']' | ',' => {
                chars.next();
                tokens.push(match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    _ => Token::Comma,
                });
            }
            '\'' | '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, ch)) if ch == c => break,
                        Some((_, ch)) => value.push(ch),
                        None => return Err(format!("unterminated string at offset {start}")),
                    }
                }
                tokens.push(Token::Str(value));
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let eq = chars.next_if(|&(_, ch)| ch == '=').is_some();
                let op = match (c, eq) {
                    ('=', true) => CompareOp::Eq,
                    ('!', true) => CompareOp::Ne,
                    ('<', true) => CompareOp::Le,
                    ('<', false) => CompareOp::Lt,
                    ('>', true) => CompareOp::Ge,
                    ('>', false) => CompareOp::Gt,
                    _ => return Err(format!("unexpected {c:?} at offset {start}")),
                };
                tokens.push(Token::Op(op));
            }
            c if is_word_char(c) => {
                let mut word = String::new();
                while let Some((_, ch)) = chars.next_if(|&(_, ch)| is_word_char(ch)) {
                    word.push(ch);
                }
                tokens.push(Token::Word(word));
            }
            other => return Err(format!("unexpected {other:?} at offset {start}")),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    namespace: Option<&'a str>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn keyword(&mut self, kw: &str) -> bool {
        if matches!(self.peek(), Some(Token::Word(w)) if w == kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected {expected}, found {token}")),
            None => Err(format!("expected {expected}, found end of input")),
        }
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut items = vec![self.and()?];
        while self.keyword("or") {
            items.push(self.and()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Expr::Or(items) })
    }

    fn and(&mut self) -> Result<Expr, String> {
        let mut items = vec![self.not()?];
        while self.keyword("and") {
            items.push(self.not()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Expr::And(items) })
    }

    fn not(&mut self) -> Result<Expr, String> {
        if self.keyword("not") {
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Word(word)) => {
                let reference = self.reference(&word)?;
                if self.keyword("in") {
                    self.expect(Token::LBracket)?;
                    let mut values = vec![self.literal()?];
                    while matches!(self.peek(), Some(Token::Comma)) {
                        self.pos += 1;
                        values.push(self.literal()?);
                    }
                    self.expect(Token::RBracket)?;
                    return Ok(Expr::In { reference, values });
                }
                match self.next() {
                    Some(Token::Op(op)) => Ok(Expr::Compare { reference, op, value: self.literal()? }),
                    Some(token) => Err(format!("expected comparison after {word:?}, found {token}")),
                    None => Err(format!("expected comparison after {word:?}")),
                }
            }
            Some(token) => Err(format!("unexpected {token}")),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn reference(&self, word: &str) -> Result<AttributeRef, String> {
        match word.rsplit_once('.') {
            Some((resource, attribute)) if !resource.is_empty() && !attribute.is_empty() => {
                Ok(AttributeRef {
                    resource_id: qualify(self.namespace, resource),
                    attribute: attribute.to_string(),
                })
            }
            _ => Err(format!("expected resource_id.attribute, found {word:?}")),
        }
    }

    fn literal(&mut self) -> Result<Literal, String> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Literal::Str(s)),
            Some(Token::Word(w)) => {
                w.parse::<f64>().map(Literal::Number).map_err(|_| format!("expected literal, found {w:?}"))
            }
            Some(token) => Err(format!("expected literal, found {token}")),
            None => Err("expected literal, found end of input".to_string()),
        }
    }
}

#[cfg(test)]
#[path = "expression_tests.rs"]
mod tests;
