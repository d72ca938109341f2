// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Node label selectors
//!
//! Parses the Kubernetes label selector language and evaluates it against node
//! labels on the client side:
//!
//! - `key=value`, `key==value`, `key!=value`
//! - `key in (a, b)`, `key notin (a, b)`
//! - `key` (exists) and `!key` (does not exist)
//! - `key>N`, `key<N` (integer comparison)
//!
//! Comma-separated requirements must all hold. `!=` and `notin` also match
//! nodes that do not carry the key at all, like the API server does.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use super::error::QueryError;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").expect("valid name regex")
});

static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid prefix regex")
});

const MAX_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Equals(String),
    NotEquals(String),
    In(BTreeSet<String>),
    NotIn(BTreeSet<String>),
    Exists,
    DoesNotExist,
    GreaterThan(i64),
    LessThan(i64),
}

/// A single `key <op> values` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub key: String,
    pub operator: Operator,
}

impl Requirement {
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match &self.operator {
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
            Operator::Equals(expected) => value == Some(expected),
            Operator::NotEquals(expected) => value != Some(expected),
            Operator::In(set) => value.is_some_and(|v| set.contains(v)),
            Operator::NotIn(set) => !value.is_some_and(|v| set.contains(v)),
            Operator::GreaterThan(bound) => value
                .and_then(|v| v.parse::<i64>().ok())
                .is_some_and(|v| v > *bound),
            Operator::LessThan(bound) => value
                .and_then(|v| v.parse::<i64>().ok())
                .is_some_and(|v| v < *bound),
        }
    }
}

/// A parsed label selector; all requirements must match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSelector {
    source: String,
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let tokens = tokenize(input);
        let requirements = Parser {
            input,
            tokens,
            pos: 0,
        }
        .parse()?;
        Ok(Self {
            source: input.trim().to_string(),
            requirements,
        })
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// An empty selector matches every node
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl FromStr for LabelSelector {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Comma,
    Equals,
    DoubleEquals,
    NotEquals,
    Bang,
    Open,
    Close,
    Greater,
    Less,
    In,
    NotIn,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "'{}'", s),
            Token::Comma => f.write_str("','"),
            Token::Equals => f.write_str("'='"),
            Token::DoubleEquals => f.write_str("'=='"),
            Token::NotEquals => f.write_str("'!='"),
            Token::Bang => f.write_str("'!'"),
            Token::Open => f.write_str("'('"),
            Token::Close => f.write_str("')'"),
            Token::Greater => f.write_str("'>'"),
            Token::Less => f.write_str("'<'"),
            Token::In => f.write_str("'in'"),
            Token::NotIn => f.write_str("'notin'"),
        }
    }
}

fn is_special(c: char) -> bool {
    matches!(c, ',' | '=' | '!' | '(' | ')' | '>' | '<')
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        chars.next();
        let token = match c {
            ',' => Token::Comma,
            '(' => Token::Open,
            ')' => Token::Close,
            '>' => Token::Greater,
            '<' => Token::Less,
            '=' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    Token::DoubleEquals
                } else {
                    Token::Equals
                }
            }
            '!' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    Token::NotEquals
                } else {
                    Token::Bang
                }
            }
            _ => {
                let mut ident = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || is_special(next) {
                        break;
                    }
                    ident.push(next);
                    chars.next();
                }
                match ident.as_str() {
                    "in" => Token::In,
                    "notin" => Token::NotIn,
                    _ => Token::Ident(ident),
                }
            }
        };
        tokens.push(token);
    }
    tokens
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> QueryError {
        QueryError::predicate(self.input, reason)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn describe(token: Option<&Token>) -> String {
        token.map_or_else(|| "end of input".to_string(), |t| t.to_string())
    }

    fn parse(mut self) -> Result<Vec<Requirement>, QueryError> {
        let mut requirements = Vec::new();
        if self.tokens.is_empty() {
            return Ok(requirements);
        }
        loop {
            requirements.push(self.requirement()?);
            match self.next() {
                None => return Ok(requirements),
                Some(Token::Comma) => continue,
                other => {
                    return Err(self.error(format!(
                        "found {}, expected ',' or end of input",
                        Self::describe(other.as_ref())
                    )));
                }
            }
        }
    }

    fn requirement(&mut self) -> Result<Requirement, QueryError> {
        if self.peek() == Some(&Token::Bang) {
            self.next();
            let key = self.key()?;
            return Ok(Requirement {
                key,
                operator: Operator::DoesNotExist,
            });
        }

        let key = self.key()?;
        let operator = match self.peek() {
            None | Some(Token::Comma) => Operator::Exists,
            Some(Token::Equals) | Some(Token::DoubleEquals) => {
                self.next();
                Operator::Equals(self.single_value()?)
            }
            Some(Token::NotEquals) => {
                self.next();
                Operator::NotEquals(self.single_value()?)
            }
            Some(Token::Greater) => {
                self.next();
                Operator::GreaterThan(self.integer()?)
            }
            Some(Token::Less) => {
                self.next();
                Operator::LessThan(self.integer()?)
            }
            Some(Token::In) => {
                self.next();
                Operator::In(self.value_set()?)
            }
            Some(Token::NotIn) => {
                self.next();
                Operator::NotIn(self.value_set()?)
            }
            Some(other) => {
                return Err(self.error(format!(
                    "found {}, expected an operator (=, ==, !=, in, notin, >, <)",
                    other
                )));
            }
        };
        Ok(Requirement { key, operator })
    }

    fn key(&mut self) -> Result<String, QueryError> {
        match self.next() {
            Some(Token::Ident(key)) => {
                validate_key(&key).map_err(|reason| self.error(reason))?;
                Ok(key)
            }
            other => Err(self.error(format!(
                "found {}, expected a label key",
                Self::describe(other.as_ref())
            ))),
        }
    }

    /// Value after `=` or `!=`; may be empty (`tier=`)
    fn single_value(&mut self) -> Result<String, QueryError> {
        match self.peek() {
            None | Some(Token::Comma) => Ok(String::new()),
            Some(Token::Ident(_)) => {
                let Some(Token::Ident(value)) = self.next() else {
                    unreachable!("peeked an identifier");
                };
                validate_value(&value).map_err(|reason| self.error(reason))?;
                Ok(value)
            }
            Some(other) => Err(self.error(format!("found {}, expected a label value", other))),
        }
    }

    fn integer(&mut self) -> Result<i64, QueryError> {
        match self.next() {
            Some(Token::Ident(value)) => value
                .parse::<i64>()
                .map_err(|_| self.error(format!("'{}' is not an integer", value))),
            other => Err(self.error(format!(
                "found {}, expected an integer",
                Self::describe(other.as_ref())
            ))),
        }
    }

    fn value_set(&mut self) -> Result<BTreeSet<String>, QueryError> {
        match self.next() {
            Some(Token::Open) => {}
            other => {
                return Err(self.error(format!(
                    "found {}, expected '('",
                    Self::describe(other.as_ref())
                )));
            }
        }

        let mut values = BTreeSet::new();
        loop {
            match self.next() {
                Some(Token::Ident(value)) => {
                    validate_value(&value).map_err(|reason| self.error(reason))?;
                    values.insert(value);
                }
                Some(Token::Close) if values.is_empty() => {
                    return Err(self.error("values set for 'in' and 'notin' can't be empty"));
                }
                other => {
                    return Err(self.error(format!(
                        "found {}, expected a label value",
                        Self::describe(other.as_ref())
                    )));
                }
            }
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::Close) => return Ok(values),
                other => {
                    return Err(self.error(format!(
                        "found {}, expected ',' or ')'",
                        Self::describe(other.as_ref())
                    )));
                }
            }
        }
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.len() > MAX_NAME_LEN {
        return Err(format!("'{}' is longer than {} characters", name, MAX_NAME_LEN));
    }
    if !NAME_RE.is_match(name) {
        return Err(format!(
            "'{}' must consist of alphanumerics, '-', '_' or '.', and start and end with an alphanumeric",
            name
        ));
    }
    Ok(())
}

fn validate_key(key: &str) -> Result<(), String> {
    let name = match key.split_once('/') {
        Some((prefix, name)) => {
            if prefix.len() > MAX_PREFIX_LEN || !PREFIX_RE.is_match(prefix) {
                return Err(format!("'{}' is not a valid DNS subdomain prefix", prefix));
            }
            name
        }
        None => key,
    };
    validate_name(name)
}

fn validate_value(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    validate_name(value)
}
