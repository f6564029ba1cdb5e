//! Parser for the SQL dialect the emulator executes.
//!
//! The accepted grammar covers what the query translator emits plus the fixed count
//! and page queries:
//!
//! ```text
//! query      := SELECT projection FROM alias [WHERE expr]
//!               [ORDER BY path [ASC | DESC]] [OFFSET int LIMIT int]
//! projection := * | COUNT ( 1 ) [AS ident]
//! expr       := and (OR and)*
//! and        := unary (AND unary)*
//! unary      := NOT unary | operand [cmp operand]
//! operand    := ( expr ) | function ( expr, ... ) | path | @param | literal
//! path       := alias (. ident | [ "string" ])*
//! ```
//!
//! Keywords and function names are case-insensitive. Parameters are substituted
//! while parsing, so an unbound `@name` is rejected before any row is read.

use bson::Bson;

use cosmolayer_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::SortDirection,
    translate::{QueryDefinition, QueryParameter},
};

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// Built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    StartsWith,
    EndsWith,
    Contains,
    ArrayContains,
    IsDefined,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "STARTSWITH" => Some(Function::StartsWith),
            "ENDSWITH" => Some(Function::EndsWith),
            "CONTAINS" => Some(Function::Contains),
            "ARRAY_CONTAINS" => Some(Function::ArrayContains),
            "IS_DEFINED" => Some(Function::IsDefined),
            _ => None,
        }
    }

    fn arity(&self) -> usize {
        match self {
            Function::IsDefined => 1,
            _ => 2,
        }
    }
}

/// A scalar or boolean expression over one row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    /// Property path below the root alias. Empty means the whole row.
    Path(Vec<String>),
    Literal(Bson),
    Compare(CompareOp, Box<SqlExpr>, Box<SqlExpr>),
    Call(Function, Vec<SqlExpr>),
    And(Box<SqlExpr>, Box<SqlExpr>),
    Or(Box<SqlExpr>, Box<SqlExpr>),
    Not(Box<SqlExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Count { alias: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub path: Vec<String>,
    pub direction: SortDirection,
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub projection: Projection,
    pub filter: Option<SqlExpr>,
    pub order_by: Option<OrderBy>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl SqlQuery {
    /// Parses a query definition, binding its parameters.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::BadRequest`] for syntax errors, unknown functions,
    /// unbound parameters and paths not rooted at the `FROM` alias.
    pub fn parse(definition: &QueryDefinition) -> DocumentStoreResult<Self> {
        let tokens = tokenize(&definition.text)?;

        Parser { tokens, pos: 0, parameters: &definition.parameters, alias: String::new() }.query()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Param(String),
    Str(String),
    Int(i64),
    Float(f64),
    Cmp(CompareOp),
    Star,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
}

fn tokenize(text: &str) -> DocumentStoreResult<Vec<Token>> {
    let chars = text.chars().collect::<Vec<_>>();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(&c) = chars.get(pos) {
        let next = chars.get(pos + 1).copied();

        match c {
            c if c.is_whitespace() => pos += 1,
            '*' | '(' | ')' | '[' | ']' | ',' | '.' | '=' => {
                tokens.push(match c {
                    '*' => Token::Star,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    ',' => Token::Comma,
                    '.' => Token::Dot,
                    _ => Token::Cmp(CompareOp::Eq),
                });
                pos += 1;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Cmp(CompareOp::Ne));
                pos += 2;
            }
            '<' | '>' => {
                let (op, width) = match (c, next) {
                    ('<', Some('=')) => (CompareOp::Lte, 2),
                    ('<', Some('>')) => (CompareOp::Ne, 2),
                    ('<', _) => (CompareOp::Lt, 1),
                    (_, Some('=')) => (CompareOp::Gte, 2),
                    _ => (CompareOp::Gt, 1),
                };
                tokens.push(Token::Cmp(op));
                pos += width;
            }
            '\'' | '"' => {
                let mut value = String::new();
                pos += 1;

                loop {
                    match chars.get(pos) {
                        None => return Err(syntax("unterminated string literal")),
                        Some('\\') => {
                            let escaped = chars
                                .get(pos + 1)
                                .ok_or_else(|| syntax("unterminated escape sequence"))?;
                            value.push(*escaped);
                            pos += 2;
                        }
                        Some(&quote) if quote == c => {
                            pos += 1;
                            break;
                        }
                        Some(&other) => {
                            value.push(other);
                            pos += 1;
                        }
                    }
                }

                tokens.push(Token::Str(value));
            }
            '@' => {
                let start = pos;
                pos += 1;
                while chars.get(pos).is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_') {
                    pos += 1;
                }
                if pos == start + 1 {
                    return Err(syntax("parameter name expected after `@`"));
                }
                tokens.push(Token::Param(chars[start..pos].iter().collect()));
            }
            c if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = pos;
                pos += 1;
                while chars.get(pos).is_some_and(|c| c.is_ascii_digit() || *c == '.') {
                    pos += 1;
                }

                let literal = chars[start..pos].iter().collect::<String>();
                tokens.push(if literal.contains('.') {
                    Token::Float(literal.parse().map_err(|_| syntax(&format!("invalid number `{literal}`")))?)
                } else {
                    Token::Int(literal.parse().map_err(|_| syntax(&format!("invalid number `{literal}`")))?)
                });
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = pos;
                while chars.get(pos).is_some_and(|c| c.is_alphanumeric() || *c == '_') {
                    pos += 1;
                }
                tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            }
            other => return Err(syntax(&format!("unexpected character `{other}`"))),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    parameters: &'a [QueryParameter],
    alias: String,
}

impl Parser<'_> {
    fn query(mut self) -> DocumentStoreResult<SqlQuery> {
        self.expect_keyword("SELECT")?;

        let projection = if self.eat(&Token::Star) {
            Projection::All
        } else if self.eat_keyword("COUNT") {
            self.expect(&Token::LParen)?;
            match self.advance() {
                Some(Token::Int(_)) | Some(Token::Star) => {}
                other => return Err(syntax(&format!("unexpected count argument {other:?}"))),
            }
            self.expect(&Token::RParen)?;

            let alias = if self.eat_keyword("AS") { self.ident()? } else { "$1".to_string() };
            Projection::Count { alias }
        } else {
            return Err(syntax("only `SELECT *` and `SELECT COUNT(1)` are supported"));
        };

        self.expect_keyword("FROM")?;
        self.alias = self.ident()?;

        let filter = if self.eat_keyword("WHERE") { Some(self.or()?) } else { None };

        let order_by = if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            let path = match self.operand()? {
                SqlExpr::Path(path) => path,
                other => return Err(syntax(&format!("ORDER BY expects a property path, got {other:?}"))),
            };
            let direction = if self.eat_keyword("DESC") {
                SortDirection::Desc
            } else {
                self.eat_keyword("ASC");
                SortDirection::Asc
            };
            Some(OrderBy { path, direction })
        } else {
            None
        };

        let (offset, limit) = if self.eat_keyword("OFFSET") {
            let offset = self.count_literal()?;
            self.expect_keyword("LIMIT")?;
            (Some(offset), Some(self.count_literal()?))
        } else {
            (None, None)
        };

        if let Some(token) = self.peek() {
            return Err(syntax(&format!("unexpected trailing token {token:?}")));
        }

        Ok(SqlQuery { projection, filter, order_by, offset, limit })
    }

    fn or(&mut self) -> DocumentStoreResult<SqlExpr> {
        let mut expr = self.and()?;
        while self.eat_keyword("OR") {
            expr = SqlExpr::Or(Box::new(expr), Box::new(self.and()?));
        }
        Ok(expr)
    }

    fn and(&mut self) -> DocumentStoreResult<SqlExpr> {
        let mut expr = self.unary()?;
        while self.eat_keyword("AND") {
            expr = SqlExpr::And(Box::new(expr), Box::new(self.unary()?));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> DocumentStoreResult<SqlExpr> {
        if self.eat_keyword("NOT") {
            return Ok(SqlExpr::Not(Box::new(self.unary()?)));
        }

        let left = self.operand()?;
        match self.peek() {
            Some(Token::Cmp(op)) => {
                let op = *op;
                self.pos += 1;
                Ok(SqlExpr::Compare(op, Box::new(left), Box::new(self.operand()?)))
            }
            _ => Ok(left),
        }
    }

    fn operand(&mut self) -> DocumentStoreResult<SqlExpr> {
        match self.advance() {
            Some(Token::LParen) => {
                let inner = self.or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Param(name)) => self.parameters
                .iter()
                .find(|parameter| parameter.name == name)
                .map(|parameter| SqlExpr::Literal(parameter.value.clone()))
                .ok_or_else(|| syntax(&format!("parameter {name} is not bound"))),
            Some(Token::Str(value)) => Ok(SqlExpr::Literal(Bson::String(value))),
            Some(Token::Int(value)) => Ok(SqlExpr::Literal(Bson::Int64(value))),
            Some(Token::Float(value)) => Ok(SqlExpr::Literal(Bson::Double(value))),
            Some(Token::Ident(name)) => match name.to_ascii_uppercase().as_str() {
                "TRUE" => Ok(SqlExpr::Literal(Bson::Boolean(true))),
                "FALSE" => Ok(SqlExpr::Literal(Bson::Boolean(false))),
                "NULL" => Ok(SqlExpr::Literal(Bson::Null)),
                _ if self.peek() == Some(&Token::LParen) => self.call(&name),
                _ => self.path(name),
            },
            other => Err(syntax(&format!("expected an operand, got {other:?}"))),
        }
    }

    fn call(&mut self, name: &str) -> DocumentStoreResult<SqlExpr> {
        let function = Function::from_name(name)
            .ok_or_else(|| syntax(&format!("unknown function `{name}`")))?;

        self.expect(&Token::LParen)?;
        let mut args = vec![self.or()?];
        while self.eat(&Token::Comma) {
            args.push(self.or()?);
        }
        self.expect(&Token::RParen)?;

        if args.len() != function.arity() {
            return Err(syntax(&format!(
                "{function:?} takes {} argument(s), got {}",
                function.arity(),
                args.len(),
            )));
        }

        Ok(SqlExpr::Call(function, args))
    }

    fn path(&mut self, root: String) -> DocumentStoreResult<SqlExpr> {
        if root != self.alias {
            return Err(syntax(&format!("identifier `{root}` is not the query alias `{}`", self.alias)));
        }

        let mut segments = Vec::new();
        loop {
            if self.eat(&Token::Dot) {
                segments.push(self.ident()?);
            } else if self.eat(&Token::LBracket) {
                match self.advance() {
                    Some(Token::Str(segment)) => segments.push(segment),
                    Some(Token::Int(index)) => segments.push(index.to_string()),
                    other => return Err(syntax(&format!("expected a property name, got {other:?}"))),
                }
                self.expect(&Token::RBracket)?;
            } else {
                return Ok(SqlExpr::Path(segments));
            }
        }
    }

    fn count_literal(&mut self) -> DocumentStoreResult<usize> {
        match self.advance() {
            Some(Token::Int(value)) if value >= 0 => Ok(value as usize),
            other => Err(syntax(&format!("expected a non-negative integer, got {other:?}"))),
        }
    }

    fn ident(&mut self) -> DocumentStoreResult<String> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            other => Err(syntax(&format!("expected an identifier, got {other:?}"))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Ident(name)) if name.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, token: &Token) -> DocumentStoreResult<()> {
        if self.eat(token) {
            return Ok(());
        }
        Err(syntax(&format!("expected {token:?}, got {:?}", self.peek())))
    }

    fn expect_keyword(&mut self, keyword: &str) -> DocumentStoreResult<()> {
        if self.eat_keyword(keyword) {
            return Ok(());
        }
        Err(syntax(&format!("expected {keyword}, got {:?}", self.peek())))
    }
}

fn syntax(reason: &str) -> DocumentStoreError {
    DocumentStoreError::BadRequest(format!("query syntax error: {reason}"))
}
