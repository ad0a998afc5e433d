/*!
 * Parser
 * Recursive-descent parser producing a `Program`
 */

use super::ast::*;
use super::error::{ScriptError, ScriptResult};
use super::lexer::{Token, TokenKind};
use crate::core::limits::MAX_SCRIPT_NESTING;
use std::sync::Arc;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// `tokens` must end with `Eof`, as produced by `tokenize`
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    pub fn parse_program(mut self) -> ScriptResult<Program> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::Eof) {
            body.push(self.statement()?);
        }
        Ok(Program {
            body: Arc::new(body),
        })
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn peek(&self) -> &Token {
        // Eof is always last and never consumed
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> ScriptResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> ScriptError {
        let token = self.peek();
        let found = match &token.kind {
            TokenKind::Eof => "end of input".to_string(),
            other => format!("{:?}", other),
        };
        ScriptError::Syntax {
            line: token.line,
            column: token.column,
            message: format!("expected {}, found {}", what, found),
        }
    }

    fn identifier(&mut self, what: &str) -> ScriptResult<String> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// Enter one nesting level; every nested statement, operand and chain
    /// link counts, so the depth of the resulting tree stays bounded
    fn descend(&mut self) -> ScriptResult<()> {
        self.depth += 1;
        if self.depth > MAX_SCRIPT_NESTING {
            let token = self.peek();
            return Err(ScriptError::Syntax {
                line: token.line,
                column: token.column,
                message: format!("nesting deeper than {} levels", MAX_SCRIPT_NESTING),
            });
        }
        Ok(())
    }

    fn ascend(&mut self, levels: usize) {
        self.depth -= levels;
    }

    /// Optional `;`, with a lenient stand-in for automatic insertion
    fn end_statement(&mut self) {
        self.eat(&TokenKind::Semicolon);
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn statement(&mut self) -> ScriptResult<Stmt> {
        self.descend()?;
        let stmt = self.statement_body();
        self.ascend(1);
        stmt
    }

    fn statement_body(&mut self) -> ScriptResult<Stmt> {
        match self.peek().kind {
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Empty)
            }
            TokenKind::LBrace => Ok(Stmt::Block(self.block()?)),
            TokenKind::Var | TokenKind::Let | TokenKind::Const => self.declaration(),
            TokenKind::If => self.if_statement(),
            TokenKind::Try => self.try_statement(),
            TokenKind::Throw => {
                self.advance();
                let value = self.expression()?;
                self.end_statement();
                Ok(Stmt::Throw(value))
            }
            TokenKind::Return => {
                self.advance();
                let value = if matches!(
                    self.peek().kind,
                    TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
                ) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.end_statement();
                Ok(Stmt::Return(value))
            }
            _ => {
                let expr = self.expression()?;
                self.end_statement();
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn block(&mut self) -> ScriptResult<Vec<Stmt>> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(body)
    }

    fn declaration(&mut self) -> ScriptResult<Stmt> {
        self.advance();
        let name = self.identifier("variable name")?;
        let init = if self.eat(&TokenKind::Assign) {
            Some(self.expression()?)
        } else {
            None
        };
        self.end_statement();
        Ok(Stmt::Declare { name, init })
    }

    fn if_statement(&mut self) -> ScriptResult<Stmt> {
        self.advance();
        self.expect(&TokenKind::LParen, "'(' after if")?;
        let cond = self.expression()?;
        self.expect(&TokenKind::RParen, "')'")?;
        let then = Box::new(self.statement()?);
        let otherwise = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then,
            otherwise,
        })
    }

    fn try_statement(&mut self) -> ScriptResult<Stmt> {
        self.advance();
        let body = self.block()?;
        self.expect(&TokenKind::Catch, "'catch'")?;
        let binding = if self.eat(&TokenKind::LParen) {
            let name = self.identifier("catch parameter")?;
            self.expect(&TokenKind::RParen, "')'")?;
            Some(name)
        } else {
            None
        };
        let handler = self.block()?;
        Ok(Stmt::Try {
            body,
            binding,
            handler,
        })
    }

    // =========================================================================
    // Expressions, lowest precedence first
    // =========================================================================

    pub fn expression(&mut self) -> ScriptResult<Expr> {
        self.descend()?;
        let expr = self.assignment();
        self.ascend(1);
        expr
    }

    fn assignment(&mut self) -> ScriptResult<Expr> {
        let target = self.logical_or()?;
        let op = match self.peek().kind {
            TokenKind::Assign => AssignOp::Set,
            TokenKind::PlusAssign => AssignOp::Compound(BinaryOp::Add),
            TokenKind::MinusAssign => AssignOp::Compound(BinaryOp::Sub),
            TokenKind::StarAssign => AssignOp::Compound(BinaryOp::Mul),
            TokenKind::SlashAssign => AssignOp::Compound(BinaryOp::Div),
            _ => return Ok(target),
        };
        if !target.is_assignable() {
            return Err(self.unexpected("assignable target before '='"));
        }
        self.advance();
        let value = self.expression()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn logical_or(&mut self) -> ScriptResult<Expr> {
        let mut left = self.logical_and()?;
        let mut links = 0;
        while self.eat(&TokenKind::OrOr) {
            self.descend()?;
            links += 1;
            let right = self.logical_and()?;
            left = Expr::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        self.ascend(links);
        Ok(left)
    }

    fn logical_and(&mut self) -> ScriptResult<Expr> {
        let mut left = self.equality()?;
        let mut links = 0;
        while self.eat(&TokenKind::AndAnd) {
            self.descend()?;
            links += 1;
            let right = self.equality()?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        self.ascend(links);
        Ok(left)
    }

    fn binary_level(
        &mut self,
        operators: &[(TokenKind, BinaryOp)],
        next: fn(&mut Self) -> ScriptResult<Expr>,
    ) -> ScriptResult<Expr> {
        let mut left = next(self)?;
        let mut links = 0;
        'outer: loop {
            for (token, op) in operators {
                if self.eat(token) {
                    self.descend()?;
                    links += 1;
                    let right = next(self)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            self.ascend(links);
            return Ok(left);
        }
    }

    fn equality(&mut self) -> ScriptResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::StrictEq, BinaryOp::StrictEq),
                (TokenKind::StrictNotEq, BinaryOp::StrictNotEq),
                (TokenKind::Eq, BinaryOp::Eq),
                (TokenKind::NotEq, BinaryOp::NotEq),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> ScriptResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::Lt, BinaryOp::Lt),
                (TokenKind::LtEq, BinaryOp::LtEq),
                (TokenKind::Gt, BinaryOp::Gt),
                (TokenKind::GtEq, BinaryOp::GtEq),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> ScriptResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::Plus, BinaryOp::Add),
                (TokenKind::Minus, BinaryOp::Sub),
            ],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> ScriptResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> ScriptResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Typeof => UnaryOp::Typeof,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let increment = self.advance().kind == TokenKind::PlusPlus;
                self.descend()?;
                let target = self.unary()?;
                self.ascend(1);
                if !target.is_assignable() {
                    return Err(self.unexpected("assignable operand for prefix update"));
                }
                return Ok(Expr::Update {
                    increment,
                    prefix: true,
                    target: Box::new(target),
                });
            }
            _ => return self.postfix(),
        };
        self.advance();
        self.descend()?;
        let operand = self.unary()?;
        self.ascend(1);
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn postfix(&mut self) -> ScriptResult<Expr> {
        let expr = self.call()?;
        let increment = match self.peek().kind {
            TokenKind::PlusPlus => true,
            TokenKind::MinusMinus => false,
            _ => return Ok(expr),
        };
        if !expr.is_assignable() {
            return Ok(expr);
        }
        self.advance();
        Ok(Expr::Update {
            increment,
            prefix: false,
            target: Box::new(expr),
        })
    }

    fn call(&mut self) -> ScriptResult<Expr> {
        let mut expr = self.primary()?;
        let mut links = 0;
        loop {
            if matches!(self.peek().kind, TokenKind::Dot | TokenKind::LParen) {
                self.descend()?;
                links += 1;
            }
            if self.eat(&TokenKind::Dot) {
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(&TokenKind::LParen) {
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.expression()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RParen, "')' after arguments")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                self.ascend(links);
                return Ok(expr);
            }
        }
    }

    /// Property names may be keywords, e.g. `node.class` or `x.type`
    fn property_name(&mut self) -> ScriptResult<String> {
        let name = match &self.peek().kind {
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Var => "var".into(),
            TokenKind::Let => "let".into(),
            TokenKind::Const => "const".into(),
            TokenKind::If => "if".into(),
            TokenKind::Else => "else".into(),
            TokenKind::Try => "try".into(),
            TokenKind::Catch => "catch".into(),
            TokenKind::Throw => "throw".into(),
            TokenKind::Return => "return".into(),
            TokenKind::True => "true".into(),
            TokenKind::False => "false".into(),
            TokenKind::Null => "null".into(),
            TokenKind::Undefined => "undefined".into(),
            TokenKind::This => "this".into(),
            TokenKind::Typeof => "typeof".into(),
            TokenKind::Reserved(word) => word.clone(),
            _ => return Err(self.unexpected("property name after '.'")),
        };
        self.advance();
        Ok(name)
    }

    fn primary(&mut self) -> ScriptResult<Expr> {
        let token = self.peek().clone();
        let expr = match token.kind {
            TokenKind::Number(n) => Expr::Literal(Literal::Number(n)),
            TokenKind::Str(s) => Expr::Literal(Literal::Str(s)),
            TokenKind::True => Expr::Literal(Literal::Bool(true)),
            TokenKind::False => Expr::Literal(Literal::Bool(false)),
            TokenKind::Null => Expr::Literal(Literal::Null),
            TokenKind::Undefined => Expr::Literal(Literal::Undefined),
            TokenKind::This => Expr::This,
            TokenKind::Ident(name) => Expr::Ident(name),
            TokenKind::Reserved(word) => {
                return Err(ScriptError::Syntax {
                    line: token.line,
                    column: token.column,
                    message: format!("'{}' is not supported", word),
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                return Ok(inner);
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(expr)
    }
}
