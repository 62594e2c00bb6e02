//! Recursive-descent parser from tokens to [`super::ast`].

use super::ast::{BinOp, Block, Expr, LogicalOp, PropKey, Stmt, UnOp};
use super::lexer::{Lexer, Token};
use crate::error::EngineError;
use std::rc::Rc;

pub fn parse_program(src: &str) -> Result<Vec<Stmt>, EngineError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut p = Parser { tokens, pos: 0 };
    let mut stmts = Vec::new();
    while !p.at_eof() {
        stmts.push(p.parse_stmt()?);
    }
    Ok(stmts)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

fn fail(msg: impl Into<String>) -> EngineError {
    EngineError::RuleExecutionFailure(msg.into())
}

impl Parser {
    fn at_eof(&self) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token::Eof) | None)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn eat_punct(&mut self, p: &'static str) -> Result<(), EngineError> {
        match self.peek() {
            Token::Punct(q) if *q == p => {
                self.advance();
                Ok(())
            }
            other => Err(fail(format!("expected '{p}', found {other:?}"))),
        }
    }

    fn at_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Token::Punct(q) if *q == p)
    }

    fn at_keyword(&self, k: &str) -> bool {
        matches!(self.peek(), Token::Keyword(q) if *q == k)
    }

    fn eat_keyword(&mut self, k: &'static str) -> Result<(), EngineError> {
        match self.peek() {
            Token::Keyword(q) if *q == k => {
                self.advance();
                Ok(())
            }
            other => Err(fail(format!("expected keyword '{k}', found {other:?}"))),
        }
    }

    fn eat_ident(&mut self) -> Result<String, EngineError> {
        match self.advance() {
            Token::Ident(s) => Ok(s),
            other => Err(fail(format!("expected identifier, found {other:?}"))),
        }
    }

    /// Consume a trailing `;` if present — the guest dialect treats
    /// semicolons as optional statement separators.
    fn eat_semi_opt(&mut self) {
        if self.at_punct(";") {
            self.advance();
        }
    }

    fn parse_stmt(&mut self) -> Result<Stmt, EngineError> {
        match self.peek().clone() {
            Token::Keyword("function") => self.parse_function_decl(),
            Token::Keyword("let") | Token::Keyword("const") | Token::Keyword("var") => {
                self.parse_var_decl()
            }
            Token::Keyword("if") => self.parse_if(),
            Token::Keyword("while") => self.parse_while(),
            Token::Keyword("for") => self.parse_for(),
            Token::Keyword("return") => {
                self.advance();
                if self.at_punct(";") || self.at_punct("}") || self.at_eof() {
                    self.eat_semi_opt();
                    Ok(Stmt::Return(None))
                } else {
                    let e = self.parse_expr()?;
                    self.eat_semi_opt();
                    Ok(Stmt::Return(Some(e)))
                }
            }
            Token::Keyword("break") => {
                self.advance();
                self.eat_semi_opt();
                Ok(Stmt::Break)
            }
            Token::Keyword("continue") => {
                self.advance();
                self.eat_semi_opt();
                Ok(Stmt::Continue)
            }
            Token::Punct("{") => {
                let block = self.parse_block()?;
                Ok(Stmt::Block(block))
            }
            _ => {
                let e = self.parse_expr()?;
                self.eat_semi_opt();
                Ok(Stmt::Expr(e))
            }
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, EngineError> {
        self.eat_punct("{")?;
        let mut stmts = Vec::new();
        while !self.at_punct("}") {
            if self.at_eof() {
                return Err(fail("unexpected end of program inside block"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.eat_punct("}")?;
        Ok(stmts)
    }

    fn parse_function_decl(&mut self) -> Result<Stmt, EngineError> {
        self.eat_keyword("function")?;
        let name = self.eat_ident()?;
        let params = self.parse_params()?;
        let body: Block = Rc::new(self.parse_block()?);
        Ok(Stmt::FunctionDecl { name, params, body })
    }

    fn parse_params(&mut self) -> Result<Vec<String>, EngineError> {
        self.eat_punct("(")?;
        let mut params = Vec::new();
        while !self.at_punct(")") {
            params.push(self.eat_ident()?);
            if self.at_punct(",") {
                self.advance();
            }
        }
        self.eat_punct(")")?;
        Ok(params)
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, EngineError> {
        self.advance(); // let/const/var
        let name = self.eat_ident()?;
        let init = if self.at_punct("=") {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.eat_semi_opt();
        Ok(Stmt::VarDecl(name, init))
    }

    fn parse_if(&mut self) -> Result<Stmt, EngineError> {
        self.eat_keyword("if")?;
        self.eat_punct("(")?;
        let cond = self.parse_expr()?;
        self.eat_punct(")")?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.at_keyword("else") {
            self.advance();
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::If(cond, then_branch, else_branch))
    }

    fn parse_while(&mut self) -> Result<Stmt, EngineError> {
        self.eat_keyword("while")?;
        self.eat_punct("(")?;
        let cond = self.parse_expr()?;
        self.eat_punct(")")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While(cond, body))
    }

    fn parse_for(&mut self) -> Result<Stmt, EngineError> {
        self.eat_keyword("for")?;
        self.eat_punct("(")?;
        let init = if self.at_punct(";") {
            None
        } else {
            Some(Box::new(match self.peek().clone() {
                Token::Keyword("let") | Token::Keyword("const") | Token::Keyword("var") => {
                    self.parse_var_decl()?
                }
                _ => {
                    let e = self.parse_expr()?;
                    Stmt::Expr(e)
                }
            }))
        };
        self.eat_punct(";")?;
        let test = if self.at_punct(";") {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.eat_punct(";")?;
        let update = if self.at_punct(")") {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.eat_punct(")")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    // ---- expressions, precedence climbing ----

    fn parse_expr(&mut self) -> Result<Expr, EngineError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, EngineError> {
        let left = self.parse_conditional()?;
        if self.at_punct("=") {
            self.advance();
            let right = self.parse_assignment()?;
            match &left {
                Expr::Ident(_) | Expr::Member { .. } => {
                    Ok(Expr::Assign(Box::new(left), Box::new(right)))
                }
                _ => Err(fail("invalid assignment target")),
            }
        } else {
            Ok(left)
        }
    }

    fn parse_conditional(&mut self) -> Result<Expr, EngineError> {
        let cond = self.parse_logical_or()?;
        if self.at_punct("?") {
            self.advance();
            let then_e = self.parse_assignment()?;
            self.eat_punct(":")?;
            let else_e = self.parse_assignment()?;
            Ok(Expr::Conditional(Box::new(cond), Box::new(then_e), Box::new(else_e)))
        } else {
            Ok(cond)
        }
    }

    fn parse_logical_or(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.parse_logical_and()?;
        while self.at_punct("||") {
            self.advance();
            let right = self.parse_logical_and()?;
            left = Expr::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.parse_equality()?;
        while self.at_punct("&&") {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::Punct("===") => BinOp::StrictEq,
                Token::Punct("!==") => BinOp::StrictNotEq,
                Token::Punct("==") => BinOp::Eq,
                Token::Punct("!=") => BinOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Punct("<") => BinOp::Lt,
                Token::Punct("<=") => BinOp::Lte,
                Token::Punct(">") => BinOp::Gt,
                Token::Punct(">=") => BinOp::Gte,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Punct("+") => BinOp::Add,
                Token::Punct("-") => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Punct("*") => BinOp::Mul,
                Token::Punct("/") => BinOp::Div,
                Token::Punct("%") => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, EngineError> {
        if self.at_punct("!") {
            self.advance();
            return Ok(Expr::Unary(UnOp::Not, Box::new(self.parse_unary()?)));
        }
        if self.at_punct("-") {
            self.advance();
            return Ok(Expr::Unary(UnOp::Neg, Box::new(self.parse_unary()?)));
        }
        self.parse_call_member()
    }

    fn parse_call_member(&mut self) -> Result<Expr, EngineError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.at_punct(".") {
                self.advance();
                let name = self.eat_ident()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: PropKey::Ident(name),
                };
            } else if self.at_punct("[") {
                self.advance();
                let idx = self.parse_expr()?;
                self.eat_punct("]")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: PropKey::Computed(Box::new(idx)),
                };
            } else if self.at_punct("(") {
                self.advance();
                let mut args = Vec::new();
                while !self.at_punct(")") {
                    args.push(self.parse_assignment()?);
                    if self.at_punct(",") {
                        self.advance();
                    }
                }
                self.eat_punct(")")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, EngineError> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Keyword("true") => Ok(Expr::Bool(true)),
            Token::Keyword("false") => Ok(Expr::Bool(false)),
            Token::Keyword("null") => Ok(Expr::Null),
            Token::Keyword("undefined") => Ok(Expr::Undefined),
            Token::Keyword("function") => self.parse_function_expr(None),
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::Punct("(") => {
                let e = self.parse_expr()?;
                self.eat_punct(")")?;
                Ok(e)
            }
            Token::Punct("[") => self.parse_array_lit(),
            Token::Punct("{") => self.parse_object_lit(),
            other => Err(fail(format!("unexpected token {other:?} in expression"))),
        }
    }

    fn parse_function_expr(&mut self, name: Option<String>) -> Result<Expr, EngineError> {
        let name = if name.is_none() {
            if let Token::Ident(_) = self.peek() {
                Some(self.eat_ident()?)
            } else {
                None
            }
        } else {
            name
        };
        let params = self.parse_params()?;
        let body: Block = Rc::new(self.parse_block()?);
        Ok(Expr::Function { name, params, body })
    }

    fn parse_array_lit(&mut self) -> Result<Expr, EngineError> {
        let mut items = Vec::new();
        while !self.at_punct("]") {
            items.push(self.parse_assignment()?);
            if self.at_punct(",") {
                self.advance();
            }
        }
        self.eat_punct("]")?;
        Ok(Expr::Array(items))
    }

    fn parse_object_lit(&mut self) -> Result<Expr, EngineError> {
        let mut props = Vec::new();
        while !self.at_punct("}") {
            let key = match self.advance() {
                Token::Ident(s) => PropKey::Ident(s),
                Token::Str(s) => PropKey::Ident(s),
                Token::Punct("[") => {
                    let e = self.parse_expr()?;
                    self.eat_punct("]")?;
                    PropKey::Computed(Box::new(e))
                }
                other => return Err(fail(format!("expected property key, found {other:?}"))),
            };
            self.eat_punct(":")?;
            let value = self.parse_assignment()?;
            props.push((key, value));
            if self.at_punct(",") {
                self.advance();
            }
        }
        self.eat_punct("}")?;
        Ok(Expr::Object(props))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sanity_rule() {
        let prog = parse_program("function main(inp){return inp.length === 1;}").unwrap();
        assert_eq!(prog.len(), 1);
        assert!(matches!(prog[0], Stmt::FunctionDecl { .. }));
    }

    #[test]
    fn parses_while_true_loop() {
        let prog = parse_program("function main(){while(true){}return true;}").unwrap();
        assert_eq!(prog.len(), 1);
    }

    #[test]
    fn rejects_malformed_program() {
        let err = parse_program("function main( { return true; }").unwrap_err();
        assert!(matches!(err, EngineError::RuleExecutionFailure(_)));
    }
}
