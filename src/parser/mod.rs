//! # Parser Module
//!
//! Recursive descent parser for Kea. Statements and declarations are parsed
//! by dedicated functions; expressions use precedence climbing over the
//! binary operator table. The parser owns the [`TySpecArena`] of the program
//! it produces and interns every type annotation it encounters.
//!
//! Errors are reported to the shared [`DiagnosticEngine`] under the `Parser`
//! phase. After an error the parser synchronizes to the next statement or
//! declaration boundary and keeps going, so a single malformed statement does
//! not hide the rest of the file.

pub mod ast;

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::diagnostics::{DiagnosticEngine, Phase};
use crate::lexer::{Location, Token, TokenKind};

use self::ast::{
    Block, BuiltinTySpec, Expression, Function, Import, Item, Parameter, Program, Statement,
    StructDecl, StructField, TySpecId,
};
use self::ast::{BinaryOperator, UnaryOperator};

static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "fun", "let", "mut", "struct", "return", "if", "else", "while", "for", "import", "extern",
        "true", "false",
    ])
});

pub struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    diagnostics: &'a mut DiagnosticEngine,
    program: Program,
    /// Struct literals are forbidden directly inside `if`/`while`/`for`
    /// conditions, where `name {` must start the body instead.
    struct_literals_allowed: bool,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, diagnostics: &'a mut DiagnosticEngine) -> Self {
        Self {
            tokens,
            position: 0,
            diagnostics,
            program: Program::default(),
            struct_literals_allowed: true,
        }
    }

    pub fn parse(mut self) -> Program {
        while !self.at(TokenKind::Eof) {
            let item = if self.at_keyword("import") {
                self.parse_import().map(Item::Import)
            } else if self.at_keyword("struct") {
                self.parse_struct_decl().map(Item::Struct)
            } else if self.at_keyword("fun") || self.at_keyword("extern") {
                self.parse_function().map(Item::Function)
            } else {
                self.error_at_current(format!(
                    "Expected 'fun', 'struct' or 'import' at top level, found {}",
                    self.describe_current()
                ));
                None
            };

            match item {
                Some(item) => self.program.items.push(item),
                None => self.synchronize_top_level(),
            }
        }

        self.program
    }

    // ----- declarations ---------------------------------------------------

    fn parse_import(&mut self) -> Option<Import> {
        let loc = self.current_location();
        self.advance(); // import

        let path = self.expect(TokenKind::Str, "import path")?;
        self.expect(TokenKind::Semicolon, "';' after import")?;

        Some(Import {
            path: path.lexeme().to_string(),
            loc,
        })
    }

    fn parse_struct_decl(&mut self) -> Option<StructDecl> {
        let loc = self.current_location();
        self.advance(); // struct

        let name = self.expect_identifier("struct name")?;
        self.expect(TokenKind::LBrace, "'{' after struct name")?;

        let mut fields = vec![];
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let field_loc = self.current_location();
            let field_name = self.expect_identifier("field name")?;
            self.expect(TokenKind::Colon, "':' after field name")?;
            let ty = self.parse_type()?;

            fields.push(StructField {
                name: field_name,
                ty,
                loc: field_loc,
            });

            if !self.at(TokenKind::RBrace) {
                self.expect(TokenKind::Comma, "',' between struct fields")?;
            }
        }
        self.expect(TokenKind::RBrace, "'}' after struct fields")?;

        Some(StructDecl { name, fields, loc })
    }

    fn parse_function(&mut self) -> Option<Function> {
        let loc = self.current_location();
        let is_extern = self.at_keyword("extern");
        if is_extern {
            self.advance();
            if !self.at_keyword("fun") {
                self.error_at_current("Expected 'fun' after 'extern'");
                return None;
            }
        }
        self.advance(); // fun

        let name = self.expect_identifier("function name")?;
        self.expect(TokenKind::LParen, "'(' after function name")?;

        let mut params = vec![];
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            let param_loc = self.current_location();
            let param_name = self.expect_identifier("parameter name")?;
            self.expect(TokenKind::Colon, "':' after parameter name")?;
            let ty = self.parse_type()?;

            params.push(Parameter {
                name: param_name,
                ty,
                loc: param_loc,
            });

            if !self.at(TokenKind::RParen) {
                self.expect(TokenKind::Comma, "',' between parameters")?;
            }
        }
        self.expect(TokenKind::RParen, "')' after parameters")?;

        let return_ty = if self.at(TokenKind::ThinArrow) {
            self.advance();
            self.parse_type()?
        } else {
            self.program
                .arena
                .intern_builtin(loc.clone(), BuiltinTySpec::Void)
        };

        let body = if is_extern {
            self.expect(TokenKind::Semicolon, "';' after extern function")?;
            None
        } else {
            Some(self.parse_block()?)
        };

        Some(Function {
            name,
            params,
            return_ty,
            body,
            is_extern,
            loc,
        })
    }

    fn parse_type(&mut self) -> Option<TySpecId> {
        let loc = self.current_location();
        let name = self.expect(TokenKind::Ident, "type name")?;

        let mut ty = match name.lexeme() {
            "int" => self
                .program
                .arena
                .intern_builtin(loc.clone(), BuiltinTySpec::Int),
            "float" => self
                .program
                .arena
                .intern_builtin(loc.clone(), BuiltinTySpec::Float),
            "bool" => self
                .program
                .arena
                .intern_builtin(loc.clone(), BuiltinTySpec::Bool),
            "string" => self
                .program
                .arena
                .intern_builtin(loc.clone(), BuiltinTySpec::String),
            "void" => self
                .program
                .arena
                .intern_builtin(loc.clone(), BuiltinTySpec::Void),
            other => self.program.arena.intern_named(loc.clone(), other),
        };

        while self.at(TokenKind::LBracket) {
            self.advance();
            let size = if self.at(TokenKind::Int) {
                let token = self.advance();
                match token.lexeme().parse::<u64>() {
                    Ok(size) => Some(size),
                    Err(_) => {
                        self.diagnostics.error(
                            Phase::Parser,
                            token.loc.clone(),
                            "Array size out of range",
                        );
                        None
                    }
                }
            } else {
                None
            };
            self.expect(TokenKind::RBracket, "']' in array type")?;
            ty = self.program.arena.intern_array(loc.clone(), ty, size);
        }

        Some(ty)
    }

    // ----- statements -----------------------------------------------------

    fn parse_block(&mut self) -> Option<Block> {
        let loc = self.current_location();
        self.expect(TokenKind::LBrace, "'{'")?;

        let mut statements = vec![];
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            match self.parse_statement() {
                Some(statement) => statements.push(statement),
                None => self.synchronize_statement(),
            }
        }
        self.expect(TokenKind::RBrace, "'}' after block")?;

        Some(Block { statements, loc })
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        if self.at_keyword("let") {
            return self.parse_declaration();
        }
        if self.at_keyword("return") {
            return self.parse_return();
        }
        if self.at_keyword("if") {
            return self.parse_if();
        }
        if self.at_keyword("while") {
            return self.parse_while();
        }
        if self.at_keyword("for") {
            return self.parse_for();
        }
        self.parse_expression_statement()
    }

    fn parse_declaration(&mut self) -> Option<Statement> {
        let loc = self.current_location();
        self.advance(); // let

        let mutable = if self.at_keyword("mut") {
            self.advance();
            true
        } else {
            false
        };

        let name = self.expect_identifier("variable name")?;

        let ty = if self.at(TokenKind::Colon) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };

        let value = if self.at(TokenKind::Equal) {
            self.advance();
            Some(self.parse_expression(0)?)
        } else {
            None
        };

        self.expect(TokenKind::Semicolon, "';' after declaration")?;

        Some(Statement::Declaration {
            name,
            ty,
            value,
            mutable,
            loc,
        })
    }

    fn parse_return(&mut self) -> Option<Statement> {
        let loc = self.current_location();
        self.advance(); // return

        let value = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression(0)?)
        };
        self.expect(TokenKind::Semicolon, "';' after return")?;

        Some(Statement::Return { value, loc })
    }

    fn parse_if(&mut self) -> Option<Statement> {
        let loc = self.current_location();
        self.advance(); // if

        let condition = self.parse_condition()?;
        let then_branch = self.parse_block()?;

        let else_branch = if self.at_keyword("else") {
            self.advance();
            if self.at_keyword("if") {
                // else-if chains desugar into a nested if inside the else block
                let nested_loc = self.current_location();
                let nested = self.parse_if()?;
                Some(Block {
                    statements: vec![nested],
                    loc: nested_loc,
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Some(Statement::If {
            condition,
            then_branch,
            else_branch,
            loc,
        })
    }

    fn parse_while(&mut self) -> Option<Statement> {
        let loc = self.current_location();
        self.advance(); // while

        let condition = self.parse_condition()?;
        let body = self.parse_block()?;

        Some(Statement::While {
            condition,
            body,
            loc,
        })
    }

    fn parse_for(&mut self) -> Option<Statement> {
        let loc = self.current_location();
        self.advance(); // for

        let init = if self.at_keyword("let") {
            self.parse_declaration()?
        } else {
            self.parse_assignment_like(true)?
        };

        let condition = self.parse_condition()?;
        self.expect(TokenKind::Semicolon, "';' after loop condition")?;

        let step = self.parse_assignment_like(false)?;
        let body = self.parse_block()?;

        Some(Statement::For {
            init: Box::new(init),
            condition,
            step: Box::new(step),
            body,
            loc,
        })
    }

    /// Condition position: struct literals would be ambiguous with the
    /// statement body brace, so they are disallowed until the next
    /// parenthesized subexpression.
    fn parse_condition(&mut self) -> Option<Expression> {
        let previous = self.struct_literals_allowed;
        self.struct_literals_allowed = false;
        let condition = self.parse_expression(0);
        self.struct_literals_allowed = previous;
        condition
    }

    /// An assignment or expression statement, optionally consuming the
    /// trailing semicolon (for-loop steps have none).
    fn parse_assignment_like(&mut self, consume_semicolon: bool) -> Option<Statement> {
        let loc = self.current_location();
        let expr = self.parse_expression(0)?;

        let statement = if self.at(TokenKind::Equal) {
            self.advance();
            let value = self.parse_expression(0)?;
            self.assignment_from_target(expr, value, loc)?
        } else {
            Statement::Expr { expr, loc }
        };

        if consume_semicolon {
            self.expect(TokenKind::Semicolon, "';' after statement")?;
        }

        Some(statement)
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        self.parse_assignment_like(true)
    }

    fn assignment_from_target(
        &mut self,
        target: Expression,
        value: Expression,
        loc: Location,
    ) -> Option<Statement> {
        match target {
            Expression::Identifier { name, .. } => Some(Statement::Assignment { name, value, loc }),
            Expression::FieldAccess { object, field, .. } => Some(Statement::FieldAssignment {
                object: *object,
                field,
                value,
                loc,
            }),
            other => {
                self.diagnostics.error(
                    Phase::Parser,
                    other.loc(),
                    "Invalid assignment target",
                );
                None
            }
        }
    }

    // ----- expressions ----------------------------------------------------

    fn binary_operator(&self) -> Option<(BinaryOperator, u8)> {
        let op = match self.current().kind {
            TokenKind::PipePipe => (BinaryOperator::Or, 1),
            TokenKind::AmpAmp => (BinaryOperator::And, 2),
            TokenKind::EqualEqual => (BinaryOperator::Eq, 3),
            TokenKind::NotEqual => (BinaryOperator::Ne, 3),
            TokenKind::Less => (BinaryOperator::Lt, 4),
            TokenKind::LessEqual => (BinaryOperator::Le, 4),
            TokenKind::Greater => (BinaryOperator::Gt, 4),
            TokenKind::GreaterEqual => (BinaryOperator::Ge, 4),
            TokenKind::Plus => (BinaryOperator::Add, 5),
            TokenKind::Minus => (BinaryOperator::Sub, 5),
            TokenKind::Star => (BinaryOperator::Mul, 6),
            TokenKind::Slash => (BinaryOperator::Div, 6),
            TokenKind::Percent => (BinaryOperator::Mod, 6),
            _ => return None,
        };
        Some(op)
    }

    fn parse_expression(&mut self, min_precedence: u8) -> Option<Expression> {
        let mut left = self.parse_unary()?;

        while let Some((op, precedence)) = self.binary_operator() {
            if precedence <= min_precedence {
                break;
            }
            let loc = self.current_location();
            self.advance();
            let right = self.parse_expression(precedence)?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            };
        }

        Some(left)
    }

    fn parse_unary(&mut self) -> Option<Expression> {
        let loc = self.current_location();
        let op = match self.current().kind {
            TokenKind::Minus => Some(UnaryOperator::Neg),
            TokenKind::Bang => Some(UnaryOperator::Not),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Some(Expression::Unary {
                op,
                operand: Box::new(operand),
                loc,
            });
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Option<Expression> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.at(TokenKind::Dot) {
                let loc = self.current_location();
                self.advance();
                let field = self.expect_identifier("field name")?;
                expr = Expression::FieldAccess {
                    object: Box::new(expr),
                    field,
                    loc,
                };
            } else if self.at(TokenKind::LBracket) {
                let loc = self.current_location();
                self.advance();
                let index = self.parse_bracketed(|parser| parser.parse_expression(0))?;
                self.expect(TokenKind::RBracket, "']' after index")?;
                expr = Expression::Index {
                    array: Box::new(expr),
                    index: Box::new(index),
                    loc,
                };
            } else {
                break;
            }
        }

        Some(expr)
    }

    fn parse_primary(&mut self) -> Option<Expression> {
        let loc = self.current_location();

        match self.current().kind {
            TokenKind::Int => {
                let token = self.advance();
                match token.lexeme().parse::<i64>() {
                    Ok(value) => Some(Expression::Integer { value, loc }),
                    Err(_) => {
                        self.diagnostics.error(
                            Phase::Parser,
                            loc,
                            "Integer literal out of range",
                        );
                        None
                    }
                }
            }
            TokenKind::Float => {
                let token = self.advance();
                match token.lexeme().parse::<f64>() {
                    Ok(value) => Some(Expression::Float { value, loc }),
                    Err(_) => {
                        self.diagnostics
                            .error(Phase::Parser, loc, "Float literal out of range");
                        None
                    }
                }
            }
            TokenKind::Str => {
                let token = self.advance();
                Some(Expression::StringLit {
                    value: token.lexeme().to_string(),
                    loc,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_bracketed(|parser| parser.parse_expression(0))?;
                self.expect(TokenKind::RParen, "')' after expression")?;
                Some(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = vec![];
                while !self.at(TokenKind::RBracket) && !self.at(TokenKind::Eof) {
                    let element = self.parse_bracketed(|parser| parser.parse_expression(0))?;
                    elements.push(element);
                    if !self.at(TokenKind::RBracket) {
                        self.expect(TokenKind::Comma, "',' between array elements")?;
                    }
                }
                self.expect(TokenKind::RBracket, "']' after array literal")?;
                Some(Expression::ArrayLit { elements, loc })
            }
            TokenKind::Ident => {
                let token = self.advance();
                let name = token.lexeme().to_string();

                match name.as_str() {
                    "true" => return Some(Expression::Boolean { value: true, loc }),
                    "false" => return Some(Expression::Boolean { value: false, loc }),
                    _ => {}
                }

                if RESERVED_WORDS.contains(name.as_str()) {
                    self.diagnostics.error(
                        Phase::Parser,
                        loc,
                        format!("'{name}' is a reserved word"),
                    );
                    return None;
                }

                if self.at(TokenKind::LParen) {
                    self.advance();
                    let mut arguments = vec![];
                    while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                        let argument = self.parse_bracketed(|parser| parser.parse_expression(0))?;
                        arguments.push(argument);
                        if !self.at(TokenKind::RParen) {
                            self.expect(TokenKind::Comma, "',' between arguments")?;
                        }
                    }
                    self.expect(TokenKind::RParen, "')' after arguments")?;
                    return Some(Expression::Call {
                        callee: name,
                        arguments,
                        loc,
                    });
                }

                if self.struct_literals_allowed && self.at(TokenKind::LBrace) {
                    self.advance();
                    let mut field_values = vec![];
                    while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
                        let value = self.parse_bracketed(|parser| parser.parse_expression(0))?;
                        field_values.push(value);
                        if !self.at(TokenKind::RBrace) {
                            self.expect(TokenKind::Comma, "',' between field values")?;
                        }
                    }
                    self.expect(TokenKind::RBrace, "'}' after struct literal")?;
                    return Some(Expression::StructInit {
                        name,
                        field_values,
                        loc,
                    });
                }

                Some(Expression::Identifier { name, loc })
            }
            _ => {
                self.error_at_current(format!(
                    "Expected expression, found {}",
                    self.describe_current()
                ));
                None
            }
        }
    }

    /// Inside parentheses and brackets struct literals are unambiguous again.
    fn parse_bracketed<T>(&mut self, parse: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let previous = self.struct_literals_allowed;
        self.struct_literals_allowed = true;
        let result = parse(self);
        self.struct_literals_allowed = previous;
        result
    }

    // ----- token plumbing -------------------------------------------------

    fn current(&self) -> &Token {
        self.tokens
            .get(self.position)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with EOF"))
    }

    fn current_location(&self) -> Location {
        self.current().loc.clone()
    }

    fn describe_current(&self) -> String {
        let token = self.current();
        match token.kind {
            TokenKind::Ident => format!("'{}'", token.lexeme()),
            kind => kind.describe().to_string(),
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.current().kind == TokenKind::Ident && self.current().lexeme() == keyword
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        if self.at(kind) {
            return Some(self.advance());
        }
        self.error_at_current(format!(
            "Expected {what}, found {}",
            self.describe_current()
        ));
        None
    }

    fn expect_identifier(&mut self, what: &str) -> Option<String> {
        if !self.at(TokenKind::Ident) {
            self.error_at_current(format!(
                "Expected {what}, found {}",
                self.describe_current()
            ));
            return None;
        }
        let token = self.advance();
        let name = token.lexeme().to_string();
        if RESERVED_WORDS.contains(name.as_str()) {
            self.diagnostics.error(
                Phase::Parser,
                token.loc,
                format!("'{name}' is a reserved word and cannot be used as {what}"),
            );
            return None;
        }
        Some(name)
    }

    fn error_at_current(&mut self, message: impl ToString) {
        let loc = self.current_location();
        self.diagnostics.error(Phase::Parser, loc, message);
    }

    /// Skip to the end of the current statement.
    fn synchronize_statement(&mut self) {
        while !self.at(TokenKind::Eof) {
            if self.at(TokenKind::Semicolon) {
                self.advance();
                return;
            }
            if self.at(TokenKind::RBrace) {
                return;
            }
            self.advance();
        }
    }

    /// Skip to the next top-level declaration.
    fn synchronize_top_level(&mut self) {
        while !self.at(TokenKind::Eof) {
            if self.at_keyword("fun") || self.at_keyword("struct") || self.at_keyword("import") {
                return;
            }
            if self.at(TokenKind::Semicolon) || self.at(TokenKind::RBrace) {
                self.advance();
                return;
            }
            self.advance();
        }
    }
}

/// Lex and parse one source unit in a single step.
pub fn parse_source(
    source: &str,
    file: Option<String>,
    diagnostics: &mut DiagnosticEngine,
) -> Program {
    let tokens = crate::lexer::Lexer::new(source, file).tokenize(diagnostics);
    Parser::new(tokens, diagnostics).parse()
}

#[cfg(test)]
mod tests {
    use super::ast::*;
    use super::*;

    fn parse(input: &str) -> (Program, DiagnosticEngine) {
        let mut diagnostics = DiagnosticEngine::default();
        let program = parse_source(input, None, &mut diagnostics);
        (program, diagnostics)
    }

    #[test]
    fn test_parse_minimal_function() {
        let (program, diagnostics) = parse("fun main() -> int { return 42; }");

        assert!(!diagnostics.has_errors());
        assert_eq!(program.items.len(), 1);

        let function = program.functions().next().expect("one function");
        assert_eq!(function.name, "main");
        assert!(function.params.is_empty());
        assert!(!function.is_extern);
        assert_eq!(program.arena.render(function.return_ty), "int");

        let body = function.body.as_ref().expect("body");
        assert_eq!(body.statements.len(), 1);
        assert!(matches!(
            &body.statements[0],
            Statement::Return {
                value: Some(Expression::Integer { value: 42, .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_struct_decl() {
        let (program, diagnostics) = parse("struct Pt { x: int, y: int }");

        assert!(!diagnostics.has_errors());
        let decl = program.structs().next().expect("one struct");
        assert_eq!(decl.name, "Pt");
        assert_eq!(decl.fields.len(), 2);
        assert_eq!(decl.fields[0].name, "x");
        assert_eq!(program.arena.render(decl.fields[1].ty), "int");
    }

    #[test]
    fn test_parse_extern_function() {
        let (program, diagnostics) = parse("extern fun print(s: string) -> void;");

        assert!(!diagnostics.has_errors());
        let function = program.functions().next().expect("one function");
        assert!(function.is_extern);
        assert!(function.body.is_none());
        assert_eq!(program.arena.render(function.params[0].ty), "string");
    }

    #[test]
    fn test_parse_precedence() {
        let (program, diagnostics) = parse("fun f() -> int { return 1 + 2 * 3; }");

        assert!(!diagnostics.has_errors());
        let function = program.functions().next().unwrap();
        let Statement::Return {
            value: Some(Expression::Binary { op, right, .. }),
            ..
        } = &function.body.as_ref().unwrap().statements[0]
        else {
            panic!("expected return of binary expression");
        };

        assert_eq!(*op, BinaryOperator::Add);
        assert!(matches!(
            right.as_ref(),
            Expression::Binary {
                op: BinaryOperator::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_declaration_with_annotation() {
        let (program, diagnostics) = parse("fun f() -> void { let p: Pt = Pt { 3, 4 }; }");

        assert!(!diagnostics.has_errors());
        let function = program.functions().next().unwrap();
        let Statement::Declaration {
            name,
            ty: Some(ty),
            value: Some(Expression::StructInit { field_values, .. }),
            mutable,
            ..
        } = &function.body.as_ref().unwrap().statements[0]
        else {
            panic!("expected declaration with struct literal");
        };

        assert_eq!(name, "p");
        assert!(!mutable);
        assert_eq!(program.arena.render(*ty), "Pt");
        assert_eq!(field_values.len(), 2);
    }

    #[test]
    fn test_parse_field_access_chain() {
        let (program, diagnostics) = parse("fun f() -> int { return a.b.c; }");

        assert!(!diagnostics.has_errors());
        let function = program.functions().next().unwrap();
        let Statement::Return {
            value: Some(Expression::FieldAccess { object, field, .. }),
            ..
        } = &function.body.as_ref().unwrap().statements[0]
        else {
            panic!("expected field access");
        };

        assert_eq!(field, "c");
        assert!(matches!(
            object.as_ref(),
            Expression::FieldAccess { .. }
        ));
    }

    #[test]
    fn test_parse_if_else() {
        let (program, diagnostics) =
            parse("fun f(x: int) -> int { if x > 0 { return 1; } else { return 2; } }");

        assert!(!diagnostics.has_errors());
        let function = program.functions().next().unwrap();
        let Statement::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } = &function.body.as_ref().unwrap().statements[0]
        else {
            panic!("expected if/else");
        };

        assert_eq!(then_branch.statements.len(), 1);
        assert_eq!(else_branch.statements.len(), 1);
    }

    #[test]
    fn test_struct_literal_not_allowed_in_condition() {
        let (_, diagnostics) = parse("fun f() -> void { if p { 1 } { return; } }");

        // `p { 1 }` must not parse as a struct literal here; the `{` starts
        // the then-block and `1` alone is not a valid statement expression
        // followed by `{`, so this errors somewhere. The point is that the
        // parenthesized form works and the bare form is rejected.
        assert!(diagnostics.has_errors());

        let (program, diagnostics) = parse("fun f() -> void { if (Pt { 1 }).x > 0 { return; } }");
        assert!(!diagnostics.has_errors());
        assert_eq!(program.functions().count(), 1);
    }

    #[test]
    fn test_parse_array_literal_and_index() {
        let (program, diagnostics) = parse("fun f() -> int { let a = [1, 2, 3]; return a[0]; }");

        assert!(!diagnostics.has_errors());
        let function = program.functions().next().unwrap();
        let statements = &function.body.as_ref().unwrap().statements;
        assert!(matches!(
            &statements[0],
            Statement::Declaration {
                value: Some(Expression::ArrayLit { elements, .. }),
                ..
            } if elements.len() == 3
        ));
        assert!(matches!(
            &statements[1],
            Statement::Return {
                value: Some(Expression::Index { .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_array_type_annotation() {
        let (program, diagnostics) = parse("fun f(xs: int[]) -> int[4] { return xs; }");

        assert!(!diagnostics.has_errors());
        let function = program.functions().next().unwrap();
        assert_eq!(program.arena.render(function.params[0].ty), "int[]");
        assert_eq!(program.arena.render(function.return_ty), "int[4]");
    }

    #[test]
    fn test_parse_field_assignment() {
        let (program, diagnostics) = parse("fun f() -> void { p.x = 3; }");

        assert!(!diagnostics.has_errors());
        let function = program.functions().next().unwrap();
        assert!(matches!(
            &function.body.as_ref().unwrap().statements[0],
            Statement::FieldAssignment { field, .. } if field == "x"
        ));
    }

    #[test]
    fn test_parse_error_recovery() {
        let (program, diagnostics) =
            parse("fun f() -> void { let = 3; let x = 4; } fun g() -> void {}");

        assert!(diagnostics.has_errors());
        // both functions survive the bad statement
        assert_eq!(program.functions().count(), 2);
    }

    #[test]
    fn test_parse_import() {
        let (program, diagnostics) = parse("import \"lib/math.kea\";");

        assert!(!diagnostics.has_errors());
        let import = program.imports().next().expect("one import");
        assert_eq!(import.path, "lib/math.kea");
    }

    #[test]
    fn test_parse_while_and_for() {
        let (program, diagnostics) = parse(
            "fun f() -> void { while true { } for let i = 0; i < 10; i = i + 1 { } }",
        );

        assert!(!diagnostics.has_errors());
        let function = program.functions().next().unwrap();
        let statements = &function.body.as_ref().unwrap().statements;
        assert!(matches!(&statements[0], Statement::While { .. }));
        assert!(matches!(&statements[1], Statement::For { .. }));
    }
}
