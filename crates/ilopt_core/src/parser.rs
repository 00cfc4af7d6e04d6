use crate::ast::*;
use crate::diagnostics::{Diagnostic, Span};
use crate::dialect::Dialect;
use crate::intern::Name;
use crate::lexer::{lex, Token, TokenKind};

const MAX_NESTING: usize = 256;

const KEYWORDS: &[&str] = &[
    "let", "function", "if", "switch", "case", "default", "for", "true", "false",
];

/// Parses a whole program (a single root block).
///
/// Returns `None` for the block when a syntax error was found; the reasons
/// are in the diagnostics. Lexer diagnostics come first.
pub fn parse(content: &str, dialect: &Dialect) -> (Option<Block>, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = lex(content);
    let mut parser = Parser::new(tokens, dialect);
    let block = parser.parse_program();
    diagnostics.append(&mut parser.diagnostics);
    if !diagnostics.is_empty() {
        return (None, diagnostics);
    }
    (block, diagnostics)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    dialect: &'a Dialect,
    diagnostics: Vec<Diagnostic>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token>, dialect: &'a Dialect) -> Self {
        Self {
            tokens,
            pos: 0,
            dialect,
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    fn parse_program(&mut self) -> Option<Block> {
        let block = self.parse_block()?;
        if let Some(extra) = self.peek() {
            let span = extra.span;
            self.error("E1008", "unexpected input after the program block", span);
            return None;
        }
        Some(block)
    }

    // -- token helpers --

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_nth_kind(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Identifier && t.text == keyword)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(token)
    }

    fn eof_span(&self) -> Span {
        self.tokens.last().map(|t| t.span).unwrap_or_default()
    }

    fn error(&mut self, code: &str, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::error(code, message, span));
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        match self.peek() {
            Some(token) if token.kind == kind => self.next(),
            Some(token) => {
                let (span, text) = (token.span, token.text.clone());
                self.error("E1006", format!("expected {what}, found `{text}`"), span);
                None
            }
            None => {
                let span = self.eof_span();
                self.error("E1007", format!("expected {what}, found end of input"), span);
                None
            }
        }
    }

    /// An identifier that is neither a keyword nor, when `allow_builtin` is
    /// false, the name of a built-in instruction.
    fn parse_name(&mut self, what: &str, allow_builtin: bool) -> Option<(Name, Span)> {
        let token = self.expect(TokenKind::Identifier, what)?;
        if KEYWORDS.contains(&token.text.as_str()) {
            self.error(
                "E1010",
                format!("keyword `{}` cannot be used as {what}", token.text),
                token.span,
            );
            return None;
        }
        let name = Name::intern(&token.text);
        if !allow_builtin && self.dialect.is_builtin(name) {
            self.error(
                "E1011",
                format!("instruction name `{}` cannot be used as {what}", token.text),
                token.span,
            );
            return None;
        }
        Some((name, token.span))
    }

    fn parse_type_annotation(&mut self) -> Option<Option<Name>> {
        if !self.dialect.types || self.peek_kind() != Some(TokenKind::Colon) {
            return Some(None);
        }
        self.next();
        let (ty, _) = self.parse_name("a type name", false)?;
        Some(Some(ty))
    }

    fn parse_typed_name(&mut self) -> Option<TypedName> {
        let (name, span) = self.parse_name("a variable name", false)?;
        let ty = self.parse_type_annotation()?;
        Some(TypedName { span, name, ty })
    }

    fn parse_typed_name_list(&mut self) -> Option<Vec<TypedName>> {
        let mut names = vec![self.parse_typed_name()?];
        while self.peek_kind() == Some(TokenKind::Comma) {
            self.next();
            names.push(self.parse_typed_name()?);
        }
        Some(names)
    }

    // -- statements --

    fn parse_block(&mut self) -> Option<Block> {
        self.depth += 1;
        let result = self.parse_block_inner();
        self.depth -= 1;
        result
    }

    fn parse_block_inner(&mut self) -> Option<Block> {
        let open = self.expect(TokenKind::LBrace, "`{`")?;
        if self.depth > MAX_NESTING {
            self.error("E1009", "blocks nested too deeply", open.span);
            return None;
        }
        let mut statements = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::RBrace) => {
                    let close = self.next()?;
                    return Some(Block::new(open.span.to(close.span), statements));
                }
                Some(_) => statements.push(self.parse_statement()?),
                None => {
                    self.error("E1007", "expected `}`, found end of input", open.span);
                    return None;
                }
            }
        }
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.peek_kind() {
            Some(TokenKind::LBrace) => return self.parse_block().map(Statement::Block),
            Some(TokenKind::StackAssign) if self.dialect.stack_forms => {
                let op = self.next()?;
                let (name, span) = self.parse_name("a variable name", false)?;
                return Some(Statement::StackAssignment(StackAssignment {
                    span: op.span.to(span),
                    variable_name: Identifier::new(span, name),
                }));
            }
            _ => {}
        }
        if self.peek_keyword("let") {
            return self.parse_variable_declaration();
        }
        if self.peek_keyword("function") {
            return self.parse_function_definition();
        }
        if self.peek_keyword("if") {
            let start = self.next()?.span;
            let condition = self.parse_expression()?;
            let body = self.parse_block()?;
            return Some(Statement::If(If {
                span: start.to(body.span),
                condition,
                body,
            }));
        }
        if self.peek_keyword("switch") {
            return self.parse_switch();
        }
        if self.peek_keyword("for") {
            let start = self.next()?.span;
            let pre = self.parse_block()?;
            let condition = self.parse_expression()?;
            let post = self.parse_block()?;
            let body = self.parse_block()?;
            return Some(Statement::ForLoop(ForLoop {
                span: start.to(body.span),
                pre,
                condition,
                post,
                body,
            }));
        }
        if self.peek_keyword("case") || self.peek_keyword("default") {
            let token = self.next()?;
            self.error(
                "E1012",
                format!("`{}` outside of a switch statement", token.text),
                token.span,
            );
            return None;
        }
        if self.dialect.stack_forms
            && self.peek_kind() == Some(TokenKind::Identifier)
            && self.peek_nth_kind(1) == Some(TokenKind::Colon)
        {
            let (name, span) = self.parse_name("a label name", false)?;
            let colon = self.next()?;
            return Some(Statement::Label(Label {
                span: span.to(colon.span),
                name,
            }));
        }
        if self.dialect.stack_forms && self.peek_nth_kind(1) != Some(TokenKind::LParen) {
            let instruction = self
                .peek()
                .filter(|t| t.kind == TokenKind::Identifier)
                .and_then(|t| Name::get(&t.text))
                .filter(|name| self.dialect.is_builtin(*name));
            if let Some(instruction) = instruction {
                let span = self.next()?.span;
                return Some(Statement::Instruction(Instruction { span, instruction }));
            }
        }

        let expression = self.parse_expression()?;
        match (&expression, self.peek_kind()) {
            (Expression::Identifier(first), Some(TokenKind::Comma | TokenKind::Assign)) => {
                let mut variable_names = vec![first.clone()];
                while self.peek_kind() == Some(TokenKind::Comma) {
                    self.next();
                    let (name, span) = self.parse_name("a variable name", false)?;
                    variable_names.push(Identifier::new(span, name));
                }
                self.expect(TokenKind::Assign, "`:=`")?;
                let value = self.parse_expression()?;
                Some(Statement::Assignment(Assignment {
                    span: first.span.to(value.span()),
                    variable_names,
                    value,
                }))
            }
            _ => Some(Statement::Expression(expression)),
        }
    }

    fn parse_variable_declaration(&mut self) -> Option<Statement> {
        let start = self.next()?.span;
        let variables = self.parse_typed_name_list()?;
        let mut end = variables.last().map(|v| v.span).unwrap_or(start);
        let value = if self.peek_kind() == Some(TokenKind::Assign) {
            self.next();
            let value = self.parse_expression()?;
            end = value.span();
            Some(value)
        } else {
            None
        };
        Some(Statement::VariableDeclaration(VariableDeclaration {
            span: start.to(end),
            variables,
            value,
        }))
    }

    fn parse_function_definition(&mut self) -> Option<Statement> {
        let start = self.next()?.span;
        let (name, _) = self.parse_name("a function name", false)?;
        self.expect(TokenKind::LParen, "`(`")?;
        let parameters = if self.peek_kind() == Some(TokenKind::RParen) {
            Vec::new()
        } else {
            self.parse_typed_name_list()?
        };
        self.expect(TokenKind::RParen, "`)`")?;
        let return_variables = if self.peek_kind() == Some(TokenKind::Arrow) {
            self.next();
            self.parse_typed_name_list()?
        } else {
            Vec::new()
        };
        let body = self.parse_block()?;
        Some(Statement::FunctionDefinition(FunctionDefinition {
            span: start.to(body.span),
            name,
            parameters,
            return_variables,
            body,
        }))
    }

    fn parse_switch(&mut self) -> Option<Statement> {
        let start = self.next()?.span;
        let expression = self.parse_expression()?;
        let mut cases = Vec::new();
        while self.peek_keyword("case") {
            let case_start = self.next()?.span;
            let value = match self.parse_expression()? {
                Expression::Literal(literal) => literal,
                other => {
                    self.error("E1013", "case value must be a literal", other.span());
                    return None;
                }
            };
            let body = self.parse_block()?;
            cases.push(Case {
                span: case_start.to(body.span),
                value: Some(value),
                body,
            });
        }
        if self.peek_keyword("default") {
            let default_start = self.next()?.span;
            let body = self.parse_block()?;
            cases.push(Case {
                span: default_start.to(body.span),
                value: None,
                body,
            });
        }
        if cases.is_empty() {
            self.error("E1014", "switch statement without any cases", start);
            return None;
        }
        let end = cases.last().map(|c| c.span).unwrap_or(start);
        Some(Statement::Switch(Switch {
            span: start.to(end),
            expression,
            cases,
        }))
    }

    // -- expressions --

    fn parse_expression(&mut self) -> Option<Expression> {
        self.depth += 1;
        let result = if self.depth > MAX_NESTING {
            let span = self.peek().map(|t| t.span).unwrap_or_else(|| self.eof_span());
            self.error("E1009", "expression nested too deeply", span);
            None
        } else {
            self.parse_expression_inner()
        };
        self.depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self) -> Option<Expression> {
        match self.peek_kind() {
            Some(TokenKind::Number) => {
                let token = self.next()?;
                self.finish_literal(LiteralKind::Number, token.text, token.span)
            }
            Some(TokenKind::String) => {
                let token = self.next()?;
                self.finish_literal(LiteralKind::String, token.text, token.span)
            }
            Some(TokenKind::Identifier) if self.peek_keyword("true") || self.peek_keyword("false") => {
                let token = self.next()?;
                self.finish_literal(LiteralKind::Boolean, token.text, token.span)
            }
            Some(TokenKind::Identifier) => {
                let (name, span) = self.parse_name("an identifier", true)?;
                if self.peek_kind() != Some(TokenKind::LParen) {
                    return Some(Expression::identifier(span, name));
                }
                self.next();
                let mut arguments = Vec::new();
                if self.peek_kind() != Some(TokenKind::RParen) {
                    arguments.push(self.parse_expression()?);
                    while self.peek_kind() == Some(TokenKind::Comma) {
                        self.next();
                        arguments.push(self.parse_expression()?);
                    }
                }
                let close = self.expect(TokenKind::RParen, "`)`")?;
                let call_span = span.to(close.span);
                if self.dialect.is_builtin(name) {
                    Some(Expression::FunctionalInstruction(FunctionalInstruction {
                        span: call_span,
                        instruction: name,
                        arguments,
                    }))
                } else {
                    Some(Expression::FunctionCall(FunctionCall {
                        span: call_span,
                        function_name: Identifier::new(span, name),
                        arguments,
                    }))
                }
            }
            Some(_) => {
                let token = self.next()?;
                self.error(
                    "E1006",
                    format!("expected an expression, found `{}`", token.text),
                    token.span,
                );
                None
            }
            None => {
                let span = self.eof_span();
                self.error("E1007", "expected an expression, found end of input", span);
                None
            }
        }
    }

    fn finish_literal(&mut self, kind: LiteralKind, value: String, span: Span) -> Option<Expression> {
        let ty = self.parse_type_annotation()?;
        Some(Expression::Literal(Literal {
            span,
            kind,
            value,
            ty,
        }))
    }
}
