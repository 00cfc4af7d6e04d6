//! Scope and arity checking for parsed programs.
//!
//! The optimiser passes assume their input went through [`Analyzer`]: every
//! use resolves to a visible declaration, calls have matching arity and no
//! name is declared twice where both declarations are visible.

use std::collections::{BTreeSet, HashMap, HashSet};

use num_bigint::BigUint;
use num_traits::Num;

use crate::ast::*;
use crate::diagnostics::{Diagnostic, Span};
use crate::dialect::Dialect;
use crate::intern::Name;

const MAX_LITERAL_BITS: u64 = 256;
const MAX_STRING_BYTES: usize = 32;

/// Result of a successful analysis, handed to the optimiser passes.
#[derive(Debug, Clone)]
pub struct AnalysisInfo {
    pub dialect: Dialect,
    /// Names bound by the host. Uses resolve to themselves and no renaming
    /// may produce them.
    pub external_identifiers: BTreeSet<Name>,
    /// Number of binding sites (variables, parameters, return variables,
    /// functions) in the analysed program.
    pub declaration_count: usize,
}

#[derive(Debug, Clone, Copy)]
enum BindingKind {
    Variable,
    Function { parameters: usize, returns: usize },
    Label,
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    kind: BindingKind,
    span: Span,
}

#[derive(Default)]
struct Scope {
    bindings: HashMap<Name, Binding>,
    /// Parameters and return variables of a function live here; variables
    /// of enclosing scopes are invisible from below this scope.
    function_boundary: bool,
}

enum Lookup {
    Found(Binding),
    /// A variable exists, but behind a function boundary.
    Hidden(Binding),
    Missing,
}

pub struct Analyzer<'a> {
    dialect: &'a Dialect,
    external: BTreeSet<Name>,
    scopes: Vec<Scope>,
    diagnostics: Vec<Diagnostic>,
    declarations: usize,
}

/// Analyses `block` with no external identifiers.
pub fn analyze(block: &Block, dialect: &Dialect) -> Result<AnalysisInfo, Vec<Diagnostic>> {
    Analyzer::new(dialect).analyze(block)
}

impl<'a> Analyzer<'a> {
    pub fn new(dialect: &'a Dialect) -> Self {
        Self {
            dialect,
            external: BTreeSet::new(),
            scopes: Vec::new(),
            diagnostics: Vec::new(),
            declarations: 0,
        }
    }

    pub fn with_external_identifiers(mut self, names: impl IntoIterator<Item = Name>) -> Self {
        self.external.extend(names);
        self
    }

    pub fn analyze(mut self, block: &Block) -> Result<AnalysisInfo, Vec<Diagnostic>> {
        self.visit_block(block);
        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }
        Ok(AnalysisInfo {
            dialect: self.dialect.clone(),
            external_identifiers: self.external,
            declaration_count: self.declarations,
        })
    }

    fn error(&mut self, code: &str, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::error(code, message, span));
    }

    // -- scopes --

    fn lookup(&self, name: Name) -> Lookup {
        let mut crossed_boundary = false;
        for scope in self.scopes.iter().rev() {
            if let Some(binding) = scope.bindings.get(&name) {
                return match binding.kind {
                    BindingKind::Variable if crossed_boundary => Lookup::Hidden(*binding),
                    _ => Lookup::Found(*binding),
                };
            }
            crossed_boundary |= scope.function_boundary;
        }
        if self.external.contains(&name) {
            return Lookup::Found(Binding {
                kind: BindingKind::Variable,
                span: Span::default(),
            });
        }
        Lookup::Missing
    }

    fn declare(&mut self, name: Name, kind: BindingKind, span: Span) {
        if self.dialect.is_builtin(name) {
            self.error(
                "E2014",
                format!("`{name}` is the name of an instruction and cannot be declared"),
                span,
            );
            return;
        }
        let previous = match self.lookup(name) {
            Lookup::Found(binding) => Some(binding),
            Lookup::Hidden(_) | Lookup::Missing => None,
        };
        if let Some(previous) = previous {
            let diag = Diagnostic::error("E2003", format!("`{name}` is already declared"), span);
            self.diagnostics
                .push(diag.with_label("previous declaration", previous.span));
            return;
        }
        self.declarations += 1;
        if let Some(scope) = self.scopes.last_mut() {
            scope.bindings.insert(name, Binding { kind, span });
        }
    }

    fn enter_scope(&mut self, function_boundary: bool) {
        self.scopes.push(Scope {
            bindings: HashMap::new(),
            function_boundary,
        });
    }

    fn leave_scope(&mut self) {
        self.scopes.pop();
    }

    /// Registers functions and labels of `statements`, which are visible in
    /// the whole block regardless of their position.
    fn hoist(&mut self, statements: &[Statement]) {
        for statement in statements {
            match statement {
                Statement::FunctionDefinition(def) => self.declare(
                    def.name,
                    BindingKind::Function {
                        parameters: def.parameters.len(),
                        returns: def.return_variables.len(),
                    },
                    def.span,
                ),
                Statement::Label(label) => self.declare(label.name, BindingKind::Label, label.span),
                _ => {}
            }
        }
    }

    // -- statements --

    fn visit_block(&mut self, block: &Block) {
        self.enter_scope(false);
        self.visit_statements(&block.statements);
        self.leave_scope();
    }

    fn visit_statements(&mut self, statements: &[Statement]) {
        self.hoist(statements);
        for statement in statements {
            self.visit_statement(statement);
        }
    }

    fn visit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Expression(expr) => {
                if let Some(values) = self.visit_expression(expr) {
                    if values != 0 {
                        self.error(
                            "E2007",
                            format!("expression statement leaves {values} unused value(s)"),
                            expr.span(),
                        );
                    }
                }
            }
            Statement::VariableDeclaration(decl) => {
                if let Some(value) = &decl.value {
                    self.expect_values(value, decl.variables.len());
                }
                let mut seen = HashSet::new();
                for variable in &decl.variables {
                    if !seen.insert(variable.name) {
                        self.error(
                            "E2003",
                            format!("`{}` is declared twice in one declaration", variable.name),
                            variable.span,
                        );
                        continue;
                    }
                    self.declare(variable.name, BindingKind::Variable, variable.span);
                }
            }
            Statement::Assignment(assignment) => {
                self.expect_values(&assignment.value, assignment.variable_names.len());
                for target in &assignment.variable_names {
                    self.expect_variable(target);
                }
            }
            Statement::If(if_stmt) => {
                self.expect_values(&if_stmt.condition, 1);
                self.visit_block(&if_stmt.body);
            }
            Statement::Switch(switch) => self.visit_switch(switch),
            Statement::ForLoop(for_loop) => {
                self.enter_scope(false);
                self.visit_statements(&for_loop.pre.statements);
                self.expect_values(&for_loop.condition, 1);
                self.visit_block(&for_loop.post);
                self.visit_block(&for_loop.body);
                self.leave_scope();
            }
            Statement::FunctionDefinition(def) => {
                self.enter_scope(true);
                for typed in def.parameters.iter().chain(&def.return_variables) {
                    self.declare(typed.name, BindingKind::Variable, typed.span);
                }
                self.visit_block(&def.body);
                self.leave_scope();
            }
            Statement::Block(block) => self.visit_block(block),
            Statement::Label(_) | Statement::StackAssignment(_) | Statement::Instruction(_)
                if !self.dialect.stack_forms =>
            {
                self.error(
                    "E2011",
                    format!("{} is not allowed in this dialect", statement.kind_name()),
                    statement.span(),
                );
            }
            Statement::Label(_) => {}
            Statement::StackAssignment(assignment) => self.expect_variable(&assignment.variable_name),
            Statement::Instruction(instr) => {
                if !self.dialect.is_builtin(instr.instruction) {
                    self.error(
                        "E2001",
                        format!("unknown instruction `{}`", instr.instruction),
                        instr.span,
                    );
                }
            }
        }
    }

    fn visit_switch(&mut self, switch: &Switch) {
        self.expect_values(&switch.expression, 1);
        let mut seen: HashMap<String, Span> = HashMap::new();
        let mut defaults = 0;
        for case in &switch.cases {
            match &case.value {
                Some(value) => {
                    self.check_literal(value);
                    if let Some(key) = literal_key(value) {
                        if let Some(previous) = seen.insert(key, value.span) {
                            let diag = Diagnostic::error(
                                "E2010",
                                format!("duplicate case value `{}`", value.value),
                                value.span,
                            );
                            self.diagnostics
                                .push(diag.with_label("first used here", previous));
                        }
                    }
                }
                None => defaults += 1,
            }
            self.visit_block(&case.body);
        }
        if defaults > 1 {
            self.error("E2015", "switch has more than one default case", switch.span);
        }
    }

    fn expect_variable(&mut self, target: &Identifier) {
        match self.lookup(target.name) {
            Lookup::Found(Binding {
                kind: BindingKind::Variable,
                ..
            }) => {}
            Lookup::Found(_) => self.error(
                "E2009",
                format!("`{}` is not a variable and cannot be assigned", target.name),
                target.span,
            ),
            Lookup::Hidden(binding) => self.hidden_variable(target, binding),
            Lookup::Missing => self.unresolved(target),
        }
    }

    fn unresolved(&mut self, ident: &Identifier) {
        self.error(
            "E2001",
            format!("unknown identifier `{}`", ident.name),
            ident.span,
        );
    }

    fn hidden_variable(&mut self, ident: &Identifier, binding: Binding) {
        let diagnostic = Diagnostic::error(
            "E2002",
            format!(
                "variable `{}` of an enclosing scope is not accessible inside a function",
                ident.name
            ),
            ident.span,
        )
        .with_label("declared here", binding.span);
        self.diagnostics.push(diagnostic);
    }

    // -- expressions --

    fn expect_values(&mut self, expr: &Expression, expected: usize) {
        if let Some(found) = self.visit_expression(expr) {
            if found != expected {
                self.error(
                    "E2008",
                    format!("expected {expected} value(s), but the expression yields {found}"),
                    expr.span(),
                );
            }
        }
    }

    /// Number of values `expr` leaves, or `None` when an error already made
    /// that unknown.
    fn visit_expression(&mut self, expr: &Expression) -> Option<usize> {
        match expr {
            Expression::Literal(literal) => {
                self.check_literal(literal);
                Some(1)
            }
            Expression::Identifier(ident) => match self.lookup(ident.name) {
                Lookup::Found(Binding {
                    kind: BindingKind::Variable,
                    ..
                }) => Some(1),
                Lookup::Found(_) => {
                    self.error(
                        "E2004",
                        format!("`{}` is not a variable and cannot be used as a value", ident.name),
                        ident.span,
                    );
                    None
                }
                Lookup::Hidden(binding) => {
                    self.hidden_variable(ident, binding);
                    None
                }
                Lookup::Missing => {
                    self.unresolved(ident);
                    None
                }
            },
            Expression::FunctionalInstruction(instr) => {
                for argument in &instr.arguments {
                    self.expect_values(argument, 1);
                }
                let Some(builtin) = self.dialect.builtin(instr.instruction).copied() else {
                    self.error(
                        "E2001",
                        format!("unknown instruction `{}`", instr.instruction),
                        instr.span,
                    );
                    return None;
                };
                if builtin.arguments != instr.arguments.len() {
                    self.error(
                        "E2005",
                        format!(
                            "`{}` expects {} argument(s), but {} were given",
                            instr.instruction,
                            builtin.arguments,
                            instr.arguments.len()
                        ),
                        instr.span,
                    );
                }
                Some(builtin.returns)
            }
            Expression::FunctionCall(call) => {
                for argument in &call.arguments {
                    self.expect_values(argument, 1);
                }
                let callee = &call.function_name;
                match self.lookup(callee.name) {
                    Lookup::Found(Binding {
                        kind:
                            BindingKind::Function {
                                parameters,
                                returns,
                            },
                        ..
                    }) => {
                        if parameters != call.arguments.len() {
                            self.error(
                                "E2005",
                                format!(
                                    "`{}` expects {parameters} argument(s), but {} were given",
                                    callee.name,
                                    call.arguments.len()
                                ),
                                call.span,
                            );
                        }
                        Some(returns)
                    }
                    Lookup::Found(_) | Lookup::Hidden(_) => {
                        self.error(
                            "E2006",
                            format!("`{}` is not a function", callee.name),
                            callee.span,
                        );
                        None
                    }
                    Lookup::Missing => {
                        self.unresolved(callee);
                        None
                    }
                }
            }
        }
    }

    fn check_literal(&mut self, literal: &Literal) {
        match literal.kind {
            LiteralKind::Number => match parse_number(&literal.value) {
                Some(value) if value.bits() > MAX_LITERAL_BITS => self.error(
                    "E2012",
                    format!("number literal `{}` does not fit in 256 bits", literal.value),
                    literal.span,
                ),
                Some(_) => {}
                None => self.error(
                    "E2012",
                    format!("invalid number literal `{}`", literal.value),
                    literal.span,
                ),
            },
            LiteralKind::String if string_bytes(&literal.value).len() > MAX_STRING_BYTES => self.error(
                "E2013",
                format!("string literal longer than {MAX_STRING_BYTES} bytes"),
                literal.span,
            ),
            LiteralKind::String | LiteralKind::Boolean => {}
        }
    }
}

fn parse_number(text: &str) -> Option<BigUint> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => BigUint::from_str_radix(hex, 16).ok(),
        None => BigUint::from_str_radix(text, 10).ok(),
    }
}

/// Byte content of a string literal. `\xNN` escapes decode to U+0000 to
/// U+00FF, so those characters stand for one byte each; anything above
/// counts with its UTF-8 encoding.
fn string_bytes(value: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.len());
    for ch in value.chars() {
        match u8::try_from(ch) {
            Ok(byte) => bytes.push(byte),
            Err(_) => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    bytes
}

/// Canonical value of a case literal, so that `1` and `0x01` collide.
fn literal_key(literal: &Literal) -> Option<String> {
    match literal.kind {
        LiteralKind::Number => parse_number(&literal.value).map(|n| n.to_string()),
        LiteralKind::Boolean => Some(if literal.value == "true" { "1" } else { "0" }.to_string()),
        LiteralKind::String => {
            let mut bytes = string_bytes(&literal.value);
            bytes.resize(MAX_STRING_BYTES.max(bytes.len()), 0);
            Some(BigUint::from_bytes_be(&bytes).to_string())
        }
    }
}
