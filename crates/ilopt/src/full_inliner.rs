//! Inlines every call to a user function whose definition is visible.
//!
//! Requires a program with unique names. Callee bodies are taken from a copy
//! of the program made before any rewriting, so a body spliced into a call
//! site is never revisited in the same run. Repeating the pass inlines the
//! calls those bodies contain.
//!
//! Evaluation order is right to left. Hoisted statements are emitted in the
//! order the hoisted expressions would have been evaluated.

use std::collections::HashMap;

use ilopt_core::{
    AnalysisInfo, Assignment, Block, Dialect, Expression, FunctionCall, FunctionDefinition,
    Literal, Name, Span, Statement, TypedName, VariableDeclaration,
};

use crate::ast_copier::{copy_verbatim, AstCopier};
use crate::body_copier::BodyCopier;
use crate::error::{OptimiserError, Result};
use crate::movable::MovableChecker;
use crate::name_collector::collect_names;
use crate::name_dispenser::NameDispenser;

pub struct FullInliner<'a> {
    dialect: &'a Dialect,
    movable: MovableChecker<'a>,
    /// Definitions from the untouched copy, keyed by (unique) name.
    callees: HashMap<Name, FunctionDefinition>,
    dispenser: NameDispenser,
    /// Functions whose bodies are being visited; calls to them stay calls.
    function_scopes: Vec<Name>,
    inlined: usize,
    hoisted: usize,
}

/// Fresh variables receiving the return values of one inlined call.
struct ReturnSlots {
    names: Vec<Name>,
    declarations: Vec<Statement>,
}

impl<'a> FullInliner<'a> {
    pub fn new(block: &Block, info: &'a AnalysisInfo) -> Result<Self> {
        let original = copy_verbatim(block)?;
        let mut callees = HashMap::new();
        collect_functions(&original, &mut callees);

        let mut used = collect_names(block);
        used.extend(info.external_identifiers.iter().copied());

        Ok(Self {
            dialect: &info.dialect,
            movable: MovableChecker::new(&info.dialect),
            callees,
            dispenser: NameDispenser::new(used),
            function_scopes: Vec::new(),
            inlined: 0,
            hoisted: 0,
        })
    }

    pub fn run(&mut self, block: &mut Block) -> Result<()> {
        self.visit_block(block)?;
        tracing::debug!(
            inlined = self.inlined,
            hoisted = self.hoisted,
            "full inlining finished"
        );
        Ok(())
    }

    pub fn inlined_calls(&self) -> usize {
        self.inlined
    }

    fn inline_target(&self, name: Name) -> Option<FunctionDefinition> {
        if self.function_scopes.contains(&name) {
            return None;
        }
        self.callees.get(&name).cloned()
    }

    // -- statements --

    fn visit_block(&mut self, block: &mut Block) -> Result<()> {
        let mut index = 0;
        while index < block.statements.len() {
            let prefix = self.visit_statement(&mut block.statements[index])?;
            let inserted = prefix.len();
            block.statements.splice(index..index, prefix);
            index += inserted + 1;
        }
        Ok(())
    }

    /// Rewrites `statement` in place and returns the statements that have to
    /// run before it.
    fn visit_statement(&mut self, statement: &mut Statement) -> Result<Vec<Statement>> {
        match statement {
            Statement::Expression(Expression::FunctionCall(call)) => {
                let Some(callee) = self.inline_target(call.function_name.name) else {
                    return self.visit_arguments(&mut call.arguments, call.function_name.name);
                };
                let slots = self.return_slots(&callee, call.span);
                let (mut prefix, body) = self.expand_call(call, &callee, &slots.names)?;
                prefix.extend(slots.declarations);
                *statement = Statement::Block(body);
                Ok(prefix)
            }
            Statement::Expression(expr) => self.visit_expression(expr),
            Statement::VariableDeclaration(decl) => {
                let (prefix, body) = self.visit_variable_declaration(decl)?;
                if let Some(body) = body {
                    *statement = Statement::Block(body);
                }
                Ok(prefix)
            }
            Statement::Assignment(assignment) => self.visit_assignment(assignment),
            Statement::If(if_stmt) => {
                let prefix = self.visit_expression(&mut if_stmt.condition)?;
                self.visit_block(&mut if_stmt.body)?;
                Ok(prefix)
            }
            Statement::Switch(switch) => {
                let prefix = self.visit_expression(&mut switch.expression)?;
                for case in &mut switch.cases {
                    self.visit_block(&mut case.body)?;
                }
                Ok(prefix)
            }
            Statement::ForLoop(for_loop) => {
                // The condition runs once per iteration; it is left alone.
                self.visit_block(&mut for_loop.pre)?;
                self.visit_block(&mut for_loop.post)?;
                self.visit_block(&mut for_loop.body)?;
                Ok(Vec::new())
            }
            Statement::FunctionDefinition(def) => {
                self.function_scopes.push(def.name);
                let visited = self.visit_block(&mut def.body);
                self.function_scopes.pop();
                visited?;
                Ok(Vec::new())
            }
            Statement::Block(block) => {
                self.visit_block(block)?;
                Ok(Vec::new())
            }
            Statement::Label(_) | Statement::StackAssignment(_) | Statement::Instruction(_) => {
                Err(OptimiserError::IllegalConstruct {
                    construct: statement.kind_name(),
                    span: statement.span(),
                })
            }
        }
    }

    /// `let x, y := f(...)` runs the body of `f` with its return variables
    /// bound to `x` and `y` directly. Returns the body when the declaration
    /// has to be replaced by it.
    fn visit_variable_declaration(
        &mut self,
        decl: &mut VariableDeclaration,
    ) -> Result<(Vec<Statement>, Option<Block>)> {
        let Some(value) = decl.value.as_mut() else {
            return Ok((Vec::new(), None));
        };
        let call = match value {
            Expression::FunctionCall(call) => call,
            other => return Ok((self.visit_expression(other)?, None)),
        };
        let Some(callee) = self.inline_target(call.function_name.name) else {
            let prefix = self.visit_arguments(&mut call.arguments, call.function_name.name)?;
            return Ok((prefix, None));
        };
        check_returns(&callee, decl.variables.len(), call.span)?;

        let targets: Vec<Name> = decl.variables.iter().map(|v| v.name).collect();
        let (mut prefix, body) = self.expand_call(call, &callee, &targets)?;
        for variable in &decl.variables {
            let value = zero(variable.span, variable.ty);
            prefix.push(declare(decl.span, variable.clone(), Some(value)));
        }
        Ok((prefix, Some(body)))
    }

    /// `x, y := f(...)` goes through return slots so the targets keep their
    /// values until the body has finished.
    fn visit_assignment(&mut self, assignment: &mut Assignment) -> Result<Vec<Statement>> {
        let call = match &mut assignment.value {
            Expression::FunctionCall(call) => call,
            other => return self.visit_expression(other),
        };
        let Some(callee) = self.inline_target(call.function_name.name) else {
            return self.visit_arguments(&mut call.arguments, call.function_name.name);
        };
        check_returns(&callee, assignment.variable_names.len(), call.span)?;

        let span = call.span;
        let slots = self.return_slots(&callee, span);
        let (mut prefix, body) = self.expand_call(call, &callee, &slots.names)?;
        prefix.extend(slots.declarations);
        prefix.push(Statement::Block(body));

        let mut copies = assignment.variable_names.iter().zip(&slots.names).map(
            |(target, slot)| Assignment {
                span: assignment.span,
                variable_names: vec![target.clone()],
                value: Expression::identifier(span, *slot),
            },
        );
        let last = copies.next_back();
        prefix.extend(copies.map(Statement::Assignment));
        if let Some(last) = last {
            *assignment = last;
        }
        Ok(prefix)
    }

    // -- expressions --

    fn visit_expression(&mut self, expr: &mut Expression) -> Result<Vec<Statement>> {
        match expr {
            Expression::Literal(_) | Expression::Identifier(_) => Ok(Vec::new()),
            Expression::FunctionCall(call) => {
                let Some(callee) = self.inline_target(call.function_name.name) else {
                    return self.visit_arguments(&mut call.arguments, call.function_name.name);
                };
                check_returns(&callee, 1, call.span)?;
                let span = call.span;
                let slots = self.return_slots(&callee, span);
                let (mut prefix, body) = self.expand_call(call, &callee, &slots.names)?;
                prefix.extend(slots.declarations);
                prefix.push(Statement::Block(body));
                if let Some(slot) = slots.names.first() {
                    *expr = Expression::identifier(span, *slot);
                }
                Ok(prefix)
            }
            Expression::FunctionalInstruction(instr) => {
                self.visit_arguments(&mut instr.arguments, instr.instruction)
            }
        }
    }

    /// Arguments of a call that stays a call.
    ///
    /// Arguments are visited right to left. Once some argument needed
    /// statements in front of the call, every argument evaluated before it
    /// that is not movable is moved into a variable as well, so it still runs
    /// before those statements.
    fn visit_arguments(
        &mut self,
        arguments: &mut [Expression],
        callee: Name,
    ) -> Result<Vec<Statement>> {
        let mut prefixes = Vec::with_capacity(arguments.len());
        for argument in arguments.iter_mut().rev() {
            prefixes.push(self.visit_expression(argument)?);
        }
        prefixes.reverse();

        let Some(first_rewritten) = prefixes.iter().position(|p| !p.is_empty()) else {
            return Ok(Vec::new());
        };

        let mut statements = Vec::new();
        for (index, argument) in arguments.iter_mut().enumerate().rev() {
            statements.append(&mut prefixes[index]);
            if index > first_rewritten && !self.movable.is_movable(argument) {
                let span = argument.span();
                let temp = self.dispenser.new_name(&format!("{callee}_arg"));
                let value = std::mem::replace(argument, Expression::identifier(span, temp));
                let variable = TypedName {
                    span,
                    name: temp,
                    ty: self.dialect.default_type,
                };
                statements.push(declare(span, variable, Some(value)));
                self.hoisted += 1;
            }
        }
        Ok(statements)
    }

    // -- call sites --

    fn return_slots(&mut self, callee: &FunctionDefinition, span: Span) -> ReturnSlots {
        let mut names = Vec::with_capacity(callee.return_variables.len());
        let mut declarations = Vec::with_capacity(callee.return_variables.len());
        for ret in &callee.return_variables {
            let slot = self
                .dispenser
                .new_name(&format!("{}_{}", callee.name, ret.name));
            names.push(slot);
            let variable = TypedName {
                span,
                name: slot,
                ty: ret.ty,
            };
            declarations.push(declare(span, variable, Some(zero(span, ret.ty))));
        }
        ReturnSlots {
            names,
            declarations,
        }
    }

    /// Moves every argument of `call` into a fresh variable and copies the
    /// body of `callee` with parameters and return variables substituted.
    /// Returns the argument declarations (in evaluation order) and the body.
    fn expand_call(
        &mut self,
        call: &mut FunctionCall,
        callee: &FunctionDefinition,
        return_targets: &[Name],
    ) -> Result<(Vec<Statement>, Block)> {
        if callee.parameters.len() != call.arguments.len() {
            return Err(OptimiserError::ArityMismatch {
                callee: callee.name,
                expected: callee.parameters.len(),
                found: call.arguments.len(),
                span: call.span,
            });
        }

        let mut argument_prefixes = Vec::with_capacity(call.arguments.len());
        for argument in call.arguments.iter_mut().rev() {
            argument_prefixes.push(self.visit_expression(argument)?);
        }

        let mut prefix = Vec::new();
        let mut replacements = HashMap::new();
        let arguments = std::mem::take(&mut call.arguments);
        let pairs = callee.parameters.iter().zip(arguments).rev();
        for ((param, argument), argument_prefix) in pairs.zip(argument_prefixes) {
            prefix.extend(argument_prefix);
            let temp = self
                .dispenser
                .new_name(&format!("{}_{}", callee.name, param.name));
            let variable = TypedName {
                span: argument.span(),
                name: temp,
                ty: param.ty,
            };
            prefix.push(declare(call.span, variable, Some(argument)));
            replacements.insert(param.name, temp);
        }
        for (ret, target) in callee.return_variables.iter().zip(return_targets) {
            replacements.insert(ret.name, *target);
        }

        let mut copier = BodyCopier::new(
            &mut self.dispenser,
            format!("{}_", callee.name),
            replacements,
        );
        let body = Block {
            span: call.span,
            statements: copier.copy_block(&callee.body)?.statements,
        };
        self.inlined += 1;
        tracing::trace!(callee = %callee.name, line = call.span.start.line, "inlined call");
        Ok((prefix, body))
    }
}

fn check_returns(callee: &FunctionDefinition, expected: usize, span: Span) -> Result<()> {
    let found = callee.return_variables.len();
    if found != expected {
        return Err(OptimiserError::ArityMismatch {
            callee: callee.name,
            expected,
            found,
            span,
        });
    }
    Ok(())
}

fn declare(span: Span, variable: TypedName, value: Option<Expression>) -> Statement {
    Statement::VariableDeclaration(VariableDeclaration {
        span,
        variables: vec![variable],
        value,
    })
}

fn zero(span: Span, ty: Option<Name>) -> Expression {
    Expression::Literal(Literal::number(span, "0", ty))
}

fn collect_functions(block: &Block, out: &mut HashMap<Name, FunctionDefinition>) {
    for statement in &block.statements {
        match statement {
            Statement::FunctionDefinition(def) => {
                out.insert(def.name, def.clone());
                collect_functions(&def.body, out);
            }
            Statement::If(if_stmt) => collect_functions(&if_stmt.body, out),
            Statement::Switch(switch) => {
                for case in &switch.cases {
                    collect_functions(&case.body, out);
                }
            }
            Statement::ForLoop(for_loop) => {
                collect_functions(&for_loop.pre, out);
                collect_functions(&for_loop.post, out);
                collect_functions(&for_loop.body, out);
            }
            Statement::Block(inner) => collect_functions(inner, out),
            _ => {}
        }
    }
}

/// Inlines all eligible calls of `block` in place.
pub fn full_inline(block: &mut Block, info: &AnalysisInfo) -> Result<usize> {
    let mut inliner = FullInliner::new(block, info)?;
    inliner.run(block)?;
    Ok(inliner.inlined_calls())
}
