//! Deep copy of a tree with hooks at uses and binding sites.
//!
//! With no hook overridden, [`AstCopier::copy_block`] reproduces its input
//! exactly (spans included). Implementors override:
//!
//! - [`AstCopier::translate_identifier`] to rewrite every use of a name,
//! - [`AstCopier::copy_variable_declaration`] and
//!   [`AstCopier::copy_function_definition`] to rewrite binding sites,
//! - [`AstCopier::enter_scope`] / [`AstCopier::leave_scope`] to track the
//!   lexical scopes the traversal passes through,
//! - [`AstCopier::copy_stack_form`] to reject or rewrite the legacy stack
//!   statements.
//!
//! Children are copied in source order, so hooks observe uses and bindings
//! in the order a reader of the program would.

use ilopt_core::{
    Assignment, Block, Case, Expression, ForLoop, FunctionCall, FunctionDefinition,
    FunctionalInstruction, Identifier, If, Name, Span, StackAssignment, Statement, Switch,
    VariableDeclaration,
};

use crate::error::Result;

pub trait AstCopier {
    /// Called for every use of a name, including assignment targets and
    /// callee names of user function calls.
    fn translate_identifier(&mut self, name: Name, _span: Span) -> Result<Name> {
        Ok(name)
    }

    fn copy_variable_declaration(
        &mut self,
        decl: &VariableDeclaration,
    ) -> Result<VariableDeclaration> {
        let value = self.copy_optional_expression(decl.value.as_ref())?;
        Ok(VariableDeclaration {
            span: decl.span,
            variables: decl.variables.clone(),
            value,
        })
    }

    fn copy_function_definition(&mut self, def: &FunctionDefinition) -> Result<FunctionDefinition> {
        Ok(FunctionDefinition {
            span: def.span,
            name: def.name,
            parameters: def.parameters.clone(),
            return_variables: def.return_variables.clone(),
            body: self.copy_block(&def.body)?,
        })
    }

    /// Called before the statements of `block` are copied. For a for loop
    /// this is the pre block, and the scope lasts until the loop body has
    /// been copied.
    fn enter_scope(&mut self, _block: &Block) {}

    fn leave_scope(&mut self) {}

    fn copy_stack_form(&mut self, statement: &Statement) -> Result<Statement> {
        Ok(match statement {
            Statement::StackAssignment(assignment) => {
                Statement::StackAssignment(StackAssignment {
                    span: assignment.span,
                    variable_name: self.copy_identifier(&assignment.variable_name)?,
                })
            }
            other => other.clone(),
        })
    }

    fn copy_block(&mut self, block: &Block) -> Result<Block> {
        self.enter_scope(block);
        let statements = self.copy_statements(&block.statements)?;
        self.leave_scope();
        Ok(Block {
            span: block.span,
            statements,
        })
    }

    fn copy_statements(&mut self, statements: &[Statement]) -> Result<Vec<Statement>> {
        statements
            .iter()
            .map(|statement| self.copy_statement(statement))
            .collect()
    }

    fn copy_statement(&mut self, statement: &Statement) -> Result<Statement> {
        Ok(match statement {
            Statement::Expression(expr) => Statement::Expression(self.copy_expression(expr)?),
            Statement::VariableDeclaration(decl) => {
                Statement::VariableDeclaration(self.copy_variable_declaration(decl)?)
            }
            Statement::Assignment(assignment) => {
                let variable_names = assignment
                    .variable_names
                    .iter()
                    .map(|ident| self.copy_identifier(ident))
                    .collect::<Result<Vec<_>>>()?;
                Statement::Assignment(Assignment {
                    span: assignment.span,
                    variable_names,
                    value: self.copy_expression(&assignment.value)?,
                })
            }
            Statement::If(if_stmt) => Statement::If(If {
                span: if_stmt.span,
                condition: self.copy_expression(&if_stmt.condition)?,
                body: self.copy_block(&if_stmt.body)?,
            }),
            Statement::Switch(switch) => {
                let expression = self.copy_expression(&switch.expression)?;
                let cases = switch
                    .cases
                    .iter()
                    .map(|case| self.copy_case(case))
                    .collect::<Result<Vec<_>>>()?;
                Statement::Switch(Switch {
                    span: switch.span,
                    expression,
                    cases,
                })
            }
            Statement::ForLoop(for_loop) => Statement::ForLoop(self.copy_for_loop(for_loop)?),
            Statement::FunctionDefinition(def) => {
                Statement::FunctionDefinition(self.copy_function_definition(def)?)
            }
            Statement::Block(block) => Statement::Block(self.copy_block(block)?),
            Statement::Label(_) | Statement::StackAssignment(_) | Statement::Instruction(_) => {
                self.copy_stack_form(statement)?
            }
        })
    }

    fn copy_case(&mut self, case: &Case) -> Result<Case> {
        Ok(Case {
            span: case.span,
            value: case.value.clone(),
            body: self.copy_block(&case.body)?,
        })
    }

    fn copy_for_loop(&mut self, for_loop: &ForLoop) -> Result<ForLoop> {
        self.enter_scope(&for_loop.pre);
        let pre = Block {
            span: for_loop.pre.span,
            statements: self.copy_statements(&for_loop.pre.statements)?,
        };
        let condition = self.copy_expression(&for_loop.condition)?;
        let post = self.copy_block(&for_loop.post)?;
        let body = self.copy_block(&for_loop.body)?;
        self.leave_scope();
        Ok(ForLoop {
            span: for_loop.span,
            pre,
            condition,
            post,
            body,
        })
    }

    fn copy_identifier(&mut self, ident: &Identifier) -> Result<Identifier> {
        Ok(Identifier {
            span: ident.span,
            name: self.translate_identifier(ident.name, ident.span)?,
        })
    }

    fn copy_optional_expression(&mut self, expr: Option<&Expression>) -> Result<Option<Expression>> {
        expr.map(|expr| self.copy_expression(expr)).transpose()
    }

    fn copy_expression(&mut self, expr: &Expression) -> Result<Expression> {
        Ok(match expr {
            Expression::Literal(literal) => Expression::Literal(literal.clone()),
            Expression::Identifier(ident) => Expression::Identifier(self.copy_identifier(ident)?),
            Expression::FunctionCall(call) => Expression::FunctionCall(FunctionCall {
                span: call.span,
                function_name: self.copy_identifier(&call.function_name)?,
                arguments: self.copy_arguments(&call.arguments)?,
            }),
            Expression::FunctionalInstruction(instr) => {
                Expression::FunctionalInstruction(FunctionalInstruction {
                    span: instr.span,
                    instruction: instr.instruction,
                    arguments: self.copy_arguments(&instr.arguments)?,
                })
            }
        })
    }

    fn copy_arguments(&mut self, arguments: &[Expression]) -> Result<Vec<Expression>> {
        arguments
            .iter()
            .map(|argument| self.copy_expression(argument))
            .collect()
    }
}

/// Copier with every hook left at its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct VerbatimCopier;

impl AstCopier for VerbatimCopier {}

/// Independent deep copy of `block`.
pub fn copy_verbatim(block: &Block) -> Result<Block> {
    VerbatimCopier.copy_block(block)
}
