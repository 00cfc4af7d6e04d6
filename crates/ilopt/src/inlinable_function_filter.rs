use std::collections::BTreeMap;

use ilopt_core::{Block, Expression, FunctionDefinition, Name, Statement};

use crate::error::{OptimiserError, Result};

/// Finds the functions that can be substituted directly into expressions:
/// one return variable `r` and a body consisting of the single assignment
/// `r := <expr>`, where `<expr>` mentions neither `r` nor the function.
///
/// Expects unique names, so the result is keyed by name.
#[derive(Default)]
pub struct InlinableFunctionFilter {
    functions: BTreeMap<Name, FunctionDefinition>,
}

impl InlinableFunctionFilter {
    pub fn run(mut self, block: &Block) -> Result<BTreeMap<Name, FunctionDefinition>> {
        self.visit_block(block)?;
        Ok(self.functions)
    }

    fn visit_block(&mut self, block: &Block) -> Result<()> {
        block
            .statements
            .iter()
            .try_for_each(|statement| self.visit_statement(statement))
    }

    fn visit_statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::FunctionDefinition(def) => {
                if is_inlinable(def) {
                    self.functions.insert(def.name, def.clone());
                }
                self.visit_block(&def.body)
            }
            Statement::If(if_stmt) => self.visit_block(&if_stmt.body),
            Statement::Switch(switch) => switch
                .cases
                .iter()
                .try_for_each(|case| self.visit_block(&case.body)),
            Statement::ForLoop(for_loop) => {
                self.visit_block(&for_loop.pre)?;
                self.visit_block(&for_loop.post)?;
                self.visit_block(&for_loop.body)
            }
            Statement::Block(block) => self.visit_block(block),
            Statement::Expression(_)
            | Statement::VariableDeclaration(_)
            | Statement::Assignment(_) => Ok(()),
            Statement::Label(_) | Statement::StackAssignment(_) | Statement::Instruction(_) => {
                Err(OptimiserError::IllegalConstruct {
                    construct: statement.kind_name(),
                    span: statement.span(),
                })
            }
        }
    }
}

fn is_inlinable(def: &FunctionDefinition) -> bool {
    let [ret] = def.return_variables.as_slice() else {
        return false;
    };
    let [Statement::Assignment(assignment)] = def.body.statements.as_slice() else {
        return false;
    };
    let [target] = assignment.variable_names.as_slice() else {
        return false;
    };
    target.name == ret.name && !mentions(&assignment.value, &[def.name, ret.name])
}

fn mentions(expr: &Expression, names: &[Name]) -> bool {
    match expr {
        Expression::Literal(_) => false,
        Expression::Identifier(ident) => names.contains(&ident.name),
        Expression::FunctionCall(call) => {
            names.contains(&call.function_name.name)
                || call.arguments.iter().any(|arg| mentions(arg, names))
        }
        Expression::FunctionalInstruction(instr) => {
            instr.arguments.iter().any(|arg| mentions(arg, names))
        }
    }
}

/// Functions of `block` that qualify for substitution into expressions.
pub fn inlinable_functions(block: &Block) -> Result<BTreeMap<Name, FunctionDefinition>> {
    InlinableFunctionFilter::default().run(block)
}
