use std::collections::HashMap;

use ilopt_core::{FunctionDefinition, Name, Span, Statement, TypedName, VariableDeclaration};

use crate::ast_copier::AstCopier;
use crate::error::{OptimiserError, Result};
use crate::name_dispenser::NameDispenser;

/// Copies a function body for one call site.
///
/// Parameters and return variables are substituted by the names in the
/// initial replacement map; every local declared in the body gets a fresh
/// name `<prefix><local>`. Names outside the map are left alone: they refer
/// to functions, which keep their names because the program has unique
/// names.
pub struct BodyCopier<'a> {
    dispenser: &'a mut NameDispenser,
    prefix: String,
    replacements: HashMap<Name, Name>,
}

impl<'a> BodyCopier<'a> {
    pub fn new(
        dispenser: &'a mut NameDispenser,
        prefix: impl Into<String>,
        replacements: HashMap<Name, Name>,
    ) -> Self {
        Self {
            dispenser,
            prefix: prefix.into(),
            replacements,
        }
    }
}

impl AstCopier for BodyCopier<'_> {
    fn translate_identifier(&mut self, name: Name, _span: Span) -> Result<Name> {
        Ok(self.replacements.get(&name).copied().unwrap_or(name))
    }

    fn copy_variable_declaration(
        &mut self,
        decl: &VariableDeclaration,
    ) -> Result<VariableDeclaration> {
        let value = self.copy_optional_expression(decl.value.as_ref())?;
        let mut variables = Vec::with_capacity(decl.variables.len());
        for variable in &decl.variables {
            let fresh = self
                .dispenser
                .new_name(&format!("{}{}", self.prefix, variable.name));
            self.replacements.insert(variable.name, fresh);
            variables.push(TypedName {
                span: variable.span,
                name: fresh,
                ty: variable.ty,
            });
        }
        Ok(VariableDeclaration {
            span: decl.span,
            variables,
            value,
        })
    }

    fn copy_function_definition(&mut self, def: &FunctionDefinition) -> Result<FunctionDefinition> {
        Err(OptimiserError::NestedFunctionInInlinedBody {
            name: def.name,
            span: def.span,
        })
    }

    fn copy_stack_form(&mut self, statement: &Statement) -> Result<Statement> {
        Err(OptimiserError::IllegalConstruct {
            construct: statement.kind_name(),
            span: statement.span(),
        })
    }
}
