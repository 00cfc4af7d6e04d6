//! Scope-aware renaming that gives every binding site a distinct name.
//!
//! The first binding of a name keeps it; later bindings of the same name get
//! a fresh one from a [`NameDispenser`] seeded with every name of the
//! program, so a renamed binding can never capture a name used elsewhere.
//! Running the pass on its own output changes nothing.

use std::collections::{BTreeSet, HashMap, HashSet};

use ilopt_core::{
    AnalysisInfo, Block, FunctionDefinition, Name, Span, Statement, TypedName,
    VariableDeclaration,
};

use crate::ast_copier::AstCopier;
use crate::error::{OptimiserError, Result};
use crate::name_collector::collect_names;
use crate::name_dispenser::NameDispenser;

pub struct Disambiguator<'a> {
    external: &'a BTreeSet<Name>,
    dispenser: NameDispenser,
    /// Names already given to some binding site.
    claimed: HashSet<Name>,
    scopes: Vec<HashMap<Name, Name>>,
    renamed: usize,
    bindings: usize,
}

impl<'a> Disambiguator<'a> {
    pub fn new(block: &Block, info: &'a AnalysisInfo) -> Self {
        let mut used = collect_names(block);
        used.extend(info.external_identifiers.iter().copied());
        Self {
            external: &info.external_identifiers,
            dispenser: NameDispenser::new(used),
            claimed: info.external_identifiers.iter().copied().collect(),
            scopes: Vec::new(),
            renamed: 0,
            bindings: 0,
        }
    }

    /// Copy of `block` with unique binding names.
    pub fn run(mut self, block: &Block) -> Result<Block> {
        let result = self.copy_block(block)?;
        tracing::debug!(
            bindings = self.bindings,
            renamed = self.renamed,
            "disambiguation finished"
        );
        Ok(result)
    }

    fn bind(&mut self, old: Name) -> Name {
        self.bindings += 1;
        let new = if self.claimed.insert(old) {
            old
        } else {
            let fresh = self.dispenser.new_name(old.as_str());
            self.claimed.insert(fresh);
            self.renamed += 1;
            tracing::trace!(from = %old, to = %fresh, "renamed binding");
            fresh
        };
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(old, new);
        }
        new
    }

    fn bind_typed(&mut self, typed: &TypedName) -> TypedName {
        TypedName {
            span: typed.span,
            name: self.bind(typed.name),
            ty: typed.ty,
        }
    }

    fn lookup(&self, name: Name) -> Option<Name> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name).copied())
    }
}

impl AstCopier for Disambiguator<'_> {
    fn translate_identifier(&mut self, name: Name, span: Span) -> Result<Name> {
        if let Some(new) = self.lookup(name) {
            return Ok(new);
        }
        if self.external.contains(&name) {
            return Ok(name);
        }
        Err(OptimiserError::UnresolvedName { name, span })
    }

    fn copy_variable_declaration(
        &mut self,
        decl: &VariableDeclaration,
    ) -> Result<VariableDeclaration> {
        // The initialiser cannot see the variables it initialises.
        let value = self.copy_optional_expression(decl.value.as_ref())?;
        let variables = decl.variables.iter().map(|v| self.bind_typed(v)).collect();
        Ok(VariableDeclaration {
            span: decl.span,
            variables,
            value,
        })
    }

    fn copy_function_definition(&mut self, def: &FunctionDefinition) -> Result<FunctionDefinition> {
        // Bound when the enclosing scope was entered.
        let name = match self.scopes.last().and_then(|scope| scope.get(&def.name)) {
            Some(name) => *name,
            None => self.bind(def.name),
        };
        self.scopes.push(HashMap::new());
        let parameters = def.parameters.iter().map(|p| self.bind_typed(p)).collect();
        let return_variables = def
            .return_variables
            .iter()
            .map(|r| self.bind_typed(r))
            .collect();
        let body = self.copy_block(&def.body);
        self.scopes.pop();
        Ok(FunctionDefinition {
            span: def.span,
            name,
            parameters,
            return_variables,
            body: body?,
        })
    }

    fn enter_scope(&mut self, block: &Block) {
        self.scopes.push(HashMap::new());
        for statement in &block.statements {
            if let Statement::FunctionDefinition(def) = statement {
                self.bind(def.name);
            }
        }
    }

    fn leave_scope(&mut self) {
        self.scopes.pop();
    }

    fn copy_stack_form(&mut self, statement: &Statement) -> Result<Statement> {
        Err(OptimiserError::IllegalConstruct {
            construct: statement.kind_name(),
            span: statement.span(),
        })
    }
}

/// Renames the bindings of `block` apart.
pub fn disambiguate(block: &Block, info: &AnalysisInfo) -> Result<Block> {
    Disambiguator::new(block, info).run(block)
}
