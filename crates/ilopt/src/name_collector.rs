use std::collections::HashSet;

use ilopt_core::{Block, Name, Statement};

/// Records every binding name of a tree: declared variables, function
/// names, parameters, return variables and labels. Uses are not recorded.
pub struct NameCollector<'a> {
    names: &'a mut HashSet<Name>,
}

impl<'a> NameCollector<'a> {
    pub fn new(names: &'a mut HashSet<Name>) -> Self {
        Self { names }
    }

    pub fn visit_block(&mut self, block: &Block) {
        for statement in &block.statements {
            self.visit_statement(statement);
        }
    }

    pub fn visit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VariableDeclaration(decl) => {
                self.names.extend(decl.variables.iter().map(|v| v.name));
            }
            Statement::FunctionDefinition(def) => {
                self.names.insert(def.name);
                self.names.extend(def.parameters.iter().map(|p| p.name));
                self.names.extend(def.return_variables.iter().map(|r| r.name));
                self.visit_block(&def.body);
            }
            Statement::If(if_stmt) => self.visit_block(&if_stmt.body),
            Statement::Switch(switch) => {
                for case in &switch.cases {
                    self.visit_block(&case.body);
                }
            }
            Statement::ForLoop(for_loop) => {
                self.visit_block(&for_loop.pre);
                self.visit_block(&for_loop.post);
                self.visit_block(&for_loop.body);
            }
            Statement::Block(block) => self.visit_block(block),
            Statement::Label(label) => {
                self.names.insert(label.name);
            }
            Statement::Expression(_)
            | Statement::Assignment(_)
            | Statement::StackAssignment(_)
            | Statement::Instruction(_) => {}
        }
    }
}

/// All binding names of `block`.
pub fn collect_names(block: &Block) -> HashSet<Name> {
    let mut names = HashSet::new();
    NameCollector::new(&mut names).visit_block(block);
    names
}
