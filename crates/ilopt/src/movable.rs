use ilopt_core::{Dialect, Expression};

/// Decides whether an expression can be moved across its siblings without
/// changing the program's behaviour.
pub struct MovableChecker<'a> {
    dialect: &'a Dialect,
}

impl<'a> MovableChecker<'a> {
    pub fn new(dialect: &'a Dialect) -> Self {
        Self { dialect }
    }

    pub fn is_movable(&self, expr: &Expression) -> bool {
        match expr {
            Expression::Literal(_) | Expression::Identifier(_) => true,
            Expression::FunctionalInstruction(instr) => {
                self.dialect
                    .builtin(instr.instruction)
                    .is_some_and(|builtin| builtin.movable)
                    && instr.arguments.iter().all(|arg| self.is_movable(arg))
            }
            // No effect summary exists for user functions.
            Expression::FunctionCall(_) => false,
        }
    }
}
