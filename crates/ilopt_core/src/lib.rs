#![deny(clippy::unwrap_used)]

pub mod analysis;
pub mod ast;
mod diagnostics;
pub mod dialect;
mod intern;
pub mod lexer;
mod parser;
mod printer;

pub use analysis::{analyze, AnalysisInfo, Analyzer};
pub use ast::{
    Assignment, Block, Case, Expression, ForLoop, FunctionCall, FunctionDefinition,
    FunctionalInstruction, Identifier, If, Instruction, Label, Literal, LiteralKind,
    StackAssignment, Statement, Switch, TypedName, VariableDeclaration,
};
pub use diagnostics::{
    diagnostics_have_errors, render_diagnostics, Diagnostic, DiagnosticLabel, DiagnosticSeverity,
    Position, Span,
};
pub use dialect::{BuiltinInstruction, Dialect, BUILTIN_INSTRUCTIONS};
pub use intern::Name;
pub use parser::parse;
pub use printer::print_block;

/// Parses and analyses `source`, returning the tree together with its
/// analysis. Diagnostics of either phase are returned unrendered.
pub fn parse_and_analyze(
    source: &str,
    dialect: &Dialect,
    external_identifiers: impl IntoIterator<Item = Name>,
) -> Result<(Block, AnalysisInfo), Vec<Diagnostic>> {
    let (block, diagnostics) = parse(source, dialect);
    let Some(block) = block else {
        return Err(diagnostics);
    };
    let info = Analyzer::new(dialect)
        .with_external_identifiers(external_identifiers)
        .analyze(&block)?;
    Ok((block, info))
}
