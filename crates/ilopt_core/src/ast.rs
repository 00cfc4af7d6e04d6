//! Tree model of the intermediate language.
//!
//! Expressions and statements are separate tagged enums. Every node carries
//! the [`Span`] it was parsed from; passes that synthesise nodes reuse the
//! span of the construct they replace.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Span;
use crate::intern::Name;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedName {
    pub span: Span,
    pub name: Name,
    pub ty: Option<Name>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralKind {
    Number,
    Boolean,
    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub span: Span,
    pub kind: LiteralKind,
    /// Textual value; for strings this is the unescaped content.
    pub value: String,
    pub ty: Option<Name>,
}

impl Literal {
    pub fn number(span: Span, value: impl Into<String>, ty: Option<Name>) -> Self {
        Self {
            span,
            kind: LiteralKind::Number,
            value: value.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub span: Span,
    pub name: Name,
}

impl Identifier {
    pub fn new(span: Span, name: Name) -> Self {
        Self { span, name }
    }
}

/// Call of a user-defined function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub span: Span,
    pub function_name: Identifier,
    pub arguments: Vec<Expression>,
}

/// Call of a built-in instruction of the dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionalInstruction {
    pub span: Span,
    pub instruction: Name,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expression")]
pub enum Expression {
    Literal(Literal),
    Identifier(Identifier),
    FunctionCall(FunctionCall),
    FunctionalInstruction(FunctionalInstruction),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Literal(lit) => lit.span,
            Expression::Identifier(ident) => ident.span,
            Expression::FunctionCall(call) => call.span,
            Expression::FunctionalInstruction(instr) => instr.span,
        }
    }

    pub fn identifier(span: Span, name: Name) -> Self {
        Expression::Identifier(Identifier::new(span, name))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    pub span: Span,
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(span: Span, statements: Vec<Statement>) -> Self {
        Self { span, statements }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub span: Span,
    pub variables: Vec<TypedName>,
    pub value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub span: Span,
    pub variable_names: Vec<Identifier>,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct If {
    pub span: Span,
    pub condition: Expression,
    pub body: Block,
}

/// One arm of a switch. `value == None` is the default arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub span: Span,
    pub value: Option<Literal>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    pub span: Span,
    pub expression: Expression,
    pub cases: Vec<Case>,
}

/// `for { pre } condition { post } { body }`; names declared in `pre` stay
/// visible in the condition, the post block and the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForLoop {
    pub span: Span,
    pub pre: Block,
    pub condition: Expression,
    pub post: Block,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub span: Span,
    pub name: Name,
    pub parameters: Vec<TypedName>,
    pub return_variables: Vec<TypedName>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub span: Span,
    pub name: Name,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackAssignment {
    pub span: Span,
    pub variable_name: Identifier,
}

/// Bare instruction operating on the implicit stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub span: Span,
    pub instruction: Name,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "statement")]
pub enum Statement {
    Expression(Expression),
    VariableDeclaration(VariableDeclaration),
    Assignment(Assignment),
    If(If),
    Switch(Switch),
    ForLoop(ForLoop),
    FunctionDefinition(FunctionDefinition),
    Block(Block),
    // Legacy stack forms: parseable in the loose dialect, rejected by every
    // optimiser pass.
    Label(Label),
    StackAssignment(StackAssignment),
    Instruction(Instruction),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Expression(expr) => expr.span(),
            Statement::VariableDeclaration(decl) => decl.span,
            Statement::Assignment(assignment) => assignment.span,
            Statement::If(if_stmt) => if_stmt.span,
            Statement::Switch(switch) => switch.span,
            Statement::ForLoop(for_loop) => for_loop.span,
            Statement::FunctionDefinition(def) => def.span,
            Statement::Block(block) => block.span,
            Statement::Label(label) => label.span,
            Statement::StackAssignment(assignment) => assignment.span,
            Statement::Instruction(instr) => instr.span,
        }
    }

    /// Human readable node kind, used in diagnostics and pass errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Expression(_) => "expression statement",
            Statement::VariableDeclaration(_) => "variable declaration",
            Statement::Assignment(_) => "assignment",
            Statement::If(_) => "if statement",
            Statement::Switch(_) => "switch statement",
            Statement::ForLoop(_) => "for loop",
            Statement::FunctionDefinition(_) => "function definition",
            Statement::Block(_) => "block",
            Statement::Label(_) => "label",
            Statement::StackAssignment(_) => "stack assignment",
            Statement::Instruction(_) => "bare instruction",
        }
    }
}
