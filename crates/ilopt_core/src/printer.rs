//! Canonical concrete syntax for the AST.
//!
//! The output re-parses to an identical tree (modulo spans), which is what
//! the end-to-end tests of the optimiser rely on.

use crate::ast::*;

const INDENT: &str = "    ";

pub fn print_block(block: &Block) -> String {
    let mut out = String::new();
    write_block(&mut out, block, 0);
    out
}

fn push_indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
}

fn write_block(out: &mut String, block: &Block, level: usize) {
    if block.statements.is_empty() {
        out.push_str("{ }");
        return;
    }
    out.push_str("{\n");
    for statement in &block.statements {
        push_indent(out, level + 1);
        write_statement(out, statement, level + 1);
        out.push('\n');
    }
    push_indent(out, level);
    out.push('}');
}

fn write_typed_names(out: &mut String, names: &[TypedName]) {
    for (index, typed) in names.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        out.push_str(typed.name.as_str());
        if let Some(ty) = typed.ty {
            out.push(':');
            out.push_str(ty.as_str());
        }
    }
}

fn write_statement(out: &mut String, statement: &Statement, level: usize) {
    match statement {
        Statement::Expression(expr) => write_expression(out, expr),
        Statement::VariableDeclaration(decl) => {
            out.push_str("let ");
            write_typed_names(out, &decl.variables);
            if let Some(value) = &decl.value {
                out.push_str(" := ");
                write_expression(out, value);
            }
        }
        Statement::Assignment(assignment) => {
            for (index, ident) in assignment.variable_names.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                out.push_str(ident.name.as_str());
            }
            out.push_str(" := ");
            write_expression(out, &assignment.value);
        }
        Statement::If(if_stmt) => {
            out.push_str("if ");
            write_expression(out, &if_stmt.condition);
            out.push(' ');
            write_block(out, &if_stmt.body, level);
        }
        Statement::Switch(switch) => {
            out.push_str("switch ");
            write_expression(out, &switch.expression);
            for case in &switch.cases {
                out.push('\n');
                push_indent(out, level);
                match &case.value {
                    Some(value) => {
                        out.push_str("case ");
                        write_literal(out, value);
                        out.push(' ');
                    }
                    None => out.push_str("default "),
                }
                write_block(out, &case.body, level);
            }
        }
        Statement::ForLoop(for_loop) => {
            out.push_str("for ");
            write_block(out, &for_loop.pre, level);
            out.push(' ');
            write_expression(out, &for_loop.condition);
            out.push(' ');
            write_block(out, &for_loop.post, level);
            out.push(' ');
            write_block(out, &for_loop.body, level);
        }
        Statement::FunctionDefinition(def) => {
            out.push_str("function ");
            out.push_str(def.name.as_str());
            out.push('(');
            write_typed_names(out, &def.parameters);
            out.push(')');
            if !def.return_variables.is_empty() {
                out.push_str(" -> ");
                write_typed_names(out, &def.return_variables);
            }
            out.push(' ');
            write_block(out, &def.body, level);
        }
        Statement::Block(block) => write_block(out, block, level),
        Statement::Label(label) => {
            out.push_str(label.name.as_str());
            out.push(':');
        }
        Statement::StackAssignment(assignment) => {
            out.push_str("=: ");
            out.push_str(assignment.variable_name.name.as_str());
        }
        Statement::Instruction(instr) => out.push_str(instr.instruction.as_str()),
    }
}

fn write_expression(out: &mut String, expression: &Expression) {
    match expression {
        Expression::Literal(literal) => write_literal(out, literal),
        Expression::Identifier(ident) => out.push_str(ident.name.as_str()),
        Expression::FunctionCall(call) => {
            out.push_str(call.function_name.name.as_str());
            write_arguments(out, &call.arguments);
        }
        Expression::FunctionalInstruction(instr) => {
            out.push_str(instr.instruction.as_str());
            write_arguments(out, &instr.arguments);
        }
    }
}

fn write_arguments(out: &mut String, arguments: &[Expression]) {
    out.push('(');
    for (index, argument) in arguments.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        write_expression(out, argument);
    }
    out.push(')');
}

fn write_literal(out: &mut String, literal: &Literal) {
    match literal.kind {
        LiteralKind::Number | LiteralKind::Boolean => out.push_str(&literal.value),
        LiteralKind::String => {
            out.push('"');
            for ch in literal.value.chars() {
                match ch {
                    '\\' => out.push_str("\\\\"),
                    '"' => out.push_str("\\\""),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    '\r' => out.push_str("\\r"),
                    c if (c as u32) < 0x20 || (0x7f..=0xff).contains(&(c as u32)) => {
                        out.push_str(&format!("\\x{:02x}", c as u32));
                    }
                    c => out.push(c),
                }
            }
            out.push('"');
        }
    }
    if let Some(ty) = literal.ty {
        out.push(':');
        out.push_str(ty.as_str());
    }
}
