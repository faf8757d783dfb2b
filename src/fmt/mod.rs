//! Debug dumps for the `-d` flag.
//!
//! Renders stage headers, the token stream and an indented typed-AST tree
//! so a build can be inspected stage by stage.

use crate::ast::expression::{ExpPtr, ExprKind, LiteralValue};
use crate::lexer::Token;

const INDENT: &str = "  ";

pub fn print_header(title: &str) {
    println!("──── {} ────", title);
}

pub fn dump_tokens(tokens: &[Token]) -> String {
    let mut buffer = String::new();
    for token in tokens {
        buffer.push_str(&token.describe());
        buffer.push('\n');
    }
    buffer
}

pub fn dump_ast(root: &ExpPtr) -> String {
    let mut printer = TreePrinter::new();
    printer.write_node(root);
    printer.finish()
}

struct TreePrinter {
    buffer: String,
    indent_level: usize,
}

impl TreePrinter {
    fn new() -> Self {
        Self {
            buffer: String::new(),
            indent_level: 0,
        }
    }

    fn finish(self) -> String {
        self.buffer
    }

    fn write_line(&mut self, line: &str) {
        for _ in 0..self.indent_level {
            self.buffer.push_str(INDENT);
        }
        self.buffer.push_str(line);
        self.buffer.push('\n');
    }

    fn write_children(&mut self, children: &[&ExpPtr]) {
        self.indent_level += 1;
        for child in children {
            self.write_node(child);
        }
        self.indent_level -= 1;
    }

    fn write_node(&mut self, node: &ExpPtr) {
        let return_type = node.return_type();
        let header = match &node.kind {
            ExprKind::Literal(literal) => {
                let rendered = match literal {
                    LiteralValue::Int(value) => value.to_string(),
                    LiteralValue::Char(value) => format!("'{}'", value),
                    LiteralValue::Str(value) => format!("\"{}\"", value),
                    LiteralValue::Bool(value) => value.to_string(),
                    LiteralValue::Null => "null".to_string(),
                };
                format!("Literal {} : {}", rendered, return_type.borrow())
            }
            ExprKind::Reference { ident, field } => match field {
                Some(field) => {
                    format!("Reference {}.{} : {}", ident, field, return_type.borrow())
                }
                None => format!("Reference {} : {}", ident, return_type.borrow()),
            },
            ExprKind::Function { name, .. } => {
                format!("Function {} : {}", name, return_type.borrow())
            }
            ExprKind::Let { ident, .. } => format!("Let {} : {}", ident, return_type.borrow()),
            ExprKind::Primitive { op, .. } => {
                format!("Primitive {} : {}", op, return_type.borrow())
            }
            ExprKind::Match { ident, .. } => format!("Match {} : {}", ident, return_type.borrow()),
            ExprKind::TypeclassDecl { ident, .. } => {
                format!("Typeclass {} : {}", ident, return_type.borrow())
            }
            ExprKind::Argument { name } => format!("Argument {} : {}", name, return_type.borrow()),
            _ => format!("{} : {}", node.kind_name(), return_type.borrow()),
        };
        self.write_line(&header);

        match &node.kind {
            ExprKind::Program { functions, body } => {
                let mut children: Vec<&ExpPtr> = functions.iter().collect();
                children.push(body);
                self.write_children(&children);
            }
            ExprKind::Function {
                parameters, body, ..
            } => {
                let mut children: Vec<&ExpPtr> = parameters.iter().collect();
                children.push(body);
                self.write_children(&children);
            }
            ExprKind::Primitive { left, right, .. } => {
                self.write_children(&[left, right]);
            }
            ExprKind::Let { value, after, .. } => {
                self.write_children(&[value, after]);
            }
            ExprKind::Branch {
                condition,
                then_branch,
                else_branch,
            } => {
                self.write_children(&[condition, then_branch, else_branch]);
            }
            ExprKind::TypeclassDecl { fields, .. } => {
                self.write_children(&fields.iter().collect::<Vec<_>>());
            }
            ExprKind::Application {
                callee, arguments, ..
            } => {
                let mut children: Vec<&ExpPtr> = vec![callee];
                children.extend(arguments.iter());
                self.write_children(&children);
            }
            ExprKind::ListDefinition { values } | ExprKind::TupleDefinition { values } => {
                self.write_children(&values.iter().collect::<Vec<_>>());
            }
            ExprKind::Match { cases, .. } => {
                self.write_children(&cases.iter().collect::<Vec<_>>());
            }
            ExprKind::Case { pattern, body } => {
                self.write_children(&[pattern, body]);
            }
            _ => {}
        }
    }
}
