//! Expression tree produced by the parser.
//!
//! Nodes are shared (`ExpPtr = Rc<Expression>`): a function's body hangs off
//! both its declaration and its `Func` type, and the checker revisits shared
//! bodies per generic instantiation. The tree is immutable in shape after
//! parsing; the checker only writes through the `return_type` slot and an
//! application's `generic_args`.

use std::cell::RefCell;
use std::rc::Rc;

use lachs::Span;

use super::operator::Operator;
use crate::lexer::Token;
use crate::types::ty::{Type, TypePtr};

pub type ExpPtr = Rc<Expression>;

/// Position and text of the token a node was built from, kept for
/// diagnostics and the runtime call-stack trace.
#[derive(Clone, Default)]
pub struct SourceToken {
    pub span: Span,
    pub text: String,
}

impl SourceToken {
    pub fn of(token: &Token) -> Self {
        Self {
            span: token.pos(),
            text: token.text(),
        }
    }
}

#[derive(Clone)]
pub enum LiteralValue {
    Int(i64),
    Char(char),
    Str(String),
    Bool(bool),
    Null,
}

pub struct Expression {
    pub token: SourceToken,
    pub kind: ExprKind,
    return_type: RefCell<TypePtr>,
}

pub enum ExprKind {
    Program {
        functions: Vec<ExpPtr>,
        body: ExpPtr,
    },
    /// A `func` declaration; its `Func` type (signature, body reference,
    /// inner environment) lives in the node's return type.
    Function {
        name: String,
        generics: Vec<TypePtr>,
        parameters: Vec<ExpPtr>,
        body: ExpPtr,
    },
    Literal(LiteralValue),
    Primitive {
        op: Operator,
        left: ExpPtr,
        right: ExpPtr,
    },
    Let {
        ident: String,
        value_type: TypePtr,
        value: ExpPtr,
        after: ExpPtr,
    },
    Reference {
        ident: String,
        field: Option<String>,
    },
    Branch {
        condition: ExpPtr,
        then_branch: ExpPtr,
        else_branch: ExpPtr,
    },
    Argument {
        name: String,
    },
    TypeclassDecl {
        ident: String,
        fields: Vec<ExpPtr>,
    },
    Application {
        callee: ExpPtr,
        arguments: Vec<ExpPtr>,
        /// Explicit generic instantiations; chained applications inherit the
        /// inner application's list during checking.
        generic_args: RefCell<Vec<TypePtr>>,
    },
    ListDefinition {
        values: Vec<ExpPtr>,
    },
    TupleDefinition {
        values: Vec<ExpPtr>,
    },
    Match {
        ident: String,
        cases: Vec<ExpPtr>,
    },
    Case {
        pattern: ExpPtr,
        body: ExpPtr,
    },
    /// Sentinel for the end of input; an empty program's body.
    End,
}

impl Expression {
    pub fn new(token: SourceToken, kind: ExprKind, return_type: TypePtr) -> ExpPtr {
        Rc::new(Expression {
            token,
            kind,
            return_type: RefCell::new(return_type),
        })
    }

    pub fn end() -> ExpPtr {
        Expression::new(SourceToken::default(), ExprKind::End, Type::null())
    }

    /// A handle on the node's current return type cell.
    pub fn return_type(&self) -> TypePtr {
        self.return_type.borrow().clone()
    }

    /// Point the node at a different return type cell.
    pub fn set_return_type(&self, ty: TypePtr) {
        *self.return_type.borrow_mut() = ty;
    }

    /// Kind name for debug dumps and "unknown expression" diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ExprKind::Program { .. } => "Program",
            ExprKind::Function { .. } => "Function",
            ExprKind::Literal(_) => "Literal",
            ExprKind::Primitive { .. } => "Primitive",
            ExprKind::Let { .. } => "Let",
            ExprKind::Reference { .. } => "Reference",
            ExprKind::Branch { .. } => "Branch",
            ExprKind::Argument { .. } => "Argument",
            ExprKind::TypeclassDecl { .. } => "Typeclass",
            ExprKind::Application { .. } => "Application",
            ExprKind::ListDefinition { .. } => "List",
            ExprKind::TupleDefinition { .. } => "Tuple",
            ExprKind::Match { .. } => "Match",
            ExprKind::Case { .. } => "Case",
            ExprKind::End => "End",
        }
    }

    /// True for the `$any` wildcard pattern of a match case.
    pub fn is_any_pattern(&self) -> bool {
        matches!(&self.kind, ExprKind::Reference { ident, .. } if ident == "$any")
    }
}
