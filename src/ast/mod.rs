pub mod expression;
pub mod operator;

pub use expression::{ExpPtr, Expression, ExprKind, LiteralValue, SourceToken};
pub use operator::Operator;
