pub mod check;
pub mod env;
pub mod ty;

pub use check::TypeChecker;
pub use env::{Environment, TypeEnvironment};
pub use ty::{FuncType, Type, TypeKind, TypePtr};
