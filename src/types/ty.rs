//! # The Type Lattice
//!
//! Types are shared, interior-mutable cells: `TypePtr = Rc<RefCell<Type>>`.
//! The checker never substitutes through an explicit substitution map;
//! instead, [`compare`] performs one-sided unification by *rewriting*
//! `Unknown` cells in place. Because the parser and checker deliberately
//! alias cells (a list literal shares its element cell with its first
//! element's return type, a resolved generic aliases the cell bound in the
//! instantiation environment), a single rewrite propagates everywhere the
//! type is referenced.
//!
//! The `resolved` flag memoises the lazy type-check of generic function
//! bodies so an instantiation is only checked once per application site.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::expression::ExpPtr;
use crate::types::env::TypeEnvironment;

pub type TypePtr = Rc<RefCell<Type>>;

#[derive(Clone)]
pub struct Type {
    pub kind: TypeKind,
    pub resolved: bool,
}

#[derive(Clone)]
pub enum TypeKind {
    Int,
    Char,
    Str,
    Bool,
    Null,
    Unknown,
    List(TypePtr),
    Tuple(Vec<TypePtr>),
    Gen(String),
    Func(FuncType),
    Typeclass(TypeclassType),
}

/// Function signature plus the companion data the checker attaches: the
/// declaration body (checked lazily per generic instantiation) and the
/// inner environment captured at declaration time.
#[derive(Clone)]
pub struct FuncType {
    pub generics: Vec<TypePtr>,
    pub argument_types: Vec<TypePtr>,
    pub argument_names: Vec<String>,
    pub return_type: TypePtr,
    pub body: Option<ExpPtr>,
    pub inner_env: Option<TypeEnvironment>,
    pub is_builtin: bool,
}

/// A nominal record type: named product of named fields, order significant.
#[derive(Clone)]
pub struct TypeclassType {
    pub ident: String,
    pub fields: Vec<(String, TypePtr)>,
}

impl Type {
    fn cell(kind: TypeKind) -> TypePtr {
        Rc::new(RefCell::new(Type {
            kind,
            resolved: false,
        }))
    }

    pub fn int() -> TypePtr {
        Type::cell(TypeKind::Int)
    }

    pub fn char() -> TypePtr {
        Type::cell(TypeKind::Char)
    }

    pub fn string() -> TypePtr {
        Type::cell(TypeKind::Str)
    }

    pub fn bool() -> TypePtr {
        Type::cell(TypeKind::Bool)
    }

    pub fn null() -> TypePtr {
        Type::cell(TypeKind::Null)
    }

    pub fn unknown() -> TypePtr {
        Type::cell(TypeKind::Unknown)
    }

    pub fn list(element: TypePtr) -> TypePtr {
        Type::cell(TypeKind::List(element))
    }

    pub fn tuple(elements: Vec<TypePtr>) -> TypePtr {
        Type::cell(TypeKind::Tuple(elements))
    }

    pub fn gen(identifier: impl Into<String>) -> TypePtr {
        Type::cell(TypeKind::Gen(identifier.into()))
    }

    pub fn func(func: FuncType) -> TypePtr {
        Type::cell(TypeKind::Func(func))
    }

    pub fn typeclass(ident: impl Into<String>, fields: Vec<(String, TypePtr)>) -> TypePtr {
        Type::cell(TypeKind::Typeclass(TypeclassType {
            ident: ident.into(),
            fields,
        }))
    }
}

/// The name of a `Gen` type, if it is one.
pub fn gen_name(ty: &TypePtr) -> Option<String> {
    match &ty.borrow().kind {
        TypeKind::Gen(name) => Some(name.clone()),
        _ => None,
    }
}

/// `Int`, `Char`, `Str`, `Bool` and `Gen` count as primitive for operator
/// purposes; `Gen` optimistically, until instantiation pins it down.
pub fn is_primitive(ty: &TypePtr) -> bool {
    matches!(
        ty.borrow().kind,
        TypeKind::Int | TypeKind::Char | TypeKind::Str | TypeKind::Bool | TypeKind::Gen(_)
    )
}

/// One-sided unification. An `Unknown` on either side is rewritten to the
/// other side's content and the comparison succeeds; composite types
/// recurse, filling nested `Unknown` slots the same way; typeclasses
/// compare nominally; everything else compares by kind tag.
pub fn compare(left: &TypePtr, right: &TypePtr) -> bool {
    if Rc::ptr_eq(left, right) {
        return true;
    }

    if matches!(left.borrow().kind, TypeKind::Unknown) {
        let replacement = right.borrow().clone();
        *left.borrow_mut() = replacement;
        return true;
    }
    if matches!(right.borrow().kind, TypeKind::Unknown) {
        let replacement = left.borrow().clone();
        *right.borrow_mut() = replacement;
        return true;
    }

    let left_kind = left.borrow().kind.clone();
    let right_kind = right.borrow().kind.clone();

    match (left_kind, right_kind) {
        (TypeKind::Int, TypeKind::Int)
        | (TypeKind::Char, TypeKind::Char)
        | (TypeKind::Str, TypeKind::Str)
        | (TypeKind::Bool, TypeKind::Bool)
        | (TypeKind::Null, TypeKind::Null) => true,
        // A still-unreplaced generic compares optimistically; the lazy body
        // check at the instantiation site re-checks it with the generic
        // pinned to a concrete type.
        (TypeKind::Gen(_), _) | (_, TypeKind::Gen(_)) => true,
        (TypeKind::List(left_element), TypeKind::List(right_element)) => {
            compare(&left_element, &right_element)
        }
        (TypeKind::Tuple(left_elements), TypeKind::Tuple(right_elements)) => {
            if left_elements.len() != right_elements.len() {
                return false;
            }
            left_elements
                .iter()
                .zip(right_elements.iter())
                .all(|(l, r)| compare(l, r))
        }
        (TypeKind::Func(left_func), TypeKind::Func(right_func)) => {
            if left_func.argument_types.len() != right_func.argument_types.len() {
                return false;
            }
            left_func
                .argument_types
                .iter()
                .zip(right_func.argument_types.iter())
                .all(|(l, r)| compare(l, r))
                && compare(&left_func.return_type, &right_func.return_type)
        }
        (TypeKind::Typeclass(left_class), TypeKind::Typeclass(right_class)) => {
            left_class.ident == right_class.ident
        }
        _ => false,
    }
}

/// Shallow copy of a type before it flows into an expected-type slot, so
/// the mutating [`compare`] cannot pollute a function's stored signature.
/// One level is enough: the fresh cell is what absorbs rewrites, while
/// nested cells keep their identity for aliasing-based inference.
pub fn copy_argument_type(ty: &TypePtr) -> TypePtr {
    let borrowed = ty.borrow();
    match &borrowed.kind {
        TypeKind::Int => Type::int(),
        TypeKind::Char => Type::char(),
        TypeKind::Str => Type::string(),
        TypeKind::Bool => Type::bool(),
        TypeKind::Null => Type::null(),
        TypeKind::List(element) => Type::list(element.clone()),
        TypeKind::Tuple(elements) => Type::tuple(elements.clone()),
        TypeKind::Gen(name) => Type::gen(name.clone()),
        TypeKind::Func(func) => Type::func(func.clone()),
        TypeKind::Typeclass(class) => Type::typeclass(class.ident.clone(), class.fields.clone()),
        TypeKind::Unknown => Type::unknown(),
    }
}

/// Replace `Gen` slots by their bindings in `env`, recursing structurally
/// through lists, tuples and function signatures. A generic without a
/// binding is left in place.
pub fn resolve_type(slot: &mut TypePtr, env: &TypeEnvironment) {
    let replacement = match &slot.borrow().kind {
        TypeKind::Gen(name) => env.get_name(name),
        _ => None,
    };
    if let Some(bound) = replacement {
        *slot = bound;
        return;
    }

    let mut borrowed = slot.borrow_mut();
    match &mut borrowed.kind {
        TypeKind::List(element) => resolve_type(element, env),
        TypeKind::Tuple(elements) => {
            for element in elements {
                resolve_type(element, env);
            }
        }
        TypeKind::Func(func) => {
            for argument in &mut func.argument_types {
                resolve_type(argument, env);
            }
            resolve_type(&mut func.return_type, env);
        }
        _ => {}
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            TypeKind::Int => write!(f, "int"),
            TypeKind::Char => write!(f, "char"),
            TypeKind::Str => write!(f, "string"),
            TypeKind::Bool => write!(f, "bool"),
            TypeKind::Null => write!(f, "null"),
            TypeKind::Unknown => write!(f, "unknown"),
            TypeKind::List(element) => write!(f, "List[{}]", element.borrow()),
            TypeKind::Tuple(elements) => {
                write!(f, "Tuple[")?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element.borrow())?;
                }
                write!(f, "]")
            }
            TypeKind::Gen(name) => write!(f, "{}", name),
            TypeKind::Func(func) => {
                write!(f, "[")?;
                for (index, generic) in func.generics.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", generic.borrow())?;
                }
                write!(f, "](")?;
                for (index, argument) in func.argument_types.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", argument.borrow())?;
                }
                write!(f, ")->{}", func.return_type.borrow())
            }
            TypeKind::Typeclass(class) => write!(f, "{}", class.ident),
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_identical_primitives() {
        assert!(compare(&Type::int(), &Type::int()));
        assert!(compare(&Type::string(), &Type::string()));
        assert!(!compare(&Type::int(), &Type::bool()));
    }

    #[test]
    fn compare_rewrites_unknown_right() {
        let unknown = Type::unknown();
        assert!(compare(&Type::int(), &unknown));
        assert!(matches!(unknown.borrow().kind, TypeKind::Int));
    }

    #[test]
    fn compare_rewrites_unknown_left() {
        let unknown = Type::unknown();
        assert!(compare(&unknown, &Type::char()));
        assert!(matches!(unknown.borrow().kind, TypeKind::Char));
    }

    #[test]
    fn compare_fills_list_element() {
        let list = Type::list(Type::unknown());
        let concrete = Type::list(Type::int());
        assert!(compare(&list, &concrete));
        let borrowed = list.borrow();
        let TypeKind::List(element) = &borrowed.kind else {
            panic!("expected list");
        };
        assert!(matches!(element.borrow().kind, TypeKind::Int));
    }

    #[test]
    fn compare_tuple_size_mismatch() {
        let pair = Type::tuple(vec![Type::int(), Type::int()]);
        let triple = Type::tuple(vec![Type::int(), Type::int(), Type::int()]);
        assert!(!compare(&pair, &triple));
    }

    #[test]
    fn compare_tuple_fills_unknown_slot() {
        let partial = Type::tuple(vec![Type::unknown(), Type::char()]);
        let concrete = Type::tuple(vec![Type::int(), Type::char()]);
        assert!(compare(&partial, &concrete));
        let borrowed = partial.borrow();
        let TypeKind::Tuple(elements) = &borrowed.kind else {
            panic!("expected tuple");
        };
        assert!(matches!(elements[0].borrow().kind, TypeKind::Int));
    }

    #[test]
    fn compare_typeclass_is_nominal() {
        let a = Type::typeclass("Point", vec![("x".to_string(), Type::int())]);
        let b = Type::typeclass("Point", vec![]);
        let c = Type::typeclass("Vector", vec![]);
        assert!(compare(&a, &b));
        assert!(!compare(&a, &c));
    }

    #[test]
    fn compare_gens_ignore_names() {
        assert!(compare(&Type::gen("T"), &Type::gen("U")));
    }

    #[test]
    fn compare_unreplaced_gen_is_optimistic() {
        assert!(compare(&Type::gen("T"), &Type::int()));
        assert!(compare(&Type::list(Type::int()), &Type::gen("T")));
    }

    #[test]
    fn copy_is_one_level_deep() {
        let element = Type::unknown();
        let original = Type::list(element.clone());
        let copy = copy_argument_type(&original);
        assert!(!Rc::ptr_eq(&original, &copy));

        // The element cell is shared, so filling it through the copy also
        // fills it through the original.
        assert!(compare(&copy, &Type::list(Type::int())));
        assert!(matches!(element.borrow().kind, TypeKind::Int));
    }

    #[test]
    fn copy_protects_the_original_top_level() {
        let original = Type::unknown();
        let copy = copy_argument_type(&original);
        assert!(compare(&copy, &Type::int()));
        assert!(matches!(original.borrow().kind, TypeKind::Unknown));
    }

    #[test]
    fn resolve_replaces_bound_generic() {
        let env = TypeEnvironment::new();
        env.add_name("T", Type::int());

        let mut slot = Type::gen("T");
        resolve_type(&mut slot, &env);
        assert!(matches!(slot.borrow().kind, TypeKind::Int));
    }

    #[test]
    fn resolve_recurses_into_list() {
        let env = TypeEnvironment::new();
        env.add_name("T", Type::bool());

        let mut slot = Type::list(Type::gen("T"));
        resolve_type(&mut slot, &env);
        let borrowed = slot.borrow();
        let TypeKind::List(element) = &borrowed.kind else {
            panic!("expected list");
        };
        assert!(matches!(element.borrow().kind, TypeKind::Bool));
    }

    #[test]
    fn resolve_leaves_unbound_generic() {
        let env = TypeEnvironment::new();
        let mut slot = Type::gen("T");
        resolve_type(&mut slot, &env);
        assert!(matches!(&slot.borrow().kind, TypeKind::Gen(name) if name == "T"));
    }

    #[test]
    fn display_renders_composites() {
        let ty = Type::list(Type::tuple(vec![Type::int(), Type::char()]));
        assert_eq!(format!("{}", ty.borrow()), "List[Tuple[int, char]]");
    }
}
