use bnt::ast::ExpPtr;
use bnt::diagnostics::Diagnostics;
use bnt::interpreter::builtins;
use bnt::lexer;
use bnt::parser::Parser;
use bnt::types::TypeChecker;

/// Parse and check a program with the builtin prelude in front, the same
/// way the driver does.
fn check(source: &str) -> (ExpPtr, TypeChecker) {
    let full = format!("{}{}", builtins::PRELUDE, source);
    let offset = builtins::prelude_line_count();

    let tokens = lexer::tokenize(&full).unwrap();
    let mut parser = Parser::new(tokens, Diagnostics::new(&full, offset));
    let program = parser.parse();
    assert!(
        !parser.has_errors(),
        "unexpected parse errors in test program"
    );

    let mut checker = TypeChecker::new(Diagnostics::new(&full, offset));
    checker.check(&program);
    (program, checker)
}

fn accepts(source: &str) -> bool {
    !check(source).1.has_errors()
}

#[test]
fn literal_val_binding_checks() {
    assert!(accepts("val x: int = 1; printInt(x)"));
}

#[test]
fn literal_type_mismatch_is_rejected() {
    assert!(!accepts("val x: int = true; printInt(x)"));
}

#[test]
fn arithmetic_requires_ints() {
    assert!(accepts("printInt(1 + 2 * 3)"));
    assert!(!accepts("printInt(1 + true)"));
}

#[test]
fn boolean_operators_require_bools() {
    assert!(accepts("printBool(true && false)"));
    assert!(!accepts("printBool(true && 1)"));
}

#[test]
fn comparison_requires_matching_primitives() {
    assert!(accepts("printBool(1 < 2)"));
    assert!(accepts("printBool('a' == 'b')"));
    assert!(!accepts("printBool(1 == 'a')"));
}

#[test]
fn comparison_rejects_non_primitives() {
    assert!(!accepts(
        "val xs: List[int] = List{1}; printBool(xs == xs)"
    ));
}

#[test]
fn unknown_identifier_is_rejected() {
    assert!(!accepts("printInt(mystery)"));
}

#[test]
fn branch_arms_must_agree() {
    assert!(accepts("val x: int = if (true) 1 else 2; printInt(x)"));
    assert!(!accepts("val x: int = if (true) 1 else false; printInt(x)"));
}

#[test]
fn branch_condition_must_be_bool() {
    assert!(!accepts("val x: int = if (3) 1 else 2; printInt(x)"));
}

#[test]
fn application_arity_is_enforced() {
    assert!(!accepts("printInt(1, 2)"));
}

#[test]
fn generic_function_needs_explicit_types() {
    assert!(!accepts("func id[T](x: T) -> T = x; printInt(id(5))"));
    assert!(accepts("func id[T](x: T) -> T = x; printInt(id[int](5))"));
}

#[test]
fn types_for_non_templated_function_are_rejected() {
    assert!(!accepts(
        "func one() -> int = 1; printInt(one[int]())"
    ));
}

#[test]
fn generic_body_is_checked_at_instantiation() {
    // The body misuses the argument as an int; only the application makes
    // that checkable.
    assert!(!accepts(
        "func bad[T](x: T) -> int = x + 1; printInt(bad[bool](true))"
    ));
}

#[test]
fn self_recursive_generic_function_checks() {
    assert!(accepts(
        "func fact[T](n: int) -> int = if (n == 0) 1 else n * fact[int](n - 1); printInt(fact[int](5))"
    ));
}

#[test]
fn nested_generic_applications_check() {
    assert!(accepts(
        "func id[T](x: T) -> T = x; func wrap[T](x: T) -> T = id[T](x); printInt(wrap[int](7))"
    ));
}

#[test]
fn builtins_infer_generics_from_arguments() {
    assert!(accepts(
        "val xs: List[int] = List{1, 2, 3}; printList(pushBack(xs, 4))"
    ));
}

#[test]
fn list_elements_must_match_annotation() {
    assert!(accepts("val xs: List[int] = List{1, 2}; printInt(size(xs))"));
    assert!(!accepts("val xs: List[int] = List{1, 'a'}; printInt(size(xs))"));
}

#[test]
fn empty_list_adopts_expected_type() {
    assert!(accepts("val xs: List[int] = List{}; printInt(size(xs))"));
}

#[test]
fn list_indexing_takes_an_int() {
    assert!(accepts("val xs: List[int] = List{1, 2}; printInt(xs(0))"));
    assert!(!accepts("val xs: List[int] = List{1, 2}; printInt(xs('a'))"));
}

#[test]
fn tuple_annotation_must_match_literal() {
    assert!(accepts(
        "val t: Tuple[int, char] = Tuple{1, 'a'}; print2Tuple(t)"
    ));
    assert!(!accepts(
        "val t: Tuple[int, char] = Tuple{1, 2}; print2Tuple(t)"
    ));
}

#[test]
fn tuple_index_out_of_range_is_rejected() {
    assert!(!accepts(
        "val t: Tuple[int, char] = Tuple{1, 'a'}; printInt(t.5)"
    ));
}

#[test]
fn tuple_index_must_be_numeric() {
    assert!(!accepts(
        "val t: Tuple[int, char] = Tuple{1, 'a'}; printInt(t.first)"
    ));
}

#[test]
fn tuple_element_type_flows_to_use_site() {
    assert!(!accepts(
        "val t: Tuple[int, char] = Tuple{1, 'a'}; printChar(t.0)"
    ));
}

#[test]
fn typeclass_declaration_and_field_access_check() {
    assert!(accepts(
        "type Pt { x: int, y: int }; val p: type Pt = Pt(3, 4); printInt(p.y)"
    ));
}

#[test]
fn missing_typeclass_field_is_rejected() {
    assert!(!accepts(
        "type Pt { x: int, y: int }; val p: type Pt = Pt(3, 4); printInt(p.z)"
    ));
}

#[test]
fn typeclass_construction_arity_is_enforced() {
    assert!(!accepts(
        "type Pt { x: int, y: int }; val p: type Pt = Pt(3); printInt(p.x)"
    ));
}

#[test]
fn typeclass_field_types_are_enforced() {
    assert!(!accepts(
        "type Pt { x: int, y: int }; val p: type Pt = Pt(3, 'a'); printInt(p.x)"
    ));
}

#[test]
fn field_access_on_primitive_is_rejected() {
    assert!(!accepts("val x: int = 1; printInt(x.0)"));
}

#[test]
fn match_cases_check_against_scrutinee() {
    assert!(accepts(
        "val s: string = \"hi\"; match (s) { case \"hi\" = { printInt(1) }; case any = { printInt(2) }; }"
    ));
    assert!(!accepts(
        "val s: string = \"hi\"; match (s) { case 1 = { printInt(1) }; }"
    ));
}

#[test]
fn case_below_any_warns_without_failing() {
    let (_, checker) = check(
        "val s: string = \"hi\"; match (s) { case any = { printInt(1) }; case \"x\" = { printInt(2) }; }",
    );
    assert!(!checker.has_errors());
    assert!(!checker.diagnostics().reports().is_empty());
}

#[test]
fn mutual_recursion_pre_binds_function_names() {
    assert!(accepts(
        "func isEven(n: int) -> int = if (n == 0) 1 else isOdd(n - 1); func isOdd(n: int) -> int = if (n == 0) 0 else isEven(n - 1); printInt(isEven(10))"
    ));
}

#[test]
fn shadowing_rebinds_in_inner_scope_only() {
    assert!(accepts(
        "val x: int = 1; { val x: int = 2; printInt(x) }; printInt(x)"
    ));
}
