use bnt::ast::ExpPtr;
use bnt::diagnostics::Diagnostics;
use bnt::interpreter::builtins;
use bnt::interpreter::value::{ValueKind, ValuePtr};
use bnt::interpreter::Interpreter;
use bnt::lexer;
use bnt::parser::Parser;
use bnt::types::TypeChecker;

/// Run a program through the full pipeline and hand back the value its body
/// reduced to, or None if a runtime error occurred.
fn run(source: &str) -> Option<ValuePtr> {
    let full = format!("{}{}", builtins::PRELUDE, source);
    let offset = builtins::prelude_line_count();

    let tokens = lexer::tokenize(&full).unwrap();
    let mut parser = Parser::new(tokens, Diagnostics::new(&full, offset));
    let program: ExpPtr = parser.parse();
    assert!(!parser.has_errors(), "unexpected parse errors");

    let mut checker = TypeChecker::new(Diagnostics::new(&full, offset));
    checker.check(&program);
    assert!(!checker.has_errors(), "unexpected type errors");

    let mut interpreter = Interpreter::new(Diagnostics::new(&full, offset));
    interpreter.eval_root(&program).ok()
}

fn run_int(source: &str) -> i64 {
    let value = run(source).expect("program failed");
    match &value.kind {
        ValueKind::Int(result) => *result,
        _ => panic!("expected int result"),
    }
}

#[test]
fn arithmetic_follows_precedence() {
    assert_eq!(run_int("1 + 2 * 3"), 7);
    assert_eq!(run_int("10 % 3"), 1);
    assert_eq!(run_int("-5 + 2"), -3);
}

#[test]
fn let_binding_evaluates_body() {
    assert_eq!(run_int("val x: int = 6; x * 7"), 42);
}

#[test]
fn shadowing_restores_outer_binding() {
    assert_eq!(
        run_int("val x: int = 1; val y: int = { val x: int = 2; x }; x * 10 + y"),
        12
    );
}

#[test]
fn function_call_binds_parameters() {
    assert_eq!(
        run_int("func add(a: int, b: int) -> int = a + b; add(40, 2)"),
        42
    );
}

#[test]
fn recursion_reaches_the_base_case() {
    assert_eq!(
        run_int("func fact(n: int) -> int = if (n == 0) 1 else n * fact(n - 1); fact(5)"),
        120
    );
}

#[test]
fn generic_recursion_evaluates() {
    assert_eq!(
        run_int("func fact[T](n: int) -> int = if (n == 0) 1 else n * fact[int](n - 1); fact[int](5)"),
        120
    );
}

#[test]
fn mutual_recursion_between_top_level_functions() {
    assert_eq!(
        run_int(
            "func isEven(n: int) -> int = if (n == 0) 1 else isOdd(n - 1); func isOdd(n: int) -> int = if (n == 0) 0 else isEven(n - 1); isEven(10)"
        ),
        1
    );
}

#[test]
fn generic_identity_returns_its_argument() {
    assert_eq!(run_int("func id[T](x: T) -> T = x; id[int](7)"), 7);
}

#[test]
fn chained_application_calls_the_returned_function() {
    assert_eq!(
        run_int(
            "func add(a: int) -> (int) -> int = { func inner(b: int) -> int = a + b; inner }; add(40)(2)"
        ),
        42
    );
}

#[test]
fn branch_without_else_yields_null() {
    let value = run("if (false) 1").expect("program failed");
    assert!(matches!(value.kind, ValueKind::Null));
}

#[test]
fn string_equality_and_concat() {
    let value = run("func cat(a: string, b: string) -> string = a + b; cat(\"ab\", \"cd\")")
        .expect("program failed");
    assert!(matches!(&value.kind, ValueKind::Str(s) if s.as_str() == "abcd"));
}

#[test]
fn list_indexing_returns_the_element() {
    assert_eq!(run_int("val xs: List[int] = List{5, 6}; xs(1)"), 6);
}

#[test]
fn list_index_out_of_bounds_is_fatal() {
    assert!(run("val xs: List[int] = List{5, 6}; xs(9)").is_none());
}

#[test]
fn division_by_zero_is_fatal() {
    assert!(run("10 / 0").is_none());
    assert!(run("10 % 0").is_none());
}

#[test]
fn size_and_is_empty() {
    assert_eq!(run_int("size(List{1, 2, 3})"), 3);
    let value = run("isEmpty(List{})").expect("program failed");
    assert!(matches!(value.kind, ValueKind::Bool(true)));
}

#[test]
fn push_back_is_pure() {
    assert_eq!(
        run_int("val xs: List[int] = List{1}; val ys: List[int] = pushBack(xs, 2); size(xs)"),
        1
    );
    assert_eq!(
        run_int("val xs: List[int] = List{1}; size(pushBack(xs, 2))"),
        2
    );
}

#[test]
fn insert_in_place_mutates_the_list() {
    assert_eq!(
        run_int("val xs: List[int] = List{1}; insertInPlace(xs, 2, 0); size(xs)"),
        2
    );
}

#[test]
fn append_mutates_combine_does_not() {
    assert_eq!(
        run_int("val xs: List[int] = List{1}; val ys: List[int] = List{2, 3}; append(xs, ys); size(xs)"),
        3
    );
    assert_eq!(
        run_int("val xs: List[int] = List{1}; val ys: List[int] = List{2, 3}; combine(xs, ys); size(xs)"),
        1
    );
}

#[test]
fn combine_with_empty_list_is_identity_on_size() {
    assert_eq!(
        run_int("val xs: List[int] = List{1, 2, 3}; size(combine(xs, List{}))"),
        3
    );
}

#[test]
fn head_and_tail_shrink_by_one() {
    assert_eq!(
        run_int("val xs: List[int] = List{1, 2, 3}; front(tail(xs))"),
        2
    );
    assert_eq!(
        run_int("val xs: List[int] = List{1, 2, 3}; back(head(xs))"),
        2
    );
}

#[test]
fn range_is_inclusive_on_both_ends() {
    assert_eq!(
        run_int("val xs: List[int] = List{1, 2, 3, 4, 5}; size(range(xs, 1, 3))"),
        3
    );
}

#[test]
fn empty_list_operations_are_fatal() {
    assert!(run("val xs: List[int] = List{}; front(xs)").is_none());
    assert!(run("val xs: List[int] = List{}; back(xs)").is_none());
    assert!(run("val xs: List[int] = List{}; head(xs)").is_none());
    assert!(run("val xs: List[int] = List{}; tail(xs)").is_none());
    assert!(run("val xs: List[int] = List{}; remove(xs, 0)").is_none());
    assert!(run("val xs: List[int] = List{}; replace(xs, 1, 0)").is_none());
    assert!(run("val xs: List[int] = List{}; range(xs, 0, 0)").is_none());
}

#[test]
fn remove_and_replace_by_index() {
    assert_eq!(
        run_int("val xs: List[int] = List{1, 2, 3}; front(remove(xs, 0))"),
        2
    );
    assert_eq!(
        run_int("val xs: List[int] = List{1, 2, 3}; front(replace(xs, 9, 0))"),
        9
    );
}

#[test]
fn char_int_conversions_roundtrip() {
    assert_eq!(run_int("charToInt(intToChar(65))"), 65);
    let value = run("intToChar(97)").expect("program failed");
    assert!(matches!(value.kind, ValueKind::Char('a')));
}

#[test]
fn string_char_list_roundtrip() {
    let value = run("charListToString(stringToCharList(\"hello\"))").expect("program failed");
    assert!(matches!(&value.kind, ValueKind::Str(s) if s.as_str() == "hello"));
}

#[test]
fn tuple_field_access_by_index() {
    assert_eq!(run_int("val t: Tuple[int, char] = Tuple{41, 'a'}; t.0 + 1"), 42);
}

#[test]
fn typeclass_construction_and_field_access() {
    assert_eq!(
        run_int("type Pt { x: int, y: int }; val p: type Pt = Pt(3, 4); p.y"),
        4
    );
}

#[test]
fn typeclass_values_are_independent() {
    assert_eq!(
        run_int(
            "type Pt { x: int, y: int }; val p: type Pt = Pt(1, 2); val q: type Pt = Pt(3, 4); p.x + q.x"
        ),
        4
    );
}

#[test]
fn match_selects_first_equal_case() {
    assert_eq!(
        run_int(
            "val s: string = \"b\"; match (s) { case \"a\" = { 1 }; case \"b\" = { 2 }; case any = { 3 }; }"
        ),
        2
    );
}

#[test]
fn match_any_catches_everything() {
    assert_eq!(run_int("val n: int = 99; match (n) { case any = { 7 }; }"), 7);
}

#[test]
fn match_without_any_falls_through_to_null() {
    let value = run("val n: int = 3; match (n) { case 1 = { 1 }; }").expect("program failed");
    assert!(matches!(value.kind, ValueKind::Null));
}

#[test]
fn closure_captures_declaration_environment() {
    // The constant is captured when makeAdder's inner function is declared;
    // a later top-level binding with the same name must not leak in.
    assert_eq!(
        run_int(
            "func base() -> int = 40; func addBase(x: int) -> int = base() + x; val base2: int = 0; addBase(2)"
        ),
        42
    );
}
