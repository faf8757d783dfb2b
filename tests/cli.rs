use std::fs;
use std::path::PathBuf;

use predicates::prelude::*;

fn bnt() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("bnt").unwrap()
}

fn write_program(dir: &tempfile::TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, source).unwrap();
    path
}

// ── argument handling ───────────────────────────────────────

#[test]
fn missing_argument_exits_one() {
    bnt().assert().failure().code(1);
}

#[test]
fn unknown_flag_exits_one() {
    bnt().args(["--frobnicate", "x.bnt"]).assert().code(1);
}

#[test]
fn wrong_extension_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("program.txt");
    fs::write(&file, "printInt(1)").unwrap();

    bnt().arg(file).assert().code(2);
}

#[test]
fn empty_source_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "empty.bnt", "");

    bnt().arg(file).assert().code(2);
}

#[test]
fn missing_file_exits_two() {
    bnt().arg("definitely-not-here.bnt").assert().code(2);
}

// ── stage failures ──────────────────────────────────────────

#[test]
fn lexer_error_exits_three() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "bad.bnt", "val @ = 1");

    bnt().arg(file).assert().code(3);
}

#[test]
fn parse_error_exits_four() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "bad.bnt", "val x int = 1; printInt(x)");

    bnt().arg(file).assert().code(4);
}

#[test]
fn type_error_exits_five() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "bad.bnt", "val x: int = true; printInt(x)");

    bnt()
        .arg(file)
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Mismatched type"));
}

#[test]
fn runtime_error_exits_six_with_trace() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "boom.bnt", "printInt(10 / 0)");

    bnt()
        .arg(file)
        .assert()
        .code(6)
        .stderr(predicate::str::contains("Division by zero"))
        .stderr(predicate::str::contains("Fatal error occurred"));
}

// ── concrete output scenarios ───────────────────────────────

#[test]
fn main_with_let_and_precedence_prints_seven() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "main.bnt",
        "func main() -> int = { val x: int = 1 + 2 * 3; printInt(x); 0 }; main()",
    );

    bnt().arg(file).assert().success().stdout("7\n");
}

#[test]
fn generic_factorial_prints_120() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "fact.bnt",
        "func fact[T](n: int) -> int = if (n == 0) 1 else n * fact[int](n - 1); printInt(fact[int](5))",
    );

    bnt().arg(file).assert().success().stdout("120\n");
}

#[test]
fn push_back_prints_extended_list() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "list.bnt",
        "val xs: List[int] = List{1,2,3}; printList(pushBack(xs, 4))",
    );

    bnt().arg(file).assert().success().stdout("(1, 2, 3, 4)\n");
}

#[test]
fn typeclass_field_access_prints_four() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "point.bnt",
        "type Pt { x: int, y: int }; val p: type Pt = Pt(3, 4); printInt(p.y)",
    );

    bnt().arg(file).assert().success().stdout("4\n");
}

#[test]
fn tuple_prints_with_quoted_char() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "tuple.bnt",
        "val t: Tuple[int,char] = Tuple{1,'a'}; print2Tuple(t)",
    );

    bnt().arg(file).assert().success().stdout("(1, 'a')\n");
}

#[test]
fn shadowing_prints_inner_then_outer() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "shadow.bnt",
        "val x: int = 1; { val x: int = 2; printInt(x) }; printInt(x)",
    );

    bnt().arg(file).assert().success().stdout("2\n1\n");
}

#[test]
fn mutual_recursion_runs() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "even.bnt",
        "func isEven(n: int) -> bool = if (n == 0) true else isOdd(n - 1); func isOdd(n: int) -> bool = if (n == 0) false else isEven(n - 1); printBool(isEven(10))",
    );

    bnt().arg(file).assert().success().stdout("true\n");
}

#[test]
fn match_with_string_scrutinee() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "match.bnt",
        "val s: string = \"hi\"; match (s) { case \"no\" = { printInt(1) }; case \"hi\" = { printInt(2) }; case any = { printInt(3) }; }",
    );

    bnt().arg(file).assert().success().stdout("2\n");
}

#[test]
fn match_with_only_any() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "any.bnt",
        "val n: int = 5; match (n) { case any = { printInt(9) }; }",
    );

    bnt().arg(file).assert().success().stdout("9\n");
}

#[test]
fn comments_are_ignored_outside_strings() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "comments.bnt",
        "# leading comment\nprintString(\"a # b\") # trailing comment",
    );

    bnt().arg(file).assert().success().stdout("a # b\n");
}

#[test]
fn halt_stops_the_program_with_success() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "halt.bnt", "printInt(1); halt(); printInt(2)");

    bnt().arg(file).assert().success().stdout("1\n");
}

#[test]
fn read_string_reads_one_token() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "echo.bnt", "printString(readString())");

    bnt()
        .arg(file)
        .write_stdin("hello world")
        .assert()
        .success()
        .stdout("hello\n");
}

#[test]
fn read_char_skips_whitespace() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "chars.bnt", "printChar(readChar()); printChar(readChar())");

    bnt()
        .arg(file)
        .write_stdin("  a b")
        .assert()
        .success()
        .stdout("a\nb\n");
}

#[test]
fn char_roundtrip_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "roundtrip.bnt",
        "printString(charListToString(stringToCharList(\"roundtrip\")))",
    );

    bnt().arg(file).assert().success().stdout("roundtrip\n");
}

#[test]
fn empty_list_front_is_a_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "front.bnt", "val xs: List[int] = List{}; printInt(front(xs))");

    bnt()
        .arg(file)
        .assert()
        .code(6)
        .stderr(predicate::str::contains("empty list"));
}

// ── imports ─────────────────────────────────────────────────

#[test]
fn import_splices_the_referenced_file() {
    let dir = tempfile::tempdir().unwrap();
    write_program(&dir, "lib.bnt", "func addTwo(x: int) -> int = x + 2;\n");
    let main = write_program(&dir, "main.bnt", "import lib\nprintInt(addTwo(40))");

    bnt()
        .current_dir(dir.path())
        .arg(main.file_name().unwrap())
        .assert()
        .success()
        .stdout("42\n");
}

#[test]
fn missing_import_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let main = write_program(&dir, "main.bnt", "import nowhere\nprintInt(1)");

    bnt()
        .current_dir(dir.path())
        .arg(main.file_name().unwrap())
        .assert()
        .code(4);
}

#[test]
fn cyclic_imports_terminate() {
    let dir = tempfile::tempdir().unwrap();
    write_program(&dir, "a.bnt", "import b\nfunc fromA() -> int = 1;\n");
    write_program(&dir, "b.bnt", "import a\nfunc fromB() -> int = 2;\n");
    let main = write_program(&dir, "main.bnt", "import a\nprintInt(fromA() + fromB())");

    bnt()
        .current_dir(dir.path())
        .arg(main.file_name().unwrap())
        .assert()
        .success()
        .stdout("3\n");
}

// ── debug flag ──────────────────────────────────────────────

#[test]
fn debug_flag_dumps_tokens_and_typed_ast() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "dbg.bnt", "printInt(1)");

    bnt()
        .arg("-d")
        .arg(file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Tokens"))
        .stdout(predicate::str::contains("Typed AST"))
        .stdout(predicate::str::contains("1\n"));
}
