//! Native implementations of the builtin prelude.
//!
//! The prelude declares every builtin as an ordinary function so the parser
//! and checker treat them like user code; at run time the dispatch tag on
//! the function value routes the call here instead of walking the dummy
//! body. A builtin reads its arguments by parameter name from the call
//! environment.

use std::io::{self, Read, Write};
use std::process;

use lachs::Span;

use super::value::{FunctionValue, Value, ValueEnvironment, ValueKind, ValuePtr};
use super::{EvalResult, Interpreter, RuntimeError};
use crate::types::ty::{compare, Type, TypeKind, TypePtr};

/// Builtin prelude source, prepended to every program before lexing.
pub const PRELUDE: &str = include_str!("../../std/prelude.bnt");

/// Number of lines the prelude adds in front of user code; diagnostics
/// subtract it so positions match the user's file.
pub fn prelude_line_count() -> usize {
    PRELUDE.lines().count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Insert,
    Remove,
    Replace,
    PushFront,
    PushBack,
    InsertInPlace,
    RemoveInPlace,
    ReplaceInPlace,
    Front,
    Back,
    Head,
    Tail,
    Combine,
    Append,
    Size,
    Range,
    IsEmpty,
    PrintList,
    Print2Tuple,
    Print3Tuple,
    Print4Tuple,
    IntToChar,
    CharToInt,
    StringToCharList,
    CharListToString,
    PrintInt,
    PrintBool,
    PrintChar,
    PrintString,
    ReadChar,
    ReadString,
    Halt,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        match name {
            "insert" => Some(Builtin::Insert),
            "remove" => Some(Builtin::Remove),
            "replace" => Some(Builtin::Replace),
            "pushFront" => Some(Builtin::PushFront),
            "pushBack" => Some(Builtin::PushBack),
            "insertInPlace" => Some(Builtin::InsertInPlace),
            "removeInPlace" => Some(Builtin::RemoveInPlace),
            "replaceInPlace" => Some(Builtin::ReplaceInPlace),
            "front" => Some(Builtin::Front),
            "back" => Some(Builtin::Back),
            "head" => Some(Builtin::Head),
            "tail" => Some(Builtin::Tail),
            "combine" => Some(Builtin::Combine),
            "append" => Some(Builtin::Append),
            "size" => Some(Builtin::Size),
            "range" => Some(Builtin::Range),
            "isEmpty" => Some(Builtin::IsEmpty),
            "printList" => Some(Builtin::PrintList),
            "print2Tuple" => Some(Builtin::Print2Tuple),
            "print3Tuple" => Some(Builtin::Print3Tuple),
            "print4Tuple" => Some(Builtin::Print4Tuple),
            "intToChar" => Some(Builtin::IntToChar),
            "charToInt" => Some(Builtin::CharToInt),
            "stringToCharList" => Some(Builtin::StringToCharList),
            "charListToString" => Some(Builtin::CharListToString),
            "printInt" => Some(Builtin::PrintInt),
            "printBool" => Some(Builtin::PrintBool),
            "printChar" => Some(Builtin::PrintChar),
            "printString" => Some(Builtin::PrintString),
            "readChar" => Some(Builtin::ReadChar),
            "readString" => Some(Builtin::ReadString),
            "halt" => Some(Builtin::Halt),
            _ => None,
        }
    }
}

impl Interpreter {
    pub(super) fn run_builtin(
        &mut self,
        builtin: Builtin,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        match builtin {
            Builtin::Insert => self.insert_builtin(span, function, environment, false),
            Builtin::InsertInPlace => self.insert_builtin(span, function, environment, true),
            Builtin::Remove => self.remove_builtin(span, function, environment, false),
            Builtin::RemoveInPlace => self.remove_builtin(span, function, environment, true),
            Builtin::Replace => self.replace_builtin(span, function, environment, false),
            Builtin::ReplaceInPlace => self.replace_builtin(span, function, environment, true),
            Builtin::PushFront => self.push_builtin(span, function, environment, true),
            Builtin::PushBack => self.push_builtin(span, function, environment, false),
            Builtin::Front => self.front_builtin(span, function, environment),
            Builtin::Back => self.back_builtin(span, function, environment),
            Builtin::Head => self.head_builtin(span, function, environment),
            Builtin::Tail => self.tail_builtin(span, function, environment),
            Builtin::Combine => self.combine_builtin(span, function, environment, false),
            Builtin::Append => self.combine_builtin(span, function, environment, true),
            Builtin::Size => self.size_builtin(span, function, environment),
            Builtin::Range => self.range_builtin(span, function, environment),
            Builtin::IsEmpty => self.is_empty_builtin(span, function, environment),
            Builtin::PrintList => self.print_list_builtin(span, function, environment),
            Builtin::Print2Tuple => self.print_tuple_builtin(span, function, environment, "print2Tuple"),
            Builtin::Print3Tuple => self.print_tuple_builtin(span, function, environment, "print3Tuple"),
            Builtin::Print4Tuple => self.print_tuple_builtin(span, function, environment, "print4Tuple"),
            Builtin::IntToChar => self.int_to_char_builtin(span, function, environment),
            Builtin::CharToInt => self.char_to_int_builtin(span, function, environment),
            Builtin::StringToCharList => self.string_to_char_list_builtin(span, function, environment),
            Builtin::CharListToString => self.char_list_to_string_builtin(span, function, environment),
            Builtin::PrintInt => self.print_int_builtin(span, function, environment),
            Builtin::PrintBool => self.print_bool_builtin(span, function, environment),
            Builtin::PrintChar => self.print_char_builtin(span, function, environment),
            Builtin::PrintString => self.print_string_builtin(span, function, environment),
            Builtin::ReadChar => self.read_char_builtin(),
            Builtin::ReadString => self.read_string_builtin(),
            Builtin::Halt => {
                let _ = io::stdout().flush();
                process::exit(0);
            }
        }
    }

    // ── argument access ────────────────────────────────────────────────

    fn argument(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
        index: usize,
    ) -> EvalResult {
        let Some(name) = function.parameter_names.get(index) else {
            return Err(self.fatal(span, "Error: Builtin argument missing"));
        };
        let name = name.clone();
        self.get_name(span, environment, &name)
    }

    fn int_argument(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
        index: usize,
    ) -> Result<i64, RuntimeError> {
        let value = self.argument(span, function, environment, index)?;
        match &value.kind {
            ValueKind::Int(int) => Ok(*int),
            _ => Err(self.fatal(span, "Error: Expected integer argument")),
        }
    }

    fn list_argument(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
        index: usize,
    ) -> EvalResult {
        let value = self.argument(span, function, environment, index)?;
        if matches!(value.kind, ValueKind::List(_)) {
            Ok(value)
        } else {
            Err(self.fatal(span, "Error: Expected list argument"))
        }
    }

    fn list_items(value: &ValuePtr) -> Vec<ValuePtr> {
        match &value.kind {
            ValueKind::List(items) => items.borrow().clone(),
            _ => Vec::new(),
        }
    }

    fn element_type(value: &ValuePtr) -> TypePtr {
        match &value.ty.borrow().kind {
            TypeKind::List(element) => element.clone(),
            _ => Type::unknown(),
        }
    }

    /// A new list value sharing the original's element type.
    fn make_list(original: &ValuePtr, items: Vec<ValuePtr>) -> ValuePtr {
        Value::list(Type::list(Self::element_type(original)), items)
    }

    fn check_element_type(
        &mut self,
        span: &Span,
        list: &ValuePtr,
        element: &ValuePtr,
    ) -> Result<(), RuntimeError> {
        if !compare(&element.ty, &Self::element_type(list)) {
            return Err(self.fatal(span, "Error: Element type must match list type"));
        }
        Ok(())
    }

    // ── list builtins ──────────────────────────────────────────────────

    fn insert_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
        in_place: bool,
    ) -> EvalResult {
        let list = self.list_argument(span, function, environment, 0)?;
        let element = self.argument(span, function, environment, 1)?;
        self.check_element_type(span, &list, &element)?;
        let index = self.int_argument(span, function, environment, 2)?;

        let length = Self::list_items(&list).len();
        if length != 0 && (index < 0 || index as usize >= length) {
            return Err(self.fatal(span, "Error: Out of bounds list access"));
        }
        let position = if length == 0 { 0 } else { index as usize };

        if in_place {
            if let ValueKind::List(items) = &list.kind {
                items.borrow_mut().insert(position, element);
            }
            return Ok(list);
        }
        let mut items = Self::list_items(&list);
        items.insert(position, element);
        Ok(Self::make_list(&list, items))
    }

    fn remove_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
        in_place: bool,
    ) -> EvalResult {
        let list = self.list_argument(span, function, environment, 0)?;
        if Self::list_items(&list).is_empty() {
            return Err(self.fatal(span, "Error: Cannot remove from empty list"));
        }

        let index = self.int_argument(span, function, environment, 1)?;
        if index < 0 || index as usize >= Self::list_items(&list).len() {
            return Err(self.fatal(span, "Error: Out of bounds list access"));
        }

        if in_place {
            if let ValueKind::List(items) = &list.kind {
                items.borrow_mut().remove(index as usize);
            }
            return Ok(list);
        }
        let mut items = Self::list_items(&list);
        items.remove(index as usize);
        Ok(Self::make_list(&list, items))
    }

    fn replace_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
        in_place: bool,
    ) -> EvalResult {
        let list = self.list_argument(span, function, environment, 0)?;
        if Self::list_items(&list).is_empty() {
            return Err(self.fatal(span, "Error: Cannot replace with element in empty list"));
        }

        let index = self.int_argument(span, function, environment, 2)?;
        if index < 0 || index as usize >= Self::list_items(&list).len() {
            return Err(self.fatal(span, "Error: Out of bounds list access"));
        }

        let element = self.argument(span, function, environment, 1)?;
        self.check_element_type(span, &list, &element)?;

        if in_place {
            if let ValueKind::List(items) = &list.kind {
                items.borrow_mut()[index as usize] = element;
            }
            return Ok(list);
        }
        let mut items = Self::list_items(&list);
        items[index as usize] = element;
        Ok(Self::make_list(&list, items))
    }

    fn push_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
        front: bool,
    ) -> EvalResult {
        let list = self.list_argument(span, function, environment, 0)?;
        let element = self.argument(span, function, environment, 1)?;
        self.check_element_type(span, &list, &element)?;

        let mut items = Self::list_items(&list);
        if front {
            items.insert(0, element);
        } else {
            items.push(element);
        }
        Ok(Self::make_list(&list, items))
    }

    fn front_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let list = self.list_argument(span, function, environment, 0)?;
        match Self::list_items(&list).first() {
            Some(first) => Ok(first.clone()),
            None => Err(self.fatal(span, "Error: Cannot get element from empty list")),
        }
    }

    fn back_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let list = self.list_argument(span, function, environment, 0)?;
        match Self::list_items(&list).last() {
            Some(last) => Ok(last.clone()),
            None => Err(self.fatal(span, "Error: Cannot get element from empty list")),
        }
    }

    /// All but the last element.
    fn head_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let list = self.list_argument(span, function, environment, 0)?;
        let mut items = Self::list_items(&list);
        if items.is_empty() {
            return Err(self.fatal(span, "Error: Cannot get sublist from empty list"));
        }
        items.pop();
        Ok(Self::make_list(&list, items))
    }

    /// All but the first element.
    fn tail_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let list = self.list_argument(span, function, environment, 0)?;
        let mut items = Self::list_items(&list);
        if items.is_empty() {
            return Err(self.fatal(span, "Error: Cannot get sublist from empty list"));
        }
        items.remove(0);
        Ok(Self::make_list(&list, items))
    }

    fn combine_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
        in_place: bool,
    ) -> EvalResult {
        let first = self.list_argument(span, function, environment, 0)?;
        let second = self.list_argument(span, function, environment, 1)?;
        if !compare(&first.ty, &second.ty) {
            return Err(self.fatal(span, "Error: List types must match"));
        }

        // Copied out first: both arguments may be the same list.
        let second_items = Self::list_items(&second);
        if in_place {
            if let ValueKind::List(items) = &first.kind {
                items.borrow_mut().extend(second_items);
            }
            return Ok(first);
        }
        let mut items = Self::list_items(&first);
        items.extend(second_items);
        Ok(Self::make_list(&first, items))
    }

    fn size_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let list = self.list_argument(span, function, environment, 0)?;
        Ok(Value::int(Self::list_items(&list).len() as i64))
    }

    /// `range(list, start, end)`, both bounds inclusive.
    fn range_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let list = self.list_argument(span, function, environment, 0)?;
        let start = self.int_argument(span, function, environment, 1)?;
        let end = self.int_argument(span, function, environment, 2)?;

        let items = Self::list_items(&list);
        if items.is_empty() {
            return Err(self.fatal(span, "Error: Cannot get sublist from empty list"));
        }
        if start < 0 || end < 0 || start > end || start as usize >= items.len() || end as usize >= items.len()
        {
            return Err(self.fatal(span, "Error: Invalid range"));
        }

        let sliced = items[start as usize..=end as usize].to_vec();
        Ok(Self::make_list(&list, sliced))
    }

    fn is_empty_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let list = self.list_argument(span, function, environment, 0)?;
        Ok(Value::bool(Self::list_items(&list).is_empty()))
    }

    // ── printing ───────────────────────────────────────────────────────

    fn print_list_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let list = self.list_argument(span, function, environment, 0)?;
        let rendered = self.render_collection(span, &Self::list_items(&list), "printList")?;
        println!("{}", rendered);
        Ok(Value::null())
    }

    fn print_tuple_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
        collection: &str,
    ) -> EvalResult {
        let value = self.argument(span, function, environment, 0)?;
        let ValueKind::Tuple(items) = &value.kind else {
            return Err(self.fatal(span, "Error: Expected tuple argument"));
        };
        let rendered = self.render_collection(span, items, collection)?;
        println!("{}", rendered);
        Ok(Value::null())
    }

    /// `(v1, v2, ...)` with ints bare, chars quoted `'c'`, strings quoted
    /// `"s"` and bools as keywords. Only non-generic primitives may appear.
    fn render_collection(
        &mut self,
        span: &Span,
        items: &[ValuePtr],
        collection: &str,
    ) -> Result<String, RuntimeError> {
        let mut rendered = String::from("(");
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                rendered.push_str(", ");
            }
            match &item.kind {
                ValueKind::Int(value) => rendered.push_str(&value.to_string()),
                ValueKind::Char(value) => rendered.push_str(&format!("'{}'", value)),
                ValueKind::Str(value) => rendered.push_str(&format!("\"{}\"", value)),
                ValueKind::Bool(value) => rendered.push_str(if *value { "true" } else { "false" }),
                _ => {
                    return Err(self.fatal(
                        span,
                        format!("Error: {} only takes non-generic primitives", collection),
                    ));
                }
            }
        }
        rendered.push(')');
        Ok(rendered)
    }

    fn print_int_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let value = self.int_argument(span, function, environment, 0)?;
        println!("{}", value);
        Ok(Value::null())
    }

    fn print_bool_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let value = self.argument(span, function, environment, 0)?;
        match &value.kind {
            ValueKind::Bool(truthy) => {
                println!("{}", if *truthy { "true" } else { "false" });
                Ok(Value::null())
            }
            _ => Err(self.fatal(span, "Error: Expected boolean argument")),
        }
    }

    fn print_char_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let value = self.argument(span, function, environment, 0)?;
        match &value.kind {
            ValueKind::Char(character) => {
                println!("{}", character);
                Ok(Value::null())
            }
            _ => Err(self.fatal(span, "Error: Expected char argument")),
        }
    }

    fn print_string_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let value = self.argument(span, function, environment, 0)?;
        match &value.kind {
            ValueKind::Str(string) => {
                println!("{}", string);
                Ok(Value::null())
            }
            _ => Err(self.fatal(span, "Error: Expected string argument")),
        }
    }

    // ── conversions ────────────────────────────────────────────────────

    fn int_to_char_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let value = self.int_argument(span, function, environment, 0)?;
        Ok(Value::char(value as u8 as char))
    }

    fn char_to_int_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let value = self.argument(span, function, environment, 0)?;
        match &value.kind {
            ValueKind::Char(character) => Ok(Value::int(*character as i64)),
            _ => Err(self.fatal(span, "Error: Expected char argument")),
        }
    }

    fn string_to_char_list_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let value = self.argument(span, function, environment, 0)?;
        let ValueKind::Str(string) = &value.kind else {
            return Err(self.fatal(span, "Error: Expected string argument"));
        };
        let items = string.chars().map(Value::char).collect();
        Ok(Value::list(Type::list(Type::char()), items))
    }

    fn char_list_to_string_builtin(
        &mut self,
        span: &Span,
        function: &FunctionValue,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let list = self.list_argument(span, function, environment, 0)?;
        let mut string = String::new();
        for item in Self::list_items(&list) {
            match &item.kind {
                ValueKind::Char(character) => string.push(*character),
                _ => {
                    return Err(
                        self.fatal(span, "Error: charListToString requires a list of chars")
                    );
                }
            }
        }
        Ok(Value::string(string))
    }

    // ── standard input ─────────────────────────────────────────────────

    fn read_char_builtin(&mut self) -> EvalResult {
        let mut stdin = io::stdin().lock();
        let mut buffer = [0u8; 1];
        loop {
            match stdin.read(&mut buffer) {
                Ok(0) | Err(_) => return Ok(Value::char('\0')),
                Ok(_) => {
                    let character = buffer[0] as char;
                    if !character.is_whitespace() {
                        return Ok(Value::char(character));
                    }
                }
            }
        }
    }

    /// One whitespace-delimited token from standard input.
    fn read_string_builtin(&mut self) -> EvalResult {
        let mut stdin = io::stdin().lock();
        let mut buffer = [0u8; 1];
        let mut token = String::new();
        loop {
            match stdin.read(&mut buffer) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let character = buffer[0] as char;
                    if character.is_whitespace() {
                        if token.is_empty() {
                            continue;
                        }
                        break;
                    }
                    token.push(character);
                }
            }
        }
        Ok(Value::string(token))
    }
}
