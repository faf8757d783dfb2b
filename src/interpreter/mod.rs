//! # Tree-walking evaluator
//!
//! Reduces a type-checked program to values. Evaluation is eager,
//! call-by-value and strictly left to right. A fatal error records a
//! diagnostic plus the call-stack trace and unwinds to the stage boundary
//! through `Result`; the driver maps it to exit code 6.

pub mod builtins;
pub mod value;

use lachs::Span;

use crate::ast::expression::{ExpPtr, ExprKind, LiteralValue, SourceToken};
use crate::ast::operator::Operator;
use crate::diagnostics::Diagnostics;
use crate::types::ty::TypeKind;
use builtins::Builtin;
use value::{FunctionValue, Value, ValueEnvironment, ValueKind, ValuePtr};

/// Control signal for fatal runtime errors; the diagnostic has already been
/// recorded when this is constructed.
pub struct RuntimeError;

pub type EvalResult = Result<ValuePtr, RuntimeError>;

pub struct Interpreter {
    diagnostics: Diagnostics,
    /// `(callee name, call token)` frames, pushed for direct-reference
    /// callees. Frames are not popped on return; the stack is only read
    /// once, at fatal-error time.
    call_stack: Vec<(String, SourceToken)>,
}

impl Interpreter {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self {
            diagnostics,
            call_stack: Vec::new(),
        }
    }

    /// Evaluate the program; returns false if a runtime error occurred.
    pub fn run(&mut self, root: &ExpPtr) -> bool {
        let environment = ValueEnvironment::new();
        self.interpret(root, &environment).is_ok()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Evaluate a program body directly and hand back its value, for
    /// driving the evaluator from tests.
    pub fn eval_root(&mut self, root: &ExpPtr) -> EvalResult {
        let environment = ValueEnvironment::new();
        self.interpret(root, &environment)
    }

    fn interpret(&mut self, expr: &ExpPtr, environment: &ValueEnvironment) -> EvalResult {
        match &expr.kind {
            ExprKind::Program { .. } => self.interpret_program(expr, environment),
            ExprKind::Literal(_) => self.interpret_literal(expr),
            ExprKind::Primitive { .. } => self.interpret_primitive(expr, environment),
            ExprKind::Let { .. } => self.interpret_let(expr, environment),
            ExprKind::Reference { .. } => self.interpret_reference(expr, environment),
            ExprKind::Branch { .. } => self.interpret_branch(expr, environment),
            ExprKind::TypeclassDecl { .. } => self.interpret_typeclass(expr, environment),
            ExprKind::Application { .. } => self.interpret_application(expr, environment),
            ExprKind::ListDefinition { .. } => self.interpret_list_definition(expr, environment),
            ExprKind::TupleDefinition { .. } => self.interpret_tuple_definition(expr, environment),
            ExprKind::Match { .. } => self.interpret_match(expr, environment),
            ExprKind::End => Ok(Value::null()),
            _ => Err(self.fatal(
                &expr.token.span,
                format!("Unknown expression type: {}", expr.token.text),
            )),
        }
    }

    /// Bind every declaration to a function value capturing a snapshot of
    /// the environment built so far, minus the function's own name.
    /// Builtins are tagged for native dispatch and capture nothing.
    fn interpret_program(&mut self, expr: &ExpPtr, environment: &ValueEnvironment) -> EvalResult {
        let ExprKind::Program { functions, body } = &expr.kind else {
            return Ok(Value::null());
        };

        for function in functions {
            let ExprKind::Function {
                name,
                parameters,
                body: function_body,
                ..
            } = &function.kind
            else {
                continue;
            };

            let parameter_names = parameters
                .iter()
                .filter_map(|parameter| match &parameter.kind {
                    ExprKind::Argument { name } => Some(name.clone()),
                    _ => None,
                })
                .collect();

            let builtin = Builtin::from_name(name);
            let captured_env = if builtin.is_some() {
                ValueEnvironment::new()
            } else {
                let snapshot = environment.snapshot();
                snapshot.remove_name(name);
                snapshot
            };

            let function_value = Value::new(
                function.return_type(),
                ValueKind::Function(FunctionValue {
                    parameter_names,
                    body: function_body.clone(),
                    captured_env,
                    builtin,
                }),
            );
            environment.add_name(name.clone(), function_value);
        }

        self.interpret(body, environment)
    }

    fn interpret_literal(&mut self, expr: &ExpPtr) -> EvalResult {
        let ExprKind::Literal(literal) = &expr.kind else {
            return Ok(Value::null());
        };
        Ok(match literal {
            LiteralValue::Int(value) => Value::new(expr.return_type(), ValueKind::Int(*value)),
            LiteralValue::Char(value) => Value::new(expr.return_type(), ValueKind::Char(*value)),
            LiteralValue::Str(value) => {
                Value::new(expr.return_type(), ValueKind::Str(value.clone()))
            }
            LiteralValue::Bool(value) => Value::new(expr.return_type(), ValueKind::Bool(*value)),
            // A bare null may carry an unresolved annotation; it is null
            // regardless.
            LiteralValue::Null => Value::null(),
        })
    }

    fn interpret_primitive(&mut self, expr: &ExpPtr, environment: &ValueEnvironment) -> EvalResult {
        let ExprKind::Primitive { op, left, right } = &expr.kind else {
            return Ok(Value::null());
        };
        // Both sides evaluate before the operator applies; && and || do not
        // short-circuit.
        let left_value = self.interpret(left, environment)?;
        let right_value = self.interpret(right, environment)?;
        self.do_operation(&expr.token, *op, &left_value, &right_value)
    }

    fn interpret_let(&mut self, expr: &ExpPtr, environment: &ValueEnvironment) -> EvalResult {
        let ExprKind::Let {
            ident,
            value,
            after,
            ..
        } = &expr.kind
        else {
            return Ok(Value::null());
        };

        let bound = self.interpret(value, environment)?;
        let after_environment = environment.snapshot();
        after_environment.add_name(ident.clone(), bound);
        self.interpret(after, &after_environment)
    }

    fn interpret_reference(&mut self, expr: &ExpPtr, environment: &ValueEnvironment) -> EvalResult {
        let ExprKind::Reference { ident, field } = &expr.kind else {
            return Ok(Value::null());
        };
        let span = &expr.token.span;

        let referenced = self.get_name(span, environment, ident)?;
        let Some(field) = field else {
            return Ok(referenced);
        };

        match &referenced.kind {
            ValueKind::Tuple(items) => {
                let Ok(index) = field.parse::<usize>() else {
                    return Err(self.fatal(
                        span,
                        format!("Error: Tuple requires valid index: {}", field),
                    ));
                };
                match items.get(index) {
                    Some(item) => Ok(item.clone()),
                    None => Err(self.fatal(
                        span,
                        format!("Error: Index not in range of tuple: {}", index),
                    )),
                }
            }
            ValueKind::Typeclass(fields) => match fields.get(field) {
                Some(value) => Ok(value.clone()),
                None => Err(self.fatal(
                    span,
                    format!("Error: typeclass {} has no field {}", ident, field),
                )),
            },
            _ => Ok(referenced.clone()),
        }
    }

    fn interpret_branch(&mut self, expr: &ExpPtr, environment: &ValueEnvironment) -> EvalResult {
        let ExprKind::Branch {
            condition,
            then_branch,
            else_branch,
        } = &expr.kind
        else {
            return Ok(Value::null());
        };

        let condition_value = self.interpret(condition, environment)?;
        let ValueKind::Bool(truthy) = &condition_value.kind else {
            return Err(self.fatal(
                &expr.token.span,
                "Error: Branch condition must be a boolean",
            ));
        };

        if *truthy {
            self.interpret(then_branch, environment)
        } else {
            self.interpret(else_branch, environment)
        }
    }

    /// Register the declaration as a prototype value with every field null;
    /// construction clones it with real field values.
    fn interpret_typeclass(&mut self, expr: &ExpPtr, environment: &ValueEnvironment) -> EvalResult {
        let ExprKind::TypeclassDecl { ident, fields } = &expr.kind else {
            return Ok(Value::null());
        };

        let mut field_values = std::collections::HashMap::new();
        for field in fields {
            if let ExprKind::Argument { name } = &field.kind {
                field_values.insert(name.clone(), Value::null());
            }
        }

        let class_value = Value::new(expr.return_type(), ValueKind::Typeclass(field_values));
        environment.add_name(ident.clone(), class_value.clone());
        Ok(class_value)
    }

    fn interpret_application(&mut self, expr: &ExpPtr, environment: &ValueEnvironment) -> EvalResult {
        let ExprKind::Application {
            callee, arguments, ..
        } = &expr.kind
        else {
            return Ok(Value::null());
        };
        let span = &expr.token.span;

        let callee_value = self.interpret(callee, environment)?;

        if let ValueKind::Typeclass(prototype_fields) = &callee_value.kind {
            let field_order = match &callee_value.ty.borrow().kind {
                TypeKind::Typeclass(class) => class.fields.clone(),
                _ => Vec::new(),
            };
            let mut fields = prototype_fields.clone();
            for (argument, (field_name, _)) in arguments.iter().zip(field_order.iter()) {
                let value = self.interpret(argument, environment)?;
                fields.insert(field_name.clone(), value);
            }
            return Ok(Value::new(
                callee_value.ty.clone(),
                ValueKind::Typeclass(fields),
            ));
        }

        if let ValueKind::List(items) = &callee_value.kind {
            let Some(index_expr) = arguments.first() else {
                return Err(self.fatal(span, "Error: List access needs integer argument"));
            };
            let index_value = self.interpret(index_expr, environment)?;
            let ValueKind::Int(index) = &index_value.kind else {
                return Err(self.fatal(span, "Error: List access needs integer argument"));
            };
            let index = *index;
            let items = items.borrow();
            if index < 0 || index as usize >= items.len() {
                return Err(self.fatal(span, "Error: Out of bounds list access"));
            }
            return Ok(items[index as usize].clone());
        }

        if let ExprKind::Reference { ident, .. } = &callee.kind {
            self.call_stack.push((ident.clone(), callee.token.clone()));
        }

        let ValueKind::Function(function) = &callee_value.kind else {
            return Err(self.fatal(span, "Bad function or typeclass application"));
        };

        let call_environment = environment.snapshot();
        for (argument, parameter) in arguments.iter().zip(function.parameter_names.iter()) {
            let value = self.interpret(argument, environment)?;
            call_environment.add_name(parameter.clone(), value);
        }

        // Layer the captured environment over the call frame. Builtin names
        // are skipped so they always resolve to their native
        // implementations from the enclosing scope.
        for (name, value) in function.captured_env.entries() {
            if Builtin::from_name(&name).is_none() {
                call_environment.add_name(name, value);
            }
        }

        match function.builtin {
            Some(builtin) => self.run_builtin(builtin, span, function, &call_environment),
            None => self.interpret(&function.body, &call_environment),
        }
    }

    fn interpret_list_definition(
        &mut self,
        expr: &ExpPtr,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let ExprKind::ListDefinition { values } = &expr.kind else {
            return Ok(Value::null());
        };
        let mut items = Vec::with_capacity(values.len());
        for value in values {
            items.push(self.interpret(value, environment)?);
        }
        Ok(Value::list(expr.return_type(), items))
    }

    fn interpret_tuple_definition(
        &mut self,
        expr: &ExpPtr,
        environment: &ValueEnvironment,
    ) -> EvalResult {
        let ExprKind::TupleDefinition { values } = &expr.kind else {
            return Ok(Value::null());
        };
        let mut items = Vec::with_capacity(values.len());
        for value in values {
            items.push(self.interpret(value, environment)?);
        }
        Ok(Value::new(expr.return_type(), ValueKind::Tuple(items)))
    }

    fn interpret_match(&mut self, expr: &ExpPtr, environment: &ValueEnvironment) -> EvalResult {
        let ExprKind::Match { ident, cases } = &expr.kind else {
            return Ok(Value::null());
        };

        let matched = self.get_name(&expr.token.span, environment, ident)?;

        for case in cases {
            let ExprKind::Case { pattern, body } = &case.kind else {
                continue;
            };
            if pattern.is_any_pattern() {
                return self.interpret(body, environment);
            }

            let case_value = self.interpret(pattern, environment)?;
            let result =
                self.do_operation(&expr.token, Operator::Eq, &matched, &case_value)?;
            if matches!(result.kind, ValueKind::Bool(true)) {
                return self.interpret(body, environment);
            }
        }

        // No case matched.
        Ok(Value::null())
    }

    fn do_operation(
        &mut self,
        token: &SourceToken,
        op: Operator,
        left: &ValuePtr,
        right: &ValuePtr,
    ) -> EvalResult {
        let span = &token.span;
        match (&left.kind, &right.kind) {
            (ValueKind::Int(l), ValueKind::Int(r)) => match op {
                Operator::Plus => Ok(Value::int(l.wrapping_add(*r))),
                Operator::Minus => Ok(Value::int(l.wrapping_sub(*r))),
                Operator::Times => Ok(Value::int(l.wrapping_mul(*r))),
                Operator::Div => {
                    if *r == 0 {
                        Err(self.fatal(span, "Error: Division by zero!"))
                    } else {
                        Ok(Value::int(l.wrapping_div(*r)))
                    }
                }
                Operator::Mod => {
                    if *r == 0 {
                        Err(self.fatal(span, "Error: Modulo by zero!"))
                    } else {
                        Ok(Value::int(l.wrapping_rem(*r)))
                    }
                }
                Operator::Greater => Ok(Value::bool(l > r)),
                Operator::Less => Ok(Value::bool(l < r)),
                Operator::GreaterEq => Ok(Value::bool(l >= r)),
                Operator::LessEq => Ok(Value::bool(l <= r)),
                Operator::Eq | Operator::Not => Ok(Value::bool(l == r)),
                Operator::NotEq => Ok(Value::bool(l != r)),
                _ => Err(self.operand_error(span)),
            },
            (ValueKind::Char(l), ValueKind::Char(r)) => match op {
                Operator::Greater => Ok(Value::bool(l > r)),
                Operator::Less => Ok(Value::bool(l < r)),
                Operator::GreaterEq => Ok(Value::bool(l >= r)),
                Operator::LessEq => Ok(Value::bool(l <= r)),
                Operator::Eq | Operator::Not => Ok(Value::bool(l == r)),
                Operator::NotEq => Ok(Value::bool(l != r)),
                _ => Err(self.operand_error(span)),
            },
            (ValueKind::Str(l), ValueKind::Str(r)) => match op {
                Operator::Plus => Ok(Value::string(format!("{}{}", l, r))),
                Operator::Greater => Ok(Value::bool(l > r)),
                Operator::Less => Ok(Value::bool(l < r)),
                Operator::GreaterEq => Ok(Value::bool(l >= r)),
                Operator::LessEq => Ok(Value::bool(l <= r)),
                Operator::Eq | Operator::Not => Ok(Value::bool(l == r)),
                Operator::NotEq => Ok(Value::bool(l != r)),
                _ => Err(self.operand_error(span)),
            },
            (ValueKind::Bool(l), ValueKind::Bool(r)) => match op {
                Operator::And => Ok(Value::bool(*l && *r)),
                Operator::Or => Ok(Value::bool(*l || *r)),
                Operator::Eq | Operator::Not => Ok(Value::bool(l == r)),
                Operator::NotEq => Ok(Value::bool(l != r)),
                Operator::Greater => Ok(Value::bool(l > r)),
                Operator::Less => Ok(Value::bool(l < r)),
                Operator::GreaterEq => Ok(Value::bool(l >= r)),
                Operator::LessEq => Ok(Value::bool(l <= r)),
                _ => Err(self.operand_error(span)),
            },
            _ => Err(self.operand_error(span)),
        }
    }

    fn operand_error(&mut self, span: &Span) -> RuntimeError {
        self.fatal(span, "Error: Binary operator requires primitive types")
    }

    fn get_name(
        &mut self,
        span: &Span,
        environment: &ValueEnvironment,
        name: &str,
    ) -> EvalResult {
        match environment.get_name(name) {
            Some(value) => Ok(value),
            None => Err(self.fatal(
                span,
                format!("Error: {} does not exist in this scope", name),
            )),
        }
    }

    /// Record the diagnostic with the stack trace appended and hand back
    /// the control signal that unwinds to the stage boundary.
    fn fatal(&mut self, span: &Span, message: impl Into<String>) -> RuntimeError {
        let trace = self.stack_trace();
        self.diagnostics
            .report(span, format!("{}\n{}", message.into(), trace));
        RuntimeError
    }

    fn stack_trace(&self) -> String {
        let mut rendered = String::from("Fatal error occurred:");
        for (name, token) in self.call_stack.iter().rev() {
            rendered.push_str(&format!(
                "\n\tat '{}' (Line: {})",
                name,
                self.diagnostics.user_line(&token.span)
            ));
        }
        rendered
    }
}
