//! # Type checker
//!
//! Bidirectional propagation: every node is checked under an *expected*
//! type, and reports its *actual* type by rewriting cells through
//! [`compare`](crate::types::ty::compare). Mismatches are reported against
//! the node's source token and checking continues, so one pass can surface
//! several errors before the driver aborts the stage.
//!
//! Function bodies are only checked for generic functions, lazily at each
//! application site where the instantiation is known; the `resolved` flag
//! on the application's return type memoises the check.

use lachs::Span;

use crate::ast::expression::{ExpPtr, ExprKind};
use crate::ast::operator::Operator;
use crate::diagnostics::Diagnostics;
use crate::interpreter::builtins::Builtin;
use crate::types::env::TypeEnvironment;
use crate::types::ty::{
    self, compare, copy_argument_type, is_primitive, resolve_type, Type, TypeKind, TypePtr,
};

pub struct TypeChecker {
    diagnostics: Diagnostics,
}

impl TypeChecker {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }

    pub fn check(&mut self, root: &ExpPtr) {
        let environment = TypeEnvironment::new();
        let expected = Type::unknown();
        self.eval(root, &environment, &expected);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn eval(&mut self, expr: &ExpPtr, environment: &TypeEnvironment, expected: &TypePtr) {
        match &expr.kind {
            ExprKind::Program { .. } => self.eval_program(expr, environment, expected),
            ExprKind::Literal(_) => self.eval_literal(expr, expected),
            ExprKind::Primitive { .. } => self.eval_primitive(expr, environment),
            ExprKind::Let { .. } => self.eval_let(expr, environment, expected),
            ExprKind::Reference { .. } => self.eval_reference(expr, environment, expected),
            ExprKind::Branch { .. } => self.eval_branch(expr, environment, expected),
            ExprKind::TypeclassDecl { .. } => self.eval_typeclass(expr, environment, expected),
            ExprKind::Application { .. } => self.eval_application(expr, environment, expected),
            ExprKind::ListDefinition { .. } => self.eval_list_definition(expr, expected),
            ExprKind::TupleDefinition { .. } => self.eval_tuple_definition(expr, expected),
            ExprKind::Match { .. } => self.eval_match(expr, environment, expected),
            ExprKind::End => {}
            _ => self.diagnostics.report(
                &expr.token.span,
                format!("Unknown expression type: {}", expr.token.text),
            ),
        }
    }

    /// Pre-bind all function names (mutual recursion), tag builtins, then
    /// capture each function's inner environment: the enclosing scope minus
    /// the function's own name, plus generics and arguments.
    fn eval_program(&mut self, expr: &ExpPtr, environment: &TypeEnvironment, expected: &TypePtr) {
        let ExprKind::Program { functions, body } = &expr.kind else {
            return;
        };

        for function in functions {
            if let ExprKind::Function { name, .. } = &function.kind {
                environment.add_name(name.clone(), function.return_type());
            }
        }

        for function in functions {
            let ExprKind::Function {
                name,
                generics,
                parameters,
                ..
            } = &function.kind
            else {
                continue;
            };
            let func_ty = function.return_type();
            let is_builtin = Builtin::from_name(name).is_some();
            if is_builtin {
                if let TypeKind::Func(func) = &mut func_ty.borrow_mut().kind {
                    func.is_builtin = true;
                }
            }

            let inner = if is_builtin {
                TypeEnvironment::new()
            } else {
                let snapshot = environment.snapshot();
                snapshot.remove_name(name);
                snapshot
            };

            for generic in generics {
                if let Some(gen_ident) = ty::gen_name(generic) {
                    if !inner.contains(&gen_ident) {
                        inner.add_name(gen_ident, generic.clone());
                    }
                }
            }

            for parameter in parameters {
                let ExprKind::Argument { name: param_name } = &parameter.kind else {
                    continue;
                };
                let param_ty = parameter.return_type();
                let bound = match ty::gen_name(&param_ty) {
                    Some(gen_ident) => inner.get_name(&gen_ident).unwrap_or(param_ty),
                    None => param_ty,
                };
                inner.add_name(param_name.clone(), bound);
            }

            if let TypeKind::Func(func) = &mut func_ty.borrow_mut().kind {
                func.inner_env = Some(inner);
            };
        }

        self.eval(body, environment, expected);
    }

    /// The Unknown rewrite inside compare is what records which side wins
    /// here; a bare null literal adopts the expected type this way.
    fn eval_literal(&mut self, expr: &ExpPtr, expected: &TypePtr) {
        let literal_ty = expr.return_type();
        if !compare(&literal_ty, expected) {
            self.mismatch(&expr.token.span, &literal_ty, expected);
        }
    }

    fn eval_primitive(&mut self, expr: &ExpPtr, environment: &TypeEnvironment) {
        let ExprKind::Primitive { op, left, right } = &expr.kind else {
            return;
        };

        match op {
            // Desugared `!e`: the left side is a synthetic `false` literal.
            Operator::Not => {
                let temp = Type::bool();
                self.eval(right, environment, &temp);
                expr.set_return_type(Type::bool());
            }
            Operator::And | Operator::Or => {
                let temp = Type::bool();
                self.eval(left, environment, &temp);
                self.eval(right, environment, &temp);
                expr.set_return_type(Type::bool());
            }
            op if op.is_arithmetic() => {
                let temp = Type::int();
                self.eval(left, environment, &temp);
                self.eval(right, environment, &temp);
                expr.set_return_type(Type::int());
            }
            _ => {
                // Comparison: the left operand's inferred type flows into
                // the shared cell and constrains the right operand.
                let temp = Type::unknown();
                self.eval(left, environment, &temp);
                if !is_primitive(&left.return_type()) {
                    self.diagnostics.report(
                        &expr.token.span,
                        "Binary operators can only be used on primitive types",
                    );
                }
                self.eval(right, environment, &temp);
                expr.set_return_type(Type::bool());
            }
        }
    }

    fn eval_let(&mut self, expr: &ExpPtr, environment: &TypeEnvironment, expected: &TypePtr) {
        let ExprKind::Let {
            ident,
            value_type,
            value,
            after,
        } = &expr.kind
        else {
            return;
        };

        self.eval(value, environment, value_type);

        let after_environment = environment.snapshot();
        after_environment.add_name(ident.clone(), value_type.clone());
        self.eval(after, &after_environment, expected);
    }

    fn eval_reference(&mut self, expr: &ExpPtr, environment: &TypeEnvironment, expected: &TypePtr) {
        let ExprKind::Reference { ident, field } = &expr.kind else {
            return;
        };
        let span = &expr.token.span;

        let reference_ty = self.get_name(span, environment, ident);
        expr.set_return_type(reference_ty.clone());

        if let Some(field) = field {
            let kind = reference_ty.borrow().kind.clone();
            match kind {
                TypeKind::Tuple(elements) => {
                    let Ok(index) = field.parse::<usize>() else {
                        self.diagnostics.report(
                            span,
                            format!("Error: Tuple requires valid index: {}", field),
                        );
                        return;
                    };
                    let Some(element) = elements.get(index) else {
                        self.diagnostics.report(
                            span,
                            format!("Error: Index not in range of tuple: {}", index),
                        );
                        return;
                    };
                    if !compare(element, expected) {
                        self.mismatch(span, element, expected);
                    }
                    expr.set_return_type(element.clone());
                }
                TypeKind::Typeclass(class) => {
                    // Field lookup goes through the registered declaration;
                    // annotations like `type Pt` carry no field list.
                    let declaration = self.get_name(span, environment, &class.ident);
                    let field_ty = match &declaration.borrow().kind {
                        TypeKind::Typeclass(decl) => decl
                            .fields
                            .iter()
                            .find(|(name, _)| name == field)
                            .map(|(_, ty)| ty.clone()),
                        _ => None,
                    };
                    let Some(field_ty) = field_ty else {
                        self.diagnostics.report(
                            span,
                            format!(
                                "Error: typeclass {} has no field {}",
                                class.ident, field
                            ),
                        );
                        return;
                    };
                    if !compare(&field_ty, expected) {
                        self.mismatch(span, &field_ty, expected);
                    }
                    expr.set_return_type(field_ty);
                }
                _ => {
                    self.diagnostics
                        .report(span, "Field given for non-typeclass or tuple type");
                }
            }
        }

        let mut resolved_return = expr.return_type();
        resolve_type(&mut resolved_return, environment);
        let mut resolved_expected = expected.clone();
        resolve_type(&mut resolved_expected, environment);

        if !compare(&resolved_return, &resolved_expected) {
            self.mismatch(span, &reference_ty, expected);
        }
    }

    /// The else branch is checked first under the outer expected type; the
    /// then branch is then checked against whatever the else branch turned
    /// out to be, so either arm can drive the other's inference.
    fn eval_branch(&mut self, expr: &ExpPtr, environment: &TypeEnvironment, expected: &TypePtr) {
        let ExprKind::Branch {
            condition,
            then_branch,
            else_branch,
        } = &expr.kind
        else {
            return;
        };

        let temp = Type::bool();
        self.eval(condition, environment, &temp);

        self.eval(else_branch, environment, expected);
        let else_ty = else_branch.return_type();
        self.eval(then_branch, environment, &else_ty);
    }

    fn eval_typeclass(&mut self, expr: &ExpPtr, environment: &TypeEnvironment, expected: &TypePtr) {
        let ExprKind::TypeclassDecl { ident, .. } = &expr.kind else {
            return;
        };

        let class_ty = expr.return_type();
        if !compare(&class_ty, expected) {
            self.mismatch(&expr.token.span, &class_ty, expected);
            return;
        }

        environment.add_name(ident.clone(), class_ty);
    }

    fn eval_application(&mut self, expr: &ExpPtr, environment: &TypeEnvironment, expected: &TypePtr) {
        let ExprKind::Application {
            callee,
            arguments,
            generic_args,
        } = &expr.kind
        else {
            return;
        };
        let span = &expr.token.span;

        let temp = Type::unknown();
        self.eval(callee, environment, &temp);
        let callee_ty = callee.return_type();
        let callee_kind = callee_ty.borrow().kind.clone();

        match callee_kind {
            TypeKind::Func(func) => {
                if let ExprKind::Application {
                    generic_args: inner_generics,
                    ..
                } = &callee.kind
                {
                    let inherited = inner_generics.borrow().clone();
                    generic_args.borrow_mut().extend(inherited);
                }
                let replacements = generic_args.borrow().clone();

                if arguments.len() != func.argument_types.len() {
                    self.diagnostics
                        .report(span, "Function application does not match signature");
                }
                if func.generics.is_empty() && !replacements.is_empty() {
                    self.diagnostics
                        .report(span, "Types provided for non-templated function");
                }
                if !func.generics.is_empty() && replacements.is_empty() && !func.is_builtin {
                    self.diagnostics
                        .report(span, "No types provided for templated function");
                }

                let inner = match &func.inner_env {
                    Some(stored) => stored.snapshot(),
                    None => TypeEnvironment::new(),
                };
                for (generic, replacement) in func.generics.iter().zip(replacements.iter()) {
                    if let Some(name) = ty::gen_name(generic) {
                        inner.add_name(name, replacement.clone());
                    }
                }
                if func.is_builtin {
                    // Builtins are callable without an explicit instantiation
                    // list; their generics start as fresh unknowns and are
                    // inferred from the arguments.
                    for generic in func.generics.iter().skip(replacements.len()) {
                        if let Some(name) = ty::gen_name(generic) {
                            inner.add_name(name, Type::unknown());
                        }
                    }
                }

                for (index, argument) in arguments.iter().enumerate() {
                    let Some(signature_ty) = func.argument_types.get(index) else {
                        break;
                    };
                    let mut argument_ty = copy_argument_type(signature_ty);
                    resolve_type(&mut argument_ty, &inner);
                    self.eval(argument, environment, &argument_ty);
                    if let Some(name) = func.argument_names.get(index) {
                        inner.add_name(name.clone(), argument_ty);
                    }
                }

                let mut resolved_return = copy_argument_type(&func.return_type);
                resolve_type(&mut resolved_return, &inner);

                let needs_body_check = !expr.return_type().borrow().resolved
                    && !func.is_builtin
                    && !func.generics.is_empty()
                    && func.body.is_some();

                // Install the memo before descending into the body so a
                // self-recursive instantiation terminates.
                resolved_return.borrow_mut().resolved = true;
                expr.set_return_type(resolved_return.clone());

                if needs_body_check {
                    // The stored inner environment omits the function's own
                    // name; rebind it for the body check so recursion
                    // resolves.
                    if let ExprKind::Reference { ident, field: None } = &callee.kind {
                        inner.add_name(ident.clone(), callee_ty.clone());
                    }
                    log::debug!("checking generic function body at instantiation site");
                    if let Some(body) = &func.body {
                        self.eval(body, &inner, &resolved_return);
                    }
                }

                if !compare(&resolved_return, expected) {
                    self.mismatch(span, &func.return_type, expected);
                }
            }
            TypeKind::Typeclass(class) => {
                let expected_matches = matches!(
                    &expected.borrow().kind,
                    TypeKind::Typeclass(expected_class) if expected_class.ident == class.ident
                );
                if !expected_matches {
                    self.mismatch(span, &callee_ty, expected);
                }
                if arguments.len() != class.fields.len() {
                    self.diagnostics
                        .report(span, "Typeclass construction does not match signature");
                }
                for (argument, (_, field_ty)) in arguments.iter().zip(class.fields.iter()) {
                    self.eval(argument, environment, field_ty);
                }
                expr.set_return_type(callee_ty.clone());
            }
            TypeKind::List(_) => {
                // Indexing: `xs(i)` reads element i.
                if arguments.is_empty() {
                    self.diagnostics
                        .report(span, "List access needs integer argument");
                    return;
                }
                let index_temp = Type::int();
                self.eval(&arguments[0], environment, &index_temp);

                // Re-check the callee against a list of the expected type so
                // the element type flows outward.
                let list_temp = Type::list(expected.clone());
                self.eval(callee, environment, &list_temp);

                expr.set_return_type(callee_ty.clone());
            }
            _ => {
                self.diagnostics
                    .report(span, "Bad function or typeclass application");
            }
        }
    }

    fn eval_list_definition(&mut self, expr: &ExpPtr, expected: &TypePtr) {
        let ExprKind::ListDefinition { values } = &expr.kind else {
            return;
        };

        let element_expected = match &expected.borrow().kind {
            TypeKind::List(element) => element.clone(),
            _ => expected.clone(),
        };

        for value in values {
            let value_ty = value.return_type();
            if !compare(&value_ty, &element_expected) {
                self.mismatch(&expr.token.span, &value_ty, &element_expected);
            }
        }

        let list_ty = expr.return_type();
        if !compare(&list_ty, expected) {
            self.mismatch(&expr.token.span, &list_ty, expected);
        }
    }

    fn eval_tuple_definition(&mut self, expr: &ExpPtr, expected: &TypePtr) {
        let tuple_ty = expr.return_type();
        let copy = copy_argument_type(&tuple_ty);
        if !compare(&copy, expected) {
            self.mismatch(&expr.token.span, &tuple_ty, expected);
        }
    }

    fn eval_match(&mut self, expr: &ExpPtr, environment: &TypeEnvironment, expected: &TypePtr) {
        let ExprKind::Match { ident, cases } = &expr.kind else {
            return;
        };

        let case_ty = self.get_name(&expr.token.span, environment, ident);

        let mut any_occurred = false;
        for case in cases {
            let ExprKind::Case { pattern, body } = &case.kind else {
                continue;
            };
            if any_occurred {
                self.diagnostics.warn(
                    &case.token.span,
                    "Warning: case statement below 'any' is always ignored",
                );
            }

            if pattern.is_any_pattern() {
                any_occurred = true;
                self.eval(body, environment, expected);
            } else {
                self.eval(pattern, environment, &case_ty);
                self.eval(body, environment, expected);
            }
        }
    }

    fn get_name(&mut self, span: &Span, environment: &TypeEnvironment, name: &str) -> TypePtr {
        match environment.get_name(name) {
            Some(ty) => ty,
            None => {
                self.diagnostics.report(
                    span,
                    format!("Error: {} does not exist in this scope", name),
                );
                Type::unknown()
            }
        }
    }

    fn mismatch(&mut self, span: &Span, actual: &TypePtr, expected: &TypePtr) {
        self.diagnostics.report(
            span,
            format!(
                "Mismatched type: {}, Expected: {}",
                actual.borrow(),
                expected.borrow()
            ),
        );
    }
}
