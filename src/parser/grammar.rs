//! Grammar productions.
//!
//! One function per nonterminal, mirroring the grammar:
//!
//! ```text
//! Program      := {FuncDecl} Expression
//! FuncDecl     := "func" IDENT ["[" GENS "]"] "(" [Args] ")" "->" Type "=" SimpleExpr ";"
//! Expression   := "val" IDENT ":" Type "=" SimpleExpr ";" Expression
//!              |  SimpleExpr [";" Expression]
//! SimpleExpr   := Branch | List | Tuple | Match | TypeclassDecl | "func" Program | Utight
//! Utight       := [unary +|-|!] Tight {binaryOp Utight}
//! Tight        := "{" Expression "}" | Application
//! Application  := Atom ["[" Type {"," Type} "]"] ["(" [SimpleExpr {"," SimpleExpr}] ")"]*
//! ```
//!
//! Unary operators desugar into binary primitives (`+e` to `0 + e`, `-e` to
//! `0 - e`, `!e` to `false == e`). Statement sequencing `e1; e2` becomes a
//! let with a fresh `dummy$N` binder.

use std::cell::RefCell;

use super::Parser;
use crate::ast::expression::{ExpPtr, Expression, ExprKind, LiteralValue, SourceToken};
use crate::ast::operator::Operator;
use crate::lexer::Token;
use crate::types::ty::{self, FuncType, Type, TypePtr};

impl Parser {
    pub(super) fn parse_program(&mut self) -> ExpPtr {
        let token = self.here();

        let mut functions = Vec::new();
        while self.eat(|t| matches!(t, Token::Func(_))) {
            functions.push(self.parse_func());
        }

        let body = self.parse_expression();
        let return_type = body.return_type();
        Expression::new(token, ExprKind::Program { functions, body }, return_type)
    }

    fn parse_func(&mut self) -> ExpPtr {
        let token = self.here();
        let name = token.text.clone();
        self.advance();

        let mut generics = Vec::new();
        if self.eat(|t| matches!(t, Token::LBracket(_))) {
            generics.push(Type::gen(self.here().text));
            self.advance();
            while self.eat(|t| matches!(t, Token::Comma(_))) {
                generics.push(Type::gen(self.here().text));
                self.advance();
            }
            self.skip(|t| matches!(t, Token::RBracket(_)), "]");
        }

        self.skip(|t| matches!(t, Token::LParen(_)), "(");
        let mut parameters = Vec::new();
        if self.in_bounds() && !self.check(|t| matches!(t, Token::RParen(_))) {
            parameters.push(self.parse_arg(&generics));
            while self.eat(|t| matches!(t, Token::Comma(_))) {
                parameters.push(self.parse_arg(&generics));
            }
        }
        self.skip(|t| matches!(t, Token::RParen(_)), ")");

        self.skip(|t| matches!(t, Token::Arrow(_)), "->");
        let return_type = self.parse_type(&generics);
        self.skip(|t| matches!(t, Token::Equals(_)), "=");

        let body = self.parse_simple_expression();

        let mut argument_types = Vec::new();
        let mut argument_names = Vec::new();
        for parameter in &parameters {
            argument_types.push(parameter.return_type());
            if let ExprKind::Argument { name } = &parameter.kind {
                argument_names.push(name.clone());
            }
        }

        let func_type = Type::func(FuncType {
            generics: generics.clone(),
            argument_types,
            argument_names,
            return_type,
            body: Some(body.clone()),
            inner_env: None,
            is_builtin: false,
        });

        self.skip(|t| matches!(t, Token::Semicolon(_)), ";");
        Expression::new(
            token,
            ExprKind::Function {
                name,
                generics,
                parameters,
                body,
            },
            func_type,
        )
    }

    fn parse_arg(&mut self, generics: &[TypePtr]) -> ExpPtr {
        let token = self.here();
        let name = token.text.clone();
        self.advance();
        self.skip(|t| matches!(t, Token::Colon(_)), ":");
        let argument_type = self.parse_type(generics);
        Expression::new(token, ExprKind::Argument { name }, argument_type)
    }

    pub(super) fn parse_expression(&mut self) -> ExpPtr {
        if !self.in_bounds() {
            return Expression::end();
        }

        if self.eat(|t| matches!(t, Token::Val(_))) {
            let token = self.here();
            let ident = token.text.clone();
            self.advance();

            self.skip(|t| matches!(t, Token::Colon(_)), ":");
            let value_type = self.parse_type(&[]);
            self.skip(|t| matches!(t, Token::Equals(_)), "=");
            let value = self.parse_simple_expression();
            self.skip(|t| matches!(t, Token::Semicolon(_)), ";");
            let after = self.parse_expression();

            let return_type = after.return_type();
            return Expression::new(
                token,
                ExprKind::Let {
                    ident,
                    value_type,
                    value,
                    after,
                },
                return_type,
            );
        }

        let token = self.here();
        let simple = self.parse_simple_expression();
        if self.eat(|t| matches!(t, Token::Semicolon(_))) {
            let after = self.parse_expression();
            let return_type = after.return_type();
            let ident = self.dummy();
            return Expression::new(
                token,
                ExprKind::Let {
                    ident,
                    value_type: Type::unknown(),
                    value: simple,
                    after,
                },
                return_type,
            );
        }
        simple
    }

    pub(super) fn parse_simple_expression(&mut self) -> ExpPtr {
        if self.eat(|t| matches!(t, Token::If(_))) {
            self.parse_branch()
        } else if self.eat(|t| matches!(t, Token::List(_))) {
            self.parse_list()
        } else if self.eat(|t| matches!(t, Token::Tuple(_))) {
            self.parse_tuple()
        } else if self.eat(|t| matches!(t, Token::MatchKw(_))) {
            self.parse_match()
        } else if self.eat(|t| matches!(t, Token::Type(_))) {
            self.parse_typeclass()
        } else if self.check(|t| matches!(t, Token::Func(_))) {
            self.parse_program()
        } else {
            self.parse_utight(0)
        }
    }

    fn parse_branch(&mut self) -> ExpPtr {
        let token = self.here();
        self.skip(|t| matches!(t, Token::LParen(_)), "(");
        let condition = self.parse_simple_expression();
        self.skip(|t| matches!(t, Token::RParen(_)), ")");

        let then_branch = self.parse_simple_expression();
        let else_branch = if self.eat(|t| matches!(t, Token::Else(_))) {
            self.parse_simple_expression()
        } else {
            // A missing else arm evaluates to null.
            Expression::new(
                token.clone(),
                ExprKind::Literal(LiteralValue::Null),
                Type::unknown(),
            )
        };

        let return_type = then_branch.return_type();
        Expression::new(
            token,
            ExprKind::Branch {
                condition,
                then_branch,
                else_branch,
            },
            return_type,
        )
    }

    fn parse_list(&mut self) -> ExpPtr {
        let token = self.here();
        self.skip(|t| matches!(t, Token::LBrace(_)), "{");

        let mut values = Vec::new();
        if self.in_bounds() && !self.check(|t| matches!(t, Token::RBrace(_))) {
            values.push(self.parse_simple_expression());
            while self.eat(|t| matches!(t, Token::Comma(_))) {
                values.push(self.parse_simple_expression());
            }
        }
        self.skip(|t| matches!(t, Token::RBrace(_)), "}");

        // The list type shares the first element's type cell, so the checker
        // filling one fills both.
        let return_type = match values.first() {
            Some(first) => Type::list(first.return_type()),
            None => Type::unknown(),
        };
        Expression::new(token, ExprKind::ListDefinition { values }, return_type)
    }

    fn parse_tuple(&mut self) -> ExpPtr {
        let token = self.here();
        self.skip(|t| matches!(t, Token::LBrace(_)), "{");

        let mut values = Vec::new();
        if self.in_bounds() && !self.check(|t| matches!(t, Token::RBrace(_))) {
            values.push(self.parse_simple_expression());
            while self.eat(|t| matches!(t, Token::Comma(_))) {
                values.push(self.parse_simple_expression());
            }
        }
        self.skip(|t| matches!(t, Token::RBrace(_)), "}");

        let return_type = if values.is_empty() {
            Type::unknown()
        } else {
            Type::tuple(values.iter().map(|value| value.return_type()).collect())
        };
        Expression::new(token, ExprKind::TupleDefinition { values }, return_type)
    }

    fn parse_match(&mut self) -> ExpPtr {
        let token = self.here();
        self.skip(|t| matches!(t, Token::LParen(_)), "(");
        let ident = self.here().text;
        self.advance();
        self.skip(|t| matches!(t, Token::RParen(_)), ")");
        self.skip(|t| matches!(t, Token::LBrace(_)), "{");

        let mut cases = Vec::new();
        while self.eat(|t| matches!(t, Token::Case(_))) {
            cases.push(self.parse_case());
        }
        self.skip(|t| matches!(t, Token::RBrace(_)), "}");

        let return_type = cases
            .first()
            .map(|case| case.return_type())
            .unwrap_or_else(Type::unknown);
        Expression::new(token, ExprKind::Match { ident, cases }, return_type)
    }

    fn parse_case(&mut self) -> ExpPtr {
        let token = self.here();
        let pattern = if self.eat(|t| matches!(t, Token::Any(_))) {
            Expression::new(
                token.clone(),
                ExprKind::Reference {
                    ident: "$any".to_string(),
                    field: None,
                },
                Type::null(),
            )
        } else {
            self.parse_atom()
        };

        self.skip(|t| matches!(t, Token::Equals(_)), "=");
        self.skip(|t| matches!(t, Token::LBrace(_)), "{");
        let body = self.parse_simple_expression();
        self.skip(|t| matches!(t, Token::RBrace(_)), "}");
        self.skip(|t| matches!(t, Token::Semicolon(_)), ";");

        let return_type = body.return_type();
        Expression::new(token, ExprKind::Case { pattern, body }, return_type)
    }

    fn parse_typeclass(&mut self) -> ExpPtr {
        let token = self.here();
        let ident = token.text.clone();
        self.advance();
        self.skip(|t| matches!(t, Token::LBrace(_)), "{");

        let mut fields = Vec::new();
        if self.in_bounds() && !self.check(|t| matches!(t, Token::RBrace(_))) {
            fields.push(self.parse_arg(&[]));
            while self.eat(|t| matches!(t, Token::Comma(_))) {
                fields.push(self.parse_arg(&[]));
            }
        }
        self.skip(|t| matches!(t, Token::RBrace(_)), "}");

        let mut field_types: Vec<(String, TypePtr)> = Vec::new();
        for field in &fields {
            if let ExprKind::Argument { name } = &field.kind {
                if field_types.iter().any(|(existing, _)| existing == name) {
                    self.diagnostics.report(
                        &field.token.span,
                        format!("{} in typeclass {} has already been declared", name, ident),
                    );
                }
                field_types.push((name.clone(), field.return_type()));
            }
        }

        let return_type = Type::typeclass(ident.clone(), field_types);
        Expression::new(token, ExprKind::TypeclassDecl { ident, fields }, return_type)
    }

    /// Precedence climbing over binary operators at strength `min` or above.
    fn parse_utight(&mut self, min: u8) -> ExpPtr {
        let mut left = self.parse_unary();

        loop {
            let Some(op) = self.current().and_then(Operator::from_token) else {
                break;
            };
            if op.precedence() < min {
                break;
            }
            let token = self.here();
            self.advance();

            let right = self.parse_utight(op.precedence() + 1);
            let return_type = left.return_type();
            left = Expression::new(
                token,
                ExprKind::Primitive { op, left, right },
                return_type,
            );
        }
        left
    }

    fn parse_unary(&mut self) -> ExpPtr {
        let token = self.here();
        let op = if self.eat(|t| matches!(t, Token::Plus(_))) {
            Some(Operator::Plus)
        } else if self.eat(|t| matches!(t, Token::Minus(_))) {
            Some(Operator::Minus)
        } else if self.eat(|t| matches!(t, Token::Bang(_))) {
            Some(Operator::Not)
        } else {
            None
        };

        let right = self.parse_tight();
        match op {
            Some(op @ (Operator::Plus | Operator::Minus)) => {
                let zero = Expression::new(
                    token.clone(),
                    ExprKind::Literal(LiteralValue::Int(0)),
                    Type::int(),
                );
                Expression::new(
                    token,
                    ExprKind::Primitive {
                        op,
                        left: zero,
                        right,
                    },
                    Type::int(),
                )
            }
            Some(Operator::Not) => {
                let falsehood = Expression::new(
                    token.clone(),
                    ExprKind::Literal(LiteralValue::Bool(false)),
                    Type::bool(),
                );
                Expression::new(
                    token,
                    ExprKind::Primitive {
                        op: Operator::Not,
                        left: falsehood,
                        right,
                    },
                    Type::bool(),
                )
            }
            _ => right,
        }
    }

    fn parse_tight(&mut self) -> ExpPtr {
        if self.eat(|t| matches!(t, Token::LBrace(_))) {
            let expression = self.parse_expression();
            self.skip(|t| matches!(t, Token::RBrace(_)), "}");
            return expression;
        }
        self.parse_application()
    }

    fn parse_application(&mut self) -> ExpPtr {
        let token = self.here();
        let callee = self.parse_atom();

        let mut generic_args = Vec::new();
        if self.eat(|t| matches!(t, Token::LBracket(_))) {
            generic_args.push(self.parse_type_with(&[], true));
            while self.eat(|t| matches!(t, Token::Comma(_))) {
                generic_args.push(self.parse_type_with(&[], true));
            }
            self.skip(|t| matches!(t, Token::RBracket(_)), "]");
        }

        if self.eat(|t| matches!(t, Token::LParen(_))) {
            let arguments = self.parse_call_arguments();
            let mut application = Expression::new(
                token,
                ExprKind::Application {
                    callee,
                    arguments,
                    generic_args: RefCell::new(generic_args),
                },
                Type::null(),
            );

            // f(x)(y) applies the result of f(x) to y.
            while self.eat(|t| matches!(t, Token::LParen(_))) {
                let chain_token = self.here();
                let arguments = self.parse_call_arguments();
                application = Expression::new(
                    chain_token,
                    ExprKind::Application {
                        callee: application,
                        arguments,
                        generic_args: RefCell::new(Vec::new()),
                    },
                    Type::null(),
                );
            }
            return application;
        }

        callee
    }

    /// Arguments of one call, closing parenthesis included.
    fn parse_call_arguments(&mut self) -> Vec<ExpPtr> {
        let mut arguments = Vec::new();
        if self.in_bounds() && !self.check(|t| matches!(t, Token::RParen(_))) {
            arguments.push(self.parse_simple_expression());
        }
        while self.eat(|t| matches!(t, Token::Comma(_))) {
            arguments.push(self.parse_simple_expression());
        }
        self.skip(|t| matches!(t, Token::RParen(_)), ")");
        arguments
    }

    fn parse_atom(&mut self) -> ExpPtr {
        if self.eat(|t| matches!(t, Token::LParen(_))) {
            let expression = self.parse_simple_expression();
            self.skip(|t| matches!(t, Token::RParen(_)), ")");
            return expression;
        }
        if !self.in_bounds() {
            return Expression::end();
        }

        let token = self.here();
        let current = self.current().unwrap().clone();
        match current {
            Token::Ident(_) => {
                let ident = token.text.clone();
                self.advance();
                let field = if self.eat(|t| matches!(t, Token::Dot(_))) {
                    let field = self.here().text;
                    self.advance();
                    Some(field)
                } else {
                    None
                };
                Expression::new(
                    token,
                    ExprKind::Reference { ident, field },
                    Type::unknown(),
                )
            }
            Token::True(_) | Token::False(_) => {
                let value = matches!(current, Token::True(_));
                self.advance();
                Expression::new(token, ExprKind::Literal(LiteralValue::Bool(value)), Type::bool())
            }
            Token::Null(_) => {
                self.advance();
                Expression::new(token, ExprKind::Literal(LiteralValue::Null), Type::unknown())
            }
            Token::Integer(_) => {
                self.advance();
                let value = match token.text.parse::<i64>() {
                    Ok(value) => value,
                    Err(_) => {
                        self.diagnostics.report(
                            &token.span,
                            format!("Integer literal out of range: {}", token.text),
                        );
                        0
                    }
                };
                Expression::new(token, ExprKind::Literal(LiteralValue::Int(value)), Type::int())
            }
            Token::CharLiteral(_) => {
                self.advance();
                let value = self.decode_char_literal(&token);
                Expression::new(token, ExprKind::Literal(LiteralValue::Char(value)), Type::char())
            }
            Token::StringLiteral(_) => {
                self.advance();
                let value = token.text.trim_matches('"').to_string();
                Expression::new(token, ExprKind::Literal(LiteralValue::Str(value)), Type::string())
            }
            _ => {
                self.error_unexpected("<literal>");
                self.advance();
                Expression::end()
            }
        }
    }

    /// The character a `'x'` or `'\x'` token denotes.
    fn decode_char_literal(&mut self, token: &SourceToken) -> char {
        let inner: Vec<char> = token.text.trim_matches('\'').chars().collect();
        match inner.as_slice() {
            [single] => *single,
            ['\\', escaped] => match escaped {
                '?' => '?',
                '\\' => '\\',
                'b' => '\u{0008}',
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                's' => ' ',
                _ => {
                    self.diagnostics.report(
                        &token.span,
                        format!("Bad escape sequence: {}", token.text),
                    );
                    '\0'
                }
            },
            _ => {
                self.diagnostics
                    .report(&token.span, format!("Bad char literal: {}", token.text));
                '\0'
            }
        }
    }

    pub(super) fn parse_type(&mut self, generics: &[TypePtr]) -> TypePtr {
        self.parse_type_with(generics, false)
    }

    /// Type grammar. With `allow_free_generics` (used for the explicit
    /// instantiation list of an application, where the enclosing function's
    /// generic parameters are not in reach) any unknown identifier parses as
    /// a generic type and is resolved against the environment later.
    fn parse_type_with(&mut self, generics: &[TypePtr], allow_free_generics: bool) -> TypePtr {
        if self.eat(|t| matches!(t, Token::IntKeyword(_))) {
            return self.maybe_function_type(Type::int(), generics, allow_free_generics);
        }
        if self.eat(|t| matches!(t, Token::BoolKeyword(_))) {
            return self.maybe_function_type(Type::bool(), generics, allow_free_generics);
        }
        if self.eat(|t| matches!(t, Token::CharKeyword(_))) {
            return self.maybe_function_type(Type::char(), generics, allow_free_generics);
        }
        if self.eat(|t| matches!(t, Token::StringKeyword(_))) {
            return self.maybe_function_type(Type::string(), generics, allow_free_generics);
        }
        if self.eat(|t| matches!(t, Token::Null(_))) {
            return self.maybe_function_type(Type::null(), generics, allow_free_generics);
        }
        if self.eat(|t| matches!(t, Token::Type(_))) {
            let ident = self.here().text;
            self.advance();
            let class = Type::typeclass(ident, Vec::new());
            return self.maybe_function_type(class, generics, allow_free_generics);
        }
        if self.eat(|t| matches!(t, Token::List(_))) {
            self.skip(|t| matches!(t, Token::LBracket(_)), "[");
            let element = self.parse_type_with(generics, allow_free_generics);
            self.skip(|t| matches!(t, Token::RBracket(_)), "]");
            return Type::list(element);
        }
        if self.eat(|t| matches!(t, Token::Tuple(_))) {
            self.skip(|t| matches!(t, Token::LBracket(_)), "[");
            let mut elements = vec![self.parse_type_with(generics, allow_free_generics)];
            while self.eat(|t| matches!(t, Token::Comma(_))) {
                elements.push(self.parse_type_with(generics, allow_free_generics));
            }
            self.skip(|t| matches!(t, Token::RBracket(_)), "]");
            return Type::tuple(elements);
        }
        if self.eat(|t| matches!(t, Token::LParen(_))) {
            let mut argument_types = vec![self.parse_type_with(generics, allow_free_generics)];
            while self.eat(|t| matches!(t, Token::Comma(_))) {
                argument_types.push(self.parse_type_with(generics, allow_free_generics));
            }
            self.skip(|t| matches!(t, Token::RParen(_)), ")");
            self.skip(|t| matches!(t, Token::Arrow(_)), "->");
            let return_type = self.parse_type_with(generics, allow_free_generics);
            return Type::func(FuncType {
                generics: generics.to_vec(),
                argument_types,
                argument_names: Vec::new(),
                return_type,
                body: None,
                inner_env: None,
                is_builtin: false,
            });
        }

        let name = self.here().text;
        let declared = generics
            .iter()
            .any(|generic| ty::gen_name(generic).as_deref() == Some(name.as_str()));
        if declared || (allow_free_generics && !name.is_empty()) {
            self.advance();
            return Type::gen(name);
        }

        self.diagnostics.report(
            &self.here().span,
            format!("Undefined generic type: {}", name),
        );
        self.advance();
        Type::unknown()
    }

    /// `int -> int` style sugar: a primitive type followed by an arrow is a
    /// single-argument function type.
    fn maybe_function_type(
        &mut self,
        argument: TypePtr,
        generics: &[TypePtr],
        allow_free_generics: bool,
    ) -> TypePtr {
        if self.eat(|t| matches!(t, Token::Arrow(_))) {
            let return_type = self.parse_type_with(generics, allow_free_generics);
            return Type::func(FuncType {
                generics: generics.to_vec(),
                argument_types: vec![argument],
                argument_names: Vec::new(),
                return_type,
                body: None,
                inner_env: None,
                is_builtin: false,
            });
        }
        argument
    }
}
