//! # Parser
//!
//! Recursive descent over the token stream. The grammar is predictive, so
//! the state is just the token vector and an index; on an unexpected token
//! the parser reports a diagnostic, consumes the token and keeps going, and
//! the driver aborts with exit code 4 once the stage finishes.
//!
//! Before parsing, [`Parser::parse`] expands `import` directives by splicing
//! the lexed tokens of the referenced file in place of the directive,
//! repeating until no `import` remains.

mod grammar;

use std::collections::HashSet;
use std::path::Path;

use crate::ast::SourceToken;
use crate::diagnostics::Diagnostics;
use crate::lexer::{self, Token};

pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    dummy_counter: usize,
    imported: HashSet<String>,
    diagnostics: Diagnostics,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, diagnostics: Diagnostics) -> Self {
        Self {
            tokens,
            index: 0,
            dummy_counter: 0,
            imported: HashSet::new(),
            diagnostics,
        }
    }

    /// Expand imports, then parse the whole stream into a program node.
    pub fn parse(&mut self) -> crate::ast::ExpPtr {
        self.preprocess_imports();
        self.parse_program()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    // ── token stream state ─────────────────────────────────────────────

    fn in_bounds(&self) -> bool {
        self.index < self.tokens.len()
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    /// Source token for the current position, a default sentinel at the end
    /// of input.
    fn here(&self) -> SourceToken {
        self.current().map(SourceToken::of).unwrap_or_default()
    }

    fn check(&self, predicate: fn(&Token) -> bool) -> bool {
        self.current().is_some_and(predicate)
    }

    /// Consume the current token if it matches.
    fn eat(&mut self, predicate: fn(&Token) -> bool) -> bool {
        if self.check(predicate) {
            self.index += 1;
            return true;
        }
        false
    }

    /// Require a token. On mismatch, report and consume the offending token
    /// anyway so the parse always makes progress.
    fn skip(&mut self, predicate: fn(&Token) -> bool, expected: &str) {
        if self.in_bounds() && !self.check(predicate) {
            self.error_unexpected(expected);
        }
        self.advance();
    }

    fn error_unexpected(&mut self, expected: &str) {
        let (span, found) = match self.current() {
            Some(token) => (token.pos(), token.describe()),
            None => (Default::default(), "end of input".to_string()),
        };
        self.diagnostics.report(
            &span,
            format!("Unexpected token: {}, Expected: {}", found, expected),
        );
    }

    /// Fresh never-referenced binder for `e1; e2` sequencing.
    fn dummy(&mut self) -> String {
        let name = format!("dummy${}", self.dummy_counter);
        self.dummy_counter += 1;
        name
    }

    // ── import expansion ───────────────────────────────────────────────

    fn preprocess_imports(&mut self) {
        loop {
            let mut importing = false;
            let mut index = 0;
            while index < self.tokens.len() {
                if matches!(self.tokens[index], Token::Import(_)) {
                    importing = true;
                    let spliced = self.expand_import(index);
                    self.tokens.splice(index..index, spliced);
                } else {
                    index += 1;
                }
            }
            if !importing {
                break;
            }
        }
    }

    /// Remove the `import <path>` run starting at `index` and return the
    /// token stream of the referenced file. Each distinct path is read at
    /// most once, which keeps cyclic imports from expanding forever.
    fn expand_import(&mut self, index: usize) -> Vec<Token> {
        let import_span = self.tokens[index].pos();
        self.tokens.remove(index);

        if index >= self.tokens.len() {
            self.diagnostics
                .report(&import_span, "Import requires a file path");
            return Vec::new();
        }

        let mut path = self.tokens[index].text();
        self.tokens.remove(index);
        while index < self.tokens.len() && matches!(self.tokens[index], Token::Slash(_)) {
            self.tokens.remove(index);
            path.push('/');
            if index >= self.tokens.len() {
                self.diagnostics
                    .report(&import_span, "Import path ends in '/'");
                return Vec::new();
            }
            path.push_str(&self.tokens[index].text());
            self.tokens.remove(index);
        }
        path.push_str(lexer::SOURCE_EXTENSION);

        if !self.imported.insert(path.clone()) {
            return Vec::new();
        }
        log::debug!("expanding import {}", path);

        let mut source = match lexer::read_source(Path::new(&path)) {
            Ok(source) => source,
            Err(error) => {
                self.diagnostics
                    .report(&import_span, format!("{:#}", error));
                return Vec::new();
            }
        };
        if !source.ends_with(';') {
            let trimmed = source.trim_end();
            if !trimmed.ends_with(';') {
                source.push(';');
            }
        }

        match lexer::tokenize(&source) {
            Ok(tokens) => tokens,
            Err(error) => {
                self.diagnostics.report(
                    &import_span,
                    format!("could not lex import {}: {:#}", path, error),
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser_for(source: &str) -> Parser {
        let tokens = lexer::tokenize(source).unwrap();
        Parser::new(tokens, Diagnostics::new(source, 0))
    }

    #[test]
    fn dummy_names_are_fresh() {
        let mut parser = parser_for("0");
        assert_eq!(parser.dummy(), "dummy$0");
        assert_eq!(parser.dummy(), "dummy$1");
    }

    #[test]
    fn skip_reports_and_consumes_on_mismatch() {
        let mut parser = parser_for(", ;");
        parser.skip(|t| matches!(t, Token::Semicolon(_)), ";");
        assert!(parser.has_errors());
        assert_eq!(parser.index, 1);
    }

    #[test]
    fn missing_import_file_is_a_parse_error() {
        let mut parser = parser_for("import no/such/file 0");
        parser.preprocess_imports();
        assert!(parser.has_errors());
        // The import run is removed from the stream.
        assert_eq!(parser.tokens.len(), 1);
    }
}
