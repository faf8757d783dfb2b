use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use lachs::Span;

/// Source files must carry this extension, including imported ones.
pub const SOURCE_EXTENSION: &str = ".bnt";

#[lachs::token]
pub enum Token {
    #[terminal("if")]
    If,
    #[terminal("else")]
    Else,
    #[terminal("func")]
    Func,
    #[terminal("typeclass")]
    Typeclass,
    #[terminal("type")]
    Type,
    #[terminal("val")]
    Val,
    #[terminal("List")]
    List,
    #[terminal("Tuple")]
    Tuple,
    #[terminal("true")]
    True,
    #[terminal("false")]
    False,
    #[terminal("int")]
    IntKeyword,
    #[terminal("bool")]
    BoolKeyword,
    #[terminal("char")]
    CharKeyword,
    #[terminal("null")]
    Null,
    #[terminal("string")]
    StringKeyword,
    #[terminal("case")]
    Case,
    #[terminal("match")]
    MatchKw,
    #[terminal("any")]
    Any,
    #[terminal("import")]
    Import,
    #[terminal("..")]
    DotDot,
    #[terminal("[")]
    LBracket,
    #[terminal("]")]
    RBracket,
    #[terminal("(")]
    LParen,
    #[terminal(")")]
    RParen,
    #[terminal("{")]
    LBrace,
    #[terminal("}")]
    RBrace,
    #[terminal("=")]
    Equals,
    #[terminal("->")]
    Arrow,
    #[terminal(":")]
    Colon,
    #[terminal(";")]
    Semicolon,
    #[terminal(",")]
    Comma,
    #[terminal(".")]
    Dot,
    #[terminal("+")]
    Plus,
    #[terminal("-")]
    Minus,
    #[terminal("*")]
    Star,
    #[terminal("/")]
    Slash,
    #[terminal("%")]
    Percent,
    #[terminal("<")]
    Less,
    #[terminal(">")]
    Greater,
    #[terminal("<=")]
    LessEquals,
    #[terminal(">=")]
    GreaterEquals,
    #[terminal("==")]
    DoubleEquals,
    #[terminal("!=")]
    NotEquals,
    #[terminal("!")]
    Bang,
    #[terminal("&&")]
    And,
    #[terminal("||")]
    Or,
    #[literal("[0-9]+")]
    Integer,
    #[literal(r"'(\\.|[^\\'])'")]
    CharLiteral,
    #[literal(r#""([^"\\\n]|\\.)*""#)]
    StringLiteral,
    #[literal("[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
    #[literal("#[^\n]*")]
    Comment,
}

/// Lex a source string into tokens, dropping comments.
pub fn tokenize(source: &str) -> anyhow::Result<Vec<Token>> {
    let tokens = Token::lex(source)?;
    Ok(tokens
        .into_iter()
        .filter(|token| !matches!(token, Token::Comment(_)))
        .collect())
}

/// Read a source file, enforcing the `.bnt` extension.
pub fn read_source(path: &Path) -> anyhow::Result<String> {
    let name = path.to_string_lossy();
    if !name.ends_with(SOURCE_EXTENSION) {
        bail!("files require {} extension: {}", SOURCE_EXTENSION, name);
    }
    fs::read_to_string(path).with_context(|| format!("could not open file: {}", name))
}

impl Token {
    pub fn pos(&self) -> Span {
        match self {
            Token::If(inner) => inner.position.clone(),
            Token::Else(inner) => inner.position.clone(),
            Token::Func(inner) => inner.position.clone(),
            Token::Typeclass(inner) => inner.position.clone(),
            Token::Type(inner) => inner.position.clone(),
            Token::Val(inner) => inner.position.clone(),
            Token::List(inner) => inner.position.clone(),
            Token::Tuple(inner) => inner.position.clone(),
            Token::True(inner) => inner.position.clone(),
            Token::False(inner) => inner.position.clone(),
            Token::IntKeyword(inner) => inner.position.clone(),
            Token::BoolKeyword(inner) => inner.position.clone(),
            Token::CharKeyword(inner) => inner.position.clone(),
            Token::Null(inner) => inner.position.clone(),
            Token::StringKeyword(inner) => inner.position.clone(),
            Token::Case(inner) => inner.position.clone(),
            Token::MatchKw(inner) => inner.position.clone(),
            Token::Any(inner) => inner.position.clone(),
            Token::Import(inner) => inner.position.clone(),
            Token::DotDot(inner) => inner.position.clone(),
            Token::LBracket(inner) => inner.position.clone(),
            Token::RBracket(inner) => inner.position.clone(),
            Token::LParen(inner) => inner.position.clone(),
            Token::RParen(inner) => inner.position.clone(),
            Token::LBrace(inner) => inner.position.clone(),
            Token::RBrace(inner) => inner.position.clone(),
            Token::Equals(inner) => inner.position.clone(),
            Token::Arrow(inner) => inner.position.clone(),
            Token::Colon(inner) => inner.position.clone(),
            Token::Semicolon(inner) => inner.position.clone(),
            Token::Comma(inner) => inner.position.clone(),
            Token::Dot(inner) => inner.position.clone(),
            Token::Plus(inner) => inner.position.clone(),
            Token::Minus(inner) => inner.position.clone(),
            Token::Star(inner) => inner.position.clone(),
            Token::Slash(inner) => inner.position.clone(),
            Token::Percent(inner) => inner.position.clone(),
            Token::Less(inner) => inner.position.clone(),
            Token::Greater(inner) => inner.position.clone(),
            Token::LessEquals(inner) => inner.position.clone(),
            Token::GreaterEquals(inner) => inner.position.clone(),
            Token::DoubleEquals(inner) => inner.position.clone(),
            Token::NotEquals(inner) => inner.position.clone(),
            Token::Bang(inner) => inner.position.clone(),
            Token::And(inner) => inner.position.clone(),
            Token::Or(inner) => inner.position.clone(),
            Token::Integer(inner) => inner.position.clone(),
            Token::CharLiteral(inner) => inner.position.clone(),
            Token::StringLiteral(inner) => inner.position.clone(),
            Token::Ident(inner) => inner.position.clone(),
            Token::Comment(inner) => inner.position.clone(),
        }
    }

    /// The raw text of the token as it appeared in the source.
    pub fn text(&self) -> String {
        match self {
            Token::If(_) => "if".to_string(),
            Token::Else(_) => "else".to_string(),
            Token::Func(_) => "func".to_string(),
            Token::Typeclass(_) => "typeclass".to_string(),
            Token::Type(_) => "type".to_string(),
            Token::Val(_) => "val".to_string(),
            Token::List(_) => "List".to_string(),
            Token::Tuple(_) => "Tuple".to_string(),
            Token::True(_) => "true".to_string(),
            Token::False(_) => "false".to_string(),
            Token::IntKeyword(_) => "int".to_string(),
            Token::BoolKeyword(_) => "bool".to_string(),
            Token::CharKeyword(_) => "char".to_string(),
            Token::Null(_) => "null".to_string(),
            Token::StringKeyword(_) => "string".to_string(),
            Token::Case(_) => "case".to_string(),
            Token::MatchKw(_) => "match".to_string(),
            Token::Any(_) => "any".to_string(),
            Token::Import(_) => "import".to_string(),
            Token::DotDot(_) => "..".to_string(),
            Token::LBracket(_) => "[".to_string(),
            Token::RBracket(_) => "]".to_string(),
            Token::LParen(_) => "(".to_string(),
            Token::RParen(_) => ")".to_string(),
            Token::LBrace(_) => "{".to_string(),
            Token::RBrace(_) => "}".to_string(),
            Token::Equals(_) => "=".to_string(),
            Token::Arrow(_) => "->".to_string(),
            Token::Colon(_) => ":".to_string(),
            Token::Semicolon(_) => ";".to_string(),
            Token::Comma(_) => ",".to_string(),
            Token::Dot(_) => ".".to_string(),
            Token::Plus(_) => "+".to_string(),
            Token::Minus(_) => "-".to_string(),
            Token::Star(_) => "*".to_string(),
            Token::Slash(_) => "/".to_string(),
            Token::Percent(_) => "%".to_string(),
            Token::Less(_) => "<".to_string(),
            Token::Greater(_) => ">".to_string(),
            Token::LessEquals(_) => "<=".to_string(),
            Token::GreaterEquals(_) => ">=".to_string(),
            Token::DoubleEquals(_) => "==".to_string(),
            Token::NotEquals(_) => "!=".to_string(),
            Token::Bang(_) => "!".to_string(),
            Token::And(_) => "&&".to_string(),
            Token::Or(_) => "||".to_string(),
            Token::Integer(inner) => inner.value.clone(),
            Token::CharLiteral(inner) => inner.value.clone(),
            Token::StringLiteral(inner) => inner.value.clone(),
            Token::Ident(inner) => inner.value.clone(),
            Token::Comment(inner) => inner.value.clone(),
        }
    }

    /// Returns a human-readable description of the token
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(inner) => format!("identifier '{}'", inner.value),
            Token::Integer(inner) => format!("integer '{}'", inner.value),
            Token::CharLiteral(inner) => format!("char {}", inner.value),
            Token::StringLiteral(inner) => format!("string {}", inner.value),
            _ => format!("'{}'", self.text()),
        }
    }
}

