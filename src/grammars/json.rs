//! The JSON grammar: object/array/string/number/bool/null, exactly the
//! document shape spec.md §8's worked example (`{"k":[1,2,3]}`) exercises.
//!
//! Grammar shape grounded on the same right-tail-list idiom
//! `original_source/EfficientCompiler/RegexParser_ast.cpp` uses for
//! `_class`'s comma-separated members (`members`/`members_tail`,
//! `elements`/`elements_tail` mirror `class_mid`/`class_end`'s "walk
//! directly, don't go through the visitor table" shape).

use crate::ast::{AstNode, TransformRule, Visitor};
use crate::dfa::{Dfa, FinalStateInfo, TransitionInfo};
use crate::grammar::{Grammar, Production, Symbol};
use crate::lexer::{KeywordInfo, LexerSpec};
use crate::logger::Log;
use crate::parse_tree::ParseNode;
use crate::parser::{self, ParseOutput};
use crate::token::{Terminal, Token};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum T {
    Str,
    Number,
    True,
    False,
    Null,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Space,
    /// Fallback for an identifier-shaped lexeme that isn't one of the three
    /// keywords; JSON has no bare identifiers, so this terminal never
    /// appears in a parse-table cell and reaching it is always a parse error.
    Ident,
    Eof,
}

impl Terminal for T {
    fn eof() -> Self {
        T::Eof
    }
    fn is_discardable(&self) -> bool {
        matches!(self, T::Space)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum N {
    Value,
    Object,
    Members,
    MembersTail,
    Pair,
    Array,
    Elements,
    ElementsTail,
}

/// States: 0 start; 1-6 single-byte punctuation; 7 SPACE; 8 string body
/// (not final — the quotes themselves are consumed into the lexeme, not
/// stripped until AST conversion); 9-12, 16-18 the number sub-machine
/// (optional sign, integer part, optional fraction, optional exponent);
/// 13 string escape; 14 string done; 15 lowercase-identifier run.
fn dfa() -> Dfa<T> {
    let digits = "0123456789";
    let alpha = "abcdefghijklmnopqrstuvwxyz";

    Dfa::build(
        &[
            TransitionInfo::new(0, 1, "{"),
            TransitionInfo::new(0, 2, "}"),
            TransitionInfo::new(0, 3, "["),
            TransitionInfo::new(0, 4, "]"),
            TransitionInfo::new(0, 5, ":"),
            TransitionInfo::new(0, 6, ","),
            TransitionInfo::new(0, 7, " \t\n\r"),
            TransitionInfo::new(7, 7, " \t\n\r"),
            TransitionInfo::new(0, 8, "\""),
            TransitionInfo::with_default(8, 8, "", 8),
            TransitionInfo::new(8, 14, "\""),
            TransitionInfo::new(8, 13, "\\"),
            TransitionInfo::with_default(13, 8, "", 8),
            TransitionInfo::new(0, 10, digits),
            TransitionInfo::new(0, 9, "-"),
            TransitionInfo::new(9, 10, digits),
            TransitionInfo::new(10, 10, digits),
            TransitionInfo::new(10, 11, "."),
            TransitionInfo::new(11, 12, digits),
            TransitionInfo::new(12, 12, digits),
            TransitionInfo::new(10, 16, "eE"),
            TransitionInfo::new(12, 16, "eE"),
            TransitionInfo::new(16, 17, "+-"),
            TransitionInfo::new(16, 18, digits),
            TransitionInfo::new(17, 18, digits),
            TransitionInfo::new(18, 18, digits),
            TransitionInfo::new(0, 15, alpha),
            TransitionInfo::new(15, 15, alpha),
        ],
        &[
            FinalStateInfo::new(1, T::LBrace),
            FinalStateInfo::new(2, T::RBrace),
            FinalStateInfo::new(3, T::LBracket),
            FinalStateInfo::new(4, T::RBracket),
            FinalStateInfo::new(5, T::Colon),
            FinalStateInfo::new(6, T::Comma),
            FinalStateInfo::new(7, T::Space),
            FinalStateInfo::new(10, T::Number),
            FinalStateInfo::new(12, T::Number),
            FinalStateInfo::new(14, T::Str),
            FinalStateInfo::new(15, T::Ident),
            FinalStateInfo::new(18, T::Number),
        ],
    )
    .expect("JSON DFA is hand-verified conflict-free")
}

pub fn lexer_spec() -> LexerSpec<T> {
    LexerSpec::new(dfa())
        .with_identifier_terminal(T::Ident)
        .with_keywords(&[
            KeywordInfo::new("true", T::True),
            KeywordInfo::new("false", T::False),
            KeywordInfo::new("null", T::Null),
        ])
}

fn grammar() -> Grammar<N, T> {
    use Symbol::{Eps, NonTerminal as NT, Terminal as Tm};
    Grammar::new(
        N::Value,
        vec![
            // 0: value -> STRING
            Production::new(N::Value, vec![Tm(T::Str)]),
            // 1: value -> NUMBER
            Production::new(N::Value, vec![Tm(T::Number)]),
            // 2: value -> object
            Production::new(N::Value, vec![NT(N::Object)]),
            // 3: value -> array
            Production::new(N::Value, vec![NT(N::Array)]),
            // 4: value -> TRUE
            Production::new(N::Value, vec![Tm(T::True)]),
            // 5: value -> FALSE
            Production::new(N::Value, vec![Tm(T::False)]),
            // 6: value -> NULL
            Production::new(N::Value, vec![Tm(T::Null)]),
            // 7: object -> LBRACE members RBRACE
            Production::new(N::Object, vec![Tm(T::LBrace), NT(N::Members), Tm(T::RBrace)]),
            // 8: members -> pair members_tail
            Production::new(N::Members, vec![NT(N::Pair), NT(N::MembersTail)]),
            // 9: members -> eps
            Production::new(N::Members, vec![Eps]),
            // 10: members_tail -> COMMA pair members_tail
            Production::new(
                N::MembersTail,
                vec![Tm(T::Comma), NT(N::Pair), NT(N::MembersTail)],
            ),
            // 11: members_tail -> eps
            Production::new(N::MembersTail, vec![Eps]),
            // 12: pair -> STRING COLON value
            Production::new(N::Pair, vec![Tm(T::Str), Tm(T::Colon), NT(N::Value)]),
            // 13: array -> LBRACKET elements RBRACKET
            Production::new(N::Array, vec![Tm(T::LBracket), NT(N::Elements), Tm(T::RBracket)]),
            // 14: elements -> value elements_tail
            Production::new(N::Elements, vec![NT(N::Value), NT(N::ElementsTail)]),
            // 15: elements -> eps
            Production::new(N::Elements, vec![Eps]),
            // 16: elements_tail -> COMMA value elements_tail
            Production::new(
                N::ElementsTail,
                vec![Tm(T::Comma), NT(N::Value), NT(N::ElementsTail)],
            ),
            // 17: elements_tail -> eps
            Production::new(N::ElementsTail, vec![Eps]),
        ],
    )
}

pub fn parse<'src>(source: &'src str) -> ParseOutput<'src, N, T> {
    let spec = lexer_spec();
    let tokens: Vec<Token<'src, T>> = spec.lex(source).collect();
    let grammar = grammar();
    let table = grammar
        .parse_table()
        .expect("JSON grammar is conflict-free by construction");
    parser::parse(source, &tokens, &grammar, &table, Log::None)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Object,
    Array,
    /// A single `"key": value` member; its one child is the value.
    Pair(String),
}

fn rules() -> HashMap<N, TransformRule<N, T, Ast>> {
    let mut rules: HashMap<N, TransformRule<N, T, Ast>> = HashMap::new();

    rules.insert(N::Value, |visitor, node, _| {
        let mut child = node.take_child(0);
        match child.as_token().copied() {
            Some(tok) => match tok.kind.as_terminal() {
                Some(T::Str) => AstNode::leaf(Ast::Str(unescape(tok.lexeme))),
                Some(T::Number) => {
                    AstNode::leaf(Ast::Num(tok.lexeme.parse().expect("NUMBER lexeme is a valid float")))
                }
                Some(T::True) => AstNode::leaf(Ast::Bool(true)),
                Some(T::False) => AstNode::leaf(Ast::Bool(false)),
                Some(T::Null) => AstNode::leaf(Ast::Null),
                _ => panic!("unexpected value leaf terminal"),
            },
            None => visitor.convert(&mut child, None),
        }
    });

    rules.insert(N::Object, |visitor, node, _| {
        let mut members = node.take_child(1);
        AstNode::new(Ast::Object, collect_members(visitor, &mut members))
    });

    rules.insert(N::Array, |visitor, node, _| {
        let mut elements = node.take_child(1);
        AstNode::new(Ast::Array, collect_elements(visitor, &mut elements))
    });

    rules
}

/// `members -> pair members_tail | eps`: walked directly rather than
/// through the visitor table, the same way `regex.rs`'s `class_mid`/
/// `class_end` are.
fn collect_members<'src>(
    visitor: &Visitor<N, T, Ast>,
    node: &mut ParseNode<'src, N, T>,
) -> Vec<AstNode<Ast>> {
    if node.child_count() == 0 {
        return Vec::new();
    }
    let mut pair = node.take_child(0);
    let first = convert_pair(visitor, &mut pair);
    let mut tail = node.take_child(1);
    let mut rest = collect_members_tail(visitor, &mut tail);
    let mut out = vec![first];
    out.append(&mut rest);
    out
}

fn collect_members_tail<'src>(
    visitor: &Visitor<N, T, Ast>,
    node: &mut ParseNode<'src, N, T>,
) -> Vec<AstNode<Ast>> {
    if node.child_count() == 0 {
        return Vec::new();
    }
    let mut pair = node.take_child(1);
    let first = convert_pair(visitor, &mut pair);
    let mut tail = node.take_child(2);
    let mut rest = collect_members_tail(visitor, &mut tail);
    let mut out = vec![first];
    out.append(&mut rest);
    out
}

fn convert_pair<'src>(visitor: &Visitor<N, T, Ast>, node: &mut ParseNode<'src, N, T>) -> AstNode<Ast> {
    let key = node.take_child(0);
    let key = unescape(key.as_token().expect("pair key is a STRING leaf").lexeme);
    let mut value = node.take_child(2);
    let value_ast = visitor.convert(&mut value, None);
    AstNode::new(Ast::Pair(key), vec![value_ast])
}

/// `elements -> value elements_tail | eps`.
fn collect_elements<'src>(
    visitor: &Visitor<N, T, Ast>,
    node: &mut ParseNode<'src, N, T>,
) -> Vec<AstNode<Ast>> {
    if node.child_count() == 0 {
        return Vec::new();
    }
    let mut value = node.take_child(0);
    let first = visitor.convert(&mut value, None);
    let mut tail = node.take_child(1);
    let mut rest = collect_elements_tail(visitor, &mut tail);
    let mut out = vec![first];
    out.append(&mut rest);
    out
}

fn collect_elements_tail<'src>(
    visitor: &Visitor<N, T, Ast>,
    node: &mut ParseNode<'src, N, T>,
) -> Vec<AstNode<Ast>> {
    if node.child_count() == 0 {
        return Vec::new();
    }
    let mut value = node.take_child(1);
    let first = visitor.convert(&mut value, None);
    let mut tail = node.take_child(2);
    let mut rest = collect_elements_tail(visitor, &mut tail);
    let mut out = vec![first];
    out.append(&mut rest);
    out
}

/// Strip the surrounding quotes and resolve JSON's backslash escapes
/// (`\"`, `\\`, `\/`, `\b`, `\f`, `\n`, `\r`, `\t`, `\uXXXX`).
fn unescape(lexeme: &str) -> String {
    let inner = &lexeme[1..lexeme.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = (&mut chars).take(4).collect();
                if let Ok(code) = u32::from_str_radix(&hex, 16) {
                    if let Some(ch) = char::from_u32(code) {
                        out.push(ch);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

pub fn to_ast<'src>(tree: &mut ParseNode<'src, N, T>) -> AstNode<Ast> {
    Visitor::new(rules()).convert(tree, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_object_with_array_value() {
        let mut out = parse(r#"{"k":[1,2,3]}"#);
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        assert_eq!(ast.value, Ast::Object);
        assert_eq!(ast.children.len(), 1);
        assert_eq!(ast.children[0].value, Ast::Pair("k".to_string()));
        let array = &ast.children[0].children[0];
        assert_eq!(array.value, Ast::Array);
        assert_eq!(
            array.children.iter().map(|c| c.value.clone()).collect::<Vec<_>>(),
            vec![Ast::Num(1.0), Ast::Num(2.0), Ast::Num(3.0)]
        );
    }

    #[test]
    fn parses_scalars_and_escapes() {
        let mut out = parse(r#""a\nb""#);
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        assert_eq!(ast.value, Ast::Str("a\nb".to_string()));
    }

    #[test]
    fn parses_booleans_and_null() {
        for (src, expected) in [("true", Ast::Bool(true)), ("false", Ast::Bool(false)), ("null", Ast::Null)] {
            let mut out = parse(src);
            assert!(out.is_ok(), "{}", out.errors);
            assert_eq!(to_ast(&mut out.root).value, expected);
        }
    }

    #[test]
    fn empty_object_and_array_parse_with_no_children() {
        let mut out = parse("{}");
        assert!(out.is_ok(), "{}", out.errors);
        assert_eq!(to_ast(&mut out.root).children.len(), 0);

        let mut out = parse("[]");
        assert!(out.is_ok(), "{}", out.errors);
        assert_eq!(to_ast(&mut out.root).children.len(), 0);
    }

    #[test]
    fn trailing_comma_is_rejected() {
        let out = parse(r#"[1,2,]"#);
        assert!(!out.is_ok());
    }

    #[test]
    fn cross_checks_against_serde_json_for_scalar_shape() {
        let mut out = parse(r#"{"a":1,"b":[true,false,null]}"#);
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        let value: serde_json::Value = serde_json::from_str(r#"{"a":1,"b":[true,false,null]}"#).unwrap();
        assert_eq!(value.as_object().unwrap().len(), ast.children.len());
    }
}
