//! The regex grammar: lexes/parses a small regular-expression language and
//! lowers its AST into an NFA via Thompson construction.
//!
//! Grammar ported from `original_source/EfficientCompiler/RegexParser_ast.cpp`
//! (see `SPEC_FULL.md` §9 for the BNF this file implements verbatim).

use crate::ast::{pass_through, right_tail_fold, AstNode, TransformRule, Visitor};
use crate::dfa::{Dfa, FinalStateInfo, TransitionInfo};
use crate::error::SemanticError;
use crate::grammar::{Grammar, Production, Symbol};
use crate::lexer::LexerSpec;
use crate::logger::Log;
use crate::nfa::{
    char_fragment, class_fragment, concat_fragment, dot_fragment, empty_fragment, expand_range,
    or_fragment, plus_fragment, question_fragment, star_fragment, Fragment, NfaArena,
};
use crate::parse_tree::ParseNode;
use crate::parser::{self, ParseOutput};
use crate::token::{Terminal, Token};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum T {
    Char,
    Dot,
    Empty,
    Or,
    Star,
    Plus,
    Question,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Caret,
    Minus,
    Eof,
}

impl Terminal for T {
    fn eof() -> Self {
        T::Eof
    }
    fn is_discardable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum N {
    Regex,
    TermsContinue,
    Term,
    FactorsContinue,
    Factor,
    FactorCore,
    FactorSuffix,
    Class,
    ClassMid,
    ClassEnd,
}

/// States: 0 start; 1 CHAR (a plain character, anything outside the
/// metacharacter set below); 2 DOT; 3-13 one state per single-byte
/// metacharacter/operator; 14 EMPTY (the literal `_`, this dialect's marker
/// for "match the empty string", since the grammar names an `EMPTY` leaf
/// without the source specifying which byte produces it).
fn dfa() -> Dfa<T> {
    let specials = "|*+?()[]^-._";
    let ordinary: String = (1u8..=126)
        .map(|b| b as char)
        .filter(|c| !specials.contains(*c) && *c != '\\')
        .collect();

    Dfa::build(
        &[
            TransitionInfo::new(0, 1, &ordinary),
            TransitionInfo::new(0, 2, "."),
            TransitionInfo::new(0, 3, "|"),
            TransitionInfo::new(0, 4, "*"),
            TransitionInfo::new(0, 5, "+"),
            TransitionInfo::new(0, 6, "?"),
            TransitionInfo::new(0, 7, "("),
            TransitionInfo::new(0, 8, ")"),
            TransitionInfo::new(0, 9, "["),
            TransitionInfo::new(0, 10, "]"),
            TransitionInfo::new(0, 11, "^"),
            TransitionInfo::new(0, 12, "-"),
            TransitionInfo::new(0, 13, "_"),
        ],
        &[
            FinalStateInfo::new(1, T::Char),
            FinalStateInfo::new(2, T::Dot),
            FinalStateInfo::new(3, T::Or),
            FinalStateInfo::new(4, T::Star),
            FinalStateInfo::new(5, T::Plus),
            FinalStateInfo::new(6, T::Question),
            FinalStateInfo::new(7, T::LParen),
            FinalStateInfo::new(8, T::RParen),
            FinalStateInfo::new(9, T::LBracket),
            FinalStateInfo::new(10, T::RBracket),
            FinalStateInfo::new(11, T::Caret),
            FinalStateInfo::new(12, T::Minus),
            FinalStateInfo::new(13, T::Empty),
        ],
    )
    .expect("regex DFA is hand-verified conflict-free")
}

pub fn lexer_spec() -> LexerSpec<T> {
    LexerSpec::new(dfa())
}

fn grammar() -> Grammar<N, T> {
    use Symbol::{Eps, NonTerminal as NT, Terminal as Tm};
    Grammar::new(
        N::Regex,
        vec![
            // 0: regex -> term terms_continue
            Production::new(N::Regex, vec![NT(N::Term), NT(N::TermsContinue)]),
            // 1: terms_continue -> OR term terms_continue
            Production::new(
                N::TermsContinue,
                vec![Tm(T::Or), NT(N::Term), NT(N::TermsContinue)],
            ),
            // 2: terms_continue -> eps
            Production::new(N::TermsContinue, vec![Eps]),
            // 3: term -> factor factors_continue
            Production::new(N::Term, vec![NT(N::Factor), NT(N::FactorsContinue)]),
            // 4: factors_continue -> factor factors_continue
            Production::new(N::FactorsContinue, vec![NT(N::Factor), NT(N::FactorsContinue)]),
            // 5: factors_continue -> eps
            Production::new(N::FactorsContinue, vec![Eps]),
            // 6: factor -> factor_core factor_suffix
            Production::new(N::Factor, vec![NT(N::FactorCore), NT(N::FactorSuffix)]),
            // 7: factor_core -> CHAR
            Production::new(N::FactorCore, vec![Tm(T::Char)]),
            // 8: factor_core -> DOT
            Production::new(N::FactorCore, vec![Tm(T::Dot)]),
            // 9: factor_core -> EMPTY
            Production::new(N::FactorCore, vec![Tm(T::Empty)]),
            // 10: factor_core -> LPAREN regex RPAREN
            Production::new(
                N::FactorCore,
                vec![Tm(T::LParen), NT(N::Regex), Tm(T::RParen)],
            ),
            // 11: factor_core -> LBRACKET class RBRACKET
            Production::new(
                N::FactorCore,
                vec![Tm(T::LBracket), NT(N::Class), Tm(T::RBracket)],
            ),
            // 11: factor_suffix -> STAR
            Production::new(N::FactorSuffix, vec![Tm(T::Star)]),
            // 12: factor_suffix -> PLUS
            Production::new(N::FactorSuffix, vec![Tm(T::Plus)]),
            // 13: factor_suffix -> QUESTION
            Production::new(N::FactorSuffix, vec![Tm(T::Question)]),
            // 14: factor_suffix -> eps
            Production::new(N::FactorSuffix, vec![Eps]),
            // 15: class -> CHAR class_mid
            Production::new(N::Class, vec![Tm(T::Char), NT(N::ClassMid)]),
            // 16: class -> CARET class_end
            Production::new(N::Class, vec![Tm(T::Caret), NT(N::ClassEnd)]),
            // 17: class_mid -> CHAR class_mid
            Production::new(N::ClassMid, vec![Tm(T::Char), NT(N::ClassMid)]),
            // 18: class_mid -> MINUS CHAR class_end
            Production::new(N::ClassMid, vec![Tm(T::Minus), Tm(T::Char), NT(N::ClassEnd)]),
            // 19: class_mid -> eps
            Production::new(N::ClassMid, vec![Eps]),
            // 20: class_end -> CHAR class_mid
            Production::new(N::ClassEnd, vec![Tm(T::Char), NT(N::ClassMid)]),
            // 21: class_end -> eps
            Production::new(N::ClassEnd, vec![Eps]),
        ],
    )
}

pub fn parse<'src>(source: &'src str) -> ParseOutput<'src, N, T> {
    let spec = lexer_spec();
    let tokens: Vec<Token<'src, T>> = spec.lex(source).collect();
    let grammar = grammar();
    let table = grammar.parse_table().expect("regex grammar is conflict-free by construction");
    parser::parse(source, &tokens, &grammar, &table, Log::None)
}

/// A single member of a bracketed class: either one literal character or a
/// `low-high` range, still unexpanded (expansion happens in `to_nfa`, so an
/// inverted range surfaces as a `SemanticError` there rather than panicking
/// mid-visit).
#[derive(Debug, Clone, PartialEq)]
pub enum ClassItem {
    Char(char),
    Range(char, char),
}

/// An AST node's label; the actual tree shape lives in `AstNode::children`
/// (per `right_tail_fold`'s contract), not inside this enum — `Or`/`Concat`
/// are n-ary flattened labels with one child per operand, `Star`/`Plus`/
/// `Question` have exactly one child, and `Class`/`NegatedClass` are leaves
/// carrying their members directly since they have no children to recurse
/// into.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Char(char),
    Dot,
    Empty,
    Or,
    Concat,
    Star,
    Plus,
    Question,
    Class(Vec<ClassItem>),
    NegatedClass(Vec<ClassItem>),
}

fn rules() -> HashMap<N, TransformRule<N, T, Ast>> {
    let mut rules: HashMap<N, TransformRule<N, T, Ast>> = HashMap::new();

    rules.insert(N::Regex, |visitor, node, _| {
        let first = pass_through(visitor, node, 0);
        let mut tail = node.take_child(1);
        visitor.convert(&mut tail, Some(first))
    });

    rules.insert(N::TermsContinue, |visitor, node, inherited| {
        right_tail_fold(
            visitor,
            node,
            inherited,
            0,
            1,
            2,
            |_tok| Ast::Or,
            |a, b| matches!((a, b), (Ast::Or, Ast::Or)),
        )
    });

    rules.insert(N::Term, |visitor, node, _| {
        let first = pass_through(visitor, node, 0);
        let mut tail = node.take_child(1);
        visitor.convert(&mut tail, Some(first))
    });

    // CONCAT has no operator token to match `right_tail_fold`'s 3-child
    // (op, operand, tail) shape, so its fold is spelled out directly here,
    // following the same same-op-flatten idiom.
    rules.insert(N::FactorsContinue, |visitor, node, inherited| {
        if node.child_count() == 0 {
            return inherited.expect("factors_continue eps requires an inherited node");
        }
        let inherited = inherited.expect("factors_continue requires an inherited node");
        let operand = {
            let mut child = node.take_child(0);
            visitor.convert(&mut child, None)
        };
        let mut root = if matches!(inherited.value, Ast::Concat) {
            inherited
        } else {
            AstNode::new(Ast::Concat, vec![inherited])
        };
        root.children.push(operand);
        let mut tail = node.take_child(1);
        visitor.convert(&mut tail, Some(root))
    });

    rules.insert(N::Factor, |visitor, node, _| {
        let core = {
            let mut child = node.take_child(0);
            visitor.convert(&mut child, None)
        };
        let mut suffix = node.take_child(1);
        visitor.convert(&mut suffix, Some(core))
    });

    rules.insert(N::FactorCore, |visitor, node, _| match node.child_count() {
        1 => {
            // CHAR or DOT
            let mut child = node.take_child(0);
            match &child {
                ParseNode::Terminal(tok) => match tok.kind.as_terminal() {
                    Some(T::Dot) => AstNode::leaf(Ast::Dot),
                    Some(T::Empty) => AstNode::leaf(Ast::Empty),
                    Some(T::Char) => {
                        let c = tok.lexeme.chars().next().expect("CHAR lexeme is one byte");
                        AstNode::leaf(Ast::Char(c))
                    }
                    _ => panic!("unexpected factor_core leaf terminal"),
                },
                _ => visitor.convert(&mut child, None),
            }
        }
        3 => {
            // LPAREN regex RPAREN, or LBRACKET class RBRACKET
            pass_through(visitor, node, 1)
        }
        n => panic!("factor_core has unexpected child count {n}"),
    });

    rules.insert(N::FactorSuffix, |visitor, node, inherited| {
        let inner = inherited.expect("factor_suffix always receives the core as inherited");
        if node.child_count() == 0 {
            return inner;
        }
        let op = node.take_child(0);
        let op_tok = op.as_token().expect("factor_suffix child is a terminal");
        match op_tok.kind.as_terminal() {
            Some(T::Star) => AstNode::new(Ast::Star, vec![inner]),
            Some(T::Plus) => AstNode::new(Ast::Plus, vec![inner]),
            Some(T::Question) => AstNode::new(Ast::Question, vec![inner]),
            _ => panic!("unexpected factor_suffix operator"),
        }
    });

    rules.insert(N::Class, |_visitor, node, _| {
        let first = node.take_child(0);
        let first_tok = *first.as_token().expect("class's first child is a terminal");

        let (negated, items) = match first_tok.kind.as_terminal() {
            Some(T::Caret) => {
                let mut end = node.take_child(1);
                (true, walk_class_end(&mut end))
            }
            Some(T::Char) => {
                let pending = first_tok.lexeme.chars().next().expect("CHAR lexeme is one char");
                let mut mid = node.take_child(1);
                (false, walk_class_mid(&mut mid, pending))
            }
            _ => panic!("unexpected class leading terminal"),
        };

        if negated {
            AstNode::leaf(Ast::NegatedClass(items))
        } else {
            AstNode::leaf(Ast::Class(items))
        }
    });

    rules
}

/// `class_mid`/`class_end` build a flat `Vec<ClassItem>` rather than nested
/// AST nodes, so they bypass `Visitor::convert` and are walked directly. A
/// `MINUS` production reinterprets the char the caller is carrying as the
/// low end of a range rather than a standalone member; the range itself is
/// left unexpanded here (see `to_nfa`).
///
/// `class_mid -> CHAR class_mid | MINUS CHAR class_end | eps`
fn walk_class_mid(node: &mut ParseNode<N, T>, pending: char) -> Vec<ClassItem> {
    match node.child_count() {
        0 => vec![ClassItem::Char(pending)],
        2 => {
            // CHAR class_mid: `pending` stands alone, continue with the new head.
            let head = node.take_child(0);
            let next = head
                .as_token()
                .expect("class_mid head is CHAR")
                .lexeme
                .chars()
                .next()
                .expect("CHAR lexeme is one char");
            let mut tail = node.take_child(1);
            let mut rest = walk_class_mid(&mut tail, next);
            rest.insert(0, ClassItem::Char(pending));
            rest
        }
        3 => {
            // MINUS CHAR class_end: `pending` is the range's low end.
            let high_child = node.take_child(1);
            let high = high_child
                .as_token()
                .expect("class_mid range end is CHAR")
                .lexeme
                .chars()
                .next()
                .expect("CHAR lexeme is one char");
            let mut end = node.take_child(2);
            let mut rest = vec![ClassItem::Range(pending, high)];
            rest.extend(walk_class_end(&mut end));
            rest
        }
        n => panic!("class_mid has unexpected child count {n}"),
    }
}

/// `class_end -> CHAR class_mid | eps`
fn walk_class_end(node: &mut ParseNode<N, T>) -> Vec<ClassItem> {
    match node.child_count() {
        0 => Vec::new(),
        2 => {
            let head = node.take_child(0);
            let pending = head
                .as_token()
                .expect("class_end head is CHAR")
                .lexeme
                .chars()
                .next()
                .expect("CHAR lexeme is one char");
            let mut mid = node.take_child(1);
            walk_class_mid(&mut mid, pending)
        }
        n => panic!("class_end has unexpected child count {n}"),
    }
}

/// Lower a regex AST into an NFA fragment, expanding character ranges and
/// reporting the first `SemanticError` encountered (e.g. an inverted range).
/// Tree shape is read from `AstNode::children`, not from the `Ast` label.
pub fn to_nfa(arena: &mut NfaArena, node: &AstNode<Ast>) -> Result<Fragment, SemanticError> {
    match &node.value {
        Ast::Char(c) => Ok(char_fragment(arena, *c)),
        Ast::Dot => Ok(dot_fragment(arena)),
        Ast::Empty => Ok(empty_fragment(arena)),
        Ast::Or => {
            let mut frags = Vec::with_capacity(node.children.len());
            for child in &node.children {
                frags.push(to_nfa(arena, child)?);
            }
            Ok(or_fragment(arena, &frags))
        }
        Ast::Concat => {
            let mut frags = Vec::with_capacity(node.children.len());
            for child in &node.children {
                frags.push(to_nfa(arena, child)?);
            }
            Ok(concat_fragment(arena, &frags))
        }
        Ast::Star => {
            let f = to_nfa(arena, &node.children[0])?;
            Ok(star_fragment(arena, f))
        }
        Ast::Plus => {
            let f = to_nfa(arena, &node.children[0])?;
            Ok(plus_fragment(arena, f))
        }
        Ast::Question => {
            let f = to_nfa(arena, &node.children[0])?;
            Ok(question_fragment(arena, f))
        }
        Ast::Class(items) => Ok(class_fragment(arena, expand_items(items)?)),
        Ast::NegatedClass(items) => {
            let excluded: std::collections::HashSet<char> = expand_items(items)?.into_iter().collect();
            let allowed: Vec<char> = (1u8..=126)
                .map(|b| b as char)
                .filter(|c| !excluded.contains(c))
                .collect();
            Ok(class_fragment(arena, allowed))
        }
    }
}

fn expand_items(items: &[ClassItem]) -> Result<Vec<char>, SemanticError> {
    let mut out = Vec::new();
    for item in items {
        match item {
            ClassItem::Char(c) => out.push(*c),
            ClassItem::Range(low, high) => out.extend(expand_range(*low, *high)?),
        }
    }
    Ok(out)
}

pub fn to_ast<'src>(tree: &mut ParseNode<'src, N, T>) -> AstNode<Ast> {
    let visitor = Visitor::new(rules());
    visitor.convert(tree, None)
}

/// Expand a `MINUS`-joined range pair once both endpoints are known,
/// reporting the `SemanticError` a bad range (`z-a`) produces.
pub fn range(low: char, high: char) -> Result<Vec<char>, SemanticError> {
    expand_range(low, high)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_simple_literal() {
        let spec = lexer_spec();
        let kinds: Vec<_> = spec
            .lex("abc")
            .map(|t| t.kind.as_terminal().copied())
            .collect();
        assert_eq!(
            kinds,
            vec![Some(T::Char), Some(T::Char), Some(T::Char), Some(T::Eof)]
        );
    }

    #[test]
    fn parses_alternation_class_and_star() {
        let out = parse("abc|[d-f]*");
        assert!(out.is_ok(), "{}", out.errors);
    }

    #[test]
    fn ast_folds_concat_into_flat_node() {
        let mut out = parse("abc");
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        assert_eq!(ast.value, Ast::Concat);
        assert_eq!(ast.children.len(), 3);
        assert_eq!(ast.children[0].value, Ast::Char('a'));
        assert_eq!(ast.children[1].value, Ast::Char('b'));
        assert_eq!(ast.children[2].value, Ast::Char('c'));
    }

    #[test]
    fn ast_folds_alternation_and_builds_class_range() {
        let mut out = parse("a|[d-f]*");
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        assert_eq!(ast.value, Ast::Or);
        assert_eq!(ast.children.len(), 2);
        assert_eq!(ast.children[0].value, Ast::Char('a'));
        assert_eq!(ast.children[1].value, Ast::Star);
        match &ast.children[1].children[0].value {
            Ast::Class(items) => assert_eq!(items, &vec![ClassItem::Range('d', 'f')]),
            other => panic!("expected a Class leaf, got {:?}", other),
        }
    }

    #[test]
    fn ast_folds_three_way_alternation_into_flat_or_node() {
        let mut out = parse("a|b|c");
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        assert_eq!(ast.value, Ast::Or);
        assert_eq!(ast.children.len(), 3);
        assert_eq!(ast.children[0].value, Ast::Char('a'));
        assert_eq!(ast.children[1].value, Ast::Char('b'));
        assert_eq!(ast.children[2].value, Ast::Char('c'));
    }

    #[test]
    fn invalid_range_is_rejected() {
        assert!(range('z', 'a').is_err());
    }

    #[test]
    fn invalid_range_is_rejected_during_nfa_lowering() {
        let mut out = parse("[z-a]");
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        let mut arena = NfaArena::new();
        assert!(to_nfa(&mut arena, &ast).is_err());
    }

    #[test]
    fn nfa_accepts_simple_literal() {
        let mut out = parse("abc");
        let ast = to_ast(&mut out.root);
        let mut arena = NfaArena::new();
        let frag = to_nfa(&mut arena, &ast).unwrap();
        assert!(arena.len() >= 6);
        let _ = frag;
    }
}
