//! The arithmetic grammar: two precedence levels (`+`/`-` binding looser
//! than `*`/`/`), parenthesised grouping, and right-tail folding into flat
//! n-ary nodes per run of the same operator — the worked example spec.md §8
//! names (`"1 + 2 + 4"` folds to one `PLUS` node with three children),
//! generalized to a second operator pair so the table builder has more than
//! one precedence level to exercise.

use crate::ast::{leaf_promote, pass_through, right_tail_fold, AstNode, TransformRule, Visitor};
use crate::dfa::{Dfa, FinalStateInfo, TransitionInfo};
use crate::grammar::{Grammar, Production, Symbol};
use crate::lexer::LexerSpec;
use crate::logger::Log;
use crate::parse_tree::ParseNode;
use crate::parser::{self, ParseOutput};
use crate::token::{Terminal, Token};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum T {
    Num,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Space,
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
    Expr,
    ExprTail,
    Term,
    TermTail,
    Factor,
}

/// 0 start; 1 NUM (one or more digits); 2-7 single-byte operators/parens;
/// 8 SPACE (one or more whitespace bytes, discarded by the parser driver).
fn dfa() -> Dfa<T> {
    let digits = "0123456789";
    Dfa::build(
        &[
            TransitionInfo::new(0, 1, digits),
            TransitionInfo::new(1, 1, digits),
            TransitionInfo::new(0, 2, "+"),
            TransitionInfo::new(0, 3, "-"),
            TransitionInfo::new(0, 4, "*"),
            TransitionInfo::new(0, 5, "/"),
            TransitionInfo::new(0, 6, "("),
            TransitionInfo::new(0, 7, ")"),
            TransitionInfo::new(0, 8, " \t\n\r"),
            TransitionInfo::new(8, 8, " \t\n\r"),
        ],
        &[
            FinalStateInfo::new(1, T::Num),
            FinalStateInfo::new(2, T::Plus),
            FinalStateInfo::new(3, T::Minus),
            FinalStateInfo::new(4, T::Star),
            FinalStateInfo::new(5, T::Slash),
            FinalStateInfo::new(6, T::LParen),
            FinalStateInfo::new(7, T::RParen),
            FinalStateInfo::new(8, T::Space),
        ],
    )
    .expect("arithmetic DFA is hand-verified conflict-free")
}

pub fn lexer_spec() -> LexerSpec<T> {
    LexerSpec::new(dfa())
}

fn grammar() -> Grammar<N, T> {
    use Symbol::{Eps, NonTerminal as NT, Terminal as Tm};
    Grammar::new(
        N::Expr,
        vec![
            // 0: expr -> term expr_tail
            Production::new(N::Expr, vec![NT(N::Term), NT(N::ExprTail)]),
            // 1: expr_tail -> PLUS term expr_tail
            Production::new(N::ExprTail, vec![Tm(T::Plus), NT(N::Term), NT(N::ExprTail)]),
            // 2: expr_tail -> MINUS term expr_tail
            Production::new(N::ExprTail, vec![Tm(T::Minus), NT(N::Term), NT(N::ExprTail)]),
            // 3: expr_tail -> eps
            Production::new(N::ExprTail, vec![Eps]),
            // 4: term -> factor term_tail
            Production::new(N::Term, vec![NT(N::Factor), NT(N::TermTail)]),
            // 5: term_tail -> STAR factor term_tail
            Production::new(N::TermTail, vec![Tm(T::Star), NT(N::Factor), NT(N::TermTail)]),
            // 6: term_tail -> SLASH factor term_tail
            Production::new(N::TermTail, vec![Tm(T::Slash), NT(N::Factor), NT(N::TermTail)]),
            // 7: term_tail -> eps
            Production::new(N::TermTail, vec![Eps]),
            // 8: factor -> NUM
            Production::new(N::Factor, vec![Tm(T::Num)]),
            // 9: factor -> LPAREN expr RPAREN
            Production::new(N::Factor, vec![Tm(T::LParen), NT(N::Expr), Tm(T::RParen)]),
        ],
    )
}

pub fn parse<'src>(source: &'src str) -> ParseOutput<'src, N, T> {
    let spec = lexer_spec();
    let tokens: Vec<Token<'src, T>> = spec.lex(source).collect();
    let grammar = grammar();
    let table = grammar
        .parse_table()
        .expect("arithmetic grammar is conflict-free by construction");
    parser::parse(source, &tokens, &grammar, &table, Log::None)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ast {
    Num(i64),
    Plus,
    Minus,
    Star,
    Slash,
}

fn rules() -> HashMap<N, TransformRule<N, T, Ast>> {
    let mut rules: HashMap<N, TransformRule<N, T, Ast>> = HashMap::new();

    rules.insert(N::Expr, |visitor, node, _| {
        let first = pass_through(visitor, node, 0);
        let mut tail = node.take_child(1);
        visitor.convert(&mut tail, Some(first))
    });

    rules.insert(N::ExprTail, |visitor, node, inherited| {
        right_tail_fold(
            visitor,
            node,
            inherited,
            0,
            1,
            2,
            |tok| match tok.kind.as_terminal() {
                Some(T::Plus) => Ast::Plus,
                Some(T::Minus) => Ast::Minus,
                _ => panic!("unexpected expr_tail operator"),
            },
            |a, b| a == b,
        )
    });

    rules.insert(N::Term, |visitor, node, _| {
        let first = pass_through(visitor, node, 0);
        let mut tail = node.take_child(1);
        visitor.convert(&mut tail, Some(first))
    });

    rules.insert(N::TermTail, |visitor, node, inherited| {
        right_tail_fold(
            visitor,
            node,
            inherited,
            0,
            1,
            2,
            |tok| match tok.kind.as_terminal() {
                Some(T::Star) => Ast::Star,
                Some(T::Slash) => Ast::Slash,
                _ => panic!("unexpected term_tail operator"),
            },
            |a, b| a == b,
        )
    });

    rules.insert(N::Factor, |visitor, node, _| match node.child_count() {
        1 => leaf_promote(node, 0, |tok| Ast::Num(tok.lexeme.parse().expect("NUM lexeme is all digits"))),
        3 => pass_through(visitor, node, 1),
        n => panic!("factor has unexpected child count {n}"),
    });

    rules
}

pub fn to_ast<'src>(tree: &mut ParseNode<'src, N, T>) -> AstNode<Ast> {
    let visitor = Visitor::new(rules());
    visitor.convert(tree, None)
}

/// Fold an arithmetic AST down to its value, left to right within each
/// flattened operator run. Not part of spec.md's contract — a convenience
/// the tests use to check folding actually produced the right shape, not
/// just a label.
pub fn eval(node: &AstNode<Ast>) -> i64 {
    match node.value {
        Ast::Num(n) => n,
        Ast::Plus => node.children.iter().map(eval).sum(),
        Ast::Minus => node.children.iter().map(eval).reduce(|a, b| a - b).unwrap_or(0),
        Ast::Star => node.children.iter().map(eval).product(),
        Ast::Slash => node.children.iter().map(eval).reduce(|a, b| a / b).unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_three_term_sum_into_flat_plus_node() {
        let mut out = parse("1 + 2 + 4");
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        assert_eq!(ast.value, Ast::Plus);
        assert_eq!(ast.children.len(), 3);
        assert_eq!(eval(&ast), 7);
    }

    #[test]
    fn precedence_binds_multiplication_tighter_than_addition() {
        let mut out = parse("2 + 3 * 4");
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        assert_eq!(eval(&ast), 14);
    }

    #[test]
    fn parenthesised_group_overrides_precedence() {
        let mut out = parse("(2 + 3) * 4");
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        assert_eq!(eval(&ast), 20);
    }

    #[test]
    fn mismatched_parenthesis_is_reported() {
        let out = parse("(1 + 2");
        assert!(!out.is_ok());
    }
}
