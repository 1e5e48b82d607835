//! Explicit-stack predictive LL(1) parser, per spec.md §4.4.
//!
//! Loop shape and error-accumulation style grounded on the teacher's
//! `Tokenizer::tokenize` main loop (`src/tokenization.rs`) and
//! `Cache::create_error` (`src/cache.rs`).

use crate::error::ParseError;
use crate::grammar::{Grammar, ParseTable, Symbol};
use crate::logger::Log;
use crate::parse_tree::ParseNode;
use crate::position::Code;
use crate::token::{Terminal, Token};
use std::fmt::{Debug, Write as _};

/// Result of a parse: the root of the concrete parse tree (present even on
/// failure, for diagnostic inspection), a log of productions applied, and
/// an error buffer that is empty iff the parse succeeded.
pub struct ParseOutput<'src, N, T: Terminal> {
    pub root: ParseNode<'src, N, T>,
    pub logs: String,
    pub errors: String,
}

impl<'src, N, T: Terminal> ParseOutput<'src, N, T> {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One pending expansion: either a terminal waiting to be matched, or a
/// nonterminal whose expansion will be looked up in the parse table.
enum StackEntry<N, T> {
    Terminal(T),
    NonTerminal(N),
}

/// Drive `tokens` through `table`/`grammar`, producing a parse tree.
///
/// `tokens` must already include the trailing EOF token; discardable
/// tokens (per `Terminal::is_discardable`) are skipped when computing
/// lookahead, as spec.md §4.2's contract requires.
pub fn parse<'src, N, T>(
    source: &'src str,
    tokens: &[Token<'src, T>],
    grammar: &Grammar<N, T>,
    table: &ParseTable<N, T>,
    log_level: Log<&'static str>,
) -> ParseOutput<'src, N, T>
where
    N: Copy + Debug + Eq + std::hash::Hash + Ord,
    T: Terminal,
{
    let code = Code::from(source);
    let mut logs = String::new();
    let mut errors = String::new();

    let structural: Vec<&Token<'src, T>> = tokens
        .iter()
        .filter(|t| t.as_token_terminal().map_or(true, |term| !term.is_discardable()))
        .collect();

    // Build the tree top-down: a root placeholder slot, and a parallel
    // explicit stack mirroring spec.md §4.4's "pending parse-tree nodes".
    let mut root = ParseNode::node(grammar.start, Vec::new());
    // path[i] is the index into the children vector to descend through to
    // reach the node currently being expanded; the stack entries track
    // what is still pending at that same depth, left to right.
    let mut work: Vec<(Vec<usize>, StackEntry<N, T>)> =
        vec![(Vec::new(), StackEntry::NonTerminal(grammar.start))];
    let mut lookahead_index = 0usize;

    macro_rules! lookahead {
        () => {
            structural
                .get(lookahead_index)
                .copied()
                .expect("structural stream always ends in EOF")
        };
    }

    while let Some((path, entry)) = work.pop() {
        match entry {
            StackEntry::Terminal(expected) => {
                let tok = lookahead!();
                match tok.kind.as_terminal() {
                    Some(found) if *found == expected => {
                        set_at_path(&mut root, &path, ParseNode::leaf(*tok));
                        lookahead_index += 1;
                    }
                    _ => {
                        if errors.is_empty() {
                            errors = format!(
                                "expected {:?}, got {:?}\nFailed to parse at {}.",
                                expected,
                                tok.kind,
                                code.position_at(token_offset(source, tok))
                            );
                        }
                        return ParseOutput { root, logs, errors };
                    }
                }
            }
            StackEntry::NonTerminal(nt) => {
                let tok = lookahead!();
                let terminal = match tok.kind.as_terminal() {
                    Some(t) => *t,
                    None => {
                        // A lexical error token can never start a valid
                        // derivation; report it as an unexpected token.
                        if errors.is_empty() {
                            errors = format!(
                                "unexpected token for {:?}\nFailed to parse at {}.",
                                nt,
                                code.position_at(token_offset(source, tok))
                            );
                        }
                        return ParseOutput { root, logs, errors };
                    }
                };

                match table.get(&(nt, terminal)) {
                    None => {
                        if errors.is_empty() {
                            errors = format!(
                                "no table entry for ({:?}, {:?})\nFailed to parse at {}.",
                                nt,
                                terminal,
                                code.position_at(token_offset(source, tok))
                            );
                        }
                        return ParseOutput { root, logs, errors };
                    }
                    Some(&production_index) => {
                        let production = &grammar.productions[production_index];
                        if log_level.order() >= Log::Default(()).order() {
                            writeln!(logs, "{:?} -> production #{}", nt, production_index).ok();
                        }

                        if production.is_eps() {
                            set_at_path(&mut root, &path, ParseNode::node(nt, Vec::new()));
                            continue;
                        }

                        let child_count = production.rhs.len();
                        set_at_path(
                            &mut root,
                            &path,
                            ParseNode::node(nt, (0..child_count).map(|_| ParseNode::Taken).collect()),
                        );

                        for (i, sym) in production.rhs.iter().enumerate().rev() {
                            let mut child_path = path.clone();
                            child_path.push(i);
                            match sym {
                                Symbol::Terminal(t) => work.push((child_path, StackEntry::Terminal(*t))),
                                Symbol::NonTerminal(n) => {
                                    work.push((child_path, StackEntry::NonTerminal(*n)))
                                }
                                Symbol::Eps => unreachable!(),
                            }
                        }
                    }
                }
            }
        }
    }

    ParseOutput { root, logs, errors }
}

fn set_at_path<'src, N: Debug, T: Terminal>(
    root: &mut ParseNode<'src, N, T>,
    path: &[usize],
    value: ParseNode<'src, N, T>,
) {
    let mut node = root;
    for &i in path {
        node = match node {
            ParseNode::NonTerminal { children, .. } => &mut children[i],
            _ => panic!("path descends through a non-nonterminal node"),
        };
    }
    *node = value;
}

fn token_offset<T>(source: &str, token: &Token<T>) -> usize {
    // SAFETY-free pointer arithmetic: `token.lexeme` is a subslice of
    // `source`, so its start offset is derivable from the pointer delta.
    (token.lexeme.as_ptr() as usize).saturating_sub(source.as_ptr() as usize)
}

trait TokenTerminalExt<T> {
    fn as_token_terminal(&self) -> Option<&T>;
}
impl<'src, T> TokenTerminalExt<T> for Token<'src, T> {
    fn as_token_terminal(&self) -> Option<&T> {
        self.kind.as_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, Production, Symbol};
    use crate::token::TokenKind;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    enum N {
        Expr,
        ExprTail,
    }
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    enum T {
        Num,
        Plus,
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

    fn grammar() -> Grammar<N, T> {
        Grammar::new(
            N::Expr,
            vec![
                Production::new(
                    N::Expr,
                    vec![Symbol::Terminal(T::Num), Symbol::NonTerminal(N::ExprTail)],
                ),
                Production::new(
                    N::ExprTail,
                    vec![
                        Symbol::Terminal(T::Plus),
                        Symbol::Terminal(T::Num),
                        Symbol::NonTerminal(N::ExprTail),
                    ],
                ),
                Production::new(N::ExprTail, vec![Symbol::Eps]),
            ],
        )
    }

    fn tok(kind: TokenKind<T>, lexeme: &str) -> Token<T> {
        Token::new(kind, lexeme, 1)
    }

    #[test]
    fn parses_num_plus_num_plus_num() {
        let g = grammar();
        let table = g.parse_table().unwrap();
        let source = "1+2+3";
        let tokens = vec![
            tok(TokenKind::Terminal(T::Num), &source[0..1]),
            tok(TokenKind::Terminal(T::Plus), &source[1..2]),
            tok(TokenKind::Terminal(T::Num), &source[2..3]),
            tok(TokenKind::Terminal(T::Plus), &source[3..4]),
            tok(TokenKind::Terminal(T::Num), &source[4..5]),
            tok(TokenKind::Terminal(T::Eof), &source[5..5]),
        ];
        let out = parse(source, &tokens, &g, &table, Log::None);
        assert!(out.is_ok(), "{}", out.errors);
        let leaves = out.root.leaves();
        assert_eq!(leaves.len(), 6);
    }

    #[test]
    fn mismatch_is_reported_with_position() {
        let g = grammar();
        let table = g.parse_table().unwrap();
        let source = "1+";
        let tokens = vec![
            tok(TokenKind::Terminal(T::Num), &source[0..1]),
            tok(TokenKind::Terminal(T::Plus), &source[1..2]),
            tok(TokenKind::Terminal(T::Eof), &source[2..2]),
        ];
        let out = parse(source, &tokens, &g, &table, Log::None);
        assert!(!out.is_ok());
        assert!(out.errors.contains("expected Num"));
    }
}
