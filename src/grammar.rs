//! Grammar model: productions, FIRST/FOLLOW computation, and LL(1) parse
//! table construction with conflict detection, per spec.md §4.3.

use crate::error::GrammarError;
use crate::token::Terminal;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// A grammar-side nonterminal enum implements this; `start` identifies the
/// grammar's single start symbol.
pub trait NonTerminal: Copy + Debug + Eq + Hash + Ord {}
impl<N: Copy + Debug + Eq + Hash + Ord> NonTerminal for N {}

/// A symbol on the right-hand side of a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol<N, T> {
    Terminal(T),
    NonTerminal(N),
    /// The empty production. Invariant: only valid as the sole rhs symbol.
    Eps,
}

/// `lhs -> rhs`, identified by its index in `Grammar::productions`.
#[derive(Debug, Clone)]
pub struct Production<N, T> {
    pub lhs: N,
    pub rhs: Vec<Symbol<N, T>>,
}

impl<N, T> Production<N, T> {
    pub fn new(lhs: N, rhs: Vec<Symbol<N, T>>) -> Self {
        Self { lhs, rhs }
    }

    pub fn is_eps(&self) -> bool {
        matches!(self.rhs.as_slice(), [Symbol::Eps])
    }
}

/// A mapping from `(nonterminal, terminal)` to the production index to
/// expand. At most one production may occupy any cell.
pub type ParseTable<N, T> = HashMap<(N, T), usize>;

/// A production list plus a start symbol; derives FIRST/FOLLOW and the
/// LL(1) parse table.
pub struct Grammar<N, T> {
    pub productions: Vec<Production<N, T>>,
    pub start: N,
}

impl<N: NonTerminal, T: Terminal> Grammar<N, T> {
    pub fn new(start: N, productions: Vec<Production<N, T>>) -> Self {
        Self { productions, start }
    }

    fn nonterminals(&self) -> Vec<N> {
        let mut seen = Vec::new();
        for p in &self.productions {
            if !seen.contains(&p.lhs) {
                seen.push(p.lhs);
            }
        }
        seen
    }

    /// FIRST(X) for every nonterminal X, plus whether X is nullable (FIRST
    /// contains eps), computed by fixed-point iteration per spec.md §4.3.
    pub fn first_sets(&self) -> (HashMap<N, HashSet<T>>, HashMap<N, bool>) {
        let nonterminals = self.nonterminals();
        let mut first: HashMap<N, HashSet<T>> = nonterminals.iter().map(|n| (*n, HashSet::new())).collect();
        let mut nullable: HashMap<N, bool> = nonterminals.iter().map(|n| (*n, false)).collect();

        let mut changed = true;
        while changed {
            changed = false;
            for p in &self.productions {
                if p.is_eps() {
                    if !nullable[&p.lhs] {
                        nullable.insert(p.lhs, true);
                        changed = true;
                    }
                    continue;
                }

                let mut all_prior_nullable = true;
                for sym in &p.rhs {
                    match sym {
                        Symbol::Terminal(t) => {
                            let set = first.get_mut(&p.lhs).unwrap();
                            if set.insert(*t) {
                                changed = true;
                            }
                            all_prior_nullable = false;
                            break;
                        }
                        Symbol::NonTerminal(n) => {
                            let addition: Vec<T> = first[n].iter().copied().collect();
                            let set = first.get_mut(&p.lhs).unwrap();
                            for t in addition {
                                if set.insert(t) {
                                    changed = true;
                                }
                            }
                            if !nullable[n] {
                                all_prior_nullable = false;
                                break;
                            }
                        }
                        Symbol::Eps => unreachable!("eps only valid as sole rhs symbol"),
                    }
                }
                if all_prior_nullable && !nullable[&p.lhs] {
                    nullable.insert(p.lhs, true);
                    changed = true;
                }
            }
        }

        (first, nullable)
    }

    fn first_of_sequence(
        &self,
        seq: &[Symbol<N, T>],
        first: &HashMap<N, HashSet<T>>,
        nullable: &HashMap<N, bool>,
    ) -> (HashSet<T>, bool) {
        let mut result = HashSet::new();
        let mut seq_nullable = true;
        for sym in seq {
            match sym {
                Symbol::Terminal(t) => {
                    result.insert(*t);
                    seq_nullable = false;
                    break;
                }
                Symbol::NonTerminal(n) => {
                    result.extend(first[n].iter().copied());
                    if !nullable[n] {
                        seq_nullable = false;
                        break;
                    }
                }
                Symbol::Eps => {}
            }
        }
        (result, seq_nullable)
    }

    /// FOLLOW(A) for every nonterminal, computed by fixed-point iteration
    /// per spec.md §4.3.
    pub fn follow_sets(
        &self,
        first: &HashMap<N, HashSet<T>>,
        nullable: &HashMap<N, bool>,
    ) -> HashMap<N, HashSet<T>> {
        let nonterminals = self.nonterminals();
        let mut follow: HashMap<N, HashSet<T>> = nonterminals.iter().map(|n| (*n, HashSet::new())).collect();
        follow.get_mut(&self.start).unwrap().insert(T::eof());

        let mut changed = true;
        while changed {
            changed = false;
            for p in &self.productions {
                for (i, sym) in p.rhs.iter().enumerate() {
                    let Symbol::NonTerminal(a) = sym else { continue };
                    let beta = &p.rhs[i + 1..];
                    let (first_beta, beta_nullable) = self.first_of_sequence(beta, first, nullable);

                    let entry = follow.get_mut(a).unwrap();
                    for t in &first_beta {
                        if entry.insert(*t) {
                            changed = true;
                        }
                    }
                    if beta_nullable {
                        let follow_lhs: Vec<T> = follow[&p.lhs].iter().copied().collect();
                        let entry = follow.get_mut(a).unwrap();
                        for t in follow_lhs {
                            if entry.insert(t) {
                                changed = true;
                            }
                        }
                    }
                }
            }
        }

        follow
    }

    /// Build the LL(1) parse table, failing on the first cell two
    /// productions both claim.
    pub fn parse_table(&self) -> Result<ParseTable<N, T>, GrammarError> {
        let (first, nullable) = self.first_sets();
        let follow = self.follow_sets(&first, &nullable);

        let mut table: ParseTable<N, T> = HashMap::new();

        for (index, p) in self.productions.iter().enumerate() {
            if p.is_eps() {
                for t in &follow[&p.lhs] {
                    insert_cell(&mut table, p.lhs, *t, index, &self.productions)?;
                }
                continue;
            }

            let (first_rhs, rhs_nullable) = self.first_of_sequence(&p.rhs, &first, &nullable);
            for t in &first_rhs {
                insert_cell(&mut table, p.lhs, *t, index, &self.productions)?;
            }
            if rhs_nullable {
                for t in &follow[&p.lhs] {
                    insert_cell(&mut table, p.lhs, *t, index, &self.productions)?;
                }
            }
        }

        Ok(table)
    }
}

fn insert_cell<N: NonTerminal, T: Terminal>(
    table: &mut ParseTable<N, T>,
    lhs: N,
    terminal: T,
    index: usize,
    productions: &[Production<N, T>],
) -> Result<(), GrammarError> {
    match table.get(&(lhs, terminal)) {
        Some(existing) if *existing != index => Err(GrammarError::Conflict {
            lhs: format!("{:?}", lhs),
            terminal: format!("{:?}", terminal),
            first: *existing,
            second: index,
        }),
        _ => {
            table.insert((lhs, terminal), index);
            let _ = productions;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    enum N {
        Expr,
        ExprTail,
        Term,
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
        // expr -> term expr_tail
        // expr_tail -> PLUS term expr_tail | eps
        // term -> NUM
        Grammar::new(
            N::Expr,
            vec![
                Production::new(
                    N::Expr,
                    vec![Symbol::NonTerminal(N::Term), Symbol::NonTerminal(N::ExprTail)],
                ),
                Production::new(
                    N::ExprTail,
                    vec![
                        Symbol::Terminal(T::Plus),
                        Symbol::NonTerminal(N::Term),
                        Symbol::NonTerminal(N::ExprTail),
                    ],
                ),
                Production::new(N::ExprTail, vec![Symbol::Eps]),
                Production::new(N::Term, vec![Symbol::Terminal(T::Num)]),
            ],
        )
    }

    #[test]
    fn builds_conflict_free_table() {
        let g = grammar();
        let table = g.parse_table().unwrap();
        assert_eq!(table[&(N::Expr, T::Num)], 0);
        assert_eq!(table[&(N::ExprTail, T::Plus)], 1);
        assert_eq!(table[&(N::ExprTail, T::Eof)], 2);
        assert_eq!(table[&(N::Term, T::Num)], 3);
    }

    #[test]
    fn left_recursion_is_reported_as_conflict() {
        // expr -> expr PLUS term | term
        let g = Grammar::new(
            N::Expr,
            vec![
                Production::new(
                    N::Expr,
                    vec![
                        Symbol::NonTerminal(N::Expr),
                        Symbol::Terminal(T::Plus),
                        Symbol::NonTerminal(N::Term),
                    ],
                ),
                Production::new(N::Expr, vec![Symbol::NonTerminal(N::Term)]),
                Production::new(N::Term, vec![Symbol::Terminal(T::Num)]),
            ],
        );
        let err = g.parse_table().unwrap_err();
        assert!(matches!(err, GrammarError::Conflict { .. }));
    }
}
