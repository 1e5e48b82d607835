//! A compile-time-configurable compiler front-end toolkit: a table-driven
//! DFA lexer, an LL(1) parse-table generator with conflict detection, a
//! predictive parser, a parse-tree-to-AST visitor, and a Thompson-
//! construction regex-to-NFA pass.
//!
//! # Design
//!
//! Each stage is data, not code generation: a `Dfa` is built from a plain
//! list of [`dfa::TransitionInfo`]/[`dfa::FinalStateInfo`] descriptors, a
//! `Grammar` is built from a plain list of [`grammar::Production`]s, and an
//! AST `Visitor` is built from a `HashMap` of per-nonterminal transform
//! functions. A concrete language is then just one module that assembles
//! these pieces over its own terminal/nonterminal enums — see
//! [`grammars::arithmetic`], [`grammars::json`], [`grammars::jack`], and
//! [`grammars::regex`] for four worked instantiations, the last of which
//! additionally lowers its AST to an NFA via [`nfa`].
//!
//! # Example
//!
//! ```
//! use frontend_toolkit::grammars::arithmetic;
//!
//! let mut output = arithmetic::parse("1 + 2 + 4");
//! assert!(output.is_ok());
//! let ast = arithmetic::to_ast(&mut output.root);
//! assert_eq!(arithmetic::eval(&ast), 7);
//! ```

pub mod ast;
pub mod dfa;
pub mod error;
pub mod grammar;
pub mod grammars;
pub mod lexer;
pub mod logger;
pub mod nfa;
pub mod parse_tree;
pub mod parser;
pub mod position;
pub mod token;
