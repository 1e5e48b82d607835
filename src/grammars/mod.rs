//! Concrete grammar registries: each submodule instantiates the table-driven
//! lexer, LL(1) grammar, and AST rules over its own terminal/nonterminal
//! enums, per spec.md §8's worked scenarios.

pub mod arithmetic;
pub mod jack;
pub mod json;
pub mod regex;
