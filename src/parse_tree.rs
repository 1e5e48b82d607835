//! Concrete parse tree produced by the LL(1) driver.
//!
//! A node owns its children; `take_child` transfers one out, leaving a
//! `Taken` tombstone behind so sibling indices stay stable across repeated
//! extraction (the AST visitor addresses children by fixed index, per
//! spec.md §9's design note — mirrored from the teacher's `ASTNode`/
//! `SuccessData` ownership shape).

use crate::token::{Terminal, Token};
use ptree::TreeItem;
use std::borrow::Cow;
use std::fmt::Debug;
use std::io::Write as _;

#[derive(Debug, Clone)]
pub enum ParseNode<'src, N, T: Terminal> {
    Terminal(Token<'src, T>),
    NonTerminal { symbol: N, children: Vec<ParseNode<'src, N, T>> },
    /// The slot a child previously occupied, after `take_child` extracted it.
    Taken,
}

impl<'src, N: Debug, T: Terminal> ParseNode<'src, N, T> {
    pub fn leaf(token: Token<'src, T>) -> Self {
        ParseNode::Terminal(token)
    }

    pub fn node(symbol: N, children: Vec<ParseNode<'src, N, T>>) -> Self {
        ParseNode::NonTerminal { symbol, children }
    }

    pub fn child_count(&self) -> usize {
        match self {
            ParseNode::NonTerminal { children, .. } => children.len(),
            _ => 0,
        }
    }

    /// Extract the child at `index`, leaving a tombstone. Panics if the
    /// slot was already taken or this node has no such child — both are
    /// grammar-construction bugs, not runtime input errors.
    pub fn take_child(&mut self, index: usize) -> ParseNode<'src, N, T> {
        match self {
            ParseNode::NonTerminal { children, .. } => {
                std::mem::replace(&mut children[index], ParseNode::Taken)
            }
            _ => panic!("take_child called on a node with no children"),
        }
    }

    pub fn as_token(&self) -> Option<&Token<'src, T>> {
        match self {
            ParseNode::Terminal(t) => Some(t),
            _ => None,
        }
    }

    /// Leaves of the tree, left to right, skipping ε-nodes (nonterminals
    /// with no children) and tombstones — used to check spec.md §8's
    /// invariant 6 against the token stream.
    pub fn leaves(&self) -> Vec<&Token<'src, T>> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Token<'src, T>>) {
        match self {
            ParseNode::Terminal(t) => out.push(t),
            ParseNode::NonTerminal { children, .. } => {
                for c in children {
                    c.collect_leaves(out);
                }
            }
            ParseNode::Taken => {}
        }
    }
}

impl<'src, N: Debug + Clone, T: Terminal> TreeItem for ParseNode<'src, N, T> {
    type Child = Self;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _: &ptree::Style) -> std::io::Result<()> {
        match self {
            ParseNode::Terminal(t) => write!(f, "{:?} {:?}", t.kind, t.lexeme),
            ParseNode::NonTerminal { symbol, .. } => write!(f, "{:?}", symbol),
            ParseNode::Taken => write!(f, "<taken>"),
        }
    }

    fn children(&self) -> Cow<[Self::Child]> {
        match self {
            ParseNode::NonTerminal { children, .. } => Cow::from(children),
            _ => Cow::from(Vec::new()),
        }
    }
}
