//! AST visitor: dispatches per-nonterminal transform rules over a concrete
//! parse tree, threading an inherited attribute down right-recursive tails
//! so they fold into left-associative AST shapes, per spec.md §4.5.
//!
//! Rule shapes ported from `original_source/EfficientCompiler/RegexParser_ast.cpp`
//! (`terms_continue_parser`, `factors_continue_parser`, `class_mid_parser`,
//! `class_end_parser`), which is the original's worked example of exactly
//! this inherited-attribute right-tail-fold technique.

use crate::parse_tree::ParseNode;
use crate::token::Terminal;
use ptree::TreeItem;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Debug;

/// A compact AST node: a label plus a freely mutable child list (transforms
/// may add, remove, reorder, or flatten children to reshape the tree).
#[derive(Debug, Clone)]
pub struct AstNode<V> {
    pub value: V,
    pub children: Vec<AstNode<V>>,
}

impl<V> AstNode<V> {
    pub fn leaf(value: V) -> Self {
        Self {
            value,
            children: Vec::new(),
        }
    }

    pub fn new(value: V, children: Vec<AstNode<V>>) -> Self {
        Self { value, children }
    }
}

impl<V: Debug + Clone> TreeItem for AstNode<V> {
    type Child = Self;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _: &ptree::Style) -> std::io::Result<()> {
        use std::io::Write as _;
        write!(f, "{:?}", self.value)
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::from(&self.children)
    }
}

/// One nonterminal's transform: receives the visitor (to recurse into
/// children), the parse-tree node being converted, and the inherited AST
/// subtree threaded down a right-recursive tail (`None` at the top of a
/// fresh derivation).
pub type TransformRule<N, T, V> =
    fn(&Visitor<N, T, V>, &mut ParseNode<N, T>, Option<AstNode<V>>) -> AstNode<V>;

/// A table from nonterminal to transform rule, dispatching the conversion
/// of a parse tree into an AST.
pub struct Visitor<N, T: Terminal, V> {
    rules: HashMap<N, TransformRule<N, T, V>>,
}

impl<N, T, V> Visitor<N, T, V>
where
    N: Copy + Debug + Eq + std::hash::Hash,
    T: Terminal,
{
    pub fn new(rules: HashMap<N, TransformRule<N, T, V>>) -> Self {
        Self { rules }
    }

    /// Convert `node` (a nonterminal node, or a terminal the caller already
    /// knows how to promote) into an AST node.
    pub fn convert(&self, node: &mut ParseNode<N, T>, inherited: Option<AstNode<V>>) -> AstNode<V> {
        match node {
            ParseNode::NonTerminal { symbol, .. } => {
                let rule = *self
                    .rules
                    .get(symbol)
                    .unwrap_or_else(|| panic!("no transform rule registered for {:?}", symbol));
                rule(self, node, inherited)
            }
            ParseNode::Terminal(_) => {
                panic!("convert() called directly on a terminal leaf; use a leaf-promote rule")
            }
            ParseNode::Taken => panic!("convert() called on an already-extracted slot"),
        }
    }
}

/// Delegate to the single meaningful child at `child_index`.
pub fn pass_through<N, T, V>(
    visitor: &Visitor<N, T, V>,
    node: &mut ParseNode<N, T>,
    child_index: usize,
) -> AstNode<V>
where
    N: Copy + Debug + Eq + std::hash::Hash,
    T: Terminal,
{
    let mut child = node.take_child(child_index);
    visitor.convert(&mut child, None)
}

/// Wrap a single terminal leaf into an AST leaf via `map`.
pub fn leaf_promote<N, T, V>(
    node: &mut ParseNode<N, T>,
    child_index: usize,
    map: impl FnOnce(&crate::token::Token<T>) -> V,
) -> AstNode<V>
where
    N: Debug,
    T: Terminal,
{
    let child = node.take_child(child_index);
    let token = child.as_token().expect("leaf_promote expects a terminal child");
    AstNode::leaf(map(token))
}

/// `X -> op Y X'`: build a node labeled by `op_from(op_token)`, with the
/// inherited subtree as its left child and `Y`'s conversion as its right
/// child, then recurse into `X'` with the new node as the inherited
/// attribute. On ε (`X' -> eps`, i.e. zero children), return the inherited
/// attribute unchanged. If the inherited node already carries the same
/// label (as judged by `same_op`), append to it instead of nesting, which
/// is what produces the n-ary flat nodes spec.md §4.5 calls for.
pub fn right_tail_fold<N, T, V>(
    visitor: &Visitor<N, T, V>,
    node: &mut ParseNode<N, T>,
    inherited: Option<AstNode<V>>,
    op_child_index: usize,
    operand_child_index: usize,
    tail_child_index: usize,
    op_from: impl FnOnce(&crate::token::Token<T>) -> V,
    same_op: impl FnOnce(&V, &V) -> bool,
) -> AstNode<V>
where
    N: Copy + Debug + Eq + std::hash::Hash,
    T: Terminal,
{
    if node.child_count() == 0 {
        return inherited.expect("right_tail_fold's eps branch requires an inherited attribute");
    }

    let inherited = inherited.expect("right_tail_fold requires an inherited attribute");
    let op_token = {
        let op_child = node.take_child(op_child_index);
        *op_child.as_token().expect("op child must be a terminal leaf")
    };
    let operand = {
        let mut operand_child = node.take_child(operand_child_index);
        visitor.convert(&mut operand_child, None)
    };

    let mut root = if same_op(&inherited.value, &op_from(&op_token)) {
        inherited
    } else {
        AstNode::new(op_from(&op_token), vec![inherited])
    };
    root.children.push(operand);

    let mut tail = node.take_child(tail_child_index);
    visitor.convert(&mut tail, Some(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenKind};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    enum N {
        Expr,
        ExprTail,
        Num,
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
    #[derive(Debug, Clone, PartialEq)]
    enum V {
        Plus,
        Num(i64),
    }

    fn num_rule(_v: &Visitor<N, T, V>, node: &mut ParseNode<N, T>, _: Option<AstNode<V>>) -> AstNode<V> {
        leaf_promote(node, 0, |tok| V::Num(tok.lexeme.parse().unwrap()))
    }

    fn expr_rule(visitor: &Visitor<N, T, V>, node: &mut ParseNode<N, T>, _: Option<AstNode<V>>) -> AstNode<V> {
        let first = pass_through(visitor, node, 0);
        let mut tail = node.take_child(1);
        visitor.convert(&mut tail, Some(first))
    }

    fn expr_tail_rule(
        visitor: &Visitor<N, T, V>,
        node: &mut ParseNode<N, T>,
        inherited: Option<AstNode<V>>,
    ) -> AstNode<V> {
        right_tail_fold(
            visitor,
            node,
            inherited,
            0,
            1,
            2,
            |_tok| V::Plus,
            |a, b| matches!(a, V::Plus) && matches!(b, V::Plus),
        )
    }

    fn tok(kind: TokenKind<T>, lexeme: &'static str) -> Token<'static, T> {
        Token::new(kind, lexeme, 1)
    }

    fn num_node(lexeme: &'static str) -> ParseNode<'static, N, T> {
        ParseNode::node(N::Num, vec![ParseNode::leaf(tok(TokenKind::Terminal(T::Num), lexeme))])
    }

    #[test]
    fn three_term_sum_folds_to_flat_plus_node() {
        // expr -> NUM(1) expr_tail
        // expr_tail -> PLUS NUM(2) expr_tail
        // expr_tail -> PLUS NUM(4) expr_tail
        // expr_tail -> eps
        let mut tree: ParseNode<N, T> = ParseNode::node(
            N::Expr,
            vec![
                num_node("1"),
                ParseNode::node(
                    N::ExprTail,
                    vec![
                        ParseNode::leaf(tok(TokenKind::Terminal(T::Plus), "+")),
                        num_node("2"),
                        ParseNode::node(
                            N::ExprTail,
                            vec![
                                ParseNode::leaf(tok(TokenKind::Terminal(T::Plus), "+")),
                                num_node("4"),
                                ParseNode::node(N::ExprTail, Vec::new()),
                            ],
                        ),
                    ],
                ),
            ],
        );

        let mut rules: HashMap<N, TransformRule<N, T, V>> = HashMap::new();
        rules.insert(N::Expr, expr_rule);
        rules.insert(N::ExprTail, expr_tail_rule);
        rules.insert(N::Num, num_rule);
        let visitor = Visitor::new(rules);

        let ast = visitor.convert(&mut tree, None);

        assert_eq!(ast.value, V::Plus);
        assert_eq!(ast.children.len(), 3);
        assert_eq!(ast.children[0].value, V::Num(1));
        assert_eq!(ast.children[1].value, V::Num(2));
        assert_eq!(ast.children[2].value, V::Num(4));
    }
}
