//! A minimal Jack-like grammar (class declaration, field/local variable
//! declarations, subroutines, the five statement forms, and a flat
//! expression grammar with unary/binary operators, array indexing and
//! subroutine calls) — the Nand2Tetris-style language the original
//! toolkit's domain targets, scoped down to what spec.md §8's worked
//! example (`class Foo { function void main() { return; } }`) and a
//! handful of richer programs need.

use crate::ast::{pass_through, right_tail_fold, AstNode, TransformRule, Visitor};
use crate::dfa::{Dfa, FinalStateInfo, TransitionInfo};
use crate::grammar::{Grammar, Production, Symbol};
use crate::lexer::{KeywordInfo, LexerSpec};
use crate::logger::Log;
use crate::parse_tree::ParseNode;
use crate::parser::{self, ParseOutput};
use crate::token::{Terminal, Token, TokenKind};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum T {
    Class,
    Static,
    Field,
    Constructor,
    Function,
    Method,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    NullLit,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
    Ident,
    IntConst,
    StringConst,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Dot,
    Eq,
    Plus,
    Minus,
    Star,
    Slash,
    Amp,
    Pipe,
    Lt,
    Gt,
    Not,
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
    JackClass,
    ClassVarDecs,
    ClassVarDec,
    VarNameTail,
    Type,
    ReturnType,
    SubroutineDecs,
    SubroutineDec,
    ParamList,
    ParamListTail,
    SubroutineBody,
    VarDecs,
    VarDec,
    Statements,
    Statement,
    LetStatement,
    LetIndex,
    IfStatement,
    ElseClause,
    WhileStatement,
    DoStatement,
    ReturnStatement,
    ReturnValue,
    SubroutineCall,
    CallTail,
    ExprList,
    ExprListTail,
    Expression,
    ExprContinue,
    Term,
    TermTail,
}

/// States: 0 start; 1-19 single-byte punctuation/operators; 20 SPACE; 21
/// identifier run (alpha/underscore start, alnum/underscore continue,
/// keyword-reclassified); 22 integer-constant run; 23 string body (not
/// final, no escapes — Jack string constants can't contain `"` or a
/// newline at all); 24 string done.
fn dfa() -> Dfa<T> {
    let digits = "0123456789";
    let alpha_us = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";
    let alnum_us = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_0123456789";

    Dfa::build(
        &[
            TransitionInfo::new(0, 1, "{"),
            TransitionInfo::new(0, 2, "}"),
            TransitionInfo::new(0, 3, "("),
            TransitionInfo::new(0, 4, ")"),
            TransitionInfo::new(0, 5, "["),
            TransitionInfo::new(0, 6, "]"),
            TransitionInfo::new(0, 7, ","),
            TransitionInfo::new(0, 8, ";"),
            TransitionInfo::new(0, 9, "."),
            TransitionInfo::new(0, 10, "="),
            TransitionInfo::new(0, 11, "+"),
            TransitionInfo::new(0, 12, "-"),
            TransitionInfo::new(0, 13, "*"),
            TransitionInfo::new(0, 14, "/"),
            TransitionInfo::new(0, 15, "&"),
            TransitionInfo::new(0, 16, "|"),
            TransitionInfo::new(0, 17, "<"),
            TransitionInfo::new(0, 18, ">"),
            TransitionInfo::new(0, 19, "~"),
            TransitionInfo::new(0, 20, " \t\n\r"),
            TransitionInfo::new(20, 20, " \t\n\r"),
            TransitionInfo::new(0, 21, alpha_us),
            TransitionInfo::new(21, 21, alnum_us),
            TransitionInfo::new(0, 22, digits),
            TransitionInfo::new(22, 22, digits),
            TransitionInfo::new(0, 23, "\""),
            TransitionInfo::with_default(23, 23, "", 23),
            TransitionInfo::new(23, 24, "\""),
        ],
        &[
            FinalStateInfo::new(1, T::LBrace),
            FinalStateInfo::new(2, T::RBrace),
            FinalStateInfo::new(3, T::LParen),
            FinalStateInfo::new(4, T::RParen),
            FinalStateInfo::new(5, T::LBracket),
            FinalStateInfo::new(6, T::RBracket),
            FinalStateInfo::new(7, T::Comma),
            FinalStateInfo::new(8, T::Semi),
            FinalStateInfo::new(9, T::Dot),
            FinalStateInfo::new(10, T::Eq),
            FinalStateInfo::new(11, T::Plus),
            FinalStateInfo::new(12, T::Minus),
            FinalStateInfo::new(13, T::Star),
            FinalStateInfo::new(14, T::Slash),
            FinalStateInfo::new(15, T::Amp),
            FinalStateInfo::new(16, T::Pipe),
            FinalStateInfo::new(17, T::Lt),
            FinalStateInfo::new(18, T::Gt),
            FinalStateInfo::new(19, T::Not),
            FinalStateInfo::new(20, T::Space),
            FinalStateInfo::new(21, T::Ident),
            FinalStateInfo::new(22, T::IntConst),
            FinalStateInfo::new(24, T::StringConst),
        ],
    )
    .expect("Jack DFA is hand-verified conflict-free")
}

pub fn lexer_spec() -> LexerSpec<T> {
    LexerSpec::new(dfa())
        .with_identifier_terminal(T::Ident)
        .with_keywords(&[
            KeywordInfo::new("class", T::Class),
            KeywordInfo::new("static", T::Static),
            KeywordInfo::new("field", T::Field),
            KeywordInfo::new("constructor", T::Constructor),
            KeywordInfo::new("function", T::Function),
            KeywordInfo::new("method", T::Method),
            KeywordInfo::new("var", T::Var),
            KeywordInfo::new("int", T::Int),
            KeywordInfo::new("char", T::Char),
            KeywordInfo::new("boolean", T::Boolean),
            KeywordInfo::new("void", T::Void),
            KeywordInfo::new("true", T::True),
            KeywordInfo::new("false", T::False),
            KeywordInfo::new("null", T::NullLit),
            KeywordInfo::new("this", T::This),
            KeywordInfo::new("let", T::Let),
            KeywordInfo::new("do", T::Do),
            KeywordInfo::new("if", T::If),
            KeywordInfo::new("else", T::Else),
            KeywordInfo::new("while", T::While),
            KeywordInfo::new("return", T::Return),
        ])
}

fn grammar() -> Grammar<N, T> {
    use Symbol::{Eps, NonTerminal as NT, Terminal as Tm};
    Grammar::new(
        N::JackClass,
        vec![
            // 0: jack_class -> CLASS IDENT LBRACE class_var_decs subroutine_decs RBRACE
            Production::new(
                N::JackClass,
                vec![
                    Tm(T::Class),
                    Tm(T::Ident),
                    Tm(T::LBrace),
                    NT(N::ClassVarDecs),
                    NT(N::SubroutineDecs),
                    Tm(T::RBrace),
                ],
            ),
            // 1: class_var_decs -> class_var_dec class_var_decs
            Production::new(N::ClassVarDecs, vec![NT(N::ClassVarDec), NT(N::ClassVarDecs)]),
            // 2: class_var_decs -> eps
            Production::new(N::ClassVarDecs, vec![Eps]),
            // 3: class_var_dec -> STATIC type IDENT var_name_tail SEMI
            Production::new(
                N::ClassVarDec,
                vec![Tm(T::Static), NT(N::Type), Tm(T::Ident), NT(N::VarNameTail), Tm(T::Semi)],
            ),
            // 4: class_var_dec -> FIELD type IDENT var_name_tail SEMI
            Production::new(
                N::ClassVarDec,
                vec![Tm(T::Field), NT(N::Type), Tm(T::Ident), NT(N::VarNameTail), Tm(T::Semi)],
            ),
            // 5: var_name_tail -> COMMA IDENT var_name_tail
            Production::new(N::VarNameTail, vec![Tm(T::Comma), Tm(T::Ident), NT(N::VarNameTail)]),
            // 6: var_name_tail -> eps
            Production::new(N::VarNameTail, vec![Eps]),
            // 7: type -> INT
            Production::new(N::Type, vec![Tm(T::Int)]),
            // 8: type -> CHAR
            Production::new(N::Type, vec![Tm(T::Char)]),
            // 9: type -> BOOLEAN
            Production::new(N::Type, vec![Tm(T::Boolean)]),
            // 10: type -> IDENT
            Production::new(N::Type, vec![Tm(T::Ident)]),
            // 11: return_type -> VOID
            Production::new(N::ReturnType, vec![Tm(T::Void)]),
            // 12: return_type -> type
            Production::new(N::ReturnType, vec![NT(N::Type)]),
            // 13: subroutine_decs -> subroutine_dec subroutine_decs
            Production::new(N::SubroutineDecs, vec![NT(N::SubroutineDec), NT(N::SubroutineDecs)]),
            // 14: subroutine_decs -> eps
            Production::new(N::SubroutineDecs, vec![Eps]),
            // 15: subroutine_dec -> CONSTRUCTOR return_type IDENT LPAREN param_list RPAREN subroutine_body
            Production::new(
                N::SubroutineDec,
                vec![
                    Tm(T::Constructor),
                    NT(N::ReturnType),
                    Tm(T::Ident),
                    Tm(T::LParen),
                    NT(N::ParamList),
                    Tm(T::RParen),
                    NT(N::SubroutineBody),
                ],
            ),
            // 16: subroutine_dec -> FUNCTION return_type IDENT LPAREN param_list RPAREN subroutine_body
            Production::new(
                N::SubroutineDec,
                vec![
                    Tm(T::Function),
                    NT(N::ReturnType),
                    Tm(T::Ident),
                    Tm(T::LParen),
                    NT(N::ParamList),
                    Tm(T::RParen),
                    NT(N::SubroutineBody),
                ],
            ),
            // 17: subroutine_dec -> METHOD return_type IDENT LPAREN param_list RPAREN subroutine_body
            Production::new(
                N::SubroutineDec,
                vec![
                    Tm(T::Method),
                    NT(N::ReturnType),
                    Tm(T::Ident),
                    Tm(T::LParen),
                    NT(N::ParamList),
                    Tm(T::RParen),
                    NT(N::SubroutineBody),
                ],
            ),
            // 18: param_list -> type IDENT param_list_tail
            Production::new(N::ParamList, vec![NT(N::Type), Tm(T::Ident), NT(N::ParamListTail)]),
            // 19: param_list -> eps
            Production::new(N::ParamList, vec![Eps]),
            // 20: param_list_tail -> COMMA type IDENT param_list_tail
            Production::new(
                N::ParamListTail,
                vec![Tm(T::Comma), NT(N::Type), Tm(T::Ident), NT(N::ParamListTail)],
            ),
            // 21: param_list_tail -> eps
            Production::new(N::ParamListTail, vec![Eps]),
            // 22: subroutine_body -> LBRACE var_decs statements RBRACE
            Production::new(
                N::SubroutineBody,
                vec![Tm(T::LBrace), NT(N::VarDecs), NT(N::Statements), Tm(T::RBrace)],
            ),
            // 23: var_decs -> var_dec var_decs
            Production::new(N::VarDecs, vec![NT(N::VarDec), NT(N::VarDecs)]),
            // 24: var_decs -> eps
            Production::new(N::VarDecs, vec![Eps]),
            // 25: var_dec -> VAR type IDENT var_name_tail SEMI
            Production::new(
                N::VarDec,
                vec![Tm(T::Var), NT(N::Type), Tm(T::Ident), NT(N::VarNameTail), Tm(T::Semi)],
            ),
            // 26: statements -> statement statements
            Production::new(N::Statements, vec![NT(N::Statement), NT(N::Statements)]),
            // 27: statements -> eps
            Production::new(N::Statements, vec![Eps]),
            // 28: statement -> let_statement
            Production::new(N::Statement, vec![NT(N::LetStatement)]),
            // 29: statement -> if_statement
            Production::new(N::Statement, vec![NT(N::IfStatement)]),
            // 30: statement -> while_statement
            Production::new(N::Statement, vec![NT(N::WhileStatement)]),
            // 31: statement -> do_statement
            Production::new(N::Statement, vec![NT(N::DoStatement)]),
            // 32: statement -> return_statement
            Production::new(N::Statement, vec![NT(N::ReturnStatement)]),
            // 33: let_statement -> LET IDENT let_index EQ expression SEMI
            Production::new(
                N::LetStatement,
                vec![Tm(T::Let), Tm(T::Ident), NT(N::LetIndex), Tm(T::Eq), NT(N::Expression), Tm(T::Semi)],
            ),
            // 34: let_index -> LBRACKET expression RBRACKET
            Production::new(N::LetIndex, vec![Tm(T::LBracket), NT(N::Expression), Tm(T::RBracket)]),
            // 35: let_index -> eps
            Production::new(N::LetIndex, vec![Eps]),
            // 36: if_statement -> IF LPAREN expression RPAREN LBRACE statements RBRACE else_clause
            Production::new(
                N::IfStatement,
                vec![
                    Tm(T::If),
                    Tm(T::LParen),
                    NT(N::Expression),
                    Tm(T::RParen),
                    Tm(T::LBrace),
                    NT(N::Statements),
                    Tm(T::RBrace),
                    NT(N::ElseClause),
                ],
            ),
            // 37: else_clause -> ELSE LBRACE statements RBRACE
            Production::new(
                N::ElseClause,
                vec![Tm(T::Else), Tm(T::LBrace), NT(N::Statements), Tm(T::RBrace)],
            ),
            // 38: else_clause -> eps
            Production::new(N::ElseClause, vec![Eps]),
            // 39: while_statement -> WHILE LPAREN expression RPAREN LBRACE statements RBRACE
            Production::new(
                N::WhileStatement,
                vec![
                    Tm(T::While),
                    Tm(T::LParen),
                    NT(N::Expression),
                    Tm(T::RParen),
                    Tm(T::LBrace),
                    NT(N::Statements),
                    Tm(T::RBrace),
                ],
            ),
            // 40: do_statement -> DO subroutine_call SEMI
            Production::new(N::DoStatement, vec![Tm(T::Do), NT(N::SubroutineCall), Tm(T::Semi)]),
            // 41: return_statement -> RETURN return_value SEMI
            Production::new(N::ReturnStatement, vec![Tm(T::Return), NT(N::ReturnValue), Tm(T::Semi)]),
            // 42: return_value -> expression
            Production::new(N::ReturnValue, vec![NT(N::Expression)]),
            // 43: return_value -> eps
            Production::new(N::ReturnValue, vec![Eps]),
            // 44: subroutine_call -> IDENT call_tail
            Production::new(N::SubroutineCall, vec![Tm(T::Ident), NT(N::CallTail)]),
            // 45: call_tail -> LPAREN expr_list RPAREN
            Production::new(N::CallTail, vec![Tm(T::LParen), NT(N::ExprList), Tm(T::RParen)]),
            // 46: call_tail -> DOT IDENT LPAREN expr_list RPAREN
            Production::new(
                N::CallTail,
                vec![Tm(T::Dot), Tm(T::Ident), Tm(T::LParen), NT(N::ExprList), Tm(T::RParen)],
            ),
            // 47: expr_list -> expression expr_list_tail
            Production::new(N::ExprList, vec![NT(N::Expression), NT(N::ExprListTail)]),
            // 48: expr_list -> eps
            Production::new(N::ExprList, vec![Eps]),
            // 49: expr_list_tail -> COMMA expression expr_list_tail
            Production::new(
                N::ExprListTail,
                vec![Tm(T::Comma), NT(N::Expression), NT(N::ExprListTail)],
            ),
            // 50: expr_list_tail -> eps
            Production::new(N::ExprListTail, vec![Eps]),
            // 51: expression -> term expr_continue
            Production::new(N::Expression, vec![NT(N::Term), NT(N::ExprContinue)]),
            // 52-60: expr_continue -> OP term expr_continue, one per operator
            Production::new(N::ExprContinue, vec![Tm(T::Plus), NT(N::Term), NT(N::ExprContinue)]),
            Production::new(N::ExprContinue, vec![Tm(T::Minus), NT(N::Term), NT(N::ExprContinue)]),
            Production::new(N::ExprContinue, vec![Tm(T::Star), NT(N::Term), NT(N::ExprContinue)]),
            Production::new(N::ExprContinue, vec![Tm(T::Slash), NT(N::Term), NT(N::ExprContinue)]),
            Production::new(N::ExprContinue, vec![Tm(T::Amp), NT(N::Term), NT(N::ExprContinue)]),
            Production::new(N::ExprContinue, vec![Tm(T::Pipe), NT(N::Term), NT(N::ExprContinue)]),
            Production::new(N::ExprContinue, vec![Tm(T::Lt), NT(N::Term), NT(N::ExprContinue)]),
            Production::new(N::ExprContinue, vec![Tm(T::Gt), NT(N::Term), NT(N::ExprContinue)]),
            Production::new(N::ExprContinue, vec![Tm(T::Eq), NT(N::Term), NT(N::ExprContinue)]),
            // 61: expr_continue -> eps
            Production::new(N::ExprContinue, vec![Eps]),
            // 62: term -> INT_CONST
            Production::new(N::Term, vec![Tm(T::IntConst)]),
            // 63: term -> STRING_CONST
            Production::new(N::Term, vec![Tm(T::StringConst)]),
            // 64: term -> TRUE
            Production::new(N::Term, vec![Tm(T::True)]),
            // 65: term -> FALSE
            Production::new(N::Term, vec![Tm(T::False)]),
            // 66: term -> NULL
            Production::new(N::Term, vec![Tm(T::NullLit)]),
            // 67: term -> THIS
            Production::new(N::Term, vec![Tm(T::This)]),
            // 68: term -> LPAREN expression RPAREN
            Production::new(N::Term, vec![Tm(T::LParen), NT(N::Expression), Tm(T::RParen)]),
            // 69: term -> MINUS term
            Production::new(N::Term, vec![Tm(T::Minus), NT(N::Term)]),
            // 70: term -> NOT term
            Production::new(N::Term, vec![Tm(T::Not), NT(N::Term)]),
            // 71: term -> IDENT term_tail
            Production::new(N::Term, vec![Tm(T::Ident), NT(N::TermTail)]),
            // 72: term_tail -> LBRACKET expression RBRACKET
            Production::new(N::TermTail, vec![Tm(T::LBracket), NT(N::Expression), Tm(T::RBracket)]),
            // 73: term_tail -> LPAREN expr_list RPAREN
            Production::new(N::TermTail, vec![Tm(T::LParen), NT(N::ExprList), Tm(T::RParen)]),
            // 74: term_tail -> DOT IDENT LPAREN expr_list RPAREN
            Production::new(
                N::TermTail,
                vec![Tm(T::Dot), Tm(T::Ident), Tm(T::LParen), NT(N::ExprList), Tm(T::RParen)],
            ),
            // 75: term_tail -> eps
            Production::new(N::TermTail, vec![Eps]),
        ],
    )
}

pub fn parse<'src>(source: &'src str) -> ParseOutput<'src, N, T> {
    let spec = lexer_spec();
    let tokens: Vec<Token<'src, T>> = spec.lex(source).collect();
    let grammar = grammar();
    let table = grammar
        .parse_table()
        .expect("Jack grammar is conflict-free by construction");
    parser::parse(source, &tokens, &grammar, &table, Log::None)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Static,
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Class(String),
    ClassVarDecl { scope: Scope, ty: String, name: String },
    Subroutine {
        kind: SubroutineKind,
        return_type: String,
        name: String,
        params: Vec<(String, String)>,
    },
    LocalVarDecl { ty: String, name: String },
    Block,
    Let(String),
    If,
    While,
    Do,
    Return,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Lt,
    Gt,
    Eq,
    Neg,
    Not,
    Num(i64),
    Str(String),
    True,
    False,
    NullLit,
    This,
    Var(String),
    Index(String),
    Call(String),
}

fn rules() -> HashMap<N, TransformRule<N, T, Ast>> {
    let mut rules: HashMap<N, TransformRule<N, T, Ast>> = HashMap::new();

    rules.insert(N::Expression, |visitor, node, _| {
        let first = pass_through(visitor, node, 0);
        let mut tail = node.take_child(1);
        visitor.convert(&mut tail, Some(first))
    });

    rules.insert(N::ExprContinue, |visitor, node, inherited| {
        right_tail_fold(
            visitor,
            node,
            inherited,
            0,
            1,
            2,
            |tok| match tok.kind.as_terminal() {
                Some(T::Plus) => Ast::Add,
                Some(T::Minus) => Ast::Sub,
                Some(T::Star) => Ast::Mul,
                Some(T::Slash) => Ast::Div,
                Some(T::Amp) => Ast::And,
                Some(T::Pipe) => Ast::Or,
                Some(T::Lt) => Ast::Lt,
                Some(T::Gt) => Ast::Gt,
                Some(T::Eq) => Ast::Eq,
                _ => panic!("unexpected binary operator"),
            },
            |a, b| std::mem::discriminant(a) == std::mem::discriminant(b),
        )
    });

    rules.insert(N::Term, |visitor, node, _| match node.child_count() {
        1 => {
            let child = node.take_child(0);
            let tok = *child.as_token().expect("term literal leaf");
            match tok.kind.as_terminal() {
                Some(T::IntConst) => AstNode::leaf(Ast::Num(tok.lexeme.parse().expect("INT_CONST is digits"))),
                Some(T::StringConst) => AstNode::leaf(Ast::Str(string_value(tok.lexeme))),
                Some(T::True) => AstNode::leaf(Ast::True),
                Some(T::False) => AstNode::leaf(Ast::False),
                Some(T::NullLit) => AstNode::leaf(Ast::NullLit),
                Some(T::This) => AstNode::leaf(Ast::This),
                _ => panic!("unexpected term literal terminal"),
            }
        }
        2 => {
            let first = node.take_child(0);
            match first.as_token().map(|t| t.kind) {
                Some(TokenKind::Terminal(T::Minus)) => {
                    let operand = pass_through(visitor, node, 1);
                    AstNode::new(Ast::Neg, vec![operand])
                }
                Some(TokenKind::Terminal(T::Not)) => {
                    let operand = pass_through(visitor, node, 1);
                    AstNode::new(Ast::Not, vec![operand])
                }
                Some(TokenKind::Terminal(T::Ident)) => {
                    let name = first.as_token().unwrap().lexeme.to_string();
                    let mut tail = node.take_child(1);
                    convert_term_tail(visitor, &mut tail, name)
                }
                _ => panic!("unexpected 2-child term shape"),
            }
        }
        3 => pass_through(visitor, node, 1),
        n => panic!("term has unexpected child count {n}"),
    });

    rules
}

fn string_value(lexeme: &str) -> String {
    lexeme[1..lexeme.len() - 1].to_string()
}

fn convert_term_tail<'src>(
    visitor: &Visitor<N, T, Ast>,
    node: &mut ParseNode<'src, N, T>,
    name: String,
) -> AstNode<Ast> {
    match node.child_count() {
        0 => AstNode::leaf(Ast::Var(name)),
        3 => {
            let first = node.take_child(0);
            let is_bracket = matches!(first.as_token().map(|t| t.kind), Some(TokenKind::Terminal(T::LBracket)));
            if is_bracket {
                let mut expr = node.take_child(1);
                let idx = visitor.convert(&mut expr, None);
                AstNode::new(Ast::Index(name), vec![idx])
            } else {
                let mut exprs = node.take_child(1);
                let args = collect_expr_list(visitor, &mut exprs);
                AstNode::new(Ast::Call(name), args)
            }
        }
        5 => {
            let member = node.take_child(1);
            let member_name = member.as_token().unwrap().lexeme.to_string();
            let mut exprs = node.take_child(3);
            let args = collect_expr_list(visitor, &mut exprs);
            AstNode::new(Ast::Call(format!("{}.{}", name, member_name)), args)
        }
        n => panic!("unexpected term_tail shape {n}"),
    }
}

fn collect_expr_list<'src>(visitor: &Visitor<N, T, Ast>, node: &mut ParseNode<'src, N, T>) -> Vec<AstNode<Ast>> {
    if node.child_count() == 0 {
        return Vec::new();
    }
    let mut e = node.take_child(0);
    let first = visitor.convert(&mut e, None);
    let mut tail = node.take_child(1);
    let mut rest = collect_expr_list_tail(visitor, &mut tail);
    let mut out = vec![first];
    out.append(&mut rest);
    out
}

fn collect_expr_list_tail<'src>(
    visitor: &Visitor<N, T, Ast>,
    node: &mut ParseNode<'src, N, T>,
) -> Vec<AstNode<Ast>> {
    if node.child_count() == 0 {
        return Vec::new();
    }
    let mut e = node.take_child(1);
    let first = visitor.convert(&mut e, None);
    let mut tail = node.take_child(2);
    let mut rest = collect_expr_list_tail(visitor, &mut tail);
    let mut out = vec![first];
    out.append(&mut rest);
    out
}

fn convert_subroutine_call<'src>(visitor: &Visitor<N, T, Ast>, node: &mut ParseNode<'src, N, T>) -> AstNode<Ast> {
    let name_tok = node.take_child(0);
    let name = name_tok.as_token().unwrap().lexeme.to_string();
    let mut tail = node.take_child(1);
    match tail.child_count() {
        3 => {
            let mut exprs = tail.take_child(1);
            let args = collect_expr_list(visitor, &mut exprs);
            AstNode::new(Ast::Call(name), args)
        }
        5 => {
            let member = tail.take_child(1);
            let member_name = member.as_token().unwrap().lexeme.to_string();
            let mut exprs = tail.take_child(3);
            let args = collect_expr_list(visitor, &mut exprs);
            AstNode::new(Ast::Call(format!("{}.{}", name, member_name)), args)
        }
        n => panic!("unexpected call_tail shape {n}"),
    }
}

fn collect_statements<'src>(visitor: &Visitor<N, T, Ast>, node: &mut ParseNode<'src, N, T>) -> Vec<AstNode<Ast>> {
    if node.child_count() == 0 {
        return Vec::new();
    }
    let mut stmt = node.take_child(0);
    let first = convert_statement(visitor, &mut stmt);
    let mut tail = node.take_child(1);
    let mut rest = collect_statements(visitor, &mut tail);
    let mut out = vec![first];
    out.append(&mut rest);
    out
}

fn convert_statement<'src>(visitor: &Visitor<N, T, Ast>, node: &mut ParseNode<'src, N, T>) -> AstNode<Ast> {
    let mut child = node.take_child(0);
    let symbol = match &child {
        ParseNode::NonTerminal { symbol, .. } => *symbol,
        _ => panic!("statement's child must be a nonterminal"),
    };
    match symbol {
        N::LetStatement => convert_let(visitor, &mut child),
        N::IfStatement => convert_if(visitor, &mut child),
        N::WhileStatement => convert_while(visitor, &mut child),
        N::DoStatement => convert_do(visitor, &mut child),
        N::ReturnStatement => convert_return(visitor, &mut child),
        other => panic!("unexpected statement variant {:?}", other),
    }
}

fn convert_let<'src>(visitor: &Visitor<N, T, Ast>, node: &mut ParseNode<'src, N, T>) -> AstNode<Ast> {
    let name_tok = node.take_child(1);
    let name = name_tok.as_token().unwrap().lexeme.to_string();
    let mut index_node = node.take_child(2);
    let mut value_node = node.take_child(4);
    let value = visitor.convert(&mut value_node, None);
    if index_node.child_count() == 0 {
        AstNode::new(Ast::Let(name), vec![value])
    } else {
        let mut idx_expr = index_node.take_child(1);
        let idx = visitor.convert(&mut idx_expr, None);
        AstNode::new(Ast::Let(name), vec![idx, value])
    }
}

fn convert_if<'src>(visitor: &Visitor<N, T, Ast>, node: &mut ParseNode<'src, N, T>) -> AstNode<Ast> {
    let mut cond_node = node.take_child(2);
    let cond = visitor.convert(&mut cond_node, None);
    let mut then_stmts = node.take_child(5);
    let then_block = AstNode::new(Ast::Block, collect_statements(visitor, &mut then_stmts));
    let mut else_clause = node.take_child(7);
    let else_block = if else_clause.child_count() == 0 {
        AstNode::new(Ast::Block, Vec::new())
    } else {
        let mut else_stmts = else_clause.take_child(2);
        AstNode::new(Ast::Block, collect_statements(visitor, &mut else_stmts))
    };
    AstNode::new(Ast::If, vec![cond, then_block, else_block])
}

fn convert_while<'src>(visitor: &Visitor<N, T, Ast>, node: &mut ParseNode<'src, N, T>) -> AstNode<Ast> {
    let mut cond_node = node.take_child(2);
    let cond = visitor.convert(&mut cond_node, None);
    let mut stmts = node.take_child(5);
    let body = AstNode::new(Ast::Block, collect_statements(visitor, &mut stmts));
    AstNode::new(Ast::While, vec![cond, body])
}

fn convert_do<'src>(visitor: &Visitor<N, T, Ast>, node: &mut ParseNode<'src, N, T>) -> AstNode<Ast> {
    let mut call = node.take_child(1);
    let call_ast = convert_subroutine_call(visitor, &mut call);
    AstNode::new(Ast::Do, vec![call_ast])
}

fn convert_return<'src>(visitor: &Visitor<N, T, Ast>, node: &mut ParseNode<'src, N, T>) -> AstNode<Ast> {
    let mut rv = node.take_child(1);
    if rv.child_count() == 0 {
        AstNode::new(Ast::Return, Vec::new())
    } else {
        let mut expr = rv.take_child(0);
        let value = visitor.convert(&mut expr, None);
        AstNode::new(Ast::Return, vec![value])
    }
}

fn type_name<'src>(node: &mut ParseNode<'src, N, T>) -> String {
    let child = node.take_child(0);
    child.as_token().expect("type leaf").lexeme.to_string()
}

fn return_type_name<'src>(node: &mut ParseNode<'src, N, T>) -> String {
    let mut child = node.take_child(0);
    match child.as_token() {
        Some(tok) => tok.lexeme.to_string(),
        None => type_name(&mut child),
    }
}

fn collect_var_names<'src>(node: &mut ParseNode<'src, N, T>) -> Vec<String> {
    if node.child_count() == 0 {
        return Vec::new();
    }
    let name_tok = node.take_child(1);
    let name = name_tok.as_token().unwrap().lexeme.to_string();
    let mut tail = node.take_child(2);
    let mut rest = collect_var_names(&mut tail);
    let mut out = vec![name];
    out.append(&mut rest);
    out
}

fn convert_class_var_dec<'src>(node: &mut ParseNode<'src, N, T>) -> Vec<AstNode<Ast>> {
    let scope_tok = node.take_child(0);
    let scope = match scope_tok.as_token().unwrap().kind.as_terminal() {
        Some(T::Static) => Scope::Static,
        Some(T::Field) => Scope::Field,
        _ => panic!("unexpected class-var scope"),
    };
    let mut ty_node = node.take_child(1);
    let ty = type_name(&mut ty_node);
    let first_name_tok = node.take_child(2);
    let first_name = first_name_tok.as_token().unwrap().lexeme.to_string();
    let mut tail = node.take_child(3);
    let mut names = vec![first_name];
    names.append(&mut collect_var_names(&mut tail));
    names
        .into_iter()
        .map(|name| {
            AstNode::leaf(Ast::ClassVarDecl {
                scope,
                ty: ty.clone(),
                name,
            })
        })
        .collect()
}

fn collect_class_var_decs<'src>(node: &mut ParseNode<'src, N, T>) -> Vec<AstNode<Ast>> {
    if node.child_count() == 0 {
        return Vec::new();
    }
    let mut decl = node.take_child(0);
    let mut out = convert_class_var_dec(&mut decl);
    let mut tail = node.take_child(1);
    out.append(&mut collect_class_var_decs(&mut tail));
    out
}

fn convert_var_dec<'src>(node: &mut ParseNode<'src, N, T>) -> Vec<AstNode<Ast>> {
    let mut ty_node = node.take_child(1);
    let ty = type_name(&mut ty_node);
    let first_name_tok = node.take_child(2);
    let first_name = first_name_tok.as_token().unwrap().lexeme.to_string();
    let mut tail = node.take_child(3);
    let mut names = vec![first_name];
    names.append(&mut collect_var_names(&mut tail));
    names
        .into_iter()
        .map(|name| AstNode::leaf(Ast::LocalVarDecl { ty: ty.clone(), name }))
        .collect()
}

fn collect_var_decs<'src>(node: &mut ParseNode<'src, N, T>) -> Vec<AstNode<Ast>> {
    if node.child_count() == 0 {
        return Vec::new();
    }
    let mut decl = node.take_child(0);
    let mut out = convert_var_dec(&mut decl);
    let mut tail = node.take_child(1);
    out.append(&mut collect_var_decs(&mut tail));
    out
}

fn collect_param_list<'src>(node: &mut ParseNode<'src, N, T>) -> Vec<(String, String)> {
    if node.child_count() == 0 {
        return Vec::new();
    }
    let mut ty_node = node.take_child(0);
    let ty = type_name(&mut ty_node);
    let name_tok = node.take_child(1);
    let name = name_tok.as_token().unwrap().lexeme.to_string();
    let mut tail = node.take_child(2);
    let mut rest = collect_param_list_tail(&mut tail);
    let mut out = vec![(ty, name)];
    out.append(&mut rest);
    out
}

fn collect_param_list_tail<'src>(node: &mut ParseNode<'src, N, T>) -> Vec<(String, String)> {
    if node.child_count() == 0 {
        return Vec::new();
    }
    let mut ty_node = node.take_child(1);
    let ty = type_name(&mut ty_node);
    let name_tok = node.take_child(2);
    let name = name_tok.as_token().unwrap().lexeme.to_string();
    let mut tail = node.take_child(3);
    let mut rest = collect_param_list_tail(&mut tail);
    let mut out = vec![(ty, name)];
    out.append(&mut rest);
    out
}

fn convert_subroutine_body<'src>(
    visitor: &Visitor<N, T, Ast>,
    node: &mut ParseNode<'src, N, T>,
) -> Vec<AstNode<Ast>> {
    let mut var_decs = node.take_child(1);
    let mut stmts = node.take_child(2);
    let mut out = collect_var_decs(&mut var_decs);
    out.append(&mut collect_statements(visitor, &mut stmts));
    out
}

fn convert_subroutine_dec<'src>(visitor: &Visitor<N, T, Ast>, node: &mut ParseNode<'src, N, T>) -> AstNode<Ast> {
    let kind_tok = node.take_child(0);
    let kind = match kind_tok.as_token().unwrap().kind.as_terminal() {
        Some(T::Constructor) => SubroutineKind::Constructor,
        Some(T::Function) => SubroutineKind::Function,
        Some(T::Method) => SubroutineKind::Method,
        _ => panic!("unexpected subroutine kind"),
    };
    let mut rt_node = node.take_child(1);
    let return_type = return_type_name(&mut rt_node);
    let name_tok = node.take_child(2);
    let name = name_tok.as_token().unwrap().lexeme.to_string();
    let mut params_node = node.take_child(4);
    let params = collect_param_list(&mut params_node);
    let mut body_node = node.take_child(6);
    let body = convert_subroutine_body(visitor, &mut body_node);
    AstNode::new(
        Ast::Subroutine {
            kind,
            return_type,
            name,
            params,
        },
        body,
    )
}

fn collect_subroutine_decs<'src>(visitor: &Visitor<N, T, Ast>, node: &mut ParseNode<'src, N, T>) -> Vec<AstNode<Ast>> {
    if node.child_count() == 0 {
        return Vec::new();
    }
    let mut dec = node.take_child(0);
    let first = convert_subroutine_dec(visitor, &mut dec);
    let mut tail = node.take_child(1);
    let mut rest = collect_subroutine_decs(visitor, &mut tail);
    let mut out = vec![first];
    out.append(&mut rest);
    out
}

pub fn to_ast<'src>(tree: &mut ParseNode<'src, N, T>) -> AstNode<Ast> {
    let visitor = Visitor::new(rules());
    let name_tok = tree.take_child(1);
    let name = name_tok.as_token().unwrap().lexeme.to_string();
    let mut class_vars = tree.take_child(3);
    let mut subs = tree.take_child(4);
    let mut children = collect_class_var_decs(&mut class_vars);
    children.append(&mut collect_subroutine_decs(&visitor, &mut subs));
    AstNode::new(Ast::Class(name), children)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_class_with_empty_main() {
        let mut out = parse("class Foo { function void main() { return; } }");
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        assert_eq!(ast.value, Ast::Class("Foo".to_string()));
        assert_eq!(ast.children.len(), 1);
        let main = &ast.children[0];
        assert_eq!(
            main.value,
            Ast::Subroutine {
                kind: SubroutineKind::Function,
                return_type: "void".to_string(),
                name: "main".to_string(),
                params: Vec::new(),
            }
        );
        assert_eq!(main.children.len(), 1);
        assert_eq!(main.children[0].value, Ast::Return);
        assert!(main.children[0].children.is_empty());
    }

    #[test]
    fn parses_fields_locals_and_arithmetic_return() {
        let src = "class Point { field int x, y; \
                    function int sum() { var int total; let total = x + y; return total; } }";
        let mut out = parse(src);
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        assert_eq!(ast.children.len(), 3);
        assert_eq!(
            ast.children[0].value,
            Ast::ClassVarDecl {
                scope: Scope::Field,
                ty: "int".to_string(),
                name: "x".to_string(),
            }
        );
        assert_eq!(
            ast.children[1].value,
            Ast::ClassVarDecl {
                scope: Scope::Field,
                ty: "int".to_string(),
                name: "y".to_string(),
            }
        );
        let sum = &ast.children[2];
        assert_eq!(sum.children[0].value, Ast::LocalVarDecl { ty: "int".to_string(), name: "total".to_string() });
        let let_stmt = &sum.children[1];
        assert_eq!(let_stmt.value, Ast::Let("total".to_string()));
        assert_eq!(let_stmt.children[0].value, Ast::Add);
        let return_stmt = &sum.children[2];
        assert_eq!(return_stmt.value, Ast::Return);
        assert_eq!(return_stmt.children[0].value, Ast::Var("total".to_string()));
    }

    #[test]
    fn parses_if_else_and_method_call() {
        let src = "class Util { function void run() { \
                    if (x < 10) { do Output.println(x); } else { let x = x - 1; } } }";
        let mut out = parse(src);
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        let body = &ast.children[0].children;
        assert_eq!(body[0].value, Ast::If);
        assert_eq!(body[0].children[0].value, Ast::Lt);
        let then_block = &body[0].children[1];
        assert_eq!(then_block.value, Ast::Block);
        assert_eq!(then_block.children[0].value, Ast::Do);
        assert_eq!(then_block.children[0].children[0].value, Ast::Call("Output.println".to_string()));
        let else_block = &body[0].children[2];
        assert_eq!(else_block.children[0].value, Ast::Let("x".to_string()));
    }

    #[test]
    fn parses_array_indexing_and_unary_operators() {
        let src = "class A { function void run() { let x = ~flag; let y = -(a[0]); } }";
        let mut out = parse(src);
        assert!(out.is_ok(), "{}", out.errors);
        let ast = to_ast(&mut out.root);
        let body = &ast.children[0].children;
        assert_eq!(body[0].children[0].value, Ast::Not);
        assert_eq!(body[1].children[0].value, Ast::Neg);
        assert_eq!(body[1].children[0].children[0].value, Ast::Index("a".to_string()));
    }

    #[test]
    fn missing_closing_brace_is_reported() {
        let out = parse("class Foo { function void main() { return; }");
        assert!(!out.is_ok());
    }
}
