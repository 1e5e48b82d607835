//! Lazy, forward-only lexer iterator driving a `Dfa` over a source buffer.
//!
//! Grounded on the teacher's `Tokenizer::tokenize` loop (`src/tokenization.rs`):
//! pull one token at a time, push it onto the stream, stop once the EOF
//! pointer is reached. Here that loop is inverted into an `Iterator` so
//! callers can observe tokens one at a time instead of collecting a vector.

use crate::dfa::Dfa;
use crate::logger::Log;
use crate::position::Code;
use crate::token::{LexError, Terminal, Token, TokenKind};
use std::collections::HashMap;

/// A keyword override: when an identifier-class lexeme equals `lexeme`,
/// reclassify the token to `terminal`.
#[derive(Debug, Clone)]
pub struct KeywordInfo<T> {
    pub lexeme: &'static str,
    pub terminal: T,
}

impl<T> KeywordInfo<T> {
    pub fn new(lexeme: &'static str, terminal: T) -> Self {
        Self { lexeme, terminal }
    }
}

/// Immutable configuration a `Lexer` is built from: the DFA plus the
/// keyword overrides and (optional) identifier length limit, as spec.md
/// §6's lexer inputs describe.
pub struct LexerSpec<T: Terminal> {
    dfa: Dfa<T>,
    keywords: HashMap<&'static str, T>,
    identifier_terminal: Option<T>,
    max_identifier_len: Option<usize>,
    debug: Log<&'static str>,
}

impl<T: Terminal> LexerSpec<T> {
    pub fn new(dfa: Dfa<T>) -> Self {
        Self {
            dfa,
            keywords: HashMap::new(),
            identifier_terminal: None,
            max_identifier_len: None,
            debug: Log::None,
        }
    }

    pub fn with_keywords(mut self, keywords: &[KeywordInfo<T>]) -> Self {
        self.keywords = keywords.iter().map(|k| (k.lexeme, k.terminal)).collect();
        self
    }

    /// Identify which terminal is the "identifier class" eligible for
    /// keyword reclassification and length-limit enforcement.
    pub fn with_identifier_terminal(mut self, terminal: T) -> Self {
        self.identifier_terminal = Some(terminal);
        self
    }

    pub fn with_max_identifier_len(mut self, len: usize) -> Self {
        self.max_identifier_len = Some(len);
        self
    }

    pub fn with_log(mut self, log: Log<&'static str>) -> Self {
        self.debug = log;
        self
    }

    pub fn lex<'src>(&self, source: &'src str) -> Lexer<'src, '_, T> {
        Lexer {
            spec: self,
            code: Code::from(source),
            pos: 0,
            newlines_seen: 0,
            exhausted: false,
        }
    }
}

/// A fused, forward-only token sequence. Not restartable: construct a fresh
/// `Lexer` (via `LexerSpec::lex`) for each pass.
pub struct Lexer<'src, 'spec, T: Terminal> {
    spec: &'spec LexerSpec<T>,
    code: Code<'src>,
    pos: usize,
    newlines_seen: usize,
    exhausted: bool,
}

impl<'src, 'spec, T: Terminal> Iterator for Lexer<'src, 'spec, T> {
    type Item = Token<'src, T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let input = self.code.value;
        let start = self.pos;
        let line = self.newlines_seen + 1;

        if start >= input.len() {
            self.exhausted = true;
            let lexeme = &self.code.as_str()[input.len()..input.len()];
            return Some(Token::new(TokenKind::Terminal(T::eof()), lexeme, line));
        }

        let run = self.spec.dfa.pass(input, start);

        // No progress at all: a single offending byte is consumed.
        if run.cur_pos == start {
            let lexeme = &self.code.as_str()[start..start + 1];
            self.pos = start + 1;
            self.newlines_seen += lexeme.bytes().filter(|b| *b == b'\n').count();
            self.log_error(line, "ERR_SYMBOL", start);
            return Some(Token::new(TokenKind::Error(LexError::ErrSymbol), lexeme, line));
        }

        // Progress was made but no final state was ever visited: prefer
        // ERR_PATTERN over ERR_SYMBOL whenever any character advanced, per
        // spec.md §9's stated tie-break.
        if run.final_state == crate::dfa::NO_TRANSITION {
            let end = (run.cur_pos + 1).min(input.len()).max(start + 1);
            let lexeme = &self.code.as_str()[start..end];
            self.pos = end;
            self.newlines_seen += lexeme.bytes().filter(|b| *b == b'\n').count();
            self.log_error(line, "ERR_PATTERN", start);
            return Some(Token::new(TokenKind::Error(LexError::ErrPattern), lexeme, line));
        }

        let end = run.final_pos + 1;
        let lexeme = &self.code.as_str()[start..end];
        self.pos = end;
        self.newlines_seen += lexeme.bytes().filter(|b| *b == b'\n').count();

        let terminal = self
            .spec
            .dfa
            .final_terminal(run.final_state)
            .expect("final_state visited implies a terminal is recorded");

        let kind = self.classify(terminal, lexeme);
        self.log_success(line, &kind, lexeme);
        Some(Token::new(kind, lexeme, line))
    }
}

impl<'src, 'spec, T: Terminal> Lexer<'src, 'spec, T> {
    fn classify(&self, terminal: T, lexeme: &str) -> TokenKind<T> {
        if self.spec.identifier_terminal == Some(terminal) {
            if let Some(max_len) = self.spec.max_identifier_len {
                if lexeme.len() > max_len {
                    return TokenKind::Error(LexError::ErrLength);
                }
            }
            if let Some(keyword) = self.spec.keywords.get(lexeme) {
                return TokenKind::Terminal(*keyword);
            }
        }
        TokenKind::Terminal(terminal)
    }

    fn log_error(&self, line: usize, kind: &str, start: usize) {
        #[cfg(debug_assertions)]
        if self.spec.debug.order() >= Log::Result(()).order() {
            println!(
                "[{}; LexError {}] at {} (line {})",
                self.spec.debug,
                kind,
                self.code.position_at(start),
                line
            );
        }
        let _ = (line, kind, start);
    }

    fn log_success(&self, line: usize, kind: &TokenKind<T>, lexeme: &str) {
        #[cfg(debug_assertions)]
        if self.spec.debug.order() >= Log::Success(()).order() {
            println!(
                "[{}; Token {:?}] {:?} (line {})",
                self.spec.debug, kind, lexeme, line
            );
        }
        let _ = (line, kind, lexeme);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::{Dfa, FinalStateInfo, TransitionInfo};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    enum Tk {
        Eof,
        Num,
        Id,
        Plus,
        Space,
        If,
    }
    impl Terminal for Tk {
        fn eof() -> Self {
            Tk::Eof
        }
        fn is_discardable(&self) -> bool {
            matches!(self, Tk::Space)
        }
    }

    fn spec() -> LexerSpec<Tk> {
        let digits = "0123456789";
        let alpha = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";
        let dfa = Dfa::build(
            &[
                TransitionInfo::new(0, 1, digits),
                TransitionInfo::new(1, 1, digits),
                TransitionInfo::new(0, 2, alpha),
                TransitionInfo::new(2, 2, alpha),
                TransitionInfo::new(0, 3, "+"),
                TransitionInfo::new(0, 4, " \t"),
                TransitionInfo::new(4, 4, " \t"),
            ],
            &[
                FinalStateInfo::new(1, Tk::Num),
                FinalStateInfo::new(2, Tk::Id),
                FinalStateInfo::new(3, Tk::Plus),
                FinalStateInfo::new(4, Tk::Space),
            ],
        )
        .unwrap();
        LexerSpec::new(dfa)
            .with_identifier_terminal(Tk::Id)
            .with_keywords(&[KeywordInfo::new("if", Tk::If)])
    }

    #[test]
    fn tokenizes_arithmetic_like_input() {
        let spec = spec();
        let tokens: Vec<_> = spec.lex("12 + foo").collect();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Terminal(Tk::Num),
                TokenKind::Terminal(Tk::Space),
                TokenKind::Terminal(Tk::Plus),
                TokenKind::Terminal(Tk::Space),
                TokenKind::Terminal(Tk::Id),
                TokenKind::Terminal(Tk::Eof),
            ]
        );
    }

    #[test]
    fn concatenated_lexemes_reproduce_source() {
        let source = "12 + foo";
        let spec = spec();
        let rebuilt: String = spec.lex(source).map(|t| t.lexeme).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn keyword_reclassifies_identifier() {
        let spec = spec();
        let tokens: Vec<_> = spec.lex("if").collect();
        assert_eq!(tokens[0].kind, TokenKind::Terminal(Tk::If));
    }

    #[test]
    fn unknown_byte_yields_err_symbol() {
        let spec = spec();
        let tokens: Vec<_> = spec.lex("@").collect();
        assert_eq!(tokens[0].kind, TokenKind::Error(LexError::ErrSymbol));
        assert_eq!(tokens[0].lexeme, "@");
    }

    #[test]
    fn eof_is_yielded_exactly_once() {
        let spec = spec();
        let mut lexer = spec.lex("1");
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Terminal(Tk::Num));
        assert!(lexer.next().unwrap().is_eof());
        assert!(lexer.next().is_none());
    }
}
