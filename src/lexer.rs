//! A module implementing lexical analysis (tokenization) of one pipeline segment.

use crate::error::{ParseError, QuoteKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
}

impl LexingFSM {
    /// Creates a new instance of the lexical analysis Finite State Machine.
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    /// Performs lexical analysis on the input and returns the argument strings.
    ///
    /// Quoted and unquoted runs that touch each other are glued into one argument,
    /// so `a"b"c` yields `abc`. An empty quoted run (`''`) still produces an
    /// (empty) argument.
    fn make_args(&mut self) -> Result<Vec<String>, ParseError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch),
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote => Err(ParseError::UnclosedQuote(QuoteKind::Single)),
            LexingState::ReadingDoubleQuote => Err(ParseError::UnclosedQuote(QuoteKind::Double)),
            LexingState::ReadingWord => {
                out.push(std::mem::take(&mut self.buffer));
                Ok(out)
            }
            LexingState::Start => Ok(out),
        }
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_start(&mut self, ch: char) {
        match ch {
            ' ' | '\t' => {}
            _ => {
                self.state = LexingState::ReadingWord;
                self.read_unquoted(ch);
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) {
        match ch {
            ' ' | '\t' => {
                out.push(std::mem::take(&mut self.buffer));
                self.state = LexingState::Start;
            }
            _ => self.read_unquoted(ch),
        }
    }

    /// Unquoted character inside a word: opens a quote, escapes, or is literal.
    fn read_unquoted(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '\\' => match self.read_char() {
                Some(escaped) => self.buffer.push(escaped),
                // a lone trailing backslash stays literal
                None => self.buffer.push('\\'),
            },
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => match self.peek_char() {
                Some(next @ ('"' | '\\' | '$' | '`' | '\n')) => {
                    self.read_char();
                    self.buffer.push(next);
                }
                _ => self.buffer.push('\\'),
            },
            c => self.buffer.push(c),
        }
    }
}

/// The main entry point function to perform lexical analysis.
///
/// Splits `line` into arguments, honoring single quotes, double quotes and
/// backslash escapes. Fails with [`ParseError::UnclosedQuote`] when the input
/// ends inside a quote; no partial arguments are returned in that case.
pub fn split_into_args(line: &str) -> Result<Vec<String>, ParseError> {
    let mut lexer = LexingFSM::new(line);
    lexer.make_args()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        split_into_args(line).unwrap()
    }

    #[test]
    fn quotes_and_escapes_in_one_line() {
        assert_eq!(args(r#"echo 'a b' "c\"d""#), vec!["echo", "a b", "c\"d"]);
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(args("  ls \t -l   /tmp  "), vec!["ls", "-l", "/tmp"]);
    }

    #[test]
    fn empty_and_blank_input_have_no_args() {
        assert!(args("").is_empty());
        assert!(args(" \t  ").is_empty());
    }

    #[test]
    fn adjacent_runs_concatenate() {
        assert_eq!(args(r#"a"b"c"#), vec!["abc"]);
        assert_eq!(args(r#"'x'"y"z"#), vec!["xyz"]);
    }

    #[test]
    fn single_quotes_are_fully_literal() {
        assert_eq!(args(r#"'a\nb' '$HOME' 'say "hi"'"#), vec![r"a\nb", "$HOME", r#"say "hi""#]);
    }

    #[test]
    fn backslash_outside_quotes_escapes_anything() {
        assert_eq!(args(r"a\ b c\\d \'q\'"), vec!["a b", r"c\d", "'q'"]);
        assert_eq!(args(r"tail\"), vec![r"tail\"]);
    }

    #[test]
    fn backslash_inside_double_quotes_is_selective() {
        assert_eq!(args(r#""a\\b" "\$x" "\`" "\n""#), vec![r"a\b", "$x", "`", r"\n"]);
    }

    #[test]
    fn empty_quotes_produce_empty_argument() {
        assert_eq!(args("echo '' x"), vec!["echo", "", "x"]);
        assert_eq!(args(r#""""#), vec![""]);
    }

    #[test]
    fn unclosed_quotes_fail_without_partial_output() {
        assert_eq!(
            split_into_args("echo 'oops"),
            Err(ParseError::UnclosedQuote(QuoteKind::Single))
        );
        assert_eq!(
            split_into_args(r#"echo "still \" open"#),
            Err(ParseError::UnclosedQuote(QuoteKind::Double))
        );
    }
}
