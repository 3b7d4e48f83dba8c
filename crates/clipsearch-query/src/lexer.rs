//! Query lexer (tokenizer).
//!
//! Converts a query string into a stream of position-tracked tokens for the
//! parser. Lexing never fails: characters that do not belong to any token are
//! skipped, and the stream always ends with a single [`TokenKind::Eof`] token.

use serde::Serialize;

/// Source position of a token within the original query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column within the line, counting every consumed character.
    pub column: usize,
    /// 0-based code-point index into the input.
    pub offset: usize,
}

impl Position {
    /// The position of the first character of any input.
    pub const fn start() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

/// The kind of a lexical token. The set is closed; every token the lexer
/// emits is one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenKind {
    /// A bare word: alphanumerics, underscores, and internal hyphens.
    Word,
    /// A quoted phrase with surrounding quotes stripped and `\"` decoded.
    Phrase,
    /// A run of decimal digits.
    Number,
    /// `:` introducing a field filter value.
    Colon,
    /// `(` opening a group.
    LParen,
    /// `)` closing a group.
    RParen,
    /// A `-` at the start of input or after whitespace.
    Negation,
    /// One of `>` `<` `=` `>=` `<=`, value preserved as written.
    Comparison,
    /// The two-character sequence `..`.
    Range,
    /// The standalone keyword `OR`, matched case-insensitively.
    Or,
    /// End of input. Always the final token, even for empty input.
    Eof,
}

/// A lexical token: kind, source text (already decoded for phrases), and the
/// position of its first character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// The token's text value.
    pub value: String,
    /// Position of the token's first character.
    pub position: Position,
}

/// Tokenizes a query string.
struct Lexer {
    /// Input as code points, indexed for one-character lookbehind/lookahead.
    chars: Vec<char>,
    /// Current code-point index.
    pos: usize,
    /// Current 1-based line.
    line: usize,
    /// Current 1-based column.
    column: usize,
    /// Tokens produced so far.
    tokens: Vec<Token>,
}

impl Lexer {
    /// Creates a lexer over the given input.
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    /// Consumes the lexer, producing the full token stream terminated by Eof.
    fn tokenize(mut self) -> Vec<Token> {
        while let Some(ch) = self.peek() {
            match ch {
                c if c.is_whitespace() => self.advance(),
                '(' => self.single(TokenKind::LParen, "("),
                ')' => self.single(TokenKind::RParen, ")"),
                ':' => self.single(TokenKind::Colon, ":"),
                '"' => self.read_phrase(),
                '>' | '<' => self.read_comparison(ch),
                '=' => self.single(TokenKind::Comparison, "="),
                '.' => self.read_dot(),
                '-' => self.read_hyphen(),
                c if is_word_start(c) => self.read_word(),
                // Anything else (stray punctuation) is skipped silently.
                _ => self.advance(),
            }
        }

        let position = self.position();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            value: String::new(),
            position,
        });
        self.tokens
    }

    /// Emits a single-character token and consumes it.
    fn single(&mut self, kind: TokenKind, value: &str) {
        let position = self.position();
        self.advance();
        self.tokens.push(Token {
            kind,
            value: value.to_string(),
            position,
        });
    }

    /// Reads `>` or `<`, joining a following `=` into one comparison token.
    fn read_comparison(&mut self, first: char) {
        let position = self.position();
        self.advance();
        let value = if self.peek() == Some('=') {
            self.advance();
            format!("{first}=")
        } else {
            first.to_string()
        };
        self.tokens.push(Token {
            kind: TokenKind::Comparison,
            value,
            position,
        });
    }

    /// Reads a `.`: `..` is a range token, a lone `.` is skipped.
    fn read_dot(&mut self) {
        let position = self.position();
        self.advance();
        if self.peek() == Some('.') {
            self.advance();
            self.tokens.push(Token {
                kind: TokenKind::Range,
                value: "..".to_string(),
                position,
            });
        }
    }

    /// Reads a `-`. Negation only at input start or after whitespace;
    /// elsewhere a stray hyphen carries no meaning and is skipped (hyphens
    /// inside words are consumed by `read_word`).
    fn read_hyphen(&mut self) {
        let after_boundary = self.pos == 0 || self.chars[self.pos - 1].is_whitespace();
        if after_boundary {
            self.single(TokenKind::Negation, "-");
        } else {
            self.advance();
        }
    }

    /// Reads a quoted phrase, decoding `\"` escapes. An unterminated phrase
    /// is closed implicitly at end of input.
    fn read_phrase(&mut self) {
        let position = self.position();
        self.advance(); // consume opening quote

        let mut value = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' && self.peek_next() == Some('"') {
                self.advance();
                self.advance();
                value.push('"');
                continue;
            }
            if ch == '"' {
                self.advance(); // consume closing quote
                break;
            }
            value.push(ch);
            self.advance();
        }

        self.tokens.push(Token {
            kind: TokenKind::Phrase,
            value,
            position,
        });
    }

    /// Reads a maximal run of word characters. A hyphen is consumed only
    /// when another word character follows, so hyphens are strictly
    /// internal. An all-digit run is a number; `or` is the OR keyword.
    fn read_word(&mut self) {
        let position = self.position();
        let mut value = String::new();

        while let Some(ch) = self.peek() {
            if is_word_start(ch) {
                value.push(ch);
                self.advance();
            } else if ch == '-' && self.peek_next().is_some_and(is_word_start) {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = if value.chars().all(|c| c.is_ascii_digit()) {
            TokenKind::Number
        } else if value.eq_ignore_ascii_case("or") {
            TokenKind::Or
        } else {
            TokenKind::Word
        };

        self.tokens.push(Token {
            kind,
            value,
            position,
        });
    }

    /// Returns the current character without consuming it.
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Returns the character after the current one.
    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    /// Snapshot of the current source position.
    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            offset: self.pos,
        }
    }

    /// Consumes one character, updating line and column counters.
    fn advance(&mut self) {
        if let Some(&ch) = self.chars.get(self.pos) {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.pos += 1;
        }
    }
}

/// Whether a character can start (or continue) a word: alphanumerics and
/// underscores. Hyphens are handled separately since they must be internal.
fn is_word_start(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Tokenizes a query string. Never fails; unrecognized characters are
/// skipped, and the result always ends with exactly one Eof token.
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collects (kind, value) pairs for easy comparison.
    fn kinds(input: &str) -> Vec<(TokenKind, String)> {
        tokenize(input)
            .into_iter()
            .map(|t| (t.kind, t.value))
            .collect()
    }

    /// Shorthand for a (kind, value) pair.
    fn t(kind: TokenKind, value: &str) -> (TokenKind, String) {
        (kind, value.to_string())
    }

    #[test]
    fn empty_input_yields_eof() {
        let tokens = tokenize("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert_eq!(tokens[0].position, Position::start());
    }

    #[test]
    fn every_stream_ends_with_one_eof() {
        for input in ["", "   ", "hello", "a OR b", "\"unterminated", "!@#$%"] {
            let tokens = tokenize(input);
            let eofs = tokens.iter().filter(|t| t.kind == TokenKind::Eof).count();
            assert_eq!(eofs, 1, "input {input:?}");
            assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
        }
    }

    #[test]
    fn two_words() {
        assert_eq!(
            kinds("hello world"),
            vec![
                t(TokenKind::Word, "hello"),
                t(TokenKind::Word, "world"),
                t(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn quoted_phrase() {
        assert_eq!(
            kinds("\"hello world\""),
            vec![t(TokenKind::Phrase, "hello world"), t(TokenKind::Eof, "")]
        );
    }

    #[test]
    fn empty_phrase() {
        assert_eq!(
            kinds("\"\""),
            vec![t(TokenKind::Phrase, ""), t(TokenKind::Eof, "")]
        );
    }

    #[test]
    fn unterminated_phrase_closes_at_end() {
        assert_eq!(
            kinds("\"hello wor"),
            vec![t(TokenKind::Phrase, "hello wor"), t(TokenKind::Eof, "")]
        );
    }

    #[test]
    fn escaped_quote_decoded() {
        assert_eq!(
            kinds("\"hello \\\"world\\\"\""),
            vec![
                t(TokenKind::Phrase, "hello \"world\""),
                t(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn internal_hyphen_stays_in_word() {
        assert_eq!(
            kinds("counter-strike"),
            vec![t(TokenKind::Word, "counter-strike"), t(TokenKind::Eof, "")]
        );
    }

    #[test]
    fn trailing_hyphen_not_part_of_word() {
        assert_eq!(
            kinds("hello- world"),
            vec![
                t(TokenKind::Word, "hello"),
                t(TokenKind::Word, "world"),
                t(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn leading_hyphen_is_negation() {
        assert_eq!(
            kinds("-game"),
            vec![
                t(TokenKind::Negation, "-"),
                t(TokenKind::Word, "game"),
                t(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn negation_only_after_whitespace() {
        assert_eq!(
            kinds("hello -world"),
            vec![
                t(TokenKind::Word, "hello"),
                t(TokenKind::Negation, "-"),
                t(TokenKind::Word, "world"),
                t(TokenKind::Eof, ""),
            ]
        );
        // After a non-whitespace boundary the hyphen carries no meaning.
        assert_eq!(
            kinds(")-x"),
            vec![
                t(TokenKind::RParen, ")"),
                t(TokenKind::Word, "x"),
                t(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn number_token() {
        assert_eq!(
            kinds("42"),
            vec![t(TokenKind::Number, "42"), t(TokenKind::Eof, "")]
        );
    }

    #[test]
    fn mixed_run_is_word() {
        assert_eq!(
            kinds("2024-01-15"),
            vec![t(TokenKind::Word, "2024-01-15"), t(TokenKind::Eof, "")]
        );
    }

    #[test]
    fn range_splits_numbers() {
        assert_eq!(
            kinds("10..20"),
            vec![
                t(TokenKind::Number, "10"),
                t(TokenKind::Range, ".."),
                t(TokenKind::Number, "20"),
                t(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn lone_dot_skipped() {
        assert_eq!(
            kinds("a.b"),
            vec![
                t(TokenKind::Word, "a"),
                t(TokenKind::Word, "b"),
                t(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn comparison_operators() {
        assert_eq!(
            kinds(">= <= > < ="),
            vec![
                t(TokenKind::Comparison, ">="),
                t(TokenKind::Comparison, "<="),
                t(TokenKind::Comparison, ">"),
                t(TokenKind::Comparison, "<"),
                t(TokenKind::Comparison, "="),
                t(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn field_filter_tokens() {
        assert_eq!(
            kinds("votes:>50"),
            vec![
                t(TokenKind::Word, "votes"),
                t(TokenKind::Colon, ":"),
                t(TokenKind::Comparison, ">"),
                t(TokenKind::Number, "50"),
                t(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn or_keyword_case_insensitive() {
        for or in ["OR", "or", "Or", "oR"] {
            let tokens = tokenize(&format!("a {or} b"));
            assert_eq!(tokens[1].kind, TokenKind::Or, "spelling {or:?}");
            assert_eq!(tokens[1].value, or);
        }
    }

    #[test]
    fn or_inside_word_is_word() {
        assert_eq!(
            kinds("order"),
            vec![t(TokenKind::Word, "order"), t(TokenKind::Eof, "")]
        );
    }

    #[test]
    fn parens() {
        assert_eq!(
            kinds("(a)"),
            vec![
                t(TokenKind::LParen, "("),
                t(TokenKind::Word, "a"),
                t(TokenKind::RParen, ")"),
                t(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn stray_punctuation_skipped() {
        assert_eq!(
            kinds("!@#$% hello"),
            vec![t(TokenKind::Word, "hello"), t(TokenKind::Eof, "")]
        );
    }

    #[test]
    fn offsets_count_code_points() {
        let tokens = tokenize("héllo world");
        assert_eq!(tokens[0].position.offset, 0);
        // "héllo" is five code points, then a space.
        assert_eq!(tokens[1].position.offset, 6);
        assert_eq!(tokens[1].position.column, 7);
    }

    #[test]
    fn newline_advances_line_and_resets_column() {
        let tokens = tokenize("a\nbb c");
        assert_eq!(tokens[0].position, Position { line: 1, column: 1, offset: 0 });
        assert_eq!(tokens[1].position, Position { line: 2, column: 1, offset: 2 });
        assert_eq!(tokens[2].position, Position { line: 2, column: 4, offset: 5 });
    }

    #[test]
    fn column_counts_skipped_characters() {
        let tokens = tokenize("!! a");
        assert_eq!(tokens[0].position.column, 4);
        assert_eq!(tokens[0].position.offset, 3);
    }

    #[test]
    fn underscore_in_word() {
        assert_eq!(
            kinds("my_tag"),
            vec![t(TokenKind::Word, "my_tag"), t(TokenKind::Eof, "")]
        );
    }
}
