use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

/// Position of a token in the source text (1-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// All token kinds produced by the BotScript lexer.
///
/// Tokens carry no semantic value beyond their raw text; numeric and boolean
/// conversion happens in the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,

    // Keywords
    Var,
    Set,
    If,
    Else,
    Repeat,
    True,
    False,
    And,
    Or,
    Not,

    // Command keywords
    Say,
    Goto,
    Attack,
    Dig,
    Place,
    Equip,
    Drop,
    Wait,

    // Operators
    Assign,
    EqualEqual,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Plus,
    Minus,
    Star,
    Slash,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    // Special
    Newline,
    Eof,

    /// Input the lexer could not classify. Never raised as an error here;
    /// the parser decides what to do with it.
    Invalid,
}

impl TokenKind {
    /// True for the fixed set of keywords that start a command statement.
    pub fn is_command_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Say
                | TokenKind::Goto
                | TokenKind::Attack
                | TokenKind::Dig
                | TokenKind::Place
                | TokenKind::Equip
                | TokenKind::Drop
                | TokenKind::Wait
        )
    }

    /// True when a token of this kind can begin an expression.
    pub fn can_begin_expression(self) -> bool {
        matches!(
            self,
            TokenKind::Number
                | TokenKind::String
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Identifier
                | TokenKind::LeftParen
                | TokenKind::Not
                | TokenKind::Minus
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A token with its kind, raw text, and source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

/// Keyword table. Lookup is case-insensitive; the stored text is the
/// canonical lowercase lexeme the token carries regardless of input casing.
static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut keywords = HashMap::new();
    keywords.insert("var", TokenKind::Var);
    keywords.insert("set", TokenKind::Set);
    keywords.insert("if", TokenKind::If);
    keywords.insert("else", TokenKind::Else);
    keywords.insert("repeat", TokenKind::Repeat);
    keywords.insert("true", TokenKind::True);
    keywords.insert("false", TokenKind::False);
    keywords.insert("and", TokenKind::And);
    keywords.insert("or", TokenKind::Or);
    keywords.insert("not", TokenKind::Not);
    keywords.insert("say", TokenKind::Say);
    keywords.insert("goto", TokenKind::Goto);
    keywords.insert("attack", TokenKind::Attack);
    keywords.insert("dig", TokenKind::Dig);
    keywords.insert("place", TokenKind::Place);
    keywords.insert("equip", TokenKind::Equip);
    keywords.insert("drop", TokenKind::Drop);
    keywords.insert("wait", TokenKind::Wait);
    keywords
});

/// Lexer for BotScript source text.
///
/// Tokenizing is total: every input produces a token stream terminated by
/// `Eof`. Malformed input becomes an `Invalid` token carrying the offending
/// text instead of an error.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.skip_whitespace();

            if self.is_at_end() {
                break;
            }

            let ch = self.current_char();

            if ch == '#' {
                self.skip_comment();
                continue;
            }

            if ch == '\n' {
                self.push_token(TokenKind::Newline, "\n", self.line, self.column);
                self.advance();
                continue;
            }

            if ch == '"' {
                self.handle_string();
                continue;
            }

            if ch.is_ascii_digit() {
                self.handle_number();
                continue;
            }

            if ch.is_ascii_alphabetic() || ch == '_' {
                self.handle_identifier();
                continue;
            }

            self.handle_operator_or_delimiter();
        }

        self.push_token(TokenKind::Eof, "", self.line, self.column);
        self.tokens
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_char(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.input[self.position]
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.current_char();
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn push_token(&mut self, kind: TokenKind, text: impl Into<String>, line: usize, column: usize) {
        self.tokens.push(Token::new(kind, text, line, column));
    }

    fn skip_whitespace(&mut self) {
        // Spaces, tabs, and carriage returns only. Newlines are significant.
        while !self.is_at_end() {
            match self.current_char() {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        // '#' to end of line. The trailing newline stays in the stream so the
        // comment still terminates the statement before it.
        while !self.is_at_end() && self.current_char() != '\n' {
            self.advance();
        }
    }

    fn handle_string(&mut self) {
        let start_line = self.line;
        let start_column = self.column;
        self.advance(); // consume opening quote

        let mut value = String::new();
        while !self.is_at_end() && self.current_char() != '"' && self.current_char() != '\n' {
            value.push(self.advance());
        }

        // No escape processing in BotScript strings. An unterminated string
        // (end of line or end of input) becomes an Invalid token.
        if self.is_at_end() || self.current_char() == '\n' {
            self.push_token(TokenKind::Invalid, value, start_line, start_column);
            return;
        }

        self.advance(); // consume closing quote
        self.push_token(TokenKind::String, value, start_line, start_column);
    }

    fn handle_number(&mut self) {
        let start_line = self.line;
        let start_column = self.column;

        let mut number = String::new();
        while !self.is_at_end() && self.current_char().is_ascii_digit() {
            number.push(self.advance());
        }

        // A fractional part is consumed only when a digit follows the dot,
        // so "1." lexes as the number 1 followed by an Invalid dot.
        if self.current_char() == '.'
            && self
                .peek_char()
                .map(|ch| ch.is_ascii_digit())
                .unwrap_or(false)
        {
            number.push(self.advance());
            while !self.is_at_end() && self.current_char().is_ascii_digit() {
                number.push(self.advance());
            }
        }

        self.push_token(TokenKind::Number, number, start_line, start_column);
    }

    fn handle_identifier(&mut self) {
        let start_line = self.line;
        let start_column = self.column;

        let mut identifier = String::new();
        while !self.is_at_end()
            && (self.current_char().is_ascii_alphanumeric() || self.current_char() == '_')
        {
            identifier.push(self.advance());
        }

        let lowered = identifier.to_ascii_lowercase();
        match KEYWORDS.get(lowered.as_str()) {
            Some(&kind) => self.push_token(kind, lowered, start_line, start_column),
            None => self.push_token(TokenKind::Identifier, identifier, start_line, start_column),
        }
    }

    fn handle_operator_or_delimiter(&mut self) {
        let start_line = self.line;
        let start_column = self.column;
        let ch = self.advance();

        // Two-character operators are matched greedily before the
        // single-character fallbacks.
        let (kind, text): (TokenKind, String) = match ch {
            '=' => {
                if self.current_char() == '=' {
                    self.advance();
                    (TokenKind::EqualEqual, "==".to_string())
                } else {
                    (TokenKind::Assign, "=".to_string())
                }
            }
            '!' => {
                if self.current_char() == '=' {
                    self.advance();
                    (TokenKind::NotEqual, "!=".to_string())
                } else {
                    (TokenKind::Invalid, "!".to_string())
                }
            }
            '<' => {
                if self.current_char() == '=' {
                    self.advance();
                    (TokenKind::LessEqual, "<=".to_string())
                } else {
                    (TokenKind::Less, "<".to_string())
                }
            }
            '>' => {
                if self.current_char() == '=' {
                    self.advance();
                    (TokenKind::GreaterEqual, ">=".to_string())
                } else {
                    (TokenKind::Greater, ">".to_string())
                }
            }
            '+' => (TokenKind::Plus, "+".to_string()),
            '-' => (TokenKind::Minus, "-".to_string()),
            '*' => (TokenKind::Star, "*".to_string()),
            '/' => (TokenKind::Slash, "/".to_string()),
            '(' => (TokenKind::LeftParen, "(".to_string()),
            ')' => (TokenKind::RightParen, ")".to_string()),
            '{' => (TokenKind::LeftBrace, "{".to_string()),
            '}' => (TokenKind::RightBrace, "}".to_string()),
            other => (TokenKind::Invalid, other.to_string()),
        };

        self.push_token(kind, text, start_line, start_column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).tokenize().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_tokenization() {
        let input = r#"var health = 20
say "hello""#;

        let tokens = Lexer::new(input).tokenize();
        let expected_kinds = vec![
            TokenKind::Var,
            TokenKind::Identifier,
            TokenKind::Assign,
            TokenKind::Number,
            TokenKind::Newline,
            TokenKind::Say,
            TokenKind::String,
            TokenKind::Eof,
        ];

        let actual_kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(actual_kinds, expected_kinds);
        assert_eq!(tokens[1].text, "health");
        assert_eq!(tokens[6].text, "hello");
    }

    #[test]
    fn test_keywords_normalize_to_canonical_casing() {
        let tokens = Lexer::new("VAR Repeat SAY gOtO").tokenize();

        assert_eq!(tokens[0].kind, TokenKind::Var);
        assert_eq!(tokens[0].text, "var");
        assert_eq!(tokens[1].kind, TokenKind::Repeat);
        assert_eq!(tokens[1].text, "repeat");
        assert_eq!(tokens[2].kind, TokenKind::Say);
        assert_eq!(tokens[2].text, "say");
        assert_eq!(tokens[3].kind, TokenKind::Goto);
        assert_eq!(tokens[3].text, "goto");
    }

    #[test]
    fn test_identifier_casing_preserved() {
        let tokens = Lexer::new("MyCounter").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "MyCounter");
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("42 0 123.456 7.0").tokenize();
        let texts: Vec<&str> = tokens
            .iter()
            .take_while(|t| t.kind == TokenKind::Number)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(texts, vec!["42", "0", "123.456", "7.0"]);
    }

    #[test]
    fn test_number_without_fraction_leaves_dot_invalid() {
        assert_eq!(
            kinds("1."),
            vec![TokenKind::Number, TokenKind::Invalid, TokenKind::Eof]
        );
    }

    #[test]
    fn test_operators_two_char_before_single() {
        assert_eq!(
            kinds("== != <= >= < > = + - * /"),
            vec![
                TokenKind::EqualEqual,
                TokenKind::NotEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Assign,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_invalid_not_error() {
        let tokens = Lexer::new("say \"oops").tokenize();
        assert_eq!(tokens[1].kind, TokenKind::Invalid);
        assert_eq!(tokens[1].text, "oops");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_comment_skipped_but_not_inside_string() {
        let tokens = Lexer::new("say \"a # b\" # trailing comment\nwait 1").tokenize();
        let expected_kinds = vec![
            TokenKind::Say,
            TokenKind::String,
            TokenKind::Newline,
            TokenKind::Wait,
            TokenKind::Number,
            TokenKind::Eof,
        ];
        let actual_kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(actual_kinds, expected_kinds);
        assert_eq!(tokens[1].text, "a # b");
    }

    #[test]
    fn test_tokenize_is_total_on_garbage() {
        for input in ["@@@ $$$ %%%", "\"", "!", "~`^&|;:,.?", ""] {
            let tokens = Lexer::new(input).tokenize();
            assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof, "input {input:?}");
        }
    }

    #[test]
    fn test_position_tracking() {
        let tokens = Lexer::new("var x = 1\nset x = 2").tokenize();

        let set_token = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Set)
            .expect("set token");
        assert_eq!(set_token.line, 2);
        assert_eq!(set_token.column, 1);

        let second_x = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Identifier)
            .nth(1)
            .expect("second identifier");
        assert_eq!(second_x.line, 2);
        assert_eq!(second_x.column, 5);
    }
}
