use std::{iter::Peekable, str::Chars};

use tracing::trace;

use crate::token::{Span, Spanned, Token, TokenKind, KEYWORDS};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Normalizes the raw source text before it is tokenized.
///
/// Every run of whitespace collapses into a single space, and whitespace at
/// the start or the end of the input is dropped. This runs over the raw text,
/// so string literal contents are normalized as well.
pub fn prime(src: &str) -> String {
    let mut buf = String::with_capacity(src.len());
    let mut pending_space = false;
    for c in src.chars() {
        if is_space(c) {
            pending_space = !buf.is_empty();
            continue;
        }
        if pending_space {
            buf.push(' ');
            pending_space = false;
        }
        buf.push(c);
    }
    buf
}

/// Lexes the whole input eagerly. The last token is always [`TokenKind::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    Lexer::new(src).collect()
}

/// The Natron lexer.
///
/// Tokens are produced on demand, one per [`Lexer::advance`] call. The lexer
/// only ever holds a single token, which is replaced on every advance.
pub struct Lexer<'src> {
    src: &'src str,
    iter: Peekable<Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    current: Token,
    finished: bool,
}

impl<'src> Lexer<'src> {
    /// Constructs a new lexer positioned at the start of `src`.
    pub fn new(src: &'src str) -> Lexer<'src> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            current: Token::eof(0),
            finished: false,
        }
    }

    /// Whether there is still unread input.
    pub fn has_next(&self) -> bool {
        self.cursor < self.src.len()
    }

    /// The most recently scanned token.
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Scans exactly one token and stores it as the current one.
    ///
    /// Once the input is exhausted, the current token is [`TokenKind::Eof`].
    pub fn advance(&mut self) -> Result<()> {
        let kind = self.scan_token_kind()?;
        let token = self.produce(kind);
        trace!(kind = ?token.kind, lexeme = %token.lexeme, span = %token.span(), "scanned token");
        self.current = token;
        Ok(())
    }

    /// Tries to scan a token starting at the next non-whitespace character.
    ///
    /// The token's kind is decided by its leading character.
    fn scan_token_kind(&mut self) -> Result<TokenKind> {
        while is_space(self.peek()) {
            self.advance_char();
        }
        match self.mark_advance() {
            '\0' => Ok(TokenKind::Eof),
            '"' => self.string(),
            c if is_identifier_start(c) => Ok(self.identifier_or_keyword()),
            c if c.is_ascii_digit() => self.number(),
            c => match TokenKind::leading(c) {
                Some(kind) => match kind.compound(self.peek()) {
                    Some(compound) => Ok(self.advance_with(compound)),
                    None => Ok(kind),
                },
                None => Err(self.error(Error::UnexpectedChar(c))),
            },
        }
    }

    /// The closing quote is consumed, but not included in the lexeme.
    fn string(&mut self) -> Result<TokenKind> {
        loop {
            match self.advance_char() {
                '"' => return Ok(TokenKind::String),
                '\0' => return Err(self.error(Error::UnclosedString)),
                _ => (),
            }
        }
    }

    /// Keywords are only recognized once the whole lexeme has been scanned.
    fn identifier_or_keyword(&mut self) -> TokenKind {
        while is_identifier_continue(self.peek()) {
            self.advance_char();
        }
        KEYWORDS
            .get(self.substr())
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    /// An integer may turn into a float once, upon a dot, which must then be
    /// followed by at least one digit.
    fn number(&mut self) -> Result<TokenKind> {
        while self.peek().is_ascii_digit() {
            self.advance_char();
        }
        if self.peek() != '.' {
            return Ok(TokenKind::Int);
        }
        self.advance_char();
        if !self.peek().is_ascii_digit() {
            return Err(self.error(Error::FloatTrailingDot));
        }
        while self.peek().is_ascii_digit() {
            self.advance_char();
        }
        Ok(TokenKind::Float)
    }
}

impl Lexer<'_> {
    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> char {
        self.current_lo = self.cursor;
        self.advance_char()
    }

    /// Returns the next char and advances the iterator.
    fn advance_char(&mut self) -> char {
        self.iter
            .next()
            .inspect(|c| self.cursor += c.len_utf8())
            .unwrap_or('\0')
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance_char();
        value
    }

    /// Returns the next char without advancing the iterator.
    fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &'_ str {
        self.span().substr(self.src)
    }

    fn produce(&self, kind: TokenKind) -> Token {
        let span = self.span();
        let lexeme = match kind {
            TokenKind::String => &self.src[span.lo + 1..span.hi() - 1],
            _ => self.substr(),
        };
        Token::new(kind, lexeme, span)
    }

    fn error(&self, error: Error) -> Spanned<Error> {
        self.span().wrap(error)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    /// Yields every token up to and including [`TokenKind::Eof`], or up to and
    /// including the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.advance() {
            Ok(()) => {
                self.finished = self.current.is_eof();
                Some(Ok(self.current.clone()))
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// No token may start with this character.
    UnexpectedChar(char),
    UnclosedString,
    FloatTrailingDot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prime() {
        assert_eq!(
            prime("  varying   x:\n\tbyte  =  1 ;  \n"),
            "varying x: byte = 1 ;"
        );
        assert_eq!(prime("\"a  \t b\""), "\"a b\"");
        assert_eq!(prime("check(x){}"), "check(x){}");
        assert_eq!(prime(" \n\t "), "");
    }

    #[test]
    fn test_pull_based() {
        let mut lexer = Lexer::new("x;");
        assert!(lexer.has_next());
        assert!(lexer.current().is_eof());

        lexer.advance().unwrap();
        assert_eq!(lexer.current().kind, TokenKind::Identifier);
        assert_eq!(&*lexer.current().lexeme, "x");
        assert!(lexer.has_next());

        lexer.advance().unwrap();
        assert_eq!(lexer.current().kind, TokenKind::Semicolon);
        assert!(!lexer.has_next());

        lexer.advance().unwrap();
        assert!(lexer.current().is_eof());
        lexer.advance().unwrap();
        assert!(lexer.current().is_eof());
    }

    #[test]
    fn test_lexemes() {
        let lexemes: Vec<_> = tokenize(r#"varying s: byte = "hi there"; x <- 10.25"#)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.lexeme.into_string()))
            .collect();
        let expected: Vec<_> = [
            (TokenKind::Varying, "varying"),
            (TokenKind::Identifier, "s"),
            (TokenKind::Colon, ":"),
            (TokenKind::Identifier, "byte"),
            (TokenKind::Eq, "="),
            (TokenKind::String, "hi there"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::Identifier, "x"),
            (TokenKind::ArrowLeft, "<-"),
            (TokenKind::Float, "10.25"),
            (TokenKind::Eof, ""),
        ]
        .into_iter()
        .map(|(kind, lexeme)| (kind, lexeme.to_string()))
        .collect();
        assert_eq!(lexemes, expected);
    }

    #[test]
    fn tests_with_span() {
        use TokenKind::*;
        let cases = cases!(match .. {
            "a + b * c;" => [
                (Identifier, 0..1),
                (Plus, 2..3),
                (Identifier, 4..5),
                (Star, 6..7),
                (Identifier, 8..9),
                (Semicolon, 9..10),
                (Eof, 10..10),
            ],
            "-> <- == != && || - < = ! & |" => [
                (ArrowRight, 0..2),
                (ArrowLeft, 3..5),
                (EqEq, 6..8),
                (NotEq, 9..11),
                (AndAnd, 12..14),
                (OrOr, 15..17),
                (Minus, 18..19),
                (Less, 20..21),
                (Eq, 22..23),
                (Bang, 24..25),
                (Ampersand, 26..27),
                (VertBar, 28..29),
                (Eof, 29..29),
            ],
            "x<-1" => [
                (Identifier, 0..1),
                (ArrowLeft, 1..3),
                (Int, 3..4),
                (Eof, 4..4),
            ],
            "procedure check varying const jmp return otherwise size extern" => [
                (Procedure, 0..9),
                (Check, 10..15),
                (Varying, 16..23),
                (Const, 24..29),
                (Jmp, 30..33),
                (Return, 34..40),
                (Otherwise, 41..50),
                (Size, 51..55),
                (Extern, 56..62),
                (Eof, 62..62),
            ],
            "Check checks _check check_1" => [
                (Identifier, 0..5),
                (Identifier, 6..12),
                (Identifier, 13..19),
                (Identifier, 20..27),
                (Eof, 27..27),
            ],
            "1 12 1.5 10.25 3x" => [
                (Int, 0..1),
                (Int, 2..4),
                (Float, 5..8),
                (Float, 9..14),
                (Int, 15..16),
                (Identifier, 16..17),
                (Eof, 17..17),
            ],
            r#""hi there" "" x"# => [
                (String, 0..10),
                (String, 11..13),
                (Identifier, 14..15),
                (Eof, 15..15),
            ],
            "size[word]{}():\\" => [
                (Size, 0..4),
                (LBracket, 4..5),
                (Identifier, 5..9),
                (RBracket, 9..10),
                (LBrace, 10..11),
                (RBrace, 11..12),
                (LParen, 12..13),
                (RParen, 13..14),
                (Colon, 14..15),
                (Backslash, 15..16),
                (Eof, 16..16),
            ],
        });

        for (input, expected) in cases {
            let lexed: Vec<_> = tokenize(input)
                .unwrap()
                .iter()
                .map(|t| (t.kind, t.span()))
                .collect();
            assert_eq!(&lexed, expected, "input: {input:?}");
        }
    }

    #[test]
    fn tests_errors() {
        let cases = [
            ("1.", Error::FloatTrailingDot, 0..2),
            ("x = 1.y", Error::FloatTrailingDot, 4..6),
            ("\"abc", Error::UnclosedString, 0..4),
            ("a $ b", Error::UnexpectedChar('$'), 2..3),
            ("1.5.2", Error::UnexpectedChar('.'), 3..4),
        ];
        for (input, error, range) in cases {
            let actual = tokenize(input).unwrap_err();
            assert_eq!(actual, Span::new_of_bounds(range).wrap(error), "input: {input:?}");
        }
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let items: Vec<_> = Lexer::new("a # b").collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:expr, $range:expr)),* $(,)?]),* $(,)?
        }) => {{
            &[$((
                $str,
                vec![
                    $(($kind, Span::new_of_bounds($range.start..$range.end))),*
                ],
            )),*]
        }};
    }
    use cases;
}
