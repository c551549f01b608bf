use std::{fmt, ops::Range};

/// A lexical unit. Owns its lexeme, so it may be cloned and kept around after
/// the lexer has moved on to the next token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: Box<str>,
    lo: usize,
    len: u32,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<Box<str>>, span: Span) -> Token {
        Token {
            kind,
            lexeme: lexeme.into(),
            lo: span.lo,
            len: span.len,
        }
    }

    /// An end-of-input token, positioned at `at`.
    pub fn eof(at: usize) -> Token {
        Token::new(TokenKind::Eof, "", Span::new_of_length(at, 0))
    }

    pub fn span(&self) -> Span {
        Span {
            len: self.len,
            lo: self.lo,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {:?}, {})", self.kind, self.lexeme, self.span())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub len: u32,
    pub lo: usize,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>) -> Span {
        debug_assert!(hi >= lo);
        Self::new_of_length(lo, u32::try_from(hi - lo).unwrap_or(u32::MAX))
    }

    pub fn new_of_length(lo: usize, len: u32) -> Span {
        Span { len, lo }
    }

    pub fn hi(self) -> usize {
        self.lo + self.len as usize
    }

    /// Returns a span which covers both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new_of_bounds(self.lo.min(other.lo)..self.hi().max(other.hi()))
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.lo..self.hi()]
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, len: {})", self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = self.hi();
        write!(f, "{lo}..{hi}")
    }
}

/// Some value (usually an error) tagged with the source span it refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

impl<T> Spanned<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        self.span.wrap(f(self.inner))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Unknown token, also used to mark the end of the input.
    Eof,
    Identifier,

    String,
    Int,
    Float,

    LParen,
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `=`
    Eq,
    Plus,
    Minus,
    Star,
    Slash,
    Colon,
    Semicolon,
    Comma,
    Backslash,
    Ampersand,
    /// `|`
    VertBar,
    /// `!`
    Bang,
    Greater,
    Less,

    /// `->`
    ArrowRight,
    /// `<-`
    ArrowLeft,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,

    Procedure,
    Check,
    Varying,
    Const,
    Jmp,
    Return,
    Otherwise,
    Size,
    Extern,
}

impl TokenKind {
    /// Classifies a character which starts (and possibly ends) a symbol token.
    pub fn leading(c: char) -> Option<TokenKind> {
        use TokenKind::*;
        let kind = match c {
            '(' => LParen,
            ')' => RParen,
            '[' => LBracket,
            ']' => RBracket,
            '{' => LBrace,
            '}' => RBrace,
            '=' => Eq,
            '+' => Plus,
            '-' => Minus,
            '*' => Star,
            '/' => Slash,
            ':' => Colon,
            ';' => Semicolon,
            ',' => Comma,
            '\\' => Backslash,
            '&' => Ampersand,
            '|' => VertBar,
            '!' => Bang,
            '>' => Greater,
            '<' => Less,
            _ => return None,
        };
        Some(kind)
    }

    /// The two-character operator formed by `self` followed by `next`, if any.
    pub fn compound(self, next: char) -> Option<TokenKind> {
        use TokenKind::*;
        let kind = match (self, next) {
            (Minus, '>') => ArrowRight,
            (Less, '-') => ArrowLeft,
            (Eq, '=') => EqEq,
            (Bang, '=') => NotEq,
            (Ampersand, '&') => AndAnd,
            (VertBar, '|') => OrOr,
            _ => return None,
        };
        Some(kind)
    }
}

/// Reserved words. Lookups are exact (case sensitive, whole lexeme).
pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "procedure" => TokenKind::Procedure,
    "check" => TokenKind::Check,
    "varying" => TokenKind::Varying,
    "const" => TokenKind::Const,
    "jmp" => TokenKind::Jmp,
    "return" => TokenKind::Return,
    "otherwise" => TokenKind::Otherwise,
    "size" => TokenKind::Size,
    "extern" => TokenKind::Extern,
};
