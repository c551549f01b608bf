use std::mem;

use tracing::debug;

use crate::{
    ast::{
        BinaryOperator, Block, Check, FunctionDefinition, FunctionParameter, Ident, Mutability,
        Node, NodeKind, Program, ScopeId, ScopeTree, Signature, VariableDeclaration,
    },
    lexer::{self, Lexer},
    token::{Span, Spanned, Token, TokenKind},
    types::{builtins, Type},
    util::intern::{Interned, Interner},
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Parses a whole (primed) program. The top-level statements form the
/// program's implicit block.
pub fn parse_program(src: &str, idents: &mut Interner) -> Result<Program> {
    prepare_interner(idents)?;
    let mut p = Parser::new(src, idents)?;
    let root = p.parse_program()?;
    Ok(Program {
        root,
        scopes: p.scopes,
    })
}

/// Parses a single expression, which must span the whole input.
pub fn parse_expr(src: &str, idents: &mut Interner) -> Result<Node> {
    prepare_interner(idents)?;
    let mut p = Parser::new(src, idents)?;
    let expr = p.parse_expr()?;
    p.consume(TokenKind::Eof)?;
    Ok(expr)
}

/// Deepest nesting of blocks and expression operands that is accepted. The
/// semantic analysis and the tree printer recurse along the same structure,
/// so this also bounds their stack usage.
pub const MAX_NESTING: usize = 256;

/// Built-in type names must sit at their reserved handles.
fn prepare_interner(idents: &mut Interner) -> Result<()> {
    builtins::prepare(idents).map_err(|name| {
        Span::new_of_length(0, 0).wrap(Error::MisplacedBuiltin { name })
    })
}

/// Which of the two lookahead tokens to inspect.
#[derive(Copy, Clone, Debug)]
enum Lookahead {
    Current,
    Next,
}

struct Parser<'src, 'ident> {
    lexer: Lexer<'src>,
    current: Token,
    next: Token,
    idents: &'ident mut Interner,
    scopes: ScopeTree,
    /// The innermost open block, if any.
    scope: Option<ScopeId>,
    depth: usize,
}

impl Parser<'_, '_> {
    fn parse_program(&mut self) -> Result<Node> {
        let scope = self.scopes.open(None);
        self.scope = Some(scope);
        let mut body = Vec::new();
        while !self.is(TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        let span = Span::new_of_bounds(0..self.current.span().hi());
        let block = Block { scope, body, span };
        Ok(Node {
            kind: NodeKind::Program(block),
            span,
        })
    }

    fn parse_statement(&mut self) -> Result<Node> {
        match self.current.kind {
            TokenKind::Varying | TokenKind::Const => self.parse_variable_declaration(),
            TokenKind::Procedure => self.parse_function_definition(),
            TokenKind::Extern => self.parse_extern(),
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                Ok(Node {
                    span: block.span,
                    kind: NodeKind::Block(block),
                })
            }
            TokenKind::Return => self.parse_return(),
            TokenKind::Check => self.parse_check(),
            TokenKind::Otherwise => {
                Err(self.current.span().wrap(Error::OtherwiseWithoutCheck))
            }
            TokenKind::Identifier if self.compare(Lookahead::Next, TokenKind::Eq, None) => {
                self.parse_assignment()
            }
            _ => {
                let expr = self.parse_expr()?;
                self.consume(TokenKind::Semicolon)?;
                Ok(expr)
            }
        }
    }

    /// Opens a new scope nested in the current one. Once the block is
    /// closed, the enclosing scope is the current one again.
    fn parse_block(&mut self) -> Result<Block> {
        self.enter()?;
        let open = self.consume(TokenKind::LBrace)?;
        let enclosing = self.scope;
        let scope = self.scopes.open(enclosing);
        self.scope = Some(scope);
        debug!(?scope, parent = ?enclosing, "entered block");

        let mut body = Vec::new();
        while !self.is(TokenKind::RBrace) && !self.is(TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        let close = self.consume(TokenKind::RBrace)?;

        self.scope = enclosing;
        self.leave();
        Ok(Block {
            scope,
            body,
            span: open.span().to(close.span()),
        })
    }

    fn parse_variable_declaration(&mut self) -> Result<Node> {
        let keyword = self.advance()?;
        let mutability = match keyword.kind {
            TokenKind::Varying => Mutability::Varying,
            TokenKind::Const => Mutability::Const,
            _ => unreachable!("not a declaration keyword"),
        };
        let name = self.parse_ident()?;
        self.consume(TokenKind::Colon)?;
        let ty = self.parse_type()?;

        let initializer = if self.take(TokenKind::Eq)? {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        if mutability == Mutability::Const && initializer.is_none() {
            let error = Error::UninitializedConstant { name: name.name };
            return Err(name.span.wrap(error));
        }
        let end = self.consume(TokenKind::Semicolon)?;

        Ok(Node {
            kind: NodeKind::VariableDeclaration(VariableDeclaration {
                mutability,
                name,
                ty,
                initializer,
            }),
            span: keyword.span().to(end.span()),
        })
    }

    fn parse_assignment(&mut self) -> Result<Node> {
        let target = self.parse_ident()?;
        self.consume(TokenKind::Eq)?;
        let value = self.parse_expr()?;
        let end = self.consume(TokenKind::Semicolon)?;
        Ok(Node {
            kind: NodeKind::VariableAssignment {
                target,
                value: Box::new(value),
            },
            span: target.span.to(end.span()),
        })
    }

    fn parse_function_definition(&mut self) -> Result<Node> {
        let keyword = self.consume(TokenKind::Procedure)?;
        let signature = self.parse_signature()?;
        let body = self.parse_block()?;
        let span = keyword.span().to(body.span);
        Ok(Node {
            kind: NodeKind::FunctionDefinition(FunctionDefinition { signature, body }),
            span,
        })
    }

    fn parse_extern(&mut self) -> Result<Node> {
        let keyword = self.consume(TokenKind::Extern)?;
        self.consume(TokenKind::Procedure)?;
        let signature = self.parse_signature()?;
        let end = self.consume(TokenKind::Semicolon)?;
        Ok(Node {
            kind: NodeKind::Extern(signature),
            span: keyword.span().to(end.span()),
        })
    }

    /// Parameters may be separated, or followed, by a single comma.
    fn parse_signature(&mut self) -> Result<Signature> {
        let name = self.parse_ident()?;
        self.consume(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.is(TokenKind::RParen) {
            let name = self.parse_ident()?;
            self.consume(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            params.push(FunctionParameter { name, ty });
            self.take(TokenKind::Comma)?;
        }
        self.consume(TokenKind::RParen)?;
        self.consume(TokenKind::Colon)?;
        let return_ty = self.parse_type()?;
        Ok(Signature {
            name,
            params,
            return_ty,
        })
    }

    fn parse_return(&mut self) -> Result<Node> {
        let keyword = self.consume(TokenKind::Return)?;
        let value = if self.is(TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        let end = self.consume(TokenKind::Semicolon)?;
        Ok(Node {
            kind: NodeKind::Return(value),
            span: keyword.span().to(end.span()),
        })
    }

    /// Parses a whole `check`/`otherwise` chain. Each link's span runs from
    /// its leading keyword up to the end of the chain.
    fn parse_check(&mut self) -> Result<Node> {
        let keyword = self.consume(TokenKind::Check)?;
        let condition = self.parse_condition()?;
        let body = self.parse_block()?;
        let mut links = vec![(keyword.span(), Some(condition), body)];

        while self.is(TokenKind::Otherwise) {
            let otherwise = self.advance()?;
            if links.last().is_some_and(|(_, condition, _)| condition.is_none()) {
                return Err(otherwise.span().wrap(Error::OtherwiseAfterUnconditional));
            }
            let condition = if self.take(TokenKind::Check)? {
                Some(self.parse_condition()?)
            } else {
                None
            };
            let body = self.parse_block()?;
            links.push((otherwise.span(), condition, body));
        }

        let mut chain: Option<Box<Node>> = None;
        while let Some((start, condition, body)) = links.pop() {
            let end = chain.as_ref().map_or(body.span, |next| next.span);
            let node = Node {
                kind: NodeKind::Check(Check {
                    condition,
                    body,
                    otherwise: chain,
                }),
                span: start.to(end),
            };
            chain = Some(Box::new(node));
        }
        match chain {
            Some(head) => Ok(*head),
            None => unreachable!("chain has at least one link"),
        }
    }

    fn parse_condition(&mut self) -> Result<Box<Node>> {
        self.consume(TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.consume(TokenKind::RParen)?;
        Ok(Box::new(condition))
    }

    fn parse_expr(&mut self) -> Result<Node> {
        self.enter()?;
        let lhs = self.parse_second_degree()?;
        let node = match additive_operator(self.current.kind) {
            Some(op) => {
                self.advance()?;
                // Recursing at the same level makes the operator right
                // associative.
                let rhs = self.parse_expr()?;
                binary(op, lhs, rhs)
            }
            None => lhs,
        };
        self.leave();
        Ok(node)
    }

    fn parse_second_degree(&mut self) -> Result<Node> {
        self.enter()?;
        let lhs = self.parse_atom()?;
        let node = match multiplicative_operator(self.current.kind) {
            Some(op) => {
                self.advance()?;
                let rhs = self.parse_second_degree()?;
                binary(op, lhs, rhs)
            }
            None => lhs,
        };
        self.leave();
        Ok(node)
    }

    fn parse_atom(&mut self) -> Result<Node> {
        if self.is(TokenKind::Identifier) && self.compare(Lookahead::Next, TokenKind::LParen, None)
        {
            return self.parse_call();
        }

        let token = self.advance()?;
        let span = token.span();
        let kind = match token.kind {
            // Grouping: the inner node covers the parentheses too.
            TokenKind::LParen => {
                let mut expr = self.parse_expr()?;
                let end = self.consume(TokenKind::RParen)?;
                expr.span = span.to(end.span());
                return Ok(expr);
            }
            TokenKind::Size => {
                self.consume(TokenKind::LBracket)?;
                let ty = self.parse_ident()?;
                let end = self.consume(TokenKind::RBracket)?;
                return Ok(Node {
                    kind: NodeKind::Size(ty),
                    span: span.to(end.span()),
                });
            }
            TokenKind::Int => NodeKind::Int(parse_int(&token.lexeme)),
            TokenKind::Float => {
                let Ok(value) = token.lexeme.parse() else {
                    unreachable!("lexer only produces well-formed floats");
                };
                NodeKind::Float(value)
            }
            TokenKind::String => NodeKind::String(token.lexeme),
            TokenKind::Identifier => NodeKind::Reference(Ident {
                name: self.idents.intern(&token.lexeme),
                span,
            }),
            _ => {
                return Err(span.wrap(Error::UnexpectedTokenInExpr { found: token }));
            }
        };
        Ok(Node { kind, span })
    }

    fn parse_call(&mut self) -> Result<Node> {
        let callee = self.parse_ident()?;
        self.consume(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.is(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.take(TokenKind::Comma)? {
                    break;
                }
            }
        }
        let end = self.consume(TokenKind::RParen)?;
        Ok(Node {
            kind: NodeKind::Call { callee, args },
            span: callee.span.to(end.span()),
        })
    }

    /// Type names are kept as placeholders, to be resolved by the semantic
    /// analysis.
    fn parse_type(&mut self) -> Result<Type> {
        self.parse_ident().map(Type::Placeholder)
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Ident {
            name: self.idents.intern(&token.lexeme),
            span: token.span(),
        })
    }
}

impl<'src, 'ident> Parser<'src, 'ident> {
    /// Fills both lookahead slots.
    fn new(src: &'src str, idents: &'ident mut Interner) -> Result<Parser<'src, 'ident>> {
        let mut lexer = Lexer::new(src);
        lexer.advance()?;
        let current = lexer.current().clone();
        lexer.advance()?;
        let next = lexer.current().clone();
        Ok(Parser {
            lexer,
            current,
            next,
            idents,
            scopes: ScopeTree::default(),
            scope: None,
            depth: 0,
        })
    }

    /// Descends one nesting level. Errors end the parse, so only successful
    /// paths need to [`leave`](Parser::leave).
    fn enter(&mut self) -> Result<()> {
        if self.depth == MAX_NESTING {
            return Err(self.current.span().wrap(Error::NestingTooDeep));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Shifts the next token into the current slot, pulling a single new
    /// token from the lexer. Returns the token that was current.
    fn advance(&mut self) -> Result<Token> {
        self.lexer.advance()?;
        let pulled = self.lexer.current().clone();
        let next = mem::replace(&mut self.next, pulled);
        Ok(mem::replace(&mut self.current, next))
    }

    /// Tests one of the lookahead tokens without consuming it. If `lexeme`
    /// is given, it must match exactly as well.
    fn compare(&self, which: Lookahead, kind: TokenKind, lexeme: Option<&str>) -> bool {
        let token = match which {
            Lookahead::Current => &self.current,
            Lookahead::Next => &self.next,
        };
        token.kind == kind && lexeme.is_none_or(|lexeme| *token.lexeme == *lexeme)
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.compare(Lookahead::Current, expect, None)
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> Result<bool> {
        if self.is(expect) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Advances if the current token matches the provided one, returning it.
    /// Otherwise fails.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        if self.is(expect) {
            return self.advance();
        }
        let found = self.current.clone();
        Err(found.span().wrap(Error::Unexpected {
            expected: expect,
            found,
        }))
    }
}

fn binary(op: BinaryOperator, lhs: Node, rhs: Node) -> Node {
    let span = lhs.span.to(rhs.span);
    Node {
        kind: NodeKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        span,
    }
}

fn additive_operator(kind: TokenKind) -> Option<BinaryOperator> {
    let op = match kind {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Sub,
        TokenKind::AndAnd => BinaryOperator::And,
        TokenKind::OrOr => BinaryOperator::Or,
        _ => return None,
    };
    Some(op)
}

fn multiplicative_operator(kind: TokenKind) -> Option<BinaryOperator> {
    let op = match kind {
        TokenKind::Star => BinaryOperator::Mul,
        TokenKind::Slash => BinaryOperator::Div,
        TokenKind::EqEq => BinaryOperator::Eq,
        TokenKind::NotEq => BinaryOperator::NotEq,
        TokenKind::Greater => BinaryOperator::Greater,
        TokenKind::Less => BinaryOperator::Less,
        _ => return None,
    };
    Some(op)
}

/// Literals too large for 128 bits saturate; the semantic analysis rejects
/// anything wider than a qword anyway.
fn parse_int(digits: &str) -> u128 {
    digits.bytes().fold(0u128, |acc, digit| {
        acc.saturating_mul(10)
            .saturating_add(u128::from(digit - b'0'))
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Lexer(lexer::Error),
    Unexpected {
        expected: TokenKind,
        found: Token,
    },
    UnexpectedTokenInExpr {
        found: Token,
    },
    UninitializedConstant {
        name: Interned,
    },
    OtherwiseWithoutCheck,
    /// Another link after the unconditional `otherwise`.
    OtherwiseAfterUnconditional,
    NestingTooDeep,
    /// The interner was used before and holds this built-in type name at
    /// another handle, or not at all.
    MisplacedBuiltin {
        name: &'static str,
    },
}

impl From<Spanned<lexer::Error>> for Spanned<Error> {
    fn from(error: Spanned<lexer::Error>) -> Self {
        error.map(Error::Lexer)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::util::test_utils::tree_tests;

    #[test]
    fn test_compare_lookahead() {
        let idents = &mut Interner::default();
        let mut p = Parser::new("x = 1;", idents).unwrap();
        assert!(p.compare(Lookahead::Current, TokenKind::Identifier, None));
        assert!(p.compare(Lookahead::Current, TokenKind::Identifier, Some("x")));
        assert!(!p.compare(Lookahead::Current, TokenKind::Identifier, Some("y")));
        assert!(p.compare(Lookahead::Next, TokenKind::Eq, Some("=")));

        let old = p.advance().unwrap();
        assert_eq!(&*old.lexeme, "x");
        assert!(p.is(TokenKind::Eq));
        assert!(p.compare(Lookahead::Next, TokenKind::Int, Some("1")));
    }

    #[test]
    fn test_scope_threading() {
        let idents = &mut Interner::default();
        let program = parse_program("{ { } } { }", idents).unwrap();
        let root = program.block().scope;

        let [first, second] = &program.block().body[..] else {
            panic!("expected two blocks");
        };
        let (NodeKind::Block(first), NodeKind::Block(second)) = (&first.kind, &second.kind)
        else {
            panic!("expected two blocks");
        };
        let NodeKind::Block(nested) = &first.body[0].kind else {
            panic!("expected nested block");
        };

        let scopes = &program.scopes;
        assert_eq!(scopes.len(), 4);
        assert_eq!(scopes.parent(root), None);
        assert_eq!(scopes.parent(first.scope), Some(root));
        assert_eq!(scopes.parent(nested.scope), Some(first.scope));
        assert_eq!(scopes.parent(second.scope), Some(root));
        assert_eq!(scopes.sub(root), Some(second.scope));
        assert_eq!(scopes.sub(first.scope), Some(nested.scope));
    }

    #[test]
    fn test_procedure_body_nests_in_enclosing_scope() {
        let idents = &mut Interner::default();
        let program = parse_program("procedure f(): void { }", idents).unwrap();
        let NodeKind::FunctionDefinition(def) = &program.block().body[0].kind else {
            panic!("expected procedure");
        };
        assert_eq!(
            program.scopes.parent(def.body.scope),
            Some(program.block().scope)
        );
    }

    #[test]
    fn test_nesting_limit() {
        let idents = &mut Interner::default();
        let sum = |terms: usize| vec!["1"; terms].join(" + ");

        assert!(parse_expr(&sum(200), idents).is_ok());
        let error = parse_expr(&sum(20_000), idents).unwrap_err();
        assert_eq!(error.inner, Error::NestingTooDeep);

        let parens = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
        let error = parse_expr(&parens, idents).unwrap_err();
        assert_eq!(error.inner, Error::NestingTooDeep);

        let blocks = format!("{}{}", "{ ".repeat(1000), "} ".repeat(1000));
        let error = parse_program(&blocks, idents).unwrap_err();
        assert_eq!(error.inner, Error::NestingTooDeep);
    }

    #[test]
    fn test_used_interner_must_hold_builtins() {
        let idents = &mut Interner::default();
        idents.intern("main");
        let error = parse_program("varying x: byte = 1;", idents).unwrap_err();
        assert_eq!(error.inner, Error::MisplacedBuiltin { name: "byte" });
        let error = parse_expr("1", idents).unwrap_err();
        assert_eq!(error.inner, Error::MisplacedBuiltin { name: "byte" });

        let idents = &mut Interner::default();
        parse_program("varying x: byte = 1;", idents).unwrap();
        let program = parse_program("varying y: byte = x;", idents).unwrap();
        assert_eq!(program.block().body.len(), 1);
    }

    #[test]
    fn test_int_saturates() {
        assert_eq!(parse_int("0"), 0);
        assert_eq!(parse_int("18446744073709551616"), 1 << 64);
        assert_eq!(parse_int(&"9".repeat(60)), u128::MAX);
    }

    tree_tests!(
        use parser;

        fn test_precedence_mul_over_add() {
            let expr = "a + b * c";
            let tree_ok = "
                binary Add (0..9)
                  ident a (0..1)
                  binary Mul (4..9)
                    ident b (4..5)
                    ident c (8..9)
            ";
        }

        fn test_precedence_add_after_mul() {
            let expr = "a * b + c";
            let tree_ok = "
                binary Add (0..9)
                  binary Mul (0..5)
                    ident a (0..1)
                    ident b (4..5)
                  ident c (8..9)
            ";
        }

        fn test_right_associative() {
            let expr = "a - b - c";
            let tree_ok = "
                binary Sub (0..9)
                  ident a (0..1)
                  binary Sub (4..9)
                    ident b (4..5)
                    ident c (8..9)
            ";
        }

        fn test_parenthesized() {
            let expr = "(a + b) * c";
            let tree_ok = "
                binary Mul (0..11)
                  binary Add (0..7)
                    ident a (1..2)
                    ident b (5..6)
                  ident c (10..11)
            ";
        }

        fn test_comparison_binds_tighter_than_logical() {
            let expr = "a == b && c != d";
            let tree_ok = "
                binary And (0..16)
                  binary Eq (0..6)
                    ident a (0..1)
                    ident b (5..6)
                  binary NotEq (10..16)
                    ident c (10..11)
                    ident d (15..16)
            ";
        }

        fn test_ordering_and_or() {
            let expr = "a > b || c < d";
            let tree_ok = "
                binary Or (0..14)
                  binary Greater (0..5)
                    ident a (0..1)
                    ident b (4..5)
                  binary Less (9..14)
                    ident c (9..10)
                    ident d (13..14)
            ";
        }

        fn test_call_with_args() {
            let expr = "f(1, x + 2)";
            let tree_ok = "
                call f (0..11)
                  int 1 (2..3)
                  binary Add (5..10)
                    ident x (5..6)
                    int 2 (9..10)
            ";
        }

        fn test_call_no_args() {
            let expr = "f()";
            let tree_ok = "call f (0..3)";
        }

        fn test_size() {
            let expr = "size[word]";
            let tree_ok = "size word (0..10)";
        }

        fn test_float_literal() {
            let expr = "1.5";
            let tree_ok = "float 1.5 (0..3)";
        }

        fn test_string_literal() {
            let expr = r#""hi there""#;
            let tree_ok = r#"string "hi there" (0..10)"#;
        }

        fn test_huge_int_saturates() {
            let expr = "340282366920938463463374607431768211456";
            let tree_ok = "int 340282366920938463463374607431768211455 (0..39)";
        }

        fn test_error_trailing_tokens() {
            let expr = "a b";
            let expected_errors = &["2..3: Parser: expected token Eof, but got Identifier"];
        }

        fn test_error_unclosed_paren() {
            let expr = "(1 + 2";
            let expected_errors = &["6..6: Parser: expected token RParen, but got Eof"];
        }

        fn test_variable_declaration() {
            let program = "varying x: byte = 1 + 2;";
            let tree_ok = "
                program (0..24)
                  varying x: ?byte (0..24)
                    binary Add (18..23)
                      int 1 (18..19)
                      int 2 (22..23)
            ";
        }

        fn test_error_declaration_missing_semicolon() {
            let program = "varying x: byte = 1 + 2";
            let expected_errors = &["23..23: Parser: expected token Semicolon, but got Eof"];
        }

        fn test_error_uninitialized_constant() {
            let program = "const y: word;";
            let expected_errors = &["6..7: Parser: constant y must be initialized"];
        }

        fn test_primed_statements() {
            let program = "
                varying x: byte = 1;
                x = x + 1;
            ";
            let tree_ok = "
                program (0..31)
                  varying x: ?byte (0..20)
                    int 1 (18..19)
                  assignment x (21..31)
                    binary Add (25..30)
                      ident x (25..26)
                      int 1 (29..30)
            ";
        }

        fn test_procedure_definition() {
            let program = "procedure add(a: byte, b: word): qword { return a + b; }";
            let tree_ok = "
                program (0..56)
                  procedure add(a: ?byte, b: ?word) : ?qword (0..56)
                    block (39..56)
                      return (41..54)
                        binary Add (48..53)
                          ident a (48..49)
                          ident b (52..53)
            ";
        }

        fn test_extern() {
            let program = "extern procedure puts(s: byte): void;";
            let tree_ok = "
                program (0..37)
                  extern procedure puts(s: ?byte) : ?void (0..37)
            ";
        }

        fn test_empty_return() {
            let program = "return;";
            let tree_ok = "
                program (0..7)
                  return (0..7)
            ";
        }

        fn test_nested_blocks() {
            let program = "{ varying x: byte = 1; { } }";
            let tree_ok = "
                program (0..28)
                  block (0..28)
                    varying x: ?byte (2..22)
                      int 1 (20..21)
                    block (23..26)
            ";
        }

        fn test_check_chain() {
            let program = "check (a) { } otherwise check (b) { } otherwise { }";
            let tree_ok = "
                program (0..51)
                  check (0..51)
                    ident a (7..8)
                    block (10..13)
                    otherwise check (14..51)
                      ident b (31..32)
                      block (34..37)
                      otherwise (38..51)
                        block (48..51)
            ";
        }

        fn test_error_two_unconditional_otherwise() {
            let program = "check (a) {} otherwise {} otherwise {}";
            let expected_errors = &["26..35: Parser: nothing may follow an unconditional otherwise"];
        }

        fn test_error_otherwise_without_check() {
            let program = "otherwise {}";
            let expected_errors = &["0..9: Parser: otherwise without a preceding check"];
        }

        fn test_error_unclosed_block() {
            let program = "{ x;";
            let expected_errors = &["4..4: Parser: expected token RBrace, but got Eof"];
        }

        fn test_error_unexpected_token_in_expr() {
            let program = "x = ;";
            let expected_errors = &["4..5: Parser: unexpected token Semicolon in expression"];
        }

        fn test_error_from_lexer() {
            let program = "varying s: byte = 1.;";
            let expected_errors = &["18..20: Lexer: float literal must not end with a dot"];
        }
    );
}
