use tracing::debug;

use crate::{
    ast::Program,
    lexer, parser, semantic,
    token::{Span, Spanned},
    util::intern::Interner,
};

/// The single diagnostic a failed run reports. Lexical errors travel inside
/// [`parser::Error::Lexer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    Syntax(Spanned<parser::Error>),
    Semantic(Spanned<semantic::Error>),
}

impl Diagnostic {
    pub fn span(&self) -> Span {
        match self {
            Diagnostic::Syntax(error) => error.span,
            Diagnostic::Semantic(error) => error.span,
        }
    }
}

#[derive(Debug)]
pub struct Failure {
    /// The partially analyzed program, if parsing succeeded.
    pub program: Option<Program>,
    pub diagnostic: Diagnostic,
}

/// Primes and parses `src`. Spans refer to the primed text.
pub fn parse(src: &str, idents: &mut Interner) -> Result<Program, Diagnostic> {
    let primed = lexer::prime(src);
    parser::parse_program(&primed, idents).map_err(|error| {
        debug!(error = ?error.inner, span = %error.span, "parsing failed");
        Diagnostic::Syntax(error)
    })
}

/// Runs the whole front end: prime, parse and analyze. Analysis only runs on
/// a successfully parsed program.
pub fn run(src: &str, idents: &mut Interner) -> Result<Program, Failure> {
    let mut program = parse(src, idents).map_err(|diagnostic| Failure {
        program: None,
        diagnostic,
    })?;
    debug!(scopes = program.scopes.len(), "parsed program");

    match semantic::analyze(&mut program) {
        Ok(()) => Ok(program),
        Err(error) => Err(Failure {
            program: Some(program),
            diagnostic: Diagnostic::Semantic(error),
        }),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::util::fmt::{Context, Show};

    fn render(idents: &Interner, diagnostic: &Diagnostic) -> String {
        let ctx = Context {
            ident_interner: idents,
        };
        format!("{}", diagnostic.display(&ctx))
    }

    #[test]
    fn test_run_ok() {
        let idents = &mut Interner::default();
        let program = run("varying x: byte = 1;\n{ x = 2; }\n", idents).unwrap();
        assert_eq!(program.scopes.len(), 2);
        assert_eq!(program.scopes.declarations(program.block().scope).len(), 1);
    }

    #[test]
    fn test_syntax_error_skips_analysis() {
        let idents = &mut Interner::default();
        let failure = run("varying x: nope = 1", idents).unwrap_err();
        assert!(failure.program.is_none());
        assert_eq!(
            render(idents, &failure.diagnostic),
            "Parser: expected token Semicolon, but got Eof"
        );
    }

    #[test]
    fn test_lexer_error_is_tagged() {
        let idents = &mut Interner::default();
        let failure = run("varying s: byte = \"open;", idents).unwrap_err();
        assert_eq!(failure.diagnostic.span(), Span::new_of_bounds(18..24));
        assert_eq!(
            render(idents, &failure.diagnostic),
            "Lexer: unclosed string literal"
        );
    }

    #[test]
    fn test_semantic_failure_keeps_program() {
        let idents = &mut Interner::default();
        let failure = run("varying a: byte = 1;\n\nvarying a: byte = 2;", idents).unwrap_err();
        let program = failure.program.unwrap();
        assert_eq!(program.scopes.declarations(program.block().scope).len(), 1);
        assert_eq!(
            render(idents, &failure.diagnostic),
            "SemanticAnalysis: a is already declared in this scope at 8..9"
        );
    }
}
