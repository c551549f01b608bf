#![allow(clippy::items_after_statements)]

use std::fmt::{Formatter, Result};

use crate::{
    lexer, parser,
    pipeline::Diagnostic,
    semantic,
    token::{Span, Spanned},
    util::fmt::{Context, Show},
};

/// Writes the span (in the alternate form only) and the stage tag.
fn stage(f: &mut Formatter<'_>, span: Span, stage: &str) -> Result {
    if f.alternate() {
        write!(f, "{span}: ")?;
    }
    write!(f, "{stage}: ")
}

impl Show for Spanned<lexer::Error> {
    fn show(&self, f: &mut Formatter<'_>, _: &Context<'_>) -> Result {
        stage(f, self.span, "Lexer")?;
        show_lexer_error(f, &self.inner)
    }
}

fn show_lexer_error(f: &mut Formatter<'_>, error: &lexer::Error) -> Result {
    use lexer::Error::*;
    match error {
        UnexpectedChar(c) => write!(f, "failed to classify leading character {c:?}"),
        UnclosedString => write!(f, "unclosed string literal"),
        FloatTrailingDot => write!(f, "float literal must not end with a dot"),
    }
}

impl Show for Spanned<parser::Error> {
    fn show(&self, f: &mut Formatter<'_>, ctx: &Context<'_>) -> Result {
        let i = ctx.ident_interner;
        let Spanned { span, inner: error } = self;

        use parser::Error::*;
        if let Lexer(error) = error {
            stage(f, *span, "Lexer")?;
            return show_lexer_error(f, error);
        }
        stage(f, *span, "Parser")?;
        match error {
            Lexer(_) => unreachable!("shown above"),
            Unexpected { expected, found } => {
                write!(f, "expected token {expected:?}, but got {:?}", found.kind)
            }
            UnexpectedTokenInExpr { found } => {
                write!(f, "unexpected token {:?} in expression", found.kind)
            }
            UninitializedConstant { name } => {
                let name = i.get(*name);
                write!(f, "constant {name} must be initialized")
            }
            OtherwiseWithoutCheck => write!(f, "otherwise without a preceding check"),
            OtherwiseAfterUnconditional => {
                write!(f, "nothing may follow an unconditional otherwise")
            }
            NestingTooDeep => {
                write!(f, "nesting exceeds {} levels", parser::MAX_NESTING)
            }
            MisplacedBuiltin { name } => {
                write!(f, "built-in type {name} is not at its reserved handle")
            }
        }
    }
}

impl Show for Spanned<semantic::Error> {
    fn show(&self, f: &mut Formatter<'_>, ctx: &Context<'_>) -> Result {
        let i = ctx.ident_interner;
        let Spanned { span, inner: error } = self;
        stage(f, *span, "SemanticAnalysis")?;

        use semantic::Error::*;
        match error {
            UnresolvedType { name } => {
                let name = i.get(*name);
                write!(f, "unresolved type {name}")
            }
            Redeclaration { name, previous } => {
                let name = i.get(*name);
                write!(f, "{name} is already declared in this scope at {previous}")
            }
            Undefined { name } => {
                let name = i.get(*name);
                write!(f, "{name} is not defined")
            }
            NotAVariable { name } => {
                let name = i.get(*name);
                write!(f, "{name} is not a variable")
            }
            NotAProcedure { name } => {
                let name = i.get(*name);
                write!(f, "{name} is not a procedure")
            }
            VoidOperand => write!(f, "cannot operate on void"),
            IncompatibleOperands { left, right } => write!(
                f,
                "cannot operate on conflicting types {} and {}",
                left.display(ctx),
                right.display(ctx)
            ),
            IntegerOutOfBounds => write!(f, "integer exceeds bounds"),
            Mismatch { expected, actual } => write!(
                f,
                "expected type {}, but got {}",
                expected.display(ctx),
                actual.display(ctx)
            ),
            AssignToConstant { name } => {
                let name = i.get(*name);
                write!(f, "cannot assign to constant {name}")
            }
        }
    }
}

impl Show for Diagnostic {
    fn show(&self, f: &mut Formatter<'_>, ctx: &Context<'_>) -> Result {
        match self {
            Diagnostic::Syntax(error) => error.show(f, ctx),
            Diagnostic::Semantic(error) => error.show(f, ctx),
        }
    }
}
