/// The lexer takes the primed source input, mapping it into a stream of
/// tokens, one at a time.
pub mod lexer;

/// The parser pulls tokens from the lexer, mapping them into an AST whose
/// blocks are linked into a scope tree.
pub mod parser;

/// The semantic analysis resolves the declared types, checks the scoping of
/// every name, and types expressions.
pub mod semantic;

/// Wires up the stages, stopping at the first failing one.
pub mod pipeline;

pub mod ast;
pub mod token;
pub mod types;

pub mod util {
    pub mod fmt;
    pub mod intern;
    #[cfg(test)]
    pub(crate) mod test_utils;
}
