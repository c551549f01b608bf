// program ::= statement*
// statement ::= var-decl | assignment | procedure | extern | block | return
//             | check | expr ';'
// var-decl ::= ('varying' | 'const') ID ':' TYPE ['=' expr] ';'
// assignment ::= ID '=' expr ';'
// procedure ::= 'procedure' signature block
// extern ::= 'extern' 'procedure' signature ';'
// signature ::= ID '(' (ID ':' TYPE [','])* ')' ':' TYPE
// block ::= '{' statement* '}'
// return ::= 'return' [expr] ';'
// check ::= 'check' '(' expr ')' block ('otherwise' ['check' '(' expr ')'] block)*
// expr ::= second [('+' | '-' | '&&' | '||') expr]
// second ::= atom [('*' | '/' | '==' | '>' | '<' | '!=') second]
// atom ::= '(' expr ')'
//        | 'size' '[' TYPE ']'
//        | ID '(' [expr (',' expr)*] ')'
//        | integer
//        | float
//        | string
//        | ID

// Precedence
//
// * / == > < !=
// + - && ||
//
// Both levels associate to the right.

use crate::{token::Span, types::Type, util::intern::Interned};

#[derive(Debug)]
pub struct Program {
    /// Always a [`NodeKind::Program`].
    pub root: Node,
    pub scopes: ScopeTree,
}

impl Program {
    /// The implicit top-level block.
    pub fn block(&self) -> &Block {
        match &self.root.kind {
            NodeKind::Program(block) => block,
            _ => unreachable!("program root must be a program node"),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum NodeKind {
    Program(Block),
    String(Box<str>),
    /// Literals wider than 128 bits saturate.
    Int(u128),
    Float(f64),
    VariableDeclaration(VariableDeclaration),
    VariableAssignment {
        target: Ident,
        value: Box<Node>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Call {
        callee: Ident,
        args: Vec<Node>,
    },
    Reference(Ident),
    Block(Block),
    FunctionDefinition(FunctionDefinition),
    Return(Option<Box<Node>>),
    Check(Check),
    /// `size[TYPE]`
    Size(Ident),
    /// A procedure defined outside of the program.
    Extern(Signature),
}

/// A lexical scope. Its declarations live in the program's [`ScopeTree`].
#[derive(Debug, PartialEq)]
pub struct Block {
    pub scope: ScopeId,
    pub body: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub struct VariableDeclaration {
    pub mutability: Mutability,
    pub name: Ident,
    /// A placeholder until the semantic analysis resolves it.
    pub ty: Type,
    pub initializer: Option<Box<Node>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mutability {
    Varying,
    Const,
}

#[derive(Debug, PartialEq)]
pub struct FunctionDefinition {
    pub signature: Signature,
    pub body: Block,
}

#[derive(Debug, PartialEq)]
pub struct Signature {
    pub name: Ident,
    pub params: Vec<FunctionParameter>,
    pub return_ty: Type,
}

#[derive(Debug, PartialEq)]
pub struct FunctionParameter {
    pub name: Ident,
    pub ty: Type,
}

/// One link of a `check`/`otherwise` chain.
#[derive(Debug, PartialEq)]
pub struct Check {
    /// `None` for the final, unconditional `otherwise`.
    pub condition: Option<Box<Node>>,
    pub body: Block,
    /// The next link, always a [`NodeKind::Check`].
    pub otherwise: Option<Box<Node>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    And,
    Or,
    Mul,
    Div,
    Eq,
    NotEq,
    Greater,
    Less,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub name: Interned,
    pub span: Span,
}

impl From<Ident> for Interned {
    fn from(value: Ident) -> Self {
        value.name
    }
}

impl From<&Ident> for Interned {
    fn from(value: &Ident) -> Self {
        value.name
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

/// Arena holding every scope of a program.
///
/// Scopes reference each other by [`ScopeId`]; the tree of blocks alone
/// decides how long scopes live.
#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

#[derive(Debug)]
struct Scope {
    /// The enclosing scope.
    parent: Option<ScopeId>,
    /// The most recently opened nested scope.
    sub: Option<ScopeId>,
    declarations: Vec<Declaration>,
}

/// An accepted declaration, as recorded by the semantic analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub kind: ElementKind,
    pub name: Ident,
    /// The variable's type, or the procedure's return type.
    pub ty: Type,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Variable(Mutability),
    Function,
}

impl ScopeTree {
    /// Opens a new scope nested in `parent`, which then points at it as its
    /// most recent sub scope.
    pub fn open(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(u32::try_from(self.scopes.len()).expect("too many scopes"));
        self.scopes.push(Scope {
            parent,
            sub: None,
            declarations: Vec::new(),
        });
        if let Some(parent) = parent {
            self.get_mut(parent).sub = Some(id);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).parent
    }

    pub fn sub(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).sub
    }

    pub fn declarations(&self, id: ScopeId) -> &[Declaration] {
        &self.get(id).declarations
    }

    pub fn declare(&mut self, id: ScopeId, declaration: Declaration) {
        self.get_mut(id).declarations.push(declaration);
    }

    /// Searches `id` alone, ignoring the enclosing scopes.
    pub fn find_local(&self, id: ScopeId, name: Interned) -> Option<&Declaration> {
        self.declarations(id).iter().find(|d| d.name.name == name)
    }

    /// Searches `id`, then each enclosing scope outwards. The innermost match
    /// wins.
    pub fn find_element(&self, id: ScopeId, name: Interned) -> Option<&Declaration> {
        let mut scope = Some(id);
        while let Some(current) = scope {
            if let Some(declaration) = self.find_local(current, name) {
                return Some(declaration);
            }
            scope = self.parent(current);
        }
        None
    }

    fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }
}
