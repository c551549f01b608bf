use tracing::debug;

use crate::{
    ast::{
        Block, Check, Declaration, ElementKind, Ident, Mutability, Node, NodeKind, Program,
        ScopeId, ScopeTree, Signature, VariableDeclaration,
    },
    token::{Span, Spanned},
    types::{builtins, PrimitiveType, Type, TypeRegistry},
    util::intern::Interned,
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Analyzes a parsed program in place.
///
/// Placeholder types of the analyzed declarations are replaced by their
/// resolution, and every accepted declaration is recorded in the scope of
/// its block. On failure, whatever was accepted before the failing statement
/// is kept.
pub fn analyze(program: &mut Program) -> Result<()> {
    let Program { root, scopes } = program;
    Analyzer::new(scopes).run(root)
}

pub struct Analyzer<'s> {
    registry: TypeRegistry,
    scopes: &'s mut ScopeTree,
}

impl<'s> Analyzer<'s> {
    pub fn new(scopes: &'s mut ScopeTree) -> Analyzer<'s> {
        Analyzer {
            registry: TypeRegistry::with_capacity(8),
            scopes,
        }
    }

    /// Analyzes the program rooted at `root`, stopping at the first error.
    pub fn run(mut self, root: &mut Node) -> Result<()> {
        let NodeKind::Program(block) = &mut root.kind else {
            unreachable!("analysis must start at the program node");
        };
        let result = self.analyse_block(block);
        if let Err(error) = &result {
            debug!(?error, "semantic analysis failed");
        }
        result
    }

    /// Analyzes each statement in order, up to the first failing one.
    fn analyse_block(&mut self, block: &mut Block) -> Result<()> {
        debug!(scope = ?block.scope, statements = block.body.len(), "analysing block");
        for node in &mut block.body {
            self.analyse_node(block.scope, node)?;
        }
        Ok(())
    }

    /// `scope` is the scope in which `node` appears.
    fn analyse_node(&mut self, scope: ScopeId, node: &mut Node) -> Result<()> {
        let span = node.span;
        match &mut node.kind {
            NodeKind::Program(block) | NodeKind::Block(block) => self.analyse_block(block),
            NodeKind::VariableDeclaration(decl) => self.analyse_variable_declaration(scope, decl),
            NodeKind::VariableAssignment { target, value } => {
                self.analyse_assignment(scope, *target, value)
            }
            // Only the signature is checked, the body is left alone.
            NodeKind::FunctionDefinition(def) => self.declare_procedure(scope, &mut def.signature),
            NodeKind::Extern(signature) => self.declare_procedure(scope, signature),
            NodeKind::Return(value) => {
                if let Some(value) = value {
                    self.analyse_expr(scope, value)?;
                }
                Ok(())
            }
            NodeKind::Check(check) => self.analyse_check(scope, check),
            expr @ (NodeKind::String(_)
            | NodeKind::Int(_)
            | NodeKind::Float(_)
            | NodeKind::Binary { .. }
            | NodeKind::Call { .. }
            | NodeKind::Reference(_)
            | NodeKind::Size(_)) => {
                self.analyse_expression(scope, expr, span)?;
                Ok(())
            }
        }
    }

    fn analyse_variable_declaration(
        &mut self,
        scope: ScopeId,
        decl: &mut VariableDeclaration,
    ) -> Result<()> {
        self.resolve_type(&mut decl.ty)?;
        self.check_redeclaration(scope, decl.name)?;

        if let Some(initializer) = &decl.initializer {
            let actual = self.analyse_expr(scope, initializer)?;
            if actual != decl.ty {
                return Err(initializer.span.wrap(Error::Mismatch {
                    expected: decl.ty.clone(),
                    actual,
                }));
            }
        }

        debug!(?scope, name = ?decl.name.name, ty = ?decl.ty, "declared variable");
        self.scopes.declare(
            scope,
            Declaration {
                kind: ElementKind::Variable(decl.mutability),
                name: decl.name,
                ty: decl.ty.clone(),
            },
        );
        Ok(())
    }

    fn analyse_assignment(&mut self, scope: ScopeId, target: Ident, value: &Node) -> Result<()> {
        let decl = self.find_element(scope, target)?;
        match decl.kind {
            ElementKind::Variable(Mutability::Varying) => (),
            ElementKind::Variable(Mutability::Const) => {
                let error = Error::AssignToConstant { name: target.name };
                return Err(target.span.wrap(error));
            }
            ElementKind::Function => {
                let error = Error::NotAVariable { name: target.name };
                return Err(target.span.wrap(error));
            }
        }
        let expected = decl.ty.clone();

        let actual = self.analyse_expr(scope, value)?;
        if actual != expected {
            return Err(value.span.wrap(Error::Mismatch { expected, actual }));
        }
        Ok(())
    }

    /// Registers a procedure (defined or external) in `scope`.
    fn declare_procedure(&mut self, scope: ScopeId, signature: &mut Signature) -> Result<()> {
        self.resolve_return_type(&mut signature.return_ty)?;
        self.check_redeclaration(scope, signature.name)?;

        debug!(?scope, name = ?signature.name.name, "declared procedure");
        self.scopes.declare(
            scope,
            Declaration {
                kind: ElementKind::Function,
                name: signature.name,
                ty: signature.return_ty.clone(),
            },
        );
        Ok(())
    }

    fn analyse_check(&mut self, scope: ScopeId, check: &mut Check) -> Result<()> {
        if let Some(condition) = &check.condition {
            self.analyse_expr(scope, condition)?;
        }
        self.analyse_block(&mut check.body)?;
        if let Some(otherwise) = &mut check.otherwise {
            self.analyse_node(scope, otherwise)?;
        }
        Ok(())
    }

    fn analyse_expr(&self, scope: ScopeId, node: &Node) -> Result<Type> {
        self.analyse_expression(scope, &node.kind, node.span)
    }

    /// Computes the type of an expression.
    fn analyse_expression(&self, scope: ScopeId, kind: &NodeKind, span: Span) -> Result<Type> {
        match kind {
            NodeKind::Binary { lhs, rhs, .. } => {
                let left = self.analyse_expr(scope, lhs)?;
                let right = self.analyse_expr(scope, rhs)?;
                if left.is_void() || right.is_void() {
                    return Err(span.wrap(Error::VoidOperand));
                }
                if left == right {
                    return Ok(left);
                }
                // Unequal primitives widen instead of failing.
                match left.wider(&right) {
                    Some(wider) => Ok(wider.clone()),
                    None => Err(span.wrap(Error::IncompatibleOperands { left, right })),
                }
            }
            NodeKind::Int(n) => PrimitiveType::fit_integer(*n)
                .map(Type::Primitive)
                .ok_or_else(|| span.wrap(Error::IntegerOutOfBounds)),
            // TODO: give floats a type of their own once code generation
            // needs to tell them apart from integers.
            NodeKind::Float(_) => Ok(Type::Primitive(PrimitiveType::Qword)),
            NodeKind::String(_) => Ok(Type::Void),
            NodeKind::Reference(ident) => {
                let decl = self.find_element(scope, *ident)?;
                match decl.kind {
                    ElementKind::Variable(_) => Ok(decl.ty.clone()),
                    ElementKind::Function => {
                        Err(ident.span.wrap(Error::NotAVariable { name: ident.name }))
                    }
                }
            }
            NodeKind::Call { callee, args } => {
                let decl = self.find_element(scope, *callee)?;
                if decl.kind != ElementKind::Function {
                    return Err(callee.span.wrap(Error::NotAProcedure { name: callee.name }));
                }
                let return_ty = decl.ty.clone();
                for arg in args {
                    self.analyse_expr(scope, arg)?;
                }
                Ok(return_ty)
            }
            NodeKind::Size(ty) => {
                self.resolve_name(*ty)?;
                Ok(Type::Primitive(PrimitiveType::Qword))
            }
            _ => unreachable!("not an expression: {kind:?}"),
        }
    }

    /// Walks the scope chain outwards from `scope`.
    fn find_element(&self, scope: ScopeId, ident: Ident) -> Result<&Declaration> {
        self.scopes
            .find_element(scope, ident.name)
            .ok_or_else(|| ident.span.wrap(Error::Undefined { name: ident.name }))
    }

    /// Fails if `name` is already declared in `scope` itself. Enclosing
    /// scopes may be shadowed.
    fn check_redeclaration(&self, scope: ScopeId, name: Ident) -> Result<()> {
        match self.scopes.find_local(scope, name.name) {
            Some(previous) => Err(name.span.wrap(Error::Redeclaration {
                name: name.name,
                previous: previous.name.span,
            })),
            None => Ok(()),
        }
    }

    /// Replaces a placeholder with the type it names. Resolved types are left
    /// untouched.
    fn resolve_type(&self, ty: &mut Type) -> Result<()> {
        if let Type::Placeholder(ident) = ty {
            *ty = self.resolve_name(*ident)?;
        }
        Ok(())
    }

    /// Like [`Analyzer::resolve_type`], but `void` is accepted as well.
    fn resolve_return_type(&self, ty: &mut Type) -> Result<()> {
        match ty {
            Type::Placeholder(ident) if ident.name == builtins::VOID => {
                *ty = Type::Void;
                Ok(())
            }
            _ => self.resolve_type(ty),
        }
    }

    fn resolve_name(&self, ident: Ident) -> Result<Type> {
        self.registry
            .resolve(ident.name)
            .ok_or_else(|| ident.span.wrap(Error::UnresolvedType { name: ident.name }))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    UnresolvedType {
        name: Interned,
    },
    Redeclaration {
        name: Interned,
        previous: Span,
    },
    Undefined {
        name: Interned,
    },
    NotAVariable {
        name: Interned,
    },
    NotAProcedure {
        name: Interned,
    },
    VoidOperand,
    /// Only primitives may be mixed in a binary expression. Declared types
    /// resolve to primitives alone, so this is reserved for complex operands.
    IncompatibleOperands {
        left: Type,
        right: Type,
    },
    IntegerOutOfBounds,
    Mismatch {
        expected: Type,
        actual: Type,
    },
    AssignToConstant {
        name: Interned,
    },
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        use semantic;

        fn test_declarations_resolve() {
            let program = "varying x: byte = 1; varying y: word = 256; varying z: word = x + y;";
            let tree_ok = "
                program (0..68)
                  varying x: byte (0..20)
                    int 1 (18..19)
                  varying y: word (21..43)
                    int 256 (39..42)
                  varying z: word (44..68)
                    binary Add (62..67)
                      ident x (62..63)
                      ident y (66..67)
            ";
        }

        fn test_binary_widens() {
            let program = "extern procedure big(): qword; varying b: byte = 1; varying q: qword = b + big();";
            let tree_ok = "
                program (0..81)
                  extern procedure big() : qword (0..30)
                  varying b: byte (31..51)
                    int 1 (49..50)
                  varying q: qword (52..81)
                    binary Add (71..80)
                      ident b (71..72)
                      call big (75..80)
            ";
        }

        fn test_shadowing_in_nested_block() {
            let program = "varying x: byte = 1; { varying x: word = 256; }";
            let tree_ok = "
                program (0..47)
                  varying x: byte (0..20)
                    int 1 (18..19)
                  block (21..47)
                    varying x: word (23..45)
                      int 256 (41..44)
            ";
        }

        fn test_check_chain() {
            let program = "varying x: byte = 1; check (x == 1) { varying y: byte = x; } otherwise { x = 2; }";
            let tree_ok = "
                program (0..81)
                  varying x: byte (0..20)
                    int 1 (18..19)
                  check (21..81)
                    binary Eq (28..34)
                      ident x (28..29)
                      int 1 (33..34)
                    block (36..60)
                      varying y: byte (38..58)
                        ident x (56..57)
                    otherwise (61..81)
                      block (71..81)
                        assignment x (73..79)
                          int 2 (77..78)
            ";
        }

        fn test_size_is_qword() {
            let program = "varying s: qword = size[word];";
            let tree_ok = "
                program (0..30)
                  varying s: qword (0..30)
                    size word (19..29)
            ";
        }

        fn test_float_is_qword() {
            let program = "varying f: qword = 1.5;";
            let tree_ok = "
                program (0..23)
                  varying f: qword (0..23)
                    float 1.5 (19..22)
            ";
        }

        fn test_procedure_body_not_analysed() {
            let program = "procedure f(a: byte): void { varying z: nope = a; }";
            let tree_ok = "
                program (0..51)
                  procedure f(a: ?byte) : void (0..51)
                    block (27..51)
                      varying z: ?nope (29..49)
                        ident a (47..48)
            ";
        }

        fn test_stops_at_first_failure() {
            let program = "varying a: byte = 1; varying b: byte = c; varying d: word = 256;";
            let tree_error = "
                program (0..64)
                  varying a: byte (0..20)
                    int 1 (18..19)
                  varying b: byte (21..41)
                    ident c (39..40)
                  varying d: ?word (42..64)
                    int 256 (60..63)
            ";
            let expected_errors = &["39..40: SemanticAnalysis: c is not defined"];
        }

        fn test_error_initializer_mismatch() {
            let program = "varying x: byte = 256;";
            let expected_errors = &["18..21: SemanticAnalysis: expected type byte, but got word"];
        }

        fn test_error_unresolved_type() {
            let program = "varying x: int = 1;";
            let expected_errors = &["11..14: SemanticAnalysis: unresolved type int"];
        }

        fn test_error_unresolved_return_type() {
            let program = "procedure f(): int {}";
            let expected_errors = &["15..18: SemanticAnalysis: unresolved type int"];
        }

        fn test_error_unresolved_size() {
            let program = "varying s: qword = size[foo];";
            let expected_errors = &["24..27: SemanticAnalysis: unresolved type foo"];
        }

        fn test_error_redeclaration() {
            let program = "varying x: byte = 1; varying x: byte = 2;";
            let expected_errors = &[
                "29..30: SemanticAnalysis: x is already declared in this scope at 8..9",
            ];
        }

        fn test_error_procedure_redeclaration() {
            let program = "extern procedure f(): void; procedure f(): void {}";
            let expected_errors = &[
                "38..39: SemanticAnalysis: f is already declared in this scope at 17..18",
            ];
        }

        fn test_error_void_operand() {
            let program = "procedure f(): void {} varying x: byte = f() + 1;";
            let expected_errors = &["41..48: SemanticAnalysis: cannot operate on void"];
        }

        fn test_error_not_a_variable() {
            let program = "procedure f(): void {} varying x: byte = f;";
            let expected_errors = &["41..42: SemanticAnalysis: f is not a variable"];
        }

        fn test_error_not_a_procedure() {
            let program = "varying x: byte = 1; varying y: byte = x();";
            let expected_errors = &["39..40: SemanticAnalysis: x is not a procedure"];
        }

        fn test_error_assign_to_constant() {
            let program = "const c: byte = 1; c = 2;";
            let expected_errors = &["19..20: SemanticAnalysis: cannot assign to constant c"];
        }

        fn test_error_integer_out_of_bounds() {
            let program = "varying x: qword = 18446744073709551616;";
            let expected_errors = &["19..39: SemanticAnalysis: integer exceeds bounds"];
        }

        fn test_error_assign_to_undefined() {
            let program = "y = 1;";
            let expected_errors = &["0..1: SemanticAnalysis: y is not defined"];
        }

        fn test_error_assign_to_procedure() {
            let program = "procedure f(): void {} f = 1;";
            let expected_errors = &["23..24: SemanticAnalysis: f is not a variable"];
        }

        fn test_error_call_undefined() {
            let program = "g();";
            let expected_errors = &["0..1: SemanticAnalysis: g is not defined"];
        }

        fn test_error_string_is_void() {
            let program = r#"varying s: byte = "hi";"#;
            let expected_errors = &["18..22: SemanticAnalysis: expected type byte, but got void"];
        }
    );
}
