use std::io::Write;

use crate::{
    ast::*,
    token::Span,
    util::{
        fmt::{Context, Show},
        intern::Interner,
    },
};

const INDENT_WIDTH: usize = 2;

pub fn print_program_string(idents: &Interner, program: &Program) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, idents, program).expect("writing to a Vec never fails");
    String::from_utf8(buf).expect("tree output is UTF-8")
}

pub fn print_node_string(idents: &Interner, node: &Node) -> String {
    let mut buf = Vec::with_capacity(512);
    print_node(&mut buf, idents, 0, node).expect("writing to a Vec never fails");
    String::from_utf8(buf).expect("tree output is UTF-8")
}

pub fn print_program(
    w: &mut impl Write,
    idents: &Interner,
    program: &Program,
) -> std::io::Result<()> {
    print_node(w, idents, 0, &program.root)
}

pub fn print_node(
    w: &mut impl Write,
    idents: &Interner,
    i: usize,
    node: &Node,
) -> std::io::Result<()> {
    let ctx = &Context {
        ident_interner: idents,
    };
    let span = node.span;
    sp(w, i)?;
    match &node.kind {
        NodeKind::Program(block) => {
            writeln!(w, "program ({span})")?;
            print_body(w, idents, i + 1, block)?;
        }
        NodeKind::String(val) => writeln!(w, "string {val:?} ({span})")?,
        NodeKind::Int(val) => writeln!(w, "int {val} ({span})")?,
        NodeKind::Float(val) => writeln!(w, "float {val:?} ({span})")?,
        NodeKind::VariableDeclaration(VariableDeclaration {
            mutability,
            name,
            ty,
            initializer,
        }) => {
            let keyword = match mutability {
                Mutability::Varying => "varying",
                Mutability::Const => "const",
            };
            let name = idents.get(name);
            writeln!(w, "{keyword} {name}: {} ({span})", ty.display(ctx))?;
            if let Some(initializer) = initializer {
                print_node(w, idents, i + 1, initializer)?;
            }
        }
        NodeKind::VariableAssignment { target, value } => {
            writeln!(w, "assignment {} ({span})", idents.get(target))?;
            print_node(w, idents, i + 1, value)?;
        }
        NodeKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?} ({span})")?;
            print_node(w, idents, i + 1, lhs)?;
            print_node(w, idents, i + 1, rhs)?;
        }
        NodeKind::Call { callee, args } => {
            writeln!(w, "call {} ({span})", idents.get(callee))?;
            for arg in args {
                print_node(w, idents, i + 1, arg)?;
            }
        }
        NodeKind::Reference(ident) => writeln!(w, "ident {} ({span})", idents.get(ident))?,
        NodeKind::Block(block) => {
            writeln!(w, "block ({span})")?;
            print_body(w, idents, i + 1, block)?;
        }
        NodeKind::FunctionDefinition(FunctionDefinition { signature, body }) => {
            write!(w, "procedure ")?;
            print_signature(w, ctx, signature)?;
            writeln!(w, " ({span})")?;
            print_block(w, idents, i + 1, body)?;
        }
        NodeKind::Return(value) => {
            writeln!(w, "return ({span})")?;
            if let Some(value) = value {
                print_node(w, idents, i + 1, value)?;
            }
        }
        NodeKind::Check(check) => print_check(w, idents, i, "check", span, check)?,
        NodeKind::Size(ty) => writeln!(w, "size {} ({span})", idents.get(ty))?,
        NodeKind::Extern(signature) => {
            write!(w, "extern procedure ")?;
            print_signature(w, ctx, signature)?;
            writeln!(w, " ({span})")?;
        }
    }
    Ok(())
}

fn print_body(
    w: &mut impl Write,
    idents: &Interner,
    i: usize,
    block: &Block,
) -> std::io::Result<()> {
    for statement in &block.body {
        print_node(w, idents, i, statement)?;
    }
    Ok(())
}

fn print_block(
    w: &mut impl Write,
    idents: &Interner,
    i: usize,
    block: &Block,
) -> std::io::Result<()> {
    sp(w, i)?;
    writeln!(w, "block ({})", block.span)?;
    print_body(w, idents, i + 1, block)
}

/// The chain's links are nested one level deeper than the link they follow.
fn print_check(
    w: &mut impl Write,
    idents: &Interner,
    i: usize,
    label: &str,
    span: Span,
    check: &Check,
) -> std::io::Result<()> {
    writeln!(w, "{label} ({span})")?;
    if let Some(condition) = &check.condition {
        print_node(w, idents, i + 1, condition)?;
    }
    print_block(w, idents, i + 1, &check.body)?;
    if let Some(link) = &check.otherwise {
        let NodeKind::Check(next) = &link.kind else {
            unreachable!("otherwise links are checks");
        };
        let label = if next.condition.is_some() {
            "otherwise check"
        } else {
            "otherwise"
        };
        sp(w, i + 1)?;
        print_check(w, idents, i + 1, label, link.span, next)?;
    }
    Ok(())
}

fn print_signature(
    w: &mut impl Write,
    ctx: &Context<'_>,
    signature: &Signature,
) -> std::io::Result<()> {
    let idents = ctx.ident_interner;
    write!(w, "{}(", idents.get(signature.name))?;
    for (idx, param) in signature.params.iter().enumerate() {
        if idx > 0 {
            write!(w, ", ")?;
        }
        write!(w, "{}: {}", idents.get(param.name), param.ty.display(ctx))?;
    }
    write!(w, ") : {}", signature.return_ty.display(ctx))
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}
