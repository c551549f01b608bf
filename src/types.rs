use std::{collections::HashMap, rc::Rc};

use crate::{ast::Ident, util::intern::Interned};

#[derive(Clone, Debug)]
pub enum Type {
    Void,
    Primitive(PrimitiveType),
    /// A user defined aggregate.
    Complex(Rc<ComplexType>),
    /// A type name as written in the source, not resolved yet.
    Placeholder(Ident),
}

impl Type {
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Type::Placeholder(_))
    }

    /// Width in bits. Only primitives have one.
    pub fn bits(&self) -> Option<u32> {
        match self {
            Type::Primitive(primitive) => Some(primitive.bits()),
            _ => None,
        }
    }

    /// Returns the wider of two primitive types (`other` on a tie), or `None`
    /// if either isn't a primitive.
    pub fn wider<'a>(&'a self, other: &'a Type) -> Option<&'a Type> {
        let (a, b) = (self.bits()?, other.bits()?);
        Some(if a > b { self } else { other })
    }
}

/// Void equals void; primitives compare by width; complex types and
/// placeholders compare by name.
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Void, Type::Void) => true,
            (Type::Primitive(a), Type::Primitive(b)) => a == b,
            (Type::Complex(a), Type::Complex(b)) => a.name.name == b.name.name,
            (Type::Placeholder(a), Type::Placeholder(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl From<&Type> for Interned {
    fn from(value: &Type) -> Self {
        match value {
            Type::Void => builtins::VOID,
            Type::Primitive(primitive) => primitive.name(),
            Type::Complex(complex) => complex.name.name,
            Type::Placeholder(ident) => ident.name,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveType {
    Byte,
    Word,
    Dword,
    Qword,
}

impl PrimitiveType {
    /// Ordered from the narrowest to the widest.
    pub const ALL: [PrimitiveType; 4] = [
        PrimitiveType::Byte,
        PrimitiveType::Word,
        PrimitiveType::Dword,
        PrimitiveType::Qword,
    ];

    pub fn bits(self) -> u32 {
        match self {
            PrimitiveType::Byte => 8,
            PrimitiveType::Word => 16,
            PrimitiveType::Dword => 32,
            PrimitiveType::Qword => 64,
        }
    }

    pub fn name(self) -> Interned {
        match self {
            PrimitiveType::Byte => builtins::BYTE,
            PrimitiveType::Word => builtins::WORD,
            PrimitiveType::Dword => builtins::DWORD,
            PrimitiveType::Qword => builtins::QWORD,
        }
    }

    /// The narrowest primitive `w` such that `n < 2^w`.
    pub fn fit_integer(n: u128) -> Option<PrimitiveType> {
        let needed = u128::BITS - n.leading_zeros();
        Self::ALL.into_iter().find(|primitive| primitive.bits() >= needed)
    }
}

#[derive(Debug)]
pub struct ComplexType {
    pub name: Ident,
    pub fields: Vec<ComplexField>,
}

impl ComplexType {
    pub fn field(&self, name: Interned) -> Option<&ComplexField> {
        self.fields.iter().find(|field| field.name.name == name)
    }
}

#[derive(Debug)]
pub struct ComplexField {
    pub name: Ident,
    pub ty: Type,
}

/// The types known to the semantic analysis.
pub struct TypeRegistry {
    complex: HashMap<Interned, Rc<ComplexType>>,
}

impl TypeRegistry {
    pub fn with_capacity(capacity: usize) -> TypeRegistry {
        TypeRegistry {
            complex: HashMap::with_capacity(capacity),
        }
    }

    pub fn primitive(&self, name: Interned) -> Option<PrimitiveType> {
        PrimitiveType::ALL
            .into_iter()
            .find(|primitive| primitive.name() == name)
    }

    /// Looks up a placeholder's name.
    ///
    /// Only the primitive table is consulted: user defined types are recorded
    /// but never resolved to.
    pub fn resolve(&self, name: Interned) -> Option<Type> {
        self.primitive(name).map(Type::Primitive)
    }

    pub fn complex(&self, name: Interned) -> Option<&Rc<ComplexType>> {
        self.complex.get(&name)
    }

    /// Attempts to define the provided aggregate.
    ///
    /// Fails if a type with the same name is already defined.
    pub fn define_complex(&mut self, ty: ComplexType) -> Result<Type, ()> {
        let name = ty.name.name;
        if self.primitive(name).is_some() || name == builtins::VOID || self.complex.contains_key(&name) {
            return Err(());
        }
        let ty = Rc::new(ty);
        self.complex.insert(name, Rc::clone(&ty));
        Ok(Type::Complex(ty))
    }
}

/// Names every interner registers before anything else, so that their
/// handles are known statically.
pub mod builtins {
    use crate::util::intern::{Interned, Interner};

    pub const BYTE: Interned = Interned::from_raw(1);
    pub const WORD: Interned = Interned::from_raw(2);
    pub const DWORD: Interned = Interned::from_raw(3);
    pub const QWORD: Interned = Interned::from_raw(4);
    pub const VOID: Interned = Interned::from_raw(5);

    pub const ALL: &[(Interned, &str)] = &[
        (BYTE, "byte"),
        (WORD, "word"),
        (DWORD, "dword"),
        (QWORD, "qword"),
        (VOID, "void"),
    ];

    /// Registers the built-in names into a fresh interner. An interner that
    /// is already in use must hold every built-in at its fixed handle;
    /// otherwise the first misplaced name is returned.
    pub fn prepare(idents: &mut Interner) -> Result<(), &'static str> {
        if idents.is_empty() {
            register(idents);
            return Ok(());
        }
        match ALL
            .iter()
            .find(|&&(handle, name)| idents.lookup(name) != Some(handle))
        {
            Some(&(_, name)) => Err(name),
            None => Ok(()),
        }
    }

    /// Registers the built-in names into a fresh interner.
    pub fn register(idents: &mut Interner) {
        assert!(idents.is_empty(), "built-ins must be registered first");
        for &(expected, name) in ALL {
            let handle = idents.intern(name);
            assert_eq!(handle, expected);
        }
    }
}
