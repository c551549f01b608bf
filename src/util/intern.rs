use std::{collections::HashMap, fmt, num::NonZeroU32, rc::Rc};

/// A handle to an interned identifier. Two handles obtained from the same
/// [`Interner`] are equal iff their strings are equal. To retrieve the
/// string, use [`Interner::get`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interned {
    // NonZeroU32 so that `Option<Interned>` stays four bytes wide.
    handle: NonZeroU32,
}

impl Interned {
    /// Builds a handle from its raw index. Used for the names which every
    /// interner registers first (see `types::builtins`).
    pub(crate) const fn from_raw(raw: u32) -> Interned {
        match NonZeroU32::new(raw) {
            Some(handle) => Interned { handle },
            None => panic!("interned handles start at one"),
        }
    }

    fn index(self) -> usize {
        self.handle.get() as usize - 1
    }
}

impl fmt::Debug for Interned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interned({})", self.handle)
    }
}

#[derive(Default)]
pub struct Interner {
    map: HashMap<Rc<str>, Interned>,
    names: Vec<Rc<str>>,
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.names.iter().enumerate().map(|(i, name)| (i + 1, name)))
            .finish()
    }
}

impl Interner {
    pub fn with_capacity(capacity: usize) -> Interner {
        Interner {
            map: HashMap::with_capacity(capacity),
            names: Vec::with_capacity(capacity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Interns `name`, returning the handle which identifies it from now on.
    pub fn intern(&mut self, name: &str) -> Interned {
        if let Some(&handle) = self.map.get(name) {
            return handle;
        }
        let raw = u32::try_from(self.names.len() + 1).expect("interner out of capacity");
        let handle = Interned::from_raw(raw);
        let key: Rc<str> = Rc::from(name);
        self.names.push(Rc::clone(&key));
        self.map.insert(key, handle);
        handle
    }

    /// Returns the handle of `name` if it was already interned.
    pub fn lookup(&self, name: &str) -> Option<Interned> {
        self.map.get(name).copied()
    }

    /// Returns the string behind `handle`. Panics if the handle was produced
    /// by another interner with fewer entries.
    pub fn get(&self, handle: impl Into<Interned>) -> &str {
        &self.names[handle.into().index()]
    }
}
