use core::any::{type_name, TypeId};
use core::fmt;
use core::hash::{Hash, Hasher};

/// Static type identity of a stored callable.
///
/// Two identities compare equal iff they were created from the same type.
/// The name is kept for diagnostics only.
#[derive(Clone, Copy)]
pub struct TypeIdentity {
    id: TypeId,
    name: &'static str,
}

impl TypeIdentity {
    /// Returns the identity of `T`.
    pub fn of<T: ?Sized + 'static>() -> TypeIdentity {
        TypeIdentity {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The identity reported by an empty function, the identity of `()`.
    pub fn none() -> TypeIdentity {
        TypeIdentity::of::<()>()
    }

    /// Returns true if this is the identity of `T`.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// The underlying [`TypeId`].
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The type name, as reported by [`core::any::type_name`].
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeIdentity {
    #[inline]
    fn eq(&self, other: &TypeIdentity) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeIdentity {}

impl Hash for TypeIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name)
    }
}
