//! Stable declaration handles
//!
//! Declarations are never held by reference across snapshots. A [`DeclId`] is
//! an arena key that stays valid for the lifetime of a pipeline; a [`Ref<T>`]
//! adds the expected declaration variant and is resolved against whichever
//! [`Compilation`](super::Compilation) snapshot is current.

use super::{Declaration, DeclarationVariant};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Arena key of a declaration; never reused within a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclId(pub u32);

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Typed handle to a declaration of variant `T`
pub struct Ref<T> {
    id: DeclId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Ref<T> {
    pub fn new(id: DeclId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> DeclId {
        self.id
    }
}

impl<T: DeclarationVariant> Ref<T> {
    /// Typed handle for `id` if `declaration` is of variant `T`
    pub fn try_from_declaration(id: DeclId, declaration: &Declaration) -> Option<Self> {
        T::extract(declaration).map(|_| Ref::new(id))
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ref<T> {}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Ref<T> {}

impl<T> PartialOrd for Ref<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Ref<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T> Hash for Ref<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({})", self.id)
    }
}

impl<T> From<Ref<T>> for DeclId {
    fn from(r: Ref<T>) -> Self {
        r.id
    }
}

impl<T> Serialize for Ref<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.id.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Ref<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        DeclId::deserialize(deserializer).map(Ref::new)
    }
}

/// Hands out fresh declaration ids for builders
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn starting_at(next: u32) -> Self {
        Self { next }
    }

    pub fn allocate(&mut self) -> DeclId {
        let id = DeclId(self.next);
        self.next += 1;
        id
    }

    pub fn peek(&self) -> u32 {
        self.next
    }
}
