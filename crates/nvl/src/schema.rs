//! Declarative mapping of Rust objects onto lists.
//!
//! A schema is built from field descriptors chained with `>>` (or
//! [`Serializer::then`]):
//!
//! - [`Field`] stores one member under a key through the codec registry
//!   (built with [`nv_field!`](crate::nv_field));
//! - [`ObjectField`] inlines a member's own schema into the same list
//!   (built with [`nv_object!`](crate::nv_object));
//! - [`Literal`] writes a fixed string and insists on reading it back.
//!
//! Fields serialize and deserialize strictly in the declared order.
//!
//! ```
//! use nvl::prelude::*;
//! use nvl::{nv_field, schema::{Field, Literal, Sequence}};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Point {
//!     x: u64,
//!     y: u64,
//! }
//!
//! impl NvSchema for Point {
//!     type Schema = Sequence<Sequence<Literal, Field<Point, u64>>, Field<Point, u64>>;
//!
//!     fn schema() -> Self::Schema {
//!         Literal::new("kind", "point") >> nv_field!("x", Point, x) >> nv_field!("y", Point, y)
//!     }
//! }
//!
//! let nvl = nvl::serialize(&Point { x: 1, y: 2 }).unwrap();
//! assert_eq!(nvl.get_string("kind").unwrap(), "point");
//!
//! let mut back = Point::default();
//! nvl::deserialize(&nvl, &mut back).unwrap();
//! assert_eq!(back, Point { x: 1, y: 2 });
//! ```

use std::fmt;
use std::ops::Shr;

use tracing::debug;

use crate::codec::{NvDecodeOwned, NvEncode};
use crate::error::{NvError, NvResult};
use crate::handle::{ConstNvList, NvList};
use crate::read::NvRead;

/// Something that can write an `O` into a list and read it back.
pub trait Serializer<O: ?Sized> {
    fn serialize(&self, nvl: &mut NvList, object: &O) -> NvResult<()>;

    fn deserialize(&self, nvl: ConstNvList<'_>, object: &mut O) -> NvResult<()>;

    /// Run `self`, then `next`.
    fn then<B>(self, next: B) -> Sequence<Self, B>
    where
        Self: Sized,
        B: Serializer<O>,
    {
        Sequence::new(self, next)
    }
}

impl<O: ?Sized, S: Serializer<O> + ?Sized> Serializer<O> for Box<S> {
    fn serialize(&self, nvl: &mut NvList, object: &O) -> NvResult<()> {
        (**self).serialize(nvl, object)
    }

    fn deserialize(&self, nvl: ConstNvList<'_>, object: &mut O) -> NvResult<()> {
        (**self).deserialize(nvl, object)
    }
}

/// Types with a registered schema.
pub trait NvSchema {
    type Schema: Serializer<Self>;

    fn schema() -> Self::Schema;
}

/// Marker for the field descriptor types that `>>` chains.
pub trait FieldDescriptor {}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// One member of `O`, stored under `name` with `M`'s codec.
pub struct Field<O: ?Sized, M> {
    name: String,
    get: fn(&O) -> &M,
    get_mut: fn(&mut O) -> &mut M,
}

impl<O: ?Sized, M> Field<O, M> {
    /// Bind `name` to the member reached through `get` / `get_mut`.
    /// [`nv_field!`](crate::nv_field) writes the accessors for you.
    pub fn new(name: impl Into<String>, get: fn(&O) -> &M, get_mut: fn(&mut O) -> &mut M) -> Self {
        Self {
            name: name.into(),
            get,
            get_mut,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<O: ?Sized, M> Serializer<O> for Field<O, M>
where
    M: NvEncode + NvDecodeOwned,
{
    fn serialize(&self, nvl: &mut NvList, object: &O) -> NvResult<()> {
        (self.get)(object).encode(nvl, &self.name)
    }

    fn deserialize(&self, nvl: ConstNvList<'_>, object: &mut O) -> NvResult<()> {
        *(self.get_mut)(object) = M::decode(nvl, &self.name)?;
        Ok(())
    }
}

impl<O: ?Sized, M> fmt::Debug for Field<O, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}

// ---------------------------------------------------------------------------
// ObjectField
// ---------------------------------------------------------------------------

/// A member whose type has its own schema. Its fields are written into the
/// same list as the parent's, not into a nested list.
pub struct ObjectField<O: ?Sized, M> {
    get: fn(&O) -> &M,
    get_mut: fn(&mut O) -> &mut M,
}

impl<O: ?Sized, M> ObjectField<O, M> {
    pub fn new(get: fn(&O) -> &M, get_mut: fn(&mut O) -> &mut M) -> Self {
        Self { get, get_mut }
    }
}

impl<O: ?Sized, M: NvSchema> Serializer<O> for ObjectField<O, M> {
    fn serialize(&self, nvl: &mut NvList, object: &O) -> NvResult<()> {
        M::schema().serialize(nvl, (self.get)(object))
    }

    fn deserialize(&self, nvl: ConstNvList<'_>, object: &mut O) -> NvResult<()> {
        M::schema().deserialize(nvl, (self.get_mut)(object))
    }
}

impl<O: ?Sized, M> fmt::Debug for ObjectField<O, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectField").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Literal
// ---------------------------------------------------------------------------

/// A fixed string under a fixed key, independent of the object. Reading
/// back any other value fails with [`NvError::KeyNotFound`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Literal {
    name: String,
    value: String,
}

impl Literal {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<O: ?Sized> Serializer<O> for Literal {
    fn serialize(&self, nvl: &mut NvList, _object: &O) -> NvResult<()> {
        nvl.add_string(&self.name, &self.value)
    }

    fn deserialize(&self, nvl: ConstNvList<'_>, _object: &mut O) -> NvResult<()> {
        let stored = nvl.get_string(&self.name)?;
        if stored != self.value {
            debug!(
                key = %self.name,
                expected = %self.value,
                found = %stored,
                "literal mismatch"
            );
            return Err(NvError::not_found(&self.name));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------------

/// `A` followed by `B`.
#[derive(Clone, Debug)]
pub struct Sequence<A, B> {
    first: A,
    second: B,
}

impl<A, B> Sequence<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<O: ?Sized, A: Serializer<O>, B: Serializer<O>> Serializer<O> for Sequence<A, B> {
    fn serialize(&self, nvl: &mut NvList, object: &O) -> NvResult<()> {
        self.first.serialize(nvl, object)?;
        self.second.serialize(nvl, object)
    }

    fn deserialize(&self, nvl: ConstNvList<'_>, object: &mut O) -> NvResult<()> {
        self.first.deserialize(nvl, object)?;
        self.second.deserialize(nvl, object)
    }
}

macro_rules! chainable {
    ($([$($gen:tt)*] $ty:ty),+ $(,)?) => {$(
        impl<$($gen)*> FieldDescriptor for $ty {}

        impl<$($gen)* Rhs: FieldDescriptor> Shr<Rhs> for $ty {
            type Output = Sequence<Self, Rhs>;

            fn shr(self, rhs: Rhs) -> Self::Output {
                Sequence::new(self, rhs)
            }
        }
    )+};
}

chainable! {
    [O: ?Sized, M,] Field<O, M>,
    [O: ?Sized, M,] ObjectField<O, M>,
    [] Literal,
    [A, B,] Sequence<A, B>,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Serialize `object` with its registered schema into a fresh list.
pub fn serialize<O: NvSchema>(object: &O) -> NvResult<NvList> {
    serialize_with(&O::schema(), object)
}

/// Serialize `object` with an explicit schema into a fresh list.
pub fn serialize_with<O, S>(schema: &S, object: &O) -> NvResult<NvList>
where
    O: ?Sized,
    S: Serializer<O> + ?Sized,
{
    let mut nvl = NvList::new();
    schema.serialize(&mut nvl, object)?;
    Ok(nvl)
}

/// Fill `object` from `nvl` with its registered schema.
pub fn deserialize<O: NvSchema, R: NvRead + ?Sized>(nvl: &R, object: &mut O) -> NvResult<()> {
    deserialize_with(&O::schema(), nvl, object)
}

/// Fill `object` from `nvl` with an explicit schema.
pub fn deserialize_with<O, S, R>(schema: &S, nvl: &R, object: &mut O) -> NvResult<()>
where
    O: ?Sized,
    S: Serializer<O> + ?Sized,
    R: NvRead + ?Sized,
{
    schema.deserialize(nvl.view(), object)
}

/// Build a [`Field`] for a named member of a struct:
/// `nv_field!("key", Type, member)`.
#[macro_export]
macro_rules! nv_field {
    ($name:expr, $object:ty, $member:ident) => {
        $crate::schema::Field::<$object, _>::new(
            $name,
            |object: &$object| &object.$member,
            |object: &mut $object| &mut object.$member,
        )
    };
}

/// Build an [`ObjectField`] for a struct member that has its own schema:
/// `nv_object!(Type, member)`.
#[macro_export]
macro_rules! nv_object {
    ($object:ty, $member:ident) => {
        $crate::schema::ObjectField::<$object, _>::new(
            |object: &$object| &object.$member,
            |object: &mut $object| &mut object.$member,
        )
    };
}
