use std::io::{Read, Write};

use nvl_store::{Errno, NvFlags, Store, UnpackLimits};
use tracing::debug;

use crate::error::{NvError, NvResult};

/// Whether a handle is responsible for destroying its store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ownership {
    Owning,
    NonOwning,
}

/// Immutable, non-owning view of a store.
///
/// Views are `Copy` and borrow the store they look at, so a view can never
/// outlive its owner. `ConstNvList::default()` is the null view; every
/// operation on it fails with [`NvError::NullList`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ConstNvList<'a> {
    store: Option<&'a Store>,
}

/// Mutable owner of a store.
///
/// Dropping the owner destroys the store. `NvList::default()` is the null
/// handle, which is also what [`std::mem::take`] leaves behind when moving a
/// list out of a binding.
#[derive(Debug, Default)]
pub struct NvList {
    store: Option<Box<Store>>,
}

// ---------------------------------------------------------------------------
// ConstNvList
// ---------------------------------------------------------------------------

impl<'a> ConstNvList<'a> {
    /// View an existing store.
    pub fn from_store(store: &'a Store) -> Self {
        Self { store: Some(store) }
    }

    pub fn is_null(self) -> bool {
        self.store.is_none()
    }

    pub fn ownership(self) -> Ownership {
        Ownership::NonOwning
    }

    /// The viewed store, even if it is in an error state.
    pub fn as_store(self) -> NvResult<&'a Store> {
        self.store.ok_or(NvError::NullList)
    }

    pub(crate) fn raw(self) -> Option<&'a Store> {
        self.store
    }

    /// The viewed store, provided it carries no sticky error.
    pub(crate) fn checked(self) -> NvResult<&'a Store> {
        let store = self.as_store()?;
        match store.error() {
            Some(code) => Err(NvError::ErrorState { code }),
            None => Ok(store),
        }
    }
}

impl<'a> From<&'a NvList> for ConstNvList<'a> {
    fn from(nvl: &'a NvList) -> Self {
        nvl.as_const()
    }
}

impl<'a> From<&'a Store> for ConstNvList<'a> {
    fn from(store: &'a Store) -> Self {
        Self::from_store(store)
    }
}

// ---------------------------------------------------------------------------
// NvList
// ---------------------------------------------------------------------------

impl NvList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::with_flags(NvFlags::NONE)
    }

    pub fn with_flags(flags: NvFlags) -> Self {
        Self {
            store: Some(Box::new(Store::new(flags))),
        }
    }

    /// Take ownership of a store produced elsewhere.
    pub fn from_store(store: Store) -> NvResult<Self> {
        if let Some(code) = store.error() {
            return Err(NvError::ErrorState { code });
        }
        Ok(Self {
            store: Some(Box::new(store)),
        })
    }

    /// Deep copy with an independent lifetime.
    pub fn try_clone(&self) -> NvResult<NvList> {
        NvList::try_from(self.as_const())
    }

    /// Replace the held store with a deep copy of `source`.
    pub fn assign_from(&mut self, source: ConstNvList<'_>) -> NvResult<()> {
        *self = NvList::try_from(source)?;
        Ok(())
    }

    /// Release the store to the caller, leaving this handle null.
    pub fn into_store(mut self) -> NvResult<Store> {
        self.store.take().map(|store| *store).ok_or(NvError::NullList)
    }

    pub fn as_const(&self) -> ConstNvList<'_> {
        ConstNvList {
            store: self.store.as_deref(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.store.is_none()
    }

    pub fn ownership(&self) -> Ownership {
        Ownership::Owning
    }

    /// The owned store, even if it is in an error state.
    pub fn as_store(&self) -> NvResult<&Store> {
        self.store.as_deref().ok_or(NvError::NullList)
    }

    /// Raw mutable access to the owned store.
    pub fn as_store_mut(&mut self) -> NvResult<&mut Store> {
        self.store.as_deref_mut().ok_or(NvError::NullList)
    }

    /// The owned store, provided it carries no sticky error.
    pub(crate) fn checked_mut(&mut self) -> NvResult<&mut Store> {
        let store = self.as_store_mut()?;
        match store.error() {
            Some(code) => Err(NvError::ErrorState { code }),
            None => Ok(store),
        }
    }

    /// Latch a sticky error. Fails if one is already latched.
    pub fn set_error(&mut self, code: Errno) -> NvResult<()> {
        self.checked_mut()?.set_error(code);
        Ok(())
    }

    // ---- reconstruction ----

    pub fn unpack(bytes: &[u8], flags: NvFlags) -> NvResult<NvList> {
        Self::unpack_with(bytes, flags, &UnpackLimits::default())
    }

    pub fn unpack_with(bytes: &[u8], flags: NvFlags, limits: &UnpackLimits) -> NvResult<NvList> {
        Self::from_store(Store::unpack_with(bytes, flags, limits)?)
    }

    /// Receive one list from `channel`.
    pub fn recv<R: Read + ?Sized>(channel: &mut R, flags: NvFlags) -> NvResult<NvList> {
        Self::recv_with(channel, flags, &UnpackLimits::default())
    }

    pub fn recv_with<R: Read + ?Sized>(
        channel: &mut R,
        flags: NvFlags,
        limits: &UnpackLimits,
    ) -> NvResult<NvList> {
        Self::from_store(Store::recv_with(channel, flags, limits)?)
    }

    /// Send `list` on `channel` and return the reply. `list` is consumed
    /// whether or not the exchange succeeds.
    pub fn xfer<C: Read + Write + ?Sized>(
        channel: &mut C,
        list: NvList,
        flags: NvFlags,
    ) -> NvResult<NvList> {
        let request = list.into_store()?;
        if let Some(code) = request.error() {
            return Err(NvError::ErrorState { code });
        }
        let reply = request.xfer(channel, flags).map_err(|err| {
            debug!(error = %err, "xfer failed");
            err
        })?;
        Self::from_store(reply)
    }
}

impl TryFrom<ConstNvList<'_>> for NvList {
    type Error = NvError;

    /// Deep copy of the viewed store.
    fn try_from(view: ConstNvList<'_>) -> NvResult<NvList> {
        let store = view.checked()?.try_clone()?;
        Ok(NvList {
            store: Some(Box::new(store)),
        })
    }
}

impl TryFrom<Store> for NvList {
    type Error = NvError;

    fn try_from(store: Store) -> NvResult<NvList> {
        NvList::from_store(store)
    }
}
