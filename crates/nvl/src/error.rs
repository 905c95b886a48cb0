use std::io;

use nvl_store::{Errno, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NvError {
    /// The handle does not reference a store.
    #[error("operation attempted on a null nvlist")]
    NullList,

    /// The store carries a sticky error.
    #[error("operation attempted on an nvlist in an error state ({code})")]
    ErrorState { code: Errno },

    /// The key is absent, or present with a different type.
    #[error("key \"{key}\" not found")]
    KeyNotFound { key: String },

    #[error("key \"{key}\" already exists")]
    KeyExists { key: String },

    /// A key or string value contains an embedded NUL.
    #[error("{what} contains an embedded NUL: {value:?}")]
    InvalidString { what: &'static str, value: String },

    /// Platform failure, e.g. duplicating a descriptor.
    #[error("system error: {0}")]
    System(#[source] io::Error),

    /// Pack, unpack, send or receive failed.
    #[error(transparent)]
    Store(StoreError),
}

impl NvError {
    pub(crate) fn not_found(key: &str) -> Self {
        NvError::KeyNotFound {
            key: key.to_owned(),
        }
    }

    pub(crate) fn exists(key: &str) -> Self {
        NvError::KeyExists {
            key: key.to_owned(),
        }
    }

    /// The platform error number behind this error, where there is one.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            NvError::ErrorState { code } => Some(*code),
            NvError::KeyExists { .. } => Some(Errno::EEXIST),
            NvError::KeyNotFound { .. } => Some(Errno::ENOENT),
            NvError::InvalidString { .. } => Some(Errno::EINVAL),
            NvError::System(err) => err.raw_os_error().and_then(Errno::new),
            NvError::Store(err) => Some(err.errno()),
            NvError::NullList => None,
        }
    }
}

impl From<StoreError> for NvError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ErrorState(code) => NvError::ErrorState { code },
            StoreError::Io(err) => NvError::System(err),
            other => NvError::Store(other),
        }
    }
}

impl From<io::Error> for NvError {
    fn from(err: io::Error) -> Self {
        NvError::System(err)
    }
}

pub type NvResult<T> = Result<T, NvError>;

/// Reject strings the store cannot hold.
pub(crate) fn check_string(what: &'static str, value: &str) -> NvResult<()> {
    if value.contains('\0') {
        return Err(NvError::InvalidString {
            what,
            value: value.to_owned(),
        });
    }
    Ok(())
}

pub(crate) fn check_key(key: &str) -> NvResult<()> {
    check_string("key", key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            NvError::not_found("k").to_string(),
            "key \"k\" not found"
        );
        assert_eq!(
            NvError::exists("k").to_string(),
            "key \"k\" already exists"
        );
        let err = NvError::ErrorState {
            code: Errno::EINVAL,
        };
        assert!(err
            .to_string()
            .starts_with("operation attempted on an nvlist in an error state"));
    }

    #[test]
    fn store_errors_map_to_kinds() {
        let err = NvError::from(StoreError::ErrorState(Errno::ENOMEM));
        assert!(matches!(err, NvError::ErrorState { code } if code == Errno::ENOMEM));

        let err = NvError::from(StoreError::Io(io::Error::from_raw_os_error(libc::EBADF)));
        assert_eq!(err.errno(), Some(Errno::EBADF));

        let err = NvError::from(StoreError::DescriptorsNotPackable);
        assert_eq!(err.errno(), Some(Errno::EOPNOTSUPP));
    }

    #[test]
    fn nul_detection() {
        assert!(check_key("plain").is_ok());
        assert!(matches!(
            check_string("value", "a\0b"),
            Err(NvError::InvalidString { what: "value", .. })
        ));
    }
}
