use std::fmt;
use std::io;

/// A raw platform error number, as latched by a [`Store`](crate::Store).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Errno(i32);

impl Errno {
    pub const EINVAL: Errno = Errno(libc::EINVAL);
    pub const EEXIST: Errno = Errno(libc::EEXIST);
    pub const ENOENT: Errno = Errno(libc::ENOENT);
    pub const ENOMEM: Errno = Errno(libc::ENOMEM);
    pub const EBADF: Errno = Errno(libc::EBADF);
    pub const EFBIG: Errno = Errno(libc::EFBIG);
    pub const EILSEQ: Errno = Errno(libc::EILSEQ);
    pub const ELOOP: Errno = Errno(libc::ELOOP);
    pub const EIO: Errno = Errno(libc::EIO);
    pub const EOPNOTSUPP: Errno = Errno(libc::EOPNOTSUPP);

    /// Wrap a raw error number. Zero means "no error" and yields `None`.
    pub fn new(raw: i32) -> Option<Self> {
        (raw != 0).then_some(Errno(raw))
    }

    /// The raw error number.
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Errno({})", self.0)
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&io::Error::from_raw_os_error(self.0), f)
    }
}

impl From<Errno> for io::Error {
    fn from(errno: Errno) -> Self {
        io::Error::from_raw_os_error(errno.0)
    }
}

/// Errors from store operations that return a value (clone, pack, unpack,
/// send, recv). Failed insertions are not reported here: they latch the
/// store's sticky error instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store already carries a sticky error.
    #[error("list is in an error state: {0}")]
    ErrorState(Errno),

    /// Packed input failed validation.
    #[error("malformed packed list at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    /// The flags recorded in packed input differ from the requested flags.
    #[error("packed list flags {found:#04x} do not match requested flags {expected:#04x}")]
    FlagsMismatch { expected: u8, found: u8 },

    /// Packed input exceeds the configured size or nesting limits.
    #[error("packed list exceeds limit: {0}")]
    LimitExceeded(String),

    /// Descriptors only live in memory and cannot be packed.
    #[error("descriptors cannot be packed")]
    DescriptorsNotPackable,

    /// I/O error from the channel or from descriptor duplication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        StoreError::Malformed {
            offset,
            reason: reason.into(),
        }
    }

    /// The platform error number that best describes this error.
    pub fn errno(&self) -> Errno {
        match self {
            StoreError::ErrorState(errno) => *errno,
            StoreError::Malformed { .. } => Errno::EINVAL,
            StoreError::FlagsMismatch { .. } => Errno::EILSEQ,
            StoreError::LimitExceeded(_) => Errno::EFBIG,
            StoreError::DescriptorsNotPackable => Errno::EOPNOTSUPP,
            StoreError::Io(err) => err.raw_os_error().and_then(Errno::new).unwrap_or(Errno::EIO),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_an_error() {
        assert!(Errno::new(0).is_none());
        assert_eq!(Errno::new(libc::EINVAL), Some(Errno::EINVAL));
    }

    #[test]
    fn errno_display_uses_platform_text() {
        let text = Errno::EINVAL.to_string();
        assert_eq!(text, io::Error::from_raw_os_error(libc::EINVAL).to_string());
    }

    #[test]
    fn store_error_errno_mapping() {
        assert_eq!(StoreError::malformed(3, "short").errno(), Errno::EINVAL);
        assert_eq!(
            StoreError::FlagsMismatch { expected: 0, found: 1 }.errno(),
            Errno::EILSEQ
        );
        assert_eq!(StoreError::DescriptorsNotPackable.errno(), Errno::EOPNOTSUPP);
        assert_eq!(StoreError::ErrorState(Errno::ENOMEM).errno(), Errno::ENOMEM);

        let io_err = io::Error::from_raw_os_error(libc::EBADF);
        assert_eq!(StoreError::from(io_err).errno(), Errno::EBADF);

        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(StoreError::from(io_err).errno(), Errno::EIO);
    }

    #[test]
    fn malformed_message_names_offset() {
        let err = StoreError::malformed(19, "truncated pair header");
        assert_eq!(
            err.to_string(),
            "malformed packed list at offset 19: truncated pair header"
        );
    }
}
