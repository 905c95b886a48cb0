use std::io::{Read, Write};

use tracing::{debug, trace};

use crate::config::UnpackLimits;
use crate::error::{StoreError, StoreResult};
use crate::flags::NvFlags;
use crate::pack::{Header, HEADER_LEN};
use crate::store::Store;

impl Store {
    /// Pack the store and write it to `channel` in one piece.
    pub fn send<W: Write + ?Sized>(&self, channel: &mut W) -> StoreResult<()> {
        let bytes = self.pack()?;
        let result = channel
            .write_all(&bytes)
            .and_then(|()| channel.flush());
        if let Err(err) = result {
            debug!(error = %err, "send failed");
            return Err(err.into());
        }
        trace!(bytes = bytes.len(), "sent store");
        Ok(())
    }

    /// Read one packed store from `channel` using the default limits.
    pub fn recv<R: Read + ?Sized>(channel: &mut R, flags: NvFlags) -> StoreResult<Store> {
        Self::recv_with(channel, flags, &UnpackLimits::default())
    }

    /// Read one packed store from `channel`.
    ///
    /// The header is read first to learn the size of the rest, which is
    /// checked against `limits` before anything else is read.
    pub fn recv_with<R: Read + ?Sized>(
        channel: &mut R,
        flags: NvFlags,
        limits: &UnpackLimits,
    ) -> StoreResult<Store> {
        let mut header = [0u8; HEADER_LEN];
        if let Err(err) = channel.read_exact(&mut header) {
            debug!(error = %err, "recv failed reading header");
            return Err(err.into());
        }
        let size = Header::parse(&header, 0)?.size;
        let total = usize::try_from(size)
            .ok()
            .and_then(|size| size.checked_add(HEADER_LEN))
            .filter(|total| *total <= limits.max_size)
            .ok_or_else(|| {
                StoreError::LimitExceeded(format!(
                    "announced size {size} exceeds maximum of {}",
                    limits.max_size
                ))
            })?;

        let mut bytes = Vec::with_capacity(total);
        bytes.extend_from_slice(&header);
        bytes.resize(total, 0);
        if let Err(err) = channel.read_exact(&mut bytes[HEADER_LEN..]) {
            debug!(error = %err, expected = total, "recv failed reading body");
            return Err(err.into());
        }
        trace!(bytes = total, "received store");
        Store::unpack_with(&bytes, flags, limits)
    }

    /// Send the store and wait for the reply on the same channel.
    ///
    /// The request is consumed whether or not the exchange succeeds.
    pub fn xfer<C: Read + Write + ?Sized>(self, channel: &mut C, flags: NvFlags) -> StoreResult<Store> {
        self.send(channel)?;
        drop(self);
        Store::recv(channel, flags)
    }
}
