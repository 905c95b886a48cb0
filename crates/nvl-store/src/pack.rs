//! Packed byte format.
//!
//! ```text
//! header (19 bytes): magic u8 | version u8 | flags u8 | descriptors u64 | size u64
//! pair   (19 bytes): type u8 | namesize u16 | datasize u64 | nitems u64
//!                    followed by the NUL-terminated name and the data
//! ```
//!
//! Integers are written in host byte order; the header flag `0x80` marks
//! big-endian data so a reader on either kind of host can decode it.
//! Nested lists are complete packed lists, each with its own header.

use tracing::{debug, trace};

use crate::config::UnpackLimits;
use crate::error::{StoreError, StoreResult};
use crate::flags::NvFlags;
use crate::store::{Store, NAME_MAX};
use crate::value::{NvType, Value};

pub(crate) const MAGIC: u8 = 0x6c;
pub(crate) const VERSION: u8 = 0;
pub(crate) const HEADER_LEN: usize = 19;
const PAIR_HEADER_LEN: usize = 19;
const FLAG_BIG_ENDIAN: u8 = 0x80;

fn host_endian_flag() -> u8 {
    if cfg!(target_endian = "big") {
        FLAG_BIG_ENDIAN
    } else {
        0
    }
}

// ----------------------------------------------------------------------------
// Header
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
pub(crate) struct Header {
    pub flags: u8,
    pub descriptors: u64,
    pub size: u64,
}

impl Header {
    /// Parse and validate the fixed header at the start of `bytes`.
    /// `offset` is where `bytes` begins in the whole input, for error reports.
    pub(crate) fn parse(bytes: &[u8], offset: usize) -> StoreResult<Header> {
        if bytes.len() < HEADER_LEN {
            return Err(StoreError::malformed(offset, "truncated header"));
        }
        if bytes[0] != MAGIC {
            return Err(StoreError::malformed(
                offset,
                format!("bad magic {:#04x}", bytes[0]),
            ));
        }
        if bytes[1] != VERSION {
            return Err(StoreError::malformed(
                offset + 1,
                format!("unsupported version {}", bytes[1]),
            ));
        }
        let flags = bytes[2];
        if flags & !(NvFlags::PUBLIC_MASK | FLAG_BIG_ENDIAN) != 0 {
            return Err(StoreError::malformed(
                offset + 2,
                format!("unknown flag bits {flags:#04x}"),
            ));
        }
        let big_endian = flags & FLAG_BIG_ENDIAN != 0;
        Ok(Header {
            flags,
            descriptors: u64_from(&bytes[3..11], big_endian),
            size: u64_from(&bytes[11..19], big_endian),
        })
    }

    pub(crate) fn big_endian(&self) -> bool {
        self.flags & FLAG_BIG_ENDIAN != 0
    }

    pub(crate) fn public_flags(&self) -> NvFlags {
        NvFlags::from_bits_truncate(self.flags)
    }
}

fn u64_from(bytes: &[u8], big_endian: bool) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    if big_endian {
        u64::from_be_bytes(raw)
    } else {
        u64::from_le_bytes(raw)
    }
}

// ----------------------------------------------------------------------------
// Packing
// ----------------------------------------------------------------------------

fn data_len(value: &Value) -> usize {
    match value {
        Value::Null | Value::Descriptor(_) | Value::DescriptorArray(_) => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 8,
        Value::String(s) => s.len() + 1,
        Value::NvList(nested) => packed_len(nested),
        Value::Binary(b) => b.len(),
        Value::BoolArray(v) => v.len(),
        Value::NumberArray(v) => v.len() * 8,
        Value::StringArray(v) => v.iter().map(|s| s.len() + 1).sum(),
        Value::NvListArray(v) => v.iter().map(packed_len).sum(),
    }
}

fn body_len(store: &Store) -> usize {
    store
        .iter()
        .map(|(name, value)| PAIR_HEADER_LEN + name.len() + 1 + data_len(value))
        .sum()
}

fn packed_len(store: &Store) -> usize {
    HEADER_LEN + body_len(store)
}

fn put_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_ne_bytes());
}

fn put_c_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}

fn pack_into(store: &Store, buf: &mut Vec<u8>) {
    buf.push(MAGIC);
    buf.push(VERSION);
    buf.push(store.flags().bits() | host_endian_flag());
    put_u64(buf, 0);
    put_u64(buf, body_len(store) as u64);

    for (name, value) in store.iter() {
        debug_assert!(name.len() <= NAME_MAX);
        buf.push(value.nv_type().code());
        buf.extend_from_slice(&((name.len() + 1) as u16).to_ne_bytes());
        put_u64(buf, data_len(value) as u64);
        put_u64(buf, value.nitems() as u64);
        put_c_str(buf, name);

        match value {
            Value::Null | Value::Descriptor(_) | Value::DescriptorArray(_) => {}
            Value::Bool(b) => buf.push(u8::from(*b)),
            Value::Number(n) => put_u64(buf, *n),
            Value::String(s) => put_c_str(buf, s),
            Value::NvList(nested) => pack_into(nested, buf),
            Value::Binary(b) => buf.extend_from_slice(b),
            Value::BoolArray(v) => buf.extend(v.iter().map(|b| u8::from(*b))),
            Value::NumberArray(v) => v.iter().for_each(|n| put_u64(buf, *n)),
            Value::StringArray(v) => v.iter().for_each(|s| put_c_str(buf, s)),
            Value::NvListArray(v) => v.iter().for_each(|nested| pack_into(nested, buf)),
        }
    }
}

fn check_packable(store: &Store) -> StoreResult<()> {
    if let Some(errno) = store.error() {
        return Err(StoreError::ErrorState(errno));
    }
    if store.descriptor_count() > 0 {
        return Err(StoreError::DescriptorsNotPackable);
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Unpacking
// ----------------------------------------------------------------------------

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
    big_endian: bool,
}

impl<'a> Reader<'a> {
    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }

    fn bytes(&mut self, len: usize, what: &str) -> StoreResult<&'a [u8]> {
        let data: &'a [u8] = self.data;
        if len > data.len() - self.pos {
            return Err(StoreError::malformed(
                self.offset(),
                format!("truncated {what}"),
            ));
        }
        let slice = &data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u8(&mut self, what: &str) -> StoreResult<u8> {
        Ok(self.bytes(1, what)?[0])
    }

    fn u16(&mut self, what: &str) -> StoreResult<u16> {
        let bytes = self.bytes(2, what)?;
        let raw = [bytes[0], bytes[1]];
        Ok(if self.big_endian {
            u16::from_be_bytes(raw)
        } else {
            u16::from_le_bytes(raw)
        })
    }

    fn u64(&mut self, what: &str) -> StoreResult<u64> {
        let bytes = self.bytes(8, what)?;
        Ok(u64_from(bytes, self.big_endian))
    }
}

/// A NUL-terminated, NUL-free, UTF-8 string occupying all of `bytes`.
fn c_string(bytes: &[u8], offset: usize, what: &str) -> StoreResult<String> {
    let body = match bytes.split_last() {
        Some((0, body)) => body,
        _ => {
            return Err(StoreError::malformed(
                offset,
                format!("{what} is not NUL-terminated"),
            ))
        }
    };
    if body.contains(&0) {
        return Err(StoreError::malformed(
            offset,
            format!("{what} contains an embedded NUL"),
        ));
    }
    std::str::from_utf8(body)
        .map(str::to_owned)
        .map_err(|_| StoreError::malformed(offset, format!("{what} is not valid UTF-8")))
}

fn bool_byte(byte: u8, offset: usize) -> StoreResult<bool> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::malformed(
            offset,
            format!("invalid boolean byte {other}"),
        )),
    }
}

struct Unpacker<'l> {
    limits: &'l UnpackLimits,
}

impl Unpacker<'_> {
    /// Parse one complete packed list from the start of `data`. Returns the
    /// list and the number of bytes it occupied.
    fn list(&self, data: &[u8], base: usize, depth: usize) -> StoreResult<(Store, usize)> {
        if depth > self.limits.max_depth {
            return Err(StoreError::LimitExceeded(format!(
                "nesting deeper than {} levels",
                self.limits.max_depth
            )));
        }
        let header = Header::parse(data, base)?;
        if header.descriptors != 0 {
            return Err(StoreError::malformed(
                base + 3,
                "packed descriptors are not supported",
            ));
        }
        let end = usize::try_from(header.size)
            .ok()
            .and_then(|size| size.checked_add(HEADER_LEN))
            .filter(|end| *end <= data.len())
            .ok_or_else(|| {
                StoreError::malformed(base + 11, "list size exceeds available data")
            })?;

        let mut reader = Reader {
            data: &data[HEADER_LEN..end],
            pos: 0,
            base: base + HEADER_LEN,
            big_endian: header.big_endian(),
        };
        let mut store = Store::new(header.public_flags());
        while !reader.is_empty() {
            self.pair(&mut reader, &mut store, depth)?;
        }
        Ok((store, end))
    }

    fn pair(&self, reader: &mut Reader<'_>, store: &mut Store, depth: usize) -> StoreResult<()> {
        let pair_offset = reader.offset();
        let code = reader.u8("pair type")?;
        let ty = NvType::from_code(code)
            .filter(|ty| *ty != NvType::None)
            .ok_or_else(|| StoreError::malformed(pair_offset, format!("unknown type {code}")))?;
        let namesize = usize::from(reader.u16("pair name size")?);
        let datasize = reader.u64("pair data size")?;
        let nitems = reader.u64("pair item count")?;

        if namesize == 0 || namesize > NAME_MAX + 1 {
            return Err(StoreError::malformed(
                pair_offset + 1,
                format!("invalid name size {namesize}"),
            ));
        }
        let name_offset = reader.offset();
        let name = c_string(reader.bytes(namesize, "pair name")?, name_offset, "name")?;

        let datasize = usize::try_from(datasize)
            .map_err(|_| StoreError::malformed(pair_offset + 3, "data size overflows"))?;
        let data_offset = reader.offset();
        let data = reader.bytes(datasize, "pair data")?;
        let value = self.value(ty, data, nitems, data_offset, reader.big_endian, depth)?;

        if !store.flags().no_unique() && store.exists(&name) {
            return Err(StoreError::malformed(
                pair_offset,
                format!("duplicate key {name:?}"),
            ));
        }
        store.push_unchecked(name, value);
        Ok(())
    }

    fn value(
        &self,
        ty: NvType,
        data: &[u8],
        nitems: u64,
        offset: usize,
        big_endian: bool,
        depth: usize,
    ) -> StoreResult<Value> {
        let scalar = |expected_len: Option<usize>| -> StoreResult<()> {
            if nitems != 0 {
                return Err(StoreError::malformed(offset, format!("{ty} with item count")));
            }
            match expected_len {
                Some(len) if len != data.len() => Err(StoreError::malformed(
                    offset,
                    format!("{ty} data size {} (expected {len})", data.len()),
                )),
                _ => Ok(()),
            }
        };

        Ok(match ty {
            NvType::Null => {
                scalar(Some(0))?;
                Value::Null
            }
            NvType::Bool => {
                scalar(Some(1))?;
                Value::Bool(bool_byte(data[0], offset)?)
            }
            NvType::Number => {
                scalar(Some(8))?;
                Value::Number(u64_from(data, big_endian))
            }
            NvType::String => {
                scalar(None)?;
                Value::String(c_string(data, offset, "string")?)
            }
            NvType::Binary => {
                scalar(None)?;
                Value::Binary(data.to_vec())
            }
            NvType::NvList => {
                scalar(None)?;
                let (nested, used) = self.list(data, offset, depth + 1)?;
                if used != data.len() {
                    return Err(StoreError::malformed(offset + used, "trailing bytes after nested list"));
                }
                Value::NvList(Box::new(nested))
            }
            NvType::BoolArray => {
                if nitems != data.len() as u64 {
                    return Err(StoreError::malformed(offset, "bool array size mismatch"));
                }
                Value::BoolArray(
                    data.iter()
                        .enumerate()
                        .map(|(i, b)| bool_byte(*b, offset + i))
                        .collect::<StoreResult<_>>()?,
                )
            }
            NvType::NumberArray => {
                if nitems.checked_mul(8) != Some(data.len() as u64) {
                    return Err(StoreError::malformed(offset, "number array size mismatch"));
                }
                Value::NumberArray(
                    data.chunks_exact(8)
                        .map(|chunk| u64_from(chunk, big_endian))
                        .collect(),
                )
            }
            NvType::StringArray => {
                let mut items = Vec::new();
                let mut rest = data;
                let mut at = offset;
                for _ in 0..nitems {
                    let len = rest
                        .iter()
                        .position(|b| *b == 0)
                        .map(|nul| nul + 1)
                        .ok_or_else(|| StoreError::malformed(at, "string array item is not NUL-terminated"))?;
                    items.push(c_string(&rest[..len], at, "string array item")?);
                    rest = &rest[len..];
                    at += len;
                }
                if !rest.is_empty() {
                    return Err(StoreError::malformed(at, "trailing bytes after string array"));
                }
                Value::StringArray(items)
            }
            NvType::NvListArray => {
                let mut items = Vec::new();
                let mut rest = data;
                let mut at = offset;
                for _ in 0..nitems {
                    let (mut nested, used) = self.list(rest, at, depth + 1)?;
                    nested.set_in_array();
                    items.push(nested);
                    rest = &rest[used..];
                    at += used;
                }
                if !rest.is_empty() {
                    return Err(StoreError::malformed(at, "trailing bytes after nvlist array"));
                }
                Value::NvListArray(items)
            }
            NvType::Descriptor | NvType::DescriptorArray => {
                return Err(StoreError::malformed(offset, "descriptors cannot be unpacked"));
            }
            NvType::None => return Err(StoreError::malformed(offset, "untyped pair")),
        })
    }
}

impl Store {
    /// Size in bytes of [`Store::pack`]'s output.
    pub fn packed_size(&self) -> StoreResult<usize> {
        check_packable(self)?;
        Ok(packed_len(self))
    }

    /// Serialize the whole store, nested lists included.
    pub fn pack(&self) -> StoreResult<Vec<u8>> {
        check_packable(self)?;
        let mut buf = Vec::with_capacity(packed_len(self));
        pack_into(self, &mut buf);
        trace!(bytes = buf.len(), entries = self.len(), "packed store");
        Ok(buf)
    }

    /// Rebuild a store from packed bytes using the default limits.
    pub fn unpack(bytes: &[u8], flags: NvFlags) -> StoreResult<Store> {
        Self::unpack_with(bytes, flags, &UnpackLimits::default())
    }

    /// Rebuild a store from packed bytes.
    ///
    /// `flags` must equal the flags the store was packed with.
    pub fn unpack_with(bytes: &[u8], flags: NvFlags, limits: &UnpackLimits) -> StoreResult<Store> {
        let result = Self::unpack_inner(bytes, flags, limits);
        if let Err(err) = &result {
            debug!(error = %err, len = bytes.len(), "rejected packed input");
        }
        result
    }

    fn unpack_inner(bytes: &[u8], flags: NvFlags, limits: &UnpackLimits) -> StoreResult<Store> {
        if bytes.len() > limits.max_size {
            return Err(StoreError::LimitExceeded(format!(
                "{} bytes exceeds maximum of {}",
                bytes.len(),
                limits.max_size
            )));
        }
        let header = Header::parse(bytes, 0)?;
        if header.public_flags() != flags {
            return Err(StoreError::FlagsMismatch {
                expected: flags.bits(),
                found: header.public_flags().bits(),
            });
        }
        let (store, used) = Unpacker { limits }.list(bytes, 0, 0)?;
        if used != bytes.len() {
            return Err(StoreError::malformed(used, "trailing bytes after list"));
        }
        Ok(store)
    }
}
