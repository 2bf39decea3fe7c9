/// BLE advertising data (AD structure) decoding.
///
/// AD structure format: [length] [type] [data...]
///
/// `length` counts the type byte and the data bytes, never itself, so a field
/// occupies `1 + length` bytes and its data is `length - 1` bytes long.
/// Advertisements come straight off the radio: every read below is checked
/// against the buffer length before it happens.
use core::fmt;

/// AD type codes used by this crate.
pub mod ad_type {
    pub const FLAGS: u8 = 0x01;
    pub const SHORTENED_LOCAL_NAME: u8 = 0x08;
    pub const COMPLETE_LOCAL_NAME: u8 = 0x09;
    pub const MANUFACTURER_DATA: u8 = 0xFF;
}

/// Failure of a single field lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdError {
    /// No field of the requested type. Expected; drives fallbacks.
    NotFound,
    /// The field at `offset` declares a length of zero or one that runs past
    /// the end of the buffer.
    Malformed { offset: usize },
    /// The destination cannot hold the payload plus its NUL terminator.
    BufferTooSmall { needed: usize, capacity: usize },
}

impl fmt::Display for AdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdError::NotFound => f.write_str("field not found"),
            AdError::Malformed { offset } => {
                write!(f, "malformed AD structure at offset {offset}")
            }
            AdError::BufferTooSmall { needed, capacity } => {
                write!(f, "buffer too small ({needed} bytes needed, {capacity} available)")
            }
        }
    }
}

/// One decoded AD structure. `data` borrows from the advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdField<'a> {
    pub ad_type: u8,
    pub data: &'a [u8],
}

/// Read-only view over received advertising data.
///
/// `capacity` is the size of the backing storage, `len` the number of bytes
/// the radio actually delivered. Only the first `len` bytes are ever decoded.
#[derive(Debug, Clone, Copy)]
pub struct AdBuffer<'a> {
    buf: &'a [u8],
    len: usize,
}

impl<'a> AdBuffer<'a> {
    /// View the first `len` bytes of `buf`. A `len` beyond the backing slice
    /// is clamped to it.
    pub fn new(buf: &'a [u8], len: usize) -> Self {
        Self {
            buf,
            len: len.min(buf.len()),
        }
    }

    /// View a whole slice.
    pub fn from_slice(buf: &'a [u8]) -> Self {
        Self::new(buf, buf.len())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The bytes actually present.
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.buf[..self.len]
    }

    /// Iterate over the AD structures in order.
    pub fn fields(&self) -> Fields<'a> {
        Fields {
            data: self.as_bytes(),
            pos: 0,
        }
    }

    /// Payload of the first field of type `ad_type`.
    ///
    /// Decoding stops at the first match, so a damaged field after it does
    /// not affect the result. A damaged field before it does.
    pub fn find(&self, ad_type: u8) -> Result<&'a [u8], AdError> {
        for field in self.fields() {
            let field = field?;
            if field.ad_type == ad_type {
                return Ok(field.data);
            }
        }
        Err(AdError::NotFound)
    }

    /// Copy the payload of the first field of type `ad_type` into `out` and
    /// NUL-terminate it. Returns the payload length (terminator excluded).
    pub fn find_str(&self, ad_type: u8, out: &mut [u8]) -> Result<usize, AdError> {
        let data = self.find(ad_type)?;
        copy_terminated(data, out)
    }

    /// Try each type in `ad_types` in order until one can be copied into `out`.
    ///
    /// Returns the type that matched and the payload length. When every
    /// candidate fails, the first error other than `NotFound` is reported.
    pub fn find_str_any(&self, ad_types: &[u8], out: &mut [u8]) -> Result<(u8, usize), AdError> {
        let mut err = AdError::NotFound;
        for &ad_type in ad_types {
            match self.find_str(ad_type, out) {
                Ok(len) => return Ok((ad_type, len)),
                Err(e) => {
                    if err == AdError::NotFound {
                        err = e;
                    }
                }
            }
        }
        Err(err)
    }
}

/// Iterator over AD structures. Yields one error and then stops if the
/// data is damaged.
pub struct Fields<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<AdField<'a>, AdError>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.pos;
        if offset >= self.data.len() {
            return None;
        }

        // offset + 1 + len covers the length byte, the type byte and the
        // payload. It must not pass the end of the data.
        let len = self.data[offset] as usize;
        if len == 0 || offset + 1 + len > self.data.len() {
            self.pos = self.data.len();
            return Some(Err(AdError::Malformed { offset }));
        }

        let field = AdField {
            ad_type: self.data[offset + 1],
            data: &self.data[offset + 2..offset + 1 + len],
        };
        self.pos = offset + 1 + len;
        Some(Ok(field))
    }
}

fn copy_terminated(data: &[u8], out: &mut [u8]) -> Result<usize, AdError> {
    let needed = data.len() + 1;
    if needed > out.len() {
        return Err(AdError::BufferTooSmall {
            needed,
            capacity: out.len(),
        });
    }
    out[..data.len()].copy_from_slice(data);
    out[data.len()] = 0;
    Ok(data.len())
}
