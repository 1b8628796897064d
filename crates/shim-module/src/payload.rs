//! Owned response buffers handed to the host.

use std::borrow::Cow;

use shim_engine::ShimError;

/// Bytes returned by `GetInfo` or `Get`.
///
/// A bounded payload is cut at the byte ceiling without regard for JSON or
/// UTF-8 boundaries; [`Payload::is_truncated`] reports whether that
/// happened.
///
/// # Example
///
/// ```
/// use shim_module::Payload;
///
/// let payload = Payload::bounded("[\"nginx\"]", 5).expect("allocates");
/// assert_eq!(payload.as_bytes(), b"[\"ngi");
/// assert!(payload.is_truncated());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8>,
    truncated: bool,
}

impl Payload {
    /// Returns an empty payload.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            bytes: Vec::new(),
            truncated: false,
        }
    }

    /// Copies `text` into a new payload without a ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::OutOfMemory`] when the buffer cannot be
    /// allocated.
    pub fn from_text(text: &str) -> Result<Self, ShimError> {
        Self::bounded(text, 0)
    }

    /// Copies at most `max_bytes` bytes of `text`; 0 means unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::OutOfMemory`] when the buffer cannot be
    /// allocated.
    pub fn bounded(text: &str, max_bytes: u32) -> Result<Self, ShimError> {
        let source = text.as_bytes();
        let limit = usize::try_from(max_bytes).unwrap_or(usize::MAX);
        let (kept, truncated) = match source.get(..limit) {
            Some(prefix) if max_bytes > 0 && prefix.len() < source.len() => (prefix, true),
            _ => (source, false),
        };

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(kept.len())
            .map_err(|_| ShimError::OutOfMemory { bytes: kept.len() })?;
        bytes.extend_from_slice(kept);
        Ok(Self { bytes, truncated })
    }

    /// Returns the payload bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the payload size in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when the payload holds no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns `true` when the payload was cut at its ceiling.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Returns the payload as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn to_text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Consumes the payload and returns its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Releases a payload previously returned by `GetInfo` or `Get`.
pub fn free(payload: Payload) {
    drop(payload);
}
