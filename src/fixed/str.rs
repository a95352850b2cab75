use core::fmt;

/// Fixed-capacity UTF-8 string with inline storage.
///
/// Two construction paths, mirroring the two failure policies callers
/// actually want:
///
/// * [`FixedStr::new`] is a `const fn` that refuses oversized input —
///   used in const context the check happens at compile time.
/// * [`FixedStr::truncated`] silently clips to capacity, never splitting
///   a multi-byte character; the call site explicitly opts in to loss.
#[derive(Clone, Copy)]
pub struct FixedStr<const N: usize> {
    buf: [u8; N],
    len: u32,
}

impl<const N: usize> FixedStr<N> {
    /// Creates a string that must fit.
    ///
    /// # Panics
    ///
    /// Panics if `s` is longer than `N` bytes. In const context this is
    /// a compile error.
    pub const fn new(s: &str) -> Self {
        let bytes = s.as_bytes();
        assert!(bytes.len() <= N, "string exceeds FixedStr capacity");
        let mut buf = [0u8; N];
        let mut i = 0;
        while i < bytes.len() {
            buf[i] = bytes[i];
            i += 1;
        }
        Self {
            buf,
            len: bytes.len() as u32,
        }
    }

    /// Creates a string clipped to at most `N` bytes, backing up to the
    /// nearest character boundary.
    pub fn truncated(s: &str) -> Self {
        let mut end = s.len().min(N);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        let mut buf = [0u8; N];
        buf[..end].copy_from_slice(&s.as_bytes()[..end]);
        Self {
            buf,
            len: end as u32,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        // Both constructors only ever store a prefix of valid UTF-8
        // ending on a character boundary.
        unsafe { core::str::from_utf8_unchecked(&self.buf[..self.len as usize]) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum length in bytes.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl<const N: usize> Default for FixedStr<N> {
    fn default() -> Self {
        Self {
            buf: [0u8; N],
            len: 0,
        }
    }
}

impl<const N: usize> PartialEq for FixedStr<N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl<const N: usize> Eq for FixedStr<N> {}

impl<const N: usize> PartialEq<str> for FixedStr<N> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl<const N: usize> PartialEq<&str> for FixedStr<N> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl<const N: usize> fmt::Display for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
