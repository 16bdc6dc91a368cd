use digest::Digest;

/// One-shot MD4 hasher, the legacy strong checksum.
#[derive(Clone, Debug, Default)]
pub struct Md4 {
    inner: md4::Md4,
}

impl Md4 {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: md4::Md4::new(),
        }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest and returns the 128-bit MD4 output.
    #[must_use]
    pub fn finalize(self) -> [u8; 16] {
        self.inner.finalize().into()
    }

    /// Computes the MD4 digest of `data` in one shot.
    #[must_use]
    pub fn digest(data: &[u8]) -> [u8; 16] {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}
