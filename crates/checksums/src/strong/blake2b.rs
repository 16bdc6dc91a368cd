use blake2::Blake2b;
use digest::Digest;
use digest::consts::U32;

/// One-shot BLAKE2b hasher with a 256-bit output, the default strong
/// checksum for new signatures.
#[derive(Clone, Debug, Default)]
pub struct Blake2b256 {
    inner: Blake2b<U32>,
}

impl Blake2b256 {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Blake2b::new(),
        }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest and returns the 256-bit output.
    #[must_use]
    pub fn finalize(self) -> [u8; 32] {
        self.inner.finalize().into()
    }

    /// Computes the BLAKE2b-256 digest of `data` in one shot.
    #[must_use]
    pub fn digest(data: &[u8]) -> [u8; 32] {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}
