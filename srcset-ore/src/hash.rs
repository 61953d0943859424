//! Hashing utilities.

use srcset_types::Fingerprint;

/// Streaming xxh3 hasher producing [`Fingerprint`]s.
pub struct Xxh3Hasher {
    inner: xxhash_rust::xxh3::Xxh3,
}

impl Xxh3Hasher {
    /// Create a new [`Xxh3Hasher`].
    pub const fn new() -> Self {
        Xxh3Hasher {
            inner: xxhash_rust::xxh3::Xxh3::new(),
        }
    }

    pub fn update(&mut self, input: &[u8]) {
        self.inner.update(input);
    }

    pub fn digest(&self) -> Fingerprint {
        Fingerprint::new(self.inner.digest128())
    }
}

impl Default for Xxh3Hasher {
    fn default() -> Self {
        Xxh3Hasher::new()
    }
}

/// Fingerprint an ordered sequence of byte strings.
///
/// Every item is followed by a `0` separator so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn fingerprint_seq<I, B>(items: I) -> Fingerprint
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut hasher = Xxh3Hasher::new();
    for item in items {
        hasher.update(item.as_ref());
        hasher.update(&[0]);
    }
    hasher.digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_boundaries_matter() {
        let a = fingerprint_seq(["ab", "c"]);
        let b = fingerprint_seq(["a", "bc"]);
        assert_ne!(a, b);
        assert_eq!(a, fingerprint_seq(["ab", "c"]));
    }

    #[test]
    fn order_matters() {
        assert_ne!(fingerprint_seq(["a", "b"]), fingerprint_seq(["b", "a"]));
    }
}
