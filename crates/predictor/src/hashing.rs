//! FNV-1a fingerprints for memoization keys
//!
//! Values are hashed through their native-endian byte representation, so a
//! fingerprint is only stable within one process and build. It is a cache key,
//! not a cryptographic digest.

/// FNV-1a 32-bit offset basis
pub const FNV_OFFSET_BASIS: u32 = 2_166_136_261;

/// FNV-1a 32-bit prime
pub const FNV_PRIME: u32 = 16_777_619;

/// Plain numeric values that can be viewed as raw native-endian bytes.
pub trait HashBytes: Copy {
    /// Feed this value's bytes to `sink` in memory order.
    fn write_ne_bytes(self, sink: &mut impl FnMut(u8));
}

macro_rules! impl_hash_bytes {
    ($($t:ty),*) => {
        $(
            impl HashBytes for $t {
                #[inline]
                fn write_ne_bytes(self, sink: &mut impl FnMut(u8)) {
                    for byte in self.to_ne_bytes() {
                        sink(byte);
                    }
                }
            }
        )*
    };
}

impl_hash_bytes!(f32, f64, i32, i64, u32, u64);

/// Incremental FNV-1a 32-bit hasher
#[derive(Debug, Clone, Copy)]
pub struct Fnv1a32 {
    state: u32,
}

impl Fnv1a32 {
    pub fn new() -> Self {
        Self {
            state: FNV_OFFSET_BASIS,
        }
    }

    #[inline]
    pub fn write_u8(&mut self, byte: u8) {
        self.state ^= u32::from(byte);
        self.state = self.state.wrapping_mul(FNV_PRIME);
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_u8(byte);
        }
    }

    pub fn write_value<T: HashBytes>(&mut self, value: T) {
        value.write_ne_bytes(&mut |byte| self.write_u8(byte));
    }

    pub fn finish(&self) -> u32 {
        self.state
    }
}

impl Default for Fnv1a32 {
    fn default() -> Self {
        Self::new()
    }
}

/// FNV-1a over a byte buffer
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hasher = Fnv1a32::new();
    hasher.write(bytes);
    hasher.finish()
}

/// FNV-1a over the raw bytes of a slice of plain values
pub fn compute_hash<T: HashBytes>(contents: &[T]) -> u32 {
    let mut hasher = Fnv1a32::new();
    for &value in contents {
        hasher.write_value(value);
    }
    hasher.finish()
}

/// FNV-1a over the raw bytes of a single value
pub fn compute_scalar_hash<T: HashBytes>(value: T) -> u32 {
    compute_hash(std::slice::from_ref(&value))
}
