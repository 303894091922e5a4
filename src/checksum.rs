//! Header checksum for Format 1.x tables.
//!
//! The stored value is an Adler-style rolling sum/product pair over every
//! byte after the header, XORed with the header's `entry_count`.
//!
//! # Enforcement policy
//! Format 1.x treats a mismatch as a warning and keeps parsing (unless the
//! caller opts into strict mode).  Format 2.0 files are never checksummed.
//! Both behaviors are kept as they are; tightening either one changes which
//! real-world files load.

const MOD_ADLER: u32 = 65521;

/// Rolling `(b << 16) | a` sum over `data`, with `a` seeded at 1 and `b` at 0.
pub fn adler_like(data: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;
    for &byte in data {
        a = (a + byte as u32) % MOD_ADLER;
        b = (b + a) % MOD_ADLER;
    }
    (b << 16) | a
}

/// The value a well-formed header stores for `data` and `count`.
#[inline]
pub fn compute(data: &[u8], count: u32) -> u32 {
    adler_like(data) ^ count
}

pub fn verify(data: &[u8], count: u32, stored: u32) -> bool {
    compute(data, count) == stored
}
