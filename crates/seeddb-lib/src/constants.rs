//! Project-wide constants and the position integer type.

/// Integer type for text offsets, suffix-array entries and bucket boundaries.
///
/// This is also the on-disk integer width: binary volume files store arrays
/// of `Position` in native byte order, and the companion query tool infers
/// the width from file length. The `large-text` feature widens it to 64 bits
/// for volumes beyond 4 Gi letters, at twice the memory per position.
#[cfg(not(feature = "large-text"))]
pub type Position = u32;

/// Integer type for text offsets, suffix-array entries and bucket boundaries.
#[cfg(feature = "large-text")]
pub type Position = u64;

/// On-disk width of one position entry.
pub const POSITION_BYTES: usize = std::mem::size_of::<Position>();

/// Version number
pub const VERSION: (u8, u8, u8) = (0, 3, 1);

/// Quality byte stored at pad and delimiter slots of FASTQ builds.
pub const PAD_QUALITY: u8 = b'!';

/// Hard cap on bucket table boundary entries, whatever depth is requested.
pub const MAX_BUCKET_ENTRIES: usize = 1 << 33;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_width_matches_type() {
        assert_eq!(POSITION_BYTES, std::mem::size_of::<Position>());
        assert!(POSITION_BYTES == 4 || POSITION_BYTES == 8);
    }
}
