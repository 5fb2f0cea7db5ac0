//! Subset-seeded suffix array database construction.
//!
//! Builds persistent, on-disk seeded indexes over DNA or protein sequences,
//! so a companion alignment tool can find seed matches by constant-time
//! lookup. Given FASTA or FASTQ input, the pipeline produces one or more
//! *volumes*: a packed concatenated sequence text, one subset suffix array
//! per cyclic subset seed, bucket lookup tables over fixed-depth subset
//! prefixes, and a `.prj` manifest describing the build.

#![warn(missing_docs)]

pub mod alphabet;
pub mod builder;
pub mod constants;
pub mod error;
pub mod masker;
pub mod multi_sequence;
pub mod seed;
pub mod serialization;
pub mod suffix_array;

// Re-export the common types at the crate root
pub use alphabet::Alphabet;
pub use builder::{BuildConfig, DatabaseBuilder, Manifest, SequenceFormat, TantanSetting};
pub use constants::Position;
pub use error::{Error, Result};
pub use masker::TantanMasker;
pub use multi_sequence::MultiSequence;
pub use seed::CyclicSubsetSeed;
pub use suffix_array::{ChildTableType, SubsetSuffixArray};

/// Version information
pub fn version() -> (u8, u8, u8) {
    constants::VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let (major, minor, patch) = version();
        assert_eq!(major, 0);
        assert_eq!(minor, 3);
        assert_eq!(patch, 1);
    }
}
