//! Subset suffix arrays.
//!
//! A subset suffix array is a permutation of text positions ordered by
//! *subset comparison* under a cyclic seed, not by raw bytes: two suffixes
//! compare by the subset ids of their letters at each cyclic seed position,
//! and comparison stops at the delimiter subset. Construction runs in three
//! stages over one volume's text:
//!
//! 1. gather candidate positions ([`SubsetSuffixArray::add_positions`]),
//! 2. subset-bucketed radix sort ([`SubsetSuffixArray::sort_index`]),
//! 3. bucket table over fixed-depth prefixes
//!    ([`SubsetSuffixArray::make_buckets`]),
//!
//! after which [`SubsetSuffixArray::to_files`] persists the volume's
//! `.suf`/`.bck` pair plus the optional child table.

mod buckets;
mod sort;

use std::cmp::Ordering;
use std::path::PathBuf;

use crate::constants::Position;
use crate::error::Result;
use crate::seed::{CyclicSubsetSeed, DELIMITER_SUBSET};
use crate::serialization;

/// On-disk child table flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildTableType {
    /// No child table.
    #[default]
    None,
    /// One byte per slot, storing the forward offset to the next sibling
    /// bucket (0 when the offset overflows).
    Byte,
    /// Like `Byte` with 16-bit offsets.
    Short,
    /// Full-width absolute links.
    Full,
}

#[derive(Debug)]
pub(crate) enum ChildTable {
    None,
    Byte(Vec<u8>),
    Short(Vec<u16>),
    Full(Vec<Position>),
}

impl ChildTable {
    fn with_type(kind: ChildTableType, len: usize) -> Result<Self> {
        fn filled<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
            let mut v = Vec::new();
            v.try_reserve_exact(len)?;
            v.resize(len, T::default());
            Ok(v)
        }
        Ok(match kind {
            ChildTableType::None => ChildTable::None,
            ChildTableType::Byte => ChildTable::Byte(filled(len)?),
            ChildTableType::Short => ChildTable::Short(filled(len)?),
            ChildTableType::Full => ChildTable::Full(filled(len)?),
        })
    }

    /// Record that the non-first bucket starting at `slot` is followed by a
    /// sibling (or by its parent run's end) at `next`.
    fn set(&mut self, slot: usize, next: usize) {
        match self {
            ChildTable::None => {}
            ChildTable::Byte(v) => {
                let diff = next - slot;
                v[slot] = if diff <= u8::MAX as usize { diff as u8 } else { 0 };
            }
            ChildTable::Short(v) => {
                let diff = next - slot;
                v[slot] = if diff <= u16::MAX as usize {
                    diff as u16
                } else {
                    0
                };
            }
            ChildTable::Full(v) => v[slot] = next as Position,
        }
    }
}

/// One seed's suffix array over one volume of text.
pub struct SubsetSuffixArray {
    seed: CyclicSubsetSeed,
    positions: Vec<Position>,
    child: ChildTable,
    buckets: Vec<Position>,
    bucket_depth: usize,
    bucket_subset_counts: Vec<Position>,
}

impl SubsetSuffixArray {
    /// An empty array owning its seed for the duration of one build.
    pub fn new(seed: CyclicSubsetSeed) -> Self {
        Self {
            seed,
            positions: Vec::new(),
            child: ChildTable::None,
            buckets: Vec::new(),
            bucket_depth: 0,
            bucket_subset_counts: Vec::new(),
        }
    }

    /// The seed this array sorts under.
    pub fn seed(&self) -> &CyclicSubsetSeed {
        &self.seed
    }

    /// Hand the seed back after emit.
    pub fn into_seed(self) -> CyclicSubsetSeed {
        self.seed
    }

    /// The gathered (and, after sorting, ordered) positions.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Bucket boundary table, `table_entries + 1` monotone offsets.
    pub fn bucket_boundaries(&self) -> &[Position] {
        &self.buckets
    }

    /// Depth the bucket table was built at.
    pub fn bucket_depth(&self) -> usize {
        self.bucket_depth
    }

    /// Enumerate candidate suffix positions of one record interior.
    ///
    /// Candidates are every `step`-th position from `beg` whose leading
    /// letter maps to a real subset under seed position 0. With
    /// `window > 1`, consecutive candidates are taken in blocks of `window`
    /// and only the block's smallest position under subset comparison is
    /// kept, ties going to the earlier index.
    pub fn add_positions(
        &mut self,
        text: &[u8],
        beg: usize,
        end: usize,
        step: usize,
        window: usize,
    ) -> Result<()> {
        self.positions.try_reserve((end - beg) / step + 1)?;
        let map0 = self.seed.map(0);

        if window <= 1 {
            let mut i = beg;
            while i < end {
                if map0[text[i] as usize] != DELIMITER_SUBSET {
                    self.positions.push(i as Position);
                }
                i += step;
            }
            return Ok(());
        }

        let mut i = beg;
        while i < end {
            let mut best: Option<usize> = None;
            let mut taken = 0;
            while taken < window && i < end {
                if map0[text[i] as usize] != DELIMITER_SUBSET {
                    best = match best {
                        None => Some(i),
                        Some(b) if self.seed.compare(text, i, b) == Ordering::Less => Some(i),
                        keep => keep,
                    };
                }
                taken += 1;
                i += step;
            }
            if let Some(b) = best {
                self.positions.push(b as Position);
            }
        }
        Ok(())
    }

    /// Write the `.suf` array, `.bck` table and any child table.
    ///
    /// Multi-seed volumes pass their seed letter (`a`, `b`, …), which is
    /// inserted before the extension; a lonely seed writes plain names.
    pub fn to_files(
        &self,
        base: &str,
        seed_letter: Option<char>,
        text_length: usize,
    ) -> Result<()> {
        debug_assert!(self
            .positions
            .iter()
            .all(|&p| (p as usize) < text_length));

        let path = |ext: &str| -> PathBuf {
            match seed_letter {
                Some(letter) => PathBuf::from(format!("{}{}.{}", base, letter, ext)),
                None => PathBuf::from(format!("{}.{}", base, ext)),
            }
        };

        serialization::write_file(&path("suf"), |w| {
            serialization::write_positions(w, &self.positions)
        })?;

        serialization::write_file(&path("bck"), |w| {
            let mut header: Vec<Position> = Vec::with_capacity(1 + self.bucket_depth);
            header.push(self.bucket_depth as Position);
            header.extend_from_slice(&self.bucket_subset_counts);
            serialization::write_positions(w, &header)?;
            serialization::write_positions(w, &self.buckets)
        })?;

        match &self.child {
            ChildTable::None => {}
            ChildTable::Byte(table) => {
                serialization::write_file(&path("chi1"), |w| {
                    use std::io::Write;
                    w.write_all(table)
                })?;
            }
            ChildTable::Short(table) => {
                serialization::write_file(&path("chi2"), |w| {
                    serialization::write_shorts(w, table)
                })?;
            }
            ChildTable::Full(table) => {
                serialization::write_file(&path("chi"), |w| {
                    serialization::write_positions(w, table)
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;

    fn dna_text(raw: &[u8]) -> (Alphabet, Vec<u8>) {
        let alphabet = Alphabet::dna();
        let mut text = Vec::with_capacity(raw.len() + 2);
        text.push(b' ');
        text.extend_from_slice(raw);
        text.push(b' ');
        alphabet.tr(&mut text, false);
        (alphabet, text)
    }

    fn exact_seed(alphabet: &Alphabet) -> CyclicSubsetSeed {
        CyclicSubsetSeed::init(alphabet, "1", false).unwrap()
    }

    #[test]
    fn test_add_positions_skips_delimiter_subsets() {
        let (alphabet, text) = dna_text(b"ACNGT");
        let mut index = SubsetSuffixArray::new(exact_seed(&alphabet));
        index.add_positions(&text, 1, 6, 1, 1).unwrap();
        // 'N' maps to the delimiter subset under an exact seed
        assert_eq!(index.positions(), &[1, 2, 4, 5]);
    }

    #[test]
    fn test_add_positions_step() {
        let (alphabet, text) = dna_text(b"ACGTACGT");
        let mut index = SubsetSuffixArray::new(exact_seed(&alphabet));
        index.add_positions(&text, 1, 9, 3, 1).unwrap();
        assert_eq!(index.positions(), &[1, 4, 7]);
    }

    #[test]
    fn test_minimizer_window_keeps_block_minima() {
        let (alphabet, text) = dna_text(b"ACGTACGT");
        let mut index = SubsetSuffixArray::new(exact_seed(&alphabet));
        index.add_positions(&text, 1, 9, 1, 3).unwrap();
        // blocks {1,2,3},{4,5,6},{7,8}: 'A' suffixes win the first two,
        // and the longer suffix wins the tie against nothing in the last
        assert_eq!(index.positions(), &[1, 5, 7]);
    }

    #[test]
    fn test_minimizer_tie_prefers_earlier_index() {
        let (alphabet, text) = dna_text(b"AAAA");
        let mut index = SubsetSuffixArray::new(CyclicSubsetSeed::init(&alphabet, "0", false).unwrap());
        index.add_positions(&text, 1, 5, 1, 4).unwrap();
        // under a wildcard seed, suffixes differ only in length; the
        // longest (earliest) one compares smallest
        assert_eq!(index.positions(), &[1]);
    }
}
