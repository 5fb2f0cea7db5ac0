//! Bucket table construction.
//!
//! The bucket table maps every possible `depth`-position subset prefix to
//! its span in the sorted suffix array, so the query side can descend into
//! the array with one lookup. Prefixes are numbered by a mixed radix over
//! the per-position subset counts, with one trailing slot per level for
//! prefixes that end at the delimiter there:
//!
//! ```text
//! steps[depth] = 1
//! steps[k]     = t_k * steps[k+1] + 1        (t_k = subsets at position k)
//! value        = sum of s_k * steps[k+1], stopping with t_k * steps[k+1]
//!                on the delimiter
//! ```
//!
//! The trailing slot sits after every real subset of its level, matching the
//! sort's delimiter-last digit order, so bucket values are monotone along
//! the sorted array.

use super::SubsetSuffixArray;
use crate::constants::{Position, MAX_BUCKET_ENTRIES};
use crate::error::{Error, Result};
use crate::seed::DELIMITER_SUBSET;

/// Auto depth never exceeds this many seed positions.
const MAX_AUTO_DEPTH: usize = 64;

impl SubsetSuffixArray {
    /// Build the bucket boundary table at `depth`, or at an automatically
    /// chosen depth when `None`.
    ///
    /// The table holds `steps[0] + 1` boundaries; entry `v` is the first
    /// array slot whose prefix value is at least `v`, so bucket `v` spans
    /// `[table[v], table[v+1])` and the buckets partition the array.
    pub fn make_buckets(&mut self, text: &[u8], depth: Option<usize>) -> Result<()> {
        let depth = match depth {
            Some(d) => d,
            None => self.default_bucket_depth(),
        };
        let steps = self.bucket_steps(depth).ok_or_else(|| {
            Error::BadArgument(format!("bucket depth too deep: {}", depth))
        })?;
        let total = steps[0];

        let mut boundaries: Vec<Position> = Vec::new();
        boundaries.try_reserve_exact(total + 1)?;

        let mut next_value = 0usize;
        for (i, &pos) in self.positions.iter().enumerate() {
            let v = self.bucket_value(text, pos as usize, depth, &steps);
            debug_assert!(v + 1 >= next_value, "bucket values must be monotone");
            while next_value <= v {
                boundaries.push(i as Position);
                next_value += 1;
            }
        }
        while next_value <= total {
            boundaries.push(self.positions.len() as Position);
            next_value += 1;
        }

        self.buckets = boundaries;
        self.bucket_depth = depth;
        self.bucket_subset_counts = (0..depth)
            .map(|k| self.seed.subset_count(k) as Position)
            .collect();
        Ok(())
    }

    fn bucket_value(&self, text: &[u8], pos: usize, depth: usize, steps: &[usize]) -> usize {
        let mut value = 0;
        for k in 0..depth {
            let subset = self.seed.subset(k, text[pos + k]);
            if subset == DELIMITER_SUBSET {
                return value + self.seed.subset_count(k) * steps[k + 1];
            }
            value += subset as usize * steps[k + 1];
        }
        value
    }

    /// Subtree sizes per level, or `None` when the table would not be
    /// addressable.
    fn bucket_steps(&self, depth: usize) -> Option<Vec<usize>> {
        let mut steps = vec![1usize; depth + 1];
        for k in (0..depth).rev() {
            steps[k] = self
                .seed
                .subset_count(k)
                .checked_mul(steps[k + 1])?
                .checked_add(1)?;
            if steps[k] > MAX_BUCKET_ENTRIES {
                return None;
            }
        }
        Some(steps)
    }

    /// Deepest table that stays within a quarter of the position count.
    fn default_bucket_depth(&self) -> usize {
        let limit = std::cmp::max(self.positions.len() / 4, 64);
        let mut depth = 0;
        while depth < MAX_AUTO_DEPTH {
            match self.bucket_steps(depth + 1) {
                Some(steps) if steps[0] <= limit => depth += 1,
                _ => break,
            }
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::seed::CyclicSubsetSeed;
    use crate::suffix_array::ChildTableType;

    fn build(raw: &[u8], pattern: &str, depth: Option<usize>) -> (Vec<u8>, SubsetSuffixArray) {
        let alphabet = Alphabet::dna();
        let mut text = Vec::with_capacity(raw.len() + 2);
        text.push(b' ');
        text.extend_from_slice(raw);
        text.push(b' ');
        alphabet.tr(&mut text, false);

        let seed = CyclicSubsetSeed::init(&alphabet, pattern, false).unwrap();
        let mut index = SubsetSuffixArray::new(seed);
        index
            .add_positions(&text, 1, 1 + raw.len(), 1, 1)
            .unwrap();
        index.sort_index(&text, 0, ChildTableType::None).unwrap();
        index.make_buckets(&text, depth).unwrap();
        (text, index)
    }

    #[test]
    fn test_depth_one_reference_spans() {
        let (_, index) = build(b"ACGTACGT", "1", Some(1));
        // four letter buckets of two, an empty delimiter slot at the end
        assert_eq!(index.bucket_boundaries(), &[0, 2, 4, 6, 8, 8]);
        assert_eq!(index.bucket_depth(), 1);
    }

    #[test]
    fn test_buckets_partition_and_agree_with_prefixes() {
        let (text, index) = build(b"GATTACAGATTACAGGT", "1T", Some(3));
        let steps = index.bucket_steps(3).unwrap();
        let bounds = index.bucket_boundaries();
        assert_eq!(bounds.len(), steps[0] + 1);
        assert_eq!(bounds[0], 0);
        assert_eq!(*bounds.last().unwrap() as usize, index.positions().len());
        for w in bounds.windows(2) {
            assert!(w[0] <= w[1]);
        }
        // every array entry lies inside the span of its own prefix value
        for (i, &pos) in index.positions().iter().enumerate() {
            let v = index.bucket_value(&text, pos as usize, 3, &steps);
            assert!((bounds[v] as usize) <= i && i < bounds[v + 1] as usize);
        }
    }

    #[test]
    fn test_auto_depth_bounded_by_position_count() {
        let (_, index) = build(b"GATTACAGATTACAGGTACGATCGA", "1", None);
        let entries = index.bucket_boundaries().len() - 1;
        assert!(entries <= 64.max(index.positions().len() / 4));
        assert!(index.bucket_depth() >= 1);
    }

    #[test]
    fn test_explicit_depth_overflow_rejected() {
        let alphabet = Alphabet::dna();
        let mut text = b" ACGT ".to_vec();
        alphabet.tr(&mut text, false);
        let seed = CyclicSubsetSeed::init(&alphabet, "1", false).unwrap();
        let mut index = SubsetSuffixArray::new(seed);
        index.add_positions(&text, 1, 5, 1, 1).unwrap();
        index.sort_index(&text, 0, ChildTableType::None).unwrap();
        assert!(index.make_buckets(&text, Some(1000)).is_err());
    }
}
