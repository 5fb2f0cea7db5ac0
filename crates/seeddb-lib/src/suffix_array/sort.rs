//! Subset-bucketed radix sort.
//!
//! The sort runs an explicit work stack of equal-prefix runs. One pass over
//! a run at cyclic depth `k` counts the subset ids of `text[pos + k]`,
//! prefix-sums them into bucket offsets, scatters the run stably through a
//! scratch buffer, and pushes every bucket that still holds more than one
//! continuing suffix at depth `k + 1`. The delimiter digit is ordered after
//! every real subset and its bucket is terminal, which bounds the whole
//! recursion by the distance to each record's trailing delimiter.

use super::{ChildTable, ChildTableType, SubsetSuffixArray};
use crate::constants::Position;
use crate::error::Result;
use crate::seed::DELIMITER_SUBSET;

impl SubsetSuffixArray {
    /// Sort the gathered positions in place under the seed.
    ///
    /// Runs shorter than `min_unsorted_interval` skip further radix passes
    /// and are finished by a stable comparison sort from their current
    /// depth. `child_table_type` selects the sibling-link table recorded
    /// during the radix splits.
    pub fn sort_index(
        &mut self,
        text: &[u8],
        min_unsorted_interval: usize,
        child_table_type: ChildTableType,
    ) -> Result<()> {
        let n = self.positions.len();
        self.child = ChildTable::with_type(child_table_type, n)?;

        let mut scratch: Vec<Position> = Vec::new();
        scratch.try_reserve_exact(n)?;
        scratch.resize(n, 0);

        let mut stack: Vec<(usize, usize, usize)> = vec![(0, n, 0)];
        while let Some((beg, end, depth)) = stack.pop() {
            if end - beg < 2 {
                continue;
            }
            if min_unsorted_interval > 0 && end - beg <= min_unsorted_interval {
                let seed = &self.seed;
                self.positions[beg..end]
                    .sort_by(|&a, &b| seed.compare_from(text, a as usize, b as usize, depth));
                continue;
            }

            let num_subsets = self.seed.subset_count(depth);
            let map = self.seed.map(depth);
            let delim_digit = num_subsets;
            let digit = |pos: Position| -> usize {
                let subset = map[text[pos as usize + depth] as usize];
                if subset == DELIMITER_SUBSET {
                    delim_digit
                } else {
                    subset as usize
                }
            };

            let mut counts = vec![0usize; num_subsets + 1];
            for &pos in &self.positions[beg..end] {
                counts[digit(pos)] += 1;
            }

            if counts.iter().filter(|&&c| c > 0).count() == 1 {
                // the whole run shares one subset: no split, no scatter
                if counts[delim_digit] == 0 {
                    stack.push((beg, end, depth + 1));
                }
                continue;
            }

            let mut offsets = vec![0usize; num_subsets + 2];
            for d in 0..=num_subsets {
                offsets[d + 1] = offsets[d] + counts[d];
            }

            let mut cursor = offsets.clone();
            for &pos in &self.positions[beg..end] {
                let d = digit(pos);
                scratch[cursor[d]] = pos;
                cursor[d] += 1;
            }
            self.positions[beg..end].copy_from_slice(&scratch[..end - beg]);

            let mut starts: Vec<usize> = Vec::with_capacity(num_subsets + 1);
            for d in 0..=num_subsets {
                if counts[d] == 0 {
                    continue;
                }
                let start = beg + offsets[d];
                starts.push(start);
                if counts[d] > 1 && d != delim_digit {
                    stack.push((start, start + counts[d], depth + 1));
                }
            }
            // Sibling links live at the non-first bucket starts, so deeper
            // splits (whose first bucket shares this run's start) never
            // collide with them.
            for j in 1..starts.len() {
                let next = starts.get(j + 1).copied().unwrap_or(end);
                self.child.set(starts[j], next);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::seed::CyclicSubsetSeed;
    use std::cmp::Ordering;

    fn build_sorted(raw: &[u8], pattern: &str, min_unsorted: usize) -> (Vec<u8>, SubsetSuffixArray) {
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
        index
            .sort_index(&text, min_unsorted, ChildTableType::None)
            .unwrap();
        (text, index)
    }

    fn assert_sorted(text: &[u8], index: &SubsetSuffixArray) {
        for pair in index.positions().windows(2) {
            let order =
                index
                    .seed()
                    .compare(text, pair[0] as usize, pair[1] as usize);
            assert_ne!(order, Ordering::Greater, "{:?}", index.positions());
        }
    }

    #[test]
    fn test_reference_order() {
        let (_, index) = build_sorted(b"ACGTACGT", "1", 0);
        // equal-prefix pairs keep gathering order; ended suffixes go last
        assert_eq!(index.positions(), &[1, 5, 2, 6, 3, 7, 4, 8]);
    }

    #[test]
    fn test_sorted_under_subset_comparison() {
        let (text, index) = build_sorted(b"GATTACAGATTACAGGT", "1", 0);
        assert_sorted(&text, &index);
    }

    #[test]
    fn test_transition_seed_order() {
        let (text, index) = build_sorted(b"AGCTAGCT", "T1", 0);
        assert_sorted(&text, &index);
        // under a transition first position, A and G prefixes interleave
        let firsts: Vec<u8> = index
            .positions()
            .iter()
            .map(|&p| text[p as usize])
            .collect();
        let alphabet = Alphabet::dna();
        let purines = [alphabet.encode(b'A'), alphabet.encode(b'G')];
        let split = firsts.iter().take_while(|c| purines.contains(c)).count();
        assert!(firsts[..split].iter().all(|c| purines.contains(c)));
        assert!(firsts[split..].iter().all(|c| !purines.contains(c)));
    }

    #[test]
    fn test_comparison_fallback_matches_radix() {
        let raw = b"GATTACAGATTACAGGTACGATCGATTACA";
        let (_, radix) = build_sorted(raw, "1T10", 0);
        let (_, fallback) = build_sorted(raw, "1T10", 1_000_000);
        assert_eq!(radix.positions(), fallback.positions());
    }

    #[test]
    fn test_every_gathered_position_survives() {
        let raw = b"ACGTNNACGTACGT";
        let (_, index) = build_sorted(raw, "1", 0);
        let mut sorted = index.positions().to_vec();
        sorted.sort_unstable();
        let expected: Vec<Position> = (1..=raw.len() as Position)
            .filter(|&p| raw[p as usize - 1] != b'N')
            .collect();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_child_table_sibling_chains() {
        let alphabet = Alphabet::dna();
        let mut text = b" ACGTACGT ".to_vec();
        alphabet.tr(&mut text, false);
        let seed = CyclicSubsetSeed::init(&alphabet, "1", false).unwrap();
        let mut index = SubsetSuffixArray::new(seed);
        index.add_positions(&text, 1, 9, 1, 1).unwrap();
        index
            .sort_index(&text, 0, ChildTableType::Full)
            .unwrap();

        let table = match &index.child {
            ChildTable::Full(t) => t.clone(),
            _ => unreachable!(),
        };
        // depth-0 buckets start at 0, 2, 4, 6; non-first starts chain to
        // the next sibling, and each two-element run links its split point
        // to its own end
        assert_eq!(table, vec![0, 2, 4, 4, 6, 6, 8, 8]);
    }
}
