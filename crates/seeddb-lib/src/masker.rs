//! Probabilistic low-complexity soft-masking.
//!
//! The model scans left to right with one background state and one repeat
//! state per offset `1..=max_offset`. A repeat state at offset `d` is
//! rewarded when the current letter equals the letter `d` positions back,
//! via a likelihood ratio above 1 for matches and below 1 for mismatches.
//! State probabilities are renormalised at every position and a position is
//! soft-masked when the total repeat probability exceeds `min_prob`. The
//! decision at a position depends only on preceding letters, so disjoint
//! regions can be masked concurrently.

use crate::alphabet::Alphabet;

const REPEAT_END_PROB: f64 = 0.05;
const OFFSET_DECAY: f64 = 0.9;
const MIN_MASK_PROB: f64 = 0.5;

/// In-place soft-masker for locally self-similar text.
pub struct TantanMasker {
    max_offset: usize,
    repeat_prob: f64,
    first_offset_probs: Vec<f64>,
    match_ratio: f64,
    mismatch_ratio: f64,
    canonical: [u8; 256],
    num_letters: u8,
}

impl TantanMasker {
    /// Set up the model for one alphabet.
    ///
    /// `is_stricter` raises the repeat-entry probability, masking more
    /// aggressively. The likelihood ratios are the balanced match/mismatch
    /// pair for the alphabet size: `r` and `1/r` with
    /// `(1/A)·r + ((A−1)/A)/r = 1`, giving r = 3 for DNA and r = 19 for
    /// protein.
    pub fn init(is_protein: bool, is_stricter: bool, alphabet: &Alphabet) -> Self {
        let max_offset = if is_protein { 50 } else { 100 };
        let repeat_prob = if is_stricter { 0.02 } else { 0.005 };

        let mut first_offset_probs: Vec<f64> =
            (1..=max_offset).map(|d| OFFSET_DECAY.powi(d as i32)).collect();
        let total: f64 = first_offset_probs.iter().sum();
        for p in &mut first_offset_probs {
            *p /= total;
        }

        let size = alphabet.size() as f64;
        let match_ratio = size - 1.0;
        let mismatch_ratio = 1.0 / match_ratio;

        // Fold case so masked letters keep matching their unmasked twins;
        // anything non-canonical resets the model.
        let mut canonical = [u8::MAX; 256];
        let to_upper = alphabet.numbers_to_uppercase();
        for code in 0..=255u8 {
            let upper = to_upper[code as usize];
            if (upper as usize) < alphabet.size() {
                canonical[code as usize] = upper;
            }
        }

        Self {
            max_offset,
            repeat_prob,
            first_offset_probs,
            match_ratio,
            mismatch_ratio,
            canonical,
            num_letters: alphabet.size() as u8,
        }
    }

    /// Soft-mask repetitive positions of a coded range in place, rewriting
    /// them through `to_lowercase` and leaving everything else untouched.
    pub fn mask(&self, seq: &mut [u8], to_lowercase: &[u8; 256]) {
        let mut background = 1.0f64;
        let mut foreground = vec![0.0f64; self.max_offset + 1];
        let mut foreground_total = 0.0f64;
        let mut region_start = 0usize;

        for i in 0..seq.len() {
            let letter = self.canonical[seq[i] as usize];
            if letter >= self.num_letters {
                background = 1.0;
                foreground.fill(0.0);
                foreground_total = 0.0;
                region_start = i + 1;
                continue;
            }

            // lookback never crosses a non-letter
            let depth = self.max_offset.min(i - region_start);
            let b0 = background;
            let fg0 = foreground_total;
            let mut fg = 0.0;
            for d in 1..=depth {
                let emit = if self.canonical[seq[i - d] as usize] == letter {
                    self.match_ratio
                } else {
                    self.mismatch_ratio
                };
                let stay = foreground[d] * (1.0 - REPEAT_END_PROB);
                let enter = b0 * self.repeat_prob * self.first_offset_probs[d - 1];
                foreground[d] = (stay + enter) * emit;
                fg += foreground[d];
            }
            background = b0 * (1.0 - self.repeat_prob) + fg0 * REPEAT_END_PROB;

            let total = background + fg;
            background /= total;
            for d in 1..=depth {
                foreground[d] /= total;
            }
            foreground_total = fg / total;

            if foreground_total > MIN_MASK_PROB {
                seq[i] = to_lowercase[seq[i] as usize];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coded(alphabet: &Alphabet, raw: &[u8]) -> Vec<u8> {
        let mut v = raw.to_vec();
        alphabet.tr(&mut v, false);
        v
    }

    fn masked_flags(alphabet: &Alphabet, raw: &[u8]) -> Vec<bool> {
        let masker = TantanMasker::init(false, false, alphabet);
        let mut seq = coded(alphabet, raw);
        masker.mask(&mut seq, alphabet.numbers_to_lowercase());
        seq.iter()
            .map(|&c| c >= alphabet.num_uppercase_codes())
            .collect()
    }

    #[test]
    fn test_homopolymer_run_is_masked() {
        let alphabet = Alphabet::dna();
        let flags = masked_flags(&alphabet, &[b'A'; 40]);
        assert!(!flags[0], "no context yet at the first letter");
        assert!(flags[20..].iter().all(|&m| m), "deep in the run");
        assert!(flags.iter().filter(|&&m| m).count() > 25);
    }

    #[test]
    fn test_period_two_repeat_is_masked() {
        let alphabet = Alphabet::dna();
        let raw: Vec<u8> = b"ACACACACACACACACACACACACACACAC".to_vec();
        let flags = masked_flags(&alphabet, &raw);
        assert!(flags[raw.len() - 1]);
        assert!(flags.iter().filter(|&&m| m).count() > raw.len() / 2);
    }

    #[test]
    fn test_random_looking_text_is_untouched() {
        let alphabet = Alphabet::dna();
        let flags = masked_flags(&alphabet, b"ACGTTGCAGATCCGATAGCTTACGGACT");
        assert!(flags.iter().all(|&m| !m));
    }

    #[test]
    fn test_masking_ends_after_repeat() {
        let alphabet = Alphabet::dna();
        let mut raw = vec![b'A'; 30];
        raw.extend_from_slice(b"CGTCGACTGATCGTAC");
        let flags = masked_flags(&alphabet, &raw);
        assert!(flags[29]);
        assert!(!flags[raw.len() - 1]);
    }

    #[test]
    fn test_delimiter_resets_model() {
        let alphabet = Alphabet::dna();
        let masker = TantanMasker::init(false, false, &alphabet);
        // two short A-runs separated by a delimiter mask like two
        // independent short runs
        let mut joined = coded(&alphabet, &[b'A'; 12]);
        joined[6] = alphabet.delimiter();
        let mut separate = coded(&alphabet, &[b'A'; 5]);
        masker.mask(&mut joined, alphabet.numbers_to_lowercase());
        masker.mask(&mut separate, alphabet.numbers_to_lowercase());
        assert_eq!(&joined[7..12], &separate[..]);
    }

    #[test]
    fn test_stricter_masks_earlier() {
        let alphabet = Alphabet::dna();
        let standard = TantanMasker::init(false, false, &alphabet);
        let stricter = TantanMasker::init(false, true, &alphabet);
        let mut a = coded(&alphabet, &[b'G'; 20]);
        let mut b = a.clone();
        standard.mask(&mut a, alphabet.numbers_to_lowercase());
        stricter.mask(&mut b, alphabet.numbers_to_lowercase());
        let count = |seq: &[u8]| {
            seq.iter()
                .filter(|&&c| c >= alphabet.num_uppercase_codes())
                .count()
        };
        assert!(count(&b) >= count(&a));
        assert!(count(&b) > 0);
    }
}
