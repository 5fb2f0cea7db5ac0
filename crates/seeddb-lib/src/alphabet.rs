//! Byte-to-code translation for sequence text.
//!
//! The concatenated database text stores small integer codes, not raw bytes.
//! Codes are laid out in two case tiers:
//!
//! ```text
//! 0 .. size-1      canonical uppercase letters, in canonical order
//! size             the delimiter (also the sentinel for non-letter bytes)
//! size+1 .. U-1    remaining ASCII uppercase letters (ambiguity codes)
//! U .. 2U-1        lowercase twin of each uppercase-tier letter
//! ```
//!
//! Translation is total: every possible input byte maps to a letter code or
//! to the delimiter. Whitespace maps to the delimiter, which is what the
//! between-record pad bytes rely on.

use crate::error::{Error, Result};

/// Canonical DNA letters.
pub const DNA: &str = "ACGT";

/// Canonical protein letters.
pub const PROTEIN: &str = "ACDEFGHIKLMNPQRSTVWY";

/// A bijection between raw sequence bytes and letter codes.
#[derive(Clone)]
pub struct Alphabet {
    letters: String,
    size: u8,
    upper_codes: u8,
    encode_folded: [u8; 256],
    encode_cased: [u8; 256],
    to_upper: [u8; 256],
    to_lower: [u8; 256],
    decode: [u8; 256],
}

impl Alphabet {
    /// The DNA alphabet.
    pub fn dna() -> Self {
        Self::from_letters(DNA).expect("built-in alphabet")
    }

    /// The protein alphabet.
    pub fn protein() -> Self {
        Self::from_letters(PROTEIN).expect("built-in alphabet")
    }

    /// Build an alphabet from a user-supplied canonical letter string.
    ///
    /// Letters must be distinct ASCII uppercase. All other uppercase letters
    /// still receive codes (as ambiguity letters) so that translation stays
    /// total; they are simply never counted or indexed as canonical.
    pub fn from_letters(letters: &str) -> Result<Self> {
        let bytes = letters.as_bytes();
        if bytes.is_empty() {
            return Err(Error::BadArgument("empty alphabet".into()));
        }
        let mut seen = [false; 256];
        for &b in bytes {
            if !b.is_ascii_uppercase() {
                return Err(Error::BadArgument(format!(
                    "bad alphabet letter: {}",
                    b as char
                )));
            }
            if seen[b as usize] {
                return Err(Error::BadArgument(format!(
                    "repeated alphabet letter: {}",
                    b as char
                )));
            }
            seen[b as usize] = true;
        }

        let size = bytes.len() as u8;
        let delimiter = size;

        // Assign uppercase-tier codes: canonical letters, the delimiter,
        // then the leftover ASCII letters in alphabetical order.
        let mut code_of = [0u8; 256];
        let mut decode = [b' '; 256];
        let mut next = 0u8;
        for &b in bytes {
            code_of[b as usize] = next;
            decode[next as usize] = b;
            next += 1;
        }
        next += 1; // skip the delimiter code
        for b in b'A'..=b'Z' {
            if !seen[b as usize] {
                code_of[b as usize] = next;
                decode[next as usize] = b;
                next += 1;
            }
        }
        let upper_codes = next;

        let mut encode_folded = [delimiter; 256];
        let mut encode_cased = [delimiter; 256];
        let mut to_upper = [0u8; 256];
        let mut to_lower = [0u8; 256];
        for c in 0..=255u8 {
            to_upper[c as usize] = c;
            to_lower[c as usize] = c;
        }
        for b in b'A'..=b'Z' {
            let upper = code_of[b as usize];
            let lower = upper + upper_codes;
            encode_folded[b as usize] = upper;
            encode_folded[b.to_ascii_lowercase() as usize] = upper;
            encode_cased[b as usize] = upper;
            encode_cased[b.to_ascii_lowercase() as usize] = lower;
            to_upper[lower as usize] = upper;
            to_lower[upper as usize] = lower;
            decode[lower as usize] = b.to_ascii_lowercase();
        }
        decode[delimiter as usize] = b' ';

        Ok(Self {
            letters: letters.to_string(),
            size,
            upper_codes,
            encode_folded,
            encode_cased,
            to_upper,
            to_lower,
            decode,
        })
    }

    /// Number of canonical letters.
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// The canonical letter string.
    pub fn letters(&self) -> &str {
        &self.letters
    }

    /// Whether this is the built-in protein alphabet.
    pub fn is_protein(&self) -> bool {
        self.letters == PROTEIN
    }

    /// The delimiter code, one past the canonical letters.
    pub fn delimiter(&self) -> u8 {
        self.size
    }

    /// Number of uppercase-tier codes (canonical + delimiter + ambiguity).
    pub fn num_uppercase_codes(&self) -> u8 {
        self.upper_codes
    }

    /// Case-folding byte→code table.
    pub fn encode_table(&self) -> &[u8; 256] {
        &self.encode_folded
    }

    /// Case-folded code of one raw byte.
    pub fn encode(&self, byte: u8) -> u8 {
        self.encode_folded[byte as usize]
    }

    /// Code→code case fold.
    pub fn numbers_to_uppercase(&self) -> &[u8; 256] {
        &self.to_upper
    }

    /// Code→code lowercasing, used by the masker to soft-mask in place.
    pub fn numbers_to_lowercase(&self) -> &[u8; 256] {
        &self.to_lower
    }

    /// The lowercase twin of an uppercase-tier letter code.
    pub fn lowercase_code(&self, code: u8) -> u8 {
        self.to_lower[code as usize]
    }

    /// Raw byte for a code, for diagnostics and read-back.
    pub fn decode(&self, code: u8) -> u8 {
        self.decode[code as usize]
    }

    /// Translate a raw byte range to codes in place.
    ///
    /// With `keep_lowercase`, lowercase input letters keep their soft-mask
    /// signal by encoding into the lowercase tier; otherwise case is folded.
    pub fn tr(&self, seq: &mut [u8], keep_lowercase: bool) {
        let table = if keep_lowercase {
            &self.encode_cased
        } else {
            &self.encode_folded
        };
        for b in seq {
            *b = table[*b as usize];
        }
    }

    /// Add canonical-letter frequencies over a coded range into `counts`.
    ///
    /// Case is folded; ambiguity codes and delimiters are not counted.
    pub fn count(&self, seq: &[u8], counts: &mut [u64]) {
        for &c in seq {
            let u = self.to_upper[c as usize];
            if u < self.size {
                counts[u as usize] += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dna_layout() {
        let a = Alphabet::dna();
        assert_eq!(a.size(), 4);
        assert_eq!(a.encode(b'A'), 0);
        assert_eq!(a.encode(b'C'), 1);
        assert_eq!(a.encode(b'G'), 2);
        assert_eq!(a.encode(b'T'), 3);
        assert_eq!(a.delimiter(), 4);
        // Ambiguity letters sit after the delimiter.
        assert!(a.encode(b'N') > a.delimiter());
        assert!(a.encode(b'N') < a.num_uppercase_codes());
    }

    #[test]
    fn test_translation_is_total() {
        let a = Alphabet::dna();
        let mut all: Vec<u8> = (0..=255u8).collect();
        a.tr(&mut all, true);
        for &c in &all {
            assert!(c < 2 * a.num_uppercase_codes());
        }
        // Whitespace and punctuation land on the delimiter.
        let mut ws = *b" \t\r\n.12-";
        a.tr(&mut ws, false);
        assert!(ws.iter().all(|&c| c == a.delimiter()));
    }

    #[test]
    fn test_case_tiers() {
        let a = Alphabet::dna();
        let mut kept = *b"aCgT";
        a.tr(&mut kept, true);
        let mut folded = *b"aCgT";
        a.tr(&mut folded, false);
        for (i, (&k, &f)) in kept.iter().zip(&folded).enumerate() {
            assert_eq!(a.numbers_to_uppercase()[k as usize], f, "position {}", i);
        }
        // kept lowercase letters are in the lowercase tier
        assert!(kept[0] >= a.num_uppercase_codes());
        assert!(kept[1] < a.num_uppercase_codes());
        // lowercasing an uppercase code is its twin
        assert_eq!(a.lowercase_code(folded[1]), {
            let mut c = *b"c";
            a.tr(&mut c, true);
            c[0]
        });
    }

    #[test]
    fn test_count_folds_case_and_skips_ambiguity() {
        let a = Alphabet::dna();
        let mut seq = *b"ACGTacgtNn ";
        a.tr(&mut seq, true);
        let mut counts = vec![0u64; a.size()];
        a.count(&seq, &mut counts);
        assert_eq!(counts, vec![2, 2, 2, 2]);
    }

    #[test]
    fn test_protein_flag() {
        assert!(Alphabet::protein().is_protein());
        assert!(!Alphabet::dna().is_protein());
        assert!(!Alphabet::from_letters("ACGU").unwrap().is_protein());
    }

    #[test]
    fn test_bad_alphabets_rejected() {
        assert!(Alphabet::from_letters("").is_err());
        assert!(Alphabet::from_letters("acgt").is_err());
        assert!(Alphabet::from_letters("AA").is_err());
    }
}
