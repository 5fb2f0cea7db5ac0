//! Cyclic subset seeds.
//!
//! A seed is an ordered sequence of positions; each position groups letters
//! into subsets, and two text positions match at a cyclic offset when their
//! letters fall in the same subset there. The seed drives which positions
//! get indexed, the order of the suffix array, and the bucket table layout.
//!
//! Seed text is line oriented. `#` lines are comments (`#lastal` lines are
//! forwarded to the manifest, `#seeddb` lines carry embedded build options);
//! every other non-blank line is one pattern, and each pattern becomes an
//! independent seed. Pattern position descriptors:
//!
//! * `1` — every canonical letter its own subset (exact match);
//! * `0` — all letters in one subset (matches anything);
//! * `T` or `t` — DNA transition position, subsets `AG` and `CT`;
//! * a canonical letter, e.g. `A` — one subset holding that letter;
//! * a parenthesised group, e.g. `(AG)` or `(AG|CT)` — listed subsets,
//!   `|`-separated.
//!
//! Letters a position leaves out map to the delimiter subset and are not
//! indexed at that position.

use std::cmp::Ordering;

use crate::alphabet::Alphabet;
use crate::error::{Error, Result};
use crate::serialization;

/// Reserved subset id that terminates seed comparison.
///
/// It is numerically the largest subset, so suffixes that end sort after
/// suffixes that continue.
pub const DELIMITER_SUBSET: u8 = 255;

/// Built-in transition-tolerant DNA seed, selected by name `YASS`.
const YASS: &str = "\
# transition-tolerant DNA seed
#lastal -m50
1T1001100101
";

/// One parsed seed: a cyclic array of 256-entry code→subset tables.
#[derive(Clone, Default)]
pub struct CyclicSubsetSeed {
    maps: Vec<[u8; 256]>,
    counts: Vec<u8>,
    pattern: String,
}

impl CyclicSubsetSeed {
    /// Parse one pattern into per-position subset tables.
    ///
    /// Case-insensitive seeds map lowercase-tier codes like their uppercase
    /// twins; case-sensitive seeds map them to the delimiter subset, which
    /// excludes soft-masked letters from the index.
    pub fn init(alphabet: &Alphabet, pattern: &str, case_sensitive: bool) -> Result<Self> {
        let mut seed = Self {
            maps: Vec::new(),
            counts: Vec::new(),
            pattern: pattern.to_string(),
        };

        let canonical = |letter: u8| -> Result<u8> {
            let code = alphabet.encode(letter);
            if (code as usize) < alphabet.size() {
                Ok(code)
            } else {
                Err(Error::BadSeed(format!(
                    "unknown letter '{}' in pattern: {}",
                    letter as char, pattern
                )))
            }
        };

        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            let subsets: Vec<Vec<u8>> = match c {
                '1' => (0..alphabet.size() as u8).map(|code| vec![code]).collect(),
                '0' => vec![all_letter_codes(alphabet)],
                'T' | 't' => {
                    if alphabet.letters() != crate::alphabet::DNA {
                        return Err(Error::BadSeed(format!(
                            "transition position in non-DNA pattern: {}",
                            pattern
                        )));
                    }
                    vec![
                        vec![canonical(b'A')?, canonical(b'G')?],
                        vec![canonical(b'C')?, canonical(b'T')?],
                    ]
                }
                '(' => {
                    let mut group = String::new();
                    loop {
                        match chars.next() {
                            Some(')') => break,
                            Some(g) => group.push(g),
                            None => {
                                return Err(Error::BadSeed(format!(
                                    "unclosed group in pattern: {}",
                                    pattern
                                )))
                            }
                        }
                    }
                    let mut subsets = Vec::new();
                    for part in group.split('|') {
                        let mut codes = Vec::new();
                        for letter in part.bytes() {
                            codes.push(canonical(letter)?);
                        }
                        subsets.push(codes);
                    }
                    subsets
                }
                letter if letter.is_ascii_uppercase() => vec![vec![canonical(letter as u8)?]],
                other => {
                    return Err(Error::BadSeed(format!(
                        "bad symbol '{}' in pattern: {}",
                        other, pattern
                    )))
                }
            };
            seed.push_position(alphabet, &subsets, case_sensitive, pattern)?;
        }

        if seed.maps.is_empty() {
            return Err(Error::BadSeed(format!("empty pattern: {}", pattern)));
        }
        Ok(seed)
    }

    fn push_position(
        &mut self,
        alphabet: &Alphabet,
        subsets: &[Vec<u8>],
        case_sensitive: bool,
        pattern: &str,
    ) -> Result<()> {
        if subsets.len() >= DELIMITER_SUBSET as usize {
            return Err(Error::BadSeed(format!("too many subsets: {}", pattern)));
        }
        let mut map = [DELIMITER_SUBSET; 256];
        for (id, subset) in subsets.iter().enumerate() {
            if subset.is_empty() {
                return Err(Error::BadSeed(format!("empty subset in: {}", pattern)));
            }
            for &code in subset {
                if map[code as usize] != DELIMITER_SUBSET {
                    return Err(Error::BadSeed(format!(
                        "letter '{}' in two subsets: {}",
                        alphabet.decode(code) as char,
                        pattern
                    )));
                }
                map[code as usize] = id as u8;
                if !case_sensitive {
                    map[alphabet.lowercase_code(code) as usize] = id as u8;
                }
            }
        }
        self.maps.push(map);
        self.counts.push(subsets.len() as u8);
        Ok(())
    }

    /// Cyclic length of the seed.
    pub fn span(&self) -> usize {
        self.maps.len()
    }

    /// The code→subset table at a cyclic depth.
    pub fn map(&self, depth: usize) -> &[u8; 256] {
        &self.maps[depth % self.maps.len()]
    }

    /// Number of real subsets at a cyclic depth.
    pub fn subset_count(&self, depth: usize) -> usize {
        self.counts[depth % self.counts.len()] as usize
    }

    /// Subset of one letter code at a cyclic depth.
    #[inline]
    pub fn subset(&self, depth: usize, code: u8) -> u8 {
        self.map(depth)[code as usize]
    }

    /// The pattern this seed was parsed from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Subset comparison of the suffixes at `a` and `b`, both already equal
    /// over the first `depth` cyclic positions.
    ///
    /// Comparison stops as soon as either side reaches the delimiter subset;
    /// two suffixes that stop together are equal. The walk is bounded
    /// because every record ends with a delimiter byte.
    pub fn compare_from(&self, text: &[u8], a: usize, b: usize, depth: usize) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let mut k = depth;
        loop {
            let map = self.map(k);
            let sa = map[text[a + k] as usize];
            let sb = map[text[b + k] as usize];
            if sa != sb {
                return sa.cmp(&sb);
            }
            if sa == DELIMITER_SUBSET {
                return Ordering::Equal;
            }
            k += 1;
        }
    }

    /// Subset comparison of two suffixes from cyclic position 0.
    pub fn compare(&self, text: &[u8], a: usize, b: usize) -> Ordering {
        self.compare_from(text, a, b, 0)
    }
}

fn all_letter_codes(alphabet: &Alphabet) -> Vec<u8> {
    (0..alphabet.num_uppercase_codes())
        .filter(|&code| code != alphabet.delimiter())
        .collect()
}

/// Yield the next pattern line of a seed text, skipping comments and blanks.
pub fn next_pattern<'a>(lines: &mut impl Iterator<Item = &'a str>) -> Option<&'a str> {
    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        return Some(line);
    }
    None
}

/// Parse every pattern of a seed text into seeds.
pub fn seeds_from_text(
    alphabet: &Alphabet,
    text: &str,
    case_sensitive: bool,
) -> Result<Vec<CyclicSubsetSeed>> {
    let mut seeds = Vec::new();
    let mut lines = text.lines();
    while let Some(pattern) = next_pattern(&mut lines) {
        seeds.push(CyclicSubsetSeed::init(alphabet, pattern, case_sensitive)?);
    }
    if seeds.is_empty() {
        return Err(Error::BadSeed("no seed patterns".into()));
    }
    Ok(seeds)
}

/// `#lastal …` lines of a seed text, forwarded verbatim into the manifest
/// for the query tool.
pub fn lastal_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.starts_with("#lastal"))
        .map(str::to_string)
        .collect()
}

/// Build-option tokens embedded in `#seeddb …` lines of a seed text.
pub fn embedded_option_tokens(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.starts_with("#seeddb"))
        .flat_map(|line| line.split_whitespace().skip(1))
        .map(str::to_string)
        .collect()
}

/// Resolve a `--seed-file` argument: a built-in seed name, else a file path.
pub fn load_seed_text(name: &str) -> Result<String> {
    if name == "YASS" {
        return Ok(YASS.to_string());
    }
    let bytes = serialization::read_file(std::path::Path::new(name))?;
    String::from_utf8(bytes).map_err(|_| Error::BadSeed(format!("non-text seed file: {}", name)))
}

/// Join ad-hoc pattern strings into seed text, one pattern per line.
pub fn text_from_patterns(patterns: &[String]) -> String {
    let mut text = String::new();
    for p in patterns {
        text.push_str(p);
        text.push('\n');
    }
    text
}

/// The default seed text: YASS for DNA, exact-match otherwise.
pub fn default_seed_text(alphabet: &Alphabet) -> String {
    if alphabet.letters() == crate::alphabet::DNA {
        YASS.to_string()
    } else {
        "1\n".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coded(alphabet: &Alphabet, raw: &[u8], keep_lowercase: bool) -> Vec<u8> {
        let mut v = raw.to_vec();
        alphabet.tr(&mut v, keep_lowercase);
        v
    }

    #[test]
    fn test_exact_match_position() {
        let a = Alphabet::dna();
        let seed = CyclicSubsetSeed::init(&a, "1", false).unwrap();
        assert_eq!(seed.span(), 1);
        assert_eq!(seed.subset_count(0), 4);
        assert_eq!(seed.subset(0, a.encode(b'A')), 0);
        assert_eq!(seed.subset(0, a.encode(b'T')), 3);
        assert_eq!(seed.subset(0, a.encode(b'N')), DELIMITER_SUBSET);
        assert_eq!(seed.subset(0, a.delimiter()), DELIMITER_SUBSET);
    }

    #[test]
    fn test_wildcard_position_includes_ambiguity() {
        let a = Alphabet::dna();
        let seed = CyclicSubsetSeed::init(&a, "0", false).unwrap();
        assert_eq!(seed.subset_count(0), 1);
        assert_eq!(seed.subset(0, a.encode(b'A')), 0);
        assert_eq!(seed.subset(0, a.encode(b'N')), 0);
        assert_eq!(seed.subset(0, a.delimiter()), DELIMITER_SUBSET);
    }

    #[test]
    fn test_transition_and_groups() {
        let a = Alphabet::dna();
        let t = CyclicSubsetSeed::init(&a, "T", false).unwrap();
        let g = CyclicSubsetSeed::init(&a, "(AG|CT)", false).unwrap();
        for seed in [&t, &g] {
            assert_eq!(seed.subset_count(0), 2);
            assert_eq!(
                seed.subset(0, a.encode(b'A')),
                seed.subset(0, a.encode(b'G'))
            );
            assert_eq!(
                seed.subset(0, a.encode(b'C')),
                seed.subset(0, a.encode(b'T'))
            );
            assert_ne!(
                seed.subset(0, a.encode(b'A')),
                seed.subset(0, a.encode(b'C'))
            );
        }
        assert!(CyclicSubsetSeed::init(&Alphabet::protein(), "T", false).is_err());
    }

    #[test]
    fn test_case_sensitivity() {
        let a = Alphabet::dna();
        let text = coded(&a, b" aA ", true);
        let insensitive = CyclicSubsetSeed::init(&a, "1", false).unwrap();
        assert_eq!(
            insensitive.subset(0, text[1]),
            insensitive.subset(0, text[2])
        );
        let sensitive = CyclicSubsetSeed::init(&a, "1", true).unwrap();
        assert_eq!(sensitive.subset(0, text[1]), DELIMITER_SUBSET);
        assert_ne!(sensitive.subset(0, text[2]), DELIMITER_SUBSET);
    }

    #[test]
    fn test_bad_patterns_rejected() {
        let a = Alphabet::dna();
        assert!(CyclicSubsetSeed::init(&a, "", false).is_err());
        assert!(CyclicSubsetSeed::init(&a, "1Z1", false).is_err());
        assert!(CyclicSubsetSeed::init(&a, "(AG", false).is_err());
        assert!(CyclicSubsetSeed::init(&a, "(AA)", false).is_err());
        assert!(CyclicSubsetSeed::init(&a, "1?1", false).is_err());
    }

    #[test]
    fn test_compare_stops_at_delimiter() {
        let a = Alphabet::dna();
        let seed = CyclicSubsetSeed::init(&a, "1", false).unwrap();
        // " ACGTACGT " coded: delimiters bracket the record
        let text = coded(&a, b" ACGTACGT ", false);
        // suffix 5 (ACGT$) ends where suffix 1 (ACGTACGT$) continues
        assert_eq!(seed.compare(&text, 1, 5), Ordering::Less);
        assert_eq!(seed.compare(&text, 5, 1), Ordering::Greater);
        assert_eq!(seed.compare(&text, 2, 6), Ordering::Less);
        assert_eq!(seed.compare(&text, 1, 1), Ordering::Equal);
    }

    #[test]
    fn test_seed_text_parsing() {
        let text = "# comment\n#lastal -m50\n1T1\n\n101\n";
        assert_eq!(lastal_lines(text), vec!["#lastal -m50".to_string()]);
        let seeds = seeds_from_text(&Alphabet::dna(), text, false).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].span(), 3);
        assert!(seeds_from_text(&Alphabet::dna(), "# nothing\n", false).is_err());
    }

    #[test]
    fn test_embedded_options() {
        let text = "#seeddb --index-step 2\n#seeddb --case-sensitive\n1\n";
        assert_eq!(
            embedded_option_tokens(text),
            vec!["--index-step", "2", "--case-sensitive"]
        );
    }

    #[test]
    fn test_builtin_yass() {
        let text = load_seed_text("YASS").unwrap();
        let seeds = seeds_from_text(&Alphabet::dna(), &text, false).unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].span(), 12);
        assert!(!lastal_lines(&text).is_empty());
    }
}
