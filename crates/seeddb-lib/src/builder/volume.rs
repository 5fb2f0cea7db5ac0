//! Building one database volume.
//!
//! A volume covers the finished records currently in the `MultiSequence`:
//! mask them (in parallel, split on record boundaries), write the manifest
//! and sequence files, then gather/sort/bucket/emit one suffix array per
//! seed. Seeds are moved into each `SubsetSuffixArray` for the duration of
//! its build and handed back afterwards.

use std::path::Path;

use rayon::prelude::*;
use tracing::info;

use crate::alphabet::Alphabet;
use crate::builder::config::BuildConfig;
use crate::builder::manifest;
use crate::error::Result;
use crate::masker::TantanMasker;
use crate::multi_sequence::MultiSequence;
use crate::seed::CyclicSubsetSeed;
use crate::suffix_array::SubsetSuffixArray;

/// First record of chunk `chunk` when the finished records are divided into
/// `num_chunks` letter-balanced spans. `chunk == num_chunks` gives the
/// record count, so consecutive calls bracket each chunk.
pub fn first_sequence_in_chunk(multi: &MultiSequence, num_chunks: usize, chunk: usize) -> usize {
    let n = multi.finished_sequences();
    if chunk >= num_chunks {
        return n;
    }
    let target = multi.finished_size() * chunk / num_chunks;
    let mut lo = 0;
    let mut hi = n;
    while lo < hi {
        let mid = (lo + hi) / 2;
        if multi.seq_beg(mid) < target {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Soft-mask every finished record in place, one worker per chunk.
///
/// Chunks are disjoint byte ranges split between records, and the masker's
/// decisions depend only on preceding letters of the same record, so the
/// result is independent of the chunk count.
fn mask_sequences(
    multi: &mut MultiSequence,
    masker: &TantanMasker,
    to_lowercase: &[u8; 256],
    num_chunks: usize,
) {
    let n = multi.finished_sequences();
    let finished = multi.finished_size();

    let record_bounds: Vec<usize> = (0..=num_chunks)
        .map(|c| first_sequence_in_chunk(multi, num_chunks, c))
        .collect();
    let byte_bounds: Vec<usize> = record_bounds
        .iter()
        .map(|&r| if r < n { multi.seq_beg(r) } else { finished })
        .collect();
    let interiors: Vec<Vec<(usize, usize)>> = (0..num_chunks)
        .map(|c| {
            (record_bounds[c]..record_bounds[c + 1])
                .map(|i| {
                    (
                        multi.seq_beg(i) - byte_bounds[c],
                        multi.seq_end(i) - byte_bounds[c],
                    )
                })
                .collect()
        })
        .collect();

    let mut tasks: Vec<(&mut [u8], &[(usize, usize)])> = Vec::with_capacity(num_chunks);
    let (_, mut rest) = multi.seq_writer()[..finished].split_at_mut(byte_bounds[0]);
    let mut consumed = byte_bounds[0];
    for c in 0..num_chunks {
        let (chunk, tail) = rest.split_at_mut(byte_bounds[c + 1] - consumed);
        consumed = byte_bounds[c + 1];
        rest = tail;
        tasks.push((chunk, interiors[c].as_slice()));
    }

    tasks.into_par_iter().for_each(|(buf, ranges)| {
        for &(beg, end) in ranges {
            masker.mask(&mut buf[beg..end], to_lowercase);
        }
    });
}

/// Make one database volume from the finished records.
#[allow(clippy::too_many_arguments)]
pub fn make_volume(
    seeds: &mut [CyclicSubsetSeed],
    multi: &mut MultiSequence,
    config: &BuildConfig,
    alphabet: &Alphabet,
    letter_counts: &[u64],
    masker: Option<&TantanMasker>,
    num_threads: usize,
    seed_text: &str,
    base_name: &str,
) -> Result<()> {
    let num_indexes = seeds.len();
    let num_sequences = multi.finished_sequences();
    let text_length = multi.finished_size();

    if let Some(masker) = masker {
        info!("masking...");
        let chunks = num_threads.clamp(1, num_sequences.max(1));
        mask_sequences(multi, masker, alphabet.numbers_to_lowercase(), chunks);
    }

    info!("writing...");
    let prj = manifest::build_manifest(
        config,
        alphabet,
        num_sequences as u64,
        letter_counts,
        None,
        num_indexes,
        seed_text,
    );
    prj.to_file(Path::new(&format!("{}.prj", base_name)))?;
    multi.to_files(base_name)?;

    for x in 0..num_indexes {
        let seed = std::mem::take(&mut seeds[x]);
        let mut index = SubsetSuffixArray::new(seed);

        info!("gathering...");
        let text = multi.seq_reader();
        for i in 0..num_sequences {
            index.add_positions(
                text,
                multi.seq_beg(i),
                multi.seq_end(i),
                config.index_step,
                config.minimizer_window,
            )?;
        }

        info!("sorting...");
        index.sort_index(text, config.min_seed_limit, config.child_table)?;

        info!("bucketing...");
        index.make_buckets(text, config.bucket_depth)?;

        info!("writing...");
        let seed_letter = (num_indexes > 1).then(|| (b'a' + x as u8) as char);
        index.to_files(base_name, seed_letter, text_length)?;

        seeds[x] = index.into_seed();
    }

    info!("done!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn filled(records: &[(&str, &str)]) -> MultiSequence {
        let mut text = String::new();
        for (name, seq) in records {
            text.push_str(&format!(">{}\n{}\n", name, seq));
        }
        let mut multi = MultiSequence::new();
        let mut input = Cursor::new(text.into_bytes());
        while multi.append_from_fasta(&mut input, usize::MAX).unwrap() {}
        multi
    }

    #[test]
    fn test_chunks_cover_all_records_in_order() {
        let multi = filled(&[("a", "ACGT"), ("b", "AC"), ("c", "ACGTACGT"), ("d", "A")]);
        for num_chunks in 1..=6 {
            let bounds: Vec<usize> = (0..=num_chunks)
                .map(|c| first_sequence_in_chunk(&multi, num_chunks, c))
                .collect();
            assert_eq!(bounds[0], 0);
            assert_eq!(bounds[num_chunks], 4);
            assert!(bounds.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_masking_is_chunk_invariant() {
        let alphabet = Alphabet::dna();
        let masker = TantanMasker::init(false, false, &alphabet);
        let records: Vec<(String, String)> = (0..5)
            .map(|i| (format!("s{}", i), "AAAAAAAAAAAAAAAAAAAAGATTACA".to_string()))
            .collect();
        let borrowed: Vec<(&str, &str)> = records
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();

        let mut reference = filled(&borrowed);
        alphabet.tr(reference.seq_writer(), false);
        mask_sequences(&mut reference, &masker, alphabet.numbers_to_lowercase(), 1);

        for num_chunks in 2..=4 {
            let mut multi = filled(&borrowed);
            alphabet.tr(multi.seq_writer(), false);
            mask_sequences(&mut multi, &masker, alphabet.numbers_to_lowercase(), num_chunks);
            assert_eq!(multi.seq_reader(), reference.seq_reader());
        }
    }
}
