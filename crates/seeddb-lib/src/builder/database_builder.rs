//! The build driver.
//!
//! `DatabaseBuilder` owns the ingest loop: it streams records into a
//! `MultiSequence`, translates and checks each appended range, counts
//! letters as records finish, and flushes a volume whenever the letter
//! budget fills. The first record of each volume is read without a budget,
//! so only the position width bounds a single record; a record that
//! suspends with nothing finished in the buffer is a fatal input error.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use crate::alphabet::Alphabet;
use crate::builder::config::{BuildConfig, TantanSetting};
use crate::builder::{manifest, volume};
use crate::constants::Position;
use crate::error::{Error, Result};
use crate::masker::TantanMasker;
use crate::multi_sequence::MultiSequence;
use crate::seed;

/// Builds every volume of one database run.
pub struct DatabaseBuilder {
    config: BuildConfig,
}

impl DatabaseBuilder {
    /// Validate the configuration and wrap it into a builder.
    pub fn new(config: BuildConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run the whole pipeline.
    ///
    /// A rayon pool sized to `num_threads` (0 = all cores) is installed for
    /// the per-volume masking pass; everything else is single-threaded.
    pub fn run(&self) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|e| Error::BadArgument(format!("can't create thread pool: {}", e)))?;
        let num_threads = pool.current_num_threads();
        pool.install(|| self.run_inner(num_threads))
    }

    fn run_inner(&self, num_threads: usize) -> Result<()> {
        let config = &self.config;
        config.log();

        let alphabet = match (&config.user_alphabet, config.is_protein) {
            (Some(letters), _) => Alphabet::from_letters(letters)?,
            (None, true) => Alphabet::protein(),
            (None, false) => Alphabet::dna(),
        };

        let seed_text = match (&config.seed_text, config.seed_patterns.is_empty()) {
            (Some(text), _) => text.clone(),
            (None, false) => seed::text_from_patterns(&config.seed_patterns),
            (None, true) => seed::default_seed_text(&alphabet),
        };
        let mut seeds = seed::seeds_from_text(&alphabet, &seed_text, config.case_sensitive)?;
        if seeds.len() > 26 {
            return Err(Error::BadSeed("more than 26 seed patterns".into()));
        }

        let masker = (config.tantan != TantanSetting::Off).then(|| {
            TantanMasker::init(
                alphabet.is_protein(),
                config.tantan == TantanSetting::Stricter,
                &alphabet,
            )
        });

        let mut multi = MultiSequence::new();
        alphabet.tr(multi.seq_writer(), config.keep_lowercase);

        let max_letters = config.max_letters_per_volume(seeds.len());
        let mut volume_number: u32 = 0;
        let mut sequence_count: u64 = 0;
        let mut letter_counts = vec![0u64; alphabet.size()];
        let mut letter_totals = vec![0u64; alphabet.size()];
        let mut warned_dubious = false;

        let default_input = vec!["-".to_string()];
        let inputs = if config.inputs.is_empty() {
            &default_input
        } else {
            &config.inputs
        };

        for input_name in inputs {
            info!("reading {}...", input_name);
            let mut reader = open_input(input_name)?;

            while self.append_and_encode(&mut multi, &alphabet, &mut reader, max_letters)? {
                if sequence_count == 0
                    && !warned_dubious
                    && !config.is_protein
                    && config.user_alphabet.is_none()
                    && is_dubious_dna(&alphabet, &multi)
                {
                    warn!("that's some funny-lookin DNA");
                    warned_dubious = true;
                }

                if multi.is_finished() {
                    sequence_count += 1;
                    let last = multi.finished_sequences() - 1;
                    let (beg, end) = (multi.seq_beg(last), multi.seq_end(last));
                    alphabet.count(&multi.seq_reader()[beg..end], &mut letter_counts);
                    if config.counts_only {
                        multi.reinit_for_appending();
                    }
                } else {
                    // budget full: flush the finished records as one volume
                    let base = format!("{}{}", config.base_name, volume_number);
                    volume_number += 1;
                    volume::make_volume(
                        &mut seeds,
                        &mut multi,
                        config,
                        &alphabet,
                        &letter_counts,
                        masker.as_ref(),
                        num_threads,
                        &seed_text,
                        &base,
                    )?;
                    for (total, count) in letter_totals.iter_mut().zip(&letter_counts) {
                        *total += count;
                    }
                    letter_counts.iter_mut().for_each(|c| *c = 0);
                    multi.reinit_for_appending();
                }
            }
        }

        if multi.finished_sequences() > 0 {
            if volume_number == 0 {
                // a lonely volume takes the plain base name and its
                // manifest doubles as the top-level one
                return volume::make_volume(
                    &mut seeds,
                    &mut multi,
                    config,
                    &alphabet,
                    &letter_counts,
                    masker.as_ref(),
                    num_threads,
                    &seed_text,
                    &config.base_name,
                );
            }
            let base = format!("{}{}", config.base_name, volume_number);
            volume_number += 1;
            volume::make_volume(
                &mut seeds,
                &mut multi,
                config,
                &alphabet,
                &letter_counts,
                masker.as_ref(),
                num_threads,
                &seed_text,
                &base,
            )?;
        }

        for (total, count) in letter_totals.iter_mut().zip(&letter_counts) {
            *total += count;
        }
        let prj = manifest::build_manifest(
            config,
            &alphabet,
            sequence_count,
            &letter_totals,
            Some(volume_number),
            seeds.len(),
            &seed_text,
        );
        prj.to_file(Path::new(&format!("{}.prj", config.base_name)))
    }

    /// Append one record (or as much as the budget allows), translate the
    /// new bytes to codes, and check any new quality bytes.
    fn append_and_encode(
        &self,
        multi: &mut MultiSequence,
        alphabet: &Alphabet,
        reader: &mut Box<dyn BufRead>,
        max_letters: usize,
    ) -> Result<bool> {
        let config = &self.config;
        let max_len = if multi.finished_sequences() == 0 {
            Position::MAX as usize
        } else {
            max_letters
        };

        let old_size = multi.unfinished_size();
        let old_qual = multi.qualities().len();
        let appended = if config.input_format.is_fastq() {
            multi.append_from_fastq(reader, max_len)?
        } else {
            multi.append_from_fasta(reader, max_len)?
        };
        if !appended {
            return Ok(false);
        }
        if !multi.is_finished() && multi.finished_sequences() == 0 {
            return Err(Error::BadInput(
                "encountered a sequence that's too long".into(),
            ));
        }

        let new_size = multi.unfinished_size();
        alphabet.tr(
            &mut multi.seq_writer()[old_size..new_size],
            config.keep_lowercase,
        );

        if let Some((lo, hi)) = config.input_format.quality_range() {
            for i in old_qual..multi.qualities().len() {
                if multi.seq_reader()[i] == alphabet.delimiter() {
                    continue;
                }
                let q = multi.qualities()[i];
                if q < lo || q > hi {
                    return Err(Error::BadInput(format!(
                        "bad quality character: 0x{:x}",
                        q
                    )));
                }
            }
        }
        Ok(true)
    }
}

fn open_input(name: &str) -> Result<Box<dyn BufRead>> {
    if name == "-" {
        Ok(Box::new(std::io::stdin().lock()))
    } else {
        let file = File::open(name)
            .map_err(|e| Error::io(format!("can't open file: {}", name), e))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Does the first record look like it isn't really DNA?
///
/// Looks at the first 100 coded letters: under 90 canonical-or-`N` letters
/// is suspicious. Inconclusive while fewer than 100 letters have arrived,
/// and never suspicious for records shorter than that.
fn is_dubious_dna(alphabet: &Alphabet, multi: &MultiSequence) -> bool {
    let seq = multi.seq_reader();
    let to_upper = alphabet.numbers_to_uppercase();
    let n_code = alphabet.encode(b'N');
    let mut dna_count = 0;

    for i in 1..=100 {
        if i >= seq.len() {
            return false;
        }
        let c = to_upper[seq[i] as usize];
        if c == alphabet.delimiter() {
            return false;
        }
        if (c as usize) < alphabet.size() || c == n_code {
            dna_count += 1;
        }
    }
    dna_count < 90
}
