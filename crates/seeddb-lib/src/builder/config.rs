//! Build configuration.
//!
//! Mirrors the command line (and the options a seed file can embed) as one
//! plain struct with validation and a tracing dump.

use crate::constants::Position;
use crate::error::{Error, Result};
use crate::suffix_array::ChildTableType;

/// Input sequence format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceFormat {
    /// FASTA (the default).
    #[default]
    Fasta,
    /// FASTQ with Sanger (offset 33) qualities.
    FastqSanger,
    /// FASTQ with Solexa (offset 64, scores from -5) qualities.
    FastqSolexa,
    /// FASTQ with Illumina 1.3+ (offset 64) qualities.
    FastqIllumina,
}

impl SequenceFormat {
    /// Whether records carry per-letter quality bytes.
    pub fn is_fastq(self) -> bool {
        self != SequenceFormat::Fasta
    }

    /// Inclusive range of valid quality bytes, when the format has any.
    pub fn quality_range(self) -> Option<(u8, u8)> {
        match self {
            SequenceFormat::Fasta => None,
            SequenceFormat::FastqSanger => Some((33, 126)),
            SequenceFormat::FastqSolexa => Some((59, 126)),
            SequenceFormat::FastqIllumina => Some((64, 126)),
        }
    }

    /// Manifest spelling.
    pub fn name(self) -> &'static str {
        match self {
            SequenceFormat::Fasta => "fasta",
            SequenceFormat::FastqSanger => "fastq-sanger",
            SequenceFormat::FastqSolexa => "fastq-solexa",
            SequenceFormat::FastqIllumina => "fastq-illumina",
        }
    }
}

/// Low-complexity masking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TantanSetting {
    /// No masking.
    #[default]
    Off,
    /// Standard masking.
    Standard,
    /// Stricter masking, entering repeats more eagerly.
    Stricter,
}

impl TantanSetting {
    /// Manifest value; 0 means off.
    pub fn setting(self) -> u8 {
        match self {
            TantanSetting::Off => 0,
            TantanSetting::Standard => 1,
            TantanSetting::Stricter => 2,
        }
    }
}

/// All build parameters for one run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Output database name; volumes append a number when there is more
    /// than one.
    pub base_name: String,
    /// Input files; empty or `-` means stdin.
    pub inputs: Vec<String>,
    /// Input format.
    pub input_format: SequenceFormat,
    /// Use the protein alphabet.
    pub is_protein: bool,
    /// Explicit canonical letters, overriding DNA/protein.
    pub user_alphabet: Option<String>,
    /// Seed text loaded from a named built-in or seed file.
    pub seed_text: Option<String>,
    /// Ad-hoc seed patterns.
    pub seed_patterns: Vec<String>,
    /// Keep lowercase input letters in the lowercase code tier.
    pub keep_lowercase: bool,
    /// Exclude lowercase letters from seeds.
    pub case_sensitive: bool,
    /// Masking mode.
    pub tantan: TantanSetting,
    /// Index every `index_step`-th position.
    pub index_step: usize,
    /// Minimizer window; 1 disables subsampling.
    pub minimizer_window: usize,
    /// Runs at most this long skip further radix passes.
    pub min_seed_limit: usize,
    /// Bucket table depth; `None` picks one per volume.
    pub bucket_depth: Option<usize>,
    /// Child table flavour.
    pub child_table: ChildTableType,
    /// Volume byte budget.
    pub volume_size: u64,
    /// Worker threads for masking; 0 means all cores.
    pub num_threads: usize,
    /// Write only the letter-count manifest.
    pub counts_only: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            base_name: String::new(),
            inputs: Vec::new(),
            input_format: SequenceFormat::Fasta,
            is_protein: false,
            user_alphabet: None,
            seed_text: None,
            seed_patterns: Vec::new(),
            keep_lowercase: false,
            case_sensitive: false,
            tantan: TantanSetting::Off,
            index_step: 1,
            minimizer_window: 1,
            min_seed_limit: 0,
            bucket_depth: None,
            child_table: ChildTableType::None,
            volume_size: u64::MAX,
            num_threads: 0,
            counts_only: false,
        }
    }
}

impl BuildConfig {
    /// Reject impossible parameter combinations.
    pub fn validate(&self) -> Result<()> {
        if self.base_name.is_empty() {
            return Err(Error::BadArgument("missing output name".into()));
        }
        if self.index_step == 0 {
            return Err(Error::BadArgument("index step must be at least 1".into()));
        }
        if self.minimizer_window == 0 {
            return Err(Error::BadArgument(
                "minimizer window must be at least 1".into(),
            ));
        }
        if self.volume_size == 0 {
            return Err(Error::BadArgument("volume size must be positive".into()));
        }
        if self.is_protein && self.user_alphabet.is_some() {
            return Err(Error::BadArgument(
                "both protein and explicit alphabet given".into(),
            ));
        }
        if self.seed_text.is_some() && !self.seed_patterns.is_empty() {
            return Err(Error::BadArgument(
                "both seed file and seed patterns given".into(),
            ));
        }
        Ok(())
    }

    /// Log the effective parameters.
    pub fn log(&self) {
        tracing::info!("building {}", self.base_name);
        tracing::debug!("  input_format = {}", self.input_format.name());
        tracing::debug!("  index_step = {}", self.index_step);
        tracing::debug!("  minimizer_window = {}", self.minimizer_window);
        tracing::debug!("  min_seed_limit = {}", self.min_seed_limit);
        tracing::debug!("  bucket_depth = {:?}", self.bucket_depth);
        tracing::debug!("  volume_size = {}", self.volume_size);
        tracing::debug!("  tantan = {}", self.tantan.setting());
        if self.num_threads == 0 {
            tracing::debug!("  num_threads = all available cores");
        } else {
            tracing::debug!("  num_threads = {}", self.num_threads);
        }
    }

    /// Letter budget per volume, derived from the byte budget.
    ///
    /// Each stored letter costs one byte (two with qualities) per
    /// `index_step`, plus `POSITION_BYTES + 1` index bytes per seed for
    /// each indexed position. The result is clamped to what a `Position`
    /// can address, so the on-disk integer width always suffices.
    pub fn max_letters_per_volume(&self, num_seeds: usize) -> usize {
        let bytes_per_letter: u64 = if self.input_format.is_fastq() { 2 } else { 1 };
        let index_bytes = (crate::constants::POSITION_BYTES as u64 + 1) * num_seeds as u64;
        let step = self.index_step as u64;
        let per_position = bytes_per_letter * step + index_bytes;
        let letters = self.volume_size / per_position * step;
        letters.min(Position::MAX as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named() -> BuildConfig {
        BuildConfig {
            base_name: "db".into(),
            ..BuildConfig::default()
        }
    }

    #[test]
    fn test_default_config_is_valid_once_named() {
        assert!(BuildConfig::default().validate().is_err());
        assert!(named().validate().is_ok());
    }

    #[test]
    fn test_zero_step_rejected() {
        let config = BuildConfig {
            index_step: 0,
            ..named()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_conflicting_alphabets_rejected() {
        let config = BuildConfig {
            is_protein: true,
            user_alphabet: Some("ACGU".into()),
            ..named()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_letter_budget() {
        let config = BuildConfig {
            volume_size: 7000,
            ..named()
        };
        // one byte per letter plus (width + 1) index bytes per position
        let per_position = 1 + crate::constants::POSITION_BYTES as u64 + 1;
        assert_eq!(
            config.max_letters_per_volume(1),
            (7000 / per_position) as usize
        );
    }

    #[test]
    fn test_letter_budget_clamps_to_position_width() {
        let config = BuildConfig {
            volume_size: u64::MAX,
            ..named()
        };
        assert_eq!(config.max_letters_per_volume(1), Position::MAX as usize);
    }

    #[test]
    fn test_fastq_budget_counts_quality_bytes() {
        let fasta = BuildConfig {
            volume_size: 1 << 20,
            ..named()
        };
        let fastq = BuildConfig {
            input_format: SequenceFormat::FastqSanger,
            ..fasta.clone()
        };
        assert!(fastq.max_letters_per_volume(1) < fasta.max_letters_per_volume(1));
    }
}
