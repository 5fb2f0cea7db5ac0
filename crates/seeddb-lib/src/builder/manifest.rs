//! The `.prj` manifest.
//!
//! A manifest is line oriented: `key=value` pairs in a fixed order, then any
//! `#lastal …` lines forwarded verbatim from the seed text. Parsing keeps
//! the line order so a re-emitted manifest is byte-identical, which is what
//! the query tool's loader relies on.

use std::io::{self, Write};
use std::path::Path;

use crate::alphabet::Alphabet;
use crate::builder::config::BuildConfig;
use crate::error::{Error, Result};
use crate::serialization;

/// One manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Pair(String, String),
    Comment(String),
}

/// An ordered `.prj` manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    lines: Vec<Line>,
}

impl Manifest {
    /// An empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `key=value` line.
    pub fn push(&mut self, key: &str, value: impl ToString) {
        self.lines.push(Line::Pair(key.into(), value.to_string()));
    }

    /// Append a comment line verbatim.
    pub fn push_comment(&mut self, line: &str) {
        self.lines.push(Line::Comment(line.to_string()));
    }

    /// First value recorded for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Pair(k, v) if k == key => Some(v.as_str()),
            _ => None,
        })
    }

    /// Emit the manifest.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for line in &self.lines {
            match line {
                Line::Pair(k, v) => writeln!(writer, "{}={}", k, v)?,
                Line::Comment(text) => writeln!(writer, "{}", text)?,
            }
        }
        Ok(())
    }

    /// Write the manifest to `path`.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        serialization::write_file(path, |w| self.write_to(w))
    }

    /// Parse a manifest back, preserving line order.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = serialization::read_file(path)?;
        let text = String::from_utf8(bytes)
            .map_err(|_| Error::BadInput(format!("non-text manifest: {}", path.display())))?;
        let mut manifest = Self::new();
        for line in text.lines() {
            if line.starts_with('#') {
                manifest.push_comment(line);
            } else if let Some((key, value)) = line.split_once('=') {
                manifest.push(key, value);
            } else if !line.is_empty() {
                return Err(Error::BadInput(format!(
                    "bad manifest line in {}: {}",
                    path.display(),
                    line
                )));
            }
        }
        Ok(manifest)
    }
}

/// Assemble one `.prj` manifest.
///
/// `volumes` is `Some` for the top-level manifest of a multi-volume build
/// and `None` for a per-volume manifest, which records `numofindexes`
/// instead. Counts-only runs stop after the letter statistics.
pub fn build_manifest(
    config: &BuildConfig,
    alphabet: &Alphabet,
    sequence_count: u64,
    letter_counts: &[u64],
    volumes: Option<u32>,
    num_indexes: usize,
    seed_text: &str,
) -> Manifest {
    let mut manifest = Manifest::new();
    manifest.push("version", env!("CARGO_PKG_VERSION"));
    manifest.push("alphabet", alphabet.letters());
    manifest.push("numofsequences", sequence_count);
    manifest.push("numofletters", letter_counts.iter().sum::<u64>());
    let freqs: Vec<String> = letter_counts.iter().map(u64::to_string).collect();
    manifest.push("letterfreqs", freqs.join(" "));

    if !config.counts_only {
        manifest.push("maxunsortedinterval", config.min_seed_limit);
        manifest.push("keeplowercase", config.keep_lowercase as u8);
        if config.tantan.setting() != 0 {
            manifest.push("tantansetting", config.tantan.setting());
        }
        manifest.push("masklowercase", config.case_sensitive as u8);
        if config.input_format.is_fastq() {
            manifest.push("sequenceformat", config.input_format.name());
        }
        if config.minimizer_window > 1 {
            manifest.push("minimizerwindow", config.minimizer_window);
        }
        match volumes {
            Some(n) => manifest.push("volumes", n),
            None => manifest.push("numofindexes", num_indexes),
        }
        for line in crate::seed::lastal_lines(seed_text) {
            manifest.push_comment(&line);
        }
    }
    manifest
}
