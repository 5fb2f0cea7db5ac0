//! Append-only concatenated sequence text.
//!
//! A `MultiSequence` accumulates coded records separated by delimiter bytes:
//!
//! ```text
//! [pad][record 0][delim][record 1][delim][partial record 2 ...
//! ```
//!
//! Records arrive from FASTA or FASTQ streams one call at a time. A call may
//! *suspend* mid-record when the buffer reaches the volume letter budget; the
//! partial record stays in the buffer, the driver flushes the finished
//! records as a volume, and the next call resumes the same record into the
//! reinitialised buffer. Sequence bytes are stored raw and translated to
//! codes in place by the driver, so the pad and delimiter slots are written
//! as `b' '` (which every alphabet encodes to its delimiter).

use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::constants::{Position, PAD_QUALITY};
use crate::error::{Error, Result};
use crate::serialization;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Between,
    FastaSeq,
    FastqSeq { at_line_start: bool },
    FastqPlus,
    FastqQual { remaining: usize },
}

enum Scan {
    Continue,
    Suspended,
}

/// Concatenated coded text with per-record names and optional qualities.
pub struct MultiSequence {
    seq: Vec<u8>,
    ends: Vec<Position>,
    names: Vec<String>,
    quals: Vec<u8>,
    has_quals: bool,
    state: ParseState,
}

impl Default for MultiSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiSequence {
    /// An empty buffer holding only the leading pad byte.
    pub fn new() -> Self {
        Self {
            seq: vec![b' '],
            ends: Vec::new(),
            names: Vec::new(),
            quals: Vec::new(),
            has_quals: false,
            state: ParseState::Between,
        }
    }

    /// True when no record is in a partially-read state.
    pub fn is_finished(&self) -> bool {
        self.state == ParseState::Between
    }

    /// Number of complete records in the buffer.
    pub fn finished_sequences(&self) -> usize {
        self.ends.len()
    }

    /// Offset one past the last finished record's delimiter.
    pub fn finished_size(&self) -> usize {
        match self.ends.last() {
            Some(&end) => end as usize + 1,
            None => 1,
        }
    }

    /// Total buffer size, including any partially-read record.
    pub fn unfinished_size(&self) -> usize {
        self.seq.len()
    }

    /// First interior offset of record `i`.
    pub fn seq_beg(&self, i: usize) -> usize {
        if i == 0 {
            1
        } else {
            self.ends[i - 1] as usize + 1
        }
    }

    /// One past the last interior offset of record `i`; the delimiter sits
    /// here.
    pub fn seq_end(&self, i: usize) -> usize {
        self.ends[i] as usize
    }

    /// Name of record `i`.
    pub fn name(&self, i: usize) -> &str {
        &self.names[i]
    }

    /// The whole buffer, for reading.
    pub fn seq_reader(&self) -> &[u8] {
        &self.seq
    }

    /// The whole buffer, for in-place translation and masking.
    pub fn seq_writer(&mut self) -> &mut [u8] {
        &mut self.seq
    }

    /// Quality bytes, aligned one per buffer byte (FASTQ only, else empty).
    pub fn qualities(&self) -> &[u8] {
        &self.quals
    }

    /// Read one FASTA record, or as much of it as the budget allows.
    ///
    /// Returns `Ok(false)` only at clean end of input. A record cut short by
    /// end of input is finished as-is. `max_len` bounds `unfinished_size`:
    /// when the buffer would grow past it, the call returns with
    /// `is_finished() == false` and the next call resumes the record.
    pub fn append_from_fasta<R: BufRead>(&mut self, reader: &mut R, max_len: usize) -> Result<bool> {
        if self.state == ParseState::Between {
            match skip_whitespace(reader)? {
                None => return Ok(false),
                Some(b'>') => {
                    consume_one(reader)?;
                    let name = read_name(reader)?;
                    self.names.push(name);
                    self.state = ParseState::FastaSeq;
                }
                Some(other) => {
                    return Err(Error::BadInput(format!(
                        "bad FASTA data: expected '>', got '{}'",
                        other as char
                    )))
                }
            }
        } else if self.state != ParseState::FastaSeq {
            return Err(Error::BadInput("mixed sequence formats".into()));
        }

        loop {
            let buf = reader.fill_buf().map_err(Error::from)?;
            if buf.is_empty() {
                self.finish_record();
                return Ok(true);
            }
            self.seq.try_reserve(buf.len())?;

            let mut stop = None;
            let mut i = 0;
            while i < buf.len() {
                let b = buf[i];
                if b == b'>' {
                    stop = Some(Scan::Continue);
                    break;
                }
                if !b.is_ascii_whitespace() {
                    if self.seq.len() >= max_len {
                        stop = Some(Scan::Suspended);
                        break;
                    }
                    self.seq.push(b);
                }
                i += 1;
            }
            reader.consume(i);
            match stop {
                Some(Scan::Continue) => {
                    self.finish_record();
                    return Ok(true);
                }
                Some(Scan::Suspended) => return Ok(true),
                None => {}
            }
        }
    }

    /// Read one FASTQ record, with the same budget contract as FASTA.
    ///
    /// One quality byte is accumulated per sequence byte and pad slots get a
    /// filler quality, so the quality buffer stays aligned with the text.
    pub fn append_from_fastq<R: BufRead>(&mut self, reader: &mut R, max_len: usize) -> Result<bool> {
        if self.state == ParseState::Between {
            match skip_whitespace(reader)? {
                None => return Ok(false),
                Some(b'@') => {
                    consume_one(reader)?;
                    let name = read_name(reader)?;
                    self.names.push(name);
                    if !self.has_quals {
                        self.has_quals = true;
                        self.quals = vec![PAD_QUALITY; self.seq.len()];
                    }
                    self.state = ParseState::FastqSeq { at_line_start: true };
                }
                Some(other) => {
                    return Err(Error::BadInput(format!(
                        "bad FASTQ data: expected '@', got '{}'",
                        other as char
                    )))
                }
            }
        }

        loop {
            match self.state {
                ParseState::FastqSeq { at_line_start } => {
                    if let Scan::Suspended = self.read_fastq_seq(reader, max_len, at_line_start)? {
                        return Ok(true);
                    }
                }
                ParseState::FastqPlus => self.skip_plus_line(reader)?,
                ParseState::FastqQual { remaining } => {
                    self.read_fastq_qual(reader, remaining)?;
                    return Ok(true);
                }
                ParseState::Between => return Ok(true),
                ParseState::FastaSeq => {
                    return Err(Error::BadInput("mixed sequence formats".into()))
                }
            }
        }
    }

    fn read_fastq_seq<R: BufRead>(
        &mut self,
        reader: &mut R,
        max_len: usize,
        mut at_line_start: bool,
    ) -> Result<Scan> {
        loop {
            let buf = reader.fill_buf().map_err(Error::from)?;
            if buf.is_empty() {
                return Err(Error::BadInput("truncated FASTQ record".into()));
            }
            self.seq.try_reserve(buf.len())?;

            let mut i = 0;
            while i < buf.len() {
                let b = buf[i];
                if b == b'\n' {
                    at_line_start = true;
                } else if at_line_start && b == b'+' {
                    reader.consume(i + 1);
                    self.state = ParseState::FastqPlus;
                    return Ok(Scan::Continue);
                } else if !b.is_ascii_whitespace() {
                    at_line_start = false;
                    if self.seq.len() >= max_len {
                        reader.consume(i);
                        self.state = ParseState::FastqSeq { at_line_start };
                        return Ok(Scan::Suspended);
                    }
                    self.seq.push(b);
                }
                i += 1;
            }
            reader.consume(i);
            self.state = ParseState::FastqSeq { at_line_start };
        }
    }

    fn skip_plus_line<R: BufRead>(&mut self, reader: &mut R) -> Result<()> {
        loop {
            let buf = reader.fill_buf().map_err(Error::from)?;
            if buf.is_empty() {
                return Err(Error::BadInput("truncated FASTQ record".into()));
            }
            match buf.iter().position(|&b| b == b'\n') {
                Some(i) => {
                    reader.consume(i + 1);
                    let remaining = self.seq.len() - self.finished_size();
                    self.state = ParseState::FastqQual { remaining };
                    return Ok(());
                }
                None => {
                    let n = buf.len();
                    reader.consume(n);
                }
            }
        }
    }

    fn read_fastq_qual<R: BufRead>(&mut self, reader: &mut R, mut remaining: usize) -> Result<()> {
        while remaining > 0 {
            let buf = reader.fill_buf().map_err(Error::from)?;
            if buf.is_empty() {
                return Err(Error::BadInput("truncated FASTQ record".into()));
            }
            self.quals.try_reserve(buf.len().min(remaining))?;

            let mut i = 0;
            while i < buf.len() && remaining > 0 {
                let b = buf[i];
                if !b.is_ascii_whitespace() {
                    self.quals.push(b);
                    remaining -= 1;
                }
                i += 1;
            }
            reader.consume(i);
            self.state = ParseState::FastqQual { remaining };
        }
        self.finish_record();
        Ok(())
    }

    fn finish_record(&mut self) {
        self.seq.push(b' ');
        if self.has_quals {
            self.quals.push(PAD_QUALITY);
        }
        self.ends.push((self.seq.len() - 1) as Position);
        self.state = ParseState::Between;
    }

    /// Drop the finished records, carrying any partially-read record (and its
    /// name and qualities) behind a fresh pad.
    pub fn reinit_for_appending(&mut self) {
        let keep_from = self.finished_size() - 1;
        self.seq.drain(..keep_from);
        if self.has_quals {
            self.quals.drain(..keep_from);
        }
        self.names.drain(..self.ends.len());
        self.ends.clear();
    }

    /// Write the finished records as the sequence files of one volume:
    /// `.tis` (coded text), `.sds` (record starts), `.des` (names), `.ssp`
    /// (name offsets), and `.qua` for FASTQ builds.
    pub fn to_files(&self, base: &str) -> Result<()> {
        let n = self.ends.len();
        let finished = self.finished_size();

        serialization::write_file(&volume_path(base, "tis"), |w| {
            w.write_all(&self.seq[..finished])
        })?;

        let mut starts: Vec<Position> = (0..n).map(|i| self.seq_beg(i) as Position).collect();
        starts.push(finished as Position);
        serialization::write_file(&volume_path(base, "sds"), |w| {
            serialization::write_positions(w, &starts)
        })?;

        serialization::write_file(&volume_path(base, "des"), |w| {
            for name in &self.names[..n] {
                writeln!(w, "{}", name)?;
            }
            Ok(())
        })?;

        let mut name_offsets: Vec<Position> = Vec::with_capacity(n + 1);
        let mut offset = 0 as Position;
        name_offsets.push(offset);
        for name in &self.names[..n] {
            offset += name.len() as Position + 1;
            name_offsets.push(offset);
        }
        serialization::write_file(&volume_path(base, "ssp"), |w| {
            serialization::write_positions(w, &name_offsets)
        })?;

        if self.has_quals {
            serialization::write_file(&volume_path(base, "qua"), |w| {
                w.write_all(&self.quals[..finished])
            })?;
        }
        Ok(())
    }

    /// Read a volume's sequence files back. Inverse of [`to_files`].
    ///
    /// [`to_files`]: MultiSequence::to_files
    pub fn from_files(base: &str) -> Result<Self> {
        let seq = serialization::read_file(&volume_path(base, "tis"))?;
        let starts = serialization::read_positions(&volume_path(base, "sds"))?;
        if starts.is_empty() || starts[starts.len() - 1] as usize != seq.len() {
            return Err(Error::BadInput(format!(
                "inconsistent volume files: {}",
                base
            )));
        }
        let n = starts.len() - 1;
        let ends: Vec<Position> = (1..=n).map(|i| starts[i] - 1).collect();

        let des = serialization::read_file(&volume_path(base, "des"))?;
        let names: Vec<String> = String::from_utf8_lossy(&des)
            .lines()
            .map(str::to_string)
            .collect();
        let name_offsets = serialization::read_positions(&volume_path(base, "ssp"))?;
        if names.len() != n || name_offsets.len() != n + 1 {
            return Err(Error::BadInput(format!(
                "inconsistent volume files: {}",
                base
            )));
        }

        let qua_path = volume_path(base, "qua");
        let (quals, has_quals) = if qua_path.exists() {
            (serialization::read_file(&qua_path)?, true)
        } else {
            (Vec::new(), false)
        };

        Ok(Self {
            seq,
            ends,
            names,
            quals,
            has_quals,
            state: ParseState::Between,
        })
    }
}

fn volume_path(base: &str, ext: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", base, ext))
}

/// Leave the reader at the next non-whitespace byte and return it, or `None`
/// at end of input.
fn skip_whitespace<R: BufRead>(reader: &mut R) -> Result<Option<u8>> {
    loop {
        let (skip, next) = {
            let buf = reader.fill_buf().map_err(Error::from)?;
            if buf.is_empty() {
                return Ok(None);
            }
            match buf.iter().position(|&b| !b.is_ascii_whitespace()) {
                Some(i) => (i, Some(buf[i])),
                None => (buf.len(), None),
            }
        };
        reader.consume(skip);
        if next.is_some() {
            return Ok(next);
        }
    }
}

fn consume_one<R: BufRead>(reader: &mut R) -> Result<()> {
    reader.fill_buf().map_err(Error::from)?;
    reader.consume(1);
    Ok(())
}

/// Read the rest of a header line; the name is its first whitespace-delimited
/// token.
fn read_name<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line).map_err(Error::from)?;
    let text = String::from_utf8_lossy(&line);
    Ok(text.split_whitespace().next().unwrap_or("").to_string())
}
