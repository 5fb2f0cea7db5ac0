//! Fixed-width binary I/O for volume files.
//!
//! Every binary volume file (`.suf`, `.bck`, `.sds`, `.ssp`, child tables)
//! is a flat array of native-endian integers of one width. Nothing else is
//! stored: the companion query tool derives the entry count, and hence the
//! integer width, from the file length. These helpers keep that convention
//! in one place.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{ByteOrder, NativeEndian};

use crate::constants::{Position, POSITION_BYTES};
use crate::error::{Error, Result};

/// Number of entries converted per intermediate buffer.
const CHUNK: usize = 8192;

#[cfg(not(feature = "large-text"))]
fn positions_to_bytes(src: &[Position], dst: &mut [u8]) {
    NativeEndian::write_u32_into(src, dst);
}

#[cfg(feature = "large-text")]
fn positions_to_bytes(src: &[Position], dst: &mut [u8]) {
    NativeEndian::write_u64_into(src, dst);
}

#[cfg(not(feature = "large-text"))]
fn bytes_to_positions(src: &[u8], dst: &mut [Position]) {
    NativeEndian::read_u32_into(src, dst);
}

#[cfg(feature = "large-text")]
fn bytes_to_positions(src: &[u8], dst: &mut [Position]) {
    NativeEndian::read_u64_into(src, dst);
}

/// Write an array of positions to a writer.
pub fn write_positions<W: Write>(writer: &mut W, data: &[Position]) -> io::Result<()> {
    let mut buf = [0u8; CHUNK * POSITION_BYTES];
    for chunk in data.chunks(CHUNK) {
        let bytes = &mut buf[..chunk.len() * POSITION_BYTES];
        positions_to_bytes(chunk, bytes);
        writer.write_all(bytes)?;
    }
    Ok(())
}

/// Write an array of 16-bit entries to a writer.
pub fn write_shorts<W: Write>(writer: &mut W, data: &[u16]) -> io::Result<()> {
    let mut buf = [0u8; CHUNK * 2];
    for chunk in data.chunks(CHUNK) {
        let bytes = &mut buf[..chunk.len() * 2];
        NativeEndian::write_u16_into(chunk, bytes);
        writer.write_all(bytes)?;
    }
    Ok(())
}

/// Read a whole file back as an array of positions.
pub fn read_positions(path: &Path) -> Result<Vec<Position>> {
    let bytes = read_file(path)?;
    if bytes.len() % POSITION_BYTES != 0 {
        return Err(Error::BadInput(format!(
            "truncated index file: {}",
            path.display()
        )));
    }
    let mut out = vec![0 as Position; bytes.len() / POSITION_BYTES];
    bytes_to_positions(&bytes, &mut out);
    Ok(out)
}

/// Create a file and run a writer callback over it, reporting any failure
/// as `can't write file: {name}`.
pub fn write_file<F>(path: &Path, f: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let context = || format!("can't write file: {}", path.display());
    let file = File::create(path).map_err(|e| Error::io(context(), e))?;
    let mut writer = BufWriter::new(file);
    f(&mut writer).map_err(|e| Error::io(context(), e))?;
    writer.flush().map_err(|e| Error::io(context(), e))
}

/// Read a whole file, reporting any failure as `can't read file: {name}`.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let context = || format!("can't read file: {}", path.display());
    let mut file = File::open(path).map_err(|e| Error::io(context(), e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| Error::io(context(), e))?;
    Ok(bytes)
}
