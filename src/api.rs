use crate::config::{DeflateConfig, InflateConfig, Level, Wrapper};
use crate::error::{Error, Result, Status};
use crate::stream::{DeflateStream, Flush, InflateStream};

/// Largest output/input ratio DEFLATE can reach (258-byte matches coded in
/// two bits, plus slack).
pub const MAX_INFLATE_RATIO: usize = 1032;

const MIN_OUTPUT_CHUNK: usize = 64;

/// Grows `buf` to `len` bytes, reporting allocation failure as `Error::Mem`.
fn grow(buf: &mut Vec<u8>, len: usize) -> Result<()> {
    buf.try_reserve_exact(len.saturating_sub(buf.len()))
        .map_err(|_| Error::Mem { requested_bytes: len })?;
    buf.resize(len, 0);
    Ok(())
}

/// Compresses `data` into a zlib stream at `level`.
pub fn compress(data: &[u8], level: Level) -> Result<Vec<u8>> {
    compress_with(data, &DeflateConfig::new(level))
}

pub fn compress_with(data: &[u8], config: &DeflateConfig) -> Result<Vec<u8>> {
    let mut stream = DeflateStream::new(config)?;
    deflate_all(&mut stream, data)
}

/// Compresses `data` without the zlib header and trailer.
pub fn deflate_raw(data: &[u8], level: Level) -> Result<Vec<u8>> {
    compress_with(data, &DeflateConfig::new(level).with_wrapper(Wrapper::Raw))
}

/// Decompresses a complete zlib stream.
///
/// `size_hint` is the expected decompressed size; the output buffer starts
/// there and doubles as needed, up to `MAX_INFLATE_RATIO` times the input
/// size.
pub fn uncompress(data: &[u8], size_hint: usize) -> Result<Vec<u8>> {
    let mut stream = InflateStream::new(&InflateConfig::default())?;
    inflate_all(&mut stream, data, size_hint)
}

/// Decompresses a headerless DEFLATE stream.
pub fn inflate_raw(data: &[u8], size_hint: usize) -> Result<Vec<u8>> {
    let mut stream = InflateStream::new(&InflateConfig::default().with_wrapper(Wrapper::Raw))?;
    inflate_all(&mut stream, data, size_hint)
}

/// Runs `data` through a fresh or reset stream with a single `Finish`.
pub(crate) fn deflate_all(stream: &mut DeflateStream, data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    grow(&mut output, stream.bound(data.len())?)?;
    let mut consumed = 0;
    let mut produced = 0;
    loop {
        let step = stream.deflate(&data[consumed..], &mut output[produced..], Flush::Finish)?;
        consumed += step.consumed;
        produced += step.produced;
        if step.status == Status::StreamEnd {
            output.truncate(produced);
            return Ok(output);
        }
        let len = output.len() + output.len() / 2 + MIN_OUTPUT_CHUNK;
        grow(&mut output, len)?;
    }
}

pub(crate) fn inflate_all(
    stream: &mut InflateStream,
    data: &[u8],
    size_hint: usize,
) -> Result<Vec<u8>> {
    let limit = data
        .len()
        .saturating_mul(MAX_INFLATE_RATIO)
        .max(size_hint)
        .max(MIN_OUTPUT_CHUNK);
    let mut output = Vec::new();
    grow(&mut output, size_hint.clamp(MIN_OUTPUT_CHUNK, limit))?;

    let mut consumed = 0;
    let mut produced = 0;
    loop {
        if produced == output.len() {
            let len = output.len().saturating_mul(2);
            if output.len() >= limit {
                return Err(Error::Mem {
                    requested_bytes: len,
                });
            }
            grow(&mut output, len.min(limit))?;
        }

        let step = stream.inflate(&data[consumed..], &mut output[produced..], Flush::Finish)?;
        consumed += step.consumed;
        produced += step.produced;
        match step.status {
            Status::StreamEnd => {
                output.truncate(produced);
                return Ok(output);
            }
            Status::NeedDictionary => return Err(Error::Data("need dictionary")),
            Status::Ok | Status::BufError => {
                if consumed == data.len() && produced < output.len() {
                    return Err(Error::Data("unexpected end of compressed data"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_with_small_hint() {
        let data: Vec<u8> = b"one-shot helpers ".iter().cycle().take(10_000).copied().collect();
        let z = compress(&data, Level::DEFAULT).unwrap();
        assert!(z.len() < 200);
        assert_eq!(uncompress(&z, 1).unwrap(), data);
        assert_eq!(uncompress(&z, data.len()).unwrap(), data);
    }

    #[test]
    fn raw_round_trip() {
        let data = b"raw deflate, no header, no trailer";
        let z = deflate_raw(data, Level::BEST).unwrap();
        assert_eq!(inflate_raw(&z, 0).unwrap(), data);
        assert!(uncompress(&z, 0).is_err());
    }

    #[test]
    fn truncated_stream() {
        let z = compress(b"truncate me please", Level::DEFAULT).unwrap();
        assert_eq!(
            uncompress(&z[..z.len() - 3], 0).unwrap_err(),
            Error::Data("unexpected end of compressed data")
        );
    }

    #[test]
    fn dictionary_stream_needs_stream_api() {
        let mut s = DeflateStream::new(&DeflateConfig::default()).unwrap();
        s.set_dictionary(b"preset").unwrap();
        let z = deflate_all(&mut s, b"preset preset").unwrap();
        assert_eq!(uncompress(&z, 0).unwrap_err(), Error::Data("need dictionary"));
    }
}
