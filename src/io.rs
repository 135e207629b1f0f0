//! `std::io` adapters over the streaming API.

use crate::config::{DeflateConfig, InflateConfig, Level};
use crate::error::Status;
use crate::stream::{DeflateStream, Flush, InflateStream};
use std::io::{self, Read, Write};

const BUF_SIZE: usize = 32 * 1024;

/// Compresses everything written to it into a zlib stream on `W`.
///
/// Call [`ZlibEncoder::finish`] to write the trailer and get the writer back;
/// dropping the encoder finishes the stream on a best-effort basis.
pub struct ZlibEncoder<W: Write> {
    inner: Option<W>,
    stream: DeflateStream,
    buf: Vec<u8>,
}

impl<W: Write> ZlibEncoder<W> {
    pub fn new(writer: W, level: Level) -> io::Result<Self> {
        Self::with_config(writer, &DeflateConfig::new(level))
    }

    pub fn with_config(writer: W, config: &DeflateConfig) -> io::Result<Self> {
        Ok(Self {
            inner: Some(writer),
            stream: DeflateStream::new(config)?,
            buf: vec![0u8; BUF_SIZE],
        })
    }

    /// Presets the dictionary; only before the first write.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> io::Result<()> {
        Ok(self.stream.set_dictionary(dictionary)?)
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    pub fn total_in(&self) -> u64 {
        self.stream.total_in()
    }

    pub fn total_out(&self) -> u64 {
        self.stream.total_out()
    }

    fn dump(&mut self, n: usize) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(w) => w.write_all(&self.buf[..n]),
            None => Err(io::Error::new(io::ErrorKind::Other, "encoder already finished")),
        }
    }

    /// Feeds `input` with `flush` until the engine needs more input and has
    /// no more output for us.
    fn pump(&mut self, input: &[u8], flush: Flush) -> io::Result<()> {
        let mut consumed = 0;
        loop {
            let step = self.stream.deflate(&input[consumed..], &mut self.buf, flush)?;
            consumed += step.consumed;
            self.dump(step.produced)?;
            if step.status == Status::StreamEnd
                || (consumed == input.len() && step.produced < self.buf.len())
            {
                return Ok(());
            }
        }
    }

    /// Writes the final block and trailer, then returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.pump(&[], Flush::Finish)?;
        let mut w = self
            .inner
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "encoder already finished"))?;
        w.flush()?;
        Ok(w)
    }
}

impl<W: Write> Write for ZlibEncoder<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.pump(data, Flush::NoFlush)?;
        Ok(data.len())
    }

    /// Sync-flushes so that everything written so far can be decoded.
    fn flush(&mut self) -> io::Result<()> {
        self.pump(&[], Flush::SyncFlush)?;
        match self.inner.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for ZlibEncoder<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            let _ = self.pump(&[], Flush::Finish);
        }
    }
}

/// Decompresses a zlib stream read from `R`.
///
/// Input read past the end of the stream stays buffered in the decoder.
pub struct ZlibDecoder<R: Read> {
    inner: R,
    stream: InflateStream,
    dictionary: Option<Vec<u8>>,
    buf: Vec<u8>,
    pos: usize,
    cap: usize,
    eof: bool,
    done: bool,
}

impl<R: Read> ZlibDecoder<R> {
    pub fn new(reader: R) -> io::Result<Self> {
        Self::with_config(reader, &InflateConfig::default())
    }

    pub fn with_config(reader: R, config: &InflateConfig) -> io::Result<Self> {
        Ok(Self {
            inner: reader,
            stream: InflateStream::new(config)?,
            dictionary: None,
            buf: vec![0u8; BUF_SIZE],
            pos: 0,
            cap: 0,
            eof: false,
            done: false,
        })
    }

    /// Dictionary to supply if the stream header asks for one.
    pub fn with_dictionary(mut self, dictionary: &[u8]) -> Self {
        self.dictionary = Some(dictionary.to_vec());
        self
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn total_in(&self) -> u64 {
        self.stream.total_in()
    }

    pub fn total_out(&self) -> u64 {
        self.stream.total_out()
    }
}

impl<R: Read> Read for ZlibDecoder<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() || self.done {
            return Ok(0);
        }
        loop {
            if self.pos == self.cap && !self.eof {
                self.cap = self.inner.read(&mut self.buf)?;
                self.pos = 0;
                self.eof = self.cap == 0;
            }

            let step = self
                .stream
                .inflate(&self.buf[self.pos..self.cap], out, Flush::NoFlush)?;
            self.pos += step.consumed;
            match step.status {
                Status::StreamEnd => {
                    self.done = true;
                    return Ok(step.produced);
                }
                Status::NeedDictionary => match &self.dictionary {
                    Some(d) => self.stream.set_dictionary(d)?,
                    None => {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "zlib stream needs a preset dictionary",
                        ))
                    }
                },
                Status::Ok | Status::BufError => {
                    if step.produced > 0 {
                        return Ok(step.produced);
                    }
                    if self.eof && self.pos == self.cap {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "zlib stream truncated",
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Wrapper;

    /// Reader that hands out one byte per call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    #[test]
    fn write_then_read_back() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8 ^ (i / 1000) as u8).collect();
        let mut enc = ZlibEncoder::new(Vec::new(), Level::DEFAULT).unwrap();
        for chunk in data.chunks(777) {
            enc.write_all(chunk).unwrap();
        }
        let z = enc.finish().unwrap();
        assert_eq!(crate::api::uncompress(&z, data.len()).unwrap(), data);

        let mut out = Vec::new();
        ZlibDecoder::new(Trickle(&z)).unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn flush_makes_prefix_decodable() {
        let mut enc = ZlibEncoder::new(Vec::new(), Level::DEFAULT).unwrap();
        enc.write_all(b"first part, ").unwrap();
        enc.flush().unwrap();
        let prefix = enc.get_ref().unwrap().clone();

        let mut dec = ZlibDecoder::new(&prefix[..]).unwrap();
        let mut out = vec![0u8; 64];
        let n = dec.read(&mut out).unwrap();
        assert_eq!(&out[..n], b"first part, ");
    }

    #[test]
    fn truncated_input_is_an_error() {
        let z = crate::api::compress(b"some text that gets cut", Level::DEFAULT).unwrap();
        let mut out = Vec::new();
        let err = ZlibDecoder::new(&z[..z.len() / 2])
            .unwrap()
            .read_to_end(&mut out)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn decoder_supplies_dictionary() {
        let dict = b"a shared preset dictionary";
        let mut enc = ZlibEncoder::with_config(Vec::new(), &DeflateConfig::default()).unwrap();
        enc.set_dictionary(dict).unwrap();
        enc.write_all(b"a shared preset dictionary, used twice").unwrap();
        let z = enc.finish().unwrap();

        let mut out = String::new();
        ZlibDecoder::new(&z[..])
            .unwrap()
            .with_dictionary(dict)
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "a shared preset dictionary, used twice");

        let mut bytes = Vec::new();
        let err = ZlibDecoder::new(&z[..]).unwrap().read_to_end(&mut bytes).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn raw_adapters() {
        let config = DeflateConfig::default().with_wrapper(Wrapper::Raw);
        let mut enc = ZlibEncoder::with_config(Vec::new(), &config).unwrap();
        enc.write_all(b"headerless").unwrap();
        let z = enc.finish().unwrap();

        let mut out = Vec::new();
        ZlibDecoder::with_config(&z[..], &InflateConfig::default().with_wrapper(Wrapper::Raw))
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, b"headerless");
    }
}
