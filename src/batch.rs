use crate::api::{deflate_all, inflate_all};
use crate::config::{DeflateConfig, InflateConfig};
use crate::error::Result;
use crate::stream::{DeflateStream, InflateStream};
use rayon::prelude::*;

/// Compresses many independent buffers in parallel, one stream per worker.
pub struct BatchCompressor {
    config: DeflateConfig,
}

impl BatchCompressor {
    pub fn new(config: DeflateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn compress_batch(&self, inputs: &[&[u8]]) -> Vec<Result<Vec<u8>>> {
        inputs
            .par_iter()
            .map_init(
                || DeflateStream::new(&self.config),
                |stream, &input| {
                    let stream = stream.as_mut().map_err(|e| e.clone())?;
                    stream.reset()?;
                    deflate_all(stream, input)
                },
            )
            .collect()
    }
}

/// Decompresses many independent streams in parallel, one stream per worker.
pub struct BatchDecompressor {
    config: InflateConfig,
}

impl Default for BatchDecompressor {
    fn default() -> Self {
        Self {
            config: InflateConfig::default(),
        }
    }
}

impl BatchDecompressor {
    pub fn new(config: InflateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// `size_hints[i]` is the expected decompressed size of `inputs[i]`.
    pub fn decompress_batch(&self, inputs: &[&[u8]], size_hints: &[usize]) -> Vec<Result<Vec<u8>>> {
        inputs
            .par_iter()
            .zip(size_hints.par_iter())
            .map_init(
                || InflateStream::new(&self.config),
                |stream, (&input, &hint)| {
                    let stream = stream.as_mut().map_err(|e| e.clone())?;
                    stream.reset()?;
                    inflate_all(stream, input, hint)
                },
            )
            .collect()
    }
}
