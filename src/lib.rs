pub mod adler32;
pub mod api;
pub mod batch;
pub mod common;
pub mod compress;
pub mod config;
pub mod decompress;
pub mod error;
pub mod huffman;
pub mod io;
pub mod stream;

pub use adler32::adler32;
pub use api::{compress, compress_with, deflate_raw, inflate_raw, uncompress};
pub use batch::{BatchCompressor, BatchDecompressor};
pub use compress::{compress_bound, Compressor, DataType};
pub use config::{DeflateConfig, InflateConfig, Level, Strategy, Wrapper};
pub use decompress::Decompressor;
pub use error::{Error, Result, Status};
pub use io::{ZlibDecoder, ZlibEncoder};
pub use stream::{DeflateStream, Flush, InflateStream, Step, Stream};
