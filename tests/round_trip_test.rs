use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zflate::{
    compress, compress_with, deflate_raw, inflate_raw, uncompress, DeflateConfig, DeflateStream,
    Error, Flush, InflateConfig, Level, Status, Strategy, Wrapper,
};

const WORDS: &[&str] = &[
    "the ", "stream ", "window ", "of ", "bytes ", "match ", "literal ", "block ", "and ",
    "huffman ", "code ", "length ", "distance ", "\n", "zlib ", "deflate ",
];

fn text_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(len + 16);
    while out.len() < len {
        out.extend_from_slice(WORDS[rng.gen_range(0..WORDS.len())].as_bytes());
    }
    out.truncate(len);
    out
}

fn random_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = vec![0u8; len];
    rng.fill(&mut out[..]);
    out
}

/// Text with stretches of noise and long runs, so every block type shows up.
fn mixed_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(len + 4096);
    while out.len() < len {
        match rng.gen_range(0..3) {
            0 => out.extend(text_data(rng.gen_range(100..4000), rng.gen())),
            1 => out.extend(random_data(rng.gen_range(10..2000), rng.gen())),
            _ => {
                let b: u8 = rng.gen();
                out.extend(std::iter::repeat(b).take(rng.gen_range(3..1000)));
            }
        }
    }
    out.truncate(len);
    out
}

fn libdeflater_inflate(z: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let n = libdeflater::Decompressor::new()
        .zlib_decompress(z, &mut out)
        .unwrap();
    out.truncate(n);
    out
}

#[test]
fn test_all_levels_round_trip() {
    let inputs = [
        Vec::new(),
        b"a".to_vec(),
        b"abcabcabcabcabcabc".to_vec(),
        text_data(100_000, 1),
        mixed_data(300_000, 2),
    ];
    for data in &inputs {
        for level in 0..=9 {
            let z = compress(data, Level::new(level).unwrap()).unwrap();
            let out = uncompress(&z, data.len()).unwrap();
            assert_eq!(&out, data, "level {} len {}", level, data.len());
        }
    }
}

#[test]
fn test_all_strategies_round_trip() {
    let data = mixed_data(200_000, 3);
    for strategy in [Strategy::Default, Strategy::Filtered, Strategy::HuffmanOnly] {
        for level in [1, 4, 6, 9] {
            let config = DeflateConfig::new(Level::new(level).unwrap()).with_strategy(strategy);
            let z = compress_with(&data, &config).unwrap();
            assert_eq!(
                uncompress(&z, data.len()).unwrap(),
                data,
                "{:?} level {}",
                strategy,
                level
            );
        }
    }
}

#[test]
fn test_small_windows_and_memory_levels() {
    let data = text_data(50_000, 4);
    for bits in [9, 10, 12, 15] {
        for mem_level in [1, 5, 9] {
            let config = DeflateConfig::new(Level::BEST)
                .with_window_bits(bits)
                .with_mem_level(mem_level);
            let z = compress_with(&data, &config).unwrap();
            assert_eq!(z[0] >> 4, bits - 8);

            let mut s = zflate::InflateStream::new(&InflateConfig::default().with_window_bits(bits)).unwrap();
            let mut out = vec![0u8; data.len() + 1];
            let step = s.inflate(&z, &mut out, Flush::Finish).unwrap();
            assert_eq!(step.status, Status::StreamEnd);
            assert_eq!(&out[..step.produced], &data[..]);
        }
    }
}

#[test]
fn test_decoder_window_too_small() {
    let z = compress(b"needs a 32K window", Level::DEFAULT).unwrap();
    let mut s = zflate::InflateStream::new(&InflateConfig::default().with_window_bits(10)).unwrap();
    let mut out = [0u8; 64];
    assert_eq!(
        s.inflate(&z, &mut out, Flush::NoFlush).unwrap_err(),
        Error::Data("invalid window size")
    );
}

#[test]
fn test_output_is_deterministic() {
    let data = mixed_data(150_000, 5);
    for level in 0..=9 {
        let level = Level::new(level).unwrap();
        assert_eq!(compress(&data, level).unwrap(), compress(&data, level).unwrap());
    }
}

#[test]
fn test_libdeflater_reads_our_streams() {
    let data = mixed_data(250_000, 6);
    for level in 0..=9 {
        let z = compress(&data, Level::new(level).unwrap()).unwrap();
        assert_eq!(libdeflater_inflate(&z, data.len()), data, "level {}", level);
    }
    let z = compress_with(&data, &DeflateConfig::default().with_strategy(Strategy::HuffmanOnly)).unwrap();
    assert_eq!(libdeflater_inflate(&z, data.len()), data);
}

#[test]
fn test_we_read_libdeflater_streams() {
    let data = mixed_data(250_000, 7);
    for level in [1, 6, 9, 12] {
        let mut c = libdeflater::Compressor::new(libdeflater::CompressionLvl::new(level).unwrap());
        let mut z = vec![0u8; c.zlib_compress_bound(data.len())];
        let n = c.zlib_compress(&data, &mut z).unwrap();
        z.truncate(n);
        assert_eq!(uncompress(&z, data.len()).unwrap(), data, "libdeflater level {}", level);
        assert_eq!(uncompress(&z, 0).unwrap(), data);
    }
}

#[test]
fn test_raw_deflate_interop() {
    let data = text_data(40_000, 8);
    let z = deflate_raw(&data, Level::DEFAULT).unwrap();
    let mut out = vec![0u8; data.len()];
    let n = libdeflater::Decompressor::new()
        .deflate_decompress(&z, &mut out)
        .unwrap();
    assert_eq!(&out[..n], &data[..]);

    let mut c = libdeflater::Compressor::new(libdeflater::CompressionLvl::default());
    let mut raw = vec![0u8; c.deflate_compress_bound(data.len())];
    let n = c.deflate_compress(&data, &mut raw).unwrap();
    assert_eq!(inflate_raw(&raw[..n], data.len()).unwrap(), data);
}

#[test]
fn test_empty_input_stream_bytes() {
    let z = compress(b"", Level::DEFAULT).unwrap();
    assert_eq!(z, [0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
}

#[test]
fn test_header_level_hints() {
    let hints = [
        (0, 0x01),
        (1, 0x01),
        (2, 0x01),
        (3, 0x5E),
        (4, 0x5E),
        (5, 0x9C),
        (6, 0x9C),
        (7, 0xDA),
        (9, 0xDA),
    ];
    for (level, flg) in hints {
        let z = compress(b"", Level::new(level).unwrap()).unwrap();
        assert_eq!(z[0], 0x78);
        assert_eq!(z[1], flg, "level {}", level);
    }
}

#[test]
fn test_repeated_byte_compresses_well() {
    let data = vec![b'x'; 100_000];
    let z = compress(&data, Level::BEST).unwrap();
    assert!(z.len() < 1_000, "compressed to {} bytes", z.len());
    assert_eq!(uncompress(&z, data.len()).unwrap(), data);
}

#[test]
fn test_random_data_does_not_shrink() {
    let data = random_data(10_000, 9);
    let z = compress(&data, Level::BEST).unwrap();
    assert!(z.len() >= data.len());
    assert!(z.len() <= zflate::compress_bound(data.len(), Wrapper::Zlib));
    assert_eq!(uncompress(&z, data.len()).unwrap(), data);
}

#[test]
fn test_one_byte_input_chunks_give_identical_output() {
    let data = vec![b'x'; 100_000];
    let one_shot = compress(&data, Level::BEST).unwrap();

    let mut s = DeflateStream::new(&DeflateConfig::new(Level::BEST)).unwrap();
    let mut out = Vec::new();
    let mut buf = vec![0u8; 4096];
    for byte in data.chunks(1) {
        let step = s.deflate(byte, &mut buf, Flush::NoFlush).unwrap();
        assert_eq!(step.consumed, 1);
        out.extend_from_slice(&buf[..step.produced]);
    }
    loop {
        let step = s.deflate(&[], &mut buf, Flush::Finish).unwrap();
        out.extend_from_slice(&buf[..step.produced]);
        if step.status == Status::StreamEnd {
            break;
        }
    }
    assert_eq!(out, one_shot);
    assert_eq!(s.total_in(), data.len() as u64);
    assert_eq!(s.total_out(), out.len() as u64);
}

#[test]
fn test_corrupted_stream_is_rejected() {
    let data = text_data(20_000, 10);
    let mut z = compress(&data, Level::DEFAULT).unwrap();
    let last = z.len() - 1;
    z[last] ^= 0x55;
    assert_eq!(uncompress(&z, data.len()).unwrap_err(), Error::Data("incorrect data check"));

    let mut z = compress(&data, Level::DEFAULT).unwrap();
    z[0] = 0x79;
    assert_eq!(uncompress(&z, data.len()).unwrap_err(), Error::Data("unknown compression method"));
}

#[test]
fn test_garbage_never_panics() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..500 {
        let len = rng.gen_range(0..600);
        let mut junk = random_data(len, rng.gen());
        if len >= 2 && rng.gen_bool(0.5) {
            junk[0] = 0x78;
            junk[1] = 0x9C;
        }
        let _ = uncompress(&junk, 1024);
        let _ = inflate_raw(&junk, 1024);
    }
}
