use zflate::{
    compress, BatchCompressor, BatchDecompressor, DeflateConfig, Error, InflateConfig, Level,
    Wrapper,
};

#[test]
fn test_batch_compress_decompress_roundtrip() {
    let inputs: Vec<&[u8]> = vec![
        b"Hello world! This is a test string for deflate compression.",
        b"Another test string.",
        b"Repeating pattern repeating pattern repeating pattern repeating pattern.",
        b"Short",
        &[0u8; 1000],
        b"",
    ];

    let compressor = BatchCompressor::new(DeflateConfig::default()).unwrap();
    let compressed: Vec<Vec<u8>> = compressor
        .compress_batch(&inputs)
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(compressed.len(), inputs.len());

    for (z, input) in compressed.iter().zip(&inputs) {
        assert_eq!(z, &compress(input, Level::DEFAULT).unwrap());
    }

    let refs: Vec<&[u8]> = compressed.iter().map(|v| v.as_slice()).collect();
    let hints: Vec<usize> = inputs.iter().map(|input| input.len()).collect();
    let decompressor = BatchDecompressor::default();
    let decompressed = decompressor.decompress_batch(&refs, &hints);

    assert_eq!(decompressed.len(), inputs.len());
    for (i, result) in decompressed.iter().enumerate() {
        match result {
            Ok(out) => assert_eq!(out.as_slice(), inputs[i], "Mismatch at index {}", i),
            Err(e) => panic!("Decompression failed for input index {}: {}", i, e),
        }
    }
}

#[test]
fn test_batch_empty() {
    let compressor = BatchCompressor::new(DeflateConfig::new(Level::BEST)).unwrap();
    assert!(compressor.compress_batch(&[]).is_empty());
    assert!(BatchDecompressor::default().decompress_batch(&[], &[]).is_empty());
}

#[test]
fn test_batch_raw_many_items() {
    let owned: Vec<Vec<u8>> = (0..200)
        .map(|i| format!("item {} of the batch; ", i).repeat(i % 37 + 1).into_bytes())
        .collect();
    let inputs: Vec<&[u8]> = owned.iter().map(|v| v.as_slice()).collect();

    let config = DeflateConfig::new(Level::FASTEST).with_wrapper(Wrapper::Raw);
    let compressed: Vec<Vec<u8>> = BatchCompressor::new(config)
        .unwrap()
        .compress_batch(&inputs)
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let refs: Vec<&[u8]> = compressed.iter().map(|v| v.as_slice()).collect();
    let decompressor = BatchDecompressor::new(InflateConfig::default().with_wrapper(Wrapper::Raw)).unwrap();
    let out = decompressor.decompress_batch(&refs, &vec![0; refs.len()]);
    for (got, want) in out.into_iter().zip(&owned) {
        assert_eq!(&got.unwrap(), want);
    }
}

#[test]
fn test_batch_rejects_bad_config() {
    assert!(matches!(
        BatchCompressor::new(DeflateConfig::default().with_window_bits(16)),
        Err(Error::Stream(_))
    ));
    assert!(BatchDecompressor::new(InflateConfig::default().with_window_bits(7)).is_err());
}
