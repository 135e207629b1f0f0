use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use zflate::adler32;
use zflate::adler32::Adler32;

#[test]
fn test_adler32_known_values() {
    assert_eq!(adler32(1, b""), 1);
    assert_eq!(adler32(1, b"A"), 4325442);
    assert_eq!(adler32(1, b"adler32"), 178520686);
    assert_eq!(adler32(1, b"Hello, World!"), 530449514);
    assert_eq!(adler32(1, &[0u8; 1000]), 65536001);
}

#[test]
fn test_adler32_overflow_matches_libdeflater() {
    for size in [5551, 5552, 5553, 100_000, 1_000_000] {
        let data = vec![0xFF; size];
        assert_eq!(
            adler32(1, &data),
            libdeflater::adler32(&data),
            "Adler32 mismatch for size {} with 0xFF",
            size
        );
    }
}

#[test]
fn test_adler32_random_matches_libdeflater() {
    let mut rng = StdRng::seed_from_u64(0xADE1);
    for _ in 0..32 {
        let len = rng.gen_range(0..70_000);
        let mut data = vec![0u8; len];
        rng.fill(&mut data[..]);
        assert_eq!(adler32(1, &data), libdeflater::adler32(&data), "len {}", len);
    }
}

#[test]
fn test_adler32_incremental_equals_one_shot() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut data = vec![0u8; 200_000];
    rng.fill(&mut data[..]);

    let mut running = 1;
    let mut hasher = Adler32::new();
    let mut pos = 0;
    while pos < data.len() {
        let n = rng.gen_range(1..9000).min(data.len() - pos);
        running = adler32(running, &data[pos..pos + n]);
        hasher.write(&data[pos..pos + n]);
        pos += n;
    }
    assert_eq!(running, adler32(1, &data));
    assert_eq!(hasher.finish(), running);
}
