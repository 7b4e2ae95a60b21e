// Stress Tests for SimpleDB
// The #[ignore] tests are intended to be run manually
// Run with: cargo test --release -- --ignored --nocapture

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use simpledb::{Database, InsertOutcome, MemoryFile, Options};
use std::time::Instant;
use tempfile::TempDir;

/// Random insert order with the smallest order, so splits cascade often
#[test]
fn stress_random_order_small_nodes() {
    env_logger::try_init().ok();
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut keys: Vec<usize> = (0..2000).collect();
    keys.shuffle(&mut rng);

    let options = Options::new().page_size(4096).order(3);
    let mut db = Database::with_file(MemoryFile::new(), options).unwrap();

    for &k in &keys {
        let value = vec![(k % 251) as u8; k % 97];
        assert_eq!(db.insert(&value, &format!("key{:06}", k)).unwrap(), InsertOutcome::Inserted);
    }

    let stats = db.verify().unwrap();
    assert_eq!(stats.key_count, 2000);
    for k in 0..2000 {
        let value = db.content(&format!("KEY{:06}", k)).unwrap();
        assert_eq!(value, Some(vec![(k % 251) as u8; k % 97]));
    }
}

/// Random values of random size mixed with lookups of missing keys
#[test]
fn stress_random_value_sizes() {
    env_logger::try_init().ok();
    let mut rng = StdRng::seed_from_u64(42);
    let options = Options::new().order(5).page_size(Options::min_page_size(5) as u32);
    let mut db = Database::with_file(MemoryFile::new(), options).unwrap();

    let mut expected = Vec::new();
    for i in 0..400 {
        let len = rng.random_range(0..20_000);
        let value: Vec<u8> = (0..len).map(|_| rng.random()).collect();
        let key = format!("entry-{}", i);
        db.insert(&value, &key).unwrap();
        expected.push((key, value));
    }

    expected.shuffle(&mut rng);
    for (key, value) in &expected {
        assert_eq!(db.content(key).unwrap().as_ref(), Some(value));
        assert_eq!(db.content(&format!("{}-missing", key)).unwrap(), None);
    }
    db.verify().unwrap();
}

/// Large on-disk import with default options
#[test]
#[ignore]
fn stress_large_import() {
    env_logger::try_init().ok();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stress.simpledb");
    let mut rng = StdRng::seed_from_u64(7);

    let mut keys: Vec<String> = (0..50_000).map(|i| format!("word{:08}", i)).collect();
    keys.shuffle(&mut rng);

    let start = Instant::now();
    {
        let mut db = Database::open(&path).unwrap();
        for key in &keys {
            db.insert(key, key).unwrap();
        }
        db.close().unwrap();
    }
    let elapsed = start.elapsed();
    println!(
        "Inserted {} keys in {:?} ({:.0} ops/s)",
        keys.len(),
        elapsed,
        keys.len() as f64 / elapsed.as_secs_f64()
    );

    let db = Database::open(&path).unwrap();
    let stats = db.verify().unwrap();
    println!("Tree: height {}, {} nodes", stats.height, stats.node_count);
    assert_eq!(stats.key_count, keys.len());
    for key in keys.iter().take(5_000) {
        assert_eq!(db.content_string(key).unwrap().as_deref(), Some(key.as_str()));
    }
}
