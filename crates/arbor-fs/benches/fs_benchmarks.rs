use arbor_fs::io::{self, RobustnessConfig};
use arbor_fs::{NormalizedPath, checksum};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::fs;
use tempfile::tempdir;

fn write_atomic_benchmark(c: &mut Criterion) {
    c.bench_function("io::write_atomic", |b| {
        let dir = tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("test_file.txt"));
        let content = "hello world".as_bytes();
        let config = RobustnessConfig::default();

        b.iter(|| {
            io::write_atomic(black_box(&path), black_box(content), config).unwrap();
        })
    });
}

fn copy_atomic_benchmark(c: &mut Criterion) {
    c.bench_function("io::copy_atomic (64KB)", |b| {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("dst.bin");
        fs::write(&src, vec![1u8; 64 * 1024]).unwrap();
        let config = RobustnessConfig::default();

        b.iter(|| {
            io::copy_atomic(black_box(&src), black_box(&dst), config).unwrap();
        })
    });
}

fn checksum_benchmark(c: &mut Criterion) {
    c.bench_function("checksum::compute_file_checksum (1MB)", |b| {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.bin");
        fs::write(&path, vec![9u8; 1024 * 1024]).unwrap();

        b.iter(|| checksum::compute_file_checksum(black_box(&path)).unwrap())
    });
}

criterion_group!(
    benches,
    write_atomic_benchmark,
    copy_atomic_benchmark,
    checksum_benchmark
);
criterion_main!(benches);
