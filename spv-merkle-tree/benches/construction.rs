#[macro_use]
extern crate criterion;

use criterion::{BenchmarkId, Criterion};
use rand::{seq::SliceRandom, thread_rng, RngCore};
use spv_merkle_tree::{MerkleTree, TaskPool};

const CHUNK: usize = 1024;

fn random_chunks(count: usize) -> Vec<Vec<u8>> {
    let mut rng = thread_rng();
    (0..count)
        .map(|_| {
            let mut chunk = vec![0u8; CHUNK];
            rng.fill_bytes(&mut chunk);
            chunk
        })
        .collect()
}

fn bench(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("Merkle construction");
        let cores = TaskPool::available_workers();
        for leaves in [1_000usize, 10_000, 100_000] {
            let chunks = random_chunks(leaves);
            let mut tree = MerkleTree::new(leaves).expect("initialize");
            for workers in [1, 2, cores] {
                group.bench_with_input(
                    BenchmarkId::new(format!("workers {workers}"), leaves),
                    &workers,
                    |b, &workers| {
                        b.iter(|| tree.construct(&chunks, CHUNK, workers).expect("construct"));
                    },
                );
            }
        }
    }

    c.bench_function("Merkle verify", |b| {
        let leaves = 100_000;
        let chunks = random_chunks(leaves);
        let mut tree = MerkleTree::new(leaves).expect("initialize");
        let root = tree.construct(&chunks, CHUNK, 1).expect("construct").root_hash;
        let mut rng = thread_rng();
        let offsets: Vec<usize> = (0..leaves).collect();
        let proofs: Vec<_> = (0..1_000)
            .map(|_| tree.prove(*offsets.choose(&mut rng).expect("offset")).expect("prove"))
            .collect();
        let mut verifier = MerkleTree::new(leaves).expect("initialize");
        b.iter(|| {
            let proof = proofs.choose(&mut rng).expect("proof");
            verifier.verify_proof(proof, &root).expect("verify");
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench
);
criterion_main!(benches);
