use criterion::{criterion_group, criterion_main, Criterion};
use heapred::compare::NaturalOrder;
use heapred::mapred::token::TokenStore;
use heapred::sequences::singly_linked_list::SList;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

const N: usize = 1000;

fn random_list(seed: u64) -> SList<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut list = SList::new();
    for _ in 0..N {
        list.push_back(rng.random());
    }
    list
}

pub fn bench_sequences(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequences");

    group.bench_function("slist_insertion_sort_1000", |b| {
        b.iter(|| {
            let mut list = random_list(1);
            list.insertion_sort(&NaturalOrder);
            black_box(list);
        })
    });

    group.bench_function("slist_selection_sort_1000", |b| {
        b.iter(|| {
            let mut list = random_list(2);
            list.selection_sort(&NaturalOrder);
            black_box(list);
        })
    });

    group.bench_function("slist_bubble_sort_1000", |b| {
        b.iter(|| {
            let mut list = random_list(3);
            list.bubble_sort(&NaturalOrder);
            black_box(list);
        })
    });

    group.bench_function("slist_merge_sort_1000", |b| {
        b.iter(|| {
            let mut list = random_list(4);
            list.merge_sort(&NaturalOrder);
            black_box(list);
        })
    });

    // A merge-heavy workload close to what the reduce phase does
    let mut rng = StdRng::seed_from_u64(5);
    let words: Vec<String> = (0..N)
        .map(|_| format!("word{}", rng.random_range(0..200)))
        .collect();
    let text = words.join(" ");

    group.bench_function("token_store_merge", |b| {
        b.iter(|| {
            let half = text.len() / 2;
            let cut = half + text.as_bytes()[half..].iter().position(|&b| b == b' ').unwrap_or(0);

            let mut left = TokenStore::new();
            left.tokenize(&text.as_bytes()[..cut]);
            let mut right = TokenStore::new();
            right.tokenize(&text.as_bytes()[cut..]);

            left.merge(&mut right);
            black_box(left.unique());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_sequences);
criterion_main!(benches);
