//! Benchmark for the product resolver's candidate search (spec §4.4).
//!
//! Measures `resolve_mentions` over a catalog large enough that the
//! fuzzy-name fallback path (linear scan + string distance) actually runs,
//! since that is the resolver's most expensive branch.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hermes_core::domain::{Category, Catalog, Product, ProductMention, Season};
use hermes_core::resolver::resolve_mentions;
use hermes_core::vector::{DocumentMetadata, InMemoryVectorIndex};
use std::collections::HashSet;

fn fixture_catalog(n: usize) -> Catalog {
    let products = (0..n)
        .map(|i| Product {
            product_id: format!("P{i:05}"),
            name: format!("Product Name {i}"),
            description: format!("A fine product, item number {i}, suitable for everyday use"),
            category: Category::Accessories,
            product_type: "widget".to_string(),
            stock: 10,
            seasons: HashSet::from([Season::AllSeasons]),
            price: 19.99,
            promotion: None,
            promotion_text: None,
            metadata: None,
        })
        .collect();
    Catalog::from_products(products).unwrap()
}

fn fixture_index(catalog: &Catalog, dim: usize) -> InMemoryVectorIndex {
    let mut index = InMemoryVectorIndex::new(dim);
    for product in catalog.all() {
        index.insert(
            &format!("{} {}", product.name, product.description),
            DocumentMetadata {
                product_id: product.product_id.clone(),
                fields: Default::default(),
            },
        );
    }
    index
}

fn bench_exact_id_resolution(c: &mut Criterion) {
    let catalog = fixture_catalog(500);
    let index = fixture_index(&catalog, 32);
    let mentions = vec![ProductMention {
        product_id: Some("P00042".to_string()),
        quantity: 1,
        ..Default::default()
    }];

    c.bench_function("resolve_mentions_exact_id", |b| {
        b.iter(|| {
            let output = resolve_mentions(black_box(&mentions), &catalog, &index, 3);
            black_box(output);
        });
    });
}

fn bench_fuzzy_name_resolution(c: &mut Criterion) {
    let catalog = fixture_catalog(500);
    let index = fixture_index(&catalog, 32);
    let mentions = vec![ProductMention {
        product_name: Some("Produkt Nmae 42".to_string()),
        product_type: Some("widget".to_string()),
        quantity: 1,
        ..Default::default()
    }];

    c.bench_function("resolve_mentions_fuzzy_name", |b| {
        b.iter(|| {
            let output = resolve_mentions(black_box(&mentions), &catalog, &index, 3);
            black_box(output);
        });
    });
}

criterion_group!(benches, bench_exact_id_resolution, bench_fuzzy_name_resolution);
criterion_main!(benches);
