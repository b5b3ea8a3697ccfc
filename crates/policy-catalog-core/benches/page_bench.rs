use criterion::{criterion_group, criterion_main, Criterion};
use policy_catalog_core::{
    generate_dataset, resolve_policy_page, FixtureConfig, PageRequest, PolicyStore, SortCache,
    SortOrder, SortSpec, Timestamp,
};

fn bench_store() -> PolicyStore {
    // 2021-08-01T00:00:00Z
    let config = FixtureConfig {
        seed: 11,
        now: Timestamp::from_unix_seconds(1_627_776_000),
        customers: 500,
        policies: 10_000,
    };
    let dataset = match generate_dataset(&config) {
        Ok(dataset) => dataset,
        Err(err) => panic!("bench fixture should generate: {err}"),
    };
    match PolicyStore::from_dataset(dataset) {
        Ok(store) => store,
        Err(err) => panic!("bench fixture should validate: {err}"),
    }
}

fn bench_request() -> PageRequest {
    let fields = ["provider", "customer", "lastName", "policyNumber"]
        .iter()
        .map(|field| (*field).to_string())
        .collect::<Vec<_>>();
    let sort = match SortSpec::from_wire_fields(&fields, SortOrder::Asc) {
        Ok(sort) => sort,
        Err(err) => panic!("bench sort fields should parse: {err}"),
    };
    PageRequest { offset: 40, limit: Some(10), sort: Some(sort) }
}

fn bench_cold_sort(c: &mut Criterion) {
    let store = bench_store();
    let request = bench_request();
    c.bench_function("cold_sort_page_10000_policies", |b| {
        b.iter(|| {
            let cache = match SortCache::new(1) {
                Ok(cache) => cache,
                Err(err) => panic!("bench cache should build: {err}"),
            };
            let result = resolve_policy_page(&store, &cache, &request);
            if let Err(err) = result {
                panic!("bench page should resolve: {err}");
            }
        });
    });
}

fn bench_cached_page(c: &mut Criterion) {
    let store = bench_store();
    let request = bench_request();
    let cache = match SortCache::new(4) {
        Ok(cache) => cache,
        Err(err) => panic!("bench cache should build: {err}"),
    };
    if let Err(err) = resolve_policy_page(&store, &cache, &request) {
        panic!("bench warmup should resolve: {err}");
    }
    c.bench_function("cached_page_10000_policies", |b| {
        b.iter(|| {
            let result = resolve_policy_page(&store, &cache, &request);
            if let Err(err) = result {
                panic!("bench page should resolve: {err}");
            }
        });
    });
}

criterion_group!(page_benches, bench_cold_sort, bench_cached_page);
criterion_main!(page_benches);
