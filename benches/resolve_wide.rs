use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use ncbi_mapper::data::Table;
use ncbi_mapper::loader::load_table;
use ncbi_mapper::resolve::resolve;
use ncbi_mapper::rules::{ColumnMapping, RuleEntries};
use ncbi_mapper::schema::{BIOSAMPLE, SRA};

const COLUMNS: usize = 60;
const ROWS: usize = 5_000;

fn generate_lab_csv(columns: usize, rows: usize) -> Vec<u8> {
    let mut out = String::new();
    let header: Vec<String> = (0..columns).map(|c| format!("lab_field_{c}")).collect();
    out.push_str(&header.join(","));
    out.push('\n');
    for r in 0..rows {
        let row: Vec<String> = (0..columns)
            .map(|c| match c % 4 {
                0 => format!("ISO-{r:06}"),
                1 => format!("2024-{:02}-{:02}", (r % 12) + 1, (r % 28) + 1),
                2 => (r * c).to_string(),
                _ if r % 7 == 0 => String::new(),
                _ => format!("note {r}"),
            })
            .collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out.into_bytes()
}

fn inferred_mapping(table: &Table, targets: &[&str]) -> ColumnMapping {
    table
        .column_names()
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let target = targets.get(idx).copied().unwrap_or_default();
            (name.to_string(), target.to_string())
        })
        .collect()
}

fn bench_resolve(c: &mut Criterion) {
    let bytes = generate_lab_csv(COLUMNS, ROWS);
    let table = load_table(&bytes, "wide.csv", encoding_rs::UTF_8).expect("load wide table");
    let manual: RuleEntries = vec![("lab_field_1".to_string(), "collection_date".to_string())];
    let statics: RuleEntries = vec![("geo_loc_name".to_string(), "USA".to_string())];

    let mut group = c.benchmark_group("resolve_wide");
    group.sample_size(20);
    group.bench_function("load_csv", |b| {
        b.iter(|| load_table(black_box(&bytes), "wide.csv", encoding_rs::UTF_8).expect("load"))
    });
    for schema in [&SRA, &BIOSAMPLE] {
        let inferred = inferred_mapping(&table, schema.required);
        group.bench_function(format!("resolve_{}", schema.slug), |b| {
            b.iter_batched(
                || inferred.clone(),
                |inferred| {
                    resolve(
                        schema,
                        black_box(&table),
                        &inferred,
                        Some(&manual),
                        Some(&statics),
                    )
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
