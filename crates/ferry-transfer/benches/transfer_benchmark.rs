//! Benchmarks for the schema and row conversion hot paths.
//!
//! Run with: cargo bench -p ferry-transfer

#![allow(clippy::pedantic)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Map, Value};

use ferry_transfer::log::LogBook;
use ferry_transfer::resources::{Attribute, Collection};
use ferry_transfer::schema::{
    convert_attribute, convert_index, convert_row, parse_index_definition, ColumnInfo,
    IndexDefinition,
};

/// Benchmark column to attribute conversion across the common types
fn bench_convert_attribute(c: &mut Criterion) {
    let mut varchar = ColumnInfo::new("email", "character varying");
    varchar.character_maximum_length = Some(255);
    let mut array = ColumnInfo::new("tags", "ARRAY");
    array.udt_name = "_text".to_string();
    let mut defaulted = ColumnInfo::new("views", "integer");
    defaulted.is_nullable = "NO".to_string();
    defaulted.column_default = Some("0".to_string());

    let columns = vec![
        ColumnInfo::new("id", "uuid"),
        ColumnInfo::new("active", "boolean"),
        ColumnInfo::new("score", "double precision"),
        ColumnInfo::new("created_at", "timestamp with time zone"),
        ColumnInfo::new("location", "point"),
        varchar,
        array,
        defaulted,
    ];

    c.bench_function("convert_attribute_8_columns", |b| {
        b.iter(|| {
            let mut logs = LogBook::new();
            let attributes: Vec<Attribute> = columns
                .iter()
                .map(|column| convert_attribute(column, &mut logs))
                .collect();
            black_box((attributes, logs))
        })
    });
}

/// Benchmark index definition parsing
fn bench_parse_index(c: &mut Criterion) {
    let definitions = [
        (
            "unique",
            "CREATE UNIQUE INDEX users_email_key ON public.users USING btree (email)",
        ),
        (
            "composite",
            "CREATE INDEX posts_author_created ON public.posts USING btree (author_id, created_at DESC)",
        ),
        (
            "gin",
            "CREATE INDEX posts_body_search ON public.posts USING gin (to_tsvector('english'::regconfig, body))",
        ),
    ];

    let mut group = c.benchmark_group("parse_index_definition");
    for (name, definition) in definitions {
        group.bench_with_input(BenchmarkId::new("kind", name), definition, |b, def| {
            b.iter(|| black_box(parse_index_definition(def)))
        });
    }
    group.finish();

    let definition = IndexDefinition::new(
        "users_email_key",
        "CREATE UNIQUE INDEX users_email_key ON public.users USING btree (email)",
    );
    c.bench_function("convert_index_unique", |b| {
        b.iter(|| {
            let mut logs = LogBook::new();
            black_box(convert_index(&definition, &mut logs))
        })
    });
}

/// Benchmark row shaping, including date-time normalization
fn bench_convert_row(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_row_width");
    for width in [4usize, 16, 64] {
        let mut collection = Collection::new("wide", "wide");
        let mut row: Map<String, Value> = Map::new();
        for i in 0..width {
            let key = format!("c{}", i);
            match i % 4 {
                0 => {
                    collection.attributes.push(Attribute::integer(&key, None, None));
                    row.insert(key, json!(i));
                }
                1 => {
                    collection.attributes.push(Attribute::string(&key, 255));
                    row.insert(key, json!(format!("value {}", i)));
                }
                2 => {
                    collection.attributes.push(Attribute::datetime(&key));
                    row.insert(key, json!("2024-03-01T10:00:00+00:00"));
                }
                _ => {
                    collection.attributes.push(Attribute::string(&key, 4096));
                    row.insert(key, json!({"nested": [1, 2, 3]}));
                }
            }
        }

        group.bench_with_input(BenchmarkId::new("columns", width), &row, |b, row| {
            b.iter(|| {
                let mut logs = LogBook::new();
                black_box(convert_row(&collection, row, &mut logs))
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_convert_attribute,
    bench_parse_index,
    bench_convert_row
);
criterion_main!(benches);
