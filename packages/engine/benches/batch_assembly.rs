use criterion::{criterion_group, criterion_main, Criterion};
use dml_batch_engine::{
    BatchAssembler, BatchConfig, BatchPreparer, ColumnModification, ModificationBatch,
    RowMutationCommand, TableName,
};
use std::hint::black_box;

const INSERT_COUNT: usize = 1_000;
const UPDATE_COUNT: usize = 40;

fn order_insert(id: usize) -> RowMutationCommand {
    RowMutationCommand::insert(
        TableName::with_schema("orders", "sales"),
        vec![
            ColumnModification::identity_key("id"),
            ColumnModification::write("customer", format!("customer-{id}")),
            ColumnModification::write("total", i64::try_from(id).unwrap_or(i64::MAX)),
            ColumnModification::write("status", "new"),
        ],
    )
}

fn plain_insert(id: usize) -> RowMutationCommand {
    RowMutationCommand::insert(
        TableName::with_schema("order_lines", "sales"),
        vec![
            ColumnModification::write("order_id", i64::try_from(id).unwrap_or(i64::MAX)),
            ColumnModification::write("sku", "sku-1"),
            ColumnModification::write("quantity", 1),
        ],
    )
}

fn order_update(id: usize) -> RowMutationCommand {
    RowMutationCommand::update(
        TableName::with_schema("orders", "sales"),
        vec![
            ColumnModification::key("id", i64::try_from(id).unwrap_or(i64::MAX)),
            ColumnModification::concurrency_token("version", 2, 1),
            ColumnModification::write("status", "paid"),
            ColumnModification::read("updated_at"),
        ],
    )
}

fn bench_prepare_coalesced_inserts(c: &mut Criterion) {
    let commands: Vec<_> = (0..INSERT_COUNT).map(plain_insert).collect();
    let preparer = BatchPreparer::default();
    c.bench_function("prepare_coalesced_inserts", |b| {
        b.iter(|| {
            let batches = preparer
                .prepare(black_box(commands.clone()))
                .expect("prepare should succeed");
            black_box(batches);
        });
    });
}

fn bench_prepare_read_back_inserts(c: &mut Criterion) {
    let commands: Vec<_> = (0..INSERT_COUNT).map(order_insert).collect();
    let preparer = BatchPreparer::default();
    c.bench_function("prepare_read_back_inserts", |b| {
        b.iter(|| {
            let batches = preparer
                .prepare(black_box(commands.clone()))
                .expect("prepare should succeed");
            black_box(batches);
        });
    });
}

fn bench_complete_update_batch(c: &mut Criterion) {
    let commands: Vec<_> = (0..UPDATE_COUNT).map(order_update).collect();
    c.bench_function("complete_update_batch", |b| {
        b.iter(|| {
            let mut batch = ModificationBatch::new(BatchConfig::default());
            for command in black_box(commands.clone()) {
                batch.add(command).expect("add should succeed");
            }
            let executable = batch.complete(false).expect("complete should succeed");
            black_box(executable.command_text.len());
        });
    });
}

criterion_group!(
    benches,
    bench_prepare_coalesced_inserts,
    bench_prepare_read_back_inserts,
    bench_complete_update_batch
);
criterion_main!(benches);
