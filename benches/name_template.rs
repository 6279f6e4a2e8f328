//! Benchmark for bucket name template parsing and rendering

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use s3_bucket_provisioner::{AccessMode, NameTemplate, ProvisionRequest};

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("name_template");
    group.throughput(Throughput::Elements(1));

    group.bench_function("parse_short_form", |b| {
        b.iter(|| NameTemplate::parse(black_box("{namespace}-{claimName}-{volumeName}")));
    });

    group.bench_function("parse_legacy_form", |b| {
        b.iter(|| {
            NameTemplate::parse(black_box(
                "{{ .PVC.ObjectMeta.Namespace }}-{{ .PVName }}",
            ))
        });
    });

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("name_template");
    group.throughput(Throughput::Elements(1));

    let template = NameTemplate::default();
    let request = ProvisionRequest {
        namespace: "team-a".into(),
        claim_name: "uploads".into(),
        volume_name: "pvc-5f0c8a4e-1c1d-4d7e-9a55-2f6b0f1d9c3e".into(),
        access_modes: vec![AccessMode::ReadWriteMany],
    };

    group.bench_function("render_default", |b| {
        b.iter(|| template.render(black_box(&request)));
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_render);
criterion_main!(benches);
