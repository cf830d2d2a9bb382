use std::hint::black_box;
use std::io::Cursor;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use harvest::config::ContainerConfig;
use harvest::encoding::Encoding;
use harvest::readfile::{EncodeReader, LineReader};
use harvest::{build_reader, HarvestConfig, Reader};

const LINES: usize = 2_000;

fn sample_text() -> String {
    (0..LINES)
        .map(|i| format!("2024-01-15T10:30:{:02}Z level=info request_id={} msg=\"größe ok\"\n", i % 60, i))
        .collect()
}

fn drain<R: Reader + ?Sized>(reader: &mut R) -> usize {
    let mut count = 0;
    while reader.next().is_ok() {
        count += 1;
    }
    count
}

fn bench_line_reader(c: &mut Criterion) {
    let text = sample_text();
    let mut group = c.benchmark_group("line_reader");

    for encoding in [Encoding::Plain, Encoding::Utf8, Encoding::Utf16Le, Encoding::Latin1] {
        let raw = encoding.encode(&text);
        group.throughput(Throughput::Bytes(raw.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(encoding), &raw, |b, raw| {
            b.iter(|| {
                let line = LineReader::new(
                    Cursor::new(raw.clone()),
                    encoding.decoder(),
                    b"\n",
                    16 * 1024,
                )
                .unwrap();
                black_box(drain(&mut EncodeReader::new(line)))
            });
        });
    }
    group.finish();
}

fn bench_container_chain(c: &mut Criterion) {
    let docker: String = (0..LINES)
        .map(|i| {
            format!(
                "{{\"log\":\"request {} served\\n\",\"stream\":\"stdout\",\"time\":\"2024-01-15T10:30:00.{:09}Z\"}}\n",
                i, i
            )
        })
        .collect();
    let config = HarvestConfig {
        container: Some(ContainerConfig::default()),
        ..Default::default()
    };

    let mut group = c.benchmark_group("container_chain");
    group.throughput(Throughput::Bytes(docker.len() as u64));
    group.bench_function("docker_json", |b| {
        b.iter(|| {
            let mut reader = build_reader(Cursor::new(docker.clone()), &config).unwrap();
            black_box(drain(&mut reader))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_line_reader, bench_container_chain);
criterion_main!(benches);
