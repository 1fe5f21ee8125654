//! Scan performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use frontscan::classfile::builder::{ClassFileBuilder, Instruction};
use frontscan::types::{APP_SHELL_CONFIGURATOR, JS_MODULE, ROUTE, VALUE};
use frontscan::*;
use std::fs;
use tempfile::TempDir;

/// A routed application: `views` views sharing a pool of `components` components
fn application(views: usize, components: usize) -> Vec<Vec<u8>> {
    let mut classes = Vec::new();
    for i in 0..components {
        let next = format!("Lcom/app/components/Component{};", (i + 1) % components);
        classes.push(
            ClassFileBuilder::new(&format!("com.app.components.Component{}", i))
                .marker(Marker::new(JS_MODULE).with(VALUE, format!("./component-{}.js", i)))
                .field("next", &next)
                .build(),
        );
    }
    for i in 0..views {
        let mut view = ClassFileBuilder::new(&format!("com.app.views.View{}", i))
            .marker(Marker::new(ROUTE).with(VALUE, format!("view-{}", i)));
        let body = (0..4)
            .map(|k| Instruction::New(format!("com.app.components.Component{}", (i * 7 + k) % components)))
            .collect();
        view = view.method("build", "()V", body);
        classes.push(view.build());
    }
    classes.push(
        ClassFileBuilder::new("com.app.Shell")
            .interface(APP_SHELL_CONFIGURATOR)
            .build(),
    );
    classes
}

fn bench_small_application(c: &mut Criterion) {
    let finder = ClasspathFinder::from_class_bytes(application(5, 20)).unwrap();

    c.bench_function("small_application_scan", |b| {
        b.iter(|| scan(black_box(&finder)).unwrap())
    });
}

fn bench_large_application(c: &mut Criterion) {
    let finder = ClasspathFinder::from_class_bytes(application(200, 1000)).unwrap();
    let defaults = MarkerDefaults::new();
    let options = ScanOptions::default();

    c.bench_function("large_application_scan", |b| {
        b.iter(|| scan_with_defaults(black_box(&finder), &options, &defaults).unwrap())
    });
}

fn bench_directory_classpath(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    for bytes in application(50, 200) {
        let parsed = parse_class(&bytes, ParseMode::Declaration).unwrap();
        let path = temp_dir.path().join(format!("{}.class", parsed.name.replace('.', "/")));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    c.bench_function("directory_index_and_scan", |b| {
        b.iter(|| {
            let finder = ClasspathFinder::from_paths(&[temp_dir.path()]).unwrap();
            scan(&finder).unwrap()
        })
    });
}

fn bench_scan_modes(c: &mut Criterion) {
    let finder = ClasspathFinder::from_class_bytes(application(100, 400)).unwrap();
    let mut group = c.benchmark_group("scan_modes");

    for mode in [ScanMode::Targeted, ScanMode::FullClasspath] {
        group.bench_with_input(format!("{:?}", mode), &mode, |b, &mode| {
            let options = ScanOptions {
                mode,
                ..Default::default()
            };
            b.iter(|| scan_with_options(black_box(&finder), black_box(&options)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_small_application,
    bench_large_application,
    bench_directory_classpath,
    bench_scan_modes
);

criterion_main!(benches);
