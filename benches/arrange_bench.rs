//! Benchmarks for layer surface arrangement
//!
//! Every output frame re-arranges the output's layer surfaces, so this has
//! to stay cheap even with many panels.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use planar_core::layer::{Anchor, Layer, LayerShell, LayerSurface, LayerSurfaceState};
use planar_core::output::Output;
use planar_core::{Geometry, LayerSurfaceId, OutputId, SurfaceId};

fn shell_with(n: u64) -> (LayerShell, Output) {
    let mut output = Output::new(OutputId(1), "bench".into(), Geometry::new(0, 0, 3840, 2160), 1.0);
    let mut shell = LayerShell::new();
    let edges = [Anchor::TOP, Anchor::BOTTOM, Anchor::LEFT, Anchor::RIGHT];

    for i in 0..n {
        let edge = edges[(i % 4) as usize];
        let state = LayerSurfaceState {
            layer: Layer::ALL[(i % 4) as usize],
            anchor: edge,
            exclusive_zone: 4,
            desired_width: 32,
            desired_height: 32,
        };
        let id = LayerSurfaceId(i);
        shell.insert(LayerSurface::new(id, SurfaceId(i), output.id, format!("bar-{i}"), state));
        shell.initial_configure(id, &output);
        if let Some(surface) = shell.get_mut(id) {
            surface.mapped = true;
        }
    }
    shell.arrange(&mut output);
    (shell, output)
}

fn arrange_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("arrange");

    for n in [1, 8, 32, 128] {
        group.bench_with_input(BenchmarkId::new("settled", n), &n, |b, &n| {
            let (mut shell, mut output) = shell_with(n);
            b.iter(|| black_box(shell.arrange(&mut output)));
        });
    }

    group.bench_function("scale_change", |b| {
        let (mut shell, mut output) = shell_with(32);
        let mut scale = 1.0;
        b.iter(|| {
            scale = if scale > 1.0 { 1.0 } else { 2.0 };
            output.set_mode(3840, 2160, scale);
            black_box(shell.arrange(&mut output))
        });
    });

    group.finish();
}

criterion_group!(benches, arrange_benchmark);
criterion_main!(benches);
