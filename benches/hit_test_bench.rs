//! Benchmarks for pointer hit testing
//!
//! Every pointer motion in passthrough mode searches the scene top-down.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use planar_core::config::Config;
use planar_core::event::CoreEvent;
use planar_core::surface::Placement;
use planar_core::{Core, Geometry};

/// A core with `n` overlapping 400×300 toplevels, each carrying one
/// sub-surface above and one below.
fn populated_core(n: i32) -> Core {
    let mut core = Core::new(Config::default());
    let output = core.next_output_id();
    core.handle_event(CoreEvent::OutputAdded {
        id: output,
        name: "bench".into(),
        geometry: Geometry::new(0, 0, 1920, 1080),
        scale: 1.0,
    });

    for i in 0..n {
        let root = core.next_surface_id();
        let toplevel = core.next_toplevel_id();
        core.handle_event(CoreEvent::SurfaceCreated { id: root });
        core.handle_event(CoreEvent::SurfaceCommitted {
            id: root,
            width: 400,
            height: 300,
        });
        core.handle_event(CoreEvent::ToplevelCreated {
            id: toplevel,
            surface: root,
            app_id: None,
            title: None,
        });

        for placement in [Placement::Above, Placement::Below] {
            let child = core.next_surface_id();
            let sub = core.next_subsurface_id();
            core.handle_event(CoreEvent::SurfaceCreated { id: child });
            core.handle_event(CoreEvent::SurfaceCommitted {
                id: child,
                width: 40,
                height: 40,
            });
            core.handle_event(CoreEvent::SubsurfaceCreated {
                id: sub,
                surface: child,
                parent: root,
                placement,
                x: 10,
                y: 10,
            });
            core.handle_event(CoreEvent::SurfaceMapped { id: child });
        }

        core.handle_event(CoreEvent::SurfaceMapped { id: root });
        if let Some(t) = core.state.toplevels.get_mut(toplevel) {
            t.position = ((i * 37) % 1500, (i * 23) % 780);
        }
    }
    core
}

fn hit_test_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("hit_test");

    for n in [1, 10, 50, 200] {
        let core = populated_core(n);
        group.bench_with_input(BenchmarkId::new("surface_at_miss", n), &core, |b, core| {
            b.iter(|| black_box(core.state.surface_at(1919.0, 1079.0)));
        });
        group.bench_with_input(BenchmarkId::new("surface_at_sweep", n), &core, |b, core| {
            b.iter(|| {
                for x in (0..1920).step_by(120) {
                    black_box(core.state.surface_at(f64::from(x), 540.0));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, hit_test_benchmark);
criterion_main!(benches);
