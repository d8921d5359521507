//! Container resolution benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use relay_core::{
    service_id, Arguments, Concrete, Container, Injectable, Params, ResolutionError, Signature,
};
use std::sync::Arc;

#[derive(Default)]
struct Clock;

struct Repository {
    _clock: Arc<Clock>,
}

impl Injectable for Repository {
    fn signature() -> Signature {
        Signature::new().service::<Clock>("clock")
    }

    fn construct(args: Arguments) -> Result<Self, ResolutionError> {
        Ok(Self {
            _clock: args.service::<Clock>("clock")?,
        })
    }
}

struct Service {
    _repository: Arc<Repository>,
    _page_size: u32,
}

impl Injectable for Service {
    fn signature() -> Signature {
        Signature::new()
            .service::<Repository>("repository")
            .value_or("page_size", 25)
    }

    fn construct(args: Arguments) -> Result<Self, ResolutionError> {
        Ok(Self {
            _repository: args.service::<Repository>("repository")?,
            _page_size: args.parse("page_size")?,
        })
    }
}

fn container() -> Container {
    let container = Container::new();
    container.register_default::<Clock>();
    container.register::<Repository>();
    container.register::<Service>();
    container
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("container");

    let shared = Container::new();
    shared.singleton("clock", Concrete::factory(|_: &Container, _: &Params| Ok(Clock)));
    shared.make("clock", &Params::new()).ok();
    group.bench_function("cached_singleton", |b| {
        b.iter(|| shared.make(black_box("clock"), &Params::new()).is_ok())
    });

    let bound = Container::new();
    bound.bind("clock", Concrete::factory(|_: &Container, _: &Params| Ok(Clock)));
    group.bench_function("factory_binding", |b| {
        b.iter(|| bound.make(black_box("clock"), &Params::new()).is_ok())
    });

    let wired = container();
    group.bench_function("autowire_depth_2", |b| {
        b.iter(|| wired.make(black_box(service_id::<Service>()), &Params::new()).is_ok())
    });

    group.bench_function("scope", |b| b.iter(|| black_box(wired.scope()).is_scoped()));

    group.finish();
}

criterion_group!(benches, bench_resolution);
criterion_main!(benches);
