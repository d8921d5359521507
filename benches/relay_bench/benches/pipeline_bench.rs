//! Middleware pipeline and full dispatch benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use http::{Method, StatusCode, Uri};
use relay_core::{
    middleware_fn, Action, Config, Container, DispatchError, IntoResponse, Kernel, MiddlewareRef,
    Next, Pipeline, Request, Router, Signature,
};

fn passthrough() -> MiddlewareRef<Request> {
    middleware_fn(|req: Request, next: Next<Request>| async move { next.run(req).await })
}

fn bench_pipeline_depth(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let container = Container::new();
    let mut group = c.benchmark_group("pipeline_depth");

    for depth in [0, 1, 5, 10, 20] {
        let layers: Vec<_> = (0..depth).map(|_| passthrough()).collect();
        group.bench_with_input(BenchmarkId::new("layers", depth), &layers, |b, layers| {
            b.iter(|| {
                rt.block_on(
                    Pipeline::new(container.clone())
                        .send(Request::new(Method::GET, Uri::from_static("/")))
                        .through(layers.iter().cloned())
                        .then(|_req: Request| async {
                            Ok::<_, DispatchError>(StatusCode::NO_CONTENT.into_response())
                        }),
                )
                .is_ok()
            })
        });
    }

    group.finish();
}

fn bench_kernel_handle(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let container = Container::new();
    let mut router = Router::new(container.clone());
    router.get(
        "/users/{id:[0-9]+}",
        Action::handler(Signature::new().value("id"), |args| async move {
            Ok::<_, DispatchError>(args.string("id")?)
        }),
    );
    router.middleware(passthrough());
    let kernel = Kernel::new(container, router, Config::production()).middleware(passthrough());

    c.bench_function("kernel_handle", |b| {
        b.iter(|| {
            let response =
                rt.block_on(kernel.handle(Request::new(Method::GET, Uri::from_static("/users/42"))));
            response.status()
        })
    });
}

criterion_group!(benches, bench_pipeline_depth, bench_kernel_handle);
criterion_main!(benches);
