//! Route matching benchmarks
//!
//! Matching is a linear, first-match-wins scan, so cost grows with the
//! position of the matching route in the table.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;
use relay_core::{Container, Route, Router};

fn router_with(count: usize) -> Router {
    let mut router = Router::new(Container::new());
    for i in 0..count {
        router
            .get(&format!("/resource{}/{{id:[0-9]+}}", i), "ResourceController@show")
            .name(&format!("resource{}.show", i));
    }
    router
}

fn bench_match_position(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_match");

    for count in [1, 10, 50, 200] {
        let router = router_with(count);
        let last = format!("/resource{}/42", count - 1);
        group.bench_with_input(BenchmarkId::new("last_of", count), &last, |b, path| {
            b.iter(|| router.match_route(&Method::GET, black_box(path)).is_some())
        });
    }

    let router = router_with(50);
    group.bench_function("miss_of_50", |b| {
        b.iter(|| router.match_route(&Method::GET, black_box("/nowhere/42")).is_none())
    });

    group.finish();
}

fn bench_parameters(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_parameters");

    let route = Route::new(
        Method::GET,
        "/teams/{team}/projects/{project:[a-z-]+}/issues/{issue:[0-9]+}",
        "IssueController@show",
    );
    let path = "/teams/core/projects/relay-rs/issues/1234";

    group.bench_function("compile", |b| b.iter(|| black_box(&route).compile().is_ok()));
    group.bench_function("parse_three", |b| {
        b.iter(|| route.parse_parameters(black_box(path)).len())
    });

    group.finish();
}

fn bench_url_generation(c: &mut Criterion) {
    let router = router_with(50);

    c.bench_function("url_named", |b| {
        b.iter(|| router.url(black_box("resource25.show"), [("id", 42)]).is_ok())
    });
}

criterion_group!(benches, bench_match_position, bench_parameters, bench_url_generation);
criterion_main!(benches);
