use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use ferrous_beans::*;
use std::sync::Arc;

#[derive(Default)]
struct Repository {
    url: Slot<String>,
}

impl Introspectable for Repository {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class
            .default_constructor()
            .property("url", |r: &Repository, url: String| r.url.set(url))
    }
}

trait Handler: Send + Sync {
    fn id(&self) -> usize;
}

struct Service {
    repository: Arc<Repository>,
}

impl Handler for Service {
    fn id(&self) -> usize {
        Arc::as_ptr(&self.repository) as usize
    }
}

impl Introspectable for Service {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class
            .implements::<dyn Handler>(|s| s as Arc<dyn Handler>)
            .constructor(vec![Param::of::<Arc<Repository>>("repository")], |args| {
                Ok(Service { repository: args.next()? })
            })
    }
}

fn wired() -> Container {
    let container = Container::new();
    container
        .register_definition("repository", BeanDefinition::of::<Repository>().property("url", "mem://"))
        .unwrap();
    container.register_definition("service", BeanDefinition::of::<Service>()).unwrap();
    container
        .register_definition("job", BeanDefinition::of::<Service>().prototype())
        .unwrap();
    container
}

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let container = wired();
    let _ = container.get::<Service>("service").unwrap();

    c.bench_function("singleton_hit", |b| {
        b.iter(|| {
            let service: Arc<Service> = container.get("service").unwrap();
            black_box(service);
        })
    });

    c.bench_function("singleton_hit_interface_view", |b| {
        b.iter(|| {
            let handler: Arc<dyn Handler> = container.get("service").unwrap();
            black_box(handler.id());
        })
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    c.bench_function("singleton_cold", |b| {
        b.iter_batched(
            wired,
            |container| {
                let service: Arc<Service> = container.get("service").unwrap();
                black_box(service.repository.url.get());
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_prototype_creation(c: &mut Criterion) {
    let container = wired();
    let _ = container.get::<Repository>("repository").unwrap();

    c.bench_function("prototype_with_constructor_injection", |b| {
        b.iter(|| {
            let job: Arc<Service> = container.get("job").unwrap();
            black_box(job);
        })
    });
}

fn bench_by_type_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("by_type");

    for count in [1usize, 10, 100] {
        let container = Container::new();
        for i in 0..count {
            container
                .register_definition(&format!("repository{i}"), BeanDefinition::of::<Repository>())
                .unwrap();
        }
        container
            .register_definition("primary", BeanDefinition::of::<Repository>().primary())
            .unwrap();
        let _ = container.get_by_type::<Repository>().unwrap();

        group.bench_with_input(BenchmarkId::new("primary_among", count), &count, |b, _| {
            b.iter(|| {
                let repository: Arc<Repository> = container.get_by_type().unwrap();
                black_box(repository);
            })
        });

        group.bench_with_input(BenchmarkId::new("get_all", count), &count, |b, _| {
            b.iter(|| {
                let all: Vec<Arc<Repository>> = container.get_all().unwrap();
                black_box(all.len());
            })
        });
    }

    group.finish();
}

fn bench_setter_cycle(c: &mut Criterion) {
    #[derive(Default)]
    struct Node {
        next: Slot<Arc<Node>>,
    }

    impl Introspectable for Node {
        fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
            class
                .default_constructor()
                .property("next", |n: &Node, next: Arc<Node>| n.next.set(next))
        }
    }

    let mut group = c.benchmark_group("setter_cycle");

    for depth in [2usize, 8, 32] {
        group.bench_with_input(BenchmarkId::new("ring", depth), &depth, |b, &depth| {
            b.iter_batched(
                || {
                    let container = Container::new();
                    for i in 0..depth {
                        let next = format!("node{}", (i + 1) % depth);
                        container
                            .register_definition(&format!("node{i}"), BeanDefinition::of::<Node>().property_ref("next", next))
                            .unwrap();
                    }
                    container
                },
                |container| {
                    let head: Arc<Node> = container.get("node0").unwrap();
                    black_box(head.next.is_set());
                    container.destroy_all();
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_singleton_cold,
    bench_prototype_creation,
    bench_by_type_resolution,
    bench_setter_cycle
);
criterion_main!(benches);
