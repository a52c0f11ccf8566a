/// Concurrent access tests
///
/// Singletons must be built exactly once no matter how many threads race for
/// them, and threads must never observe a half-initialized bean.
use crossbeam_utils::thread;
use ferrous_beans::{
    BeanDefinition, BoxError, ClassBuilder, Container, InitializingBean, Introspectable, LookupExt, Mutable, Param,
    Slot,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

static SLOW_BUILDS: AtomicUsize = AtomicUsize::new(0);

struct SlowService {
    ready: AtomicBool,
}

impl InitializingBean for SlowService {
    fn after_properties_set(&self) -> Result<(), BoxError> {
        std::thread::sleep(Duration::from_millis(20));
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl Introspectable for SlowService {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class
            .constructor(Vec::new(), |_| {
                SLOW_BUILDS.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(10));
                Ok(SlowService { ready: AtomicBool::new(false) })
            })
            .initializing()
    }
}

#[test]
fn test_racing_threads_share_one_singleton() {
    let container = Container::new();
    container.register_definition("slow", BeanDefinition::of::<SlowService>()).unwrap();

    const THREADS: usize = 16;
    let barrier = Barrier::new(THREADS);
    let before = SLOW_BUILDS.load(Ordering::SeqCst);

    let seen: Vec<Arc<SlowService>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    let service: Arc<SlowService> = container.get("slow").unwrap();
                    assert!(service.ready.load(Ordering::SeqCst), "observed a bean before its init ran");
                    service
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(SLOW_BUILDS.load(Ordering::SeqCst) - before, 1);
    assert!(seen.iter().all(|s| Arc::ptr_eq(s, &seen[0])));
}

// ===== Concurrent setter cycle =====

#[derive(Default)]
struct Ping {
    pong: Slot<Arc<Pong>>,
}

#[derive(Default)]
struct Pong {
    ping: Slot<Arc<Ping>>,
}

impl Introspectable for Ping {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class
            .default_constructor()
            .property("pong", |p: &Ping, pong: Arc<Pong>| p.pong.set(pong))
    }
}

impl Introspectable for Pong {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class
            .default_constructor()
            .property("ping", |p: &Pong, ping: Arc<Ping>| p.ping.set(ping))
    }
}

#[test]
fn test_cycle_entered_from_both_ends_concurrently() {
    for _ in 0..20 {
        let container = Container::new();
        container
            .register_definition("ping", BeanDefinition::of::<Ping>().property_ref("pong", "pong"))
            .unwrap();
        container
            .register_definition("pong", BeanDefinition::of::<Pong>().property_ref("ping", "ping"))
            .unwrap();

        let barrier = Barrier::new(2);
        let (ping, pong) = thread::scope(|s| {
            let ping = s.spawn(|_| {
                barrier.wait();
                container.get::<Ping>("ping").unwrap()
            });
            let pong = s.spawn(|_| {
                barrier.wait();
                container.get::<Pong>("pong").unwrap()
            });
            (ping.join().unwrap(), pong.join().unwrap())
        })
        .unwrap();

        let ping_of_pong = pong.ping.take().unwrap();
        let pong_of_ping = ping.pong.take().unwrap();
        assert!(Arc::ptr_eq(&ping_of_pong, &ping));
        assert!(Arc::ptr_eq(&pong_of_ping, &pong));
    }
}

// ===== Prototypes under load =====

struct Worker {
    shared: Arc<SharedCounter>,
}

#[derive(Default)]
struct SharedCounter {
    hits: AtomicUsize,
}

impl Introspectable for SharedCounter {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class.default_constructor()
    }
}

impl Introspectable for Worker {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class.constructor(vec![Param::of::<Arc<SharedCounter>>("shared")], |args| {
            let shared: Arc<SharedCounter> = args.next()?;
            shared.hits.fetch_add(1, Ordering::SeqCst);
            Ok(Worker { shared })
        })
    }
}

#[test]
fn test_prototypes_built_concurrently_share_their_singleton_dependency() {
    let container = Container::new();
    container
        .register_definition("counter", BeanDefinition::of::<SharedCounter>())
        .unwrap();
    container
        .register_definition("worker", BeanDefinition::of::<Worker>().prototype())
        .unwrap();

    const THREADS: usize = 8;
    const PER_THREAD: usize = 50;

    let workers: Vec<Arc<Worker>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    (0..PER_THREAD)
                        .map(|_| container.get::<Worker>("worker").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(workers.len(), THREADS * PER_THREAD);
    let counter: Arc<SharedCounter> = container.get("counter").unwrap();
    assert_eq!(counter.hits.load(Ordering::SeqCst), THREADS * PER_THREAD);
    assert!(workers.iter().all(|w| Arc::ptr_eq(&w.shared, &counter)));
}
