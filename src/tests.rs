use crate::{
    Container, DependencyId, DynSvc, InjectError, Instance, LazyCall,
    LazyCallProvider, ProvideResult, Provider, ResourceGetter,
    ResourceProvider, Svc, Tag, TagProvider, Tagged, TaggedDependencies,
};
use std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Barrier,
    },
    thread,
    time::Duration,
};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds each dependency from the dependencies listed for it, counting how
/// many times each one is built.
#[derive(Debug, Default)]
struct Graph {
    edges: HashMap<&'static str, Vec<&'static str>>,
    calls: AtomicUsize,
    singleton: bool,
}

impl Graph {
    fn new(
        edges: impl IntoIterator<Item = (&'static str, Vec<&'static str>)>,
    ) -> Self {
        Graph {
            edges: edges.into_iter().collect(),
            calls: AtomicUsize::new(0),
            singleton: true,
        }
    }

    fn transient(mut self) -> Self {
        self.singleton = false;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Provider for Graph {
    fn resolve(
        &self,
        id: &DependencyId,
        container: &Container,
    ) -> ProvideResult {
        let Some(deps) = id.as_str().and_then(|name| self.edges.get(name))
        else {
            return Ok(None);
        };

        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut value = id.as_str().unwrap_or_default().to_owned();
        for dep in deps {
            let dep: Svc<String> = container.get(*dep)?;
            value.push('(');
            value.push_str(&dep);
            value.push(')');
        }

        Ok(Some(Instance::new(Svc::new(value), self.singleton)))
    }
}

#[test]
fn singletons_are_resolved_once() {
    init_logging();

    let container = Container::new();
    container.register_provider(Graph::new([("a", vec!["b"]), ("b", vec![])]));
    let graph = container.provider::<Graph>().unwrap();

    let first: Svc<String> = container.get("a").unwrap();
    let second: Svc<String> = container.get("a").unwrap();
    assert_eq!("a(b)", first.as_str());
    assert!(Svc::ptr_eq(&first, &second));
    assert_eq!(2, graph.calls());
    assert!(container.contains_singleton("b"));
}

#[test]
fn transients_are_resolved_every_time() {
    let container = Container::new();
    container.register_provider(Graph::new([("a", vec![])]).transient());
    let graph = container.provider::<Graph>().unwrap();

    let first: Svc<String> = container.get("a").unwrap();
    let second: Svc<String> = container.get("a").unwrap();
    assert!(!Svc::ptr_eq(&first, &second));
    assert_eq!(2, graph.calls());
    assert!(container.singletons().is_empty());
}

#[test]
fn self_dependency_is_a_cycle() {
    let container = Container::new();
    container.register_provider(Graph::new([("a", vec!["a"])]));

    match container.provide("a") {
        Err(InjectError::CycleDetected { id, cycle }) => {
            assert_eq!("a", id);
            assert_eq!(
                vec![DependencyId::from("a"), DependencyId::from("a")],
                cycle
            );
        }
        Err(error) => Err(error).unwrap(),
        Ok(_) => panic!("cyclic dependency was resolved"),
    }
}

#[test]
fn indirect_cycle_reports_the_path() {
    init_logging();

    let container = Container::new();
    container.register_provider(Graph::new([
        ("a", vec!["b"]),
        ("b", vec!["a"]),
        ("c", vec![]),
    ]));

    match container.provide("a") {
        Err(InjectError::CycleDetected { id, cycle }) => {
            assert_eq!("a", id);
            let cycle: Vec<_> =
                cycle.iter().filter_map(DependencyId::as_str).collect();
            assert_eq!(vec!["a", "b", "a"], cycle);
        }
        Err(error) => Err(error).unwrap(),
        Ok(_) => panic!("cyclic dependency was resolved"),
    }

    // The failed resolution left nothing behind
    assert!(container.singletons().is_empty());
    let c: Svc<String> = container.get("c").unwrap();
    assert_eq!("c", c.as_str());
    assert!(matches!(
        container.provide("b"),
        Err(InjectError::CycleDetected { .. })
    ));
}

#[test]
fn missing_dependency() {
    let container = Container::new();
    container.register_provider(Graph::new([("a", vec![])]));

    match container.provide("x") {
        Err(InjectError::MissingProvider { id }) => assert_eq!("x", id),
        Err(error) => Err(error).unwrap(),
        Ok(_) => panic!("unknown dependency was resolved"),
    }
}

#[test]
fn resolution_depends_on_provider_order() {
    let first = Svc::new(Graph::new([("a", vec![])])) as Svc<dyn Provider>;

    let mut builder = Container::builder();
    builder.add_provider(first.clone());
    builder.provide(Graph::new([("a", vec!["b"])]));
    let container = builder.build();
    assert_eq!("a", container.get::<String>("a").unwrap().as_str());

    let container = Container::new();
    container.register_provider(Graph::new([("a", vec!["b"]), ("b", vec![])]));
    container.add_provider(first);
    assert_eq!("a(b)", container.get::<String>("a").unwrap().as_str());
}

#[test]
fn builder_seeds_the_cache() {
    let mut builder = Container::builder();
    builder.provide(Graph::new([("a", vec!["b"])]));
    builder.singleton("b", String::from("seeded"));
    let container = builder.build();

    assert_eq!("a(seeded)", container.get::<String>("a").unwrap().as_str());
}

#[test]
fn resources_fall_back_by_priority() {
    let overrides = HashMap::from([("port", 8080i64)]);
    let defaults = HashMap::from([("port", 80i64), ("timeout", 30i64)]);

    let resources = ResourceProvider::new();
    resources
        .register(
            "conf",
            ResourceGetter::new(move |name| overrides.get(name).copied())
                .with_priority(10.0),
        )
        .unwrap();
    resources
        .register(
            "conf",
            ResourceGetter::new(move |name| defaults.get(name).copied()),
        )
        .unwrap();

    match resources.register(
        "conf",
        ResourceGetter::new(|_| Some(0i64)).with_priority(10.0),
    ) {
        Err(InjectError::GetterPriorityConflict { .. }) => {}
        Err(error) => Err(error).unwrap(),
        Ok(()) => panic!("conflicting getter was registered"),
    }

    let container = Container::new();
    container.register_provider(resources);

    assert_eq!(8080, *container.get::<i64>("conf:port").unwrap());
    assert_eq!(30, *container.get::<i64>("conf:timeout").unwrap());
    assert!(container.try_get::<i64>("conf:missing").unwrap().is_none());
    assert!(container.try_get::<i64>("other:port").unwrap().is_none());
}

#[test]
fn lazy_calls_use_resources() {
    let resources = ResourceProvider::new();
    resources
        .register(
            "conf",
            ResourceGetter::new(|name| (name == "host").then_some("localhost")),
        )
        .unwrap();

    let container = Container::new();
    container.register_provider(resources);
    container.register_provider(LazyCallProvider);

    let url = LazyCall::new(|container: &Container| {
        let host: Svc<&str> = container.get("conf:host")?;
        Ok(format!("http://{}/", host))
    });
    assert_eq!(
        "http://localhost/",
        container.get::<String>(url).unwrap().as_str()
    );
    assert!(container.contains_singleton("conf:host"));
}

#[test]
fn tagged_dependencies_are_grouped() {
    let tags = TagProvider::new();
    tags.register_dependency("a", Tag::new("plugin").with_attr("order", "1"))
        .unwrap();
    tags.register("b", ["plugin", "other"]).unwrap();

    let container = Container::new();
    container.register_provider(tags);
    container.register_provider(Graph::new([("a", vec![]), ("b", vec!["a"])]));
    let graph = container.provider::<Graph>().unwrap();

    let plugins: Svc<TaggedDependencies> =
        container.get(Tagged::new("plugin")).unwrap();
    let others: Svc<TaggedDependencies> =
        container.get(Tagged::new("other")).unwrap();
    assert_eq!((2, 1), (plugins.len(), others.len()));
    assert_eq!(0, graph.calls());

    let values: Vec<String> = plugins
        .instances()
        .map(|value| value.unwrap().downcast_ref::<String>().unwrap().clone())
        .collect();
    assert_eq!(vec!["a", "b(a)"], values);
    assert_eq!(2, graph.calls());

    // The singletons are shared with other views
    let b = others.get(0).unwrap().unwrap();
    let cached: DynSvc = container.provide("b").unwrap();
    assert!(Svc::ptr_eq(&b, &cached));
    assert_eq!(2, graph.calls());
}

#[test]
fn tag_views_are_resolved_at_most_once() {
    let tags = TagProvider::new();
    tags.register_dependency("a", "t").unwrap();

    let container = Container::new();
    container.register_provider(tags);
    container.register_provider(Graph::new([("a", vec![])]).transient());
    let graph = container.provider::<Graph>().unwrap();

    let view: Svc<TaggedDependencies> =
        container.get(Tagged::new("t")).unwrap();
    for _ in 0..3 {
        assert_eq!(1, view.instances().count());
    }
    assert_eq!(1, graph.calls());
}

#[test]
fn concurrent_requests_resolve_once() {
    const THREADS: usize = 8;

    #[derive(Debug, Default)]
    struct Slow(AtomicUsize);

    impl Provider for Slow {
        fn resolve(
            &self,
            id: &DependencyId,
            _container: &Container,
        ) -> ProvideResult {
            if id != "slow" {
                return Ok(None);
            }

            self.0.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(Some(Instance::singleton(String::from("done"))))
        }
    }

    init_logging();

    let container = Container::new();
    container.register_provider(Slow::default());
    let barrier = Barrier::new(THREADS);

    let values: Vec<Svc<String>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    container.get::<String>("slow").unwrap()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let slow = container.provider::<Slow>().unwrap();
    assert_eq!(1, slow.0.load(Ordering::SeqCst));
    assert!(values.iter().all(|value| Svc::ptr_eq(value, &values[0])));
}

#[test]
fn concurrent_tag_views_share_values() {
    const THREADS: usize = 4;

    let tags = TagProvider::new();
    tags.register_dependency("a", "t").unwrap();
    tags.register_dependency("b", "t").unwrap();

    let container = Container::new();
    container.register_provider(tags);
    container.register_provider(Graph::new([("a", vec![]), ("b", vec![])]));
    let view: Svc<TaggedDependencies> =
        container.get(Tagged::new("t")).unwrap();
    let barrier = Barrier::new(THREADS);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                barrier.wait();
                assert_eq!(2, view.instances().filter(Result::is_ok).count());
            });
        }
    });

    assert_eq!(2, container.provider::<Graph>().unwrap().calls());
}

#[test]
fn panicking_provider_unwinds_the_stack() {
    #[derive(Debug)]
    struct Panics;

    impl Provider for Panics {
        fn resolve(
            &self,
            id: &DependencyId,
            _container: &Container,
        ) -> ProvideResult {
            if id == "boom" {
                panic!("provider panicked");
            }

            Ok(None)
        }
    }

    let container = Container::new();
    container.register_provider(Panics);
    container.register_provider(Graph::new([("a", vec!["boom"])]));

    let result = catch_unwind(AssertUnwindSafe(|| container.provide("a")));
    assert!(result.is_err());

    // Neither "a" nor "boom" is still marked as being resolved
    container.set("boom", String::from("fixed"));
    assert_eq!("a(fixed)", container.get::<String>("a").unwrap().as_str());
}

#[test]
fn proxies_share_providers_but_not_the_cache() {
    let container = Container::new();
    container.register_provider(Graph::new([("a", vec!["b"]), ("b", vec![])]));
    container.set("b", String::from("parent"));

    let proxy = container.proxy().exclude(["b"]).build();
    assert_eq!("a(b)", proxy.get::<String>("a").unwrap().as_str());
    assert!(!container.contains_singleton("a"));
    assert_eq!("parent", container.get::<String>("b").unwrap().as_str());
}
