use ferrous_beans::{
    BeanDefinition, BoxError, ClassBuilder, Container, ContainerConfig, ContainerError, Decorate, Decoration,
    DecoratingProcessor, Enumerable, HookContext, InitializationProcessor, Instance, Introspectable, LookupExt, Mutable,
    Param, PostProcessor, Slot,
};
use std::sync::Arc;

/// Identity comparison that ignores trait-object metadata.
fn same<T: ?Sized, U: ?Sized>(a: &Arc<T>, b: &Arc<U>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

// ===== Setter cycle =====

trait Service: Send + Sync {
    fn name(&self) -> String;
}

#[derive(Default)]
struct Left {
    right: Slot<Arc<dyn Service>>,
}

#[derive(Default)]
struct Right {
    left: Slot<Arc<dyn Service>>,
}

impl Service for Left {
    fn name(&self) -> String {
        "left".to_string()
    }
}

impl Service for Right {
    fn name(&self) -> String {
        "right".to_string()
    }
}

impl Introspectable for Left {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class
            .implements::<dyn Service>(|left| left as Arc<dyn Service>)
            .default_constructor()
            .property("right", |l: &Left, r: Arc<dyn Service>| l.right.set(r))
    }
}

impl Introspectable for Right {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class
            .implements::<dyn Service>(|right| right as Arc<dyn Service>)
            .default_constructor()
            .property("left", |r: &Right, l: Arc<dyn Service>| r.left.set(l))
    }
}

fn setter_cycle(container: &Container) {
    container
        .register_definition("left", BeanDefinition::of::<Left>().property_ref("right", "right"))
        .unwrap();
    container
        .register_definition("right", BeanDefinition::of::<Right>().property_ref("left", "left"))
        .unwrap();
}

/// Wraps every service so its name gains a prefix.
struct Traced(Arc<dyn Service>);

impl Service for Traced {
    fn name(&self) -> String {
        format!("traced-{}", self.0.name())
    }
}

impl Introspectable for Traced {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class.implements::<dyn Service>(|traced| traced as Arc<dyn Service>)
    }
}

/// Wraps after initialization only, ignoring early references.
struct LateWrapper;

impl PostProcessor for LateWrapper {
    fn initialization(&self) -> Option<&dyn InitializationProcessor> {
        Some(self)
    }
}

impl InitializationProcessor for LateWrapper {
    fn after_initialization(&self, instance: &Instance, ctx: &HookContext<'_>) -> Result<Decoration, BoxError> {
        if ctx.bean_name() != "left" {
            return Ok(Decoration::Keep);
        }
        let service = instance.get::<dyn Service>().ok_or("not a service")?;
        Ok(Decoration::Replace(Instance::new(Traced(service))))
    }
}

#[test]
fn test_setter_cycle_resolves_with_shared_identity() {
    let container = Container::new();
    setter_cycle(&container);

    let left: Arc<Left> = container.get("left").unwrap();
    let right: Arc<Right> = container.get("right").unwrap();

    let left_seen_by_right = right.left.get().unwrap();
    let right_seen_by_left = left.right.get().unwrap();
    assert_eq!(left_seen_by_right.name(), "left");
    assert_eq!(right_seen_by_left.name(), "right");

    let left_view: Arc<dyn Service> = container.get("left").unwrap();
    assert!(same(&left_seen_by_right, &left_view));
    assert!(same(&left_seen_by_right, &left));

    left.right.take();
    right.left.take();
}

#[test]
fn test_setter_cycle_rejected_when_circular_references_disabled() {
    let container = Container::with_config(ContainerConfig::default().with_circular_references(false));
    setter_cycle(&container);

    match container.get::<Left>("left") {
        Err(ContainerError::CircularCreation { bean, path }) => {
            assert_eq!(bean, "left");
            assert_eq!(path, ["left", "right", "left"]);
        }
        other => panic!("expected a circular creation error, got {:?}", other.err()),
    }
}

#[test]
fn test_failed_cycle_leaves_no_partial_singletons() {
    let container = Container::with_config(ContainerConfig::default().with_circular_references(false));
    setter_cycle(&container);

    assert!(container.get::<Left>("left").is_err());
    assert!(container.get::<Right>("right").is_err());
    assert!(container.describe().iter().all(|d| !d.instantiated));
}

#[test]
fn test_wrapping_after_early_exposure_is_a_leak() {
    let container = Container::new();
    container.add_post_processor(Arc::new(LateWrapper));
    setter_cycle(&container);

    match container.get::<dyn Service>("left") {
        Err(ContainerError::WrappedReferenceLeak { bean, dependents }) => {
            assert_eq!(bean, "left");
            assert_eq!(dependents, ["right"]);
        }
        other => panic!("expected a wrapped reference leak, got {:?}", other.err().map(|e| e.to_string())),
    }
}

#[test]
fn test_raw_injection_can_be_allowed() {
    let container =
        Container::with_config(ContainerConfig::default().with_raw_injection_despite_wrapping(true));
    container.add_post_processor(Arc::new(LateWrapper));
    setter_cycle(&container);

    let left: Arc<dyn Service> = container.get("left").unwrap();
    assert_eq!(left.name(), "traced-left");

    // Right kept the raw reference.
    let right: Arc<Right> = container.get("right").unwrap();
    assert_eq!(right.left.get().unwrap().name(), "left");
    right.left.take();
}

#[test]
fn test_decorated_early_reference_is_final_identity() {
    struct DecorateLeft;

    impl Decorate for DecorateLeft {
        fn applies_to(&self, _instance: &Instance, bean_name: &str) -> bool {
            bean_name == "left"
        }

        fn decorate(&self, original: Instance, _bean_name: &str) -> Result<Instance, BoxError> {
            let service = original.get::<dyn Service>().ok_or("not a service")?;
            Ok(Instance::new(Traced(service)))
        }
    }

    let container = Container::new();
    container.add_post_processor(Arc::new(DecoratingProcessor::new(DecorateLeft)));
    setter_cycle(&container);

    let left: Arc<dyn Service> = container.get("left").unwrap();
    assert_eq!(left.name(), "traced-left");

    let right: Arc<Right> = container.get("right").unwrap();
    let injected = right.left.get().unwrap();
    assert!(same(&injected, &left));
    right.left.take();
}

// ===== Constructor cycle =====

struct Egg {
    _chicken: Arc<Chicken>,
}

struct Chicken {
    _egg: Arc<Egg>,
}

impl Introspectable for Egg {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class.constructor(vec![Param::of::<Arc<Chicken>>("chicken")], |args| {
            Ok(Egg { _chicken: args.next()? })
        })
    }
}

impl Introspectable for Chicken {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class.constructor(vec![Param::of::<Arc<Egg>>("egg")], |args| {
            Ok(Chicken { _egg: args.next()? })
        })
    }
}

#[test]
fn test_constructor_cycle_reports_path() {
    let container = Container::new();
    container.register_definition("egg", BeanDefinition::of::<Egg>()).unwrap();
    container.register_definition("chicken", BeanDefinition::of::<Chicken>()).unwrap();

    match container.get::<Egg>("egg") {
        Err(ContainerError::CircularCreation { bean, path }) => {
            assert_eq!(bean, "egg");
            assert_eq!(path, ["egg", "chicken", "egg"]);
        }
        other => panic!("expected a circular creation error, got {:?}", other.err()),
    }

    // Nothing half-built is left behind.
    assert!(matches!(
        container.get::<Chicken>("chicken"),
        Err(ContainerError::CircularCreation { .. })
    ));
}

#[test]
fn test_prototype_cycle_detected() {
    let container = Container::new();
    container.register_definition("egg", BeanDefinition::of::<Egg>().prototype()).unwrap();
    container
        .register_definition("chicken", BeanDefinition::of::<Chicken>().prototype())
        .unwrap();

    match container.get::<Chicken>("chicken") {
        Err(ContainerError::CircularCreation { bean, path }) => {
            assert_eq!(bean, "chicken");
            assert_eq!(path, ["chicken", "egg", "chicken"]);
        }
        other => panic!("expected a circular creation error, got {:?}", other.err()),
    }
}

// ===== depends-on =====

#[derive(Default)]
struct Marker;

impl Introspectable for Marker {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class.default_constructor()
    }
}

#[test]
fn test_circular_depends_on() {
    let container = Container::new();
    container
        .register_definition("a", BeanDefinition::of::<Marker>().depends_on("b"))
        .unwrap();
    container
        .register_definition("b", BeanDefinition::of::<Marker>().depends_on("a"))
        .unwrap();

    assert!(matches!(
        container.get::<Marker>("a"),
        Err(ContainerError::CircularCreation { .. })
    ));
}

#[test]
fn test_self_reference_through_property() {
    #[derive(Default)]
    struct Narcissus {
        me: Slot<Arc<Narcissus>>,
    }

    impl Introspectable for Narcissus {
        fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
            class
                .default_constructor()
                .property("me", |n: &Narcissus, me: Arc<Narcissus>| n.me.set(me))
        }
    }

    let container = Container::new();
    container
        .register_definition("narcissus", BeanDefinition::of::<Narcissus>().property_ref("me", "narcissus"))
        .unwrap();

    let narcissus: Arc<Narcissus> = container.get("narcissus").unwrap();
    let me = narcissus.me.take().unwrap();
    assert!(Arc::ptr_eq(&narcissus, &me));
}
