use ferrous_beans::{
    AfterInstantiation, BeanDefinition, BeforeInstantiation, BoxError, Class, ClassBuilder, ConstructorSelector, Container,
    ContainerConfig, ContainerError, ContainerObserver, Decoration, DefinitionProcessor, DisposableBean, Enumerable,
    HookContext, InitializationProcessor, InitializingBean, Instance, Introspectable, LoggingObserver, LookupExt,
    MergedDefinition, Mutable, Order, Param, Phase, PostProcessor, PropertyProcessor, PropertyValues, Slot, TypeKey,
    Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Widget {
    label: Slot<String>,
    initialized: Slot<bool>,
}

impl InitializingBean for Widget {
    fn after_properties_set(&self) -> Result<(), BoxError> {
        self.initialized.set(true);
        Ok(())
    }
}

impl Introspectable for Widget {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class
            .default_constructor()
            .property("label", |w: &Widget, label: String| w.label.set(label))
            .initializing()
    }
}

// ===== Ordering =====

struct Named(&'static str, Order);

impl PostProcessor for Named {
    fn order(&self) -> Order {
        self.1
    }

    fn name(&self) -> &str {
        self.0
    }
}

#[test]
fn test_processors_run_by_tier_then_order_then_registration() {
    let container = Container::new();
    container.add_post_processor(Arc::new(Named("plain", Order::unordered())));
    container.add_post_processor(Arc::new(Named("ordered-late", Order::ordered(50))));
    container.add_post_processor(Arc::new(Named("ordered-early", Order::ordered(-1))));
    container.add_post_processor(Arc::new(Named("first", Order::priority(0))));
    container.add_post_processor(Arc::new(Named("plain-too", Order::unordered())));

    assert_eq!(
        container.post_processor_names(),
        ["first", "AutowiredProcessor", "ordered-early", "ordered-late", "plain", "plain-too"]
    );
}

#[test]
fn test_annotation_injection_can_be_disabled() {
    let container = Container::with_config(ContainerConfig::default().with_annotation_injection(false));
    assert!(container.post_processor_names().is_empty());
}

// ===== Before instantiation =====

static GATEWAYS_BUILT: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct Gateway {
    endpoint: Slot<String>,
    connected: Slot<bool>,
}

impl InitializingBean for Gateway {
    fn after_properties_set(&self) -> Result<(), BoxError> {
        self.connected.set(true);
        Ok(())
    }
}

impl Introspectable for Gateway {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class
            .constructor(Vec::new(), |_| {
                GATEWAYS_BUILT.fetch_add(1, Ordering::SeqCst);
                Ok(Gateway::default())
            })
            .property("endpoint", |g: &Gateway, endpoint: String| g.endpoint.set(endpoint))
            .initializing()
    }
}

struct Stubber {
    seen_after_init: Mutex<Vec<String>>,
}

impl PostProcessor for Stubber {
    fn before_instantiation(&self) -> Option<&dyn BeforeInstantiation> {
        Some(self)
    }

    fn initialization(&self) -> Option<&dyn InitializationProcessor> {
        Some(self)
    }
}

impl BeforeInstantiation for Stubber {
    fn before_instantiation(&self, class: &Arc<Class>, ctx: &HookContext<'_>) -> Result<Option<Instance>, BoxError> {
        if ctx.bean_name() != "stubbed" || !class.is_assignable_to(TypeKey::of::<Gateway>()) {
            return Ok(None);
        }
        let stub = Gateway::default();
        stub.endpoint.set("stub".to_string());
        Ok(Some(Instance::new(stub)))
    }
}

impl InitializationProcessor for Stubber {
    fn after_initialization(&self, _instance: &Instance, ctx: &HookContext<'_>) -> Result<Decoration, BoxError> {
        self.seen_after_init.lock().unwrap().push(ctx.bean_name().to_string());
        Ok(Decoration::Keep)
    }
}

#[test]
fn test_before_instantiation_short_circuits_construction() {
    let stubber = Arc::new(Stubber { seen_after_init: Mutex::new(Vec::new()) });
    let container = Container::new();
    container.add_post_processor(stubber.clone());
    container
        .register_definition("stubbed", BeanDefinition::of::<Gateway>().property("endpoint", "declared"))
        .unwrap();

    let gateway: Arc<Gateway> = container.get("stubbed").unwrap();
    assert_eq!(GATEWAYS_BUILT.load(Ordering::SeqCst), 0, "constructor must not run");
    assert_eq!(gateway.endpoint.get().as_deref(), Some("stub"));
    assert!(!gateway.connected.is_set(), "init callbacks are skipped for substitutes");
    assert_eq!(*stubber.seen_after_init.lock().unwrap(), ["stubbed"]);

    let again: Arc<Gateway> = container.get("stubbed").unwrap();
    assert!(Arc::ptr_eq(&gateway, &again));
}

// ===== After instantiation =====

struct RawBeans;

impl PostProcessor for RawBeans {
    fn after_instantiation(&self) -> Option<&dyn AfterInstantiation> {
        Some(self)
    }
}

impl AfterInstantiation for RawBeans {
    fn after_instantiation(&self, _instance: &Instance, ctx: &HookContext<'_>) -> Result<bool, BoxError> {
        Ok(!ctx.bean_name().starts_with("raw-"))
    }
}

#[test]
fn test_after_instantiation_veto_skips_population() {
    let container = Container::new();
    container.add_post_processor(Arc::new(RawBeans));
    container
        .register_definition("raw-widget", BeanDefinition::of::<Widget>().property("label", "ignored"))
        .unwrap();
    container
        .register_definition("widget", BeanDefinition::of::<Widget>().property("label", "kept"))
        .unwrap();

    let raw: Arc<Widget> = container.get("raw-widget").unwrap();
    let plain: Arc<Widget> = container.get("widget").unwrap();
    assert!(!raw.label.is_set());
    assert_eq!(raw.initialized.get(), Some(true), "initialization still runs");
    assert_eq!(plain.label.get().as_deref(), Some("kept"));
}

// ===== Property processors =====

struct DefaultLabel;

impl PostProcessor for DefaultLabel {
    fn property_processor(&self) -> Option<&dyn PropertyProcessor> {
        Some(self)
    }
}

impl PropertyProcessor for DefaultLabel {
    fn process_properties(
        &self,
        mut properties: PropertyValues,
        instance: &Instance,
        ctx: &HookContext<'_>,
    ) -> Result<PropertyValues, BoxError> {
        if instance.is::<Widget>() && !properties.contains("label") {
            let source = ctx.get_object("label-source")?;
            let label = source.downcast::<String>().ok_or("label source is not a string")?;
            properties.set("label", Value::Str(label.to_string()));
        }
        Ok(properties)
    }
}

#[test]
fn test_property_processor_fills_missing_values() {
    let container = Container::new();
    container.add_post_processor(Arc::new(DefaultLabel));
    container
        .register_singleton("label-source", Instance::opaque("from-processor".to_string()))
        .unwrap();
    container.register_definition("bare", BeanDefinition::of::<Widget>()).unwrap();
    container
        .register_definition("labelled", BeanDefinition::of::<Widget>().property("label", "own"))
        .unwrap();

    let bare: Arc<Widget> = container.get("bare").unwrap();
    let labelled: Arc<Widget> = container.get("labelled").unwrap();
    assert_eq!(bare.label.get().as_deref(), Some("from-processor"));
    assert_eq!(labelled.label.get().as_deref(), Some("own"));
    assert_eq!(container.dependents_of("label-source"), ["bare"]);
}

// ===== Initialization hooks =====

struct InitProbe {
    events: Mutex<Vec<String>>,
}

impl PostProcessor for InitProbe {
    fn initialization(&self) -> Option<&dyn InitializationProcessor> {
        Some(self)
    }
}

impl InitProbe {
    fn record(&self, stage: &str, instance: &Instance) {
        let initialized = instance
            .downcast_ref::<Widget>()
            .map_or(false, |w| w.initialized.get().unwrap_or(false));
        self.events.lock().unwrap().push(format!("{stage}:{initialized}"));
    }
}

impl InitializationProcessor for InitProbe {
    fn before_initialization(&self, instance: &Instance, _ctx: &HookContext<'_>) -> Result<Decoration, BoxError> {
        self.record("before", instance);
        Ok(Decoration::Keep)
    }

    fn after_initialization(&self, instance: &Instance, _ctx: &HookContext<'_>) -> Result<Decoration, BoxError> {
        self.record("after", instance);
        Ok(Decoration::Keep)
    }
}

#[test]
fn test_initialization_hooks_bracket_init_callbacks() {
    let probe = Arc::new(InitProbe { events: Mutex::new(Vec::new()) });
    let container = Container::new();
    container.add_post_processor(probe.clone());
    container.register_definition("widget", BeanDefinition::of::<Widget>()).unwrap();

    container.get::<Widget>("widget").unwrap();
    assert_eq!(*probe.events.lock().unwrap(), ["before:false", "after:true"]);
}

#[test]
fn test_after_initialization_replacement_is_what_callers_see() {
    struct Relabel;

    impl PostProcessor for Relabel {
        fn initialization(&self) -> Option<&dyn InitializationProcessor> {
            Some(self)
        }
    }

    impl InitializationProcessor for Relabel {
        fn after_initialization(&self, _instance: &Instance, _ctx: &HookContext<'_>) -> Result<Decoration, BoxError> {
            let replacement = Widget::default();
            replacement.label.set("replacement".to_string());
            Ok(Decoration::Replace(Instance::new(replacement)))
        }
    }

    let container = Container::new();
    container.add_post_processor(Arc::new(Relabel));
    container.register_definition("widget", BeanDefinition::of::<Widget>()).unwrap();

    let first: Arc<Widget> = container.get("widget").unwrap();
    let second: Arc<Widget> = container.get("widget").unwrap();
    assert_eq!(first.label.get().as_deref(), Some("replacement"));
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_failing_hook_reports_post_processing_phase() {
    struct Refuse;

    impl PostProcessor for Refuse {
        fn initialization(&self) -> Option<&dyn InitializationProcessor> {
            Some(self)
        }
    }

    impl InitializationProcessor for Refuse {
        fn before_initialization(&self, _instance: &Instance, _ctx: &HookContext<'_>) -> Result<Decoration, BoxError> {
            Err("not today".into())
        }
    }

    let container = Container::new();
    container.add_post_processor(Arc::new(Refuse));
    container.register_definition("widget", BeanDefinition::of::<Widget>()).unwrap();

    match container.get::<Widget>("widget") {
        Err(ContainerError::ConstructionFailed { bean, phase, source }) => {
            assert_eq!(bean, "widget");
            assert_eq!(phase, Phase::PostProcessing);
            assert_eq!(source.to_string(), "not today");
        }
        other => panic!("expected a post-processing failure, got {:?}", other.err()),
    }
}

// ===== Definition processors =====

struct CountDefinitions {
    seen: Mutex<Vec<String>>,
}

impl PostProcessor for CountDefinitions {
    fn definition_processor(&self) -> Option<&dyn DefinitionProcessor> {
        Some(self)
    }
}

impl DefinitionProcessor for CountDefinitions {
    fn process_definition(&self, definition: &MergedDefinition, class: &Arc<Class>) -> Result<(), BoxError> {
        self.seen
            .lock()
            .unwrap()
            .push(format!("{}:{}", definition.name(), class.name().rsplit("::").next().unwrap_or_default()));
        Ok(())
    }
}

#[test]
fn test_definition_processor_runs_once_per_blueprint() {
    let counter = Arc::new(CountDefinitions { seen: Mutex::new(Vec::new()) });
    let container = Container::new();
    container.add_post_processor(counter.clone());
    container
        .register_definition("job", BeanDefinition::of::<Widget>().prototype())
        .unwrap();

    for _ in 0..3 {
        container.get::<Widget>("job").unwrap();
    }
    assert_eq!(*counter.seen.lock().unwrap(), ["job:Widget"]);
}

// ===== Constructor selection =====

struct Gadget {
    source: &'static str,
}

impl Introspectable for Gadget {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class
            .constructor(Vec::new(), |_| Ok(Gadget { source: "default" }))
            .constructor(vec![Param::of::<Arc<Widget>>("widget")], |args| {
                let _widget: Arc<Widget> = args.next()?;
                Ok(Gadget { source: "widget" })
            })
    }
}

struct PreferInjection;

impl PostProcessor for PreferInjection {
    fn constructor_selector(&self) -> Option<&dyn ConstructorSelector> {
        Some(self)
    }
}

impl ConstructorSelector for PreferInjection {
    fn candidate_constructors(&self, class: &Class, _bean_name: &str) -> Option<Vec<usize>> {
        let index = class.constructors().iter().position(|c| !c.params().is_empty())?;
        Some(vec![index])
    }
}

#[test]
fn test_constructor_selector_overrides_default_constructor() {
    let container = Container::new();
    container.register_definition("widget", BeanDefinition::of::<Widget>()).unwrap();
    container.register_definition("gadget", BeanDefinition::of::<Gadget>()).unwrap();
    assert_eq!(container.get::<Gadget>("gadget").unwrap().source, "default");

    let selecting = Container::new();
    selecting.add_post_processor(Arc::new(PreferInjection));
    selecting.register_definition("widget", BeanDefinition::of::<Widget>()).unwrap();
    selecting.register_definition("gadget", BeanDefinition::of::<Gadget>()).unwrap();
    assert_eq!(selecting.get::<Gadget>("gadget").unwrap().source, "widget");
    assert_eq!(selecting.dependencies_of("gadget"), ["widget"]);
}

// ===== Observers =====

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ContainerObserver for Recorder {
    fn creating(&self, bean: &str) {
        self.events.lock().unwrap().push(format!("creating {bean}"));
    }

    fn created(&self, bean: &str, _elapsed: Duration) {
        self.events.lock().unwrap().push(format!("created {bean}"));
    }

    fn creation_failed(&self, bean: &str, _error: &ContainerError) {
        self.events.lock().unwrap().push(format!("failed {bean}"));
    }

    fn destroyed(&self, bean: &str) {
        self.events.lock().unwrap().push(format!("destroyed {bean}"));
    }
}

#[derive(Default)]
struct Closable;

impl DisposableBean for Closable {
    fn destroy(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl Introspectable for Closable {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class.default_constructor().disposable()
    }
}

struct Unbuildable;

impl Introspectable for Unbuildable {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class.constructor(Vec::new(), |_| Err("missing credentials".into()))
    }
}

#[test]
fn test_observers_see_the_whole_lifecycle() {
    let recorder = Arc::new(Recorder::default());
    let container = Container::builder()
        .observer(recorder.clone())
        .observer(Arc::new(LoggingObserver::with_prefix("observed")))
        .definition("closable", BeanDefinition::of::<Closable>())
        .definition("plain", BeanDefinition::of::<Widget>())
        .definition("broken", BeanDefinition::of::<Unbuildable>().lazy())
        .refresh()
        .unwrap();

    assert!(container.get::<Unbuildable>("broken").is_err());
    container.destroy_all();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        [
            "creating closable",
            "created closable",
            "creating plain",
            "created plain",
            "creating broken",
            "failed broken",
            "destroyed closable",
        ]
    );
}

#[test]
fn test_builder_attaches_processors_before_registrations() {
    let probe = Arc::new(InitProbe { events: Mutex::new(Vec::new()) });
    let container = Container::builder()
        .definition("widget", BeanDefinition::of::<Widget>())
        .post_processor(probe.clone())
        .refresh()
        .unwrap();

    assert!(container.post_processor_names().iter().any(|n| n.contains("InitProbe")));
    assert_eq!(probe.events.lock().unwrap().len(), 2);
}
