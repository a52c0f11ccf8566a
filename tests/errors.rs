/// Error reporting tests
///
/// Failures deep in a construction surface at the outermost call with the
/// bean and phase that actually failed.
use ferrous_beans::{
    BeanDefinition, BoxError, ClassBuilder, Container, ContainerError, Introspectable, Lookup, LookupExt, Mutable,
    Param, Phase, Slot,
};
use std::error::Error;
use std::sync::Arc;

#[derive(Default)]
struct Leaf;

impl Introspectable for Leaf {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class.constructor(Vec::new(), |_| Err("leaf exploded".into()))
    }
}

struct Branch {
    _leaf: Arc<Leaf>,
}

impl Introspectable for Branch {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class.constructor(vec![Param::of::<Arc<Leaf>>("leaf")], |args| Ok(Branch { _leaf: args.next()? }))
    }
}

struct Trunk {
    _branch: Arc<Branch>,
}

impl Introspectable for Trunk {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class.constructor(vec![Param::of::<Arc<Branch>>("branch")], |args| Ok(Trunk { _branch: args.next()? }))
    }
}

#[test]
fn test_innermost_failure_surfaces_unchanged() {
    let container = Container::new();
    container.register_definition("trunk", BeanDefinition::of::<Trunk>()).unwrap();
    container.register_definition("branch", BeanDefinition::of::<Branch>()).unwrap();
    container.register_definition("leaf", BeanDefinition::of::<Leaf>()).unwrap();

    let error = container.get_object("trunk").unwrap_err();
    assert_eq!(error.to_string(), "bean 'leaf' failed during instantiation: leaf exploded");
    assert_eq!(error.source().map(|s| s.to_string()).as_deref(), Some("leaf exploded"));
}

#[test]
fn test_container_error_from_user_code_keeps_its_identity() {
    let container = Container::new();
    container
        .register_definition(
            "relay",
            BeanDefinition::supplied::<Leaf, _>(|| {
                Err::<Leaf, BoxError>(Box::new(ContainerError::NoSuchDefinition("upstream".into())))
            }),
        )
        .unwrap();

    assert!(matches!(
        container.get_object("relay"),
        Err(ContainerError::NoSuchDefinition(name)) if name == "upstream"
    ));
}

#[derive(Debug, Default)]
struct Port {
    number: Slot<u16>,
}

impl Introspectable for Port {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class.default_constructor().try_property("number", |p: &Port, number: u16| {
            if number < 1024 {
                return Err(format!("port {number} is privileged").into());
            }
            p.number.set(number);
            Ok(())
        })
    }
}

#[test]
fn test_setter_failure_reports_population_phase() {
    let container = Container::new();
    container
        .register_definition("port", BeanDefinition::of::<Port>().property("number", 80))
        .unwrap();

    match container.get_object("port") {
        Err(ContainerError::ConstructionFailed { bean, phase, source }) => {
            assert_eq!(bean, "port");
            assert_eq!(phase, Phase::Population);
            assert_eq!(source.to_string(), "port 80 is privileged");
        }
        other => panic!("expected a population failure, got {:?}", other.err()),
    }
}

#[test]
fn test_out_of_range_literal_is_a_population_failure() {
    let container = Container::new();
    container
        .register_definition("port", BeanDefinition::of::<Port>().property("number", 70_000))
        .unwrap();

    let error = container.get_object("port").unwrap_err();
    assert_eq!(
        error.to_string(),
        "bean 'port' failed during property population: cannot convert integer 70000 into u16"
    );
}

#[test]
fn test_messages_name_the_beans_involved() {
    let container = Container::new();
    container.register_definition("one", BeanDefinition::of::<Port>()).unwrap();
    container.register_definition("two", BeanDefinition::of::<Port>()).unwrap();

    let missing = container.get_object("three").unwrap_err();
    assert_eq!(missing.to_string(), "no bean definition found for 'three'");

    let ambiguous = container.get_by_type::<Port>().unwrap_err();
    let message = ambiguous.to_string();
    assert!(message.starts_with("expected a single bean of type "), "{message}");
    assert!(message.ends_with("but found 2: one, two"), "{message}");

    let unsatisfied = ContainerError::UnsatisfiedDependency {
        bean: "trunk".into(),
        injection_point: "branch".into(),
        reason: "no bean of type Branch".into(),
    };
    assert_eq!(
        unsatisfied.to_string(),
        "unsatisfied dependency 'branch' of bean 'trunk': no bean of type Branch"
    );
}

#[test]
fn test_registration_after_freeze_is_rejected() {
    let container = Container::new();
    container.register_definition("port", BeanDefinition::of::<Port>()).unwrap();
    container.get_object("port").unwrap();

    let error = container.register_definition("late", BeanDefinition::of::<Port>()).unwrap_err();
    assert!(matches!(&error, ContainerError::DefinitionFrozen(name) if name == "late"));
    assert_eq!(error.to_string(), "definition store is frozen, cannot register 'late'");
}
