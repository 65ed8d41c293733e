use snapshot_di::{
    key_of_trait, key_of_type, AnyArc, DiError, Lifetime, Resolver, ServiceCollection,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_concrete_singleton() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(42usize).unwrap();
    sc.add_singleton("hello".to_string()).unwrap();

    let sp = sc.build().unwrap();

    let num1 = sp.get_required::<usize>();
    let num2 = sp.get_required::<usize>();
    let str1 = sp.get_required::<String>();
    let str2 = sp.get_required::<String>();

    assert_eq!(*num1, 42);
    assert_eq!(*str1, "hello");
    assert!(Arc::ptr_eq(&num1, &num2));
    assert!(Arc::ptr_eq(&str1, &str2));
}

#[test]
fn test_factory_with_dependencies() {
    struct Config {
        port: u16,
    }

    struct Server {
        config: Arc<Config>,
        name: String,
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton(Config { port: 8080 }).unwrap();
    sc.add_singleton_factory::<Server, _>(|r| Server {
        config: r.get_required::<Config>(),
        name: "MyServer".to_string(),
    })
    .unwrap();

    let sp = sc.build().unwrap();
    let server = sp.get_required::<Server>();

    assert_eq!(server.config.port, 8080);
    assert_eq!(server.name, "MyServer");
    assert!(Arc::ptr_eq(&server.config, &sp.get_required::<Config>()));
}

#[test]
fn test_transient_creates_new_instances() {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();

    let mut sc = ServiceCollection::new();
    sc.add_transient_factory::<String, _>(move |_| {
        let n = counter_clone.fetch_add(1, Ordering::SeqCst) + 1;
        format!("instance-{}", n)
    })
    .unwrap();

    let sp = sc.build().unwrap();
    let first = sp.get_required::<String>();
    let second = sp.get_required::<String>();

    assert_eq!(*first, "instance-1");
    assert_eq!(*second, "instance-2");
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_singleton_identity_over_many_reads() {
    struct Heavy;

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Heavy, _>(|_| Heavy).unwrap();
    let sp = sc.build().unwrap();

    let first = sp.get_required::<Heavy>();
    for _ in 0..1000 {
        assert!(Arc::ptr_eq(&first, &sp.get_required::<Heavy>()));
    }
}

#[test]
fn test_nested_singleton_is_the_cached_instance() {
    struct Clock;
    struct Scheduler {
        clock: Arc<Clock>,
    }
    struct Reporter {
        clock: Arc<Clock>,
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Clock, _>(|_| Clock)
        .unwrap()
        .add_singleton_factory::<Scheduler, _>(|r| Scheduler {
            clock: r.get_required::<Clock>(),
        })
        .unwrap()
        .add_transient_factory::<Reporter, _>(|r| Reporter {
            clock: r.get_required::<Clock>(),
        })
        .unwrap();

    let sp = sc.build().unwrap();
    let scheduler = sp.get_required::<Scheduler>();
    let reporter = sp.get_required::<Reporter>();

    assert!(Arc::ptr_eq(&scheduler.clock, &reporter.clock));
    assert!(Arc::ptr_eq(&scheduler.clock, &sp.get_required::<Clock>()));
}

#[test]
fn test_trait_bindings() {
    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton_trait::<dyn Greeter>(Arc::new(English)).unwrap();
    let sp = sc.build().unwrap();

    let a = sp.get_required_trait::<dyn Greeter>();
    let b = sp.get_required_trait::<dyn Greeter>();
    assert_eq!(a.greet(), "hello");
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_transient_trait_factory() {
    trait Counter: Send + Sync {
        fn id(&self) -> usize;
    }

    struct Numbered(usize);
    impl Counter for Numbered {
        fn id(&self) -> usize {
            self.0
        }
    }

    let next = Arc::new(AtomicUsize::new(0));
    let next_clone = next.clone();

    let mut sc = ServiceCollection::new();
    sc.add_transient_trait_factory::<dyn Counter, _>(move |_| {
        Arc::new(Numbered(next_clone.fetch_add(1, Ordering::SeqCst))) as Arc<dyn Counter>
    })
    .unwrap();
    let sp = sc.build().unwrap();

    assert_eq!(sp.get_required_trait::<dyn Counter>().id(), 0);
    assert_eq!(sp.get_required_trait::<dyn Counter>().id(), 1);
}

#[test]
fn test_missing_service_is_not_found() {
    struct Unregistered;
    trait Missing: Send + Sync {}

    let sp = ServiceCollection::new().build().unwrap();

    assert!(matches!(sp.get::<Unregistered>(), Err(DiError::NotFound(_))));
    assert!(matches!(sp.get_trait::<dyn Missing>(), Err(DiError::NotFound(_))));
}

#[test]
fn test_raw_register_and_resolve() {
    let mut sc = ServiceCollection::new();
    sc.register(key_of_type::<u32>(), Lifetime::Singleton, |_| Ok(Arc::new(7u32) as AnyArc))
        .unwrap();
    let sp = sc.build().unwrap();

    let any = sp.resolve(&key_of_type::<u32>()).unwrap();
    assert_eq!(*any.downcast::<u32>().unwrap(), 7);
}

#[test]
fn test_registration_after_freeze_is_rejected() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(1u8).unwrap();
    let registry = sc.freeze().unwrap();

    let err = sc.add_singleton(2u8).unwrap_err();
    assert!(matches!(err, DiError::ConfigurationClosed(_)));
    assert!(matches!(
        sc.register(key_of_type::<u16>(), Lifetime::Transient, |_| Ok(Arc::new(0u16) as AnyArc)),
        Err(DiError::ConfigurationClosed(_))
    ));

    // The frozen registry is unaffected by the rejected calls
    assert_eq!(*registry.build_provider().get_required::<u8>(), 1);
    assert!(!registry.contains(&key_of_type::<u16>()));
}

#[test]
fn test_descriptors_list_registrations_in_order() {
    trait Sink: Send + Sync {}
    struct Null;
    impl Sink for Null {}

    let mut sc = ServiceCollection::new();
    sc.add_singleton(1u32)
        .unwrap()
        .add_transient_factory::<String, _>(|_| String::new())
        .unwrap()
        .add_singleton_trait::<dyn Sink>(Arc::new(Null))
        .unwrap();

    let descriptors = sc.service_descriptors();
    assert_eq!(descriptors.len(), 3);
    assert_eq!(descriptors[0].lifetime, Lifetime::Singleton);
    assert_eq!(descriptors[1].lifetime, Lifetime::Transient);
    assert!(descriptors[2].is_trait());
    assert_eq!(descriptors[2].key, key_of_trait::<dyn Sink>());
}

#[test]
fn test_provider_resolves_through_clones() {
    struct Shared;

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Shared, _>(|_| Shared).unwrap();
    let sp = sc.build().unwrap();
    let clone = sp.clone();

    assert!(sp.same_snapshot(&clone));
    assert!(Arc::ptr_eq(&sp.get_required::<Shared>(), &clone.get_required::<Shared>()));
}

#[test]
fn test_modules_register_into_the_collection() {
    use snapshot_di::{DiResult, ServiceModule};

    struct Port(u16);
    struct Endpoint(String);

    struct NetworkModule {
        port: u16,
    }

    impl ServiceModule for NetworkModule {
        fn register_services(self, services: &mut ServiceCollection) -> DiResult<()> {
            let port = self.port;
            services
                .add_singleton(Port(port))?
                .add_transient_factory::<Endpoint, _>(|r| Endpoint(format!("0.0.0.0:{}", r.get_required::<Port>().0)))?;
            Ok(())
        }
    }

    let mut sc = ServiceCollection::new();
    sc.add_module(NetworkModule { port: 8443 }).unwrap();
    let sp = sc.build().unwrap();

    assert_eq!(sp.get_required::<Endpoint>().0, "0.0.0.0:8443");
    assert!(matches!(
        sc.add_module(NetworkModule { port: 1 }),
        Err(DiError::ConfigurationClosed(_))
    ));
}
