use snapshot_di::{DiError, IOptions, Options, Resolver, ServiceCollection};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default, Debug)]
struct ProtectionOptions {
    discriminator: String,
}

struct Protector {
    options: Arc<ProtectionOptions>,
}

impl Protector {
    fn discriminator(&self) -> &str {
        &self.options.discriminator
    }
}

fn counting_collection(counter: Arc<AtomicUsize>) -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.configure_options::<ProtectionOptions, _>(move |_, o| {
        counter.fetch_add(1, Ordering::SeqCst);
        o.discriminator = "app".to_string();
    })
    .unwrap()
    .add_singleton_try_factory::<Protector, _>(|r| {
        Ok(Protector {
            options: r.get_options::<ProtectionOptions>()?,
        })
    })
    .unwrap();
    sc
}

#[test]
fn test_options_captured_once_for_hundred_reads() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut sc = counting_collection(counter.clone());
    let sp = sc.build().unwrap();

    let first = sp.get_options::<ProtectionOptions>().unwrap();
    for _ in 0..100 {
        assert!(Arc::ptr_eq(&first, &sp.get_options::<ProtectionOptions>().unwrap()));
    }
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_options_shared_by_every_access_path() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut sc = counting_collection(counter.clone());
    let sp = sc.build().unwrap();

    // Factory path first, then direct and wrapped access
    let protector = sp.get_required::<Protector>();
    let direct = sp.get_options::<ProtectionOptions>().unwrap();
    let wrapped = sp.get_required::<Options<ProtectionOptions>>();

    assert!(Arc::ptr_eq(&protector.options, &direct));
    assert!(Arc::ptr_eq(wrapped.value(), &direct));
    assert!(Arc::ptr_eq(&IOptions::get(&*wrapped), &direct));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(sp
        .snapshot()
        .get_cached_options(&snapshot_di::key_of_options::<ProtectionOptions>())
        .is_some());
}

#[test]
fn test_capture_is_deferred_until_first_access() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut sc = counting_collection(counter.clone());
    let registry = sc.freeze().unwrap();
    let sp = registry.build_provider();

    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(sp
        .snapshot()
        .get_cached_options(&snapshot_di::key_of_options::<ProtectionOptions>())
        .is_none());

    assert_eq!(sp.get_required::<Protector>().discriminator(), "app");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_configure_callbacks_run_in_registration_order() {
    let mut sc = ServiceCollection::new();
    sc.configure_options::<ProtectionOptions, _>(|_, o| o.discriminator = "my-app".into())
        .unwrap()
        .configure_options::<ProtectionOptions, _>(|_, o| o.discriminator.push_str("+app"))
        .unwrap()
        .configure_options::<ProtectionOptions, _>(|_, o| o.discriminator = o.discriminator.replace("my-app+", ""))
        .unwrap();

    let sp = sc.build().unwrap();
    assert_eq!(sp.get_options::<ProtectionOptions>().unwrap().discriminator, "app");
}

#[test]
fn test_callbacks_can_resolve_services() {
    struct ContentRoot(String);

    let mut sc = ServiceCollection::new();
    sc.add_singleton(ContentRoot("/srv/app".to_string()))
        .unwrap()
        .add_options::<ProtectionOptions>()
        .configure(|r, o| {
            if o.discriminator.is_empty() {
                o.discriminator = r.get_required::<ContentRoot>().0.clone();
            }
        })
        .register()
        .unwrap();

    let sp = sc.build().unwrap();
    assert_eq!(sp.get_options::<ProtectionOptions>().unwrap().discriminator, "/srv/app");
}

#[test]
fn test_unregistered_options() {
    #[derive(Default, Debug, PartialEq)]
    struct Unset {
        retries: u32,
    }

    let sp = ServiceCollection::new().build().unwrap();
    assert!(matches!(
        sp.get_options::<Unset>(),
        Err(DiError::OptionsNotRegistered(name)) if name.ends_with("Unset")
    ));

    let mut sc = ServiceCollection::new();
    sc.allow_default_options().unwrap();
    let sp = sc.build().unwrap();
    let first = sp.get_options::<Unset>().unwrap();
    assert_eq!(*first, Unset::default());
    assert!(Arc::ptr_eq(&first, &sp.get_options::<Unset>().unwrap()));
}

#[test]
fn test_default_policy_and_options_wrapper() {
    #[derive(Default, Debug, PartialEq)]
    struct Unset {
        retries: u32,
    }

    // The policy serves the default, but no wrapper service exists
    let mut sc = ServiceCollection::new();
    sc.allow_default_options().unwrap();
    let sp = sc.build().unwrap();
    assert_eq!(*sp.get_options::<Unset>().unwrap(), Unset::default());
    assert!(matches!(
        sp.get::<Options<Unset>>(),
        Err(DiError::NotFound(name)) if name.contains("Unset")
    ));

    // An empty pipeline registers the wrapper over the same captured default
    let mut sc = ServiceCollection::new();
    sc.add_options::<Unset>().register().unwrap();
    let sp = sc.build().unwrap();
    let wrapped = sp.get_required::<Options<Unset>>();
    let direct = sp.get_options::<Unset>().unwrap();
    assert_eq!(*direct, Unset::default());
    assert!(Arc::ptr_eq(wrapped.value(), &direct));
}

#[test]
fn test_validation_failure_is_terminal() {
    let validations = Arc::new(AtomicUsize::new(0));
    let validations_clone = validations.clone();

    let mut sc = ServiceCollection::new();
    sc.add_options::<ProtectionOptions>()
        .validate(move |o| {
            validations_clone.fetch_add(1, Ordering::SeqCst);
            if o.discriminator.is_empty() {
                Err("discriminator must not be empty".to_string())
            } else {
                Ok(())
            }
        })
        .register()
        .unwrap();

    let sp = sc.build().unwrap();
    let first = sp.get_options::<ProtectionOptions>().unwrap_err();
    let second = sp.get_options::<ProtectionOptions>().unwrap_err();

    assert_eq!(first, second);
    assert!(matches!(first, DiError::OptionsValidation { ref message, .. } if message == "discriminator must not be empty"));
    assert!(matches!(
        sp.get::<Options<ProtectionOptions>>(),
        Err(DiError::OptionsValidation { .. })
    ));
    assert_eq!(validations.load(Ordering::SeqCst), 1);
}

#[test]
fn test_options_builders_compose() {
    #[derive(Default)]
    struct Limits {
        max: u32,
        steps: Vec<&'static str>,
    }

    let mut sc = ServiceCollection::new();
    sc.add_options::<Limits>()
        .default_with(|| Limits { max: 5, steps: vec!["default"] })
        .post_configure(|_, l| l.steps.push("post"))
        .register()
        .unwrap();
    sc.add_options::<Limits>()
        .configure(|_, l| {
            l.max += 1;
            l.steps.push("configure");
        })
        .register()
        .unwrap();

    let sp = sc.build().unwrap();
    let limits = sp.get_options::<Limits>().unwrap();
    assert_eq!(limits.max, 6);
    assert_eq!(limits.steps, vec!["default", "configure", "post"]);
}
