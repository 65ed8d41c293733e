use snapshot_di::{
    AnyArc, DiError, Key, Lifetime, Resolver, ResolverCore, ServiceCollection,
};
use parking_lot::Mutex;
use std::sync::{Arc, Barrier};
use std::thread;

fn assert_circular<T: std::fmt::Debug>(result: Result<T, DiError>, expected_len: usize) -> Vec<&'static str> {
    match result {
        Err(DiError::Circular(path)) => {
            assert_eq!(path.len(), expected_len, "wrong circular path: {:?}", path);
            assert_eq!(path.first(), path.last(), "path must close the loop: {:?}", path);
            path
        }
        other => panic!("expected circular dependency, got {:?}", other),
    }
}

#[test]
fn test_self_circular_singleton() {
    #[derive(Debug)]
    struct SelfReferencing;

    let mut sc = ServiceCollection::new();
    sc.add_singleton_try_factory::<SelfReferencing, _>(|r| {
        r.get::<SelfReferencing>()?;
        Ok(SelfReferencing)
    })
    .unwrap();

    let sp = sc.build().unwrap();
    let path = assert_circular(sp.get::<SelfReferencing>(), 2);
    assert!(path[0].ends_with("SelfReferencing"));
}

#[test]
fn test_two_singleton_cycle_is_rejected_not_placeheld() {
    #[derive(Debug)]
    struct A;
    #[derive(Debug)]
    struct B;

    let mut sc = ServiceCollection::new();
    sc.add_singleton_try_factory::<A, _>(|r| {
        r.get::<B>()?;
        Ok(A)
    })
    .unwrap()
    .add_singleton_try_factory::<B, _>(|r| {
        r.get::<A>()?;
        Ok(B)
    })
    .unwrap();

    let sp = sc.build().unwrap();
    let path = assert_circular(sp.get::<A>(), 3);
    assert!(path[0].ends_with("::A"));
    assert!(path[1].ends_with("::B"));

    // Both slots failed terminally with the same cycle
    assert!(matches!(sp.get::<A>(), Err(DiError::Circular(_))));
    assert!(matches!(sp.get::<B>(), Err(DiError::Circular(_))));
}

#[test]
fn test_transient_cycle() {
    #[derive(Debug)]
    struct Left;
    #[derive(Debug)]
    struct Right;

    let mut sc = ServiceCollection::new();
    sc.add_transient_try_factory::<Left, _>(|r| {
        r.get::<Right>()?;
        Ok(Left)
    })
    .unwrap()
    .add_transient_try_factory::<Right, _>(|r| {
        r.get::<Left>()?;
        Ok(Right)
    })
    .unwrap();

    let sp = sc.build().unwrap();
    assert_circular(sp.get::<Left>(), 3);
    assert_circular(sp.get::<Right>(), 3);
}

#[test]
fn test_diamond_is_not_a_cycle() {
    struct Root;
    struct Left(#[allow(dead_code)] Arc<Root>);
    struct Right(#[allow(dead_code)] Arc<Root>);
    struct Top {
        left: Arc<Left>,
        right: Arc<Right>,
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Root, _>(|_| Root)
        .unwrap()
        .add_transient_factory::<Left, _>(|r| Left(r.get_required::<Root>()))
        .unwrap()
        .add_transient_factory::<Right, _>(|r| Right(r.get_required::<Root>()))
        .unwrap()
        .add_transient_factory::<Top, _>(|r| Top {
            left: r.get_required::<Left>(),
            right: r.get_required::<Right>(),
        })
        .unwrap();

    let sp = sc.build().unwrap();
    let top = sp.get_required::<Top>();
    assert!(Arc::ptr_eq(&top.left.0, &top.right.0));
}

#[test]
fn test_options_callback_cycle_is_reported_to_callback() {
    #[derive(Default)]
    struct Settings {
        name: String,
    }

    struct NeedsSettings {
        #[allow(dead_code)]
        name: String,
    }

    let seen: Arc<Mutex<Option<DiError>>> = Arc::new(Mutex::new(None));
    let seen_clone = seen.clone();

    let mut sc = ServiceCollection::new();
    sc.configure_options::<Settings, _>(move |r, s| match r.get::<NeedsSettings>() {
        Ok(dep) => s.name = dep.name.clone(),
        Err(err) => *seen_clone.lock() = Some(err),
    })
    .unwrap()
    .add_singleton_try_factory::<NeedsSettings, _>(|r| {
        Ok(NeedsSettings {
            name: r.get_options::<Settings>()?.name.clone(),
        })
    })
    .unwrap();

    let sp = sc.build().unwrap();
    let settings = sp.get_options::<Settings>().unwrap();
    assert_eq!(settings.name, "");

    let path = match seen.lock().clone() {
        Some(DiError::Circular(path)) => path,
        other => panic!("expected circular error in callback, got {:?}", other),
    };
    assert_eq!(path.len(), 3);
    assert!(path[1].ends_with("NeedsSettings"));
    assert!(matches!(sp.get::<NeedsSettings>(), Err(DiError::Circular(_))));
}

#[test]
fn test_depth_guard() {
    // Longer than the guard, on a thread with the default stack size
    const CHAIN: usize = 300;

    let handle = thread::spawn(|| {
        let keys: Vec<Key> = (0..=CHAIN)
            .map(|i| Key::Trait(Box::leak(format!("link-{}", i).into_boxed_str())))
            .collect();

        let mut sc = ServiceCollection::new();
        for i in 0..CHAIN {
            let next = keys[i + 1];
            sc.register(keys[i], Lifetime::Singleton, move |r| r.resolve_any(&next))
                .unwrap();
        }
        sc.register(keys[CHAIN], Lifetime::Singleton, |_| Ok(Arc::new(()) as AnyArc))
            .unwrap();

        let sp = sc.build().unwrap();
        let deep = sp.resolve(&keys[0]).map(|_| ());
        let shallow = sp.resolve(&keys[CHAIN - 10]).map(|_| ());
        (deep, shallow)
    });

    let (deep, shallow) = handle.join().unwrap();
    assert!(matches!(deep, Err(DiError::DepthExceeded(256))), "got {:?}", deep);
    assert!(shallow.is_ok());
}

#[test]
fn test_transient_chain_below_guard_resolves() {
    const CHAIN: usize = 200;

    let handle = thread::spawn(|| {
        let keys: Vec<Key> = (0..=CHAIN)
            .map(|i| Key::Trait(Box::leak(format!("short-{}", i).into_boxed_str())))
            .collect();

        let mut sc = ServiceCollection::new();
        for i in 0..CHAIN {
            let next = keys[i + 1];
            sc.register(keys[i], Lifetime::Transient, move |r| r.resolve_any(&next))
                .unwrap();
        }
        sc.register(keys[CHAIN], Lifetime::Transient, |_| Ok(Arc::new(7u8) as AnyArc))
            .unwrap();

        let sp = sc.build().unwrap();
        sp.resolve(&keys[0]).map(|v| *v.downcast::<u8>().unwrap())
    });

    assert_eq!(handle.join().unwrap(), Ok(7));
}

#[test]
fn test_cross_thread_cycle_does_not_deadlock() {
    #[derive(Debug)]
    struct X;
    #[derive(Debug)]
    struct Y;

    let barrier = Arc::new(Barrier::new(2));
    let bx = barrier.clone();
    let by = barrier.clone();

    let mut sc = ServiceCollection::new();
    sc.add_singleton_try_factory::<X, _>(move |r| {
        bx.wait();
        r.get::<Y>()?;
        Ok(X)
    })
    .unwrap()
    .add_singleton_try_factory::<Y, _>(move |r| {
        by.wait();
        r.get::<X>()?;
        Ok(Y)
    })
    .unwrap();

    let sp = sc.build().unwrap();
    let sp_x = sp.clone();
    let sp_y = sp.clone();

    let tx = thread::spawn(move || sp_x.get::<X>().map(|_| ()));
    let ty = thread::spawn(move || sp_y.get::<Y>().map(|_| ()));

    let rx = tx.join().unwrap();
    let ry = ty.join().unwrap();
    assert!(matches!(rx, Err(DiError::Circular(_))), "{:?}", rx);
    assert!(matches!(ry, Err(DiError::Circular(_))), "{:?}", ry);
}
