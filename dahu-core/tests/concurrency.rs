//! Concurrency tests for the factory
//!
//! These tests validate that on-demand loading is safe under contention:
//! - Concurrent misses for the same name load the module exactly once
//! - Misses for different modules and registry hits never deadlock
//! - Every caller gets its own instance

mod common;

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use common::{Bar, MockLoader, module_dir};
use dahu_core::{Factory, FactoryConfig, Registry};

const THREADS: usize = 16;

fn shared_factory(loader: Arc<MockLoader>, dirs: &[&std::path::Path]) -> Arc<Factory> {
    let config = dirs
        .iter()
        .fold(FactoryConfig::isolated(), |config, dir| config.with_plugin_dir(*dir));
    Arc::new(Factory::with_loader(config, Arc::new(Registry::new()), loader))
}

#[test]
fn concurrent_misses_load_module_once() {
    let dir = module_dir(&["foo"]);
    let loader = Arc::new(
        MockLoader::new()
            .with_bar_module("foo")
            .with_delay(Duration::from_millis(50)),
    );
    let factory = shared_factory(loader.clone(), &[dir.path()]);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let factory = Arc::clone(&factory);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                factory.instantiate("foo.Bar").map(|inst| inst.id())
            })
        })
        .collect();

    let ids: HashSet<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    assert_eq!(ids.len(), THREADS);
    assert_eq!(loader.loads("foo"), 1);
}

#[test]
fn concurrent_misses_for_different_modules_all_succeed() {
    let dir = module_dir(&["alpha", "beta", "gamma"]);
    let loader = Arc::new(
        MockLoader::new()
            .with_bar_module("alpha")
            .with_bar_module("beta")
            .with_bar_module("gamma")
            .with_delay(Duration::from_millis(10)),
    );
    let factory = shared_factory(loader.clone(), &[dir.path()]);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let factory = Arc::clone(&factory);
            let barrier = Arc::clone(&barrier);
            let module = ["alpha", "beta", "gamma"][i % 3];
            thread::spawn(move || {
                barrier.wait();
                factory.instantiate(&format!("{module}.Bar")).map(|_| ())
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    for module in ["alpha", "beta", "gamma"] {
        assert_eq!(loader.loads(module), 1, "module {module}");
    }
}

#[test]
fn registry_hits_proceed_while_module_loads() {
    let dir = module_dir(&["slow"]);
    let started = Arc::new(Barrier::new(2));
    let loader = Arc::new(
        MockLoader::new()
            .with_bar_module("slow")
            .with_delay(Duration::from_millis(200))
            .with_start_signal(Arc::clone(&started)),
    );
    let factory = shared_factory(loader.clone(), &[dir.path()]);
    let name = factory.registry().register_type::<Bar>().unwrap();

    let loading = {
        let factory = Arc::clone(&factory);
        thread::spawn(move || factory.instantiate("slow.Bar").map(|_| ()))
    };

    // Loading is now in progress and holds the miss lock
    started.wait();
    assert_eq!(loader.loads("slow"), 1);
    for _ in 0..10 {
        factory.instantiate(name.as_str()).unwrap();
    }

    loading.join().unwrap().unwrap();
    assert_eq!(loader.loads("slow"), 1);
}

#[test]
fn concurrent_registration_and_instantiation() {
    let factory = shared_factory(Arc::new(MockLoader::new()), &[]);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let factory = Arc::clone(&factory);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let name = dahu_core::QualifiedName::parse(&format!("gen.Bar{i}")).unwrap();
                barrier.wait();
                factory.registry().register(name.clone(), || Box::new(Bar));
                factory.instantiate(name.as_str()).map(|_| ())
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(factory.registry().len(), THREADS);
}
