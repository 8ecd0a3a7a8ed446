use colored::Colorize;
use lazy_registry::{
    LazySharedRegistry, LoadBalancer, LoadBalancerConfig, LockEvent, LockObserver, RegistryError,
};
use std::sync::Arc;
use std::thread;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Prints each lock event as a plain trace line.
struct ConsoleObserver;

impl LockObserver for ConsoleObserver {
    fn on_event(&self, event: &LockEvent) {
        println!("  {}", event.to_string().dimmed());
    }
}

// =============================================================================
// Scenario 1: three threads started one after another
// =============================================================================

fn sequential_threads(registry: &LazySharedRegistry<LoadBalancer>) -> Result<(), RegistryError> {
    let mut addresses = Vec::new();

    for name in ["Thread 1", "Thread 2", "Thread 3"] {
        let address = thread::scope(|s| {
            thread::Builder::new()
                .name(name.to_string())
                .spawn_scoped(s, || {
                    let lb = registry.try_get_instance()?;
                    println!("  {}: load balancer <{:p}>", name, lb);
                    Ok::<_, RegistryError>(lb as *const LoadBalancer as usize)
                })
                .map_err(|err| RegistryError::construction_failed(format!("spawn failed: {err}")))?
                .join()
                .map_err(|_| RegistryError::construction_failed(format!("{name} panicked")))?
        })?;
        addresses.push(address);
    }

    if addresses.iter().all(|&a| a == addresses[0]) {
        println!("{}", "Same Instance".green());
    } else {
        println!("{}", "Different Instance".red());
    }

    let stats = registry.stats();
    println!(
        "  constructions: {}, lock acquisitions: {}, fast-path hits: {}",
        stats.constructions, stats.lock_acquisitions, stats.fast_path_hits
    );
    Ok(())
}

// =============================================================================
// Scenario 2: a failing first construction, then a retry
// =============================================================================

fn failure_then_retry() {
    let registry = LoadBalancer::registry(LoadBalancerConfig {
        servers: Vec::new(),
        lock_timeout_ms: None,
    })
    .with_observer(Arc::new(ConsoleObserver));

    match registry.get_instance() {
        Some(_) => println!("  unexpected instance from an empty server list"),
        None => println!("  no instance; registry initialized: {}", registry.is_initialized()),
    }
}

// =============================================================================
// Scenario 3: load balance some requests through the global instance
// =============================================================================

fn generate_requests(count: usize) {
    let Some(lb) = LoadBalancer::global() else {
        println!("{}", "global load balancer unavailable".red());
        return;
    };

    println!("Generating {} requests....", count);
    for i in 1..=count {
        println!("  request {:>2} -> {}", i, lb.get_server());
    }
}

fn main() -> Result<(), RegistryError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lazy_registry=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = LoadBalancerConfig::load()?;

    println!("{}", "=== START DOUBLE CHECKED LOCKING ===".bold());
    let mut registry = LoadBalancer::registry(config).with_observer(Arc::new(ConsoleObserver));
    sequential_threads(&registry)?;

    println!("\n{}", "=== RESET, THEN AGAIN ===".bold());
    registry.reset();
    sequential_threads(&registry)?;

    println!("\n{}", "=== FAILED CONSTRUCTION ===".bold());
    failure_then_retry();

    println!("\n{}", "=== GLOBAL INSTANCE ===".bold());
    generate_requests(15);

    Ok(())
}
