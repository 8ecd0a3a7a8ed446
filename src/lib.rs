//! # lazy-registry
//!
//! Thread-safe lazy singletons with double-checked locking.
//!
//! - [`LazySharedRegistry`]: owned, injectable lazy cell with a fallible factory
//! - [`LoadBalancer`]: the classic singleton example, a fixed server list with random picks
//! - [`LockObserver`]: where lock and construction events go
//!
//! ```
//! use lazy_registry::{LoadBalancer, LoadBalancerConfig};
//!
//! let registry = LoadBalancer::registry(LoadBalancerConfig::default());
//! let lb1 = registry.get_instance().unwrap();
//! let lb2 = registry.get_instance().unwrap();
//! assert!(std::ptr::eq(lb1, lb2));
//! let pick = lb1.get_server();
//! assert!(lb1.servers().iter().any(|s| s == pick));
//! ```
//!
//! Run the walkthrough with:
//! ```bash
//! cargo run --bin singleton_demo
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod load_balancer;
pub mod registry;

pub use config::{LoadBalancerConfig, CONFIG_ENV_VAR, DEFAULT_SERVERS};
pub use error::RegistryError;
pub use events::{LockEvent, LockEventKind, LockObserver, RecordingObserver, TracingObserver};
pub use load_balancer::LoadBalancer;
pub use registry::{LazySharedRegistry, RegistryStats};
