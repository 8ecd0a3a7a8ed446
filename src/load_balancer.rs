use crate::config::LoadBalancerConfig;
use crate::error::RegistryError;
use crate::registry::LazySharedRegistry;
use lazy_static::lazy_static;
use rand::seq::SliceRandom;
use rand::Rng;

// =============================================================================
// LoadBalancer: a fixed list of servers handed out at random
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancer {
    servers: Vec<String>,
}

impl LoadBalancer {
    pub fn new<I, S>(servers: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let servers: Vec<String> = servers.into_iter().map(Into::into).collect();
        if servers.is_empty() {
            return Err(RegistryError::construction_failed(
                "load balancer needs at least one server",
            ));
        }
        if let Some(pos) = servers.iter().position(|s| s.trim().is_empty()) {
            return Err(RegistryError::construction_failed(format!(
                "server name at index {pos} is blank"
            )));
        }
        Ok(LoadBalancer { servers })
    }

    pub fn from_config(config: &LoadBalancerConfig) -> Result<Self, RegistryError> {
        config.validate()?;
        Self::new(config.servers.iter().cloned())
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Picks a server uniformly at random.
    pub fn get_server(&self) -> &str {
        self.get_server_with(&mut rand::thread_rng())
    }

    pub fn get_server_with<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        self.servers
            .choose(rng)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// An owned registry that builds a balancer from `config` on first access.
    pub fn registry(config: LoadBalancerConfig) -> LazySharedRegistry<LoadBalancer> {
        let timeout = config.lock_timeout();
        let registry = LazySharedRegistry::new(move || LoadBalancer::from_config(&config));
        match timeout {
            Some(timeout) => registry.with_lock_timeout(timeout),
            None => registry,
        }
    }

    /// The process-wide balancer, built from [`LoadBalancerConfig::load`] on first use.
    ///
    /// Returns `None` if construction failed; a later call retries.
    pub fn global() -> Option<&'static LoadBalancer> {
        GLOBAL.get_instance()
    }

    pub fn global_registry() -> &'static LazySharedRegistry<LoadBalancer> {
        &GLOBAL
    }
}

impl Default for LoadBalancer {
    fn default() -> Self {
        LoadBalancer {
            servers: LoadBalancerConfig::default().servers,
        }
    }
}

lazy_static! {
    static ref GLOBAL: LazySharedRegistry<LoadBalancer> = LazySharedRegistry::new(|| {
        let config = LoadBalancerConfig::load()?;
        LoadBalancer::from_config(&config)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SERVERS;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_default_servers() {
        let lb = LoadBalancer::default();
        assert_eq!(lb.servers(), &DEFAULT_SERVERS[..]);
    }

    #[test]
    fn test_rejects_empty_server_list() {
        let err = LoadBalancer::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, RegistryError::ConstructionFailed { .. }));
    }

    #[test]
    fn test_rejects_blank_server_name() {
        let err = LoadBalancer::new(["east", "  "]).unwrap_err();
        assert!(matches!(err, RegistryError::ConstructionFailed { .. }));
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn test_hundred_requests_stay_in_set() {
        let registry = LoadBalancer::registry(LoadBalancerConfig::default());
        let lb = registry.get_instance().unwrap();

        let picks: Vec<&str> = (0..100).map(|_| lb.get_server()).collect();
        assert_eq!(picks.len(), 100);
        assert!(picks.iter().all(|p| DEFAULT_SERVERS.iter().any(|s| s == p)));
    }

    #[test]
    fn test_distribution_is_roughly_uniform() {
        let lb = LoadBalancer::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: HashMap<&str, usize> = HashMap::new();

        for _ in 0..10_000 {
            *counts.entry(lb.get_server_with(&mut rng)).or_default() += 1;
        }

        assert_eq!(counts.len(), 5);
        for (server, count) in counts {
            assert!(
                (1700..=2300).contains(&count),
                "{server} drawn {count} times"
            );
        }
    }

    #[test]
    fn test_registry_applies_lock_timeout() {
        let config = LoadBalancerConfig {
            lock_timeout_ms: Some(75),
            ..LoadBalancerConfig::default()
        };
        let registry = LoadBalancer::registry(config);
        assert!(format!("{:?}", registry).contains("lock_timeout: Some(75ms)"));
        assert_eq!(registry.get_instance().unwrap().servers().len(), 5);
    }

    #[test]
    fn test_registry_with_invalid_config_retries() {
        let registry = LoadBalancer::registry(LoadBalancerConfig {
            servers: Vec::new(),
            lock_timeout_ms: None,
        });

        assert!(registry.get_instance().is_none());
        assert!(registry.get_instance().is_none());
        assert_eq!(registry.stats().failed_constructions, 2);
        assert_eq!(registry.stats().lock_acquisitions, 2);
    }

    #[test]
    #[serial_test::serial]
    fn test_global_is_shared_across_threads() {
        let here = LoadBalancer::global().unwrap() as *const LoadBalancer as usize;
        let there = std::thread::spawn(|| LoadBalancer::global().unwrap() as *const LoadBalancer as usize)
            .join()
            .unwrap();

        assert_eq!(here, there);
        assert!(LoadBalancer::global_registry().is_initialized());
        assert_eq!(LoadBalancer::global_registry().stats().constructions, 1);
    }

    proptest! {
        #[test]
        fn test_draws_are_members(
            servers in prop::collection::vec("[a-z]{1,8}", 1..10),
            seed: u64,
        ) {
            let lb = LoadBalancer::new(servers.clone()).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..50 {
                let pick = lb.get_server_with(&mut rng);
                prop_assert!(servers.iter().any(|s| s == pick));
            }
        }
    }
}
