//! Route → policy table consulted by the admission middleware.

use std::collections::HashMap;

use axum::http::Method;

use ratelimit_core::config::LimiterConfig;
use ratelimit_core::error::AppError;
use ratelimit_core::result::AppResult;
use ratelimit_core::types::Policy;

/// Rate limit policies keyed by HTTP method and registered route path.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    routes: HashMap<(Method, String), Policy>,
}

impl PolicyTable {
    /// Builds the table from configuration, validating every entry.
    pub fn from_config(config: &LimiterConfig) -> AppResult<Self> {
        let mut table = Self::default();
        for route in &config.routes {
            let method = Method::from_bytes(route.method.trim().to_ascii_uppercase().as_bytes())
                .map_err(|_| {
                    AppError::configuration(format!(
                        "Invalid HTTP method '{}' for rate-limited route {}",
                        route.method, route.path
                    ))
                })?;
            table.insert(method, &route.path, route.to_policy()?)?;
        }
        Ok(table)
    }

    /// Adds a route. Declaring the same route twice is a configuration error.
    pub fn insert(&mut self, method: Method, path: &str, policy: Policy) -> AppResult<()> {
        let key = (method, path.to_string());
        if self.routes.contains_key(&key) {
            return Err(AppError::configuration(format!(
                "Duplicate rate limit for {} {}",
                key.0, key.1
            )));
        }
        self.routes.insert(key, policy);
        Ok(())
    }

    /// Policy for a route, `None` when the route is not limited.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<&Policy> {
        self.routes.get(&(method.clone(), path.to_string()))
    }

    /// Number of limited routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is limited.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratelimit_core::config::RoutePolicyConfig;
    use ratelimit_core::error::ErrorKind;

    fn route(method: &str, path: &str, capacity: f64) -> RoutePolicyConfig {
        RoutePolicyConfig {
            method: method.to_string(),
            path: path.to_string(),
            capacity,
            refill_rate: 1.0,
            requested: 1,
        }
    }

    #[test]
    fn test_default_table() {
        let table = PolicyTable::from_config(&LimiterConfig::default()).unwrap();
        assert_eq!(table.len(), 4);

        let login = table.lookup(&Method::POST, "/api/login").unwrap();
        assert_eq!(login.capacity(), 5.0);
        assert!((login.refill_rate() - 1.0 / 60.0).abs() < 1e-12);

        assert!(table.lookup(&Method::GET, "/api/login").is_none());
        assert!(table.lookup(&Method::GET, "/api/health").is_none());
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let config = LimiterConfig {
            routes: vec![route("get", "/api/data", 3.0)],
            ..LimiterConfig::default()
        };
        let table = PolicyTable::from_config(&config).unwrap();
        assert!(table.lookup(&Method::GET, "/api/data").is_some());
    }

    #[test]
    fn test_invalid_route_aborts() {
        let config = LimiterConfig {
            routes: vec![route("GET", "/api/data", 0.0)],
            ..LimiterConfig::default()
        };
        let err = PolicyTable::from_config(&config).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message.contains("/api/data"));
    }

    #[test]
    fn test_duplicate_route_is_rejected() {
        let config = LimiterConfig {
            routes: vec![route("GET", "/api/data", 3.0), route("GET", "/api/data", 4.0)],
            ..LimiterConfig::default()
        };
        assert!(PolicyTable::from_config(&config).is_err());
    }
}
