//! Process configuration, assembled once at startup from the environment and
//! passed by dependency injection (spec §9) — there is no ambient global
//! settings accessor anywhere in this crate (see SPEC_FULL.md §E).

use crate::error::{CoreError, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
    Test,
}

impl Environment {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "staging" => Self::Staging,
            "prod" | "production" => Self::Prod,
            "test" => Self::Test,
            _ => Self::Dev,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub pool_size: u32,
    pub max_overflow: u32,
    pub pool_timeout: Duration,
    pub pool_recycle: Duration,
    pub pool_pre_ping: bool,
    pub statement_timeout: Duration,
    pub command_timeout: Duration,
    pub keepalives_idle: Duration,
    pub keepalives_interval: Duration,
    pub keepalives_count: u32,
    pub replica_hosts: Vec<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            pool_size: 20,
            max_overflow: 10,
            pool_timeout: Duration::from_secs(30),
            pool_recycle: Duration::from_secs(3600),
            pool_pre_ping: true,
            statement_timeout: Duration::from_millis(60_000),
            command_timeout: Duration::from_secs(60),
            keepalives_idle: Duration::from_secs(30),
            keepalives_interval: Duration::from_secs(5),
            keepalives_count: 5,
            replica_hosts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub sentinels: Vec<String>,
    pub master_name: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            sentinels: Vec::new(),
            master_name: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BusinessConfig {
    pub delivery_start_hour: u32,
    pub delivery_end_hour: u32,
    pub base_service_time_minutes: u32,
    pub time_per_cylinder_minutes: u32,
    pub max_stops_per_route: usize,
    pub max_route_duration_hours: u32,
    pub driver_cost_per_hour: f64,
    pub fuel_cost_per_km: f64,
    pub cylinder_sizes: Vec<u32>,
    pub invoice_tax_rate: f64,
    pub weekend_surcharge: f64,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            delivery_start_hour: 8,
            delivery_end_hour: 18,
            base_service_time_minutes: 5,
            time_per_cylinder_minutes: 2,
            max_stops_per_route: 50,
            max_route_duration_hours: 8,
            driver_cost_per_hour: 500.0,
            fuel_cost_per_km: 10.0,
            cylinder_sizes: vec![50, 20, 16, 10, 4],
            invoice_tax_rate: 0.05,
            weekend_surcharge: 1.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub password_min_length: u32,
    pub password_require_uppercase: bool,
    pub password_require_lowercase: bool,
    pub password_require_digit: bool,
    pub password_require_special: bool,
    pub session_timeout_minutes: u32,
    pub max_login_attempts: u32,
    pub lockout_duration_minutes: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            password_min_length: 8,
            password_require_uppercase: true,
            password_require_lowercase: true,
            password_require_digit: true,
            password_require_special: true,
            session_timeout_minutes: 1440,
            max_login_attempts: 5,
            lockout_duration_minutes: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingServiceConfig {
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub road_winding_factor: f64,
    pub peak_windows: Vec<(u32, u32)>,
    pub cache_ttl: Duration,
}

impl Default for RoutingServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(5),
            road_winding_factor: 1.3,
            peak_windows: vec![(7, 9), (17, 19)],
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub log_level: String,
    pub cloud_project_id: Option<String>,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub business: BusinessConfig,
    pub security: SecurityConfig,
    pub routing: RoutingServiceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Dev,
            log_level: "info".to_string(),
            cloud_project_id: None,
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            business: BusinessConfig::default(),
            security: SecurityConfig::default(),
            routing: RoutingServiceConfig::default(),
        }
    }
}

impl AppConfig {
    /// Assemble configuration from the process environment, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = env::var("ENVIRONMENT") {
            cfg.environment = Environment::parse(&v);
        }
        if let Ok(v) = env::var("LOG_LEVEL") {
            cfg.log_level = v;
        }
        cfg.cloud_project_id = env::var("CLOUD_PROJECT_ID").ok();
        if let Ok(v) = env::var("POSTGRES_REPLICAS") {
            cfg.database.replica_hosts = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        if let Ok(v) = env::var("REDIS_SENTINELS") {
            cfg.redis.sentinels = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        cfg.redis.master_name = env::var("REDIS_MASTER_NAME").ok();
        cfg.routing.base_url = env::var("ROUTING_SERVICE_URL").ok();
        cfg
    }

    /// Enforces the production constraints from spec §6: production forbids
    /// a `debug` log level and requires a cloud project id.
    pub fn validate(&self) -> Result<()> {
        if self.environment == Environment::Prod {
            if self.log_level.eq_ignore_ascii_case("debug") {
                return Err(CoreError::fatal(
                    "production environment forbids debug log level",
                ));
            }
            if self.cloud_project_id.is_none() {
                return Err(CoreError::fatal(
                    "production environment requires a cloud project id",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.business.delivery_start_hour, 8);
        assert_eq!(cfg.business.delivery_end_hour, 18);
        assert_eq!(cfg.database.pool_size, 20);
        assert_eq!(cfg.business.cylinder_sizes, vec![50, 20, 16, 10, 4]);
    }

    #[test]
    fn production_requires_cloud_project_id() {
        let mut cfg = AppConfig::default();
        cfg.environment = Environment::Prod;
        assert!(cfg.validate().is_err());
        cfg.cloud_project_id = Some("proj-1".to_string());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn production_forbids_debug_log_level() {
        let mut cfg = AppConfig::default();
        cfg.environment = Environment::Prod;
        cfg.cloud_project_id = Some("proj-1".to_string());
        cfg.log_level = "debug".to_string();
        assert!(cfg.validate().is_err());
    }
}
