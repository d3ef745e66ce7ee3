//! Configuration for the roulette server.
//!
//! You can either use defaults or override via environment variables:
//!
//! - `ROULETTE_BIND_ADDR`         (default: "0.0.0.0")
//! - `ROULETTE_PORT`              (default: "9000")
//! - `ROULETTE_MAX_CLIENTS`       (default: "1024")
//! - `ROULETTE_BETTING_SECS`      (default: "20")
//! - `ROULETTE_DRAWING_SECS`      (default: "5")
//! - `ROULETTE_SETTLING_SECS`     (default: "7")
//! - `ROULETTE_STARTING_BALANCE`  (default: "10000", minor units)
//! - `ROULETTE_GRACE_SECS`        (default: "120")
//! - `ROULETTE_SWEEP_SECS`        (default: "30")
//! - `ROULETTE_QUEUE_CAPACITY`    (default: "256")
//! - `ROULETTE_MAX_NAME_LEN`      (default: "20")
//! - `ROULETTE_MAX_PAYLOAD`       (default: "1024", bytes)
//! - `ROULETTE_KEEPALIVE_SECS`    (default: "54")

use std::env;
use std::str::FromStr;
use std::time::Duration;

use roulette_core::MAX_NAME_LEN;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is not valid: {reason}")]
    Parse {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Phase durations for the round driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTiming {
    /// Betting window. Counted down in whole seconds.
    pub betting: Duration,
    /// Hold while the wheel animates; outcome not yet revealed.
    pub drawing: Duration,
    /// Hold after results go out, before zero balances are refilled.
    pub settling: Duration,
}

impl Default for RoundTiming {
    fn default() -> Self {
        RoundTiming {
            betting: Duration::from_secs(20),
            drawing: Duration::from_secs(5),
            settling: Duration::from_secs(7),
        }
    }
}

impl RoundTiming {
    /// Whole seconds of betting, at least one.
    pub fn betting_secs(&self) -> u32 {
        self.betting.as_secs().clamp(1, u32::MAX as u64) as u32
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously open connections.
    pub max_clients: usize,

    pub timing: RoundTiming,

    /// Balance given to new participants and to refilled ones.
    pub starting_balance: u64,

    /// How long a disconnected participant is kept for resumption.
    pub grace_period: Duration,

    /// How often the sweep looks for expired participants.
    pub sweep_interval: Duration,

    /// Per-connection outbound queue capacity, in messages.
    pub queue_capacity: usize,

    pub max_name_len: usize,

    /// Largest inbound frame accepted, in bytes.
    pub max_payload: usize,

    /// Idle time after which the writer emits a keep-alive frame.
    pub keepalive: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 9000,
            max_clients: 1024,
            timing: RoundTiming::default(),
            starting_balance: 10_000,
            grace_period: Duration::from_secs(120),
            sweep_interval: Duration::from_secs(30),
            queue_capacity: 256,
            max_name_len: MAX_NAME_LEN,
            max_payload: 1024,
            keepalive: Duration::from_secs(54),
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let config = Config {
            bind_addr: env::var("ROULETTE_BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: read_env_or_default("ROULETTE_PORT", defaults.port)?,
            max_clients: read_env_or_default("ROULETTE_MAX_CLIENTS", defaults.max_clients)?,
            timing: RoundTiming {
                betting: read_secs_or_default("ROULETTE_BETTING_SECS", defaults.timing.betting)?,
                drawing: read_secs_or_default("ROULETTE_DRAWING_SECS", defaults.timing.drawing)?,
                settling: read_secs_or_default("ROULETTE_SETTLING_SECS", defaults.timing.settling)?,
            },
            starting_balance: read_env_or_default("ROULETTE_STARTING_BALANCE", defaults.starting_balance)?,
            grace_period: read_secs_or_default("ROULETTE_GRACE_SECS", defaults.grace_period)?,
            sweep_interval: read_secs_or_default("ROULETTE_SWEEP_SECS", defaults.sweep_interval)?,
            queue_capacity: read_env_or_default("ROULETTE_QUEUE_CAPACITY", defaults.queue_capacity)?,
            max_name_len: read_env_or_default("ROULETTE_MAX_NAME_LEN", defaults.max_name_len)?,
            max_payload: read_env_or_default("ROULETTE_MAX_PAYLOAD", defaults.max_payload)?,
            keepalive: read_secs_or_default("ROULETTE_KEEPALIVE_SECS", defaults.keepalive)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("betting duration", self.timing.betting.is_zero()),
            ("sweep interval", self.sweep_interval.is_zero()),
            ("keep-alive period", self.keepalive.is_zero()),
            ("queue capacity", self.queue_capacity == 0),
            ("maximum payload", self.max_payload == 0),
            ("maximum name length", self.max_name_len == 0),
            ("max clients", self.max_clients == 0),
        ];
        match checks.into_iter().find(|(_, bad)| *bad) {
            Some((what, _)) => Err(ConfigError::Zero(what)),
            None => Ok(()),
        }
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_env_or_default<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse::<T>().map_err(|e| ConfigError::Parse {
            key,
            value: val.clone(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn read_secs_or_default(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    read_env_or_default(key, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timing.betting_secs(), 20);
        assert_eq!(config.socket_addr_string(), "0.0.0.0:9000");
        assert_eq!(config.max_name_len, 20);
    }

    #[test]
    fn zero_values_are_rejected() {
        let mut config = Config::default();
        config.queue_capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Zero("queue capacity"))));

        let mut config = Config::default();
        config.timing.betting = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_and_parse_errors() {
        // Keys unique to this test so parallel tests don't interfere.
        env::set_var("ROULETTE_TEST_ONLY_PORT", "9100");
        assert_eq!(read_env_or_default("ROULETTE_TEST_ONLY_PORT", 1u16).unwrap(), 9100);

        env::set_var("ROULETTE_TEST_ONLY_BAD", "soon");
        let err = read_secs_or_default("ROULETTE_TEST_ONLY_BAD", Duration::from_secs(1)).unwrap_err();
        assert!(err.to_string().contains("ROULETTE_TEST_ONLY_BAD"));

        assert_eq!(
            read_secs_or_default("ROULETTE_TEST_ONLY_UNSET", Duration::from_secs(7)).unwrap(),
            Duration::from_secs(7)
        );
    }
}
