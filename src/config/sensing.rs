// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the printer-thermal project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration for the temperature sensing system
//!
//! This module provides configuration structures for the temperature sensing
//! system including I2C bus configuration and individual sensor sections.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main temperature sensing configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TemperatureSensingConfig {
    /// Enable or disable the temperature sensing system
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// I2C bus configurations, keyed by bus name
    pub i2c_buses: HashMap<String, I2cBusConfig>,

    /// Individual sensor sections
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

/// I2C bus configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct I2cBusConfig {
    /// Bus type: "native" for a Linux /dev/i2c-* bus or "mock" for simulation
    #[serde(rename = "type")]
    pub bus_type: I2cBusType,

    /// Device path for native I2C (e.g., "/dev/i2c-1"); ignored for mock
    #[serde(default = "default_bus_device")]
    pub device: String,

    /// Bus-specific settings
    #[serde(default)]
    pub bus_settings: I2cBusSettings,
}

/// I2C bus type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum I2cBusType {
    /// Native Linux I2C bus
    Native,
    /// Mock driver backed by a register-level sensor emulation
    Mock,
}

/// I2C bus settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct I2cBusSettings {
    /// I2C clock frequency in Hz
    #[serde(default = "default_i2c_frequency")]
    pub frequency_hz: u32,

    /// Bus timeout in milliseconds
    #[serde(default = "default_bus_timeout")]
    pub timeout_ms: u32,
}

/// Configuration for a single temperature sensor section
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SensorConfig {
    /// Sensor name, used as the registration key for status queries
    pub name: String,

    /// Sensor type, matched against the registered sensor factories
    #[serde(default = "default_sensor_type")]
    pub sensor_type: String,

    /// Enable or disable this specific sensor
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// I2C bus identifier (reference to an i2c_buses key)
    pub i2c_bus: String,

    /// I2C device address
    #[serde(default = "default_sensor_address")]
    pub i2c_address: u8,

    /// Minimum expected temperature in Celsius (informational, enforced by
    /// the heater subsystem)
    #[serde(default)]
    pub min_temp: f64,

    /// Maximum expected temperature in Celsius (informational, enforced by
    /// the heater subsystem)
    #[serde(default)]
    pub max_temp: f64,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_bus_device() -> String {
    "/dev/i2c-1".to_string()
}
fn default_i2c_frequency() -> u32 {
    100000
}
fn default_bus_timeout() -> u32 {
    1000
}
fn default_sensor_type() -> String {
    "MCP9808".to_string()
}
fn default_sensor_address() -> u8 {
    0x18
}

impl Default for TemperatureSensingConfig {
    fn default() -> Self {
        let mut i2c_buses = HashMap::new();
        i2c_buses.insert(
            "i2c0".to_string(),
            I2cBusConfig {
                bus_type: I2cBusType::Mock,
                device: default_bus_device(),
                bus_settings: I2cBusSettings::default(),
            },
        );

        Self {
            enabled: true,
            i2c_buses,
            sensors: vec![SensorConfig::default()],
        }
    }
}

impl Default for I2cBusSettings {
    fn default() -> Self {
        Self {
            frequency_hz: default_i2c_frequency(),
            timeout_ms: default_bus_timeout(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            name: "chamber_temp".to_string(),
            sensor_type: default_sensor_type(),
            enabled: true,
            i2c_bus: "i2c0".to_string(),
            i2c_address: default_sensor_address(),
            min_temp: 0.0,
            max_temp: 0.0,
        }
    }
}
