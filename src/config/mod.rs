// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the printer-thermal project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Configuration Management
//!
//! This module implements configuration handling for the temperature sensing
//! service. It supports loading, validating, and saving configuration from
//! YAML files using JSON Schema validation for robust error checking.
//!
//! ## Configuration Structure
//!
//! The configuration is organized as a nested structure with sections:
//! - `sensing`: I2C buses and sensor sections
//! - `service`: daemon-level settings (heartbeat interval)
//!
//! ## Usage
//!
//! ```no_run
//! use printer_thermal::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     true, // Force mock buses (simulation)
//!     None, // Keep the configured sensing enable flag
//! );
//!
//! println!("Configured sensors: {}", config.sensing.sensors.len());
//! ```

pub mod sensing;

use anyhow::{Context, Result};
use log::{debug, error};
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub use sensing::{
    I2cBusConfig, I2cBusSettings, I2cBusType, SensorConfig, TemperatureSensingConfig,
};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Temperature sensing system configuration
    #[serde(default)]
    pub sensing: TemperatureSensingConfig,

    /// Daemon-level service settings
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Daemon-level service settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ServiceConfig {
    /// Heartbeat logging interval in seconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_s: u64,
}

fn default_heartbeat_interval() -> u64 {
    60
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_s: default_heartbeat_interval(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// If the file does not exist, a default configuration is created,
    /// written to `path` and returned. An existing file is validated
    /// against the generated JSON Schema before deserialization, then
    /// checked against the rules JSON Schema cannot express.
    ///
    /// ### Arguments
    ///
    /// * `path` - Path of the YAML configuration file
    ///
    /// ### Returns
    ///
    /// The loaded (or newly created default) configuration, or an error
    /// describing the first validation failure.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        // Validate against the schema generated from the Config structure
        let schema = serde_json::to_value(schema_for!(Config))
            .context("Failed to generate JSON schema for configuration")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(err) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            anyhow::bail!("Configuration validation failed: {}", err);
        }

        // Now that YAML has been validated, deserialize to Config
        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = serde_yml::from_str(&contents).with_context(|| {
            format!("Failed to deserialize configuration from {}", path.display())
        })?;

        // Perform additional specific validations
        if let Err(err) = Self::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;
        fs::write(path.as_ref(), yaml).with_context(|| {
            format!(
                "Failed to write configuration file at {:?}",
                path.as_ref()
            )
        })?;
        Ok(())
    }

    /// Apply command line overrides to the loaded configuration.
    ///
    /// ### Arguments
    ///
    /// * `simulate` - Force every configured I2C bus to the mock driver
    /// * `sensing_enabled` - Override the sensing enable flag when set
    pub fn apply_args(&mut self, simulate: bool, sensing_enabled: Option<bool>) {
        if simulate {
            for bus in self.sensing.i2c_buses.values_mut() {
                bus.bus_type = I2cBusType::Mock;
            }
        }
        if let Some(enabled) = sensing_enabled {
            self.sensing.enabled = enabled;
        }
    }

    /// Validates the configuration against rules that aren't covered by the
    /// JSON schema.
    ///
    /// ### Validation Rules
    ///
    /// - Every sensor must reference an existing `i2c_buses` entry
    /// - Sensor names must be unique (they key status queries)
    /// - I2C addresses must fall in the valid 7-bit range 0x08..=0x77
    /// - When both bounds are set, `min_temp` must not exceed `max_temp`
    pub fn validate_specific_rules(config: &Config) -> Result<()> {
        debug!("Performing additional validation checks");

        let mut seen_names = std::collections::HashSet::new();
        for sensor in &config.sensing.sensors {
            if !config.sensing.i2c_buses.contains_key(&sensor.i2c_bus) {
                anyhow::bail!(
                    "Sensor '{}' references unknown I2C bus '{}'",
                    sensor.name,
                    sensor.i2c_bus
                );
            }
            if !seen_names.insert(sensor.name.clone()) {
                anyhow::bail!("Duplicate sensor name '{}'", sensor.name);
            }
            if !(0x08..=0x77).contains(&sensor.i2c_address) {
                anyhow::bail!(
                    "Sensor '{}' has invalid I2C address 0x{:02X} (valid range 0x08-0x77)",
                    sensor.name,
                    sensor.i2c_address
                );
            }
            if sensor.min_temp != 0.0 && sensor.max_temp != 0.0 && sensor.min_temp > sensor.max_temp
            {
                anyhow::bail!(
                    "Sensor '{}' has min_temp {} above max_temp {}",
                    sensor.name,
                    sensor.min_temp,
                    sensor.max_temp
                );
            }
        }

        Ok(())
    }
}

/// Output the configuration JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line. It outputs the full JSON schema for the configuration
/// to stdout, formatted for readability.
///
/// ### Example
///
/// ```bash
/// ./printer_thermal --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema = schema_for!(Config);

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}
