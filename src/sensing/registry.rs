// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the printer-thermal project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sensor factory registry
//!
//! The host owns an explicit mapping from sensor-type name to driver
//! factory, constructed and wired at startup. Configuration sections are
//! instantiated through this registry; an unknown sensor type is a
//! configuration error.

use anyhow::Result;
use std::collections::HashMap;

use crate::sensing::mcp9808::Mcp9808;
use crate::sensing::{SensorContext, TemperatureSensor};

/// Factory building a boxed sensor driver from its wiring context
pub type SensorFactory =
    Box<dyn Fn(SensorContext) -> Result<Box<dyn TemperatureSensor>> + Send + Sync>;

/// Explicit name-to-factory sensor registry
pub struct SensorRegistry {
    factories: HashMap<String, SensorFactory>,
}

impl SensorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with every built-in sensor type registered
    pub fn with_builtin_sensors() -> Self {
        let mut registry = Self::new();
        registry.register("MCP9808", |ctx| {
            Ok(Box::new(Mcp9808::new(&ctx.config, ctx.bus, ctx.clock)))
        });
        registry
    }

    /// Register a factory under a sensor-type name
    pub fn register<F>(&mut self, sensor_type: &str, factory: F)
    where
        F: Fn(SensorContext) -> Result<Box<dyn TemperatureSensor>> + Send + Sync + 'static,
    {
        self.factories
            .insert(sensor_type.to_string(), Box::new(factory));
    }

    /// Instantiate a driver for a configured sensor section
    pub fn create(&self, ctx: SensorContext) -> Result<Box<dyn TemperatureSensor>> {
        let sensor_type = ctx.config.sensor_type.clone();
        let factory = self.factories.get(&sensor_type).ok_or_else(|| {
            let mut known: Vec<&str> = self.factories.keys().map(String::as_str).collect();
            known.sort_unstable();
            anyhow::anyhow!(
                "Unknown sensor type '{}' for sensor '{}' (registered types: {})",
                sensor_type,
                ctx.config.name,
                known.join(", ")
            )
        })?;
        factory(ctx)
    }
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::with_builtin_sensors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{I2cBusConfig, I2cBusSettings, I2cBusType, SensorConfig};
    use crate::sensing::clock::HostClock;
    use crate::sensing::drivers::mock::MockI2cDriver;
    use crate::sensing::share_bus;
    use std::sync::Arc;

    fn test_context(config: SensorConfig) -> SensorContext {
        let bus_config = I2cBusConfig {
            bus_type: I2cBusType::Mock,
            device: "mock".to_string(),
            bus_settings: I2cBusSettings::default(),
        };
        let mock = MockI2cDriver::new(&bus_config, &[config.i2c_address]).unwrap();
        SensorContext {
            config,
            bus: share_bus(Box::new(mock)),
            clock: Arc::new(HostClock::new()),
        }
    }

    #[test]
    fn test_builtin_mcp9808_factory() {
        let registry = SensorRegistry::with_builtin_sensors();
        let sensor = registry.create(test_context(SensorConfig::default())).unwrap();
        assert_eq!(sensor.name(), "chamber_temp");
        assert_eq!(sensor.get_report_time_delta(), 1.5);
    }

    #[test]
    fn test_unknown_sensor_type_rejected() {
        let registry = SensorRegistry::with_builtin_sensors();
        let config = SensorConfig {
            sensor_type: "TMP117".to_string(),
            ..SensorConfig::default()
        };
        let err = registry.create(test_context(config)).err().unwrap();
        assert!(err.to_string().contains("Unknown sensor type 'TMP117'"));
    }
}
