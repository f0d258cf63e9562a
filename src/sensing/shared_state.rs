// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the printer-thermal project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared state for the temperature sensing system
//!
//! This module provides thread-safe shared state for sensor readings,
//! including the latest value and a bounded rolling history per sensor.
//! Samplers write; status queries and the heartbeat read.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Maximum number of historical readings per sensor (1 hour at the 1.5 s
/// report interval)
pub const MAX_HISTORY_SIZE: usize = 2400;

/// Single reading in a sensor's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    /// Wall-clock timestamp of the reading
    pub timestamp: DateTime<Utc>,
    /// Estimated print time the reading was reported at
    pub estimated_print_time: f64,
    /// Temperature in Celsius
    pub temperature_celsius: f64,
}

/// Current operational status of a sampler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SamplerStatus {
    /// Sampler created, connect sequence not yet run
    Initializing,
    /// Sampling normally
    Running,
    /// Sampling stopped on an error
    Error { message: String },
    /// Sampler stopped
    Stopped,
}

/// Latest reading and history for a single sensor
#[derive(Debug, Clone)]
pub struct SensorHistory {
    /// Sensor name from the configuration
    pub name: String,
    /// Sensor type registered in the factory registry
    pub sensor_type: String,
    /// Current operational status
    pub status: SamplerStatus,
    /// Configured temperature bounds (informational)
    pub min_temp: f64,
    pub max_temp: f64,
    /// Most recent temperature in Celsius
    pub last_temperature: Option<f64>,
    /// Rolling history of readings
    pub history: VecDeque<SensorReading>,
    /// Timestamp of the last update
    pub last_update: DateTime<Utc>,
}

/// Shared sensing state across the entire service
#[derive(Debug, Default)]
pub struct SharedSensorState {
    sensors: HashMap<String, SensorHistory>,
}

/// Shared handle to the sensing state
pub type SharedSensingState = Arc<RwLock<SharedSensorState>>;

/// Create a new shared sensing state handle
pub fn create_shared_sensing_state() -> SharedSensingState {
    Arc::new(RwLock::new(SharedSensorState::default()))
}

impl SharedSensorState {
    /// Register a sensor before its sampler starts
    pub fn initialize_sensor(
        &mut self,
        name: String,
        sensor_type: String,
        min_temp: f64,
        max_temp: f64,
    ) -> Result<()> {
        let history = SensorHistory {
            name: name.clone(),
            sensor_type,
            status: SamplerStatus::Initializing,
            min_temp,
            max_temp,
            last_temperature: None,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            last_update: Utc::now(),
        };

        self.sensors.insert(name, history);
        Ok(())
    }

    /// Record a new reading for a sensor
    pub fn update_sensor_reading(
        &mut self,
        name: &str,
        estimated_print_time: f64,
        temperature_celsius: f64,
    ) -> Result<()> {
        let sensor = self
            .sensors
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("Sensor '{}' not found", name))?;

        let reading = SensorReading {
            timestamp: Utc::now(),
            estimated_print_time,
            temperature_celsius,
        };

        sensor.history.push_back(reading);
        if sensor.history.len() > MAX_HISTORY_SIZE {
            sensor.history.pop_front();
        }

        sensor.last_temperature = Some(temperature_celsius);
        sensor.last_update = Utc::now();
        sensor.status = SamplerStatus::Running;

        Ok(())
    }

    /// Update a sensor's operational status
    pub fn update_sensor_status(&mut self, name: &str, status: SamplerStatus) -> Result<()> {
        let sensor = self
            .sensors
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("Sensor '{}' not found", name))?;
        sensor.status = status;
        sensor.last_update = Utc::now();
        Ok(())
    }

    /// Update a sensor's configured bounds
    pub fn update_sensor_minmax(&mut self, name: &str, min_temp: f64, max_temp: f64) -> Result<()> {
        let sensor = self
            .sensors
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("Sensor '{}' not found", name))?;
        sensor.min_temp = min_temp;
        sensor.max_temp = max_temp;
        sensor.last_update = Utc::now();
        Ok(())
    }

    /// Look up a single sensor
    pub fn get_sensor(&self, name: &str) -> Option<&SensorHistory> {
        self.sensors.get(name)
    }

    /// All registered sensors
    pub fn sensors(&self) -> &HashMap<String, SensorHistory> {
        &self.sensors
    }

    /// Number of sensors currently in the Running state
    pub fn running_count(&self) -> usize {
        self.sensors
            .values()
            .filter(|s| s.status == SamplerStatus::Running)
            .count()
    }
}
