// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the printer-thermal project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Temperature sensing system
//!
//! This module provides the temperature sensing subsystem:
//! - I2C bus abstraction (native and mock drivers)
//! - The MCP9808 sensor driver
//! - A sensor-factory registry for configuration-driven instantiation
//! - Cooperative per-sensor sampling tasks and shared status state

pub mod clock;
pub mod drivers;
pub mod mcp9808;
pub mod registry;
pub mod sampler;
pub mod shared_state;

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::{I2cBusConfig, I2cBusType};
use clock::PrintTimeClock;

/// I2C bus driver trait for hardware abstraction
///
/// A register read is a bus transaction writing the register address then
/// reading `length` bytes back. Failure semantics (NACK, timeout, retry)
/// belong to the implementation; callers propagate errors unmodified.
#[async_trait::async_trait]
pub trait I2cBusDriver {
    /// Read data from an I2C device register
    async fn read(&mut self, address: u8, register: u8, length: usize) -> Result<Vec<u8>>;

    /// Write data to an I2C device register
    async fn write(&mut self, address: u8, register: u8, data: &[u8]) -> Result<()>;

    /// Check if a device is present on the bus
    async fn device_present(&mut self, address: u8) -> Result<bool>;
}

/// Shared handle to an I2C bus, one transaction at a time
pub type SharedI2cBus = Arc<RwLock<Box<dyn I2cBusDriver + Send + Sync>>>;

/// Create the appropriate I2C bus driver based on configuration
///
/// `sensor_addresses` lists the device addresses configured on this bus;
/// the mock driver emulates a device at each of them.
pub fn create_bus_driver(
    config: &I2cBusConfig,
    sensor_addresses: &[u8],
) -> Result<Box<dyn I2cBusDriver + Send + Sync>> {
    match config.bus_type {
        I2cBusType::Native => Ok(Box::new(drivers::native::NativeI2cDriver::new(
            &config.device,
        )?)),
        I2cBusType::Mock => Ok(Box::new(drivers::mock::MockI2cDriver::new(
            config,
            sensor_addresses,
        )?)),
    }
}

/// Wrap a bus driver in the shared handle used by sensors
pub fn share_bus(driver: Box<dyn I2cBusDriver + Send + Sync>) -> SharedI2cBus {
    Arc::new(RwLock::new(driver))
}

/// Callback invoked with each new reading: (estimated print time, Celsius)
pub type TemperatureCallback = Arc<dyn Fn(f64, f64) + Send + Sync>;

/// Status returned by a sensor's status query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorStatus {
    /// Last sampled temperature in Celsius, rounded to 2 decimal places
    pub temperature: f64,
}

/// Interface every temperature sensor driver exposes to the host
///
/// The host wires bounds and the heater callback before sampling starts;
/// the sampling loop drives `handle_connect` once and then `sample`
/// repeatedly, sleeping until the absolute wake time each call returns.
#[async_trait::async_trait]
pub trait TemperatureSensor: Send {
    /// Sensor name from the configuration section
    fn name(&self) -> &str;

    /// Connect-time identification, invoked once before the first sample
    async fn handle_connect(&mut self) -> Result<()>;

    /// Take one sample and return the next absolute wake time, in seconds
    /// of the monotonic clock domain
    async fn sample(&mut self) -> Result<f64>;

    /// Store the expected temperature bounds (informational)
    fn setup_minmax(&mut self, min_temp: f64, max_temp: f64);

    /// Register the heater subsystem callback
    fn setup_callback(&mut self, callback: TemperatureCallback);

    /// Fixed interval between successive samples, in seconds
    fn get_report_time_delta(&self) -> f64;

    /// Last sampled temperature, without triggering any I/O
    fn get_status(&self, eventtime: f64) -> SensorStatus;
}

/// Everything a sensor factory needs to build a driver instance
pub struct SensorContext {
    /// Sensor section from the configuration
    pub config: crate::config::SensorConfig,
    /// Bus the sensor lives on
    pub bus: SharedI2cBus,
    /// Monotonic clock and print-time estimation
    pub clock: Arc<dyn PrintTimeClock + Send + Sync>,
}
