// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the printer-thermal project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! MCP9808 digital temperature sensor driver
//!
//! The MCP9808 provides ambient temperature readings with 0.0625 °C
//! resolution over I2C. On connect the driver reads and logs the
//! manufacturer and device ID registers; afterwards the sampling loop
//! invokes [`Mcp9808::sample`] once per report interval.
//!
//! Ambient temperature register format (0x05), big-endian 16-bit word:
//! bits 0-11 hold the magnitude in 1/16 °C units, bit 12 flags a negative
//! value (subtract 256.0), bits 13-15 are alert status flags and are
//! ignored here.

use anyhow::Result;
use log::info;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SensorConfig;
use crate::sensing::clock::PrintTimeClock;
use crate::sensing::{SensorStatus, SharedI2cBus, TemperatureCallback, TemperatureSensor};

/// Interval between successive samples, in seconds
pub const REPORT_TIME: f64 = 1.5;

/// MCP9808 default I2C address
pub const DEFAULT_ADDR: u8 = 0x18;

/// Pause before reading the ambient register, covering sensor conversion
const CONVERSION_PAUSE: Duration = Duration::from_millis(100);

const MCP9808_REG_AMBIENT_TEMP: u8 = 0x05;
const MCP9808_REG_MANUF_ID: u8 = 0x06;
const MCP9808_REG_DEVICE_ID: u8 = 0x07;

/// Decode the ambient temperature register word to Celsius
pub fn decode_ambient(word: u16) -> f64 {
    let mut temp = (word & 0x0fff) as f64 / 16.0;
    if word & 0x1000 != 0 {
        temp -= 256.0;
    }
    temp
}

/// MCP9808 sensor driver instance
///
/// The temperature field is written only by [`Mcp9808::sample`]; status
/// queries return the last stored value without any I/O.
pub struct Mcp9808 {
    name: String,
    bus: SharedI2cBus,
    address: u8,
    clock: Arc<dyn PrintTimeClock + Send + Sync>,
    min_temp: f64,
    max_temp: f64,
    temp: f64,
    callback: Option<TemperatureCallback>,
}

impl Mcp9808 {
    /// Create a driver instance for one configured sensor section
    pub fn new(
        config: &SensorConfig,
        bus: SharedI2cBus,
        clock: Arc<dyn PrintTimeClock + Send + Sync>,
    ) -> Self {
        Self {
            name: config.name.clone(),
            bus,
            address: config.i2c_address,
            clock,
            min_temp: config.min_temp,
            max_temp: config.max_temp,
            temp: 0.0,
            callback: None,
        }
    }

    /// Read a 2-byte register and decode it as a big-endian unsigned word
    async fn read_register(&self, register: u8) -> Result<u16> {
        let mut bus = self.bus.write().await;
        let response = bus.read(self.address, register, 2).await?;
        if response.len() < 2 {
            anyhow::bail!(
                "Short I2C response from register 0x{:02X}: {} bytes",
                register,
                response.len()
            );
        }
        Ok(u16::from_be_bytes([response[0], response[1]]))
    }
}

#[async_trait::async_trait]
impl TemperatureSensor for Mcp9808 {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle_connect(&mut self) -> Result<()> {
        let manufacturer_id = self.read_register(MCP9808_REG_MANUF_ID).await?;
        let device_id = self.read_register(MCP9808_REG_DEVICE_ID).await?;
        info!(
            "MCP9808 '{}' manufacturer ID: 0x{:04X}",
            self.name, manufacturer_id
        );
        info!("MCP9808 '{}' device ID: 0x{:04X}", self.name, device_id);
        Ok(())
    }

    async fn sample(&mut self) -> Result<f64> {
        // Cooperative suspension point covering the sensor conversion time
        tokio::time::sleep(CONVERSION_PAUSE).await;

        let word = self.read_register(MCP9808_REG_AMBIENT_TEMP).await?;
        self.temp = decode_ambient(word);

        let measured_time = self.clock.monotonic();
        if let Some(callback) = &self.callback {
            callback(self.clock.estimated_print_time(measured_time), self.temp);
        }
        Ok(measured_time + REPORT_TIME)
    }

    fn setup_minmax(&mut self, min_temp: f64, max_temp: f64) {
        self.min_temp = min_temp;
        self.max_temp = max_temp;
    }

    fn setup_callback(&mut self, callback: TemperatureCallback) {
        self.callback = Some(callback);
    }

    fn get_report_time_delta(&self) -> f64 {
        REPORT_TIME
    }

    fn get_status(&self, _eventtime: f64) -> SensorStatus {
        SensorStatus {
            temperature: (self.temp * 100.0).round() / 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{I2cBusConfig, I2cBusSettings, I2cBusType};
    use crate::sensing::clock::HostClock;
    use crate::sensing::drivers::mock::MockI2cDriver;
    use crate::sensing::share_bus;
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    fn mock_bus_config() -> I2cBusConfig {
        I2cBusConfig {
            bus_type: I2cBusType::Mock,
            device: "mock".to_string(),
            bus_settings: I2cBusSettings::default(),
        }
    }

    fn test_sensor(mock: MockI2cDriver) -> Mcp9808 {
        Mcp9808::new(
            &SensorConfig::default(),
            share_bus(Box::new(mock)),
            Arc::new(HostClock::new()),
        )
    }

    #[test]
    fn test_decode_positive() {
        // 400 sixteenths of a degree
        assert_relative_eq!(decode_ambient(0x0190), 25.0);
        assert_relative_eq!(decode_ambient(0x0001), 0.0625);
        assert_relative_eq!(decode_ambient(0x0000), 0.0);
    }

    #[test]
    fn test_decode_negative() {
        // Sign flag set, magnitude 0xF00 = 3840: 3840/16 - 256 = -16.0
        assert_relative_eq!(decode_ambient(0x1F00), -16.0);
        assert_relative_eq!(decode_ambient(0x1FFF), -0.0625);
    }

    #[test]
    fn test_decode_ignores_alert_flags() {
        // Bits 13-15 must not affect the value
        assert_relative_eq!(decode_ambient(0xE190), 25.0);
    }

    #[test]
    fn test_report_time_delta() {
        let mock = MockI2cDriver::new(&mock_bus_config(), &[DEFAULT_ADDR]).unwrap();
        let sensor = test_sensor(mock);
        assert_eq!(sensor.get_report_time_delta(), 1.5);
    }

    #[tokio::test]
    async fn test_status_rounds_to_two_decimals() {
        let mock = MockI2cDriver::new(&mock_bus_config(), &[DEFAULT_ADDR]).unwrap();
        // 30.1 quantizes to 30.125 on the sensor, which rounds to 30.13
        mock.set_temperature(30.1).unwrap();
        let mut sensor = test_sensor(mock);

        sensor.sample().await.unwrap();
        assert_relative_eq!(sensor.get_status(0.0).temperature, 30.13);
    }

    #[tokio::test]
    async fn test_status_is_idempotent_between_samples() {
        let mock = MockI2cDriver::new(&mock_bus_config(), &[DEFAULT_ADDR]).unwrap();
        mock.set_temperature(25.0).unwrap();
        let mut sensor = test_sensor(mock);

        sensor.sample().await.unwrap();
        let first = sensor.get_status(0.0);
        let second = sensor.get_status(100.0);
        assert_eq!(first, second);
        assert_relative_eq!(first.temperature, 25.0);
    }

    #[tokio::test]
    async fn test_sample_returns_measured_time_plus_report_time() {
        let mock = MockI2cDriver::new(&mock_bus_config(), &[DEFAULT_ADDR]).unwrap();
        mock.set_temperature(25.0).unwrap();
        let clock = Arc::new(HostClock::new());
        let mut sensor = Mcp9808::new(
            &SensorConfig::default(),
            share_bus(Box::new(mock)),
            clock.clone(),
        );

        let before = clock.monotonic();
        let next_wake = sensor.sample().await.unwrap();
        let after = clock.monotonic();

        assert!(next_wake >= before + REPORT_TIME);
        assert!(next_wake <= after + REPORT_TIME);
    }

    #[tokio::test]
    async fn test_callback_receives_time_and_temperature() {
        let mock = MockI2cDriver::new(&mock_bus_config(), &[DEFAULT_ADDR]).unwrap();
        mock.set_temperature(-16.0).unwrap();
        let mut sensor = test_sensor(mock);

        let reports: Arc<Mutex<Vec<(f64, f64)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        sensor.setup_callback(Arc::new(move |print_time, temp| {
            sink.lock().unwrap().push((print_time, temp));
        }));

        sensor.sample().await.unwrap();

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        let (print_time, temp) = reports[0];
        assert!(print_time > 0.0);
        assert_relative_eq!(temp, -16.0);
    }

    #[tokio::test]
    async fn test_identity_registers_read_once_before_sampling() {
        let mock = MockI2cDriver::new(&mock_bus_config(), &[DEFAULT_ADDR]).unwrap();
        mock.set_temperature(25.0).unwrap();
        let log = mock.transaction_log();
        let mut sensor = test_sensor(mock);

        sensor.handle_connect().await.unwrap();
        sensor.sample().await.unwrap();
        sensor.sample().await.unwrap();

        let log = log.lock().unwrap();
        let registers: Vec<u8> = log.iter().map(|t| t.register).collect();
        assert_eq!(
            registers,
            vec![
                MCP9808_REG_MANUF_ID,
                MCP9808_REG_DEVICE_ID,
                MCP9808_REG_AMBIENT_TEMP,
                MCP9808_REG_AMBIENT_TEMP
            ]
        );
    }

    #[tokio::test]
    async fn test_sample_propagates_bus_errors() {
        // No device at the sensor's address: the bus error must surface
        let mock = MockI2cDriver::new(&mock_bus_config(), &[]).unwrap();
        let mut sensor = test_sensor(mock);

        assert!(sensor.sample().await.is_err());
    }

    #[tokio::test]
    async fn test_setup_minmax_stores_bounds_without_enforcing() {
        let mock = MockI2cDriver::new(&mock_bus_config(), &[DEFAULT_ADDR]).unwrap();
        mock.set_temperature(150.0).unwrap();
        let mut sensor = test_sensor(mock);
        sensor.setup_minmax(0.0, 120.0);

        // Out-of-bounds readings still sample and report; enforcement is
        // the heater subsystem's responsibility
        assert!(sensor.sample().await.is_ok());
        assert!(sensor.get_status(0.0).temperature > 120.0);
    }
}
