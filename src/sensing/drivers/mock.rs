// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the printer-thermal project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Mock I2C driver emulating MCP9808 temperature sensors
//!
//! This module provides a mock I2C bus that answers MCP9808 register reads
//! from a small ambient thermal model. It backs the test suite and
//! `--simulate` runs. Every read is appended to a transaction log so tests
//! can assert on transaction ordering.

use crate::config::I2cBusConfig;
use crate::sensing::I2cBusDriver;
use anyhow::{anyhow, Result};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Room temperature the thermal model relaxes toward, in Celsius
const ROOM_TEMP_C: f64 = 25.0;

/// Relaxation time constant toward room temperature, in seconds
const AMBIENT_TIME_CONSTANT_S: f64 = 300.0;

/// MCP9808 manufacturer ID register value
const MANUFACTURER_ID: u16 = 0x0054;

/// MCP9808 device ID register value (device 0x04, revision 0x00)
const DEVICE_ID: u16 = 0x0400;

/// One recorded bus read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusTransaction {
    pub address: u8,
    pub register: u8,
    pub length: usize,
}

/// Shared transaction log handle
pub type TransactionLog = Arc<Mutex<Vec<BusTransaction>>>;

/// Mock I2C bus with MCP9808 devices at configured addresses
pub struct MockI2cDriver {
    /// Emulated devices mapped by bus address
    devices: HashMap<u8, MockDevice>,

    /// Thermal model shared by all devices on this bus
    simulation: Arc<Mutex<AmbientSimulation>>,

    /// Reads recorded in arrival order
    transactions: TransactionLog,
}

/// Mock MCP9808 device state
#[derive(Debug, Default)]
struct MockDevice {
    /// Last value written to the configuration register
    config_register: u16,
}

/// First-order thermal model: the emulated sensor temperature relaxes
/// toward a target with a fixed time constant
#[derive(Debug)]
pub struct AmbientSimulation {
    temperature: f64,
    target_temperature: f64,
    last_update: Instant,
}

impl AmbientSimulation {
    fn new() -> Self {
        Self {
            temperature: ROOM_TEMP_C,
            target_temperature: ROOM_TEMP_C,
            last_update: Instant::now(),
        }
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;

        if dt > 0.0 && dt < 10.0 {
            let lag = 1.0 - (-dt / AMBIENT_TIME_CONSTANT_S).exp();
            self.temperature += (self.target_temperature - self.temperature) * lag;
        }
    }

    /// Pin the model to a fixed temperature
    fn set_temperature(&mut self, temp_c: f64) {
        self.temperature = temp_c;
        self.target_temperature = temp_c;
    }
}

/// Encode a Celsius value into the MCP9808 ambient register word:
/// 1/16 °C units in bits 0-11, bit 12 set for negative values
fn encode_ambient(temp_c: f64) -> u16 {
    let t = temp_c.clamp(-128.0, 255.9);
    if t < 0.0 {
        0x1000 | ((((t + 256.0) * 16.0).round() as u16) & 0x0fff)
    } else {
        ((t * 16.0).round() as u16) & 0x0fff
    }
}

impl MockI2cDriver {
    /// Create a mock bus with MCP9808 devices at the given addresses
    pub fn new(_config: &I2cBusConfig, addresses: &[u8]) -> Result<Self> {
        let devices = addresses
            .iter()
            .map(|&address| (address, MockDevice::default()))
            .collect();

        Ok(Self {
            devices,
            simulation: Arc::new(Mutex::new(AmbientSimulation::new())),
            transactions: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Pin the emulated sensor temperature
    pub fn set_temperature(&self, temp_c: f64) -> Result<()> {
        let mut simulation = self
            .simulation
            .lock()
            .map_err(|_| anyhow!("Failed to lock thermal simulation"))?;
        simulation.set_temperature(temp_c);
        Ok(())
    }

    /// Current emulated temperature
    pub fn get_current_temperature(&self) -> Result<f64> {
        let simulation = self
            .simulation
            .lock()
            .map_err(|_| anyhow!("Failed to lock thermal simulation"))?;
        Ok(simulation.temperature)
    }

    /// Handle to the transaction log; clones stay valid after the driver
    /// is boxed behind the bus trait
    pub fn transaction_log(&self) -> TransactionLog {
        self.transactions.clone()
    }

    fn read_device_register(
        &self,
        device: &MockDevice,
        register: u8,
        length: usize,
    ) -> Result<Vec<u8>> {
        match register {
            0x01 => Ok(device.config_register.to_be_bytes().to_vec()),
            0x05 => {
                // Ambient temperature register
                let mut simulation = self
                    .simulation
                    .lock()
                    .map_err(|_| anyhow!("Failed to lock thermal simulation"))?;
                simulation.update();
                let word = encode_ambient(simulation.temperature);
                Ok(word.to_be_bytes().to_vec())
            }
            0x06 => Ok(MANUFACTURER_ID.to_be_bytes().to_vec()),
            0x07 => Ok(DEVICE_ID.to_be_bytes().to_vec()),
            _ => Err(anyhow!(
                "Unsupported register 0x{:02X} for MCP9808, length {}",
                register,
                length
            )),
        }
    }
}

#[async_trait::async_trait]
impl I2cBusDriver for MockI2cDriver {
    async fn read(&mut self, address: u8, register: u8, length: usize) -> Result<Vec<u8>> {
        self.transactions
            .lock()
            .map_err(|_| anyhow!("Failed to lock transaction log"))?
            .push(BusTransaction {
                address,
                register,
                length,
            });

        let device = self
            .devices
            .get(&address)
            .ok_or_else(|| anyhow!("Device not found at address 0x{:02X}", address))?;

        self.read_device_register(device, register, length)
    }

    async fn write(&mut self, address: u8, register: u8, data: &[u8]) -> Result<()> {
        debug!(
            "I2C write to address=0x{:02X}, register=0x{:02X}, data={:?}",
            address, register, data
        );

        let device = self
            .devices
            .get_mut(&address)
            .ok_or_else(|| anyhow!("Device not found at address 0x{:02X}", address))?;

        match register {
            0x01 => {
                // Configuration register: accepted and remembered, the mock
                // stays in continuous-conversion mode regardless
                if data.len() >= 2 {
                    device.config_register = u16::from_be_bytes([data[0], data[1]]);
                }
                Ok(())
            }
            _ => Err(anyhow!(
                "Unsupported write to register 0x{:02X} for MCP9808",
                register
            )),
        }
    }

    async fn device_present(&mut self, address: u8) -> Result<bool> {
        Ok(self.devices.contains_key(&address))
    }
}
