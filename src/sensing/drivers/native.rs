// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the printer-thermal project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Native I2C driver for Linux hardware
//!
//! This module provides a native I2C driver that communicates directly
//! with Linux I2C hardware through /dev/i2c-* devices.

use crate::sensing::I2cBusDriver;
use anyhow::{anyhow, Result};

/// Native Linux I2C driver
pub struct NativeI2cDriver {
    device_path: String,
}

impl NativeI2cDriver {
    /// Create a new native I2C driver
    pub fn new(device_path: &str) -> Result<Self> {
        // TODO: open the /dev/i2c-* device node and keep the descriptor
        Ok(Self {
            device_path: device_path.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl I2cBusDriver for NativeI2cDriver {
    async fn read(&mut self, _address: u8, _register: u8, _length: usize) -> Result<Vec<u8>> {
        // TODO: combined write-then-read transaction via the I2C_RDWR ioctl
        Err(anyhow!(
            "Native I2C driver not yet implemented ({})",
            self.device_path
        ))
    }

    async fn write(&mut self, _address: u8, _register: u8, _data: &[u8]) -> Result<()> {
        // TODO: register write via the I2C_RDWR ioctl
        Err(anyhow!(
            "Native I2C driver not yet implemented ({})",
            self.device_path
        ))
    }

    async fn device_present(&mut self, _address: u8) -> Result<bool> {
        // TODO: zero-length probe write, the i2cdetect approach
        Err(anyhow!(
            "Native I2C driver not yet implemented ({})",
            self.device_path
        ))
    }
}
