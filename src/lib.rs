// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the printer-thermal project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Host-side temperature sensing for 3D printer controllers
//!
//! This crate periodically samples MCP9808 I2C temperature sensors and
//! reports readings to a heater/thermal subsystem callback. It provides:
//! - The MCP9808 sensor driver (register reads, fixed-point decode)
//! - An async I2C bus abstraction with mock and native drivers
//! - A cooperative sampling loop driving each sensor at its report interval
//! - An explicit sensor-factory registry wired from the configuration
//! - YAML configuration with JSON-Schema validation
//! - A daemon entry point with heartbeat and graceful shutdown

pub mod config;
pub mod daemon;
pub mod sensing;
