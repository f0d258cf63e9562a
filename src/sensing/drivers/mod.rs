// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the printer-thermal project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! I2C bus drivers
//!
//! This module provides the I2C bus driver implementations:
//! - Native: direct access to Linux I2C hardware (stub; the real bus
//!   transaction layer lives outside this crate)
//! - Mock: MCP9808 register-level emulation for tests and simulation

pub mod mock;
pub mod native;

pub use mock::MockI2cDriver;
pub use native::NativeI2cDriver;
