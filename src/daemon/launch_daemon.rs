// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the printer-thermal project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! This module provides functionality for running and managing background
//! tasks in the temperature sensing application. It handles the lifecycle of:
//!
//! - The temperature sampling system (one task per configured sensor)
//! - System health monitoring (heartbeat)
//!
//! The daemon system allows for graceful startup and shutdown of these
//! services, with proper error handling and task coordination.
//!
//! ## Architecture
//!
//! The daemon uses Tokio's asynchronous runtime to manage concurrent tasks.
//! Each service runs as an independent task; the main daemon structure tracks
//! and coordinates them through a shared running flag.

use anyhow::Result;
use log::{debug, info};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::Config;
use crate::sensing::clock::HostClock;
use crate::sensing::registry::SensorRegistry;
use crate::sensing::sampler::SamplingSystemDaemon;
use crate::sensing::shared_state::{create_shared_sensing_state, SharedSensingState};

/// Daemon task manager coordinating the background services
///
/// The `running` flag is wrapped in an `Arc` so it can be shared between
/// tasks; each task checks it periodically to determine whether to continue
/// or gracefully terminate. The shared sensing state is readable by status
/// consumers while samplers keep writing to it.
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    shared_state: SharedSensingState,
    sampling_system: Option<SamplingSystemDaemon>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance with an empty task list and the running
    /// flag set to `true`
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            shared_state: create_shared_sensing_state(),
            sampling_system: None,
        }
    }

    /// Launch all configured tasks based on configuration
    ///
    /// The sampling system is started when `config.sensing.enabled` is set;
    /// the heartbeat task is always started.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        if config.sensing.enabled {
            self.start_sampling_system(config).await?;
        } else {
            info!("Temperature sensing disabled in configuration");
        }

        self.start_heartbeat(config)?;

        Ok(())
    }

    /// Start the temperature sampling system
    ///
    /// Drivers are instantiated through the sensor registry and each one is
    /// given the heater-subsystem callback; readings also land in the shared
    /// sensing state for status queries.
    async fn start_sampling_system(&mut self, config: &Config) -> Result<()> {
        let registry = SensorRegistry::with_builtin_sensors();
        let mut sampling_system = SamplingSystemDaemon::new(
            config.sensing.clone(),
            self.shared_state.clone(),
            Arc::new(HostClock::new()),
            self.running.clone(),
        );

        // Reference heater-subsystem callback: a real controller registers
        // its heater control entry point here
        sampling_system.set_callback(Arc::new(|print_time, temperature| {
            debug!(
                "Temperature report: {:.2} °C at print time {:.3}",
                temperature, print_time
            );
        }));

        sampling_system.start(&registry).await?;
        self.sampling_system = Some(sampling_system);
        Ok(())
    }

    /// Start the heartbeat monitor task
    fn start_heartbeat(&mut self, config: &Config) -> Result<()> {
        info!("Starting heartbeat monitor");

        let interval = Duration::from_secs(config.service.heartbeat_interval_s.max(1));
        let running = self.running.clone();
        let shared_state = self.shared_state.clone();
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                {
                    let state = shared_state.read().await;
                    debug!(
                        "Daemon heartbeat: {} of {} sensors running",
                        state.running_count(),
                        state.sensors().len()
                    );
                }
                time::sleep(interval).await;
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Access the shared sensing state
    pub fn shared_state(&self) -> &SharedSensingState {
        &self.shared_state
    }

    /// Signal all tasks to terminate gracefully
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        // Tasks should check the running flag and terminate gracefully
    }

    /// Wait for all tasks to complete
    ///
    /// Consumes the daemon and waits for all spawned tasks to finish
    /// execution. Call after `shutdown()` for a clean application exit.
    /// Task panics are logged but do not fail the join.
    pub async fn join(mut self) -> Result<()> {
        if let Some(mut sampling_system) = self.sampling_system.take() {
            sampling_system.stop().await?;
        }

        for task in self.tasks {
            match tokio::time::timeout(Duration::from_secs(5), task).await {
                Ok(result) => {
                    if let Err(e) = result {
                        log::error!("Task panicked: {}", e);
                    }
                }
                Err(_) => {
                    // Task didn't complete within timeout
                    log::warn!("Task did not complete within timeout period, may be hung");
                }
            }
        }
        Ok(())
    }
}
