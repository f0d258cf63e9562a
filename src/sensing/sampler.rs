// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the printer-thermal project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Cooperative sampling tasks
//!
//! Each configured sensor runs in its own tokio task: the connect sequence
//! once, then a loop that takes a sample and sleeps until the absolute wake
//! time the driver returned. Bus failures are fatal to the task (retry and
//! backoff policy belongs to the bus layer); the failure is recorded in
//! shared state and propagated.

use anyhow::Result;
use log::{error, info};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::{SensorConfig, TemperatureSensingConfig};
use crate::sensing::clock::PrintTimeClock;
use crate::sensing::registry::SensorRegistry;
use crate::sensing::shared_state::{SamplerStatus, SharedSensingState};
use crate::sensing::{
    create_bus_driver, share_bus, SensorContext, TemperatureCallback, TemperatureSensor,
};

/// Commands that can be sent to a running sampler task
#[derive(Debug, Clone)]
pub enum SamplerCommand {
    /// Update the stored temperature bounds
    UpdateMinMax { min_temp: f64, max_temp: f64 },
    /// Stop the sampler
    Stop,
}

/// Sampling task for a single sensor
pub struct SensorSampler {
    /// Sensor configuration section
    config: SensorConfig,
    /// Driver instance, moved into the task on start
    sensor: Option<Box<dyn TemperatureSensor>>,
    /// Shared state for readings and status
    shared_state: SharedSensingState,
    /// Clock used for scheduling and print-time conversion
    clock: Arc<dyn PrintTimeClock + Send + Sync>,
    /// Running flag shared across the service
    running: Arc<AtomicBool>,
    /// Task handle for this sampler
    task_handle: Option<JoinHandle<Result<()>>>,
    /// Command sender to the sampler task
    command_sender: Option<mpsc::UnboundedSender<SamplerCommand>>,
}

impl SensorSampler {
    /// Create a sampler for a configured sensor and register it in shared
    /// state
    pub async fn new(
        config: SensorConfig,
        sensor: Box<dyn TemperatureSensor>,
        shared_state: SharedSensingState,
        clock: Arc<dyn PrintTimeClock + Send + Sync>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        {
            let mut state = shared_state.write().await;
            state.initialize_sensor(
                config.name.clone(),
                config.sensor_type.clone(),
                config.min_temp,
                config.max_temp,
            )?;
        }

        Ok(Self {
            config,
            sensor: Some(sensor),
            shared_state,
            clock,
            running,
            task_handle: None,
            command_sender: None,
        })
    }

    /// Start the sampling loop in its own task
    pub fn start(&mut self) -> Result<()> {
        let name = self.config.name.clone();
        let mut sensor = self
            .sensor
            .take()
            .ok_or_else(|| anyhow::anyhow!("Sampler for '{}' already started", name))?;

        info!(
            "Starting sampler for sensor '{}' (report interval {} s)",
            name,
            sensor.get_report_time_delta()
        );

        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<SamplerCommand>();
        self.command_sender = Some(command_tx);

        let shared_state = self.shared_state.clone();
        let clock = self.clock.clone();
        let running = self.running.clone();

        let handle = tokio::spawn(async move {
            // Connect sequence: identity reads happen exactly once, before
            // the first sample is scheduled
            if let Err(e) = sensor.handle_connect().await {
                error!("Sensor '{}' connect failed: {:?}", name, e);
                let mut state = shared_state.write().await;
                state
                    .update_sensor_status(
                        &name,
                        SamplerStatus::Error {
                            message: e.to_string(),
                        },
                    )
                    .ok();
                return Err(e);
            }

            {
                let mut state = shared_state.write().await;
                state
                    .update_sensor_status(&name, SamplerStatus::Running)
                    .ok();
            }

            // First sample fires immediately
            let mut next_wake = clock.monotonic();

            while running.load(Ordering::Relaxed) {
                let delay = (next_wake - clock.monotonic()).max(0.0);

                tokio::select! {
                    command = command_rx.recv() => {
                        match command {
                            Some(SamplerCommand::UpdateMinMax { min_temp, max_temp }) => {
                                sensor.setup_minmax(min_temp, max_temp);
                                let mut state = shared_state.write().await;
                                state.update_sensor_minmax(&name, min_temp, max_temp).ok();
                                info!(
                                    "Updated bounds for sensor '{}': {} .. {} °C",
                                    name, min_temp, max_temp
                                );
                            }
                            Some(SamplerCommand::Stop) | None => {
                                info!("Sampler for sensor '{}' stopping", name);
                                break;
                            }
                        }
                    }

                    _ = time::sleep(Duration::from_secs_f64(delay)) => {
                        match sensor.sample().await {
                            Ok(wake_time) => {
                                let measured_time = wake_time - sensor.get_report_time_delta();
                                let status = sensor.get_status(measured_time);
                                {
                                    let mut state = shared_state.write().await;
                                    state.update_sensor_reading(
                                        &name,
                                        clock.estimated_print_time(measured_time),
                                        status.temperature,
                                    )?;
                                }
                                next_wake = wake_time;
                            }
                            Err(e) => {
                                error!("Sensor '{}' sample failed: {:?}", name, e);
                                let mut state = shared_state.write().await;
                                state
                                    .update_sensor_status(
                                        &name,
                                        SamplerStatus::Error {
                                            message: e.to_string(),
                                        },
                                    )
                                    .ok();
                                return Err(e);
                            }
                        }
                    }
                }
            }

            {
                let mut state = shared_state.write().await;
                state
                    .update_sensor_status(&name, SamplerStatus::Stopped)
                    .ok();
            }

            Ok(())
        });

        self.task_handle = Some(handle);
        Ok(())
    }

    /// Update the stored bounds of the running sampler
    pub fn update_minmax(&self, min_temp: f64, max_temp: f64) -> Result<()> {
        if let Some(ref sender) = self.command_sender {
            sender
                .send(SamplerCommand::UpdateMinMax { min_temp, max_temp })
                .map_err(|e| anyhow::anyhow!("Failed to send bounds update: {}", e))?;
            Ok(())
        } else {
            Err(anyhow::anyhow!("Sampler not started"))
        }
    }

    /// Stop this sampler and wait for its task to finish
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(ref sender) = self.command_sender {
            sender.send(SamplerCommand::Stop).ok();
        }

        if let Some(handle) = self.task_handle.take() {
            handle.await??;
        }

        Ok(())
    }
}

/// Sampling system managing one sampler per configured sensor
pub struct SamplingSystemDaemon {
    config: TemperatureSensingConfig,
    samplers: Vec<SensorSampler>,
    shared_state: SharedSensingState,
    clock: Arc<dyn PrintTimeClock + Send + Sync>,
    running: Arc<AtomicBool>,
    callback: Option<TemperatureCallback>,
}

impl SamplingSystemDaemon {
    /// Create a new sampling system daemon
    pub fn new(
        config: TemperatureSensingConfig,
        shared_state: SharedSensingState,
        clock: Arc<dyn PrintTimeClock + Send + Sync>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            samplers: Vec::new(),
            shared_state,
            clock,
            running,
            callback: None,
        }
    }

    /// Register the heater subsystem callback, invoked with
    /// (estimated print time, Celsius) for every reading of every sensor
    pub fn set_callback(&mut self, callback: TemperatureCallback) {
        self.callback = Some(callback);
    }

    /// Instantiate drivers through the registry and start all samplers
    pub async fn start(&mut self, registry: &SensorRegistry) -> Result<()> {
        info!("Starting temperature sampling system");

        // One shared bus handle per configured bus; the mock driver gets
        // the addresses of the sensors configured on it
        let mut buses = std::collections::HashMap::new();
        for (bus_name, bus_config) in &self.config.i2c_buses {
            let addresses: Vec<u8> = self
                .config
                .sensors
                .iter()
                .filter(|s| s.enabled && s.i2c_bus == *bus_name)
                .map(|s| s.i2c_address)
                .collect();
            let driver = create_bus_driver(bus_config, &addresses)?;
            buses.insert(bus_name.clone(), share_bus(driver));
        }

        for sensor_config in &self.config.sensors {
            if !sensor_config.enabled {
                info!("Skipping disabled sensor '{}'", sensor_config.name);
                continue;
            }

            let bus = buses
                .get(&sensor_config.i2c_bus)
                .cloned()
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "I2C bus '{}' not found for sensor '{}'",
                        sensor_config.i2c_bus,
                        sensor_config.name
                    )
                })?;

            let mut sensor = registry.create(SensorContext {
                config: sensor_config.clone(),
                bus,
                clock: self.clock.clone(),
            })?;

            sensor.setup_minmax(sensor_config.min_temp, sensor_config.max_temp);
            if let Some(callback) = &self.callback {
                sensor.setup_callback(callback.clone());
            }

            let mut sampler = SensorSampler::new(
                sensor_config.clone(),
                sensor,
                self.shared_state.clone(),
                self.clock.clone(),
                self.running.clone(),
            )
            .await?;

            sampler.start()?;
            self.samplers.push(sampler);

            info!(
                "Started sampler for sensor '{}' ({})",
                sensor_config.name, sensor_config.sensor_type
            );
        }

        info!(
            "Temperature sampling system started with {} active sensors",
            self.samplers.len()
        );

        Ok(())
    }

    /// Stop all samplers
    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping temperature sampling system");

        for sampler in &mut self.samplers {
            sampler.stop().await?;
        }
        self.samplers.clear();

        info!("Temperature sampling system stopped");
        Ok(())
    }

    /// Update bounds for a specific sensor
    pub fn update_sensor_minmax(&self, name: &str, min_temp: f64, max_temp: f64) -> Result<()> {
        for sampler in &self.samplers {
            if sampler.config.name == name {
                return sampler.update_minmax(min_temp, max_temp);
            }
        }
        Err(anyhow::anyhow!("Sensor '{}' not found", name))
    }

    /// Get shared state reference
    pub fn get_shared_state(&self) -> &SharedSensingState {
        &self.shared_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::clock::HostClock;
    use crate::sensing::shared_state::create_shared_sensing_state;

    #[tokio::test]
    async fn test_sampling_system_daemon_creation() {
        let config = TemperatureSensingConfig::default();
        let shared_state = create_shared_sensing_state();
        let running = Arc::new(AtomicBool::new(true));

        let daemon = SamplingSystemDaemon::new(
            config,
            shared_state,
            Arc::new(HostClock::new()),
            running,
        );
        assert_eq!(daemon.samplers.len(), 0);
    }

    #[tokio::test]
    async fn test_unknown_bus_rejected_at_start() {
        let mut config = TemperatureSensingConfig::default();
        config.sensors[0].i2c_bus = "missing_bus".to_string();
        let shared_state = create_shared_sensing_state();
        let running = Arc::new(AtomicBool::new(true));

        let mut daemon = SamplingSystemDaemon::new(
            config,
            shared_state,
            Arc::new(HostClock::new()),
            running,
        );
        let registry = SensorRegistry::with_builtin_sensors();
        assert!(daemon.start(&registry).await.is_err());
    }
}
