use anyhow::Result;
use printer_thermal::config::TemperatureSensingConfig;
use printer_thermal::sensing::clock::HostClock;
use printer_thermal::sensing::registry::SensorRegistry;
use printer_thermal::sensing::sampler::SamplingSystemDaemon;
use printer_thermal::sensing::shared_state::{create_shared_sensing_state, SamplerStatus};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// End-to-end sampling over the mock bus: the first sample is scheduled
/// immediately, lands in shared state and reaches the heater callback.
#[tokio::test]
async fn test_sampling_system_reports_readings() -> Result<()> {
    let config = TemperatureSensingConfig::default();
    let sensor_name = config.sensors[0].name.clone();
    let shared_state = create_shared_sensing_state();
    let running = Arc::new(AtomicBool::new(true));

    let mut daemon = SamplingSystemDaemon::new(
        config,
        shared_state.clone(),
        Arc::new(HostClock::new()),
        running,
    );

    let reports: Arc<Mutex<Vec<(f64, f64)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = reports.clone();
    daemon.set_callback(Arc::new(move |print_time, temperature| {
        sink.lock().unwrap().push((print_time, temperature));
    }));

    let registry = SensorRegistry::with_builtin_sensors();
    daemon.start(&registry).await?;

    // The first sample fires immediately, delayed only by the 0.1 s
    // conversion pause
    tokio::time::sleep(Duration::from_millis(600)).await;

    {
        let state = shared_state.read().await;
        let sensor = state.get_sensor(&sensor_name).expect("sensor registered");
        assert_eq!(sensor.status, SamplerStatus::Running);
        // Mock bus idles at room temperature
        assert_eq!(sensor.last_temperature, Some(25.0));
        assert!(!sensor.history.is_empty());
    }

    {
        let reports = reports.lock().unwrap();
        assert!(!reports.is_empty());
        let (print_time, temperature) = reports[0];
        assert!(print_time >= 0.0);
        assert_eq!(temperature, 25.0);
    }

    daemon.stop().await?;

    let state = shared_state.read().await;
    let sensor = state.get_sensor(&sensor_name).expect("sensor registered");
    assert_eq!(sensor.status, SamplerStatus::Stopped);

    Ok(())
}

/// Disabled sensor sections are skipped entirely.
#[tokio::test]
async fn test_disabled_sensor_not_sampled() -> Result<()> {
    let mut config = TemperatureSensingConfig::default();
    config.sensors[0].enabled = false;
    let sensor_name = config.sensors[0].name.clone();
    let shared_state = create_shared_sensing_state();
    let running = Arc::new(AtomicBool::new(true));

    let mut daemon = SamplingSystemDaemon::new(
        config,
        shared_state.clone(),
        Arc::new(HostClock::new()),
        running,
    );
    let registry = SensorRegistry::with_builtin_sensors();
    daemon.start(&registry).await?;

    tokio::time::sleep(Duration::from_millis(200)).await;

    let state = shared_state.read().await;
    assert!(state.get_sensor(&sensor_name).is_none());

    daemon.stop().await?;
    Ok(())
}

/// Runtime bounds updates reach the sampler and the shared state.
#[tokio::test]
async fn test_minmax_update_reaches_shared_state() -> Result<()> {
    let config = TemperatureSensingConfig::default();
    let sensor_name = config.sensors[0].name.clone();
    let shared_state = create_shared_sensing_state();
    let running = Arc::new(AtomicBool::new(true));

    let mut daemon = SamplingSystemDaemon::new(
        config,
        shared_state.clone(),
        Arc::new(HostClock::new()),
        running,
    );
    let registry = SensorRegistry::with_builtin_sensors();
    daemon.start(&registry).await?;

    daemon.update_sensor_minmax(&sensor_name, 5.0, 95.0)?;
    tokio::time::sleep(Duration::from_millis(300)).await;

    {
        let state = shared_state.read().await;
        let sensor = state.get_sensor(&sensor_name).expect("sensor registered");
        assert_eq!(sensor.min_temp, 5.0);
        assert_eq!(sensor.max_temp, 95.0);
    }

    // Unknown sensors are rejected
    assert!(daemon.update_sensor_minmax("ghost", 0.0, 1.0).is_err());

    daemon.stop().await?;
    Ok(())
}
