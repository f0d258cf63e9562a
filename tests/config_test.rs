use anyhow::Result;
use printer_thermal::config::{Config, I2cBusType, SensorConfig};
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    // Create a temporary directory
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Create a custom config
    let mut config = Config::default();
    config.sensing.sensors[0].name = "extruder_temp".to_string();
    config.sensing.sensors[0].i2c_address = 0x19;
    config.sensing.sensors[0].min_temp = 10.0;
    config.sensing.sensors[0].max_temp = 80.0;
    config.service.heartbeat_interval_s = 30;

    // Save config to file
    config.save_to_file(&config_path)?;

    // Load config from file
    let loaded_config = Config::from_file(&config_path)?;

    // Verify loaded config matches original
    assert_eq!(loaded_config.sensing.sensors.len(), 1);
    assert_eq!(loaded_config.sensing.sensors[0].name, "extruder_temp");
    assert_eq!(loaded_config.sensing.sensors[0].i2c_address, 0x19);
    assert_eq!(loaded_config.sensing.sensors[0].min_temp, 10.0);
    assert_eq!(loaded_config.sensing.sensors[0].max_temp, 80.0);
    assert_eq!(loaded_config.service.heartbeat_interval_s, 30);

    // Test loading default config for non-existent file
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;

    // Verify default config was created
    assert!(non_existent_path.exists());
    assert!(default_config.sensing.enabled);
    assert_eq!(default_config.sensing.sensors[0].i2c_address, 0x18);
    assert_eq!(default_config.sensing.sensors[0].sensor_type, "MCP9808");
    assert!(default_config.sensing.i2c_buses.contains_key("i2c0"));

    Ok(())
}

#[test]
fn test_config_apply_args() {
    let mut config = Config::default();
    assert_eq!(
        config.sensing.i2c_buses["i2c0"].bus_type,
        I2cBusType::Mock
    );

    // Simulate flag forces every bus to the mock driver
    for bus in config.sensing.i2c_buses.values_mut() {
        bus.bus_type = I2cBusType::Native;
    }
    config.apply_args(true, Some(false));

    assert_eq!(
        config.sensing.i2c_buses["i2c0"].bus_type,
        I2cBusType::Mock
    );
    assert!(!config.sensing.enabled);

    // No overrides leaves the configuration untouched
    config.apply_args(false, None);
    assert!(!config.sensing.enabled);
}

#[test]
fn test_config_validation() -> Result<()> {
    let temp_dir = tempdir()?;

    // Sensor referencing an unknown bus is rejected
    let mut config = Config::default();
    config.sensing.sensors[0].i2c_bus = "i2c9".to_string();
    let path = temp_dir.path().join("bad_bus.yaml");
    config.save_to_file(&path)?;
    let err = Config::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("unknown I2C bus"));

    // Out-of-range I2C address is rejected
    let mut config = Config::default();
    config.sensing.sensors[0].i2c_address = 0x80;
    let path = temp_dir.path().join("bad_addr.yaml");
    config.save_to_file(&path)?;
    let err = Config::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("invalid I2C address"));

    // min_temp above max_temp is rejected
    let mut config = Config::default();
    config.sensing.sensors[0].min_temp = 100.0;
    config.sensing.sensors[0].max_temp = 50.0;
    let path = temp_dir.path().join("bad_bounds.yaml");
    config.save_to_file(&path)?;
    let err = Config::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("min_temp"));

    // Duplicate sensor names are rejected
    let mut config = Config::default();
    let duplicate = config.sensing.sensors[0].clone();
    config.sensing.sensors.push(duplicate);
    let path = temp_dir.path().join("dup_names.yaml");
    config.save_to_file(&path)?;
    let err = Config::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Duplicate sensor name"));

    Ok(())
}

#[test]
fn test_config_rejects_malformed_yaml() -> Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("malformed.yaml");
    std::fs::write(&path, "sensing: [not, a, mapping]\n")?;

    assert!(Config::from_file(&path).is_err());
    Ok(())
}

#[test]
fn test_sensor_config_defaults() {
    let sensor = SensorConfig::default();
    assert_eq!(sensor.sensor_type, "MCP9808");
    assert_eq!(sensor.i2c_address, 0x18);
    assert!(sensor.enabled);
    assert_eq!(sensor.min_temp, 0.0);
    assert_eq!(sensor.max_temp, 0.0);
}
