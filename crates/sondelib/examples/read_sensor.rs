//! Read a Yosemitech sensor.
//!
//! Opens the serial port, resolves the sensor model from its serial
//! number, prints its identity and then polls the measurement block.
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=debug cargo run -p sondelib --example read_sensor -- /dev/ttyUSB0 1
//! ```

use std::thread;
use std::time::Duration;

use sondelib::yosemitech::{SensorBuilder, SensorModel};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let slave_id: u8 = args.next().as_deref().unwrap_or("1").parse()?;

    println!("Available ports: {:?}", sondelib::transport::available_ports()?);
    println!("Connecting to slave {} on {}...", slave_id, port);

    let mut sensor = SensorBuilder::new(SensorModel::Unknown)
        .serial_port(&port)
        .slave_id(slave_id)
        .rts_enable(true)
        .build()?;

    let model = sensor.resolve_model()?;
    let Some(map) = model.register_map() else {
        anyhow::bail!("sensor model could not be determined");
    };
    println!("Model: {} ({}, {})", model, sensor.parameter(), sensor.units());
    println!("Serial number: {}", sensor.get_serial_number()?);
    println!("Firmware: {}", sensor.get_version()?);
    println!("Calibration: {:?}", sensor.get_calibration()?);

    let count = map.layout.arities().iter().copied().max().unwrap_or(1);
    sensor.start_measurement()?;
    // The sensors need a moment after start before the first valid reading.
    thread::sleep(Duration::from_secs(2));

    for _ in 0..5 {
        let (reading, ok) = sensor.get_values_or_sentinel(count);
        if !ok {
            tracing::warn!("reading failed");
        }
        for (name, value) in map.value_names.iter().zip(&reading.values) {
            println!("  {:<20} {:>10.3}", name, value);
        }
        if let Some(code) = reading.error_code {
            println!("  {:<20} {:>#10x}", "Status", code);
        }
        thread::sleep(Duration::from_secs(1));
    }

    sensor.stop_measurement()?;
    sensor.close()?;
    Ok(())
}
