//! Sensor -- one session with one physical sensor.
//!
//! A [`Sensor`] owns the Modbus master (and through it the transport and
//! enable line), the slave id and the resolved model. Every operation is a
//! small, fixed sequence of transactions; failures are returned on the
//! call that hit them and leave the session usable.

use tracing::{debug, info, warn};

use sondelib_core::error::{Error, Result};
use sondelib_core::SensorInfo;
use sondelib_modbus::frame::WRITE_ACK_LEN;
use sondelib_modbus::{Endian, ModbusMaster};

use crate::commands::{self, BROADCAST_ID, CAP_COEFFICIENT_COUNT, FLOAT_REGS, SERIAL_NUMBER_REGS};
use crate::models::{model_code_from_serial, model_from_code, RegisterMap, SensorModel, ValueLayout};
use crate::types::{Calibration, FirmwareVersion, Measurement, PhCalibrationStatus};

/// Write acknowledgement lengths used before the model is known.
const DEFAULT_ACK: &[usize] = &[WRITE_ACK_LEN];

/// Highest assignable Modbus slave id.
pub const MAX_SLAVE_ID: u8 = 247;

/// A connected sensor.
///
/// Constructed via [`SensorBuilder`](crate::builder::SensorBuilder).
pub struct Sensor {
    master: ModbusMaster,
    model: SensorModel,
    slave_id: u8,
    ack_override: Option<Vec<usize>>,
}

impl Sensor {
    /// Create a session from its parts.
    ///
    /// This is called by [`SensorBuilder`](crate::builder::SensorBuilder);
    /// callers should use the builder API instead.
    pub(crate) fn new(
        master: ModbusMaster,
        model: SensorModel,
        slave_id: u8,
        ack_override: Option<Vec<usize>>,
    ) -> Self {
        Sensor {
            master,
            model,
            slave_id,
            ack_override,
        }
    }

    // -----------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------

    /// The active model (`Unknown` until resolved).
    pub fn model(&self) -> SensorModel {
        self.model
    }

    /// The slave id requests are addressed to.
    pub fn slave_id(&self) -> u8 {
        self.slave_id
    }

    /// Display name of the active model.
    pub fn model_name(&self) -> &'static str {
        self.model.register_map().map_or("Unknown", |map| map.display_name)
    }

    /// Primary measured parameter.
    pub fn parameter(&self) -> &'static str {
        self.model.register_map().map_or("Unknown", |map| map.parameter)
    }

    /// Unit of the primary parameter.
    pub fn units(&self) -> &'static str {
        self.model.register_map().map_or("Unknown", |map| map.unit)
    }

    /// Snapshot of the session metadata.
    pub fn info(&self) -> SensorInfo {
        SensorInfo {
            model_name: self.model_name().to_string(),
            parameter: self.parameter().to_string(),
            unit: self.units().to_string(),
            slave_id: self.slave_id,
        }
    }

    /// Returns `true` while the transport is open.
    pub fn is_connected(&self) -> bool {
        self.master.line().is_connected()
    }

    /// Close the transport. Later calls fail with a transport error.
    pub fn close(&mut self) -> Result<()> {
        info!(slave = self.slave_id, model = %self.model, "closing sensor session");
        self.master.close()
    }

    // -----------------------------------------------------------------
    // Measurements
    // -----------------------------------------------------------------

    /// Read `count` values.
    ///
    /// Accepted counts depend on the model's layout: 1 or 2 for simple
    /// probes, 1 to 3 for DO and pH, exactly 8 for the sonde. Anything else
    /// fails with [`Error::Unsupported`] before any bus traffic.
    pub fn get_values(&mut self, count: usize) -> Result<Measurement> {
        let map = self.map()?;
        if !map.layout.supports(count) {
            return Err(Error::Unsupported(format!(
                "{} cannot report {count} values (supported: {:?})",
                map.display_name,
                map.layout.arities()
            )));
        }
        debug!(slave = self.slave_id, model = %map.model, count, "reading values");

        let (mut values, mut error_code) = {
            let reply = self.master.read_holding_registers(
                self.slave_id,
                map.measurement_start,
                map.measurement_reg_count,
            )?;
            commands::parse_measurement(&map.layout, reply.bytes(), map.byte_order)
        };

        match map.layout {
            ValueLayout::PhLike {
                temperature_addr,
                potential_addr,
                ..
            } => {
                if count >= 2 {
                    values.push(self.read_float(temperature_addr, map.byte_order)?);
                }
                if count >= 3 {
                    values.push(self.read_float(potential_addr, map.byte_order)?);
                }
            }
            ValueLayout::Sonde8 {
                error_addr,
                error_offset,
                ..
            } => {
                let reply = self.master.read_holding_registers(self.slave_id, error_addr, 1)?;
                error_code = Some(reply.bytes()[error_offset]);
            }
            _ => {}
        }

        values.truncate(count);
        if let Some(code) = error_code.filter(|code| *code != 0) {
            debug!(slave = self.slave_id, code, "sensor reported status flags");
        }
        Ok(Measurement { values, error_code })
    }

    /// Like [`get_values`](Self::get_values) but never fails: on error the
    /// sentinel measurement is returned with `false`.
    pub fn get_values_or_sentinel(&mut self, count: usize) -> (Measurement, bool) {
        match self.get_values(count) {
            Ok(measurement) => (measurement, true),
            Err(e) => {
                warn!(slave = self.slave_id, error = %e, "measurement failed");
                (Measurement::sentinel(count), false)
            }
        }
    }

    /// pH probes only: the temperature register.
    pub fn get_temperature_value(&mut self) -> Result<f32> {
        let (map, temperature_addr, _) = self.ph_registers()?;
        self.read_float(temperature_addr, map.byte_order)
    }

    /// pH probes only: the raw electrode potential in mV.
    pub fn get_potential_value(&mut self) -> Result<f32> {
        let (map, _, potential_addr) = self.ph_registers()?;
        self.read_float(potential_addr, map.byte_order)
    }

    /// Start measuring.
    pub fn start_measurement(&mut self) -> Result<()> {
        let map = self.map()?;
        debug!(slave = self.slave_id, "starting measurement");
        self.write_registers(map.start_measurement, &[])
    }

    /// Stop measuring.
    pub fn stop_measurement(&mut self) -> Result<()> {
        let map = self.map()?;
        debug!(slave = self.slave_id, "stopping measurement");
        self.write_registers(map.stop_measurement, &[])
    }

    // -----------------------------------------------------------------
    // Wiper
    // -----------------------------------------------------------------

    /// Trigger one wiper sweep.
    pub fn activate_brush(&mut self) -> Result<()> {
        let map = self.map()?;
        let addr = map
            .brush_activate
            .ok_or_else(|| Error::Unsupported(format!("{} has no wiper", map.display_name)))?;
        debug!(slave = self.slave_id, "activating brush");
        self.write_registers(addr, &[])
    }

    /// Minutes between automatic wiper sweeps.
    pub fn get_brush_interval(&mut self) -> Result<u16> {
        let (map, addr) = self.brush_interval_register()?;
        let reply = self.master.read_holding_registers(self.slave_id, addr, 1)?;
        Ok(commands::parse_u16(reply.bytes(), map.byte_order))
    }

    /// Set the minutes between automatic wiper sweeps.
    pub fn set_brush_interval(&mut self, minutes: u16) -> Result<()> {
        let (map, addr) = self.brush_interval_register()?;
        debug!(slave = self.slave_id, minutes, "setting brush interval");
        self.write_registers(addr, &commands::encode_u16(minutes, map.byte_order))
    }

    // -----------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------

    /// Ask whoever is on the bus for its slave id.
    ///
    /// Sent to the broadcast id; the reply is accepted from any slave.
    pub fn get_slave_id(&mut self) -> Result<u8> {
        let reply = self
            .master
            .query_holding_registers(BROADCAST_ID, commands::SLAVE_ID, 1)?;
        Ok(commands::parse_slave_id(reply.bytes()))
    }

    /// Change the sensor's slave id.
    ///
    /// The session switches to `new_id` only once the sensor has
    /// acknowledged the write.
    pub fn set_slave_id(&mut self, new_id: u8) -> Result<()> {
        if new_id == 0 || new_id > MAX_SLAVE_ID {
            return Err(Error::InvalidParameter(format!(
                "slave id {new_id} outside 1..={MAX_SLAVE_ID}"
            )));
        }
        self.write_registers(commands::SLAVE_ID, &commands::encode_slave_id(new_id))?;
        info!(old = self.slave_id, new = new_id, "slave id changed");
        self.slave_id = new_id;
        Ok(())
    }

    /// The 14-character serial number.
    pub fn get_serial_number(&mut self) -> Result<String> {
        let map = self.map()?;
        self.read_serial_at(map.serial_number)
    }

    /// Hardware and software revision.
    pub fn get_version(&mut self) -> Result<FirmwareVersion> {
        let reply = self
            .master
            .read_holding_registers(self.slave_id, commands::VERSION, 2)?;
        Ok(commands::parse_version(reply.bytes()))
    }

    /// Resolve an `Unknown` model from the serial number.
    ///
    /// Reads the single-probe serial register first and falls back to the
    /// sonde's on a communication failure. Does nothing once a model is
    /// set. Unrecognized codes leave the model `Unknown` and fail with
    /// [`Error::ModelUnresolved`].
    pub fn resolve_model(&mut self) -> Result<SensorModel> {
        if !self.model.is_unknown() {
            return Ok(self.model);
        }
        let serial = match self.read_serial_at(commands::SERIAL_NUMBER) {
            Ok(serial) => serial,
            Err(e) if e.is_communication_failure() => {
                debug!(error = %e, "serial number not at single-probe address, trying sonde");
                self.read_serial_at(commands::SONDE_SERIAL_NUMBER)?
            }
            Err(e) => return Err(e),
        };
        let code = model_code_from_serial(&serial).unwrap_or_default();
        let model = model_from_code(code);
        if model.is_unknown() {
            warn!(serial = %serial, code, "unrecognized model code");
            return Err(Error::ModelUnresolved);
        }
        info!(serial = %serial, %model, "resolved sensor model");
        self.model = model;
        Ok(model)
    }

    // -----------------------------------------------------------------
    // Calibration
    // -----------------------------------------------------------------

    /// Read the calibration coefficients (K/B, or the pH set).
    pub fn get_calibration(&mut self) -> Result<Calibration> {
        let map = self.map()?;
        let block = map.calibration;
        let reply = self
            .master
            .read_holding_registers(self.slave_id, block.start, block.register_count())?;
        commands::parse_calibration(&block, reply.bytes(), map.byte_order)
    }

    /// Write calibration coefficients.
    ///
    /// The shape must match the model: [`Calibration::Ph`] for pH probes,
    /// [`Calibration::Linear`] for everything else.
    pub fn set_calibration(&mut self, calibration: &Calibration) -> Result<()> {
        let map = self.map()?;
        let payload = commands::encode_calibration(&map.calibration, calibration, map.byte_order)?;
        debug!(
            slave = self.slave_id,
            coefficients = ?calibration.coefficients(),
            "writing calibration"
        );
        self.write_registers(map.calibration.start, &payload)
    }

    /// DO probes only: the optical cap coefficients.
    pub fn get_cap_coefficients(&mut self) -> Result<[f32; CAP_COEFFICIENT_COUNT]> {
        let (map, addr) = self.cap_register()?;
        let reply = self.master.read_holding_registers(
            self.slave_id,
            addr,
            (CAP_COEFFICIENT_COUNT * 2) as u16,
        )?;
        let values = commands::parse_floats(reply.bytes(), CAP_COEFFICIENT_COUNT, map.byte_order);
        let mut coefficients = [0f32; CAP_COEFFICIENT_COUNT];
        coefficients.copy_from_slice(&values);
        Ok(coefficients)
    }

    /// DO probes only: write the optical cap coefficients.
    pub fn set_cap_coefficients(
        &mut self,
        coefficients: &[f32; CAP_COEFFICIENT_COUNT],
    ) -> Result<()> {
        let (map, addr) = self.cap_register()?;
        let payload = sondelib_modbus::registers::f32s_to_bytes(coefficients, map.byte_order);
        debug!(slave = self.slave_id, "writing cap coefficients");
        self.write_registers(addr, &payload)
    }

    /// pH probes only: submit one calibration standard.
    pub fn ph_calibration_point(&mut self, standard: f32) -> Result<()> {
        let map = self.ph_map()?;
        let payload = sondelib_modbus::registers::f32s_to_bytes(&[standard], map.byte_order);
        debug!(slave = self.slave_id, standard, "submitting pH calibration point");
        self.write_registers(commands::PH_CALIBRATION_POINT, &payload)
    }

    /// pH probes only: outcome of the calibration so far.
    ///
    /// A failed transaction is reported as
    /// [`PhCalibrationStatus::CommunicationFailure`], never as an error;
    /// codes outside the documented set come back as
    /// [`PhCalibrationStatus::Unrecognized`]. Calling this on a non-pH
    /// session is an error.
    pub fn ph_calibration_status(&mut self) -> Result<PhCalibrationStatus> {
        let map = self.ph_map()?;
        let reply = match self
            .master
            .read_holding_registers(self.slave_id, commands::PH_CALIBRATION_STATUS, 1)
        {
            Ok(reply) => reply,
            Err(e) if e.is_communication_failure() => {
                warn!(slave = self.slave_id, error = %e, "pH calibration status unreadable");
                return Ok(PhCalibrationStatus::CommunicationFailure);
            }
            Err(e) => return Err(e),
        };
        let code = commands::parse_u16(reply.bytes(), map.byte_order);
        let status = PhCalibrationStatus::from_code(code);
        if let PhCalibrationStatus::Unrecognized(_) = status {
            warn!(slave = self.slave_id, code, "unrecognized pH calibration status");
        }
        Ok(status)
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn map(&self) -> Result<&'static RegisterMap> {
        self.model.register_map().ok_or(Error::ModelUnresolved)
    }

    /// The pH row with its temperature and potential registers.
    fn ph_registers(&self) -> Result<(&'static RegisterMap, u16, u16)> {
        let map = self.map()?;
        match map.layout {
            ValueLayout::PhLike {
                temperature_addr,
                potential_addr,
                ..
            } => Ok((map, temperature_addr, potential_addr)),
            _ => Err(Error::Unsupported(format!("{} is not a pH probe", map.display_name))),
        }
    }

    fn ph_map(&self) -> Result<&'static RegisterMap> {
        self.ph_registers().map(|(map, _, _)| map)
    }

    fn cap_register(&self) -> Result<(&'static RegisterMap, u16)> {
        let map = self.map()?;
        let addr = map.cap_coefficients.ok_or_else(|| {
            Error::Unsupported(format!("{} has no cap coefficients", map.display_name))
        })?;
        Ok((map, addr))
    }

    fn brush_interval_register(&self) -> Result<(&'static RegisterMap, u16)> {
        let map = self.map()?;
        let addr = map.brush_interval.ok_or_else(|| {
            Error::Unsupported(format!("{} has no wiper", map.display_name))
        })?;
        Ok((map, addr))
    }

    fn read_float(&mut self, addr: u16, order: Endian) -> Result<f32> {
        let reply = self.master.read_holding_registers(self.slave_id, addr, FLOAT_REGS)?;
        Ok(commands::parse_float(reply.bytes(), order))
    }

    fn read_serial_at(&mut self, addr: u16) -> Result<String> {
        let reply = self
            .master
            .read_holding_registers(self.slave_id, addr, SERIAL_NUMBER_REGS)?;
        Ok(commands::parse_serial_number(reply.bytes()))
    }

    /// Write `data` and check the acknowledgement against the configured
    /// or per-model lengths.
    fn write_registers(&mut self, addr: u16, data: &[u8]) -> Result<()> {
        let acks: &[usize] = match (&self.ack_override, self.model.register_map()) {
            (Some(lengths), _) => lengths.as_slice(),
            (None, Some(map)) => map.write_ack_lengths,
            (None, None) => DEFAULT_ACK,
        };
        self.master.write_multiple_registers(self.slave_id, addr, data, acks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bytes::{BufMut, BytesMut};
    use sondelib_core::{SENTINEL_ERROR, SENTINEL_VALUE};
    use sondelib_modbus::crc::append_crc;
    use sondelib_modbus::frame::{build_request, RequestBody};
    use sondelib_modbus::registers::f32s_to_bytes;
    use sondelib_test_harness::MockTransport;

    use crate::builder::SensorBuilder;

    fn make_sensor(model: SensorModel, mock: MockTransport) -> Sensor {
        SensorBuilder::new(model)
            .settle_delay(Duration::ZERO)
            .poll_interval(Duration::from_micros(200))
            .frame_gap(Duration::from_millis(2))
            .response_timeout(Duration::from_millis(20))
            .auto_resolve(false)
            .build_with_transport(Box::new(mock))
            .unwrap()
    }

    fn read_req(slave: u8, addr: u16, count: u16) -> Vec<u8> {
        build_request(slave, addr, RequestBody::Read { count })
    }

    fn write_req(slave: u8, addr: u16, data: &[u8]) -> Vec<u8> {
        build_request(slave, addr, RequestBody::Write { data })
    }

    /// Read reply carrying `data`, with a valid checksum.
    fn read_reply(slave: u8, data: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u8(slave);
        buf.put_u8(0x03);
        buf.put_u8(data.len() as u8);
        buf.put_slice(data);
        append_crc(&mut buf);
        buf.to_vec()
    }

    /// Standard 8-byte acknowledgement of a register write.
    fn write_ack(slave: u8, addr: u16, data_len: usize) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u8(slave);
        buf.put_u8(0x10);
        buf.put_u16(addr);
        buf.put_u16((data_len / 2) as u16);
        append_crc(&mut buf);
        buf.to_vec()
    }

    fn le(values: &[f32]) -> Vec<u8> {
        f32s_to_bytes(values, Endian::Little)
    }

    fn serial_data(serial: &str) -> Vec<u8> {
        let mut data = serial.as_bytes().to_vec();
        data.resize(14, 0);
        data
    }

    // -----------------------------------------------------------------
    // get_values
    // -----------------------------------------------------------------

    #[test]
    fn every_model_serves_exactly_its_arities() {
        for model in SensorModel::ALL {
            let map = model.register_map().unwrap();
            let block = vec![0u8; map.measurement_reg_count as usize * 2];

            let mut mock = MockTransport::new();
            for &count in map.layout.arities() {
                mock.expect(
                    &read_req(0x01, map.measurement_start, map.measurement_reg_count),
                    &read_reply(0x01, &block),
                );
                match map.layout {
                    ValueLayout::PhLike {
                        temperature_addr,
                        potential_addr,
                        ..
                    } => {
                        if count >= 2 {
                            mock.expect(
                                &read_req(0x01, temperature_addr, 2),
                                &read_reply(0x01, &le(&[20.0])),
                            );
                        }
                        if count >= 3 {
                            mock.expect(
                                &read_req(0x01, potential_addr, 2),
                                &read_reply(0x01, &le(&[-12.5])),
                            );
                        }
                    }
                    ValueLayout::Sonde8 { error_addr, .. } => {
                        mock.expect(&read_req(0x01, error_addr, 1), &read_reply(0x01, &[0, 0]));
                    }
                    _ => {}
                }
            }

            let mut sensor = make_sensor(model, mock);
            for count in 0..=9 {
                let result = sensor.get_values(count);
                if map.layout.supports(count) {
                    let m = result.unwrap_or_else(|e| panic!("{model} x{count}: {e}"));
                    assert_eq!(m.values.len(), count, "{model} x{count}");
                } else {
                    assert!(
                        matches!(result, Err(Error::Unsupported(_))),
                        "{model} x{count} should be refused"
                    );
                }
            }
        }
    }

    #[test]
    fn dissolved_oxygen_three_values() {
        let mut mock = MockTransport::new();
        let mut data = le(&[25.0, 0.98]);
        data.extend_from_slice(&[0x00, 0x00]);
        mock.expect(&read_req(0x01, 0x2600, 5), &read_reply(0x01, &data));

        let mut sensor = make_sensor(SensorModel::Y504, mock);
        let m = sensor.get_values(3).unwrap();
        assert_eq!(m.values.len(), 3);
        assert!((m.values[0] - 98.0).abs() < 1e-3);
        assert_eq!(m.values[1], 25.0);
        assert!((8.05..8.15).contains(&m.values[2]), "{}", m.values[2]);
        assert_eq!(m.error_code, Some(0x00));
    }

    #[test]
    fn conductivity_one_and_two_values() {
        let mut mock = MockTransport::new();
        let reply = read_reply(0x01, &le(&[18.5, 1.25]));
        mock.expect(&read_req(0x01, 0x2600, 4), &reply);
        mock.expect(&read_req(0x01, 0x2600, 4), &reply);

        let mut sensor = make_sensor(SensorModel::Y520, mock);
        assert_eq!(sensor.get_values(1).unwrap().values, vec![1.25]);
        let m = sensor.get_values(2).unwrap();
        assert_eq!(m.values, vec![1.25, 18.5]);
        assert_eq!(m.error_code, None);
    }

    #[test]
    fn turbidity_reports_status_byte() {
        let mut mock = MockTransport::new();
        let mut data = le(&[21.0, 3.5]);
        data.extend_from_slice(&[0x04, 0x00]);
        mock.expect(&read_req(0x01, 0x2600, 5), &read_reply(0x01, &data));

        let mut sensor = make_sensor(SensorModel::Y510, mock);
        let m = sensor.get_values(2).unwrap();
        assert_eq!(m.values, vec![3.5, 21.0]);
        assert_eq!(m.error_code, Some(0x04));
    }

    #[test]
    fn sonde_eight_values_with_separate_status() {
        let floats = [8.1, 3.2, 0.45, 7.2, 19.5, 210.0, 2.4, 0.8];
        let mut mock = MockTransport::new();
        mock.expect(&read_req(0x01, 0x2600, 16), &read_reply(0x01, &le(&floats)));
        mock.expect(&read_req(0x01, 0x0800, 1), &read_reply(0x01, &[0x02, 0x00]));

        let mut sensor = make_sensor(SensorModel::Y4000, mock);
        let m = sensor.get_values(8).unwrap();
        assert_eq!(m.values, floats.to_vec());
        assert_eq!(m.error_code, Some(0x02));
    }

    #[test]
    fn sonde_rejects_short_reads_without_traffic() {
        // No expectations: any write would fail with a transport error.
        let mut sensor = make_sensor(SensorModel::Y4000, MockTransport::new());
        for count in [1, 2, 3] {
            assert!(matches!(sensor.get_values(count), Err(Error::Unsupported(_))));
        }
        assert!(matches!(sensor.get_values(9), Err(Error::Unsupported(_))));
    }

    #[test]
    fn simple_sensor_rejects_three_values() {
        let mut sensor = make_sensor(SensorModel::Y510, MockTransport::new());
        assert!(matches!(sensor.get_values(3), Err(Error::Unsupported(_))));
        assert!(matches!(sensor.get_values(0), Err(Error::Unsupported(_))));
    }

    #[test]
    fn ph_reads_three_registers() {
        let mut mock = MockTransport::new();
        mock.expect(&read_req(0x01, 0x2800, 2), &read_reply(0x01, &le(&[7.02])));
        mock.expect(&read_req(0x01, 0x2400, 2), &read_reply(0x01, &le(&[22.5])));
        mock.expect(&read_req(0x01, 0x1200, 2), &read_reply(0x01, &le(&[-12.5])));

        let mut sensor = make_sensor(SensorModel::Y532, mock);
        let m = sensor.get_values(3).unwrap();
        assert_eq!(m.values, vec![7.02, 22.5, -12.5]);
        assert_eq!(m.error_code, None);
    }

    #[test]
    fn ph_single_value_then_potential() {
        let mut mock = MockTransport::new();
        mock.expect(&read_req(0x01, 0x2800, 2), &read_reply(0x01, &le(&[6.5])));
        mock.expect(&read_req(0x01, 0x1200, 2), &read_reply(0x01, &le(&[30.0])));

        let mut sensor = make_sensor(SensorModel::Y532, mock);
        assert_eq!(sensor.get_values(1).unwrap().values, vec![6.5]);
        assert_eq!(sensor.get_potential_value().unwrap(), 30.0);
    }

    #[test]
    fn temperature_register_is_ph_only() {
        let mut sensor = make_sensor(SensorModel::Y520, MockTransport::new());
        assert!(matches!(sensor.get_temperature_value(), Err(Error::Unsupported(_))));
        assert!(matches!(sensor.get_potential_value(), Err(Error::Unsupported(_))));
    }

    #[test]
    fn corrupted_reply_is_frame_error() {
        let mut reply = read_reply(0x01, &le(&[18.5, 1.25]));
        let last = reply.len() - 1;
        reply[last] ^= 0x01;
        let mut mock = MockTransport::new();
        mock.expect(&read_req(0x01, 0x2600, 4), &reply);

        let mut sensor = make_sensor(SensorModel::Y520, mock);
        assert!(matches!(sensor.get_values(2), Err(Error::FrameInvalid(_))));
    }

    #[test]
    fn reply_from_other_slave_is_rejected() {
        let mut mock = MockTransport::new();
        mock.expect(&read_req(0x01, 0x2600, 4), &read_reply(0x02, &le(&[18.5, 1.25])));

        let mut sensor = make_sensor(SensorModel::Y520, mock);
        assert!(matches!(sensor.get_values(2), Err(Error::FrameInvalid(_))));
    }

    #[test]
    fn sentinel_on_timeout_then_recovers() {
        let mut mock = MockTransport::new();
        mock.expect_silence(&read_req(0x01, 0x2600, 4));
        mock.expect(&read_req(0x01, 0x2600, 4), &read_reply(0x01, &le(&[18.5, 1.25])));

        let mut sensor = make_sensor(SensorModel::Y520, mock);
        let (m, ok) = sensor.get_values_or_sentinel(2);
        assert!(!ok);
        assert_eq!(m.values, vec![SENTINEL_VALUE; 2]);
        assert_eq!(m.error_code, Some(SENTINEL_ERROR));

        let (m, ok) = sensor.get_values_or_sentinel(2);
        assert!(ok);
        assert_eq!(m.values, vec![1.25, 18.5]);
    }

    // -----------------------------------------------------------------
    // Model resolution
    // -----------------------------------------------------------------

    #[test]
    fn resolves_turbidity_from_serial() {
        let mut mock = MockTransport::new();
        mock.expect(
            &read_req(0x01, 0x0900, 7),
            &read_reply(0x01, &serial_data("0110171507001A")),
        );
        let mut data = le(&[20.0, 1.5]);
        data.extend_from_slice(&[0x00, 0x00]);
        mock.expect(&read_req(0x01, 0x2600, 5), &read_reply(0x01, &data));

        let mut sensor = make_sensor(SensorModel::Unknown, mock);
        assert!(matches!(sensor.get_values(2), Err(Error::ModelUnresolved)));
        assert_eq!(sensor.resolve_model().unwrap(), SensorModel::Y510);
        assert_eq!(sensor.model_name(), "Y510");
        assert_eq!(sensor.get_values(2).unwrap().values, vec![1.5, 20.0]);
    }

    #[test]
    fn builder_resolves_on_connect() {
        let mut mock = MockTransport::new();
        mock.expect(
            &read_req(0x01, 0x0900, 7),
            &read_reply(0x01, &serial_data("0143190001")),
        );
        let sensor = SensorBuilder::new(SensorModel::Unknown)
            .settle_delay(Duration::ZERO)
            .frame_gap(Duration::from_millis(2))
            .response_timeout(Duration::from_millis(20))
            .build_with_transport(Box::new(mock))
            .unwrap();
        assert_eq!(sensor.model(), SensorModel::Y532);
    }

    #[test]
    fn resolver_falls_back_to_sonde_address() {
        let mut mock = MockTransport::new();
        mock.expect_silence(&read_req(0x01, 0x0900, 7));
        mock.expect(
            &read_req(0x01, 0x1400, 7),
            &read_reply(0x01, &serial_data(")0138200312A0B")),
        );

        let mut sensor = make_sensor(SensorModel::Unknown, mock);
        assert_eq!(sensor.resolve_model().unwrap(), SensorModel::Y4000);
    }

    #[test]
    fn unrecognized_code_stays_unknown() {
        let mut mock = MockTransport::new();
        mock.expect(
            &read_req(0x01, 0x0900, 7),
            &read_reply(0x01, &serial_data("0177000000")),
        );

        let mut sensor = make_sensor(SensorModel::Unknown, mock);
        assert!(matches!(sensor.resolve_model(), Err(Error::ModelUnresolved)));
        assert_eq!(sensor.model(), SensorModel::Unknown);
        assert!(matches!(sensor.get_calibration(), Err(Error::ModelUnresolved)));
    }

    #[test]
    fn resolve_is_a_no_op_once_known() {
        let mut sensor = make_sensor(SensorModel::Y514, MockTransport::new());
        assert_eq!(sensor.resolve_model().unwrap(), SensorModel::Y514);
    }

    // -----------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------

    #[test]
    fn get_slave_id_accepts_any_responder() {
        let mut mock = MockTransport::new();
        mock.expect(&read_req(0xFF, 0x3000, 1), &read_reply(0x05, &[0x05, 0x00]));

        let mut sensor = make_sensor(SensorModel::Y520, mock);
        assert_eq!(sensor.get_slave_id().unwrap(), 0x05);
    }

    #[test]
    fn set_slave_id_switches_after_ack() {
        let mut mock = MockTransport::new();
        mock.expect(&write_req(0x01, 0x3000, &[0x22, 0x00]), &write_ack(0x01, 0x3000, 2));
        mock.expect(&read_req(0x22, 0x0700, 2), &read_reply(0x22, &[0x01, 0x00, 0x02, 0x0A]));

        let mut sensor = make_sensor(SensorModel::Y520, mock);
        sensor.set_slave_id(0x22).unwrap();
        assert_eq!(sensor.slave_id(), 0x22);
        let version = sensor.get_version().unwrap();
        assert!((version.hardware - 1.0).abs() < 1e-6);
        assert!((version.software - 2.1).abs() < 1e-6);
    }

    #[test]
    fn set_slave_id_keeps_old_id_without_ack() {
        let mut mock = MockTransport::new();
        mock.expect_silence(&write_req(0x01, 0x3000, &[0x22, 0x00]));

        let mut sensor = make_sensor(SensorModel::Y520, mock);
        assert!(matches!(sensor.set_slave_id(0x22), Err(Error::Timeout)));
        assert_eq!(sensor.slave_id(), 0x01);
        assert!(matches!(sensor.set_slave_id(0), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn serial_number_uses_model_address() {
        let mut mock = MockTransport::new();
        mock.expect(
            &read_req(0x01, 0x1400, 7),
            &read_reply(0x01, &serial_data("0138200312A0B1")),
        );

        let mut sensor = make_sensor(SensorModel::Y4000, mock);
        assert_eq!(sensor.get_serial_number().unwrap(), "0138200312A0B1");
    }

    // -----------------------------------------------------------------
    // Calibration
    // -----------------------------------------------------------------

    #[test]
    fn linear_calibration_round_trip() {
        let payload = le(&[1.1, -0.2]);
        let mut mock = MockTransport::new();
        mock.expect(&write_req(0x01, 0x1100, &payload), &write_ack(0x01, 0x1100, 8));
        mock.expect(&read_req(0x01, 0x1100, 4), &read_reply(0x01, &payload));

        let mut sensor = make_sensor(SensorModel::Y510, mock);
        let cal = Calibration::Linear { k: 1.1, b: -0.2 };
        sensor.set_calibration(&cal).unwrap();
        assert_eq!(sensor.get_calibration().unwrap(), cal);
    }

    #[test]
    fn ph_calibration_block() {
        let coefficients = [0.5, 1.0, 1.5, 2.0, 2.5, 3.0];
        let mut mock = MockTransport::new();
        mock.expect(&read_req(0x01, 0x2900, 12), &read_reply(0x01, &le(&coefficients)));

        let mut sensor = make_sensor(SensorModel::Y532, mock);
        assert_eq!(sensor.get_calibration().unwrap(), Calibration::Ph(coefficients));
        let wrong = Calibration::Linear { k: 1.0, b: 0.0 };
        assert!(matches!(sensor.set_calibration(&wrong), Err(Error::Unsupported(_))));
    }

    #[test]
    fn cap_coefficients_are_do_only() {
        let coefficients = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let mut mock = MockTransport::new();
        mock.expect(
            &write_req(0x01, 0x2700, &le(&coefficients)),
            &write_ack(0x01, 0x2700, 32),
        );
        mock.expect(&read_req(0x01, 0x2700, 16), &read_reply(0x01, &le(&coefficients)));

        let mut sensor = make_sensor(SensorModel::Y504, mock);
        sensor.set_cap_coefficients(&coefficients).unwrap();
        assert_eq!(sensor.get_cap_coefficients().unwrap(), coefficients);

        let mut other = make_sensor(SensorModel::Y510, MockTransport::new());
        assert!(matches!(other.get_cap_coefficients(), Err(Error::Unsupported(_))));
    }

    #[test]
    fn ph_calibration_point_and_status() {
        let mut mock = MockTransport::new();
        mock.expect(&write_req(0x01, 0x2300, &le(&[7.0])), &write_ack(0x01, 0x2300, 4));
        mock.expect(&read_req(0x01, 0x0E00, 1), &read_reply(0x01, &[0x02, 0x00]));
        mock.expect(&read_req(0x01, 0x0E00, 1), &read_reply(0x01, &[0x00, 0x00]));

        let mut sensor = make_sensor(SensorModel::Y532, mock);
        sensor.ph_calibration_point(7.0).unwrap();
        assert_eq!(
            sensor.ph_calibration_status().unwrap(),
            PhCalibrationStatus::TooFewPoints
        );
        assert_eq!(sensor.ph_calibration_status().unwrap(), PhCalibrationStatus::Success);
    }

    #[test]
    fn ph_status_timeout_is_communication_failure() {
        let mut mock = MockTransport::new();
        mock.expect_silence(&read_req(0x01, 0x0E00, 1));

        let mut sensor = make_sensor(SensorModel::Y532, mock);
        assert_eq!(
            sensor.ph_calibration_status().unwrap(),
            PhCalibrationStatus::CommunicationFailure
        );
    }

    #[test]
    fn ph_status_keeps_unknown_codes_apart_from_failures() {
        let mut mock = MockTransport::new();
        mock.expect(&read_req(0x01, 0x0E00, 1), &read_reply(0x01, &[0x07, 0x00]));

        let mut sensor = make_sensor(SensorModel::Y532, mock);
        let status = sensor.ph_calibration_status().unwrap();
        assert_eq!(status, PhCalibrationStatus::Unrecognized(7));
        assert_ne!(status, PhCalibrationStatus::CommunicationFailure);
    }

    #[test]
    fn ph_status_needs_ph_model() {
        let mut sensor = make_sensor(SensorModel::Y504, MockTransport::new());
        assert!(matches!(sensor.ph_calibration_status(), Err(Error::Unsupported(_))));
        assert!(matches!(sensor.ph_calibration_point(4.0), Err(Error::Unsupported(_))));
    }

    // -----------------------------------------------------------------
    // Wiper and measurement control
    // -----------------------------------------------------------------

    #[test]
    fn brush_on_self_cleaning_turbidity() {
        let mut mock = MockTransport::new();
        mock.expect(&write_req(0x01, 0x2F00, &[]), &write_ack(0x01, 0x2F00, 0));
        mock.expect(&write_req(0x01, 0x3200, &[0x1E, 0x00]), &write_ack(0x01, 0x3200, 2));
        mock.expect(&read_req(0x01, 0x3200, 1), &read_reply(0x01, &[0x1E, 0x00]));

        let mut sensor = make_sensor(SensorModel::Y511, mock);
        sensor.activate_brush().unwrap();
        sensor.set_brush_interval(30).unwrap();
        assert_eq!(sensor.get_brush_interval().unwrap(), 30);
    }

    #[test]
    fn sonde_brush_interval_address() {
        let mut mock = MockTransport::new();
        mock.expect(&read_req(0x01, 0x0E00, 1), &read_reply(0x01, &[0x3C, 0x00]));

        let mut sensor = make_sensor(SensorModel::Y4000, mock);
        assert_eq!(sensor.get_brush_interval().unwrap(), 60);
    }

    #[test]
    fn brush_needs_a_wiper() {
        let mut sensor = make_sensor(SensorModel::Y510, MockTransport::new());
        assert!(matches!(sensor.activate_brush(), Err(Error::Unsupported(_))));
        assert!(matches!(sensor.set_brush_interval(5), Err(Error::Unsupported(_))));
    }

    #[test]
    fn sonde_start_stop_addresses() {
        let mut mock = MockTransport::new();
        mock.expect(&write_req(0x01, 0x1C00, &[]), &write_ack(0x01, 0x1C00, 0));
        mock.expect(&write_req(0x01, 0x1E00, &[]), &write_ack(0x01, 0x1E00, 0));

        let mut sensor = make_sensor(SensorModel::Y4000, mock);
        sensor.start_measurement().unwrap();
        sensor.stop_measurement().unwrap();
    }

    #[test]
    fn overridden_ack_lengths_accept_short_ack() {
        let mut short_ack = BytesMut::new();
        short_ack.put_slice(&[0x01, 0x10, 0x25, 0x00, 0x00]);
        append_crc(&mut short_ack);

        let mut mock = MockTransport::new();
        mock.expect(&write_req(0x01, 0x2500, &[]), &short_ack);
        let mut strict = make_sensor(SensorModel::Y504, mock);
        assert!(matches!(strict.start_measurement(), Err(Error::FrameInvalid(_))));

        let mut mock = MockTransport::new();
        mock.expect(&write_req(0x01, 0x2500, &[]), &short_ack);
        let mut lenient = SensorBuilder::new(SensorModel::Y504)
            .settle_delay(Duration::ZERO)
            .frame_gap(Duration::from_millis(2))
            .response_timeout(Duration::from_millis(20))
            .write_ack_lengths(&[7, 8])
            .build_with_transport(Box::new(mock))
            .unwrap();
        lenient.start_measurement().unwrap();
    }

    #[test]
    fn closed_session_reports_disconnect() {
        let mut sensor = make_sensor(SensorModel::Y520, MockTransport::new());
        assert!(sensor.is_connected());
        sensor.close().unwrap();
        assert!(!sensor.is_connected());
        assert!(sensor.get_values(1).is_err());
    }
}
