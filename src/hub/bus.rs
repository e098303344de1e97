// Serial register protocol for the base controller board.
//
// The wheel servos and the IMU unit share one half-duplex bus speaking a
// Feetech-compatible packet format:
//   [0xFF, 0xFF, unit id, length, instruction, params..., checksum]
// Velocity and yaw registers use the bus's sign-magnitude convention
// (bit 15 = direction); the accumulated position register is plain
// little-endian two's complement.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::debug;

pub const DEFAULT_BAUDRATE: u32 = 1_000_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

const HEADER: [u8; 2] = [0xFF, 0xFF];
const BROADCAST_ID: u8 = 0xFE;

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
enum Instruction {
    Ping = 0x01,
    ReadData = 0x02,
    WriteData = 0x03,
    SyncWrite = 0x83,
}

/// Register map of the base controller board.
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Register {
    // Servo units (RAM area)
    OperatingMode = 33,   // 1 byte: 0 = position, 1 = velocity
    TorqueEnable = 40,    // 1 byte: 0 = coast, 1 = hold
    GoalVelocity = 46,    // 2 bytes, sign-magnitude
    PresentPosition = 56, // 4 bytes, accumulated shaft degrees, read-only
    PresentVelocity = 60, // 2 bytes, sign-magnitude, read-only

    // IMU unit
    YawAngle = 70,     // 2 bytes, sign-magnitude, tenths of a degree
    YawReset = 72,     // write 1 to re-zero the yaw reference
    MotionStatus = 73, // 1 byte, bit 0 = rate estimate settled
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatingMode {
    Position = 0,
    Velocity = 1,
}

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed response from unit {id}: {reason}")]
    BadResponse { id: u8, reason: String },

    #[error("checksum mismatch in response from unit {id}")]
    Checksum { id: u8 },

    #[error("unit {id} reported fault status 0x{status:02X}")]
    UnitFault { id: u8, status: u8 },

    #[error("no response from unit {id}")]
    Timeout { id: u8 },

    #[error("bus lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, HubError>;

/// Owns the serial port and frames every register access.
pub struct HubBus {
    port: Box<dyn SerialPort>,
}

impl HubBus {
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;
        Ok(Self { port })
    }

    /// Checksum over everything after the header: complement of the byte sum.
    fn checksum(body: &[u8]) -> u8 {
        let sum: u16 = body.iter().map(|&b| u16::from(b)).sum();
        !(sum as u8)
    }

    fn frame(id: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
        let mut packet = Vec::with_capacity(6 + params.len());
        packet.extend_from_slice(&HEADER);
        packet.push(id);
        packet.push((params.len() + 2) as u8); // instruction + checksum
        packet.push(instruction as u8);
        packet.extend_from_slice(params);
        packet.push(Self::checksum(&packet[2..]));
        packet
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.port.write_all(frame)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read one status frame, returning its parameter bytes.
    fn read_status(&mut self, expected_id: u8) -> Result<Vec<u8>> {
        let mut preamble = [0u8; 4]; // header, id, length
        self.port.read_exact(&mut preamble).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                HubError::Timeout { id: expected_id }
            } else {
                HubError::Io(e)
            }
        })?;

        if preamble[..2] != HEADER {
            return Err(HubError::BadResponse {
                id: expected_id,
                reason: format!("bad header {:02X?}", &preamble[..2]),
            });
        }
        let id = preamble[2];
        if id != expected_id {
            return Err(HubError::BadResponse {
                id: expected_id,
                reason: format!("answered as unit {id}"),
            });
        }

        // length covers fault byte + params + checksum
        let length = preamble[3] as usize;
        if length < 2 {
            return Err(HubError::BadResponse {
                id,
                reason: format!("undersized frame (length {length})"),
            });
        }
        let mut body = vec![0u8; length];
        self.port.read_exact(&mut body)?;

        let mut checked = vec![id, length as u8];
        checked.extend_from_slice(&body[..length - 1]);
        if Self::checksum(&checked) != body[length - 1] {
            return Err(HubError::Checksum { id });
        }

        let status = body[0];
        if status != 0 {
            return Err(HubError::UnitFault { id, status });
        }
        Ok(body[1..length - 1].to_vec())
    }

    /// Ping a unit; a timeout means it is absent, not a bus failure.
    pub fn ping(&mut self, id: u8) -> Result<bool> {
        self.send(&Self::frame(id, Instruction::Ping, &[]))?;
        match self.read_status(id) {
            Ok(_) => Ok(true),
            Err(HubError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn write_register(&mut self, id: u8, register: Register, payload: &[u8]) -> Result<()> {
        let mut params = vec![register as u8];
        params.extend_from_slice(payload);
        debug!(id, ?register, ?payload, "register write");
        self.send(&Self::frame(id, Instruction::WriteData, &params))?;
        self.read_status(id).map(|_| ())
    }

    fn read_register(&mut self, id: u8, register: Register, len: u8) -> Result<Vec<u8>> {
        self.send(&Self::frame(id, Instruction::ReadData, &[register as u8, len]))?;
        let data = self.read_status(id)?;
        if data.len() != len as usize {
            return Err(HubError::BadResponse {
                id,
                reason: format!("expected {len} bytes, got {}", data.len()),
            });
        }
        Ok(data)
    }

    pub fn write_u8(&mut self, id: u8, register: Register, value: u8) -> Result<()> {
        self.write_register(id, register, &[value])
    }

    pub fn write_u16(&mut self, id: u8, register: Register, value: u16) -> Result<()> {
        self.write_register(id, register, &value.to_le_bytes())
    }

    /// Write a signed value in the bus's sign-magnitude encoding.
    pub fn write_i16(&mut self, id: u8, register: Register, value: i16) -> Result<()> {
        self.write_u16(id, register, encode_sign_magnitude(value))
    }

    pub fn read_u8(&mut self, id: u8, register: Register) -> Result<u8> {
        Ok(self.read_register(id, register, 1)?[0])
    }

    pub fn read_u16(&mut self, id: u8, register: Register) -> Result<u16> {
        let data = self.read_register(id, register, 2)?;
        Ok(u16::from_le_bytes([data[0], data[1]]))
    }

    /// Read a sign-magnitude register as a signed value.
    pub fn read_i16(&mut self, id: u8, register: Register) -> Result<i16> {
        Ok(decode_sign_magnitude(self.read_u16(id, register)?))
    }

    /// Read a 4-byte two's-complement register.
    pub fn read_i32(&mut self, id: u8, register: Register) -> Result<i32> {
        let data = self.read_register(id, register, 4)?;
        Ok(i32::from_le_bytes([data[0], data[1], data[2], data[3]]))
    }

    /// Write the same register on several units in one broadcast frame, so
    /// both wheels change speed in the same bus cycle. No status frame
    /// comes back for a sync write.
    pub fn sync_write_i16(&mut self, register: Register, data: &[(u8, i16)]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let mut params = vec![register as u8, 2];
        for &(id, value) in data {
            params.push(id);
            params.extend_from_slice(&encode_sign_magnitude(value).to_le_bytes());
        }
        debug!(units = data.len(), ?register, "sync write");
        self.send(&Self::frame(BROADCAST_ID, Instruction::SyncWrite, &params))
    }

    pub fn set_torque(&mut self, id: u8, on: bool) -> Result<()> {
        self.write_u8(id, Register::TorqueEnable, on as u8)
    }

    /// Operating mode changes require torque to be off.
    pub fn set_operating_mode(&mut self, id: u8, mode: OperatingMode) -> Result<()> {
        self.write_u8(id, Register::OperatingMode, mode as u8)
    }

    pub fn set_velocity(&mut self, id: u8, velocity: i16) -> Result<()> {
        self.write_i16(id, Register::GoalVelocity, velocity)
    }

    pub fn get_velocity(&mut self, id: u8) -> Result<i16> {
        self.read_i16(id, Register::PresentVelocity)
    }
}

/// Bit 15 = direction (1 = negative), bits 0-14 = magnitude.
fn encode_sign_magnitude(value: i16) -> u16 {
    if value >= 0 {
        value as u16
    } else {
        0x8000 | value.unsigned_abs()
    }
}

fn decode_sign_magnitude(raw: u16) -> i16 {
    let magnitude = (raw & 0x7FFF) as i16;
    if raw & 0x8000 != 0 { -magnitude } else { magnitude }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_complements_byte_sum() {
        // id=2, length=4, WRITE, addr=46, payload 0x64 0x00
        let body = [2u8, 4, 0x03, 46, 0x64, 0x00];
        // sum = 155, !155 = 100
        assert_eq!(HubBus::checksum(&body), 100);
    }

    #[test]
    fn test_ping_frame_layout() {
        let frame = HubBus::frame(1, Instruction::Ping, &[]);
        assert_eq!(frame.len(), 6);
        assert_eq!(&frame[..2], &HEADER);
        assert_eq!(frame[2], 1); // unit id
        assert_eq!(frame[3], 2); // instruction + checksum
        assert_eq!(frame[4], 0x01);
        assert_eq!(frame[5], HubBus::checksum(&frame[2..5]));
    }

    #[test]
    fn test_sign_magnitude_round_trip() {
        assert_eq!(encode_sign_magnitude(0), 0);
        assert_eq!(encode_sign_magnitude(400), 400);
        assert_eq!(encode_sign_magnitude(-400), 0x8000 | 400);
        assert_eq!(encode_sign_magnitude(-1), 0x8001);

        for value in [0i16, 1, -1, 400, -400, 3000, -3000] {
            assert_eq!(decode_sign_magnitude(encode_sign_magnitude(value)), value);
        }
    }
}
