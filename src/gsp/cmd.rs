//! Ioctl command layout of the GSP misc device
//!
//! The command number follows the usual Linux layout (`dir << 30 | size << 16
//! | type << 8 | nr`). The 8-bit `nr` field is packed again by the driver:
//!
//! ```text
//!  7   6   5      4      3 .. 0
//! [ opcode ] async  split  count
//! ```
//!
//! Requests are decoded once at the boundary into a [`GspRequest`].

use log::debug;

use crate::error::{GspError, GspResult};

/// Ioctl type byte of the GSP device
pub const GSP_IO_MAGIC: u8 = b'G';

/// Opcode bits of `nr`
pub const GSP_IO_MASK: u8 = 0x3 << 6;
/// Opcode: read the capability descriptor
pub const GSP_GET_CAPABILITY: u8 = 0x0 << 6;
/// Opcode: submit kcfgs
pub const GSP_TRIGGER: u8 = 0x1 << 6;
/// Trigger returns without waiting for completion
pub const GSP_ASYNC_MASK: u8 = 1 << 5;
/// Trigger spreads its kcfgs over all cores
pub const GSP_SPLIT_MASK: u8 = 1 << 4;
/// Number of kcfgs in a trigger
pub const GSP_CNT_MASK: u8 = 0xF;

/// No data transfer
pub const IOC_NONE: u8 = 0;
/// User writes, driver reads
pub const IOC_WRITE: u8 = 1;
/// Driver writes, user reads
pub const IOC_READ: u8 = 2;

const IOC_SIZE_MASK: u32 = 0x3FFF;

/// Raw fields of an ioctl command number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoctlCmd {
    /// Transfer direction
    pub dir: u8,
    /// Type (magic) byte
    pub ty: u8,
    /// Command number
    pub nr: u8,
    /// Argument size in bytes (14 bits)
    pub size: u16,
}

impl IoctlCmd {
    /// Split a command number into its fields
    pub fn decode(cmd: u32) -> Self {
        Self {
            dir: ((cmd >> 30) & 0x3) as u8,
            ty: ((cmd >> 8) & 0xFF) as u8,
            nr: (cmd & 0xFF) as u8,
            size: ((cmd >> 16) & IOC_SIZE_MASK) as u16,
        }
    }

    /// Pack the fields into a command number
    pub fn encode(&self) -> u32 {
        ((self.dir as u32) << 30)
            | (((self.size as u32) & IOC_SIZE_MASK) << 16)
            | ((self.ty as u32) << 8)
            | (self.nr as u32)
    }
}

/// Trigger parameters carried in the command number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerRequest {
    /// Return without waiting
    pub is_async: bool,
    /// Spread over cores
    pub split: bool,
    /// Number of kcfgs
    pub cnt: u32,
    /// Size of one kcfg
    pub size: usize,
}

/// Decoded GSP ioctl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GspRequest {
    /// Read the capability into a buffer of `size` bytes
    GetCapability {
        /// Buffer size from the command
        size: usize,
    },
    /// Submit kcfgs
    Trigger(TriggerRequest),
    /// Any other opcode
    Unknown {
        /// Opcode bits
        opcode: u8,
    },
}

impl GspRequest {
    /// Decode a command number; a foreign type byte is `NotTty`
    pub fn decode(cmd: u32) -> GspResult<Self> {
        let raw = IoctlCmd::decode(cmd);
        if raw.ty != GSP_IO_MAGIC {
            return Err(GspError::NotTty(cmd));
        }
        let size = raw.size as usize;
        let request = match raw.nr & GSP_IO_MASK {
            GSP_GET_CAPABILITY => GspRequest::GetCapability { size },
            GSP_TRIGGER => GspRequest::Trigger(TriggerRequest {
                is_async: raw.nr & GSP_ASYNC_MASK != 0,
                split: raw.nr & GSP_SPLIT_MASK != 0,
                cnt: (raw.nr & GSP_CNT_MASK) as u32,
                size,
            }),
            opcode => GspRequest::Unknown { opcode },
        };
        debug!("ioctl 0x{:08x} -> {:?}", cmd, request);
        Ok(request)
    }

    /// Build the command number for this request
    pub fn encode(&self) -> u32 {
        let cmd = match *self {
            GspRequest::GetCapability { size } => IoctlCmd {
                dir: IOC_READ,
                ty: GSP_IO_MAGIC,
                nr: GSP_GET_CAPABILITY,
                size: size as u16,
            },
            GspRequest::Trigger(req) => {
                let mut nr = GSP_TRIGGER | (req.cnt as u8 & GSP_CNT_MASK);
                if req.is_async {
                    nr |= GSP_ASYNC_MASK;
                }
                if req.split {
                    nr |= GSP_SPLIT_MASK;
                }
                IoctlCmd { dir: IOC_WRITE, ty: GSP_IO_MAGIC, nr, size: req.size as u16 }
            }
            GspRequest::Unknown { opcode } => IoctlCmd {
                dir: IOC_NONE,
                ty: GSP_IO_MAGIC,
                nr: opcode & GSP_IO_MASK,
                size: 0,
            },
        };
        cmd.encode()
    }
}

/// Command number of GET_CAPABILITY with a `size`-byte buffer
pub fn gsp_get_capability_cmd(size: usize) -> u32 {
    GspRequest::GetCapability { size }.encode()
}

/// Command number of a trigger of `cnt` kcfgs of `size` bytes each
pub fn gsp_trigger_cmd(is_async: bool, split: bool, cnt: u32, size: usize) -> u32 {
    GspRequest::Trigger(TriggerRequest { is_async, split, cnt, size }).encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trigger_fields() {
        let cmd = gsp_trigger_cmd(true, false, 3, 64);
        assert_eq!(cmd >> 30, IOC_WRITE as u32);
        assert_eq!((cmd >> 8) & 0xFF, b'G' as u32);
        assert_eq!(cmd & 0xFF, 0x40 | 0x20 | 3);
        assert_eq!(
            GspRequest::decode(cmd).unwrap(),
            GspRequest::Trigger(TriggerRequest { is_async: true, split: false, cnt: 3, size: 64 })
        );
    }

    #[test]
    fn test_capability_cmd() {
        let cmd = gsp_get_capability_cmd(44);
        assert_eq!(IoctlCmd::decode(cmd).dir, IOC_READ);
        assert_eq!(GspRequest::decode(cmd).unwrap(), GspRequest::GetCapability { size: 44 });
    }

    #[test]
    fn test_foreign_magic_is_not_tty() {
        let cmd = IoctlCmd { dir: IOC_READ, ty: b'M', nr: 0, size: 44 }.encode();
        assert!(matches!(GspRequest::decode(cmd), Err(GspError::NotTty(c)) if c == cmd));
    }

    #[test]
    fn test_unknown_opcode() {
        let cmd = IoctlCmd { dir: IOC_NONE, ty: GSP_IO_MAGIC, nr: 0xC0, size: 0 }.encode();
        assert_eq!(GspRequest::decode(cmd).unwrap(), GspRequest::Unknown { opcode: 0xC0 });
    }

    #[test]
    fn test_count_zero_survives_decode() {
        let cmd = gsp_trigger_cmd(false, false, 0, 16);
        match GspRequest::decode(cmd).unwrap() {
            GspRequest::Trigger(req) => assert_eq!(req.cnt, 0),
            other => panic!("unexpected {:?}", other),
        }
    }
}
