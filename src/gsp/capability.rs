//! Capability descriptor reported through GET_CAPABILITY

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::{GspError, GspResult};

use super::revisions::RevisionInfo;

/// Magic value at the head of every capability blob
pub const CAPABILITY_MAGIC: u32 = 0xDEEF_BEEF;

/// Number of 32-bit words in the encoded descriptor
const CAPABILITY_WORDS: usize = 11;

/// Encoded size of [`Capability`] in bytes
pub const CAPABILITY_SIZE: usize = CAPABILITY_WORDS * 4;

/// Hardware limits of one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Always [`CAPABILITY_MAGIC`]
    pub magic: u32,
    /// Hardware version register value
    pub version: u32,
    /// Maximum kcfgs per trigger (device level)
    pub io_cnt: u32,
    /// Number of cores (device level)
    pub core_cnt: u32,
    /// Layers blended per job
    pub max_layer: u32,
    /// Video layers per job
    pub max_video_layer: u32,
    /// Maximum output width
    pub max_width: u32,
    /// Maximum output height
    pub max_height: u32,
    /// Maximum upscale factor
    pub scale_up_max: u32,
    /// Maximum downscale divisor
    pub scale_down_max: u32,
    /// Rotation support
    pub rotation: bool,
}

impl Capability {
    /// Static per-core capability; device counts are left at zero
    pub fn from_revision(info: &RevisionInfo) -> Self {
        Self {
            magic: CAPABILITY_MAGIC,
            version: info.version,
            io_cnt: 0,
            core_cnt: 0,
            max_layer: info.max_layer,
            max_video_layer: info.max_video_layer,
            max_width: info.max_width,
            max_height: info.max_height,
            scale_up_max: info.scale_up_max,
            scale_down_max: info.scale_down_max,
            rotation: info.rotation,
        }
    }

    /// Little-endian wire encoding, exactly [`CAPABILITY_SIZE`] bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(CAPABILITY_SIZE);
        buf.put_u32_le(self.magic);
        buf.put_u32_le(self.version);
        buf.put_u32_le(self.io_cnt);
        buf.put_u32_le(self.core_cnt);
        buf.put_u32_le(self.max_layer);
        buf.put_u32_le(self.max_video_layer);
        buf.put_u32_le(self.max_width);
        buf.put_u32_le(self.max_height);
        buf.put_u32_le(self.scale_up_max);
        buf.put_u32_le(self.scale_down_max);
        buf.put_u32_le(self.rotation as u32);
        buf
    }

    /// Decode a blob produced by [`Capability::to_bytes`]
    pub fn from_bytes(mut buf: &[u8]) -> GspResult<Self> {
        if buf.len() < CAPABILITY_SIZE {
            return Err(GspError::InvalidArgument(format!(
                "capability blob of {} bytes",
                buf.len()
            )));
        }
        let magic = buf.get_u32_le();
        if magic != CAPABILITY_MAGIC {
            return Err(GspError::InvalidArgument(format!("bad capability magic 0x{:08x}", magic)));
        }
        Ok(Self {
            magic,
            version: buf.get_u32_le(),
            io_cnt: buf.get_u32_le(),
            core_cnt: buf.get_u32_le(),
            max_layer: buf.get_u32_le(),
            max_video_layer: buf.get_u32_le(),
            max_width: buf.get_u32_le(),
            max_height: buf.get_u32_le(),
            scale_up_max: buf.get_u32_le(),
            scale_down_max: buf.get_u32_le(),
            rotation: buf.get_u32_le() != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gsp::revisions::GSP_REVISIONS;

    #[test]
    fn test_encoded_size() {
        let capa = Capability::from_revision(&GSP_REVISIONS[0]);
        let bytes = capa.to_bytes();
        assert_eq!(bytes.len(), CAPABILITY_SIZE);
        assert_eq!(&bytes[0..4], &CAPABILITY_MAGIC.to_le_bytes());
        assert_eq!(Capability::from_bytes(&bytes).unwrap(), capa);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Capability::from_bytes(&[0u8; 8]).is_err());
        assert!(Capability::from_bytes(&[0u8; CAPABILITY_SIZE]).is_err());
    }
}
