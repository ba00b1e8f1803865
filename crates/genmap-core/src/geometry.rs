//! Physical address geometry.
//!
//! A physical address is split in three fields, from most to least
//! significant: the cluster x coordinate, the cluster y coordinate and the
//! local offset inside the cluster.
//!
//! ```text
//! |<------------------- paddr_width ------------------->|
//! +---------+---------+---------------------------------+
//! |    x    |    y    |           local offset          |
//! +---------+---------+---------------------------------+
//!  x_width   y_width    paddr_width - x_width - y_width
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{MappingError, Result};

/// Number of bits encoding a physical address.
pub const PADDR_WIDTH: u32 = 40;
/// Number of bits encoding the cluster x coordinate.
pub const X_WIDTH: u32 = 4;
/// Number of bits encoding the cluster y coordinate.
pub const Y_WIDTH: u32 = 4;
/// Number of bits encoding a local processor index.
pub const P_WIDTH: u32 = 4;

/// Offset mask inside a small (4 KiB) page.
pub const PAGE_OFFSET_MASK: u64 = 0xFFF;

/// Field widths used to split physical addresses and processor ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressGeometry {
    pub paddr_width: u32,
    pub x_width: u32,
    pub y_width: u32,
    pub p_width: u32,
}

impl Default for AddressGeometry {
    fn default() -> Self {
        Self {
            paddr_width: PADDR_WIDTH,
            x_width: X_WIDTH,
            y_width: Y_WIDTH,
            p_width: P_WIDTH,
        }
    }
}

impl AddressGeometry {
    /// Check that the widths describe a usable address split.
    pub fn validate(&self) -> Result<()> {
        if self.paddr_width > 64 {
            return Err(MappingError::InvalidGeometry {
                detail: format!("paddr_width {} exceeds 64 bits", self.paddr_width),
            });
        }
        if self.x_width + self.y_width == 0 || self.x_width + self.y_width >= self.paddr_width {
            return Err(MappingError::InvalidGeometry {
                detail: format!(
                    "x_width ({}) + y_width ({}) must be in 1..{}",
                    self.x_width, self.y_width, self.paddr_width
                ),
            });
        }
        if self.x_width > 16 || self.y_width > 16 || self.p_width > 16 {
            return Err(MappingError::InvalidGeometry {
                detail: "coordinate and processor widths are limited to 16 bits".to_string(),
            });
        }
        Ok(())
    }

    /// Number of bits addressing a location inside one cluster.
    pub fn local_width(&self) -> u32 {
        self.paddr_width - self.x_width - self.y_width
    }

    /// Physical address prefix of cluster `(x, y)`.
    pub fn encode(&self, x: u32, y: u32) -> u64 {
        u64::from(self.cluster_xy(x, y)) << self.local_width()
    }

    /// Cluster coordinates of a physical address.
    ///
    /// Bits above `paddr_width` are kept in the x coordinate, so an address
    /// outside the physical space decodes to an out-of-grid cluster.
    pub fn decode(&self, paddr: u64) -> (u32, u32) {
        let cluster_xy = paddr >> self.local_width();
        let x = cluster_xy >> self.y_width;
        let y = cluster_xy & ((1u64 << self.y_width) - 1);
        (u32::try_from(x).unwrap_or(u32::MAX), y as u32)
    }

    /// Offset of a physical address inside its cluster.
    pub fn local_offset(&self, paddr: u64) -> u64 {
        paddr & ((1u64 << self.local_width()) - 1)
    }

    /// Concatenated cluster coordinate, `(x << y_width) + y`.
    pub fn cluster_xy(&self, x: u32, y: u32) -> u32 {
        (x << self.y_width) + y
    }

    /// Hardware processor identifier, `(cluster_xy << p_width) + lpid`.
    pub fn proc_id(&self, x: u32, y: u32, lpid: u32) -> u32 {
        (self.cluster_xy(x, y) << self.p_width) + lpid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let geom = AddressGeometry::default();
        let offsets = [0u64, 1, 0xFFF, 0x1234_5678, (1u64 << geom.local_width()) - 1];
        for x in 0..16 {
            for y in 0..16 {
                for offset in offsets {
                    let paddr = geom.encode(x, y) | offset;
                    assert_eq!(geom.decode(paddr), (x, y), "paddr {paddr:#x}");
                    assert_eq!(geom.local_offset(paddr), offset);
                }
            }
        }
    }

    #[test]
    fn default_split_is_32_bit_local() {
        let geom = AddressGeometry::default();
        assert_eq!(geom.local_width(), 32);
        assert_eq!(geom.encode(1, 2), 0x12_0000_0000);
        assert_eq!(geom.decode(0x12_B000_0000), (1, 2));
    }

    #[test]
    fn address_beyond_paddr_width_decodes_out_of_grid() {
        let geom = AddressGeometry::default();
        let (x, _) = geom.decode(1u64 << 48);
        assert!(x >= 16);
    }

    #[test]
    fn proc_id_packs_coordinates() {
        let geom = AddressGeometry::default();
        assert_eq!(geom.cluster_xy(1, 1), 0x11);
        assert_eq!(geom.proc_id(1, 1, 3), 0x113);
        assert_eq!(geom.proc_id(0, 0, 0), 0);
    }

    #[test]
    fn invalid_widths_rejected() {
        let geom = AddressGeometry {
            paddr_width: 8,
            x_width: 4,
            y_width: 4,
            p_width: 4,
        };
        assert!(matches!(
            geom.validate(),
            Err(MappingError::InvalidGeometry { .. })
        ));
        assert!(AddressGeometry::default().validate().is_ok());
    }
}
