//! Closed enumerations shared by the model and every encoder.
//!
//! The numeric code of each kind is its position in the family's closed
//! list. The lists are part of the binary contract with the boot loader and
//! must not be reordered.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MappingError, Result};

/// A kind drawn from a closed, ordered list of names.
pub trait ClosedKind: Copy + Eq + Sized + 'static {
    /// Family name used in diagnostics.
    const FAMILY: &'static str;
    /// Every member, in code order.
    const ALL: &'static [Self];

    /// Canonical textual name.
    fn name(&self) -> &'static str;

    /// Numeric code: position of the kind in [`ClosedKind::ALL`].
    fn code(&self) -> Option<u32> {
        Self::ALL
            .iter()
            .position(|k| k == self)
            .map(|pos| pos as u32)
    }

    /// Look a kind up by its canonical name.
    fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == name)
            .ok_or_else(|| MappingError::UnknownKind {
                family: Self::FAMILY,
                name: name.to_string(),
            })
    }

    /// Decode a numeric code.
    fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

macro_rules! closed_kind {
    (
        $(#[$meta:meta])*
        $ty:ident, $family:literal {
            $($(#[$vmeta:meta])* $variant:ident => $name:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $ty {
            $($(#[$vmeta])* #[serde(rename = $name)] $variant,)+
        }

        impl ClosedKind for $ty {
            const FAMILY: &'static str = $family;
            const ALL: &'static [Self] = &[$($ty::$variant,)+];

            fn name(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

closed_kind! {
    /// Physical segment kind.
    PsegType, "pseg type" {
        Ram => "RAM",
        Peri => "PERI",
    }
}

closed_kind! {
    /// Peripheral type.
    PeriphType, "peripheral type" {
        /// Chained buffer DMA controller.
        Cma => "CMA",
        Dma => "DMA",
        /// Frame buffer.
        Fbf => "FBF",
        /// I/O bridge.
        Iob => "IOB",
        /// Block storage controller.
        Ioc => "IOC",
        /// Memory cache configuration interface.
        Mmc => "MMC",
        /// Coprocessor wrapper.
        Mwr => "MWR",
        Nic => "NIC",
        Rom => "ROM",
        /// Simulation helper.
        Sim => "SIM",
        Tim => "TIM",
        Tty => "TTY",
        /// Replicated interrupt controller with timers and mailboxes.
        Xcu => "XCU",
        /// External interrupt concentrator.
        Pic => "PIC",
        Drom => "DROM",
    }
}

closed_kind! {
    /// Storage controller flavour of an IOC peripheral.
    IocSubtype, "IOC subtype" {
        Bdv => "BDV",
        Hba => "HBA",
        Sdc => "SDC",
        Spi => "SPI",
    }
}

closed_kind! {
    /// Coprocessor flavour of an MWR peripheral.
    MwrSubtype, "MWR subtype" {
        Gcd => "GCD",
        Dct => "DCT",
        Cpy => "CPY",
    }
}

closed_kind! {
    /// Interrupt line kind.
    IrqType, "irq type" {
        /// Hardware interrupt.
        Hwi => "HWI",
        /// Write-triggered interrupt.
        Wti => "WTI",
        /// Programmable timer interrupt.
        Pti => "PTI",
    }
}

closed_kind! {
    /// Interrupt service routine selected by the kernel for an irq.
    IsrType, "ISR type" {
        Default => "ISR_DEFAULT",
        Tick => "ISR_TICK",
        TtyRx => "ISR_TTY_RX",
        TtyTx => "ISR_TTY_TX",
        Bdv => "ISR_BDV",
        Timer => "ISR_TIMER",
        Wakup => "ISR_WAKUP",
        NicRx => "ISR_NIC_RX",
        NicTx => "ISR_NIC_TX",
        Cma => "ISR_CMA",
        Mmc => "ISR_MMC",
        Dma => "ISR_DMA",
        Sdc => "ISR_SDC",
        Mwr => "ISR_MWR",
        Hba => "ISR_HBA",
        Spi => "ISR_SPI",
    }
}

closed_kind! {
    /// Virtual segment kind.
    VsegType, "vseg type" {
        Elf => "ELF",
        Blob => "BLOB",
        /// Page table.
        Ptab => "PTAB",
        Peri => "PERI",
        Buffer => "BUFFER",
        /// Scheduler.
        Sched => "SCHED",
        Heap => "HEAP",
    }
}

/// Subtype attached to a peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PeriphSubtype {
    #[default]
    None,
    Ioc(IocSubtype),
    Mwr(MwrSubtype),
}

impl PeriphSubtype {
    /// Code written in the binary descriptor.
    pub const NONE_CODE: u32 = 0xFFFF_FFFF;

    pub fn name(&self) -> &'static str {
        match self {
            PeriphSubtype::None => "NONE",
            PeriphSubtype::Ioc(s) => s.name(),
            PeriphSubtype::Mwr(s) => s.name(),
        }
    }

    /// Position in the owning subtype list, or [`PeriphSubtype::NONE_CODE`].
    pub fn code(&self) -> Option<u32> {
        match self {
            PeriphSubtype::None => Some(Self::NONE_CODE),
            PeriphSubtype::Ioc(s) => s.code(),
            PeriphSubtype::Mwr(s) => s.code(),
        }
    }

    /// Whether this subtype may be carried by a peripheral of type `ptype`.
    pub fn fits(&self, ptype: PeriphType) -> bool {
        match (ptype, self) {
            (PeriphType::Ioc, PeriphSubtype::Ioc(_)) => true,
            (PeriphType::Mwr, PeriphSubtype::Mwr(_)) => true,
            (PeriphType::Ioc | PeriphType::Mwr, _) => false,
            (_, PeriphSubtype::None) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PeriphSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Access rights of a virtual segment: cacheable, executable, writable,
/// user-accessible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VsegMode {
    bits: u8,
}

impl VsegMode {
    pub const CACHEABLE: u8 = 0b1000;
    pub const EXECUTABLE: u8 = 0b0100;
    pub const WRITABLE: u8 = 0b0010;
    pub const USER: u8 = 0b0001;

    /// Mode names, in code order.
    pub const NAMES: [&'static str; 16] = [
        "____", "___U", "__W_", "__WU", "_X__", "_X_U", "_XW_", "_XWU", "C___", "C__U", "C_W_",
        "C_WU", "CX__", "CX_U", "CXW_", "CXWU",
    ];

    pub const C_W_: VsegMode = VsegMode { bits: 0b1010 };
    pub const C_WU: VsegMode = VsegMode { bits: 0b1011 };
    pub const CXW_: VsegMode = VsegMode { bits: 0b1110 };
    pub const CXWU: VsegMode = VsegMode { bits: 0b1111 };
    pub const CX__: VsegMode = VsegMode { bits: 0b1100 };
    pub const __W_: VsegMode = VsegMode { bits: 0b0010 };

    /// Build a mode from raw flag bits; `None` above the four flags.
    pub fn from_bits(bits: u8) -> Option<Self> {
        (bits < 16).then_some(Self { bits })
    }

    pub fn parse(name: &str) -> Result<Self> {
        Self::NAMES
            .iter()
            .position(|n| *n == name)
            .map(|pos| Self { bits: pos as u8 })
            .ok_or_else(|| MappingError::UnknownKind {
                family: "vseg mode",
                name: name.to_string(),
            })
    }

    pub fn has(&self, flag: u8) -> bool {
        self.bits & flag != 0
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn name(&self) -> &'static str {
        Self::NAMES[usize::from(self.bits & 0xF)]
    }

    /// Numeric code, found by name lookup in [`VsegMode::NAMES`].
    pub fn code(&self) -> Option<u32> {
        Self::NAMES
            .iter()
            .position(|n| *n == self.name())
            .map(|pos| pos as u32)
    }
}

impl fmt::Display for VsegMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
