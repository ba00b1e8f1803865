//! The `tsar_generic` architecture template.
//!
//! Every cluster of the grid holds a RAM bank, an XCU interrupt controller,
//! a multi-channel DMA, a memory cache configuration interface and
//! `nprocs` processors. The I/O cluster adds the external peripherals:
//! block device, TTY, NIC, CMA, frame buffer, simulation helper and boot
//! ROM.
//!
//! The template also registers the global vsegs shared by the boot loader
//! and the kernel. Per-cluster kernel structures are named
//! `seg_kernel_<what>_<x>_<y>` so every copy of one structure shares its
//! first fifteen characters.

use serde::{Deserialize, Serialize};
use tracing::info;

use genmap_core::builder::MappingBuilder;
use genmap_core::entity::{PeriphDesc, VsegDesc};
use genmap_core::kinds::{IocSubtype, IsrType, PeriphSubtype, PeriphType, VsegMode, VsegType};
use genmap_core::mapping::PlatformParams;

use crate::error::{PlatformError, Result};

/// Name of the only built-in architecture template.
pub const TEMPLATE_NAME: &str = "tsar_generic";

/// Size of a peripheral register window.
pub const PERI_SIZE: u64 = 0x1000;

const XCU_BASE: u64 = 0xB000_0000;
const DMA_BASE: u64 = 0xB100_0000;
const MMC_BASE: u64 = 0xB200_0000;
const IOC_BASE: u64 = 0xB300_0000;
const TTY_BASE: u64 = 0xB400_0000;
const NIC_BASE: u64 = 0xB500_0000;
const CMA_BASE: u64 = 0xB600_0000;
const FBF_BASE: u64 = 0xB700_0000;
const FBF_SIZE: u64 = 0x0100_0000;
const SIM_BASE: u64 = 0xB900_0000;
const ROM_BASE: u64 = 0xBFC0_0000;
const ROM_SIZE: u64 = 0x0001_0000;

/// XCU input ports.
const MMC_PORT: u32 = 1;
const IOC_PORT: u32 = 2;
const DMA_PORT: u32 = 8;
const TTY_PORT: u32 = 16;
const NIC_RX_PORT: u32 = 24;
const NIC_TX_PORT: u32 = 25;
const CMA_PORT: u32 = 28;

/// Kernel binary loaded in every cluster.
const KERNEL_ELF: &str = "bin/kernel/kernel.elf";

const PTAB_BASE: u64 = 0x9000_0000;
const PTAB_SIZE: u64 = 0x0020_0000;
const SCHED_BASE: u64 = 0x8800_0000;
const SCHED_STRIDE: u64 = 0x0001_0000;
/// Scheduler area of one processor.
const SCHED_PER_PROC: u64 = 0x2000;
const HEAP_BASE: u64 = 0x8900_0000;
const HEAP_SIZE: u64 = 0x0002_0000;

const RAMDISK_BASE: u64 = 0x0200_0000;
const RAMDISK_SIZE: u64 = 0x0100_0000;

/// Most processors per cluster: DMA channel ports stop below the TTY ports.
pub const MAX_PROCS: u32 = 8;
/// Most TTY channels: TTY ports stop below the NIC ports.
pub const MAX_TTYS: u32 = 8;

/// Knobs of the `tsar_generic` template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ArchConfig {
    /// Platform name, before application suffixes are appended.
    pub name: String,
    pub x_size: u32,
    pub y_size: u32,
    /// Processors in every cluster.
    pub nprocs: u32,
    /// RAM bank size per cluster.
    pub ram_size: u64,
    pub x_io: u32,
    pub y_io: u32,
    pub irq_per_proc: u32,
    /// Block storage flavour of the IOC.
    pub ioc: IocSubtype,
    /// Replace the IOC by a RAM disk.
    pub use_ramdisk: bool,
    pub nb_ttys: u32,
    /// Frame buffer side, in pixels.
    pub fbf_size: u32,
}

impl Default for ArchConfig {
    fn default() -> Self {
        Self {
            name: "tsar".to_string(),
            x_size: 2,
            y_size: 2,
            nprocs: 4,
            ram_size: 0x0400_0000,
            x_io: 0,
            y_io: 0,
            irq_per_proc: 1,
            ioc: IocSubtype::Bdv,
            use_ramdisk: false,
            nb_ttys: 1,
            fbf_size: 128,
        }
    }
}

impl ArchConfig {
    /// Check the knobs the template adds on top of [`PlatformParams`].
    pub fn validate(&self) -> Result<()> {
        if self.nprocs == 0 || self.nprocs > MAX_PROCS {
            return Err(PlatformError::InvalidConfig {
                detail: format!("nprocs must be in 1..={MAX_PROCS}, got {}", self.nprocs),
            });
        }
        if self.nb_ttys == 0 || self.nb_ttys > MAX_TTYS {
            return Err(PlatformError::InvalidConfig {
                detail: format!("nb-ttys must be in 1..={MAX_TTYS}, got {}", self.nb_ttys),
            });
        }
        if self.irq_per_proc == 0 || self.irq_per_proc > 4 {
            return Err(PlatformError::InvalidConfig {
                detail: format!("irq-per-proc must be in 1..=4, got {}", self.irq_per_proc),
            });
        }
        if self.ram_size == 0 || self.ram_size & 0xFFF != 0 {
            return Err(PlatformError::InvalidConfig {
                detail: format!(
                    "ram-size must be a non-zero multiple of 4 KiB, got {:#x}",
                    self.ram_size
                ),
            });
        }
        if self.use_ramdisk && self.ram_size < RAMDISK_BASE + RAMDISK_SIZE {
            return Err(PlatformError::InvalidConfig {
                detail: format!(
                    "ram-size {:#x} too small for the RAM disk at {RAMDISK_BASE:#x}",
                    self.ram_size
                ),
            });
        }
        Ok(())
    }

    /// Platform parameters derived from the knobs.
    pub fn params(&self) -> PlatformParams {
        let mut params =
            PlatformParams::new(self.name.clone(), self.x_size, self.y_size, self.nprocs);
        params.x_io = self.x_io;
        params.y_io = self.y_io;
        params.irq_per_proc = self.irq_per_proc;
        params.use_ramdisk = self.use_ramdisk;
        params.ram_size = self.ram_size;
        params
    }
}

/// Instantiate the hardware and the global vsegs of `tsar_generic`.
///
/// The returned builder is ready for applications to add their vspaces.
pub fn tsar_generic(config: &ArchConfig) -> Result<MappingBuilder> {
    config.validate()?;
    let mut b = MappingBuilder::new(config.params())?;

    for x in 0..config.x_size {
        for y in 0..config.y_size {
            add_cluster(&mut b, config, x, y)?;
        }
    }
    add_boot_vsegs(&mut b, config)?;
    add_kernel_vsegs(&mut b, config)?;
    add_peripheral_vsegs(&mut b, config)?;

    info!(
        template = TEMPLATE_NAME,
        name = %config.name,
        x_size = config.x_size,
        y_size = config.y_size,
        nprocs = config.nprocs,
        "architecture instantiated"
    );
    Ok(b)
}

fn add_cluster(b: &mut MappingBuilder, config: &ArchConfig, x: u32, y: u32) -> Result<()> {
    let base = b.mapping().geometry().encode(x, y);
    let nprocs = config.nprocs;

    b.add_ram("RAM", base, config.ram_size)?;
    let xcu = b.add_periph(
        "XCU",
        base + XCU_BASE,
        PERI_SIZE,
        PeriphDesc::new(PeriphType::Xcu)
            .channels(nprocs * config.irq_per_proc)
            .args([16, 16, 16, 0]),
    )?;
    let dma = b.add_periph(
        "DMA",
        base + DMA_BASE,
        PERI_SIZE,
        PeriphDesc::new(PeriphType::Dma).channels(nprocs),
    )?;
    let mmc = b.add_periph("MMC", base + MMC_BASE, PERI_SIZE, PeriphDesc::new(PeriphType::Mmc))?;

    let io = x == config.x_io && y == config.y_io;
    let mut devices = Vec::new();
    if io {
        if !config.use_ramdisk {
            let ioc = b.add_periph(
                "IOC",
                base + IOC_BASE,
                PERI_SIZE,
                PeriphDesc::new(PeriphType::Ioc).subtype(PeriphSubtype::Ioc(config.ioc)),
            )?;
            devices.push((ioc, IOC_PORT, ioc_isr(config.ioc), 0));
        }
        let tty = b.add_periph(
            "TTY",
            base + TTY_BASE,
            PERI_SIZE,
            PeriphDesc::new(PeriphType::Tty).channels(config.nb_ttys),
        )?;
        for channel in 0..config.nb_ttys {
            devices.push((tty, TTY_PORT + channel, IsrType::TtyRx, channel));
        }
        let nic = b.add_periph("NIC", base + NIC_BASE, PERI_SIZE, PeriphDesc::new(PeriphType::Nic))?;
        devices.push((nic, NIC_RX_PORT, IsrType::NicRx, 0));
        devices.push((nic, NIC_TX_PORT, IsrType::NicTx, 0));
        let cma = b.add_periph("CMA", base + CMA_BASE, PERI_SIZE, PeriphDesc::new(PeriphType::Cma))?;
        devices.push((cma, CMA_PORT, IsrType::Cma, 0));
        b.add_periph(
            "FBF",
            base + FBF_BASE,
            FBF_SIZE,
            PeriphDesc::new(PeriphType::Fbf).args([config.fbf_size, config.fbf_size, 0, 0]),
        )?;
        b.add_periph("SIM", base + SIM_BASE, PERI_SIZE, PeriphDesc::new(PeriphType::Sim))?;
        b.add_periph("ROM", base + ROM_BASE, ROM_SIZE, PeriphDesc::new(PeriphType::Rom))?;
    }

    b.add_irq(xcu, MMC_PORT, mmc, IsrType::Mmc, 0)?;
    for channel in 0..nprocs {
        b.add_irq(xcu, DMA_PORT + channel, dma, IsrType::Dma, channel)?;
    }
    for (src, port, isr, channel) in devices {
        b.add_irq(xcu, port, src, isr, channel)?;
    }

    for lpid in 0..nprocs {
        b.add_proc(x, y, lpid)?;
    }
    Ok(())
}

fn ioc_isr(subtype: IocSubtype) -> IsrType {
    match subtype {
        IocSubtype::Bdv => IsrType::Bdv,
        IocSubtype::Hba => IsrType::Hba,
        IocSubtype::Sdc => IsrType::Sdc,
        IocSubtype::Spi => IsrType::Spi,
    }
}

/// Identity mapped segments used by the boot loader, in cluster (0,0).
fn add_boot_vsegs(b: &mut MappingBuilder, config: &ArchConfig) -> Result<()> {
    b.add_global(
        VsegDesc::new("seg_boot_mapping", 0x0, 0x8_0000, VsegMode::C_W_, VsegType::Blob)
            .identity()
            .binpath("map.bin"),
    )?;
    b.add_global(
        VsegDesc::new("seg_boot_code", 0x8_0000, 0x4_0000, VsegMode::CXW_, VsegType::Buffer)
            .identity(),
    )?;
    b.add_global(
        VsegDesc::new("seg_boot_data", 0xC_0000, 0x8_0000, VsegMode::C_W_, VsegType::Buffer)
            .identity(),
    )?;
    b.add_global(
        VsegDesc::new("seg_boot_stack", 0x14_0000, 0x5_0000, VsegMode::C_W_, VsegType::Buffer)
            .identity(),
    )?;
    if config.use_ramdisk {
        b.add_global(
            VsegDesc::new(
                "seg_ramdisk",
                RAMDISK_BASE,
                RAMDISK_SIZE,
                VsegMode::C_W_,
                VsegType::Buffer,
            )
            .identity()
            .big(),
        )?;
    }
    Ok(())
}

fn add_kernel_vsegs(b: &mut MappingBuilder, config: &ArchConfig) -> Result<()> {
    // Code and init are replicated in every cluster.
    for x in 0..config.x_size {
        for y in 0..config.y_size {
            b.add_global(
                VsegDesc::new("seg_kernel_code", 0x8000_0000, 0x2_0000, VsegMode::CX__, VsegType::Elf)
                    .on(x, y, "RAM")
                    .local()
                    .binpath(KERNEL_ELF),
            )?;
            b.add_global(
                VsegDesc::new("seg_kernel_init", 0x8004_0000, 0x1_0000, VsegMode::CX__, VsegType::Elf)
                    .on(x, y, "RAM")
                    .local()
                    .binpath(KERNEL_ELF),
            )?;
        }
    }
    b.add_global(
        VsegDesc::new("seg_kernel_data", 0x8002_0000, 0x2_0000, VsegMode::C_W_, VsegType::Elf)
            .binpath(KERNEL_ELF),
    )?;

    let params = b.params().clone();
    for x in 0..config.x_size {
        for y in 0..config.y_size {
            let cid = u64::from(params.cluster_index(x, y));
            b.add_global(
                VsegDesc::new(
                    format!("seg_kernel_ptab_{x}_{y}"),
                    PTAB_BASE + cid * PTAB_SIZE,
                    PTAB_SIZE,
                    VsegMode::C_W_,
                    VsegType::Ptab,
                )
                .on(x, y, "RAM")
                .big(),
            )?;
            b.add_global(
                VsegDesc::new(
                    format!("seg_kernel_sched_{x}_{y}"),
                    SCHED_BASE + cid * SCHED_STRIDE,
                    u64::from(config.nprocs) * SCHED_PER_PROC,
                    VsegMode::C_W_,
                    VsegType::Sched,
                )
                .on(x, y, "RAM"),
            )?;
            b.add_global(
                VsegDesc::new(
                    format!("seg_kernel_heap_{x}_{y}"),
                    HEAP_BASE + cid * HEAP_SIZE,
                    HEAP_SIZE,
                    VsegMode::C_W_,
                    VsegType::Heap,
                )
                .on(x, y, "RAM"),
            )?;
        }
    }
    Ok(())
}

/// Uncached register windows. Replicated peripherals are spaced by the
/// platform's `peri_increment`.
fn add_peripheral_vsegs(b: &mut MappingBuilder, config: &ArchConfig) -> Result<()> {
    let geom = b.mapping().geometry();
    let increment = u64::from(b.params().peri_increment);
    for x in 0..config.x_size {
        for y in 0..config.y_size {
            let offset = u64::from(geom.cluster_xy(x, y)) * increment;
            for (name, base) in [("xcu", XCU_BASE), ("dma", DMA_BASE), ("mmc", MMC_BASE)] {
                b.add_global(
                    VsegDesc::new(
                        format!("seg_{name}_{x}_{y}"),
                        base + offset,
                        PERI_SIZE,
                        VsegMode::__W_,
                        VsegType::Peri,
                    )
                    .on(x, y, name.to_uppercase()),
                )?;
            }
        }
    }

    let (x_io, y_io) = (config.x_io, config.y_io);
    let mut io = Vec::new();
    if !config.use_ramdisk {
        io.push(("seg_ioc", "IOC", IOC_BASE, PERI_SIZE));
    }
    io.extend([
        ("seg_tty", "TTY", TTY_BASE, PERI_SIZE),
        ("seg_nic", "NIC", NIC_BASE, PERI_SIZE),
        ("seg_cma", "CMA", CMA_BASE, PERI_SIZE),
        ("seg_fbf", "FBF", FBF_BASE, FBF_SIZE),
        ("seg_sim", "SIM", SIM_BASE, PERI_SIZE),
        ("seg_rom", "ROM", ROM_BASE, ROM_SIZE),
    ]);
    for (name, pseg, base, size) in io {
        b.add_global(
            VsegDesc::new(name, base, size, VsegMode::__W_, VsegType::Peri).on(x_io, y_io, pseg),
        )?;
    }
    Ok(())
}
