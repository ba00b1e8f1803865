//! Shared two-cluster platform used by the exporter tests.

use genmap_core::builder::MappingBuilder;
use genmap_core::entity::{PeriphDesc, TaskDesc, VsegDesc};
use genmap_core::kinds::{IocSubtype, IsrType, PeriphSubtype, PeriphType, VsegMode, VsegType};
use genmap_core::mapping::{Mapping, PlatformParams};

pub const RAM_SIZE: u64 = 0x0400_0000;

/// Cluster (0,0) holds the I/O peripherals, cluster (0,1) only RAM and an
/// XCU. Two processors per cluster.
pub fn fixture_builder() -> MappingBuilder {
    let mut params = PlatformParams::new("fixture", 1, 2, 2);
    params.ram_size = RAM_SIZE;
    let mut b = MappingBuilder::new(params).unwrap();
    let geom = b.mapping().geometry();

    b.add_ram("RAM", 0, RAM_SIZE).unwrap();
    let xcu = b
        .add_periph(
            "XCU",
            0xB000_0000,
            0x1000,
            PeriphDesc::new(PeriphType::Xcu).channels(2).args([16, 16, 16, 0]),
        )
        .unwrap();
    let dma = b
        .add_periph(
            "DMA",
            0xB100_0000,
            0x1000,
            PeriphDesc::new(PeriphType::Dma).channels(2),
        )
        .unwrap();
    let mmc = b
        .add_periph("MMC", 0xB200_0000, 0x1000, PeriphDesc::new(PeriphType::Mmc))
        .unwrap();
    let ioc = b
        .add_periph(
            "IOC",
            0xB300_0000,
            0x1000,
            PeriphDesc::new(PeriphType::Ioc).subtype(PeriphSubtype::Ioc(IocSubtype::Bdv)),
        )
        .unwrap();
    let tty = b
        .add_periph("TTY", 0xB400_0000, 0x1000, PeriphDesc::new(PeriphType::Tty))
        .unwrap();
    b.add_periph(
        "FBF",
        0xB700_0000,
        0x1000,
        PeriphDesc::new(PeriphType::Fbf).args([128, 128, 0, 0]),
    )
    .unwrap();
    b.add_periph("ROM", 0xBFC0_0000, 0x1_0000, PeriphDesc::new(PeriphType::Rom))
        .unwrap();
    b.add_irq(xcu, 0, dma, IsrType::Dma, 0).unwrap();
    b.add_irq(xcu, 1, dma, IsrType::Dma, 1).unwrap();
    b.add_irq(xcu, 2, mmc, IsrType::Mmc, 0).unwrap();
    b.add_irq(xcu, 8, ioc, IsrType::Bdv, 0).unwrap();
    b.add_irq(xcu, 16, tty, IsrType::TtyRx, 0).unwrap();
    b.add_proc(0, 0, 0).unwrap();
    b.add_proc(0, 0, 1).unwrap();

    let base = geom.encode(0, 1);
    b.add_ram("RAM", base, RAM_SIZE).unwrap();
    b.add_periph(
        "XCU",
        base + 0xB000_0000,
        0x1000,
        PeriphDesc::new(PeriphType::Xcu).channels(2).args([16, 16, 16, 0]),
    )
    .unwrap();
    b.add_proc(0, 1, 0).unwrap();
    b.add_proc(0, 1, 1).unwrap();

    for (name, vbase, length, mode) in [
        ("seg_boot_mapping", 0x0, 0x8_0000, VsegMode::C_W_),
        ("seg_boot_code", 0x8_0000, 0x4_0000, VsegMode::CXW_),
        ("seg_boot_data", 0xC_0000, 0x8_0000, VsegMode::C_W_),
        ("seg_boot_stack", 0x14_0000, 0x5_0000, VsegMode::C_W_),
    ] {
        b.add_global(VsegDesc::new(name, vbase, length, mode, VsegType::Buffer).identity())
            .unwrap();
    }
    for (name, vbase, length, mode) in [
        ("seg_kernel_code", 0x8000_0000, 0x2_0000, VsegMode::CX__),
        ("seg_kernel_data", 0x8002_0000, 0x2_0000, VsegMode::C_W_),
        ("seg_kernel_init", 0x8004_0000, 0x1_0000, VsegMode::CX__),
    ] {
        b.add_global(
            VsegDesc::new(name, vbase, length, mode, VsegType::Elf)
                .binpath("bin/kernel/kernel.elf"),
        )
        .unwrap();
    }

    let app = b.add_vspace("app", "app_data", true);
    b.add_vseg(
        app,
        VsegDesc::new("app_data", 0x1000_0000, 0x1_0000, VsegMode::C_WU, VsegType::Elf)
            .binpath("bin/app/appli.elf"),
    )
    .unwrap();
    b.add_vseg(
        app,
        VsegDesc::new("app_stack", 0x2000_0000, 0x1_0000, VsegMode::C_WU, VsegType::Buffer),
    )
    .unwrap();
    b.add_task(app, TaskDesc::new("main", 0).stack("app_stack"))
        .unwrap();
    b
}

pub fn fixture() -> Mapping {
    fixture_builder().build()
}

/// Like [`fixture`] without the XCU of cluster (0,0), whose peripherals
/// are then left without interrupt controller.
pub fn fixture_without_xcu() -> Mapping {
    let mut params = PlatformParams::new("no_xcu", 1, 2, 1);
    params.ram_size = RAM_SIZE;
    let mut b = MappingBuilder::new(params).unwrap();
    let geom = b.mapping().geometry();
    b.add_ram("RAM", 0, RAM_SIZE).unwrap();
    b.add_proc(0, 0, 0).unwrap();
    b.add_ram("RAM", geom.encode(0, 1), RAM_SIZE).unwrap();
    b.add_periph(
        "TTY",
        geom.encode(0, 1) + 0xB400_0000,
        0x1000,
        PeriphDesc::new(PeriphType::Tty),
    )
    .unwrap();
    b.add_proc(0, 1, 0).unwrap();
    b.build()
}
