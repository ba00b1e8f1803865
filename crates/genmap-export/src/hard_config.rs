//! `hard_config.h`: C header consumed by the boot loader, the kernel and
//! the simulator top cell.
//!
//! Besides rendering, this is where the platform cardinality rules are
//! enforced: at most two copies of each external peripheral, exactly one
//! block storage flavour, at most one coprocessor flavour.

use std::collections::HashMap;

use genmap_core::kinds::{IocSubtype, MwrSubtype, PeriphSubtype, PeriphType};
use genmap_core::mapping::Mapping;

use crate::error::{ExportError, Result};
use crate::export::{ExportKind, ExportOutput, Exporter};
use crate::format::{define, define_hex};

/// External peripheral types limited to two instances.
const AT_MOST_TWO: [PeriphType; 7] = [
    PeriphType::Fbf,
    PeriphType::Cma,
    PeriphType::Ioc,
    PeriphType::Nic,
    PeriphType::Tim,
    PeriphType::Tty,
    PeriphType::Pic,
];

/// Peripheral types with a `SEG_<TYPE>_BASE/SIZE` pair, in header order
/// (the ramdisk pair is inserted before DROM).
const SEGMENTS: [PeriphType; 15] = [
    PeriphType::Cma,
    PeriphType::Dma,
    PeriphType::Fbf,
    PeriphType::Iob,
    PeriphType::Ioc,
    PeriphType::Mmc,
    PeriphType::Mwr,
    PeriphType::Rom,
    PeriphType::Sim,
    PeriphType::Nic,
    PeriphType::Pic,
    PeriphType::Tim,
    PeriphType::Tty,
    PeriphType::Xcu,
    PeriphType::Drom,
];

const BOOT_VSEGS: [(&str, &str); 4] = [
    ("seg_boot_mapping", "SEG_BOOT_MAPPING"),
    ("seg_boot_code", "SEG_BOOT_CODE"),
    ("seg_boot_data", "SEG_BOOT_DATA"),
    ("seg_boot_stack", "SEG_BOOT_STACK"),
];

/// Summary of every peripheral of one type. Values come from the last
/// instance met in cluster order.
#[derive(Debug, Clone, Copy)]
struct TypeSummary {
    count: usize,
    base: u64,
    size: u64,
    channels: u32,
    args: [u32; 4],
}

impl Default for TypeSummary {
    fn default() -> Self {
        Self {
            count: 0,
            base: 0xFFFF_FFFF,
            size: 0,
            channels: 0,
            args: [0; 4],
        }
    }
}

#[derive(Debug, Default)]
struct Survey {
    types: HashMap<PeriphType, TypeSummary>,
    ioc: [bool; 4],
    mwr: [bool; 3],
}

impl Survey {
    fn collect(mapping: &Mapping) -> Self {
        let mut survey = Survey::default();
        for cluster in mapping.clusters() {
            for periph in mapping.cluster_periphs(cluster) {
                let pseg = mapping.pseg(periph.pseg);
                let entry = survey.types.entry(periph.ptype).or_default();
                entry.count += 1;
                entry.base = pseg.base & 0xFFFF_FFFF;
                entry.size = pseg.size;
                entry.channels = periph.channels;
                entry.args = periph.args;
                match periph.subtype {
                    PeriphSubtype::Ioc(sub) => survey.ioc[ioc_slot(sub)] = true,
                    PeriphSubtype::Mwr(sub) => survey.mwr[mwr_slot(sub)] = true,
                    PeriphSubtype::None => {}
                }
            }
        }
        survey
    }

    fn get(&self, ptype: PeriphType) -> TypeSummary {
        self.types.get(&ptype).copied().unwrap_or_default()
    }

    fn uses(&self, ptype: PeriphType) -> u64 {
        u64::from(self.get(ptype).count != 0)
    }

    fn ioc(&self, sub: IocSubtype) -> bool {
        self.ioc[ioc_slot(sub)]
    }

    fn mwr(&self, sub: MwrSubtype) -> bool {
        self.mwr[mwr_slot(sub)]
    }
}

fn ioc_slot(sub: IocSubtype) -> usize {
    match sub {
        IocSubtype::Bdv => 0,
        IocSubtype::Hba => 1,
        IocSubtype::Sdc => 2,
        IocSubtype::Spi => 3,
    }
}

fn mwr_slot(sub: MwrSubtype) -> usize {
    match sub {
        MwrSubtype::Gcd => 0,
        MwrSubtype::Dct => 1,
        MwrSubtype::Cpy => 2,
    }
}

pub struct HardConfigExporter;

impl HardConfigExporter {
    fn check(mapping: &Mapping, survey: &Survey) -> Result<()> {
        for ptype in AT_MOST_TWO {
            let count = survey.get(ptype).count;
            if count > 2 {
                return Err(ExportError::TooManyPeripherals {
                    ptype,
                    count,
                    max: 2,
                });
            }
        }

        let ioc_kinds = survey.ioc.iter().filter(|used| **used).count()
            + usize::from(mapping.params().use_ramdisk);
        if ioc_kinds != 1 {
            return Err(ExportError::IocKindCount { count: ioc_kinds });
        }

        let mwr_kinds = survey.mwr.iter().filter(|used| **used).count();
        if survey.get(PeriphType::Mwr).count > 0 && mwr_kinds != 1 {
            return Err(ExportError::MwrKindCount { count: mwr_kinds });
        }
        Ok(())
    }

    /// Base and length of a global vseg looked up by exact name.
    fn global(mapping: &Mapping, name: &str) -> Option<(u32, u32, bool)> {
        mapping
            .globals()
            .filter(|v| v.name == name)
            .last()
            .map(|v| (v.vbase, v.length, v.identity))
    }

    fn boot_vsegs(mapping: &Mapping) -> Result<Vec<(&'static str, u32, u32)>> {
        let mut found = Vec::with_capacity(BOOT_VSEGS.len());
        for (name, symbol) in BOOT_VSEGS {
            let (vbase, length, identity) =
                Self::global(mapping, name).ok_or_else(|| ExportError::MissingVseg {
                    name: name.to_string(),
                    artifact: "hard_config.h",
                })?;
            if !identity {
                return Err(ExportError::NotIdentityMapped {
                    name: name.to_string(),
                });
            }
            found.push((symbol, vbase, length));
        }
        Ok(found)
    }

    fn ramdisk(mapping: &Mapping) -> Result<(u64, u64)> {
        if !mapping.params().use_ramdisk {
            return Ok((0xFFFF_FFFF, 0));
        }
        Self::global(mapping, "seg_ramdisk")
            .map(|(vbase, length, _)| (u64::from(vbase), u64::from(length)))
            .ok_or_else(|| ExportError::MissingVseg {
                name: "seg_ramdisk".to_string(),
                artifact: "hard_config.h",
            })
    }
}

impl Exporter for HardConfigExporter {
    fn kind(&self) -> ExportKind {
        ExportKind::Header
    }

    fn export(&self, mapping: &Mapping) -> Result<ExportOutput> {
        let survey = Survey::collect(mapping);
        Self::check(mapping, &survey)?;
        let boot = Self::boot_vsegs(mapping)?;
        let (rdk_base, rdk_size) = Self::ramdisk(mapping)?;
        let p = mapping.params();
        let total_procs = mapping.totals().procs;

        let mut s = format!("/* Generated by genmap for {} */\n\n", p.name);
        s.push_str("#ifndef HARD_CONFIG_H\n#define HARD_CONFIG_H\n\n");

        s.push_str("/* General platform parameters */\n\n");
        define(&mut s, "X_SIZE", p.x_size.into());
        define(&mut s, "Y_SIZE", p.y_size.into());
        define(&mut s, "X_WIDTH", p.x_width.into());
        define(&mut s, "Y_WIDTH", p.y_width.into());
        define(&mut s, "P_WIDTH", p.p_width.into());
        define(&mut s, "X_IO", p.x_io.into());
        define(&mut s, "Y_IO", p.y_io.into());
        define(&mut s, "NB_PROCS_MAX", p.nprocs.into());
        define(&mut s, "IRQ_PER_PROCESSOR", p.irq_per_proc.into());
        define_hex(&mut s, "RESET_ADDRESS", p.reset_address.into());
        define(&mut s, "NB_TOTAL_PROCS", total_procs.into());
        s.push('\n');

        s.push_str("/* Peripherals */\n\n");
        for ptype in [
            PeriphType::Tty,
            PeriphType::Ioc,
            PeriphType::Nic,
            PeriphType::Cma,
            PeriphType::Tim,
            PeriphType::Dma,
        ] {
            define(
                &mut s,
                &format!("NB_{ptype}_CHANNELS"),
                survey.get(ptype).channels.into(),
            );
        }
        s.push('\n');
        define(&mut s, "USE_XCU", survey.uses(PeriphType::Xcu));
        define(&mut s, "USE_DMA", survey.uses(PeriphType::Dma));
        s.push('\n');
        define(&mut s, "USE_IOB", survey.uses(PeriphType::Iob));
        define(&mut s, "USE_PIC", survey.uses(PeriphType::Pic));
        define(&mut s, "USE_FBF", survey.uses(PeriphType::Fbf));
        define(&mut s, "USE_NIC", survey.uses(PeriphType::Nic));
        s.push('\n');
        define(&mut s, "USE_IOC_BDV", survey.ioc(IocSubtype::Bdv).into());
        define(&mut s, "USE_IOC_SDC", survey.ioc(IocSubtype::Sdc).into());
        define(&mut s, "USE_IOC_HBA", survey.ioc(IocSubtype::Hba).into());
        define(&mut s, "USE_IOC_SPI", survey.ioc(IocSubtype::Spi).into());
        define(&mut s, "USE_IOC_RDK", p.use_ramdisk.into());
        s.push('\n');
        define(&mut s, "USE_MWR_GCD", survey.mwr(MwrSubtype::Gcd).into());
        define(&mut s, "USE_MWR_DCT", survey.mwr(MwrSubtype::Dct).into());
        define(&mut s, "USE_MWR_CPY", survey.mwr(MwrSubtype::Cpy).into());
        s.push('\n');

        let fbf = survey.get(PeriphType::Fbf);
        define(&mut s, "FBUF_X_SIZE", fbf.args[0].into());
        define(&mut s, "FBUF_Y_SIZE", fbf.args[1].into());
        s.push('\n');
        let xcu = survey.get(PeriphType::Xcu);
        define(&mut s, "XCU_NB_HWI", xcu.args[0].into());
        define(&mut s, "XCU_NB_PTI", xcu.args[1].into());
        define(&mut s, "XCU_NB_WTI", xcu.args[2].into());
        define(&mut s, "XCU_NB_OUT", xcu.channels.into());
        s.push('\n');
        let mwr = survey.get(PeriphType::Mwr);
        define(&mut s, "MWR_TO_COPROC", mwr.args[0].into());
        define(&mut s, "MWR_FROM_COPROC", mwr.args[1].into());
        define(&mut s, "MWR_CONFIG", mwr.args[2].into());
        define(&mut s, "MWR_STATUS", mwr.args[3].into());
        s.push('\n');

        s.push_str("/* base addresses and sizes for physical segments */\n\n");
        define_hex(&mut s, "SEG_RAM_BASE", p.ram_base);
        define_hex(&mut s, "SEG_RAM_SIZE", p.ram_size);
        s.push('\n');
        for ptype in SEGMENTS {
            if ptype == PeriphType::Drom {
                define_hex(&mut s, "SEG_RDK_BASE", rdk_base);
                define_hex(&mut s, "SEG_RDK_SIZE", rdk_size);
                s.push('\n');
            }
            let summary = survey.get(ptype);
            define_hex(&mut s, &format!("SEG_{ptype}_BASE"), summary.base);
            define_hex(&mut s, &format!("SEG_{ptype}_SIZE"), summary.size);
            s.push('\n');
        }
        define_hex(&mut s, "PERI_CLUSTER_INCREMENT", p.peri_increment.into());
        s.push('\n');

        s.push_str("/* physical base addresses for identity mapped vsegs */\n");
        s.push_str("/* used by the GietVM OS                             */\n\n");
        for (i, (symbol, vbase, length)) in boot.iter().enumerate() {
            if i > 0 {
                s.push('\n');
            }
            define_hex(&mut s, &format!("{symbol}_BASE"), u64::from(*vbase));
            define_hex(&mut s, &format!("{symbol}_SIZE"), u64::from(*length));
        }
        s.push_str("#endif\n");

        Ok(ExportOutput {
            text: s,
            warnings: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, fixture_builder, RAM_SIZE};
    use genmap_core::builder::MappingBuilder;
    use genmap_core::entity::{PeriphDesc, VsegDesc};
    use genmap_core::kinds::{VsegMode, VsegType};

    fn header(mapping: &Mapping) -> Result<String> {
        HardConfigExporter.export(mapping).map(|out| out.text)
    }

    #[test]
    fn general_parameters() {
        let text = header(&fixture()).unwrap();
        assert!(text.starts_with(
            "/* Generated by genmap for fixture */\n\n#ifndef HARD_CONFIG_H\n#define HARD_CONFIG_H\n\n/* General platform parameters */\n\n#define X_SIZE                 1\n#define Y_SIZE                 2\n"
        ));
        assert!(text.contains("#define RESET_ADDRESS          0xbfc00000\n"));
        assert!(text.contains("#define NB_TOTAL_PROCS         4\n\n/* Peripherals */\n"));
        assert!(text.ends_with("#define SEG_BOOT_STACK_SIZE    0x50000\n#endif\n"));
    }

    #[test]
    fn peripheral_summary() {
        let text = header(&fixture()).unwrap();
        assert!(text.contains("#define NB_TTY_CHANNELS        1\n"));
        assert!(text.contains("#define NB_DMA_CHANNELS        2\n\n#define USE_XCU                1\n"));
        assert!(text.contains("#define USE_NIC                0\n"));
        assert!(text.contains("#define USE_IOC_BDV            1\n#define USE_IOC_SDC            0\n"));
        assert!(text.contains("#define FBUF_X_SIZE            128\n"));
        assert!(text.contains("#define XCU_NB_OUT             2\n"));
    }

    #[test]
    fn segment_addresses() {
        let text = header(&fixture()).unwrap();
        assert!(text.contains("#define SEG_RAM_SIZE           0x4000000\n"));
        // Cluster (0,1) holds the last XCU; only the low word is kept.
        assert!(text.contains("#define SEG_XCU_BASE           0xb0000000\n"));
        assert!(text.contains("#define SEG_NIC_BASE           0xffffffff\n#define SEG_NIC_SIZE           0x0\n"));
        assert!(text.contains(
            "#define SEG_RDK_BASE           0xffffffff\n#define SEG_RDK_SIZE           0x0\n\n#define SEG_DROM_BASE"
        ));
        assert!(text.contains("#define PERI_CLUSTER_INCREMENT 0x10000\n"));
        assert!(text.contains(
            "#define SEG_BOOT_CODE_BASE     0x80000\n#define SEG_BOOT_CODE_SIZE     0x40000\n\n"
        ));
    }

    #[test]
    fn too_many_ttys() {
        let mut b = fixture_builder();
        for (i, base) in [0xB500_0000u64, 0xB600_0000].into_iter().enumerate() {
            b.add_periph(
                &format!("TTY{i}"),
                base,
                0x1000,
                PeriphDesc::new(PeriphType::Tty),
            )
            .unwrap();
        }
        let err = header(&b.build()).unwrap_err();
        assert!(matches!(
            err,
            ExportError::TooManyPeripherals {
                ptype: PeriphType::Tty,
                count: 3,
                max: 2
            }
        ));
    }

    #[test]
    fn ioc_kind_must_be_unique() {
        let mut b = fixture_builder();
        b.add_periph(
            "SDC",
            0xB500_0000,
            0x1000,
            PeriphDesc::new(PeriphType::Ioc).subtype(PeriphSubtype::Ioc(IocSubtype::Sdc)),
        )
        .unwrap();
        let err = header(&b.build()).unwrap_err();
        assert!(matches!(err, ExportError::IocKindCount { count: 2 }));
    }

    #[test]
    fn mwr_needs_a_subtype() {
        let mut b = fixture_builder();
        b.add_periph("MWR", 0xB500_0000, 0x1000, PeriphDesc::new(PeriphType::Mwr))
            .unwrap();
        let err = header(&b.build()).unwrap_err();
        assert!(matches!(err, ExportError::MwrKindCount { count: 0 }));
    }

    #[test]
    fn boot_vsegs_must_be_identity_mapped() {
        let mut params = fixture().params().clone();
        params.name = "bare".into();
        let mut b = MappingBuilder::new(params).unwrap();
        b.add_ram("RAM", 0, RAM_SIZE).unwrap();
        b.add_periph(
            "IOC",
            0xB300_0000,
            0x1000,
            PeriphDesc::new(PeriphType::Ioc).subtype(PeriphSubtype::Ioc(IocSubtype::Bdv)),
        )
        .unwrap();
        b.add_global(
            VsegDesc::new("seg_boot_mapping", 0, 0x1000, VsegMode::C_W_, VsegType::Buffer),
        )
        .unwrap();
        let err = header(&b.build()).unwrap_err();
        assert_eq!(err.to_string(), "seg_boot_mapping vseg is not identity mapped");
    }

    fn ramdisk_platform(with_ramdisk_vseg: bool) -> Mapping {
        let mut params = fixture().params().clone();
        params.use_ramdisk = true;
        let mut b = MappingBuilder::new(params).unwrap();
        b.add_ram("RAM", 0, RAM_SIZE).unwrap();
        let mut globals = vec![
            ("seg_boot_mapping", 0x0),
            ("seg_boot_code", 0x1000),
            ("seg_boot_data", 0x2000),
            ("seg_boot_stack", 0x3000),
        ];
        if with_ramdisk_vseg {
            globals.push(("seg_ramdisk", 0x2000_0000));
        }
        for (name, vbase) in globals {
            b.add_global(
                VsegDesc::new(name, vbase, 0x1000, VsegMode::C_W_, VsegType::Buffer).identity(),
            )
            .unwrap();
        }
        b.build()
    }

    #[test]
    fn ramdisk_requires_its_vseg() {
        let err = header(&ramdisk_platform(false)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "seg_ramdisk vseg missing (required by hard_config.h)"
        );

        let text = header(&ramdisk_platform(true)).unwrap();
        assert!(text.contains("#define USE_IOC_RDK            1\n"));
        assert!(text.contains("#define SEG_RDK_BASE           0x20000000\n"));
    }
}
