//! `arch.info`: platform description read by the ALMOS kernel.

use genmap_core::entity::Cluster;
use genmap_core::kinds::{IocSubtype, IsrType, PeriphSubtype, PeriphType, PsegType};
use genmap_core::mapping::Mapping;

use crate::error::Result;
use crate::export::{ExportKind, ExportOutput, Exporter};

/// Default XCU input lines, used when no irq of that kind is wired.
const DEFAULT_TTY_IRQ: u32 = 16;
const DEFAULT_BDV_IRQ: u32 = 8;
const DEFAULT_DMA_IRQ: u32 = 8;

pub struct ArchInfoExporter;

impl Exporter for ArchInfoExporter {
    fn kind(&self) -> ExportKind {
        ExportKind::ArchInfo
    }

    fn export(&self, mapping: &Mapping) -> Result<ExportOutput> {
        let p = mapping.params();
        let geom = mapping.geometry();
        let mut out = ExportOutput::default();

        let mut s = format!("# arch.info file generated by genmap for {}\n\n", p.name);
        s.push_str("[HEADER]\n");
        s.push_str("        REVISION=1\n");
        s.push_str("        ARCH=SOCLIB-TSAR\n");
        s.push_str(&format!("        XMAX={}\n", p.x_size));
        s.push_str(&format!("        YMAX={}\n", p.y_size));
        s.push_str(&format!("        CPU_NR={}\n", p.nprocs));
        s.push_str("        BSCPU=0\n");
        s.push_str("        BSCPU_ARCH_ID=0\n");
        s.push_str("        BSTTY=0xF4000000\n");
        s.push_str("        BSDMA=0xF8000000\n");
        s.push_str("        IOPIC_CLUSTER=1\n");
        s.push('\n');

        for (cid, cluster) in mapping.clusters().iter().enumerate() {
            let irqs = IrqLines::scan(mapping, cluster);

            s.push_str("[CLUSTER]\n");
            s.push_str(&format!("         CID={cid}\n"));
            s.push_str(&format!(
                "         ARCH_CID=0x{:x}\n",
                geom.cluster_xy(cluster.x, cluster.y)
            ));
            s.push_str(&format!("         CPU_NR={}\n", cluster.procs.len()));
            s.push_str(&format!("         DEV_NR={}\n", cluster.periphs.len()));

            if let Some(ram) = mapping
                .cluster_psegs(cluster)
                .filter(|pseg| pseg.kind == PsegType::Ram)
                .last()
            {
                s.push_str(&device_line("RAM", ram.base, ram.size, None));
            }

            for periph in mapping.cluster_periphs(cluster) {
                let pseg = mapping.pseg(periph.pseg);
                let (devid, irq) = match (periph.ptype, periph.subtype) {
                    (PeriphType::Xcu, _) => ("XICU", None),
                    (PeriphType::Tty, _) => ("TTY", Some(irqs.tty)),
                    (PeriphType::Dma, _) => ("DMA", Some(irqs.dma)),
                    (PeriphType::Fbf, _) => ("FB", None),
                    (PeriphType::Ioc, PeriphSubtype::Ioc(IocSubtype::Bdv)) => {
                        ("BLKDEV", Some(irqs.bdv))
                    }
                    (PeriphType::Pic, _) => ("IOPIC", None),
                    (ptype, subtype) => {
                        out.warn(
                            ExportKind::ArchInfo,
                            format!(
                                "peripheral type {ptype}/{subtype} not supported yet in cluster[{},{}]",
                                cluster.x, cluster.y
                            ),
                        );
                        continue;
                    }
                };
                s.push_str(&device_line(devid, pseg.base, pseg.size, irq));
            }
        }

        out.text = s;
        Ok(out)
    }
}

/// XCU input lines of the TTY, block device and DMA of one cluster.
struct IrqLines {
    tty: u32,
    bdv: u32,
    dma: u32,
}

impl IrqLines {
    fn scan(mapping: &Mapping, cluster: &Cluster) -> Self {
        let mut lines = IrqLines {
            tty: DEFAULT_TTY_IRQ,
            bdv: DEFAULT_BDV_IRQ,
            dma: DEFAULT_DMA_IRQ,
        };
        let xcus = mapping
            .cluster_periphs(cluster)
            .filter(|p| p.ptype == PeriphType::Xcu);
        for xcu in xcus {
            for irq in mapping.periph_irqs(xcu) {
                match irq.isr {
                    IsrType::TtyRx => lines.tty = irq.port,
                    IsrType::Bdv => lines.bdv = irq.port,
                    IsrType::Dma => lines.dma = irq.port,
                    _ => {}
                }
            }
        }
        lines
    }
}

fn device_line(devid: &str, base: u64, size: u64, irq: Option<u32>) -> String {
    let irq = irq.map_or_else(|| "-1".to_string(), |line| line.to_string());
    format!("         DEVID={devid}  BASE=0x{base:x}  SIZE=0x{size:x}  IRQ={irq}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture;

    #[test]
    fn header_section() {
        let text = ArchInfoExporter.export(&fixture()).unwrap().text;
        assert!(text.starts_with(
            "# arch.info file generated by genmap for fixture\n\n[HEADER]\n        REVISION=1\n        ARCH=SOCLIB-TSAR\n        XMAX=1\n        YMAX=2\n        CPU_NR=2\n"
        ));
        assert!(text.contains("        IOPIC_CLUSTER=1\n\n[CLUSTER]\n         CID=0\n"));
    }

    #[test]
    fn cluster_devices() {
        let out = ArchInfoExporter.export(&fixture()).unwrap();
        let text = out.text;
        assert!(text.contains(
            "         CID=0\n         ARCH_CID=0x0\n         CPU_NR=2\n         DEV_NR=7\n         DEVID=RAM  BASE=0x0  SIZE=0x4000000  IRQ=-1\n         DEVID=XICU  BASE=0xb0000000  SIZE=0x1000  IRQ=-1\n"
        ));
        // DMA channel 1 is the last DMA line on the XCU.
        assert!(text.contains("         DEVID=DMA  BASE=0xb1000000  SIZE=0x1000  IRQ=1\n"));
        assert!(text.contains("         DEVID=BLKDEV  BASE=0xb3000000  SIZE=0x1000  IRQ=8\n"));
        assert!(text.contains("         DEVID=TTY  BASE=0xb4000000  SIZE=0x1000  IRQ=16\n"));
        assert!(text.contains("         DEVID=FB  BASE=0xb7000000  SIZE=0x1000  IRQ=-1\n"));
        assert!(text.ends_with(
            "[CLUSTER]\n         CID=1\n         ARCH_CID=0x1\n         CPU_NR=2\n         DEV_NR=1\n         DEVID=RAM  BASE=0x100000000  SIZE=0x4000000  IRQ=-1\n         DEVID=XICU  BASE=0x1b0000000  SIZE=0x1000  IRQ=-1\n"
        ));
        assert_eq!(
            out.warnings,
            vec![
                "peripheral type MMC/NONE not supported yet in cluster[0,0]",
                "peripheral type ROM/NONE not supported yet in cluster[0,0]",
            ]
        );
    }
}
