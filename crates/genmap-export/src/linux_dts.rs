//! `linux.dts`: device tree source for the Linux port.
//!
//! Only RAM, the interrupt controllers, the first TTY and BDV block devices
//! are described. Every other peripheral is skipped with a warning.

use genmap_core::entity::{Cluster, Periph};
use genmap_core::kinds::{IocSubtype, IsrType, PeriphSubtype, PeriphType, PsegType};
use genmap_core::mapping::Mapping;
use genmap_core::resolve::Resolver;

use crate::error::{ExportError, Result};
use crate::export::{ExportKind, ExportOutput, Exporter};
use crate::format::{controller_of, pseg_label, reg};

pub struct LinuxDtsExporter;

impl Exporter for LinuxDtsExporter {
    fn kind(&self) -> ExportKind {
        ExportKind::LinuxDts
    }

    fn export(&self, mapping: &Mapping) -> Result<ExportOutput> {
        let resolver = Resolver::new(mapping)?;
        let mut out = ExportOutput::default();
        let name = mapping.name();

        let mut s = String::from("/dts-v1/;\n\n/{\n");
        s.push_str(&format!("  compatible = \"tsar,{name}\";\n"));
        s.push_str("  #address-cells = <2>;\n");
        s.push_str("  #size-cells    = <1>;\n");
        s.push_str(&format!("  model = \"{name}\";\n\n"));

        s.push_str("  chosen {\n");
        s.push_str("    linux,stdout-path = &tty;\n");
        s.push_str("    bootargs = \"console=tty0 console=ttyVTTY0 earlyprintk\";\n");
        s.push_str("  };\n\n");

        let geom = mapping.geometry();
        s.push_str("  cpus {\n    #address-cells = <1>;\n    #size-cells    = <0>;\n");
        for cluster in mapping.clusters() {
            for proc in mapping.cluster_procs(cluster) {
                s.push_str(&format!(
                    "    cpu@{}_{}_{} {{\n",
                    cluster.x, cluster.y, proc.lpid
                ));
                s.push_str("      device_type = \"cpu\";\n");
                s.push_str("      compatible = \"soclib,mips32el\";\n");
                s.push_str(&format!(
                    "      reg = <0x{:x}>;\n",
                    geom.proc_id(cluster.x, cluster.y, proc.lpid)
                ));
                s.push_str("    };\n\n");
            }
        }
        s.push_str("  };\n\n");

        let mut tty_labelled = false;
        for cluster in mapping.clusters() {
            cluster_nodes(&mut s, mapping, cluster)?;
            for periph in mapping.cluster_periphs(cluster) {
                periph_node(
                    &mut s,
                    &mut out,
                    mapping,
                    &resolver,
                    periph,
                    &mut tty_labelled,
                )?;
            }
        }

        s.push_str("  clocks {\n");
        s.push_str("    freq: freq@50MHZ {\n");
        s.push_str("      #clock-cells = <0>;\n");
        s.push_str("      compatible = \"fixed-clock\";\n");
        s.push_str("      clock-frequency = <50000000>;\n");
        s.push_str("    };\n");
        s.push_str("  };\n\n");
        s.push_str("  cpuclk {\n");
        s.push_str("    compatible = \"soclib,mips32_clksrc\";\n");
        s.push_str("    clocks = <&freq>;\n");
        s.push_str("  };\n");
        s.push_str("};\n");

        out.text = s;
        Ok(out)
    }
}

/// RAM and interrupt controller nodes of one cluster.
fn cluster_nodes(s: &mut String, mapping: &Mapping, cluster: &Cluster) -> Result<()> {
    s.push_str(&format!("  /*** cluster[{},{}] ***/\n\n", cluster.x, cluster.y));

    for pseg in mapping.cluster_psegs(cluster) {
        if pseg.kind == PsegType::Ram {
            s.push_str(&format!("  {} {{\n", pseg_label(pseg)));
            s.push_str("    device_type = \"memory\";\n");
            s.push_str(&format!("    reg = {};\n", reg(pseg.base, pseg.size)));
            s.push_str("  };\n\n");
        }
    }

    let mut has_controller = false;
    for periph in mapping.cluster_periphs(cluster) {
        let pseg = mapping.pseg(periph.pseg);
        let compatible = match periph.ptype {
            PeriphType::Xcu => "\"soclib,vci_xicu\",\"soclib,vci_xicu_timer\"",
            PeriphType::Pic => "\"soclib,vci_iopic\"",
            _ => continue,
        };
        has_controller = true;
        s.push_str(&format!("  {} {{\n", pseg_label(pseg)));
        s.push_str(&format!("    compatible = {compatible};\n"));
        s.push_str("    interrupt-controller;\n");
        s.push_str("    #interrupt-cells = <1>;\n");
        if periph.ptype == PeriphType::Xcu {
            s.push_str("    clocks = <&freq>;\n");
        }
        s.push_str(&format!("    reg = {};\n", reg(pseg.base, pseg.size)));
        s.push_str("  };\n\n");
    }

    if !has_controller && !cluster.periphs.is_empty() {
        return Err(ExportError::MissingInterruptController {
            x: cluster.x,
            y: cluster.y,
        });
    }
    Ok(())
}

fn periph_node(
    s: &mut String,
    out: &mut ExportOutput,
    mapping: &Mapping,
    resolver: &Resolver<'_>,
    periph: &Periph,
    tty_labelled: &mut bool,
) -> Result<()> {
    let (compatible, isr, channel) = match (periph.ptype, periph.subtype) {
        (PeriphType::Xcu | PeriphType::Pic, _) => return Ok(()),
        (PeriphType::Tty, _) => ("soclib,vci_multi_tty", IsrType::TtyRx, Some(0)),
        (PeriphType::Ioc, PeriphSubtype::Ioc(IocSubtype::Bdv)) => {
            ("tsar,vci_block_device", IsrType::Bdv, None)
        }
        (PeriphType::Ioc, subtype) => {
            controller_of(mapping, resolver, periph)?;
            out.warn(
                ExportKind::LinuxDts,
                format!("{subtype} peripheral not supported by LINUX"),
            );
            return Ok(());
        }
        (ptype, _) => {
            out.warn(
                ExportKind::LinuxDts,
                format!("{ptype} peripheral not supported by LINUX"),
            );
            return Ok(());
        }
    };

    let ctrl = controller_of(mapping, resolver, periph)?;
    let ctrl_label = resolver.periph_label(ctrl);
    let hwi = resolver
        .isr_source(ctrl, isr, channel)
        .ok_or_else(|| ExportError::IsrNotFound {
            isr,
            channel,
            controller: ctrl_label.clone(),
        })?;

    if periph.ptype == PeriphType::Tty && !*tty_labelled {
        *tty_labelled = true;
        s.push_str("  tty:\n");
    }
    let pseg = mapping.pseg(periph.pseg);
    s.push_str(&format!("  {} {{\n", pseg_label(pseg)));
    s.push_str(&format!("    compatible = \"{compatible}\";\n"));
    s.push_str(&format!("    interrupt-parent = <&{{/{ctrl_label}}}>;\n"));
    s.push_str(&format!("    interrupts = <{hwi}>;\n"));
    s.push_str(&format!("    reg = {};\n", reg(pseg.base, pseg.size)));
    s.push_str("  };\n\n");
    Ok(())
}
