//! `netbsd.dts`: device tree source for the NetBSD port.
//!
//! Unlike the Linux tree, every interrupt source channel gets its own
//! `irq@` child node, and a trailing `topology` node lists the devices of
//! each cluster.

use genmap_core::entity::{Cluster, Periph, Pseg};
use genmap_core::kinds::{IocSubtype, IsrType, PeriphSubtype, PeriphType, PsegType};
use genmap_core::mapping::Mapping;
use genmap_core::resolve::Resolver;

use crate::error::{ExportError, Result};
use crate::export::{ExportKind, ExportOutput, Exporter};
use crate::format::{controller_of, pseg_label, reg};

pub struct NetbsdDtsExporter;

impl Exporter for NetbsdDtsExporter {
    fn kind(&self) -> ExportKind {
        ExportKind::NetbsdDts
    }

    fn export(&self, mapping: &Mapping) -> Result<ExportOutput> {
        let resolver = Resolver::new(mapping)?;
        let geom = mapping.geometry();
        let mut out = ExportOutput::default();

        let mut s = String::from("/dts-v1/;\n\n/{\n");
        s.push_str("  #address-cells = <2>;\n");
        s.push_str("  #size-cells    = <1>;\n");

        s.push_str("  cpus {\n    #address-cells = <1>;\n    #size-cells    = <0>;\n");
        for cluster in mapping.clusters() {
            for proc in mapping.cluster_procs(cluster) {
                let id = geom.proc_id(cluster.x, cluster.y, proc.lpid);
                s.push_str(&format!("    Mips,32@0x{id:x} {{\n"));
                s.push_str("      device_type = \"cpu\";\n");
                s.push_str("      icudev_type = \"cpu:mips\";\n");
                s.push_str("      name        = \"Mips,32\";\n");
                s.push_str(&format!("      reg         = <0x{id:x}>;\n"));
                s.push_str("    };\n\n");
            }
        }
        s.push_str("  };\n");

        for cluster in mapping.clusters() {
            for pseg in ram_psegs(mapping, cluster) {
                s.push_str(&format!("  {} {{\n", pseg_label(pseg)));
                s.push_str("    cached      = <1>;\n");
                s.push_str("    device_type = \"memory\";\n");
                s.push_str(&format!("    reg         = {};\n", reg(pseg.base, pseg.size)));
                s.push_str("  };\n");
            }
        }

        for cluster in mapping.clusters() {
            controller_nodes(&mut s, mapping, cluster)?;
            let devices = DeviceWriter {
                mapping,
                resolver: &resolver,
                cluster,
            };
            for periph in mapping.cluster_periphs(cluster) {
                devices.write(&mut s, &mut out, periph)?;
            }
        }

        s.push_str("\n  topology {\n");
        s.push_str("    #address-cells = <2>;\n");
        s.push_str("    #size-cells = <0>;\n");
        for cluster in mapping.clusters() {
            s.push_str(&format!("    cluster@{},{} {{\n", cluster.x, cluster.y));
            s.push_str(&format!("      reg     = <{} {}>;\n", cluster.x, cluster.y));
            s.push_str("      devices = <\n");
            for proc in mapping.cluster_procs(cluster) {
                s.push_str(&format!(
                    "                &{{/cpus/Mips,32@0x{:x}}}\n",
                    geom.proc_id(cluster.x, cluster.y, proc.lpid)
                ));
            }
            for periph in mapping.cluster_periphs(cluster) {
                s.push_str(&format!(
                    "                &{{/{}}}\n",
                    pseg_label(mapping.pseg(periph.pseg))
                ));
            }
            for pseg in ram_psegs(mapping, cluster) {
                s.push_str(&format!("                &{{/{}}}\n", pseg_label(pseg)));
            }
            s.push_str("                >;\n");
            s.push_str("    };\n");
        }
        s.push_str("  };\n");
        s.push_str("};\n");

        out.text = s;
        Ok(out)
    }
}

fn ram_psegs<'a>(
    mapping: &'a Mapping,
    cluster: &'a Cluster,
) -> impl Iterator<Item = &'a Pseg> + 'a {
    mapping
        .cluster_psegs(cluster)
        .filter(|pseg| pseg.kind == PsegType::Ram)
}

/// XCU and PIC root nodes of one cluster. An XCU fans out one filter node
/// per processor input line.
fn controller_nodes(s: &mut String, mapping: &Mapping, cluster: &Cluster) -> Result<()> {
    let geom = mapping.geometry();
    let irq_per_proc = mapping.params().irq_per_proc;
    let mut has_controller = false;

    for periph in mapping.cluster_periphs(cluster) {
        let pseg = mapping.pseg(periph.pseg);
        let label = pseg_label(pseg);
        match periph.ptype {
            PeriphType::Xcu => {
                s.push_str(&format!("  {label} {{\n"));
                s.push_str("    device_type = \"soclib:xicu:root\";\n");
                s.push_str(&format!("    reg         = {};\n", reg(pseg.base, pseg.size)));
                s.push_str(&format!("    input_lines = <{}>;\n", periph.args[0]));
                s.push_str(&format!("    ipis        = <{}>;\n", periph.args[1]));
                s.push_str(&format!("    timers      = <{}>;\n", periph.args[2]));
                let mut output = 0;
                for lpid in 0..cluster.procs.len() as u32 {
                    let proc_id = geom.proc_id(cluster.x, cluster.y, lpid);
                    for itid in 0..irq_per_proc {
                        s.push_str(&format!("    out@{output} {{\n"));
                        s.push_str("      device_type = \"soclib:xicu:filter\";\n");
                        s.push_str(&format!(
                            "      irq = <&{{/cpus/Mips,32@0x{proc_id:x}}} {itid}>;\n"
                        ));
                        s.push_str(&format!("      output_line = <{output}>;\n"));
                        s.push_str(&format!("      parent = <&{{/{label}}}>;\n"));
                        s.push_str("    };\n");
                        output += 1;
                    }
                }
                s.push_str("  };\n");
            }
            PeriphType::Pic => {
                s.push_str(&format!("  {label} {{\n"));
                s.push_str("    device_type = \"soclib:pic:root\";\n");
                s.push_str(&format!("    reg         = {};\n", reg(pseg.base, pseg.size)));
                s.push_str(&format!("    input_lines = <{}>;\n", periph.channels));
                s.push_str("  };\n");
            }
            _ => continue,
        }
        has_controller = true;
    }

    if !has_controller && !cluster.periphs.is_empty() {
        return Err(ExportError::MissingInterruptController {
            x: cluster.x,
            y: cluster.y,
        });
    }
    Ok(())
}

/// Writes the non-controller peripherals of one cluster.
struct DeviceWriter<'a, 'm> {
    mapping: &'m Mapping,
    resolver: &'a Resolver<'m>,
    cluster: &'m Cluster,
}

impl<'m> DeviceWriter<'_, 'm> {
    fn write(&self, s: &mut String, out: &mut ExportOutput, periph: &Periph) -> Result<()> {
        let pseg = self.mapping.pseg(periph.pseg);
        let label = pseg_label(pseg);
        let reg = reg(pseg.base, pseg.size);

        match (periph.ptype, periph.subtype) {
            (PeriphType::Xcu | PeriphType::Pic, _) => {}
            (PeriphType::Dma, _) => {
                let xcu = self.cluster_xcu(periph)?;
                s.push_str(&format!("  {label} {{\n"));
                s.push_str("    device_type = \"soclib:dma\";\n");
                s.push_str(&format!("    reg = {reg};\n"));
                s.push_str(&format!("    channel_count = <{}>;\n", periph.channels));
                for channel in 0..periph.channels {
                    let (name, hwi) = self.port(xcu, IsrType::Dma, Some(channel))?;
                    channel_node(s, "irq", channel, channel, &name, hwi, &label, false);
                }
                s.push_str("  };\n");
            }
            (PeriphType::Mmc, _) => {
                let xcu = self.cluster_xcu(periph)?;
                let (_, hwi) = self.port(xcu, IsrType::Mmc, None)?;
                let ctrl = self.controller(periph)?;
                s.push_str(&format!("  {label} {{\n"));
                s.push_str("    device_type = \"soclib:mmc\";\n");
                s.push_str(&format!("    irq = <&{{/{ctrl}}} {hwi}>;\n"));
                s.push_str(&format!("    reg = {reg};\n"));
                s.push_str("  };\n");
            }
            (PeriphType::Fbf, _) => {
                s.push_str(&format!("  {label} {{\n"));
                s.push_str("    device_type = \"soclib:framebuffer\";\n");
                s.push_str("    mode        = <32>;\n");
                s.push_str(&format!("    width       = <{}>;\n", periph.args[0]));
                s.push_str(&format!("    height      = <{}>;\n", periph.args[1]));
                s.push_str(&format!("    reg         = {reg};\n"));
                s.push_str("  };\n");
            }
            (PeriphType::Ioc, PeriphSubtype::Ioc(sub @ (IocSubtype::Bdv | IocSubtype::Sdc))) => {
                let (device_type, isr) = match sub {
                    IocSubtype::Sdc => ("soclib:sdc", IsrType::Sdc),
                    _ => ("soclib:blockdevice", IsrType::Bdv),
                };
                let ctrl = controller_of(self.mapping, self.resolver, periph)?;
                let (name, hwi) = self.port(ctrl, isr, None)?;
                s.push_str(&format!("  {label} {{\n"));
                s.push_str(&format!("    device_type = \"{device_type}\";\n"));
                s.push_str(&format!("    irq = <&{{/{name}}} {hwi}>;\n"));
                s.push_str(&format!("    reg = {reg};\n"));
                s.push_str("  };\n");
            }
            (PeriphType::Rom | PeriphType::Drom, _) => {
                s.push_str(&format!("  {label} {{\n"));
                s.push_str("    device_type = \"rom\";\n");
                s.push_str("    cached = <1>;\n");
                s.push_str(&format!("    reg = {reg};\n"));
                s.push_str("  };\n");
            }
            (PeriphType::Sim, _) => simple_node(s, &label, "soclib:simhelper", &reg),
            (PeriphType::Iob, _) => simple_node(s, &label, "soclib:iob", &reg),
            (PeriphType::Tty, _) => {
                let ctrl = controller_of(self.mapping, self.resolver, periph)?;
                s.push_str(&format!("  {label} {{\n"));
                s.push_str("    device_type = \"soclib:tty\";\n");
                s.push_str(&format!("    channel_count = < {} >;\n", periph.channels));
                s.push_str(&format!("    reg = {reg};\n"));
                for channel in 0..periph.channels {
                    let (name, hwi) = self.port(ctrl, IsrType::TtyRx, Some(channel))?;
                    channel_node(s, "irq", channel, channel, &name, hwi, &label, false);
                }
                s.push_str("  };\n");
            }
            (PeriphType::Nic, _) => {
                let ctrl = controller_of(self.mapping, self.resolver, periph)?;
                self.channel_header(s, &label, "soclib:nic", &reg, periph.channels);
                for channel in 0..periph.channels {
                    let (name, hwi) = self.port(ctrl, IsrType::NicRx, Some(channel))?;
                    channel_node(s, "irq_rx", channel, 2 * channel, &name, hwi, &label, true);
                    let (name, hwi) = self.port(ctrl, IsrType::NicTx, Some(channel))?;
                    channel_node(s, "irq_tx", channel, 2 * channel + 1, &name, hwi, &label, true);
                }
                s.push_str("  };\n");
            }
            (PeriphType::Cma, _) => {
                let ctrl = controller_of(self.mapping, self.resolver, periph)?;
                self.channel_header(s, &label, "soclib:cma", &reg, periph.channels);
                for channel in 0..periph.channels {
                    let (name, hwi) = self.port(ctrl, IsrType::Cma, Some(channel))?;
                    channel_node(s, "irq", channel, channel, &name, hwi, &label, false);
                }
                s.push_str("  };\n");
            }
            (PeriphType::Ioc, subtype) => out.warn(
                ExportKind::NetbsdDts,
                format!("{subtype} peripheral not supported by NetBSD"),
            ),
            (ptype, _) => out.warn(
                ExportKind::NetbsdDts,
                format!("{ptype} peripheral not supported by NetBSD"),
            ),
        }
        Ok(())
    }

    /// Last XCU of the cluster, which receives the DMA and MMC lines.
    fn cluster_xcu(&self, periph: &Periph) -> Result<&'m Periph> {
        self.resolver
            .cluster_periph(self.cluster, PeriphType::Xcu)
            .ok_or_else(|| ExportError::NoControllerFor {
                name: self.mapping.pseg(periph.pseg).name.clone(),
                ptype: periph.ptype,
            })
    }

    fn controller(&self, periph: &Periph) -> Result<String> {
        let ctrl = controller_of(self.mapping, self.resolver, periph)?;
        Ok(self.resolver.periph_label(ctrl))
    }

    /// Label of `ctrl` and its input port wired to `isr`.
    fn port(&self, ctrl: &Periph, isr: IsrType, channel: Option<u32>) -> Result<(String, u32)> {
        let label = self.resolver.periph_label(ctrl);
        match self.resolver.isr_source(ctrl, isr, channel) {
            Some(port) => Ok((label, port)),
            None => Err(ExportError::IsrNotFound {
                isr,
                channel,
                controller: label,
            }),
        }
    }

    fn channel_header(
        &self,
        s: &mut String,
        label: &str,
        device_type: &str,
        reg: &str,
        channels: u32,
    ) {
        s.push_str(&format!("  {label} {{\n"));
        s.push_str(&format!("    device_type   = \"{device_type}\";\n"));
        s.push_str(&format!("    reg           = {reg};\n"));
        s.push_str(&format!("    channel_count = < {channels} >;\n"));
    }
}

fn simple_node(s: &mut String, label: &str, device_type: &str, reg: &str) {
    s.push_str(&format!("  {label} {{\n"));
    s.push_str(&format!("    device_type = \"{device_type}\";\n"));
    s.push_str(&format!("    reg         = {reg};\n"));
    s.push_str("  };\n");
}

/// One `irq@` child node. NIC nodes align their property names.
#[allow(clippy::too_many_arguments)]
fn channel_node(
    s: &mut String,
    node: &str,
    channel: u32,
    output_line: u32,
    ctrl: &str,
    hwi: u32,
    parent: &str,
    aligned: bool,
) {
    s.push_str(&format!("    {node}@{channel}{{\n"));
    s.push_str("      device_type = \"soclib:periph:irq\";\n");
    s.push_str(&format!("      output_line = <{output_line}>;\n"));
    if aligned {
        s.push_str(&format!("      irq         = <&{{/{ctrl}}}  {hwi}>;\n"));
        s.push_str(&format!("      parent      = <&{{/{parent}}}>;\n"));
    } else {
        s.push_str(&format!("      irq = <&{{/{ctrl}}}  {hwi}>;\n"));
        s.push_str(&format!("      parent = <&{{/{parent}}}>;\n"));
    }
    s.push_str("    };\n");
}
