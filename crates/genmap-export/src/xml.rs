//! `map.xml`: XML rendering of the whole mapping.

use genmap_core::entity::{Cluster, Irq, Periph, Task, Vseg, Vspace};
use genmap_core::kinds::{ClosedKind, PeriphType};
use genmap_core::mapping::{Mapping, MAPPING_SIGNATURE};

use crate::error::Result;
use crate::export::{ExportKind, ExportOutput, Exporter};

pub struct XmlExporter;

impl Exporter for XmlExporter {
    fn kind(&self) -> ExportKind {
        ExportKind::Xml
    }

    fn export(&self, mapping: &Mapping) -> Result<ExportOutput> {
        let p = mapping.params();
        let mut s = String::new();

        s.push_str("<?xml version=\"1.0\"?>\n\n");
        s.push_str(&format!("<mapping_info signature    = \"0x{MAPPING_SIGNATURE:x}\"\n"));
        s.push_str(&format!("              name         = \"{}\"\n", p.name));
        s.push_str(&format!("              x_size       = \"{}\"\n", p.x_size));
        s.push_str(&format!("              y_size       = \"{}\"\n", p.y_size));
        s.push_str(&format!("              x_width      = \"{}\"\n", p.x_width));
        s.push_str(&format!("              y_width      = \"{}\"\n", p.y_width));
        s.push_str(&format!("              irq_per_proc = \"{}\"\n", p.irq_per_proc));
        s.push_str(&format!("              use_ramdisk  = \"{}\"\n", u8::from(p.use_ramdisk)));
        s.push_str(&format!("              x_io         = \"{}\"\n", p.x_io));
        s.push_str(&format!("              y_io         = \"{}\" >\n", p.y_io));
        s.push('\n');

        s.push_str("    <clusterset>\n");
        for cluster in mapping.clusters() {
            cluster_xml(&mut s, mapping, cluster);
        }
        s.push_str("    </clusterset>\n\n");

        s.push_str("    <globalset>\n");
        for vseg in mapping.globals() {
            vseg_xml(&mut s, vseg);
        }
        s.push_str("    </globalset>\n\n");

        s.push_str("    <vspaceset>\n");
        for vspace in mapping.vspaces() {
            vspace_xml(&mut s, mapping, vspace);
        }
        s.push_str("    </vspaceset>\n");
        s.push_str("</mapping_info>\n");

        Ok(ExportOutput {
            text: s,
            warnings: Vec::new(),
        })
    }
}

fn cluster_xml(s: &mut String, mapping: &Mapping, cluster: &Cluster) {
    s.push_str(&format!("        <cluster x=\"{}\" y=\"{}\" >\n", cluster.x, cluster.y));
    for pseg in mapping.cluster_psegs(cluster) {
        s.push_str(&format!(
            "            <pseg name=\"{}\" type=\"{}\" base=\"0x{:x}\" length=\"0x{:x}\" />\n",
            pseg.name, pseg.kind, pseg.base, pseg.size
        ));
    }
    for proc in mapping.cluster_procs(cluster) {
        s.push_str(&format!("            <proc index=\"{}\" />\n", proc.lpid));
    }
    for periph in mapping.cluster_periphs(cluster) {
        periph_xml(s, mapping, periph);
    }
    s.push_str("        </cluster>\n");
}

fn periph_xml(s: &mut String, mapping: &Mapping, periph: &Periph) {
    s.push_str(&format!(
        "            <periph type=\"{}\" subtype=\"{}\" psegname=\"{}\" channels=\"{}\"",
        periph.ptype,
        periph.subtype,
        mapping.pseg(periph.pseg).name,
        periph.channels
    ));
    for (i, arg) in periph.args.iter().enumerate() {
        s.push_str(&format!(" arg{i}=\"{arg}\""));
    }
    if matches!(periph.ptype, PeriphType::Pic | PeriphType::Xcu) {
        s.push_str(" >\n");
        for irq in mapping.periph_irqs(periph) {
            irq_xml(s, irq);
        }
        s.push_str("            </periph>\n");
    } else {
        s.push_str(" />\n");
    }
}

fn irq_xml(s: &mut String, irq: &Irq) {
    s.push_str(&format!(
        "                <irq srctype=\"{}\" srcid=\"{}\" isr=\"{}\" channel=\"{}\" />\n",
        irq.kind.name(),
        irq.port,
        irq.isr.name(),
        irq.channel
    ));
}

fn vseg_xml(s: &mut String, vseg: &Vseg) {
    s.push_str(&format!(
        "            <vseg name=\"{}\" vbase=\"0x{:x}\" length=\"0x{:x}\" type=\"{}\" mode=\"{}\"",
        vseg.name, vseg.vbase, vseg.length, vseg.kind, vseg.mode
    ));
    s.push_str("\n                 ");
    s.push_str(&format!(
        " x=\"{}\" y=\"{}\" psegname=\"{}\"",
        vseg.x, vseg.y, vseg.psegname
    ));
    if vseg.identity {
        s.push_str(" ident=\"1\"");
    }
    if vseg.local {
        s.push_str(" local=\"1\"");
    }
    if vseg.big {
        s.push_str(" big=\"1\"");
    }
    if !vseg.binpath.is_empty() {
        s.push_str(&format!(" binpath=\"{}\"", vseg.binpath));
    }
    s.push_str(" />\n");
}

fn vspace_xml(s: &mut String, mapping: &Mapping, vspace: &Vspace) {
    s.push_str(&format!(
        "        <vspace name=\"{}\" startname=\"{}\" active=\"{}\" >\n",
        vspace.name,
        vspace.startname,
        u8::from(vspace.active)
    ));
    for vseg in mapping.vspace_vsegs(vspace) {
        vseg_xml(s, vseg);
    }
    for task in mapping.vspace_tasks(vspace) {
        task_xml(s, task);
    }
    s.push_str("        </vspace>\n");
}

fn task_xml(s: &mut String, task: &Task) {
    s.push_str(&format!(
        "            <task name=\"{}\" trdid=\"{}\" x=\"{}\" y=\"{}\" p=\"{}\"",
        task.name, task.trdid, task.x, task.y, task.lpid
    ));
    s.push_str("\n                 ");
    s.push_str(&format!(
        " stackname=\"{}\" heapname=\"{}\" startid=\"{}\" />\n",
        task.stackname, task.heapname, task.startid
    ));
}
