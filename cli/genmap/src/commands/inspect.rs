//! `genmap inspect`: decode a map.bin file.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use genmap_blob::DecodedMapping;

/// Decode `path` and print it as text or JSON.
pub fn run(path: &Path, format: &str) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let decoded = DecodedMapping::from_bytes(&bytes)
        .with_context(|| format!("decoding {}", path.display()))?;

    match format {
        "text" => print!("{}", render_text(&decoded)),
        "json" => println!("{}", serde_json::to_string_pretty(&decoded)?),
        other => bail!("unknown format: '{other}'. Available: text, json"),
    }
    Ok(())
}

/// Human-readable dump of a decoded blob.
pub fn render_text(m: &DecodedMapping) -> String {
    let h = &m.header;
    let t = &h.totals;
    let mut s = String::new();

    s.push_str(&format!("=== Mapping: {} ===\n", h.name));
    s.push_str(&format!("  Signature:   0x{:08x}\n", h.signature));
    s.push_str(&format!("  Grid:        {}x{}\n", h.x_size, h.y_size));
    s.push_str(&format!("  Widths:      x={} y={}\n", h.x_width, h.y_width));
    s.push_str(&format!("  I/O cluster: [{},{}]\n", h.x_io, h.y_io));
    s.push_str(&format!("  IRQ/proc:    {}\n", h.irq_per_proc));
    s.push_str(&format!("  Ramdisk:     {}\n", h.use_ramdisk));
    s.push('\n');

    s.push_str("--- Totals ---\n");
    for (label, count) in [
        ("globals", t.globals),
        ("vspaces", t.vspaces),
        ("psegs", t.psegs),
        ("vsegs", t.vsegs),
        ("tasks", t.tasks),
        ("procs", t.procs),
        ("irqs", t.irqs),
        ("periphs", t.periphs),
    ] {
        s.push_str(&format!("  {label:<8} {count}\n"));
    }
    s.push('\n');

    s.push_str("--- Clusters ---\n");
    for c in &m.clusters {
        s.push_str(&format!(
            "  [{},{}] psegs {}@{} procs {}@{} periphs {}@{}\n",
            c.x,
            c.y,
            c.psegs,
            c.pseg_offset,
            c.procs,
            c.proc_offset,
            c.periphs,
            c.periph_offset
        ));
    }
    s.push('\n');

    s.push_str("--- Psegs ---\n");
    for (i, p) in m.psegs.iter().enumerate() {
        s.push_str(&format!(
            "  {i:>4} {:<16} {:<4} 0x{:010x} 0x{:x} cluster {}\n",
            p.name,
            p.kind.to_string(),
            p.base,
            p.length,
            p.cluster
        ));
    }
    s.push('\n');

    s.push_str("--- Periphs ---\n");
    for (i, p) in m.periphs.iter().enumerate() {
        s.push_str(&format!(
            "  {i:>4} {:<4} {:<4} pseg {} channels {} irqs {}@{}\n",
            p.ptype.to_string(),
            p.subtype,
            p.pseg,
            p.channels,
            p.irqs,
            p.irq_offset
        ));
    }
    s.push('\n');

    s.push_str("--- Irqs ---\n");
    for (i, irq) in m.irqs.iter().enumerate() {
        s.push_str(&format!(
            "  {i:>4} {} port {} {} channel {}\n",
            irq.kind, irq.port, irq.isr, irq.channel
        ));
    }
    s.push('\n');

    s.push_str("--- Vsegs ---\n");
    for (i, v) in m.vsegs.iter().enumerate() {
        let mut flags = String::new();
        if v.ident {
            flags.push_str(" ident");
        }
        if v.local {
            flags.push_str(" local");
        }
        if v.big {
            flags.push_str(" big");
        }
        s.push_str(&format!(
            "  {i:>4} {:<24} 0x{:08x} 0x{:x} {} {} pseg {}{flags}\n",
            v.name, v.vbase, v.length, v.kind, v.mode, v.pseg
        ));
    }
    s.push('\n');

    s.push_str("--- Vspaces ---\n");
    for v in &m.vspaces {
        s.push_str(&format!(
            "  {} start {} vsegs {}@{} tasks {}@{}{}\n",
            v.name,
            v.start_vseg,
            v.vsegs,
            v.vseg_offset,
            v.tasks,
            v.task_offset,
            if v.active { " active" } else { "" }
        ));
    }
    s.push('\n');

    s.push_str("--- Tasks ---\n");
    for task in &m.tasks {
        s.push_str(&format!(
            "  {:<16} trdid {} cluster {} lpid {} stack {} heap {} startid {}\n",
            task.name,
            task.trdid,
            task.cluster,
            task.lpid,
            task.stack_vseg,
            task.heap_vseg,
            task.startid
        ));
    }
    s
}
