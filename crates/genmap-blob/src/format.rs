//! map.bin encoder.
//!
//! Records are written in the fixed traversal order expected by the boot
//! loader. Every cross reference is resolved through a [`Resolver`] while
//! the record is being written; nothing is cached on the mapping.

use std::io::{self, Write};

use thiserror::Error;
use tracing::debug;

use genmap_core::entity::Idx;
use genmap_core::error::MappingError;
use genmap_core::kinds::ClosedKind;
use genmap_core::mapping::{Mapping, MAPPING_SIGNATURE};
use genmap_core::resolve::Resolver;

/// Magic number at offset 0 of every blob.
pub const SIGNATURE: u32 = MAPPING_SIGNATURE;

/// 17 header words followed by the platform name.
pub const HEADER_SIZE: usize = 17 * 4 + NAME_WIDTH_MAPPING;
pub const CLUSTER_SIZE: usize = 8 * 4;
pub const PSEG_SIZE: usize = NAME_WIDTH + 8 + 8 + 3 * 4;
pub const VSPACE_SIZE: usize = NAME_WIDTH + 6 * 4;
pub const VSEG_SIZE: usize = NAME_WIDTH + BINPATH_WIDTH + 4 + 8 + 5 * 4 + 4;
pub const TASK_SIZE: usize = NAME_WIDTH + 7 * 4;
pub const PROC_SIZE: usize = 4;
pub const IRQ_SIZE: usize = 6 * 4;
pub const PERIPH_SIZE: usize = 10 * 4;

/// Width of the platform name field in the header.
pub const NAME_WIDTH_MAPPING: usize = 64;
/// Width of pseg, vspace, vseg and task name fields.
pub const NAME_WIDTH: usize = 32;
/// Width of the vseg binary path field.
pub const BINPATH_WIDTH: usize = 64;

/// Errors raised while encoding or decoding a blob.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("{field} '{name}' does not fit in a {width}-byte field")]
    NameTooLong {
        field: &'static str,
        name: String,
        width: usize,
    },

    #[error("unknown {family} code {value}")]
    UnknownCode { family: &'static str, value: String },

    #[error("bad signature {found:#x} (expected {SIGNATURE:#x})")]
    BadSignature { found: u32 },

    #[error("blob size is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("{field} field is not a NUL-terminated UTF-8 string")]
    InvalidName { field: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, BlobError>;

/// Binary descriptor of a finished mapping.
#[derive(Debug, Clone, Copy)]
pub struct MapBlob<'m> {
    mapping: &'m Mapping,
}

impl<'m> MapBlob<'m> {
    pub fn new(mapping: &'m Mapping) -> Self {
        Self { mapping }
    }

    /// Expected blob size for the mapping.
    pub fn size(&self) -> usize {
        let totals = self.mapping.totals();
        HEADER_SIZE
            + CLUSTER_SIZE * self.mapping.clusters().len()
            + PSEG_SIZE * totals.psegs as usize
            + VSPACE_SIZE * totals.vspaces as usize
            + VSEG_SIZE * totals.vsegs as usize
            + TASK_SIZE * totals.tasks as usize
            + PROC_SIZE * totals.procs as usize
            + IRQ_SIZE * totals.irqs as usize
            + PERIPH_SIZE * totals.periphs as usize
    }

    /// Encode the whole blob, then write it. Nothing is written when
    /// encoding fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mapping = self.mapping;
        mapping.check_order()?;
        let resolver = Resolver::new(mapping)?;
        let mut out = Encoder {
            buf: Vec::with_capacity(self.size()),
        };

        self.header(&mut out)?;
        self.clusters(&mut out)?;
        self.psegs(&mut out)?;
        self.vspaces(&mut out, &resolver)?;
        self.vsegs(&mut out, &resolver)?;
        self.tasks(&mut out, &resolver)?;
        self.procs(&mut out)?;
        self.irqs(&mut out)?;
        self.periphs(&mut out)?;

        debug_assert_eq!(out.buf.len(), self.size());
        debug!(name = mapping.name(), bytes = out.buf.len(), "map.bin encoded");
        Ok(out.buf)
    }

    fn header(&self, out: &mut Encoder) -> Result<()> {
        let params = self.mapping.params();
        let totals = self.mapping.totals();
        for word in [
            SIGNATURE,
            params.x_size,
            params.y_size,
            params.x_width,
            params.y_width,
            params.x_io,
            params.y_io,
            params.irq_per_proc,
            u32::from(params.use_ramdisk),
            totals.globals,
            totals.vspaces,
            totals.psegs,
            totals.vsegs,
            totals.tasks,
            totals.procs,
            totals.irqs,
            totals.periphs,
        ] {
            out.u32(word);
        }
        out.name("mapping name", &params.name, NAME_WIDTH_MAPPING)?;
        debug!(
            signature = SIGNATURE,
            name = %params.name,
            x_size = params.x_size,
            y_size = params.y_size,
            globals = totals.globals,
            vspaces = totals.vspaces,
            psegs = totals.psegs,
            vsegs = totals.vsegs,
            tasks = totals.tasks,
            procs = totals.procs,
            irqs = totals.irqs,
            periphs = totals.periphs,
            "header"
        );
        Ok(())
    }

    fn clusters(&self, out: &mut Encoder) -> Result<()> {
        for (expected, cluster) in self.mapping.clusters().iter().enumerate() {
            check_index("cluster", cluster.index, expected)?;
            out.u32(cluster.x);
            out.u32(cluster.y);
            out.u32(cluster.psegs.len() as u32);
            out.u32(first_index(&cluster.psegs));
            out.u32(cluster.procs.len() as u32);
            out.u32(first_index(&cluster.procs));
            out.u32(cluster.periphs.len() as u32);
            out.u32(first_index(&cluster.periphs));
            debug!(
                cluster = expected,
                x = cluster.x,
                y = cluster.y,
                psegs = cluster.psegs.len(),
                procs = cluster.procs.len(),
                periphs = cluster.periphs.len(),
                "cluster"
            );
        }
        Ok(())
    }

    fn psegs(&self, out: &mut Encoder) -> Result<()> {
        for (expected, pseg) in self.mapping.psegs_in_order().enumerate() {
            check_index("pseg", pseg.index, expected)?;
            out.name("pseg name", &pseg.name, NAME_WIDTH)?;
            out.u64(pseg.base);
            out.u64(pseg.size);
            out.u32(code_of(&pseg.kind)?);
            out.u32(pseg.cluster.index());
            out.u32(0);
            debug!(pseg = expected, name = %pseg.name, base = pseg.base, size = pseg.size, "pseg");
        }
        Ok(())
    }

    fn vspaces(&self, out: &mut Encoder, resolver: &Resolver<'_>) -> Result<()> {
        for (expected, vspace) in self.mapping.vspaces().iter().enumerate() {
            check_index("vspace", vspace.index, expected)?;
            let start = resolver.vspace_start(vspace)?;
            out.name("vspace name", &vspace.name, NAME_WIDTH)?;
            out.u32(start.index());
            out.u32(vspace.vsegs.len() as u32);
            out.u32(vspace.tasks.len() as u32);
            out.u32(first_index(&vspace.vsegs));
            out.u32(first_index(&vspace.tasks));
            out.u32(u32::from(vspace.active));
            debug!(vspace = expected, name = %vspace.name, start = start.index(), "vspace");
        }
        Ok(())
    }

    fn vsegs(&self, out: &mut Encoder, resolver: &Resolver<'_>) -> Result<()> {
        for (expected, vseg) in self.mapping.vsegs_in_order().enumerate() {
            check_index("vseg", vseg.index, expected)?;
            let pseg = resolver.vseg_pseg(vseg)?;
            let mode = vseg.mode.code().ok_or_else(|| BlobError::UnknownCode {
                family: "vseg mode",
                value: vseg.mode.name().to_string(),
            })?;
            out.name("vseg name", &vseg.name, NAME_WIDTH)?;
            out.name("vseg binpath", &vseg.binpath, BINPATH_WIDTH)?;
            out.u32(vseg.vbase);
            // Physical base, filled in by the boot loader.
            out.u64(0);
            out.u32(vseg.length);
            out.u32(pseg.index());
            out.u32(mode);
            out.u32(code_of(&vseg.kind)?);
            out.u8(0);
            out.u8(u8::from(vseg.identity));
            out.u8(u8::from(vseg.local));
            out.u8(u8::from(vseg.big));
            debug!(
                vseg = expected,
                name = %vseg.name,
                vbase = vseg.vbase,
                length = vseg.length,
                pseg = pseg.index(),
                mode = %vseg.mode,
                "vseg"
            );
        }
        Ok(())
    }

    fn tasks(&self, out: &mut Encoder, resolver: &Resolver<'_>) -> Result<()> {
        for (expected, task) in self.mapping.tasks_in_order().enumerate() {
            check_index("task", task.index, expected)?;
            let stack = resolver.task_stack(task)?;
            let heap = resolver.task_heap(task)?.map_or(0, |id| id.index());
            let cluster = resolver.task_cluster(task);
            out.name("task name", &task.name, NAME_WIDTH)?;
            out.u32(cluster.index());
            out.u32(task.lpid);
            out.u32(task.trdid);
            out.u32(stack.index());
            out.u32(heap);
            out.u32(task.startid);
            out.u32(0);
            debug!(
                task = expected,
                name = %task.name,
                cluster = cluster.index(),
                lpid = task.lpid,
                stack = stack.index(),
                heap,
                "task"
            );
        }
        Ok(())
    }

    fn procs(&self, out: &mut Encoder) -> Result<()> {
        for (expected, proc) in self.mapping.procs_in_order().enumerate() {
            check_index("proc", proc.index, expected)?;
            out.u32(proc.lpid);
            debug!(proc = expected, x = proc.x, y = proc.y, lpid = proc.lpid, "proc");
        }
        Ok(())
    }

    fn irqs(&self, out: &mut Encoder) -> Result<()> {
        for (expected, irq) in self.mapping.irqs_in_order().enumerate() {
            check_index("irq", irq.index, expected)?;
            out.u32(code_of(&irq.kind)?);
            out.u32(irq.port);
            out.u32(code_of(&irq.isr)?);
            out.u32(irq.channel);
            // Destination cluster and port, set by the kernel.
            out.u32(0);
            out.u32(0);
            debug!(irq = expected, port = irq.port, isr = %irq.isr, channel = irq.channel, "irq");
        }
        Ok(())
    }

    fn periphs(&self, out: &mut Encoder) -> Result<()> {
        for (expected, periph) in self.mapping.periphs_in_order().enumerate() {
            check_index("periph", periph.index, expected)?;
            let subtype = periph.subtype.code().ok_or_else(|| BlobError::UnknownCode {
                family: "peripheral subtype",
                value: periph.subtype.name().to_string(),
            })?;
            out.u32(code_of(&periph.ptype)?);
            out.u32(subtype);
            out.u32(periph.pseg.index());
            out.u32(periph.channels);
            for arg in periph.args {
                out.u32(arg);
            }
            out.u32(periph.irqs.len() as u32);
            out.u32(first_index(&periph.irqs));
            debug!(
                periph = expected,
                ptype = %periph.ptype,
                subtype = %periph.subtype,
                pseg = periph.pseg.index(),
                channels = periph.channels,
                irqs = periph.irqs.len(),
                "periph"
            );
        }
        Ok(())
    }
}

struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    fn u8(&mut self, val: u8) {
        self.buf.push(val);
    }

    fn u32(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    fn u64(&mut self, val: u64) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    /// NUL-padded name; at least one terminating NUL must fit.
    fn name(&mut self, field: &'static str, name: &str, width: usize) -> Result<()> {
        let bytes = name.as_bytes();
        if bytes.len() >= width {
            return Err(BlobError::NameTooLong {
                field,
                name: name.to_string(),
                width,
            });
        }
        self.buf.extend_from_slice(bytes);
        self.buf.resize(self.buf.len() + width - bytes.len(), 0);
        Ok(())
    }
}

/// Global index of the first child, 0 for an empty owner.
fn first_index<T>(children: &[Idx<T>]) -> u32 {
    children.first().map_or(0, |id| id.index())
}

fn check_index<T>(family: &'static str, index: Idx<T>, expected: usize) -> Result<()> {
    let expected = expected as u32;
    if index.index() != expected {
        return Err(MappingError::IndexMismatch {
            family,
            index: index.index(),
            expected,
        }
        .into());
    }
    Ok(())
}

fn code_of<K: ClosedKind>(kind: &K) -> Result<u32> {
    kind.code().ok_or_else(|| BlobError::UnknownCode {
        family: K::FAMILY,
        value: kind.name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use genmap_core::builder::MappingBuilder;
    use genmap_core::entity::{PeriphDesc, TaskDesc, VsegDesc};
    use genmap_core::kinds::{IocSubtype, IsrType, PeriphSubtype, PeriphType, VsegMode, VsegType};
    use genmap_core::mapping::PlatformParams;

    const RAM_SIZE: u64 = 0x0100_0000;

    fn word(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn sample() -> Mapping {
        let mut params = PlatformParams::new("blob", 1, 2, 2);
        params.ram_size = RAM_SIZE;
        let mut b = MappingBuilder::new(params).unwrap();
        let geom = b.mapping().geometry();

        b.add_ram("RAM", 0, RAM_SIZE).unwrap();
        let xcu = b
            .add_periph("XCU", 0xB000_0000, 0x1000, PeriphDesc::new(PeriphType::Xcu))
            .unwrap();
        let ioc = b
            .add_periph(
                "IOC",
                0xB300_0000,
                0x1000,
                PeriphDesc::new(PeriphType::Ioc).subtype(PeriphSubtype::Ioc(IocSubtype::Sdc)),
            )
            .unwrap();
        b.add_irq(xcu, 8, ioc, IsrType::Sdc, 0).unwrap();
        b.add_proc(0, 0, 0).unwrap();
        b.add_proc(0, 0, 1).unwrap();
        // Cluster (0,1): RAM only.
        b.add_ram("RAM", geom.encode(0, 1), RAM_SIZE).unwrap();

        b.add_global(
            VsegDesc::new("seg_boot_code", 0xBFC0_0000, 0x1000, VsegMode::CX__, VsegType::Buffer)
                .identity(),
        )
        .unwrap();

        let app = b.add_vspace("app", "app_data", true);
        b.add_vseg(
            app,
            VsegDesc::new("app_data", 0x1000_0000, 0x1000, VsegMode::C_WU, VsegType::Elf)
                .binpath("bin/app.elf"),
        )
        .unwrap();
        b.add_vseg(
            app,
            VsegDesc::new("app_stack", 0x4000_0000, 0x2000, VsegMode::C_WU, VsegType::Buffer)
                .on(0, 1, "RAM"),
        )
        .unwrap();
        b.add_task(app, TaskDesc::new("main", 0).on(0, 0, 1).stack("app_stack").startid(1))
            .unwrap();
        b.build()
    }

    #[test]
    fn header_layout() {
        let mapping = sample();
        let bytes = MapBlob::new(&mapping).to_bytes().unwrap();
        assert_eq!(bytes.len(), MapBlob::new(&mapping).size());

        assert_eq!(word(&bytes, 0), 0xDACE_2014);
        assert_eq!(word(&bytes, 4), 1); // x_size
        assert_eq!(word(&bytes, 8), 2); // y_size
        assert_eq!(word(&bytes, 36), 1); // globals
        assert_eq!(word(&bytes, 40), 1); // vspaces
        assert_eq!(word(&bytes, 44), 4); // psegs
        assert_eq!(word(&bytes, 48), 3); // vsegs
        assert_eq!(word(&bytes, 52), 1); // tasks
        assert_eq!(word(&bytes, 56), 2); // procs
        assert_eq!(word(&bytes, 60), 1); // irqs
        assert_eq!(word(&bytes, 64), 2); // periphs
        assert_eq!(&bytes[68..72], b"blob");
        assert!(bytes[72..HEADER_SIZE].iter().all(|&b| b == 0));
    }

    #[test]
    fn record_sizes() {
        assert_eq!(HEADER_SIZE, 132);
        assert_eq!(CLUSTER_SIZE, 32);
        assert_eq!(PSEG_SIZE, 60);
        assert_eq!(VSPACE_SIZE, 56);
        assert_eq!(VSEG_SIZE, 128);
        assert_eq!(TASK_SIZE, 60);
        assert_eq!(IRQ_SIZE, 24);
        assert_eq!(PERIPH_SIZE, 40);
    }

    #[test]
    fn empty_cluster_offsets_are_zero() {
        let mapping = sample();
        let bytes = MapBlob::new(&mapping).to_bytes().unwrap();
        // Second cluster record: one pseg starting at 3, no procs or periphs.
        let c1 = HEADER_SIZE + CLUSTER_SIZE;
        let fields: Vec<u32> = (0..8).map(|i| word(&bytes, c1 + 4 * i)).collect();
        assert_eq!(fields, vec![0, 1, 1, 3, 0, 0, 0, 0]);
    }

    #[test]
    fn task_record_resolves_names() {
        let mapping = sample();
        let bytes = MapBlob::new(&mapping).to_bytes().unwrap();
        let task = HEADER_SIZE + 2 * CLUSTER_SIZE + 4 * PSEG_SIZE + VSPACE_SIZE + 3 * VSEG_SIZE;
        assert_eq!(&bytes[task..task + 4], b"main");
        let fields: Vec<u32> = (0..7)
            .map(|i| word(&bytes, task + NAME_WIDTH + 4 * i))
            .collect();
        // cluster 0, lpid 1, trdid 0, stack vseg 2, no heap, startid 1, ltid 0
        assert_eq!(fields, vec![0, 1, 0, 2, 0, 1, 0]);
    }

    #[test]
    fn periph_subtype_code() {
        let mapping = sample();
        let bytes = MapBlob::new(&mapping).to_bytes().unwrap();
        let periphs = bytes.len() - 2 * PERIPH_SIZE;
        // XCU: type 12, no subtype, pseg 1, one irq starting at 0.
        assert_eq!(word(&bytes, periphs), 12);
        assert_eq!(word(&bytes, periphs + 4), 0xFFFF_FFFF);
        assert_eq!(word(&bytes, periphs + 8), 1);
        assert_eq!(word(&bytes, periphs + 32), 1);
        // IOC/SDC.
        let ioc = periphs + PERIPH_SIZE;
        assert_eq!(word(&bytes, ioc), 4);
        assert_eq!(word(&bytes, ioc + 4), 2);
        assert_eq!(word(&bytes, ioc + 32), 0);
    }

    #[test]
    fn long_names_rejected() {
        let mut params = PlatformParams::new("x".repeat(64), 1, 1, 1);
        params.ram_size = RAM_SIZE;
        let mapping = MappingBuilder::new(params).unwrap().build();
        let err = MapBlob::new(&mapping).to_bytes().unwrap_err();
        assert!(matches!(err, BlobError::NameTooLong { width: 64, .. }));

        let mut params = PlatformParams::new("x".repeat(63), 1, 1, 1);
        params.ram_size = RAM_SIZE;
        let mapping = MappingBuilder::new(params).unwrap().build();
        assert!(MapBlob::new(&mapping).to_bytes().is_ok());
    }

    #[test]
    fn record_name_keeps_one_terminating_nul() {
        let blob_with_vspace = |name: &str| {
            let mut params = PlatformParams::new("names", 1, 1, 1);
            params.ram_size = RAM_SIZE;
            let mut b = MappingBuilder::new(params).unwrap();
            b.add_ram("RAM", 0, RAM_SIZE).unwrap();
            let app = b.add_vspace(name, "data", true);
            b.add_vseg(
                app,
                VsegDesc::new("data", 0x1000_0000, 0x1000, VsegMode::C_WU, VsegType::Buffer),
            )
            .unwrap();
            MapBlob::new(&b.build()).to_bytes()
        };

        let longest = "v".repeat(NAME_WIDTH - 1);
        let bytes = blob_with_vspace(&longest).unwrap();
        let vspace = HEADER_SIZE + CLUSTER_SIZE + PSEG_SIZE;
        assert_eq!(&bytes[vspace..vspace + NAME_WIDTH - 1], longest.as_bytes());
        assert_eq!(bytes[vspace + NAME_WIDTH - 1], 0);

        let err = blob_with_vspace(&"v".repeat(NAME_WIDTH)).unwrap_err();
        assert!(matches!(
            err,
            BlobError::NameTooLong { field: "vspace name", width: NAME_WIDTH, .. }
        ));
    }

    #[test]
    fn unresolved_start_vector_fails() {
        let mut params = PlatformParams::new("bad", 1, 1, 1);
        params.ram_size = RAM_SIZE;
        let mut b = MappingBuilder::new(params).unwrap();
        b.add_vspace("app", "nowhere", false);
        let mapping = b.build();

        let mut out = Vec::new();
        let err = MapBlob::new(&mapping).write_to(&mut out).unwrap_err();
        assert!(err.to_string().contains("nowhere"));
        assert!(out.is_empty());
    }

    #[test]
    fn encoding_is_deterministic() {
        let first = MapBlob::new(&sample()).to_bytes().unwrap();
        let second = MapBlob::new(&sample()).to_bytes().unwrap();
        assert_eq!(first, second);
    }
}
