//! map.bin decoder, used to inspect generated blobs.

use std::io::Read;

use serde::Serialize;

use genmap_core::kinds::{
    ClosedKind, IocSubtype, IrqType, IsrType, MwrSubtype, PeriphSubtype, PeriphType, PsegType,
    VsegMode, VsegType,
};
use genmap_core::mapping::Totals;

use crate::format::{
    BlobError, Result, BINPATH_WIDTH, CLUSTER_SIZE, HEADER_SIZE, IRQ_SIZE, NAME_WIDTH,
    NAME_WIDTH_MAPPING, PERIPH_SIZE, PROC_SIZE, PSEG_SIZE, SIGNATURE, TASK_SIZE, VSEG_SIZE,
    VSPACE_SIZE,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderRecord {
    pub signature: u32,
    pub name: String,
    pub x_size: u32,
    pub y_size: u32,
    pub x_width: u32,
    pub y_width: u32,
    pub x_io: u32,
    pub y_io: u32,
    pub irq_per_proc: u32,
    pub use_ramdisk: bool,
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterRecord {
    pub x: u32,
    pub y: u32,
    pub psegs: u32,
    pub pseg_offset: u32,
    pub procs: u32,
    pub proc_offset: u32,
    pub periphs: u32,
    pub periph_offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PsegRecord {
    pub name: String,
    pub base: u64,
    pub length: u64,
    pub kind: PsegType,
    pub cluster: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VspaceRecord {
    pub name: String,
    pub start_vseg: u32,
    pub vsegs: u32,
    pub tasks: u32,
    pub vseg_offset: u32,
    pub task_offset: u32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VsegRecord {
    pub name: String,
    pub binpath: String,
    pub vbase: u32,
    pub length: u32,
    pub pseg: u32,
    pub mode: String,
    pub kind: VsegType,
    pub ident: bool,
    pub local: bool,
    pub big: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub name: String,
    pub cluster: u32,
    pub lpid: u32,
    pub trdid: u32,
    pub stack_vseg: u32,
    pub heap_vseg: u32,
    pub startid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrqRecord {
    pub kind: IrqType,
    pub port: u32,
    pub isr: IsrType,
    pub channel: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriphRecord {
    pub ptype: PeriphType,
    pub subtype: String,
    pub pseg: u32,
    pub channels: u32,
    pub args: [u32; 4],
    pub irqs: u32,
    pub irq_offset: u32,
}

/// Plain-record view of a decoded blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedMapping {
    pub header: HeaderRecord,
    pub clusters: Vec<ClusterRecord>,
    pub psegs: Vec<PsegRecord>,
    pub vspaces: Vec<VspaceRecord>,
    pub vsegs: Vec<VsegRecord>,
    pub tasks: Vec<TaskRecord>,
    /// Local processor index of each processor.
    pub procs: Vec<u32>,
    pub irqs: Vec<IrqRecord>,
    pub periphs: Vec<PeriphRecord>,
}

impl DecodedMapping {
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Decode a blob, checking its signature, its total size against the
    /// header counts and every enum code.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(BlobError::SizeMismatch {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        let mut r = Reader { data, pos: 0 };

        let signature = r.u32();
        if signature != SIGNATURE {
            return Err(BlobError::BadSignature { found: signature });
        }
        let x_size = r.u32();
        let y_size = r.u32();
        let x_width = r.u32();
        let y_width = r.u32();
        let x_io = r.u32();
        let y_io = r.u32();
        let irq_per_proc = r.u32();
        let use_ramdisk = r.u32() != 0;
        let totals = Totals {
            globals: r.u32(),
            vspaces: r.u32(),
            psegs: r.u32(),
            vsegs: r.u32(),
            tasks: r.u32(),
            procs: r.u32(),
            irqs: r.u32(),
            periphs: r.u32(),
        };
        let name = r.name("mapping name", NAME_WIDTH_MAPPING)?;

        // Saturates so an absurd header reports a mismatch instead of wrapping.
        let clusters = (x_size as usize).checked_mul(y_size as usize);
        let expected = [
            (CLUSTER_SIZE, clusters.unwrap_or(usize::MAX)),
            (PSEG_SIZE, totals.psegs as usize),
            (VSPACE_SIZE, totals.vspaces as usize),
            (VSEG_SIZE, totals.vsegs as usize),
            (TASK_SIZE, totals.tasks as usize),
            (PROC_SIZE, totals.procs as usize),
            (IRQ_SIZE, totals.irqs as usize),
            (PERIPH_SIZE, totals.periphs as usize),
        ]
        .iter()
        .try_fold(HEADER_SIZE, |acc, &(size, count)| {
            size.checked_mul(count).and_then(|bytes| acc.checked_add(bytes))
        })
        .unwrap_or(usize::MAX);
        if data.len() != expected {
            return Err(BlobError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        let header = HeaderRecord {
            signature,
            name,
            x_size,
            y_size,
            x_width,
            y_width,
            x_io,
            y_io,
            irq_per_proc,
            use_ramdisk,
            totals,
        };

        let clusters = (0..clusters.unwrap_or(0))
            .map(|_| ClusterRecord {
                x: r.u32(),
                y: r.u32(),
                psegs: r.u32(),
                pseg_offset: r.u32(),
                procs: r.u32(),
                proc_offset: r.u32(),
                periphs: r.u32(),
                periph_offset: r.u32(),
            })
            .collect();

        let mut psegs = Vec::with_capacity(totals.psegs as usize);
        for _ in 0..totals.psegs {
            let name = r.name("pseg name", NAME_WIDTH)?;
            let base = r.u64();
            let length = r.u64();
            let kind = r.kind::<PsegType>()?;
            let cluster = r.u32();
            r.skip(4);
            psegs.push(PsegRecord {
                name,
                base,
                length,
                kind,
                cluster,
            });
        }

        let mut vspaces = Vec::with_capacity(totals.vspaces as usize);
        for _ in 0..totals.vspaces {
            vspaces.push(VspaceRecord {
                name: r.name("vspace name", NAME_WIDTH)?,
                start_vseg: r.u32(),
                vsegs: r.u32(),
                tasks: r.u32(),
                vseg_offset: r.u32(),
                task_offset: r.u32(),
                active: r.u32() != 0,
            });
        }

        let mut vsegs = Vec::with_capacity(totals.vsegs as usize);
        for _ in 0..totals.vsegs {
            let name = r.name("vseg name", NAME_WIDTH)?;
            let binpath = r.name("vseg binpath", BINPATH_WIDTH)?;
            let vbase = r.u32();
            r.skip(8);
            let length = r.u32();
            let pseg = r.u32();
            let mode_code = r.u32();
            let mode = u8::try_from(mode_code)
                .ok()
                .and_then(VsegMode::from_bits)
                .ok_or_else(|| BlobError::UnknownCode {
                    family: "vseg mode",
                    value: mode_code.to_string(),
                })?;
            let kind = r.kind::<VsegType>()?;
            r.skip(1);
            vsegs.push(VsegRecord {
                name,
                binpath,
                vbase,
                length,
                pseg,
                mode: mode.name().to_string(),
                kind,
                ident: r.u8() != 0,
                local: r.u8() != 0,
                big: r.u8() != 0,
            });
        }

        let mut tasks = Vec::with_capacity(totals.tasks as usize);
        for _ in 0..totals.tasks {
            tasks.push(TaskRecord {
                name: r.name("task name", NAME_WIDTH)?,
                cluster: r.u32(),
                lpid: r.u32(),
                trdid: r.u32(),
                stack_vseg: r.u32(),
                heap_vseg: r.u32(),
                startid: r.u32(),
            });
            r.skip(4);
        }

        let procs = (0..totals.procs).map(|_| r.u32()).collect();

        let mut irqs = Vec::with_capacity(totals.irqs as usize);
        for _ in 0..totals.irqs {
            let kind = r.kind::<IrqType>()?;
            let port = r.u32();
            let isr = r.kind::<IsrType>()?;
            let channel = r.u32();
            r.skip(8);
            irqs.push(IrqRecord {
                kind,
                port,
                isr,
                channel,
            });
        }

        let mut periphs = Vec::with_capacity(totals.periphs as usize);
        for _ in 0..totals.periphs {
            let ptype = r.kind::<PeriphType>()?;
            let subtype = decode_subtype(ptype, r.u32())?;
            periphs.push(PeriphRecord {
                ptype,
                subtype: subtype.name().to_string(),
                pseg: r.u32(),
                channels: r.u32(),
                args: [r.u32(), r.u32(), r.u32(), r.u32()],
                irqs: r.u32(),
                irq_offset: r.u32(),
            });
        }

        Ok(Self {
            header,
            clusters,
            psegs,
            vspaces,
            vsegs,
            tasks,
            procs,
            irqs,
            periphs,
        })
    }
}

fn decode_subtype(ptype: PeriphType, code: u32) -> Result<PeriphSubtype> {
    let subtype = match ptype {
        _ if code == PeriphSubtype::NONE_CODE => Some(PeriphSubtype::None),
        PeriphType::Ioc => IocSubtype::from_code(code).map(PeriphSubtype::Ioc),
        PeriphType::Mwr => MwrSubtype::from_code(code).map(PeriphSubtype::Mwr),
        _ => None,
    };
    subtype.ok_or_else(|| BlobError::UnknownCode {
        family: "peripheral subtype",
        value: format!("{code:#x} for {ptype}"),
    })
}

/// Little-endian cursor. Bounds are guaranteed by the size check done
/// before any record is read.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        bytes
    }

    fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    fn kind<K: ClosedKind>(&mut self) -> Result<K> {
        let code = self.u32();
        K::from_code(code).ok_or_else(|| BlobError::UnknownCode {
            family: K::FAMILY,
            value: code.to_string(),
        })
    }

    fn name(&mut self, field: &'static str, width: usize) -> Result<String> {
        let raw = &self.data[self.pos..self.pos + width];
        self.pos += width;
        let end = raw
            .iter()
            .position(|&b| b == 0)
            .ok_or(BlobError::InvalidName { field })?;
        std::str::from_utf8(&raw[..end])
            .map(str::to_string)
            .map_err(|_| BlobError::InvalidName { field })
    }
}
