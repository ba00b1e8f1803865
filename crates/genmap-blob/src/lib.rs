//! Packed binary platform descriptor (`map.bin`).
//!
//! The blob is read by the boot loader with no schema: every record has a
//! fixed size and records of one family are contiguous, in global index
//! order. All integers are little-endian.
//!
//! ## File Layout
//!
//! ```text
//! map.bin Layout:
//! ┌──────────────────────────────────────┐
//! │ Header                      132 bytes│
//! │   signature 0xDACE2014               │
//! │   x_size, y_size, x_width, y_width   │
//! │   x_io, y_io, irq_per_proc, ramdisk  │
//! │   globals, vspaces, psegs, vsegs     │
//! │   tasks, procs, irqs, periphs        │
//! │   name[64]                           │
//! ├──────────────────────────────────────┤
//! │ Cluster × (x_size * y_size)  32 bytes│
//! │ Pseg    × psegs              60 bytes│
//! │ Vspace  × vspaces            56 bytes│
//! │ Vseg    × vsegs             128 bytes│
//! │ Task    × tasks              60 bytes│
//! │ Proc    × procs               4 bytes│
//! │ Irq     × irqs               24 bytes│
//! │ Periph  × periphs            40 bytes│
//! └──────────────────────────────────────┘
//! ```
//!
//! Name fields are NUL-padded and always keep at least one NUL.

mod decode;
mod format;

pub use decode::{
    ClusterRecord, DecodedMapping, HeaderRecord, IrqRecord, PeriphRecord, PsegRecord, TaskRecord,
    VsegRecord, VspaceRecord,
};
pub use format::{
    BlobError, MapBlob, Result, BINPATH_WIDTH, CLUSTER_SIZE, HEADER_SIZE, IRQ_SIZE, NAME_WIDTH,
    NAME_WIDTH_MAPPING, PERIPH_SIZE, PROC_SIZE, PSEG_SIZE, SIGNATURE, TASK_SIZE, VSEG_SIZE,
    VSPACE_SIZE,
};
