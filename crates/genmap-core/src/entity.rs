//! Hardware and software entities of a mapping.
//!
//! Every entity is stamped with its global index when it is added to the
//! [`MappingBuilder`](crate::builder::MappingBuilder). Owners keep ordered
//! lists of child handles; children refer to their owner only through a
//! handle.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::kinds::{IrqType, IsrType, PeriphSubtype, PeriphType, PsegType, VsegMode, VsegType};

/// Dense, family-scoped global index of an entity.
pub struct Idx<T> {
    raw: u32,
    _family: PhantomData<fn() -> T>,
}

impl<T> Idx<T> {
    pub(crate) fn new(raw: u32) -> Self {
        Self {
            raw,
            _family: PhantomData,
        }
    }

    /// The global index as written in the binary descriptor.
    pub fn index(self) -> u32 {
        self.raw
    }

    pub(crate) fn slot(self) -> usize {
        self.raw as usize
    }
}

impl<T> Clone for Idx<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Idx<T> {}

impl<T> PartialEq for Idx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Idx<T> {}

impl<T> Hash for Idx<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

impl<T> fmt::Display for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

pub type ClusterId = Idx<Cluster>;
pub type PsegId = Idx<Pseg>;
pub type ProcId = Idx<Proc>;
pub type PeriphId = Idx<Periph>;
pub type IrqId = Idx<Irq>;
pub type VspaceId = Idx<Vspace>;
pub type VsegId = Idx<Vseg>;
pub type TaskId = Idx<Task>;

/// One tile of the grid.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub index: ClusterId,
    pub x: u32,
    pub y: u32,
    pub psegs: Vec<PsegId>,
    pub procs: Vec<ProcId>,
    pub periphs: Vec<PeriphId>,
}

/// Physical segment.
#[derive(Debug, Clone)]
pub struct Pseg {
    pub index: PsegId,
    /// Unique within the owning cluster.
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub kind: PsegType,
    pub cluster: ClusterId,
    pub x: u32,
    pub y: u32,
}

/// Processor.
#[derive(Debug, Clone)]
pub struct Proc {
    pub index: ProcId,
    pub cluster: ClusterId,
    pub x: u32,
    pub y: u32,
    pub lpid: u32,
}

/// Peripheral and the physical segment it decodes.
#[derive(Debug, Clone)]
pub struct Periph {
    pub index: PeriphId,
    pub pseg: PsegId,
    pub cluster: ClusterId,
    pub ptype: PeriphType,
    pub subtype: PeriphSubtype,
    pub channels: u32,
    /// Type-specific arguments (frame buffer size, XCU line counts, ...).
    pub args: [u32; 4],
    /// Input lines, only populated on XCU and PIC controllers.
    pub irqs: Vec<IrqId>,
}

/// Interrupt line wired into a controller input port.
#[derive(Debug, Clone)]
pub struct Irq {
    pub index: IrqId,
    /// Controller owning the input port.
    pub controller: PeriphId,
    /// Peripheral raising the interrupt.
    pub source: PeriphId,
    pub kind: IrqType,
    /// Input port on the controller.
    pub port: u32,
    pub isr: IsrType,
    pub channel: u32,
}

/// Owner of a virtual segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VsegOwner {
    /// Kernel-wide segment, mapped in every vspace.
    Global,
    Vspace(VspaceId),
}

/// Virtual segment.
#[derive(Debug, Clone)]
pub struct Vseg {
    pub index: VsegId,
    pub owner: VsegOwner,
    pub name: String,
    pub vbase: u32,
    pub length: u32,
    pub mode: VsegMode,
    pub kind: VsegType,
    /// Destination cluster.
    pub x: u32,
    pub y: u32,
    /// Name of the destination pseg in cluster `(x, y)`.
    pub psegname: String,
    pub identity: bool,
    /// Only mapped in the page table of the destination cluster.
    pub local: bool,
    /// Mapped in big (2 MiB) pages.
    pub big: bool,
    pub binpath: String,
}

/// Virtual address space of one application.
#[derive(Debug, Clone)]
pub struct Vspace {
    pub index: VspaceId,
    pub name: String,
    /// Name of the vseg holding the start vector.
    pub startname: String,
    pub active: bool,
    pub vsegs: Vec<VsegId>,
    pub tasks: Vec<TaskId>,
}

/// Thread placed on a processor.
#[derive(Debug, Clone)]
pub struct Task {
    pub index: TaskId,
    pub vspace: VspaceId,
    pub name: String,
    /// Thread index, unique in the vspace.
    pub trdid: u32,
    pub x: u32,
    pub y: u32,
    pub lpid: u32,
    pub stackname: String,
    /// Empty when the task has no heap.
    pub heapname: String,
    /// Slot in the start vector.
    pub startid: u32,
}

/// Arguments of a peripheral registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriphDesc {
    pub ptype: PeriphType,
    pub subtype: PeriphSubtype,
    pub channels: u32,
    pub args: [u32; 4],
}

impl PeriphDesc {
    /// Single channel, no subtype, zero arguments.
    pub fn new(ptype: PeriphType) -> Self {
        Self {
            ptype,
            subtype: PeriphSubtype::None,
            channels: 1,
            args: [0; 4],
        }
    }

    pub fn subtype(mut self, subtype: PeriphSubtype) -> Self {
        self.subtype = subtype;
        self
    }

    pub fn channels(mut self, channels: u32) -> Self {
        self.channels = channels;
        self
    }

    pub fn args(mut self, args: [u32; 4]) -> Self {
        self.args = args;
        self
    }
}

/// Arguments of a global or private vseg registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VsegDesc {
    pub name: String,
    pub vbase: u64,
    pub length: u64,
    pub mode: VsegMode,
    pub kind: VsegType,
    pub x: u32,
    pub y: u32,
    pub pseg: String,
    pub identity: bool,
    pub local: bool,
    pub big: bool,
    pub binpath: String,
}

impl VsegDesc {
    /// A vseg placed in pseg `RAM` of cluster (0,0) until [`VsegDesc::on`]
    /// says otherwise.
    pub fn new(
        name: impl Into<String>,
        vbase: u64,
        length: u64,
        mode: VsegMode,
        kind: VsegType,
    ) -> Self {
        Self {
            name: name.into(),
            vbase,
            length,
            mode,
            kind,
            x: 0,
            y: 0,
            pseg: "RAM".to_string(),
            identity: false,
            local: false,
            big: false,
            binpath: String::new(),
        }
    }

    /// Destination cluster and pseg.
    pub fn on(mut self, x: u32, y: u32, pseg: impl Into<String>) -> Self {
        self.x = x;
        self.y = y;
        self.pseg = pseg.into();
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    pub fn big(mut self) -> Self {
        self.big = true;
        self
    }

    pub fn binpath(mut self, path: impl Into<String>) -> Self {
        self.binpath = path.into();
        self
    }
}

/// Arguments of a task registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDesc {
    pub name: String,
    pub trdid: u32,
    pub x: u32,
    pub y: u32,
    pub lpid: u32,
    pub stackname: String,
    pub heapname: String,
    pub startid: u32,
}

impl TaskDesc {
    pub fn new(name: impl Into<String>, trdid: u32) -> Self {
        Self {
            name: name.into(),
            trdid,
            x: 0,
            y: 0,
            lpid: 0,
            stackname: String::new(),
            heapname: String::new(),
            startid: 0,
        }
    }

    /// Destination processor.
    pub fn on(mut self, x: u32, y: u32, lpid: u32) -> Self {
        self.x = x;
        self.y = y;
        self.lpid = lpid;
        self
    }

    pub fn stack(mut self, name: impl Into<String>) -> Self {
        self.stackname = name.into();
        self
    }

    pub fn heap(mut self, name: impl Into<String>) -> Self {
        self.heapname = name.into();
        self
    }

    pub fn startid(mut self, startid: u32) -> Self {
        self.startid = startid;
        self
    }
}
