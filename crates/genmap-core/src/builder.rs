//! Construction API for mappings.
//!
//! The `MappingBuilder` is the only way to create entities. Every `add_*`
//! call validates its arguments, appends the entity to its owner and stamps
//! it with the next global index of its family. [`MappingBuilder::build`]
//! consumes the builder, so nothing can be added once artifacts are being
//! generated.
//!
//! # Example
//!
//! ```rust
//! use genmap_core::builder::MappingBuilder;
//! use genmap_core::entity::{PeriphDesc, TaskDesc, VsegDesc};
//! use genmap_core::kinds::{IsrType, PeriphType, VsegMode, VsegType};
//! use genmap_core::mapping::PlatformParams;
//!
//! let mut params = PlatformParams::new("demo", 1, 1, 1);
//! params.ram_size = 0x100_0000;
//! let mut builder = MappingBuilder::new(params).unwrap();
//!
//! builder.add_ram("RAM", 0x0, 0x100_0000).unwrap();
//! let xcu = builder
//!     .add_periph("XCU", 0xB000_0000, 0x1000, PeriphDesc::new(PeriphType::Xcu))
//!     .unwrap();
//! let tty = builder
//!     .add_periph("TTY", 0xB400_0000, 0x1000, PeriphDesc::new(PeriphType::Tty))
//!     .unwrap();
//! builder.add_irq(xcu, 16, tty, IsrType::TtyRx, 0).unwrap();
//! builder.add_proc(0, 0, 0).unwrap();
//!
//! let app = builder.add_vspace("app", "app_data", true);
//! builder
//!     .add_vseg(app, VsegDesc::new("app_data", 0x1000_0000, 0x1000, VsegMode::C_WU, VsegType::Elf)
//!         .binpath("bin/app.elf"))
//!     .unwrap();
//! builder
//!     .add_vseg(app, VsegDesc::new("app_stack", 0x4000_0000, 0x1000, VsegMode::C_WU, VsegType::Buffer))
//!     .unwrap();
//! builder
//!     .add_task(app, TaskDesc::new("main", 0).stack("app_stack"))
//!     .unwrap();
//!
//! let mapping = builder.build();
//! assert_eq!(mapping.totals().tasks, 1);
//! ```

use tracing::debug;

use crate::entity::{
    Irq, IrqId, Periph, PeriphDesc, PeriphId, Proc, ProcId, Pseg, PsegId, Task, TaskDesc, TaskId,
    Vseg, VsegDesc, VsegId, VsegOwner, Vspace, VspaceId,
};
use crate::error::{MappingError, Result};
use crate::geometry::PAGE_OFFSET_MASK;
use crate::kinds::{IrqType, IsrType, PeriphType, PsegType, VsegType};
use crate::mapping::{Mapping, PlatformParams};

/// Largest irq input port index on a controller.
pub const MAX_IRQ_PORT: u32 = 31;

/// Global vsegs whose names agree on this many leading characters may
/// overlap (multi-part segments sharing a base name).
pub const OVERLAP_PREFIX_LEN: usize = 15;

/// Incrementally builds a [`Mapping`].
pub struct MappingBuilder {
    mapping: Mapping,
    /// Interrupt controller recorded for each peripheral, by periph index.
    controllers: Vec<Option<PeriphId>>,
}

impl MappingBuilder {
    /// Validate the platform parameters and create every cluster of the
    /// grid, in row-major order.
    pub fn new(params: PlatformParams) -> Result<Self> {
        params.validate()?;
        debug!(
            name = %params.name,
            x_size = params.x_size,
            y_size = params.y_size,
            nprocs = params.nprocs,
            "new mapping"
        );
        Ok(Self {
            mapping: Mapping::empty(params),
            controllers: Vec::new(),
        })
    }

    pub fn params(&self) -> &PlatformParams {
        &self.mapping.params
    }

    /// Read-only view of the mapping built so far.
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Number of processors already added to cluster `(x, y)`.
    pub fn procs_in(&self, x: u32, y: u32) -> usize {
        self.mapping.cluster(x, y).map_or(0, |c| c.procs.len())
    }

    /// Append a suffix to the mapping name.
    pub fn append_to_name(&mut self, suffix: &str) {
        self.mapping.params.name.push_str(suffix);
    }

    /// Add a RAM pseg. The cluster is derived from `base`, whose local
    /// offset and `size` must match the platform's per-cluster RAM.
    pub fn add_ram(&mut self, name: &str, base: u64, size: u64) -> Result<PsegId> {
        let what = format!("RAM pseg {name}");
        if base & PAGE_OFFSET_MASK != 0 {
            return Err(MappingError::Misaligned { what, addr: base });
        }
        let (x, y) = self.mapping.geometry().decode(base);
        self.check_cluster(&what, x, y)?;

        let offset = self.mapping.geometry().local_offset(base);
        let params = &self.mapping.params;
        if offset != params.ram_base {
            return Err(MappingError::RamMismatch {
                name: name.to_string(),
                detail: format!(
                    "local base {offset:#x} differs from platform ram_base {:#x}",
                    params.ram_base
                ),
            });
        }
        if size != params.ram_size {
            return Err(MappingError::RamMismatch {
                name: name.to_string(),
                detail: format!(
                    "size {size:#x} differs from platform ram_size {:#x}",
                    params.ram_size
                ),
            });
        }

        self.push_pseg(name, base, size, PsegType::Ram, x, y)
    }

    /// Add a peripheral and the PERI pseg it decodes. The cluster is derived
    /// from `base`.
    pub fn add_periph(
        &mut self,
        name: &str,
        base: u64,
        size: u64,
        desc: PeriphDesc,
    ) -> Result<PeriphId> {
        let what = format!("peripheral {name}");
        let (x, y) = self.mapping.geometry().decode(base);
        self.check_cluster(&what, x, y)?;
        if base & PAGE_OFFSET_MASK != 0 {
            return Err(MappingError::Misaligned { what, addr: base });
        }
        if !desc.subtype.fits(desc.ptype) {
            return Err(MappingError::InvalidSubtype {
                name: name.to_string(),
                ptype: desc.ptype,
                subtype: desc.subtype.name().to_string(),
            });
        }

        let pseg = self.push_pseg(name, base, size, PsegType::Peri, x, y)?;
        let cluster = self.mapping.psegs[pseg.slot()].cluster;
        let id = PeriphId::new(self.mapping.periphs.len() as u32);
        self.mapping.periphs.push(Periph {
            index: id,
            pseg,
            cluster,
            ptype: desc.ptype,
            subtype: desc.subtype,
            channels: desc.channels,
            args: desc.args,
            irqs: Vec::new(),
        });
        self.mapping.clusters[cluster.slot()].periphs.push(id);
        self.controllers.push(None);
        debug!(periph = %id, ptype = %desc.ptype, subtype = %desc.subtype, x, y, "add periph");
        Ok(id)
    }

    /// Wire input `port` of controller `ctrl` to peripheral `src`.
    ///
    /// The first controller wired to a source becomes its controller; a
    /// second, different one is rejected.
    pub fn add_irq(
        &mut self,
        ctrl: PeriphId,
        port: u32,
        src: PeriphId,
        isr: IsrType,
        channel: u32,
    ) -> Result<IrqId> {
        self.check_periph(ctrl)?;
        self.check_periph(src)?;
        let controller = &self.mapping.periphs[ctrl.slot()];
        if !matches!(controller.ptype, PeriphType::Xcu | PeriphType::Pic) {
            return Err(MappingError::NotInterruptController {
                name: self.periph_name(ctrl),
                ptype: controller.ptype,
            });
        }
        if port > MAX_IRQ_PORT {
            return Err(MappingError::PortOutOfRange { port });
        }

        let recorded = self.controllers[src.slot()];
        match recorded {
            None => self.controllers[src.slot()] = Some(ctrl),
            Some(first) if first != ctrl => {
                return Err(MappingError::ControllerConflict {
                    source_name: self.periph_name(src),
                    first: self.periph_name(first),
                    second: self.periph_name(ctrl),
                });
            }
            Some(_) => {}
        }

        let id = IrqId::new(self.mapping.irqs.len() as u32);
        self.mapping.irqs.push(Irq {
            index: id,
            controller: ctrl,
            source: src,
            kind: IrqType::Hwi,
            port,
            isr,
            channel,
        });
        self.mapping.periphs[ctrl.slot()].irqs.push(id);
        debug!(irq = %id, port, isr = %isr, channel, "add irq");
        Ok(id)
    }

    /// Add processor `lpid` to cluster `(x, y)`.
    pub fn add_proc(&mut self, x: u32, y: u32, lpid: u32) -> Result<ProcId> {
        let what = format!("proc {lpid}");
        self.check_cluster(&what, x, y)?;
        self.check_lpid(&what, lpid)?;
        let cluster = self.cluster_id(x, y);
        let id = ProcId::new(self.mapping.procs.len() as u32);
        self.mapping.procs.push(Proc {
            index: id,
            cluster,
            x,
            y,
            lpid,
        });
        self.mapping.clusters[cluster.slot()].procs.push(id);
        Ok(id)
    }

    /// Add a kernel-wide vseg.
    ///
    /// Two globals may not overlap unless their names share the first
    /// [`OVERLAP_PREFIX_LEN`] characters.
    pub fn add_global(&mut self, desc: VsegDesc) -> Result<VsegId> {
        self.check_vseg(&desc)?;
        for prev in self.mapping.globals() {
            let prev_base = u64::from(prev.vbase);
            let prev_length = u64::from(prev.length);
            let overlap = prev_base + prev_length > desc.vbase && desc.vbase + desc.length > prev_base;
            if overlap && !same_prefix(&prev.name, &desc.name) {
                return Err(MappingError::GlobalOverlap {
                    name: desc.name,
                    base: desc.vbase,
                    length: desc.length,
                    other: prev.name.clone(),
                    other_base: prev_base,
                    other_length: prev_length,
                });
            }
        }
        check_sibling_names(self.mapping.globals(), &desc, "globals")?;

        let id = self.push_vseg(desc, VsegOwner::Global);
        self.mapping.globals.push(id);
        Ok(id)
    }

    /// Add an application vspace.
    pub fn add_vspace(&mut self, name: &str, startname: &str, active: bool) -> VspaceId {
        let id = VspaceId::new(self.mapping.vspaces.len() as u32);
        self.mapping.vspaces.push(Vspace {
            index: id,
            name: name.to_string(),
            startname: startname.to_string(),
            active,
            vsegs: Vec::new(),
            tasks: Vec::new(),
        });
        debug!(vspace = %id, name, "add vspace");
        id
    }

    /// Add a vseg private to `vspace`. Private vsegs are never identity
    /// mapped.
    pub fn add_vseg(&mut self, vspace: VspaceId, desc: VsegDesc) -> Result<VsegId> {
        self.check_vspace(vspace)?;
        if desc.identity {
            return Err(MappingError::IdentityNotAllowed { name: desc.name });
        }
        self.check_vseg(&desc)?;
        let owner = &self.mapping.vspaces[vspace.slot()];
        check_sibling_names(
            self.mapping.vspace_vsegs(owner),
            &desc,
            &format!("vspace {}", owner.name),
        )?;

        let id = self.push_vseg(desc, VsegOwner::Vspace(vspace));
        self.mapping.vspaces[vspace.slot()].vsegs.push(id);
        Ok(id)
    }

    /// Add a task to `vspace`.
    pub fn add_task(&mut self, vspace: VspaceId, desc: TaskDesc) -> Result<TaskId> {
        self.check_vspace(vspace)?;
        let what = format!("task {}", desc.name);
        self.check_cluster(&what, desc.x, desc.y)?;
        self.check_lpid(&what, desc.lpid)?;
        let owner = &self.mapping.vspaces[vspace.slot()];
        if self.mapping.vspace_tasks(owner).any(|t| t.trdid == desc.trdid) {
            return Err(MappingError::DuplicateThreadId {
                vspace: owner.name.clone(),
                trdid: desc.trdid,
            });
        }

        let id = TaskId::new(self.mapping.tasks.len() as u32);
        debug!(task = %id, name = %desc.name, trdid = desc.trdid, "add task");
        self.mapping.tasks.push(Task {
            index: id,
            vspace,
            name: desc.name,
            trdid: desc.trdid,
            x: desc.x,
            y: desc.y,
            lpid: desc.lpid,
            stackname: desc.stackname,
            heapname: desc.heapname,
            startid: desc.startid,
        });
        self.mapping.vspaces[vspace.slot()].tasks.push(id);
        Ok(id)
    }

    /// Finish construction.
    pub fn build(self) -> Mapping {
        let totals = self.mapping.totals();
        tracing::info!(
            name = %self.mapping.params.name,
            psegs = totals.psegs,
            periphs = totals.periphs,
            vspaces = totals.vspaces,
            vsegs = totals.vsegs,
            tasks = totals.tasks,
            "mapping complete"
        );
        self.mapping
    }

    fn cluster_id(&self, x: u32, y: u32) -> crate::entity::ClusterId {
        self.mapping.clusters[self.mapping.params.cluster_index(x, y) as usize].index
    }

    fn check_cluster(&self, what: &str, x: u32, y: u32) -> Result<()> {
        let params = &self.mapping.params;
        if x >= params.x_size || y >= params.y_size {
            return Err(MappingError::ClusterOutOfRange {
                what: what.to_string(),
                x,
                y,
                x_size: params.x_size,
                y_size: params.y_size,
            });
        }
        Ok(())
    }

    fn check_lpid(&self, what: &str, lpid: u32) -> Result<()> {
        let nprocs = self.mapping.params.nprocs;
        if lpid >= nprocs {
            return Err(MappingError::LpidOutOfRange {
                what: what.to_string(),
                lpid,
                nprocs,
            });
        }
        Ok(())
    }

    fn check_periph(&self, id: PeriphId) -> Result<()> {
        if id.slot() >= self.mapping.periphs.len() {
            return Err(MappingError::UnknownHandle {
                family: "periph",
                index: id.index(),
            });
        }
        Ok(())
    }

    fn check_vspace(&self, id: VspaceId) -> Result<()> {
        if id.slot() >= self.mapping.vspaces.len() {
            return Err(MappingError::UnknownHandle {
                family: "vspace",
                index: id.index(),
            });
        }
        Ok(())
    }

    fn check_vseg(&self, desc: &VsegDesc) -> Result<()> {
        let what = format!("vseg {}", desc.name);
        if desc.vbase > u64::from(u32::MAX) {
            return Err(MappingError::AddressOutOfRange {
                what,
                field: "vbase",
                value: desc.vbase,
            });
        }
        if desc.length > u64::from(u32::MAX) {
            return Err(MappingError::AddressOutOfRange {
                what,
                field: "length",
                value: desc.length,
            });
        }
        if desc.kind == VsegType::Elf && desc.binpath.is_empty() {
            return Err(MappingError::MissingBinpath {
                name: desc.name.clone(),
            });
        }
        self.check_cluster(&what, desc.x, desc.y)
    }

    fn periph_name(&self, id: PeriphId) -> String {
        let periph = &self.mapping.periphs[id.slot()];
        self.mapping.psegs[periph.pseg.slot()].name.clone()
    }

    fn push_pseg(
        &mut self,
        name: &str,
        base: u64,
        size: u64,
        kind: PsegType,
        x: u32,
        y: u32,
    ) -> Result<PsegId> {
        let cluster = self.cluster_id(x, y);
        let owner = &self.mapping.clusters[cluster.slot()];
        if self.mapping.cluster_psegs(owner).any(|p| p.name == name) {
            return Err(MappingError::DuplicateName {
                family: "pseg",
                name: name.to_string(),
                owner: format!("cluster[{x},{y}]"),
            });
        }

        let id = PsegId::new(self.mapping.psegs.len() as u32);
        self.mapping.psegs.push(Pseg {
            index: id,
            name: name.to_string(),
            base,
            size,
            kind,
            cluster,
            x,
            y,
        });
        self.mapping.clusters[cluster.slot()].psegs.push(id);
        debug!(pseg = %id, name, base, size, %kind, "add pseg");
        Ok(id)
    }

    fn push_vseg(&mut self, desc: VsegDesc, owner: VsegOwner) -> VsegId {
        let id = VsegId::new(self.mapping.vsegs.len() as u32);
        debug!(vseg = %id, name = %desc.name, vbase = desc.vbase, "add vseg");
        self.mapping.vsegs.push(Vseg {
            index: id,
            owner,
            name: desc.name,
            // Range checked by check_vseg.
            vbase: desc.vbase as u32,
            length: desc.length as u32,
            mode: desc.mode,
            kind: desc.kind,
            x: desc.x,
            y: desc.y,
            psegname: desc.pseg,
            identity: desc.identity,
            local: desc.local,
            big: desc.big,
            binpath: desc.binpath,
        });
        id
    }
}

fn same_prefix(a: &str, b: &str) -> bool {
    a.chars()
        .take(OVERLAP_PREFIX_LEN)
        .eq(b.chars().take(OVERLAP_PREFIX_LEN))
}

/// Sibling vsegs need distinct names, except for replicated copies where
/// every copy is local to its cluster.
fn check_sibling_names<'a>(
    siblings: impl Iterator<Item = &'a Vseg>,
    desc: &VsegDesc,
    owner: &str,
) -> Result<()> {
    for prev in siblings {
        if prev.name == desc.name && !(prev.local && desc.local) {
            return Err(MappingError::DuplicateName {
                family: "vseg",
                name: desc.name.clone(),
                owner: owner.to_string(),
            });
        }
    }
    Ok(())
}
