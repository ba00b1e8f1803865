//! Name- and wiring-based cross references, resolved at emission time.
//!
//! Entities refer to each other by name (a vseg names its pseg, a task its
//! stack and heap, a vspace its start vector). The `Resolver` turns those
//! names into global indices on demand and never caches results on the
//! entities. When several entities share a name the most recently added
//! one wins.

use crate::entity::{Cluster, ClusterId, Periph, PeriphId, PsegId, Task, Vseg, VsegId, Vspace};
use crate::error::{MappingError, Result};
use crate::kinds::{IsrType, PeriphType};
use crate::mapping::Mapping;

/// Read-only lookups over a finished mapping.
pub struct Resolver<'m> {
    mapping: &'m Mapping,
    /// Interrupt controller of each peripheral, by periph index.
    controllers: Vec<Option<PeriphId>>,
}

impl<'m> Resolver<'m> {
    /// Derive the peripheral to controller relation from the irq list.
    pub fn new(mapping: &'m Mapping) -> Result<Self> {
        let mut controllers = vec![None; mapping.periphs.len()];
        for irq in &mapping.irqs {
            let recorded = controllers[irq.source.slot()];
            match recorded {
                None => controllers[irq.source.slot()] = Some(irq.controller),
                Some(first) if first != irq.controller => {
                    return Err(MappingError::ControllerConflict {
                        source_name: periph_name(mapping, irq.source),
                        first: periph_name(mapping, first),
                        second: periph_name(mapping, irq.controller),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(Self {
            mapping,
            controllers,
        })
    }

    pub fn mapping(&self) -> &'m Mapping {
        self.mapping
    }

    /// Pseg named by `vseg` in its destination cluster.
    pub fn vseg_pseg(&self, vseg: &Vseg) -> Result<PsegId> {
        let unresolved = || MappingError::UnresolvedName {
            family: "pseg",
            name: vseg.psegname.clone(),
            referrer: format!("vseg {}", vseg.name),
            scope: format!("cluster[{},{}]", vseg.x, vseg.y),
        };
        let cluster = self.mapping.cluster(vseg.x, vseg.y).ok_or_else(unresolved)?;
        self.mapping
            .cluster_psegs(cluster)
            .filter(|p| p.name == vseg.psegname)
            .last()
            .map(|p| p.index)
            .ok_or_else(unresolved)
    }

    /// Vseg named `name` among the vsegs of `vspace`.
    pub fn vspace_vseg(&self, vspace: &Vspace, name: &str, referrer: &str) -> Result<VsegId> {
        self.mapping
            .vspace_vsegs(vspace)
            .filter(|v| v.name == name)
            .last()
            .map(|v| v.index)
            .ok_or_else(|| MappingError::UnresolvedName {
                family: "vseg",
                name: name.to_string(),
                referrer: referrer.to_string(),
                scope: format!("vspace {}", vspace.name),
            })
    }

    /// Vseg holding the stack of `task`.
    pub fn task_stack(&self, task: &Task) -> Result<VsegId> {
        let vspace = self.mapping.vspace(task.vspace);
        self.vspace_vseg(vspace, &task.stackname, &format!("task {}", task.name))
    }

    /// Vseg holding the heap of `task`; `None` when the task has no heap.
    pub fn task_heap(&self, task: &Task) -> Result<Option<VsegId>> {
        if task.heapname.is_empty() {
            return Ok(None);
        }
        let vspace = self.mapping.vspace(task.vspace);
        self.vspace_vseg(vspace, &task.heapname, &format!("task {}", task.name))
            .map(Some)
    }

    /// Vseg holding the start vector of `vspace`.
    pub fn vspace_start(&self, vspace: &Vspace) -> Result<VsegId> {
        self.vspace_vseg(vspace, &vspace.startname, &format!("vspace {}", vspace.name))
    }

    /// Cluster a task runs in.
    pub fn task_cluster(&self, task: &Task) -> ClusterId {
        ClusterId::new(self.mapping.params.cluster_index(task.x, task.y))
    }

    /// Interrupt controller wired to `periph`, if any.
    pub fn controller_of(&self, periph: PeriphId) -> Option<PeriphId> {
        self.controllers.get(periph.slot()).copied().flatten()
    }

    /// Like [`Resolver::controller_of`], failing with a diagnostic naming
    /// the peripheral.
    pub fn require_controller(&self, periph: &Periph) -> Result<&'m Periph> {
        self.controller_of(periph.index)
            .map(|id| self.mapping.periph(id))
            .ok_or_else(|| MappingError::UnresolvedName {
                family: "interrupt controller",
                name: self.mapping.pseg(periph.pseg).name.clone(),
                referrer: format!("{} peripheral", periph.ptype),
                scope: "irq wiring".to_string(),
            })
    }

    /// Input port of `ctrl` wired to `isr` (and `channel`, when given).
    pub fn isr_source(&self, ctrl: &Periph, isr: IsrType, channel: Option<u32>) -> Option<u32> {
        self.mapping
            .periph_irqs(ctrl)
            .filter(|irq| irq.isr == isr && channel.map_or(true, |c| irq.channel == c))
            .last()
            .map(|irq| irq.port)
    }

    /// Last peripheral of type `ptype` in `cluster`.
    pub fn cluster_periph(&self, cluster: &Cluster, ptype: PeriphType) -> Option<&'m Periph> {
        let mapping = self.mapping;
        cluster
            .periphs
            .iter()
            .map(|&id| mapping.periph(id))
            .filter(|p| p.ptype == ptype)
            .last()
    }

    /// `name@0x<base>` label of a peripheral's pseg, as used by device trees.
    pub fn periph_label(&self, periph: &Periph) -> String {
        let pseg = self.mapping.pseg(periph.pseg);
        format!("{}@0x{:x}", pseg.name, pseg.base)
    }
}

fn periph_name(mapping: &Mapping, id: PeriphId) -> String {
    mapping.pseg(mapping.periph(id).pseg).name.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MappingBuilder;
    use crate::entity::{PeriphDesc, TaskDesc, VsegDesc};
    use crate::error::ErrorClass;
    use crate::kinds::{VsegMode, VsegType};
    use crate::mapping::PlatformParams;

    fn buffer(name: &str, vbase: u64) -> VsegDesc {
        VsegDesc::new(name, vbase, 0x1000, VsegMode::C_WU, VsegType::Buffer)
    }

    fn sample() -> Mapping {
        let mut params = PlatformParams::new("res", 1, 2, 1);
        params.ram_size = 0x10_0000;
        let mut b = MappingBuilder::new(params).unwrap();
        b.add_ram("RAM", 0, 0x10_0000).unwrap();
        let xcu = b
            .add_periph("XCU", 0xB000_0000, 0x1000, PeriphDesc::new(PeriphType::Xcu))
            .unwrap();
        let tty = b
            .add_periph(
                "TTY",
                0xB400_0000,
                0x1000,
                PeriphDesc::new(PeriphType::Tty).channels(2),
            )
            .unwrap();
        b.add_irq(xcu, 16, tty, IsrType::TtyRx, 0).unwrap();
        b.add_irq(xcu, 17, tty, IsrType::TtyRx, 1).unwrap();
        b.add_periph("ROM", 0xBFC0_0000, 0x1000, PeriphDesc::new(PeriphType::Rom))
            .unwrap();
        b.add_proc(0, 0, 0).unwrap();

        let app = b.add_vspace("app", "app_stack", true);
        b.add_vseg(app, buffer("app_stack", 0x4000_0000)).unwrap();
        b.add_vseg(app, buffer("app_heap", 0x6000_0000)).unwrap();
        b.add_vseg(app, buffer("app_lost", 0x7000_0000).on(0, 1, "RAM"))
            .unwrap();
        b.add_task(app, TaskDesc::new("with_heap", 0).stack("app_stack").heap("app_heap"))
            .unwrap();
        b.add_task(app, TaskDesc::new("no_heap", 1).stack("app_stack"))
            .unwrap();
        b.add_task(app, TaskDesc::new("bad_stack", 2).stack("missing"))
            .unwrap();
        b.build()
    }

    #[test]
    fn resolves_names() {
        let mapping = sample();
        let resolver = Resolver::new(&mapping).unwrap();
        let vspace = &mapping.vspaces()[0];
        let tasks: Vec<_> = mapping.vspace_tasks(vspace).collect();

        assert_eq!(resolver.vspace_start(vspace).unwrap().index(), 0);
        assert_eq!(resolver.task_stack(tasks[0]).unwrap().index(), 0);
        assert_eq!(resolver.task_heap(tasks[0]).unwrap().map(|v| v.index()), Some(1));
        assert_eq!(resolver.task_heap(tasks[1]).unwrap(), None);
        assert_eq!(resolver.task_cluster(tasks[0]).index(), 0);

        let stack = mapping.vseg(resolver.task_stack(tasks[0]).unwrap());
        assert_eq!(resolver.vseg_pseg(stack).unwrap().index(), 0);
    }

    #[test]
    fn unresolved_names_identify_referrer() {
        let mapping = sample();
        let resolver = Resolver::new(&mapping).unwrap();
        let vspace = &mapping.vspaces()[0];
        let tasks: Vec<_> = mapping.vspace_tasks(vspace).collect();

        let err = resolver.task_stack(tasks[2]).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Resolution);
        let msg = err.to_string();
        assert!(msg.contains("missing") && msg.contains("bad_stack") && msg.contains("app"));

        // Cluster (0,1) has no RAM pseg.
        let lost = mapping.vspace_vsegs(vspace).last().unwrap();
        let err = resolver.vseg_pseg(lost).unwrap_err();
        assert!(err.to_string().contains("cluster[0,1]"));
    }

    #[test]
    fn isr_lookup_and_controllers() {
        let mapping = sample();
        let resolver = Resolver::new(&mapping).unwrap();
        let cluster = mapping.cluster(0, 0).unwrap();
        let xcu = resolver.cluster_periph(cluster, PeriphType::Xcu).unwrap();
        let tty = resolver.cluster_periph(cluster, PeriphType::Tty).unwrap();
        let rom = resolver.cluster_periph(cluster, PeriphType::Rom).unwrap();

        assert_eq!(resolver.controller_of(tty.index), Some(xcu.index));
        assert_eq!(resolver.controller_of(rom.index), None);
        assert!(resolver.require_controller(rom).is_err());

        assert_eq!(resolver.isr_source(xcu, IsrType::TtyRx, Some(1)), Some(17));
        assert_eq!(resolver.isr_source(xcu, IsrType::TtyRx, None), Some(17));
        assert_eq!(resolver.isr_source(xcu, IsrType::Bdv, None), None);
        assert_eq!(resolver.periph_label(xcu), "XCU@0xb0000000");
    }
}
