//! The finished, read-only mapping and its platform parameters.

use serde::{Deserialize, Serialize};

use crate::entity::{
    Cluster, ClusterId, Irq, IrqId, Periph, PeriphId, Proc, ProcId, Pseg, PsegId, Task, TaskId,
    Vseg, VsegId, Vspace, VspaceId,
};
use crate::error::{MappingError, Result};
use crate::geometry::{AddressGeometry, PADDR_WIDTH, P_WIDTH, X_WIDTH, Y_WIDTH};

/// Magic number at the head of a binary descriptor.
pub const MAPPING_SIGNATURE: u32 = 0xDACE_2014;
/// Virtual address stride between replicated peripheral vsegs.
pub const PERI_INCREMENT: u32 = 0x10000;
/// Wired processor boot address.
pub const RESET_ADDRESS: u32 = 0xBFC0_0000;

/// Platform-wide parameters of a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformParams {
    pub name: String,
    /// Clusters in a row.
    pub x_size: u32,
    /// Clusters in a column.
    pub y_size: u32,
    /// Maximum processors per cluster.
    pub nprocs: u32,
    #[serde(default = "default_x_width")]
    pub x_width: u32,
    #[serde(default = "default_y_width")]
    pub y_width: u32,
    #[serde(default = "default_p_width")]
    pub p_width: u32,
    #[serde(default = "default_paddr_width")]
    pub paddr_width: u32,
    /// Hardware cache coherence when non-zero.
    #[serde(default = "default_one")]
    pub coherence: u32,
    /// Interrupt lines from the XCU to each processor.
    #[serde(default = "default_one")]
    pub irq_per_proc: u32,
    #[serde(default)]
    pub use_ramdisk: bool,
    #[serde(default)]
    pub x_io: u32,
    #[serde(default)]
    pub y_io: u32,
    #[serde(default = "default_peri_increment")]
    pub peri_increment: u32,
    #[serde(default = "default_reset_address")]
    pub reset_address: u32,
    /// RAM offset inside every cluster.
    #[serde(default)]
    pub ram_base: u64,
    /// RAM size per cluster.
    #[serde(default)]
    pub ram_size: u64,
}

fn default_x_width() -> u32 {
    X_WIDTH
}

fn default_y_width() -> u32 {
    Y_WIDTH
}

fn default_p_width() -> u32 {
    P_WIDTH
}

fn default_paddr_width() -> u32 {
    PADDR_WIDTH
}

fn default_one() -> u32 {
    1
}

fn default_peri_increment() -> u32 {
    PERI_INCREMENT
}

fn default_reset_address() -> u32 {
    RESET_ADDRESS
}

impl PlatformParams {
    /// Parameters with default widths and no RAM.
    pub fn new(name: impl Into<String>, x_size: u32, y_size: u32, nprocs: u32) -> Self {
        Self {
            name: name.into(),
            x_size,
            y_size,
            nprocs,
            x_width: X_WIDTH,
            y_width: Y_WIDTH,
            p_width: P_WIDTH,
            paddr_width: PADDR_WIDTH,
            coherence: 1,
            irq_per_proc: 1,
            use_ramdisk: false,
            x_io: 0,
            y_io: 0,
            peri_increment: PERI_INCREMENT,
            reset_address: RESET_ADDRESS,
            ram_base: 0,
            ram_size: 0,
        }
    }

    pub fn geometry(&self) -> AddressGeometry {
        AddressGeometry {
            paddr_width: self.paddr_width,
            x_width: self.x_width,
            y_width: self.y_width,
            p_width: self.p_width,
        }
    }

    /// Row-major cluster index, `x * y_size + y`.
    pub fn cluster_index(&self, x: u32, y: u32) -> u32 {
        x * self.y_size + y
    }

    pub fn validate(&self) -> Result<()> {
        let geom = self.geometry();
        geom.validate()?;
        if self.x_size == 0 || self.y_size == 0 || self.nprocs == 0 {
            return Err(MappingError::InvalidGeometry {
                detail: format!(
                    "empty platform ({}x{} clusters, {} procs)",
                    self.x_size, self.y_size, self.nprocs
                ),
            });
        }
        if u64::from(self.x_size) > 1u64 << self.x_width {
            return Err(MappingError::InvalidGeometry {
                detail: format!("x_size {} exceeds 2^{}", self.x_size, self.x_width),
            });
        }
        if u64::from(self.y_size) > 1u64 << self.y_width {
            return Err(MappingError::InvalidGeometry {
                detail: format!("y_size {} exceeds 2^{}", self.y_size, self.y_width),
            });
        }
        if u64::from(self.nprocs) > 1u64 << self.p_width {
            return Err(MappingError::InvalidGeometry {
                detail: format!("nprocs {} exceeds 2^{}", self.nprocs, self.p_width),
            });
        }
        if self.x_io >= self.x_size || self.y_io >= self.y_size {
            return Err(MappingError::ClusterOutOfRange {
                what: "I/O cluster".to_string(),
                x: self.x_io,
                y: self.y_io,
                x_size: self.x_size,
                y_size: self.y_size,
            });
        }
        Ok(())
    }
}

/// Entity counts per family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub globals: u32,
    pub vspaces: u32,
    pub psegs: u32,
    pub vsegs: u32,
    pub tasks: u32,
    pub procs: u32,
    pub irqs: u32,
    pub periphs: u32,
}

/// A complete platform and software mapping.
///
/// Produced by [`MappingBuilder::build`](crate::builder::MappingBuilder::build)
/// and never modified afterwards. Entities are stored in one arena per
/// family, indexed by their global index.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub(crate) params: PlatformParams,
    pub(crate) clusters: Vec<Cluster>,
    pub(crate) psegs: Vec<Pseg>,
    pub(crate) procs: Vec<Proc>,
    pub(crate) periphs: Vec<Periph>,
    pub(crate) irqs: Vec<Irq>,
    pub(crate) vspaces: Vec<Vspace>,
    pub(crate) vsegs: Vec<Vseg>,
    pub(crate) tasks: Vec<Task>,
    pub(crate) globals: Vec<VsegId>,
}

impl Mapping {
    pub(crate) fn empty(params: PlatformParams) -> Self {
        let mut clusters = Vec::with_capacity((params.x_size * params.y_size) as usize);
        for x in 0..params.x_size {
            for y in 0..params.y_size {
                clusters.push(Cluster {
                    index: ClusterId::new(params.cluster_index(x, y)),
                    x,
                    y,
                    psegs: Vec::new(),
                    procs: Vec::new(),
                    periphs: Vec::new(),
                });
            }
        }
        Self {
            params,
            clusters,
            psegs: Vec::new(),
            procs: Vec::new(),
            periphs: Vec::new(),
            irqs: Vec::new(),
            vspaces: Vec::new(),
            vsegs: Vec::new(),
            tasks: Vec::new(),
            globals: Vec::new(),
        }
    }

    pub fn params(&self) -> &PlatformParams {
        &self.params
    }

    pub fn name(&self) -> &str {
        &self.params.name
    }

    pub fn geometry(&self) -> AddressGeometry {
        self.params.geometry()
    }

    /// Clusters in row-major order.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Cluster at `(x, y)`, if inside the grid.
    pub fn cluster(&self, x: u32, y: u32) -> Option<&Cluster> {
        if x >= self.params.x_size || y >= self.params.y_size {
            return None;
        }
        self.clusters.get(self.params.cluster_index(x, y) as usize)
    }

    // Handle accessors index the arenas directly: handles are only minted
    // by the builder that produced this mapping.

    pub fn cluster_at(&self, id: ClusterId) -> &Cluster {
        &self.clusters[id.slot()]
    }

    pub fn pseg(&self, id: PsegId) -> &Pseg {
        &self.psegs[id.slot()]
    }

    pub fn proc(&self, id: ProcId) -> &Proc {
        &self.procs[id.slot()]
    }

    pub fn periph(&self, id: PeriphId) -> &Periph {
        &self.periphs[id.slot()]
    }

    pub fn irq(&self, id: IrqId) -> &Irq {
        &self.irqs[id.slot()]
    }

    pub fn vspace(&self, id: VspaceId) -> &Vspace {
        &self.vspaces[id.slot()]
    }

    pub fn vseg(&self, id: VsegId) -> &Vseg {
        &self.vsegs[id.slot()]
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.slot()]
    }

    /// Vspaces in creation order.
    pub fn vspaces(&self) -> &[Vspace] {
        &self.vspaces
    }

    /// Global vsegs in creation order.
    pub fn globals(&self) -> impl Iterator<Item = &Vseg> + '_ {
        self.globals.iter().map(|&id| self.vseg(id))
    }

    pub fn cluster_psegs<'a>(&'a self, cluster: &'a Cluster) -> impl Iterator<Item = &'a Pseg> + 'a {
        cluster.psegs.iter().map(|&id| self.pseg(id))
    }

    pub fn cluster_procs<'a>(&'a self, cluster: &'a Cluster) -> impl Iterator<Item = &'a Proc> + 'a {
        cluster.procs.iter().map(|&id| self.proc(id))
    }

    pub fn cluster_periphs<'a>(
        &'a self,
        cluster: &'a Cluster,
    ) -> impl Iterator<Item = &'a Periph> + 'a {
        cluster.periphs.iter().map(|&id| self.periph(id))
    }

    pub fn periph_irqs<'a>(&'a self, periph: &'a Periph) -> impl Iterator<Item = &'a Irq> + 'a {
        periph.irqs.iter().map(|&id| self.irq(id))
    }

    pub fn vspace_vsegs<'a>(&'a self, vspace: &'a Vspace) -> impl Iterator<Item = &'a Vseg> + 'a {
        vspace.vsegs.iter().map(|&id| self.vseg(id))
    }

    pub fn vspace_tasks<'a>(&'a self, vspace: &'a Vspace) -> impl Iterator<Item = &'a Task> + 'a {
        vspace.tasks.iter().map(|&id| self.task(id))
    }

    /// Psegs in binary order: cluster-major, then creation order.
    pub fn psegs_in_order(&self) -> impl Iterator<Item = &Pseg> + '_ {
        self.clusters.iter().flat_map(|c| self.cluster_psegs(c))
    }

    /// Procs in binary order: cluster-major, then creation order.
    pub fn procs_in_order(&self) -> impl Iterator<Item = &Proc> + '_ {
        self.clusters.iter().flat_map(|c| self.cluster_procs(c))
    }

    /// Peripherals in binary order: cluster-major, then creation order.
    pub fn periphs_in_order(&self) -> impl Iterator<Item = &Periph> + '_ {
        self.clusters.iter().flat_map(|c| self.cluster_periphs(c))
    }

    /// Irqs in binary order: grouped by controller, controllers in
    /// peripheral order.
    pub fn irqs_in_order(&self) -> impl Iterator<Item = &Irq> + '_ {
        self.periphs_in_order().flat_map(|p| self.periph_irqs(p))
    }

    /// Vsegs in binary order: globals first, then each vspace's own vsegs.
    pub fn vsegs_in_order(&self) -> impl Iterator<Item = &Vseg> + '_ {
        self.globals()
            .chain(self.vspaces.iter().flat_map(|v| self.vspace_vsegs(v)))
    }

    /// Tasks in binary order: grouped by vspace.
    pub fn tasks_in_order(&self) -> impl Iterator<Item = &Task> + '_ {
        self.vspaces.iter().flat_map(|v| self.vspace_tasks(v))
    }

    pub fn totals(&self) -> Totals {
        Totals {
            globals: self.globals.len() as u32,
            vspaces: self.vspaces.len() as u32,
            psegs: self.psegs.len() as u32,
            vsegs: self.vsegs.len() as u32,
            tasks: self.tasks.len() as u32,
            procs: self.procs.len() as u32,
            irqs: self.irqs.len() as u32,
            periphs: self.periphs.len() as u32,
        }
    }

    /// Verify that every family's stamped indices equal their positions in
    /// the binary enumeration order.
    ///
    /// Fails when children of one owner were not added contiguously, for
    /// instance a RAM pseg of cluster (1,0) added before the peripherals of
    /// cluster (0,0).
    pub fn check_order(&self) -> Result<()> {
        check_family("cluster", self.clusters.iter().map(|c| c.index.index()))?;
        check_family("pseg", self.psegs_in_order().map(|p| p.index.index()))?;
        check_family("vspace", self.vspaces.iter().map(|v| v.index.index()))?;
        check_family("vseg", self.vsegs_in_order().map(|v| v.index.index()))?;
        check_family("task", self.tasks_in_order().map(|t| t.index.index()))?;
        check_family("proc", self.procs_in_order().map(|p| p.index.index()))?;
        check_family("irq", self.irqs_in_order().map(|i| i.index.index()))?;
        check_family("periph", self.periphs_in_order().map(|p| p.index.index()))?;
        Ok(())
    }
}

fn check_family(family: &'static str, indices: impl Iterator<Item = u32>) -> Result<()> {
    for (expected, index) in indices.enumerate() {
        let expected = expected as u32;
        if index != expected {
            return Err(MappingError::IndexMismatch {
                family,
                index,
                expected,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_defaults_from_toml_like_json() {
        let params: PlatformParams = serde_json::from_str(
            r#"{ "name": "tsar", "x-size": 2, "y-size": 2, "nprocs": 4 }"#,
        )
        .unwrap();
        assert_eq!(params, PlatformParams::new("tsar", 2, 2, 4));
        assert_eq!(params.reset_address, 0xBFC0_0000);
        assert_eq!(params.peri_increment, 0x10000);
    }

    #[test]
    fn validate_rejects_oversized_grid() {
        let params = PlatformParams::new("big", 17, 1, 1);
        assert!(matches!(
            params.validate(),
            Err(MappingError::InvalidGeometry { .. })
        ));

        let mut params = PlatformParams::new("io", 2, 2, 1);
        params.x_io = 2;
        assert!(matches!(
            params.validate(),
            Err(MappingError::ClusterOutOfRange { .. })
        ));
    }

    #[test]
    fn empty_mapping_has_row_major_clusters() {
        let mapping = Mapping::empty(PlatformParams::new("m", 2, 3, 1));
        let coords: Vec<_> = mapping.clusters().iter().map(|c| (c.x, c.y)).collect();
        assert_eq!(
            coords,
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]
        );
        assert_eq!(mapping.cluster(1, 2).unwrap().index.index(), 5);
        assert!(mapping.cluster(2, 0).is_none());
        assert!(mapping.check_order().is_ok());
        assert_eq!(mapping.totals(), Totals::default());
    }
}
