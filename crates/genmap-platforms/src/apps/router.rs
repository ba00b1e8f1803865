//! `router`: a producer, a consumer and router tasks on every other
//! processor.
//!
//! The producer runs on processor [0,0,0] and the consumer on the last
//! processor of the last cluster. The two data vsegs sit at the opposite
//! corners of the grid.

use genmap_core::builder::MappingBuilder;
use genmap_core::entity::{TaskDesc, VsegDesc, VspaceId};
use genmap_core::kinds::{VsegMode, VsegType};

use crate::error::Result;

const DATA_BINPATH: &str = "bin/router/appli.elf";
const CODE_BINPATH: &str = "bin/router/router.elf";

const CODE_BASE: u64 = 0x1000_0000;
const CODE_SIZE: u64 = 0x1_0000;
const DATA_0_BASE: u64 = 0x2000_0000;
const DATA_1_BASE: u64 = 0x3000_0000;
const DATA_SIZE: u64 = 0x1_0000;
const STACK_BASE: u64 = 0x4000_0000;
const STACK_SIZE: u64 = 0x20_0000;

/// Index of the start vector entry of each role.
const ROUTER_ENTRY: u32 = 0;
const CONSUMER_ENTRY: u32 = 1;
const PRODUCER_ENTRY: u32 = 2;

pub fn extend(b: &mut MappingBuilder) -> Result<VspaceId> {
    let params = b.params().clone();
    let (x_size, y_size, nprocs) = (params.x_size, params.y_size, params.nprocs);
    let clusters: Vec<(u32, u32)> = (0..x_size)
        .flat_map(|x| (0..y_size).map(move |y| (x, y)))
        .collect();

    let vspace = b.add_vspace("router", "router_data_0", true);

    b.add_vseg(
        vspace,
        VsegDesc::new("router_data_0", DATA_0_BASE, DATA_SIZE, VsegMode::C_WU, VsegType::Elf)
            .binpath(DATA_BINPATH),
    )?;
    b.add_vseg(
        vspace,
        VsegDesc::new("router_data_1", DATA_1_BASE, DATA_SIZE, VsegMode::C_WU, VsegType::Elf)
            .on(x_size - 1, y_size - 1, "RAM")
            .binpath(DATA_BINPATH),
    )?;

    for &(x, y) in &clusters {
        b.add_vseg(
            vspace,
            VsegDesc::new(
                format!("router_code_{x}_{y}"),
                CODE_BASE,
                CODE_SIZE,
                VsegMode::CXWU,
                VsegType::Elf,
            )
            .on(x, y, "RAM")
            .local()
            .binpath(CODE_BINPATH),
        )?;
    }

    let stack_size = STACK_SIZE / u64::from(nprocs);
    for &(x, y) in &clusters {
        for p in 0..nprocs {
            let proc_id = u64::from(params.cluster_index(x, y) * nprocs + p);
            b.add_vseg(
                vspace,
                VsegDesc::new(
                    format!("router_stack_{x}_{y}_{p}"),
                    STACK_BASE + proc_id * stack_size,
                    stack_size,
                    VsegMode::C_WU,
                    VsegType::Buffer,
                )
                .on(x, y, "RAM")
                .local()
                .big(),
            )?;
        }
    }

    for &(x, y) in &clusters {
        for p in 0..nprocs {
            let trdid = params.cluster_index(x, y) * nprocs + p;
            let (name, entry) = if (x, y, p) == (0, 0, 0) {
                ("producer".to_string(), PRODUCER_ENTRY)
            } else if (x, y, p) == (x_size - 1, y_size - 1, nprocs - 1) {
                ("consumer".to_string(), CONSUMER_ENTRY)
            } else {
                (format!("router_{x}_{y}_{p}"), ROUTER_ENTRY)
            };
            b.add_task(
                vspace,
                TaskDesc::new(name, trdid)
                    .on(x, y, p)
                    .stack(format!("router_stack_{x}_{y}_{p}"))
                    .startid(entry),
            )?;
        }
    }

    b.append_to_name("_router");
    Ok(vspace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{tsar_generic, ArchConfig};

    #[test]
    fn producer_and_consumer_at_opposite_corners() {
        let mut b = tsar_generic(&ArchConfig::default()).unwrap();
        extend(&mut b).unwrap();
        let mapping = b.build();

        assert_eq!(mapping.name(), "tsar_router");
        let vspace = &mapping.vspaces()[0];
        let tasks: Vec<_> = mapping.vspace_tasks(vspace).collect();
        assert_eq!(tasks.len(), 16);

        assert_eq!(tasks[0].name, "producer");
        assert_eq!(tasks[0].startid, 2);
        assert_eq!(tasks[15].name, "consumer");
        assert_eq!((tasks[15].x, tasks[15].y, tasks[15].lpid), (1, 1, 3));
        assert_eq!(tasks[15].startid, 1);
        assert_eq!(tasks[6].name, "router_0_1_2");
        assert_eq!(tasks[6].startid, 0);
        assert!(tasks.iter().all(|t| t.heapname.is_empty()));
    }

    #[test]
    fn data_vsegs_sit_at_grid_corners() {
        let mut b = tsar_generic(&ArchConfig::default()).unwrap();
        extend(&mut b).unwrap();
        let mapping = b.build();
        let vspace = &mapping.vspaces()[0];

        let names: Vec<_> = mapping
            .vspace_vsegs(vspace)
            .take(4)
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["router_data_0", "router_data_1", "router_code_0_0", "router_code_0_1"]
        );
        let data_1 = mapping
            .vspace_vsegs(vspace)
            .find(|v| v.name == "router_data_1")
            .unwrap();
        assert_eq!((data_1.x, data_1.y), (1, 1));
        assert_eq!(mapping.vspace_vsegs(vspace).count(), 2 + 4 + 16);
    }
}
