//! `sort`: one task per processor.
//!
//! The code vseg is replicated in every cluster holding processors, each
//! task gets a private stack in its own cluster and every cluster has a
//! heap shared by all tasks.

use genmap_core::builder::MappingBuilder;
use genmap_core::entity::{TaskDesc, VsegDesc, VspaceId};
use genmap_core::kinds::{VsegMode, VsegType};

use crate::error::Result;

const BINPATH: &str = "bin/sort/appli.elf";

const CODE_BASE: u64 = 0x1000_0000;
const CODE_SIZE: u64 = 0x1_0000;
const DATA_BASE: u64 = 0x2000_0000;
const DATA_SIZE: u64 = 0x1_0000;
const STACK_BASE: u64 = 0x4000_0000;
/// Stack area per cluster, split between its processors.
const STACK_SIZE: u64 = 0x20_0000;
const HEAP_BASE: u64 = 0x6000_0000;
const HEAP_SIZE: u64 = 0x20_0000;

pub fn extend(b: &mut MappingBuilder) -> Result<VspaceId> {
    let params = b.params().clone();
    let nprocs = params.nprocs;
    let clusters: Vec<(u32, u32)> = (0..params.x_size)
        .flat_map(|x| (0..params.y_size).map(move |y| (x, y)))
        .filter(|&(x, y)| b.procs_in(x, y) > 0)
        .collect();

    let vspace = b.add_vspace("sort", "sort_data", false);

    b.add_vseg(
        vspace,
        VsegDesc::new("sort_data", DATA_BASE, DATA_SIZE, VsegMode::C_WU, VsegType::Elf)
            .binpath(BINPATH),
    )?;

    for &(x, y) in &clusters {
        b.add_vseg(
            vspace,
            VsegDesc::new("sort_code", CODE_BASE, CODE_SIZE, VsegMode::CXWU, VsegType::Elf)
                .on(x, y, "RAM")
                .local()
                .binpath(BINPATH),
        )?;
    }

    let stack_size = STACK_SIZE / u64::from(nprocs);
    for &(x, y) in &clusters {
        for p in 0..nprocs {
            let proc_id = u64::from(params.cluster_index(x, y) * nprocs + p);
            b.add_vseg(
                vspace,
                VsegDesc::new(
                    format!("sort_stack_{x}_{y}_{p}"),
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
        let cid = u64::from(params.cluster_index(x, y));
        b.add_vseg(
            vspace,
            VsegDesc::new(
                format!("sort_heap_{x}_{y}"),
                HEAP_BASE + cid * HEAP_SIZE,
                HEAP_SIZE,
                VsegMode::C_WU,
                VsegType::Buffer,
            )
            .on(x, y, "RAM")
            .big(),
        )?;
    }

    for &(x, y) in &clusters {
        for p in 0..nprocs {
            let trdid = params.cluster_index(x, y) * nprocs + p;
            b.add_task(
                vspace,
                TaskDesc::new(format!("sort_{x}_{y}_{p}"), trdid)
                    .on(x, y, p)
                    .stack(format!("sort_stack_{x}_{y}_{p}"))
                    .heap(format!("sort_heap_{x}_{y}")),
            )?;
        }
    }

    b.append_to_name("_sort");
    Ok(vspace)
}
