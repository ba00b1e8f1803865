//! `transpose`: image transposition, one task per processor.

use genmap_core::builder::MappingBuilder;
use genmap_core::entity::{TaskDesc, VsegDesc, VspaceId};
use genmap_core::kinds::{VsegMode, VsegType};

use crate::error::Result;

const BINPATH: &str = "bin/transpose/appli.elf";

const CODE_BASE: u64 = 0x1000_0000;
const CODE_SIZE: u64 = 0x1_0000;
const DATA_BASE: u64 = 0x2000_0000;
const DATA_SIZE: u64 = 0x1_0000;
const STACK_BASE: u64 = 0x4000_0000;
const STACK_SIZE: u64 = 0x20_0000;
const HEAP_BASE: u64 = 0x6000_0000;
const HEAP_SIZE: u64 = 0x20_0000;
const PAGE_MASK: u64 = !0xFFF;

pub fn extend(b: &mut MappingBuilder) -> Result<VspaceId> {
    let params = b.params().clone();
    let nprocs = params.nprocs;
    let clusters: Vec<(u32, u32)> = (0..params.x_size)
        .flat_map(|x| (0..params.y_size).map(move |y| (x, y)))
        .filter(|&(x, y)| b.procs_in(x, y) > 0)
        .collect();

    let vspace = b.add_vspace("transpose", "trsp_data", false);

    b.add_vseg(
        vspace,
        VsegDesc::new("trsp_data", DATA_BASE, DATA_SIZE, VsegMode::C_WU, VsegType::Elf)
            .binpath(BINPATH),
    )?;

    for &(x, y) in &clusters {
        b.add_vseg(
            vspace,
            VsegDesc::new(
                format!("trsp_code_{x}_{y}"),
                CODE_BASE,
                CODE_SIZE,
                VsegMode::CXWU,
                VsegType::Elf,
            )
            .on(x, y, "RAM")
            .local()
            .binpath(BINPATH),
        )?;
    }

    let stack_size = (STACK_SIZE / u64::from(nprocs)) & PAGE_MASK;
    for &(x, y) in &clusters {
        for p in 0..nprocs {
            let proc_id = u64::from(params.cluster_index(x, y) * nprocs + p);
            b.add_vseg(
                vspace,
                VsegDesc::new(
                    format!("trsp_stack_{x}_{y}_{p}"),
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
                format!("trsp_heap_{x}_{y}"),
                HEAP_BASE + cid * HEAP_SIZE,
                HEAP_SIZE,
                VsegMode::C_WU,
                VsegType::Heap,
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
                TaskDesc::new(format!("trsp_{x}_{y}_{p}"), trdid)
                    .on(x, y, p)
                    .stack(format!("trsp_stack_{x}_{y}_{p}"))
                    .heap(format!("trsp_heap_{x}_{y}")),
            )?;
        }
    }

    b.append_to_name("_transpose");
    Ok(vspace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{tsar_generic, ArchConfig};

    #[test]
    fn stacks_are_page_aligned() {
        let config = ArchConfig {
            nprocs: 3,
            ..ArchConfig::default()
        };
        let mut b = tsar_generic(&config).unwrap();
        extend(&mut b).unwrap();
        let mapping = b.build();
        let vspace = &mapping.vspaces()[0];

        let stack = mapping
            .vspace_vsegs(vspace)
            .find(|v| v.name == "trsp_stack_0_1_2")
            .unwrap();
        // 0x200000 / 3 rounded down to a page.
        assert_eq!(stack.length, 0xA_A000);
        assert_eq!(stack.vbase, 0x4000_0000 + 5 * 0xA_A000);
    }

    #[test]
    fn heaps_are_typed_and_shared() {
        let mut b = tsar_generic(&ArchConfig::default()).unwrap();
        extend(&mut b).unwrap();
        let mapping = b.build();

        assert_eq!(mapping.name(), "tsar_transpose");
        let vspace = &mapping.vspaces()[0];
        assert!(!vspace.active);
        let heap = mapping
            .vspace_vsegs(vspace)
            .find(|v| v.name == "trsp_heap_1_1")
            .unwrap();
        assert_eq!(heap.kind, VsegType::Heap);
        assert_eq!(heap.vbase, 0x6000_0000 + 3 * 0x20_0000);
        assert!(heap.big && !heap.local);

        let tasks: Vec<_> = mapping.vspace_tasks(vspace).collect();
        assert_eq!(tasks.len(), 16);
        assert_eq!(tasks[13].heapname, "trsp_heap_1_1");
    }
}
