//! `shell`: a single interactive task on processor [0,0,0].

use genmap_core::builder::MappingBuilder;
use genmap_core::entity::{TaskDesc, VsegDesc, VspaceId};
use genmap_core::kinds::{VsegMode, VsegType};

use crate::error::Result;

const BINPATH: &str = "bin/shell/appli.elf";

pub fn extend(b: &mut MappingBuilder) -> Result<VspaceId> {
    let vspace = b.add_vspace("shell", "shell_data", true);

    b.add_vseg(
        vspace,
        VsegDesc::new("shell_data", 0x2000_0000, 0x8_0000, VsegMode::C_WU, VsegType::Elf)
            .binpath(BINPATH),
    )?;
    b.add_vseg(
        vspace,
        VsegDesc::new("shell_code", 0x1000_0000, 0x1_0000, VsegMode::CXWU, VsegType::Elf)
            .binpath(BINPATH),
    )?;
    b.add_vseg(
        vspace,
        VsegDesc::new("shell_stack", 0x4000_0000, 0x20_0000, VsegMode::C_WU, VsegType::Buffer)
            .big(),
    )?;
    // Unused by the shell itself.
    b.add_vseg(
        vspace,
        VsegDesc::new("shell_heap", 0x6000_0000, 0x1000, VsegMode::C_WU, VsegType::Buffer),
    )?;

    b.add_task(
        vspace,
        TaskDesc::new("shell", 0)
            .on(0, 0, 0)
            .stack("shell_stack")
            .heap("shell_heap"),
    )?;

    b.append_to_name("_shell");
    Ok(vspace)
}
