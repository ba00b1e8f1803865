//! Shared formatting helpers for textual artifacts.

use genmap_core::entity::{Periph, Pseg};
use genmap_core::mapping::Mapping;
use genmap_core::resolve::Resolver;

use crate::error::{ExportError, Result};

/// Device tree `reg` cells of a segment: address high word, address low
/// word, size.
pub fn reg(base: u64, size: u64) -> String {
    format!("<0x{:x}  0x{:x}  0x{:x}>", base >> 32, base & 0xFFFF_FFFF, size)
}

/// `name@0x<base>` node label of a segment.
pub fn pseg_label(pseg: &Pseg) -> String {
    format!("{}@0x{:x}", pseg.name, pseg.base)
}

/// Append a `#define` line with the name column aligned.
pub fn define(out: &mut String, name: &str, value: u64) {
    out.push_str(&format!("#define {name:<22} {value}\n"));
}

/// Like [`define`], with a hexadecimal value.
pub fn define_hex(out: &mut String, name: &str, value: u64) {
    out.push_str(&format!("#define {name:<22} 0x{value:x}\n"));
}

/// Interrupt controller of `periph`, required by the caller.
pub fn controller_of<'m>(
    mapping: &'m Mapping,
    resolver: &Resolver<'m>,
    periph: &Periph,
) -> Result<&'m Periph> {
    resolver
        .controller_of(periph.index)
        .map(|id| mapping.periph(id))
        .ok_or_else(|| ExportError::NoControllerFor {
            name: mapping.pseg(periph.pseg).name.clone(),
            ptype: periph.ptype,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg_splits_wide_addresses() {
        assert_eq!(reg(0x12_B000_0000, 0x1000), "<0x12  0xb0000000  0x1000>");
        assert_eq!(reg(0, 0x400_0000), "<0x0  0x0  0x4000000>");
    }

    #[test]
    fn defines_align_values() {
        let mut out = String::new();
        define(&mut out, "X_SIZE", 2);
        define_hex(&mut out, "PERI_CLUSTER_INCREMENT", 0x10000);
        assert_eq!(
            out,
            "#define X_SIZE                 2\n#define PERI_CLUSTER_INCREMENT 0x10000\n"
        );
    }
}
