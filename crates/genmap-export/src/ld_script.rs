//! `giet_vsegs.ld`: kernel and boot segment addresses for the linker.

use genmap_core::entity::Vseg;
use genmap_core::mapping::Mapping;

use crate::error::{ExportError, Result};
use crate::export::{ExportKind, ExportOutput, Exporter};

/// Linker symbol and the global vseg name prefix it is taken from. A
/// replicated segment matches through its common prefix; the last match
/// wins.
const SYMBOLS: [(&str, &str); 5] = [
    ("boot_code", "seg_boot_code"),
    ("boot_data", "seg_boot_data"),
    ("kernel_code", "seg_kernel_code"),
    ("kernel_data", "seg_kernel_data"),
    ("kernel_init", "seg_kernel_init"),
];

/// Order in which missing segments are reported.
const REQUIRED: [&str; 5] = [
    "seg_boot_code",
    "seg_boot_data",
    "seg_kernel_data",
    "seg_kernel_code",
    "seg_kernel_init",
];

pub struct LdScriptExporter;

impl Exporter for LdScriptExporter {
    fn kind(&self) -> ExportKind {
        ExportKind::Linker
    }

    fn export(&self, mapping: &Mapping) -> Result<ExportOutput> {
        for prefix in REQUIRED {
            find(mapping, prefix)?;
        }
        let mut found = Vec::with_capacity(SYMBOLS.len());
        for (symbol, prefix) in SYMBOLS {
            let vseg = find(mapping, prefix)?;
            found.push((symbol, vseg.vbase, vseg.length));
        }

        let mut s = format!("/* Generated by genmap for {} */\n\n", mapping.name());
        for (symbol, vbase, length) in found {
            s.push_str(&format!("{:<20} = 0x{vbase:x};\n", format!("{symbol}_vbase")));
            s.push_str(&format!("{:<20} = 0x{length:x};\n", format!("{symbol}_size")));
            s.push('\n');
        }

        Ok(ExportOutput {
            text: s,
            warnings: Vec::new(),
        })
    }
}

fn find<'a>(mapping: &'a Mapping, prefix: &str) -> Result<&'a Vseg> {
    mapping
        .globals()
        .filter(|v| v.name.starts_with(prefix))
        .last()
        .ok_or_else(|| ExportError::MissingVseg {
            name: prefix.to_string(),
            artifact: "giet_vsegs.ld",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, fixture_without_xcu};
    use genmap_core::builder::MappingBuilder;
    use genmap_core::entity::VsegDesc;
    use genmap_core::kinds::{VsegMode, VsegType};
    use genmap_core::mapping::PlatformParams;

    #[test]
    fn fixture_symbols() {
        let text = LdScriptExporter.export(&fixture()).unwrap().text;
        let expected = "\
/* Generated by genmap for fixture */

boot_code_vbase      = 0x80000;
boot_code_size       = 0x40000;

boot_data_vbase      = 0xc0000;
boot_data_size       = 0x80000;

kernel_code_vbase    = 0x80000000;
kernel_code_size     = 0x20000;

kernel_data_vbase    = 0x80020000;
kernel_data_size     = 0x20000;

kernel_init_vbase    = 0x80040000;
kernel_init_size     = 0x10000;

";
        assert_eq!(text, expected);
    }

    #[test]
    fn missing_segment_is_named() {
        let err = LdScriptExporter.export(&fixture_without_xcu()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "seg_boot_code vseg missing (required by giet_vsegs.ld)"
        );
    }

    #[test]
    fn kernel_data_is_reported_before_kernel_code() {
        let mut params = PlatformParams::new("partial", 1, 1, 1);
        params.ram_size = 0x0100_0000;
        let mut b = MappingBuilder::new(params).unwrap();
        b.add_ram("RAM", 0, 0x0100_0000).unwrap();
        b.add_proc(0, 0, 0).unwrap();
        for (name, vbase) in [
            ("seg_boot_code", 0x8_0000),
            ("seg_boot_data", 0xC_0000),
            ("seg_kernel_init", 0x8004_0000),
        ] {
            let desc = VsegDesc::new(name, vbase, 0x1_0000, VsegMode::CX__, VsegType::Buffer);
            b.add_global(desc).unwrap();
        }
        let err = LdScriptExporter.export(&b.build()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "seg_kernel_data vseg missing (required by giet_vsegs.ld)"
        );
    }
}
