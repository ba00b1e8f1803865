//! Exporter trait and core abstractions shared by every textual artifact.

use tracing::warn;

use genmap_core::mapping::Mapping;

use crate::error::{ExportError, Result};

/// The kind of textual artifact to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    Xml,
    Header,
    Linker,
    LinuxDts,
    NetbsdDts,
    ArchInfo,
}

impl ExportKind {
    /// Parse an artifact kind from its short name or its file name.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "xml" | "map.xml" => Ok(ExportKind::Xml),
            "header" | "hard_config.h" => Ok(ExportKind::Header),
            "ld" | "giet_vsegs.ld" => Ok(ExportKind::Linker),
            "linux-dts" | "linux.dts" => Ok(ExportKind::LinuxDts),
            "netbsd-dts" | "netbsd.dts" => Ok(ExportKind::NetbsdDts),
            "arch-info" | "arch.info" => Ok(ExportKind::ArchInfo),
            _ => Err(ExportError::UnknownArtifact {
                name: s.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportKind::Xml => "xml",
            ExportKind::Header => "header",
            ExportKind::Linker => "ld",
            ExportKind::LinuxDts => "linux-dts",
            ExportKind::NetbsdDts => "netbsd-dts",
            ExportKind::ArchInfo => "arch-info",
        }
    }

    /// Default output file name.
    pub fn file_name(&self) -> &'static str {
        match self {
            ExportKind::Xml => "map.xml",
            ExportKind::Header => "hard_config.h",
            ExportKind::Linker => "giet_vsegs.ld",
            ExportKind::LinuxDts => "linux.dts",
            ExportKind::NetbsdDts => "netbsd.dts",
            ExportKind::ArchInfo => "arch.info",
        }
    }
}

impl std::fmt::Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Text of one artifact plus the peripherals it had to leave out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOutput {
    pub text: String,
    pub warnings: Vec<String>,
}

impl ExportOutput {
    /// Record a non-fatal downgrade and log it.
    pub(crate) fn warn(&mut self, kind: ExportKind, message: String) {
        warn!(artifact = kind.name(), "{message}");
        self.warnings.push(message);
    }
}

/// Trait for all textual exporters.
pub trait Exporter {
    /// Render the artifact for a finished mapping.
    fn export(&self, mapping: &Mapping) -> Result<ExportOutput>;

    /// The kind of artifact this exporter produces.
    fn kind(&self) -> ExportKind;
}

/// List all textual artifact kinds, in emission order.
pub fn available_exports() -> &'static [ExportKind] {
    &[
        ExportKind::Xml,
        ExportKind::Header,
        ExportKind::Linker,
        ExportKind::LinuxDts,
        ExportKind::NetbsdDts,
        ExportKind::ArchInfo,
    ]
}

/// Exporter producing `kind`.
pub fn exporter(kind: ExportKind) -> Box<dyn Exporter> {
    match kind {
        ExportKind::Xml => Box::new(crate::xml::XmlExporter),
        ExportKind::Header => Box::new(crate::hard_config::HardConfigExporter),
        ExportKind::Linker => Box::new(crate::ld_script::LdScriptExporter),
        ExportKind::LinuxDts => Box::new(crate::linux_dts::LinuxDtsExporter),
        ExportKind::NetbsdDts => Box::new(crate::netbsd_dts::NetbsdDtsExporter),
        ExportKind::ArchInfo => Box::new(crate::arch_info::ArchInfoExporter),
    }
}
