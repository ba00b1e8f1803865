//! Textual artifacts derived from a finished mapping.
//!
//! Each artifact (XML description, C header, linker script, Linux and
//! NetBSD device trees, ALMOS `arch.info`) has its own [`Exporter`]. An
//! exporter either returns the complete text or fails without output;
//! peripherals an artifact cannot describe are reported as warnings.

pub mod arch_info;
pub mod error;
pub mod export;
pub mod format;
pub mod hard_config;
pub mod ld_script;
pub mod linux_dts;
pub mod netbsd_dts;
pub mod xml;

#[cfg(test)]
mod testing;

pub use arch_info::ArchInfoExporter;
pub use error::{ExportError, Result};
pub use export::{available_exports, exporter, ExportKind, ExportOutput, Exporter};
pub use hard_config::HardConfigExporter;
pub use ld_script::LdScriptExporter;
pub use linux_dts::LinuxDtsExporter;
pub use netbsd_dts::NetbsdDtsExporter;
pub use xml::XmlExporter;
