//! Errors from the textual exporters.

use thiserror::Error;

use genmap_core::error::{ErrorClass, MappingError};
use genmap_core::kinds::{IsrType, PeriphType};

/// Convenience alias for results within the export crate.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors that abort one exporter. No text is produced for that artifact.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("unknown artifact: '{name}'. Available: xml, header, ld, linux-dts, netbsd-dts, arch-info")]
    UnknownArtifact { name: String },

    #[error("too many {ptype} peripherals: {count} (at most {max})")]
    TooManyPeripherals {
        ptype: PeriphType,
        count: usize,
        max: usize,
    },

    #[error("exactly one IOC kind must be configured (BDV, HBA, SDC, SPI or ramdisk), found {count}")]
    IocKindCount { count: usize },

    #[error("exactly one MWR subtype must be configured, found {count}")]
    MwrKindCount { count: usize },

    #[error("{name} vseg missing (required by {artifact})")]
    MissingVseg { name: String, artifact: &'static str },

    #[error("{name} vseg is not identity mapped")]
    NotIdentityMapped { name: String },

    #[error("No XCU/PIC in cluster({x},{y})")]
    MissingInterruptController { x: u32, y: u32 },

    #[error("{isr}{} not found on interrupt controller {controller}", channel_suffix(.channel))]
    IsrNotFound {
        isr: IsrType,
        channel: Option<u32>,
        controller: String,
    },

    #[error("{ptype} peripheral {name} has no interrupt controller")]
    NoControllerFor { name: String, ptype: PeriphType },
}

fn channel_suffix(channel: &Option<u32>) -> String {
    channel.map(|c| format!(" channel {c}")).unwrap_or_default()
}

impl ExportError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ExportError::Mapping(e) => e.class(),
            ExportError::UnknownArtifact { .. } => ErrorClass::Construction,
            ExportError::IsrNotFound { .. } | ExportError::NoControllerFor { .. } => {
                ErrorClass::Resolution
            }
            _ => ErrorClass::Platform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isr_message_mentions_channel_when_known() {
        let err = ExportError::IsrNotFound {
            isr: IsrType::Dma,
            channel: Some(3),
            controller: "XCU@0xb0000000".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ISR_DMA channel 3 not found on interrupt controller XCU@0xb0000000"
        );
        let err = ExportError::IsrNotFound {
            isr: IsrType::Mmc,
            channel: None,
            controller: "XCU@0xb0000000".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ISR_MMC not found on interrupt controller XCU@0xb0000000"
        );
        assert_eq!(err.class(), ErrorClass::Resolution);
    }

    #[test]
    fn platform_rules_are_platform_class() {
        let err = ExportError::MissingInterruptController { x: 1, y: 0 };
        assert_eq!(err.to_string(), "No XCU/PIC in cluster(1,0)");
        assert_eq!(err.class(), ErrorClass::Platform);
    }
}
