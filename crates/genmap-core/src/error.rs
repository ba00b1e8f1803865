//! Errors raised while building or resolving a mapping.

use thiserror::Error;

use crate::kinds::PeriphType;

/// Convenience alias for results within the core crate.
pub type Result<T> = std::result::Result<T, MappingError>;

/// Broad class of a failure, used by callers that react differently to
/// bad construction calls, dangling references and platform-wide rule
/// violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Invalid argument passed to a construction call.
    Construction,
    /// A name or index reference that does not resolve at emission time.
    Resolution,
    /// A platform-wide rule enforced by one artifact generator.
    Platform,
}

/// Errors that can occur while populating or resolving a mapping.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("unknown {family} '{name}'")]
    UnknownKind { family: &'static str, name: String },

    #[error("invalid platform geometry: {detail}")]
    InvalidGeometry { detail: String },

    #[error("{what}: cluster ({x},{y}) outside the {x_size}x{y_size} grid")]
    ClusterOutOfRange {
        what: String,
        x: u32,
        y: u32,
        x_size: u32,
        y_size: u32,
    },

    #[error("{what}: address {addr:#x} is not aligned on a 4 KiB page")]
    Misaligned { what: String, addr: u64 },

    #[error("{what}: {field} {value:#x} does not fit in 32 bits")]
    AddressOutOfRange {
        what: String,
        field: &'static str,
        value: u64,
    },

    #[error("RAM pseg {name}: {detail}")]
    RamMismatch { name: String, detail: String },

    #[error("{what}: local processor id {lpid} out of range (nprocs = {nprocs})")]
    LpidOutOfRange { what: String, lpid: u32, nprocs: u32 },

    #[error("irq port {port} out of range (max 31)")]
    PortOutOfRange { port: u32 },

    #[error("peripheral {name}: subtype {subtype} not valid for type {ptype}")]
    InvalidSubtype {
        name: String,
        ptype: PeriphType,
        subtype: String,
    },

    #[error("peripheral {name} of type {ptype} is not an interrupt controller")]
    NotInterruptController { name: String, ptype: PeriphType },

    #[error("peripheral {source_name} wired to two interrupt controllers: {first} and {second}")]
    ControllerConflict {
        source_name: String,
        first: String,
        second: String,
    },

    #[error(
        "global vseg {name} ({base:#x}/{length:#x}) overlaps {other} ({other_base:#x}/{other_length:#x})"
    )]
    GlobalOverlap {
        name: String,
        base: u64,
        length: u64,
        other: String,
        other_base: u64,
        other_length: u64,
    },

    #[error("ELF vseg {name} requires a binary path")]
    MissingBinpath { name: String },

    #[error("private vseg {name} cannot be identity mapped")]
    IdentityNotAllowed { name: String },

    #[error("duplicate {family} name '{name}' in {owner}")]
    DuplicateName {
        family: &'static str,
        name: String,
        owner: String,
    },

    #[error("duplicate thread id {trdid} in vspace {vspace}")]
    DuplicateThreadId { vspace: String, trdid: u32 },

    #[error("unknown {family} handle {index}")]
    UnknownHandle { family: &'static str, index: u32 },

    #[error("{family} '{name}' referenced by {referrer} not found in {scope}")]
    UnresolvedName {
        family: &'static str,
        name: String,
        referrer: String,
        scope: String,
    },

    #[error("{family} global index = {index} / expected = {expected}")]
    IndexMismatch {
        family: &'static str,
        index: u32,
        expected: u32,
    },
}

impl MappingError {
    pub fn class(&self) -> ErrorClass {
        match self {
            MappingError::UnresolvedName { .. } | MappingError::IndexMismatch { .. } => {
                ErrorClass::Resolution
            }
            _ => ErrorClass::Construction,
        }
    }
}
