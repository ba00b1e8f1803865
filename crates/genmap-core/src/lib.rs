//! Platform and software mapping model for tiled many-core architectures.
//!
//! A mapping describes a 2-D grid of clusters (processors, physical
//! segments, peripherals and their interrupt wiring) together with the
//! kernel-wide virtual segments and the per-application vspaces (virtual
//! segments and task placement).
//!
//! - **Geometry:** physical address <-> cluster coordinate codec
//! - **Builder:** validated, append-only construction with global indices
//! - **Resolver:** name and wiring references resolved at emission time

pub mod builder;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod kinds;
pub mod mapping;
pub mod resolve;

pub use builder::MappingBuilder;
pub use entity::{PeriphDesc, TaskDesc, VsegDesc};
pub use error::{ErrorClass, MappingError};
pub use geometry::AddressGeometry;
pub use kinds::{
    ClosedKind, IocSubtype, IrqType, IsrType, MwrSubtype, PeriphSubtype, PeriphType, PsegType,
    VsegMode, VsegType,
};
pub use mapping::{Mapping, PlatformParams, Totals, MAPPING_SIGNATURE};
pub use resolve::Resolver;
