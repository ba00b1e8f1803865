//! Reference platform for genmap.
//!
//! [`arch::tsar_generic`] instantiates the hardware and kernel segments of
//! a TSAR grid; the [`apps`] module maps applications on top of it.
//! [`build_platform`] chains both and hands back a finished mapping.

pub mod apps;
pub mod arch;
pub mod error;

pub use apps::{available_applications, AppKind};
pub use arch::{tsar_generic, ArchConfig, TEMPLATE_NAME};
pub use error::{PlatformError, Result};

use genmap_core::mapping::Mapping;

/// Build the architecture, then map each application in order.
pub fn build_platform(config: &ArchConfig, apps: &[AppKind]) -> Result<Mapping> {
    let mut builder = tsar_generic(config)?;
    for app in apps {
        app.extend(&mut builder)?;
        tracing::debug!(app = app.name(), "application mapped");
    }
    Ok(builder.build())
}
