//! Built-in applications.
//!
//! An application extends a builder that already holds an architecture:
//! it adds one vspace with its private vsegs and tasks, then appends
//! `_<app>` to the mapping name.

pub mod router;
pub mod shell;
pub mod sort;
pub mod transpose;

use genmap_core::builder::MappingBuilder;
use genmap_core::entity::VspaceId;

use crate::error::{PlatformError, Result};

/// The applications that can be mapped on a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppKind {
    Shell,
    Sort,
    Transpose,
    Router,
}

impl AppKind {
    /// Parse an application from its name.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "shell" => Ok(AppKind::Shell),
            "sort" => Ok(AppKind::Sort),
            "transpose" => Ok(AppKind::Transpose),
            "router" => Ok(AppKind::Router),
            _ => Err(PlatformError::UnknownApplication {
                name: s.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AppKind::Shell => "shell",
            AppKind::Sort => "sort",
            AppKind::Transpose => "transpose",
            AppKind::Router => "router",
        }
    }

    /// One-line summary shown by `genmap list`.
    pub fn description(&self) -> &'static str {
        match self {
            AppKind::Shell => "interactive shell, one task on processor [0,0,0]",
            AppKind::Sort => "parallel sort, one task per processor",
            AppKind::Transpose => "image transposition, one task per processor",
            AppKind::Router => "producer, consumer and router tasks on every processor",
        }
    }

    /// Map the application onto `builder`.
    pub fn extend(&self, builder: &mut MappingBuilder) -> Result<VspaceId> {
        match self {
            AppKind::Shell => shell::extend(builder),
            AppKind::Sort => sort::extend(builder),
            AppKind::Transpose => transpose::extend(builder),
            AppKind::Router => router::extend(builder),
        }
    }
}

impl std::fmt::Display for AppKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// List all built-in applications.
pub fn available_applications() -> &'static [AppKind] {
    &[
        AppKind::Shell,
        AppKind::Sort,
        AppKind::Transpose,
        AppKind::Router,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_names() {
        for app in available_applications() {
            assert_eq!(AppKind::parse(app.name()).unwrap(), *app);
        }
        let err = AppKind::parse("convol").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown application: 'convol'. Available: shell, sort, transpose, router"
        );
    }
}
