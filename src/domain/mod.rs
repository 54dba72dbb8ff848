//! Installer domain: services, host facts, plans, routing and artifacts.
//!
//! Everything here is a plain value type with no I/O, so each pipeline stage
//! can be driven from fabricated inputs.

pub mod artifact;
pub mod error;
pub mod hardware;
pub mod input;
pub mod issue;
pub mod plan;
pub mod policy;
pub mod routing;
pub mod service;

pub use artifact::{RenderedArtifacts, RenderedFile};
pub use hardware::{GpuInfo, GpuVendor, HardwareFacts, OsFamily};
pub use input::{Credentials, InstallInput};
pub use issue::{Severity, ValidationIssue};
pub use plan::{ExecutionMode, ResourcePlan, ServiceAllocation};
pub use policy::{PolicyTable, ServicePolicy};
pub use routing::{CertificateAuthority, RouteTargets, RoutingConfig, RoutingMode};
pub use service::ServiceKind;
