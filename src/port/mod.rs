//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams between the installer pipeline and the host:
//! hardware introspection, the container runtime, the image registry and
//! the install directory.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!     ┌──────────────┤  Domain + Port          ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     ▼                         ▼                             ▼
//! ┌─────────┐            ┌─────────────┐              ┌───────────┐
//! │  Host   │            │  Compose /  │              │ Artifact  │
//! │  Probe  │            │  Registry   │              │   Store   │
//! └─────────┘            └─────────────┘              └───────────┘
//! ```

pub mod outbound;
