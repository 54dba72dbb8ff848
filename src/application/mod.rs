//! Application services (use cases).
//!
//! Pure pipeline stages (budgeting, checking, validation, rendering) plus
//! the two flows that drive them through the outbound ports: install and
//! update.

pub mod budget;
pub mod checker;
pub mod pipeline;
pub mod render;
pub mod secrets;
pub mod update;
pub mod validator;
