//! Definições de sistema compartilhadas por todos os subsistemas.

pub mod error;

pub use error::KernelError;
