//! Colaboradores externos de hardware.
//!
//! O núcleo consome estes drivers apenas pelas suas interfaces (bytes na
//! serial, uma chamada de mailbox). A lógica interna deles não faz parte
//! do núcleo do kernel.

pub mod mailbox;
pub mod mmio;
pub mod serial;
