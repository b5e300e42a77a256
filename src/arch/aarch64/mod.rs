//! Primitivas AArch64 (EL1, endereçamento físico).

pub mod context;
pub mod irq;
pub mod timer;
pub mod trap;
