//! Camada dependente de arquitetura.
//!
//! Toda instrução privilegiada e todo acesso a registradores de sistema
//! vivem aqui. O resto do kernel chama primitivas estreitas com contrato
//! bem definido; em alvos que não são AArch64 elas viram stubs para que a
//! lógica portável continue compilando e testável.

pub mod aarch64;

pub use aarch64::context::{cpu_switch_to, CpuContext};
pub use aarch64::irq::{self, IrqGuard};
pub use aarch64::timer;
pub use aarch64::trap::TrapFrame;
