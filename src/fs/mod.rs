//! # ============================================================
//! # Sistema de Arquivos Virtual
//! # ============================================================
//!
//! Camada agnóstica (`vfs`) mais os backends: tmpfs na raiz,
//! initramfs somente-leitura e arquivos de dispositivo.

pub mod config;
pub mod dev;
pub mod initramfs;
pub mod node;
pub mod tmpfs;
pub mod vfs;

#[cfg(feature = "self_test")]
pub mod test;

use crate::sys::KernelError;

/// Sobe a hierarquia completa do boot: raiz tmpfs, o CPIO montado em
/// `/initramfs` e o console em `/dev/uart`.
pub fn init() -> Result<(), KernelError> {
    tmpfs::init()?;
    initramfs::init()?;
    vfs::init_root("tmpfs")?;

    vfs::mkdir("/initramfs")?;
    vfs::mount("/initramfs", "initramfs")?;

    dev::init()?;
    crate::kinfo!("(FS) Hierarquia de boot pronta");
    Ok(())
}
