//! # ============================================================
//! # Arquivos de dispositivo
//! # ============================================================
//!
//! Dispositivos são nós comuns com a tabela de operações de arquivo
//! trocada por `mknod`. O conteúdo em memória do nó fica inerte.

pub mod uart;

use crate::sys::KernelError;

/// Cria `/dev` e os nós de dispositivo dentro dele.
pub fn init() -> Result<(), KernelError> {
    crate::fs::vfs::mkdir("/dev")?;
    uart::init()?;
    Ok(())
}
