//! # ============================================================
//! # Carregamento de programas
//! # ============================================================
//!
//! Imagens são binários crus, sem relocação: executam do endereço onde
//! foram carregadas. O exec substitui a imagem de usuário da tarefa
//! corrente reescrevendo o trap frame da syscall; o retorno pelo
//! caminho normal de trap já entra no programa novo em EL0.

use crate::arch::aarch64::trap::SPSR_EL0_IRQ_ON;
use crate::arch::TrapFrame;
use crate::fs::config::SEEK_SET;
use crate::sched::task::Stack;
use crate::sys::KernelError;
use alloc::sync::Arc;
use alloc::vec::Vec;

/// Lê o conteúdo inteiro de um arquivo do VFS. Nomes sem barra são
/// procurados direto no initramfs.
fn load_image(name: &str) -> Result<Arc<[u8]>, KernelError> {
    let mut file = if name.contains('/') {
        crate::fs::vfs::open(name, 0)?
    } else {
        let mut path = alloc::string::String::from("/initramfs/");
        path.push_str(name);
        crate::fs::vfs::open(&path, 0)?
    };

    let size = file.vnode.node.content.lock().size();
    if size == 0 {
        crate::kwarn!("(EXEC) Imagem vazia");
        return Err(KernelError::InvalidArgument);
    }

    let mut image = Vec::new();
    image.resize(size, 0);
    file.seek(0, SEEK_SET)?;
    let mut loaded = 0;
    while loaded < size {
        let read = file.read(&mut image[loaded..])?;
        if read == 0 {
            break;
        }
        loaded += read;
    }
    if loaded != size {
        crate::kerror!("(EXEC) Leitura incompleta: ", loaded);
        return Err(KernelError::InternalInconsistency);
    }
    Ok(image.into())
}

/// Troca a imagem de usuário da tarefa corrente pelo programa `name`.
/// Só retorna em falha; no sucesso o eret da syscall entra na imagem.
pub fn exec_into(name: &str, frame: &mut TrapFrame) -> Result<(), KernelError> {
    let image = load_image(name)?;
    let entry = image.as_ptr() as u64;
    crate::kinfo!("(EXEC) Imagem carregada em: ", entry);
    crate::kinfo!("(EXEC) Tamanho: ", image.len());

    let user_stack = Stack::alloc()?;
    // O SP de EL0 exige alinhamento de 16 bytes.
    let stack_top = crate::klib::align::align_down(user_stack.top(), 16) as u64;

    crate::sched::with_current(|task| {
        task.program = Some(image);
        task.user_stack = user_stack;
        // Estado de sinal do programa antigo não sobrevive ao exec.
        task.pending_signals = 0;
        task.handlers = crate::sched::signal::default_table();
        task.signal_frame = None;
        task.handler_stack = None;
    })?;

    frame.elr_el1 = entry;
    frame.sp_el0 = stack_top;
    frame.spsr_el1 = SPSR_EL0_IRQ_ON;
    Ok(())
}
