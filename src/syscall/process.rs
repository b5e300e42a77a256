//! Syscalls de processo: identidade, duplicação, término, sinais e o
//! passthrough do mailbox.

use crate::arch::TrapFrame;
use crate::sched;
use crate::sched::task::TaskId;
use crate::sys::KernelError;
use crate::syscall::user_cstr;

pub fn sys_getpid() -> Result<isize, KernelError> {
    sched::current_id()
        .map(|id| id as isize)
        .ok_or(KernelError::InternalInconsistency)
}

pub fn sys_fork(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let child = sched::scheduler::fork(frame)?;
    Ok(child as isize)
}

pub fn sys_exit() -> Result<isize, KernelError> {
    sched::exit_current()
}

/// Carrega um programa do initramfs e entra nele. Só retorna em falha.
pub fn sys_exec(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let name = user_cstr(frame.arg(0))?;
    if name.is_empty() {
        crate::kwarn!("(SYS) exec: nome vazio");
        return Err(KernelError::InvalidArgument);
    }
    crate::exec::exec_into(name, frame)?;
    Ok(0)
}

pub fn sys_kill(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let pid = frame.arg(0) as TaskId;
    sched::kill(pid)?;
    Ok(0)
}

pub fn sys_signal(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let sig = frame.arg(0) as usize;
    let handler = frame.arg(1);
    let old = sched::signal::register(sig, handler)?;
    Ok(old as isize)
}

pub fn sys_sigkill(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let pid = frame.arg(0) as TaskId;
    let sig = frame.arg(1) as usize;
    sched::signal::send(pid, sig)?;
    Ok(0)
}

/// Passthrough do canal de propriedades: só valida e repassa o buffer.
pub fn sys_mbox_call(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let channel = frame.arg(0) as u8;
    let buffer = frame.arg(1) as usize;
    if buffer == 0 {
        crate::kwarn!("(SYS) mbox: buffer nulo");
        return Err(KernelError::InvalidArgument);
    }
    if channel >= 16 {
        crate::kwarn!("(SYS) mbox: canal invalido=", channel);
        return Err(KernelError::InvalidArgument);
    }

    let buffer = buffer as *mut u32;
    if !crate::drivers::mailbox::call(channel, buffer) {
        crate::kwarn!("(SYS) mbox: chamada falhou");
        return Err(KernelError::Busy);
    }
    // Convenção herdada: devolve a palavra de status da resposta.
    Ok(unsafe { *buffer.add(1) } as isize)
}
