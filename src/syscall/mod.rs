//! # ============================================================
//! # Dispatcher de syscalls
//! # ============================================================
//!
//! Mapeamento direto número -> handler. Cada handler lê os argumentos de
//! slots fixos do trap frame e escreve o resultado no slot de retorno.
//! Erros internos viram valores negativos só aqui, na fronteira da ABI;
//! número desconhecido escreve `NoSuchSyscall` no retorno em vez de
//! vazar o que estava no registrador.

pub mod fs;
pub mod io;
pub mod numbers;
pub mod process;

#[cfg(feature = "self_test")]
pub mod test;

use crate::arch::TrapFrame;
use crate::sys::KernelError;
use numbers::*;

/// Limite defensivo para strings vindas do usuário.
const USER_STR_MAX: usize = 256;

/// Lê uma string NUL-terminada do espaço do usuário.
///
/// Endereçamento físico, sem paginação: o acesso é direto, só validamos
/// ponteiro nulo e comprimento.
pub(crate) fn user_cstr<'a>(addr: u64) -> Result<&'a str, KernelError> {
    if addr == 0 {
        return Err(KernelError::InvalidArgument);
    }
    let base = addr as *const u8;
    let mut len = 0;
    unsafe {
        while len < USER_STR_MAX && *base.add(len) != 0 {
            len += 1;
        }
        if len == USER_STR_MAX {
            return Err(KernelError::InvalidArgument);
        }
        core::str::from_utf8(core::slice::from_raw_parts(base, len))
            .map_err(|_| KernelError::InvalidArgument)
    }
}

/// Fatia mutável do espaço do usuário.
pub(crate) fn user_slice_mut<'a>(addr: u64, len: usize) -> Result<&'a mut [u8], KernelError> {
    if addr == 0 || len == 0 {
        return Err(KernelError::InvalidArgument);
    }
    unsafe { Ok(core::slice::from_raw_parts_mut(addr as *mut u8, len)) }
}

/// Fatia de leitura do espaço do usuário.
pub(crate) fn user_slice<'a>(addr: u64, len: usize) -> Result<&'a [u8], KernelError> {
    if addr == 0 || len == 0 {
        return Err(KernelError::InvalidArgument);
    }
    unsafe { Ok(core::slice::from_raw_parts(addr as *const u8, len)) }
}

/// Entrada única do tratamento de syscalls.
pub fn dispatch(frame: &mut TrapFrame) {
    let number = frame.syscall_number();
    crate::ktrace!("(SYS) syscall numero=", number);

    let result: Result<isize, KernelError> = match number {
        SYS_GETPID => process::sys_getpid(),
        SYS_UART_READ => io::sys_uart_read(frame),
        SYS_UART_WRITE => io::sys_uart_write(frame),
        SYS_EXEC => process::sys_exec(frame),
        SYS_FORK => process::sys_fork(frame),
        SYS_EXIT => process::sys_exit(),
        SYS_MBOX_CALL => process::sys_mbox_call(frame),
        SYS_KILL => process::sys_kill(frame),
        SYS_SIGNAL => process::sys_signal(frame),
        SYS_SIGKILL => process::sys_sigkill(frame),
        SYS_SIGRETURN => {
            crate::sched::signal::sigreturn(frame);
            // O frame inteiro foi restaurado; nada a escrever no retorno.
            return;
        }
        SYS_OPEN => fs::sys_open(frame),
        SYS_CLOSE => fs::sys_close(frame),
        SYS_WRITE => fs::sys_write(frame),
        SYS_READ => fs::sys_read(frame),
        SYS_MKDIR => fs::sys_mkdir(frame),
        SYS_MOUNT => fs::sys_mount(frame),
        SYS_CHDIR => fs::sys_chdir(frame),
        SYS_LSEEK64 => fs::sys_lseek64(frame),
        SYS_IOCTL => fs::sys_ioctl(frame),
        _ => {
            crate::kwarn!("(SYS) Syscall desconhecida=", number);
            Err(KernelError::NoSuchSyscall)
        }
    };

    match result {
        Ok(value) => frame.set_return(value),
        Err(err) => {
            crate::kdebug!("(SYS) Falha: ");
            crate::kdebug!(err.as_str());
            frame.set_return(err.as_isize());
        }
    }
}
