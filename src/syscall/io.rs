//! Syscalls de console bruto (leitura/escrita direto na UART).

use crate::arch::TrapFrame;
use crate::drivers::serial;
use crate::sys::KernelError;
use crate::syscall::{user_slice, user_slice_mut};

/// Maior transferência aceita por chamada.
const IO_MAX: usize = 4096;

pub fn sys_uart_read(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let mut size = frame.arg(1) as usize;
    if size > IO_MAX {
        crate::kwarn!("(SYS) uart_read: tamanho truncado=", size);
        size = IO_MAX;
    }
    let buf = user_slice_mut(frame.arg(0), size)?;
    for byte in buf.iter_mut() {
        *byte = serial::getc();
    }
    Ok(size as isize)
}

pub fn sys_uart_write(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let mut size = frame.arg(1) as usize;
    if size > IO_MAX {
        crate::kwarn!("(SYS) uart_write: tamanho truncado=", size);
        size = IO_MAX;
    }
    let buf = user_slice(frame.arg(0), size)?;
    for &byte in buf.iter() {
        serial::putc(byte);
    }
    Ok(size as isize)
}
