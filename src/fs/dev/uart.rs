//! Console serial como arquivo: read bloqueia na mini UART byte a byte,
//! write transmite direto. Seek não faz sentido aqui.

use crate::fs::vfs::{File, FileOps};
use crate::sys::KernelError;

static UART_FOPS: UartFileOps = UartFileOps;

/// Cria `/dev/uart` apontando para o console serial.
pub fn init() -> Result<(), KernelError> {
    crate::fs::vfs::mknod("/dev/uart", &UART_FOPS)?;
    Ok(())
}

struct UartFileOps;

impl FileOps for UartFileOps {
    fn read(&self, _file: &mut File, buf: &mut [u8]) -> Result<usize, KernelError> {
        for slot in buf.iter_mut() {
            *slot = crate::drivers::serial::getc();
        }
        Ok(buf.len())
    }

    fn write(&self, _file: &mut File, buf: &[u8]) -> Result<usize, KernelError> {
        for &byte in buf {
            crate::drivers::serial::putc(byte);
        }
        Ok(buf.len())
    }
}
