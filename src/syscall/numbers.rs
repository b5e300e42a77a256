//! Tabela de números de syscall: o contrato bit-exato entre o código de
//! usuário e o dispatcher. Número em x8, argumentos em x0..x5, retorno
//! em x0; negativo significa erro.

pub const SYS_GETPID: u64 = 0;
pub const SYS_UART_READ: u64 = 1;
pub const SYS_UART_WRITE: u64 = 2;
pub const SYS_EXEC: u64 = 3;
pub const SYS_FORK: u64 = 4;
pub const SYS_EXIT: u64 = 5;
pub const SYS_MBOX_CALL: u64 = 6;
pub const SYS_KILL: u64 = 7;
pub const SYS_SIGNAL: u64 = 8;
pub const SYS_SIGKILL: u64 = 9;
pub const SYS_SIGRETURN: u64 = 10;
pub const SYS_OPEN: u64 = 11;
pub const SYS_CLOSE: u64 = 12;
pub const SYS_WRITE: u64 = 13;
pub const SYS_READ: u64 = 14;
pub const SYS_MKDIR: u64 = 15;
pub const SYS_MOUNT: u64 = 16;
pub const SYS_CHDIR: u64 = 17;
pub const SYS_LSEEK64: u64 = 18;
pub const SYS_IOCTL: u64 = 19;
