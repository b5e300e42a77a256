//! Timer físico do core (CNTP) e seu roteamento de IRQ.
//!
//! A política (fila ordenada, preempção) fica em `crate::time`; aqui só o
//! acesso aos registradores de sistema e ao controlador local do core 0.

#![cfg_attr(not(target_arch = "aarch64"), allow(dead_code))]

#[cfg(target_arch = "aarch64")]
use crate::drivers::mmio;

#[cfg(not(target_arch = "aarch64"))]
use core::sync::atomic::{AtomicU64, Ordering};

const CORE0_TIMER_IRQ_CTRL: usize = 0x4000_0040;
pub const CORE0_IRQ_SOURCE: usize = 0x4000_0060;

/// Bit do CNTPNSIRQ no registrador de fonte de IRQ do core 0.
pub const IRQ_SRC_CNTPNS: u32 = 1 << 1;

#[cfg(not(target_arch = "aarch64"))]
static FAKE_COUNT: AtomicU64 = AtomicU64::new(0);

/// Frequência do contador em Hz.
#[inline]
pub fn freq() -> u64 {
    #[cfg(target_arch = "aarch64")]
    {
        let f: u64;
        unsafe {
            core::arch::asm!("mrs {}, cntfrq_el0", out(reg) f, options(nomem, nostack));
        }
        f
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        62_500_000
    }
}

/// Valor corrente do contador físico.
#[inline]
pub fn now() -> u64 {
    #[cfg(target_arch = "aarch64")]
    {
        let c: u64;
        unsafe {
            core::arch::asm!("mrs {}, cntpct_el0", out(reg) c, options(nomem, nostack));
        }
        c
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        FAKE_COUNT.fetch_add(1, Ordering::Relaxed)
    }
}

/// Programa a próxima expiração em valor absoluto do contador.
#[inline]
pub fn set_compare(deadline: u64) {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("msr cntp_cval_el0, {}", in(reg) deadline, options(nomem, nostack));
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        let _ = deadline;
    }
}

/// Liga o timer físico e roteia o CNTPNSIRQ para o core 0.
pub fn enable() {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("msr cntp_ctl_el0, {}", in(reg) 1u64, options(nomem, nostack));
        mmio::write32(CORE0_TIMER_IRQ_CTRL, 2);
    }
}

/// Desliga a entrega de IRQ do timer (o contador continua correndo).
pub fn disable() {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        mmio::write32(CORE0_TIMER_IRQ_CTRL, 0);
    }
}

/// Fonte de interrupção pendente do core 0.
pub fn irq_source() -> u32 {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        mmio::read32(CORE0_IRQ_SOURCE)
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        0
    }
}
