//! Controle de interrupções locais (máscara DAIF).

use bitflags::bitflags;

bitflags! {
    /// Bits da máscara DAIF como lidos/escritos via `mrs`/`msr`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Daif: u64 {
        const DEBUG = 1 << 9;
        const SERROR = 1 << 8;
        const IRQ = 1 << 7;
        const FIQ = 1 << 6;
    }
}

/// Habilita a entrega de IRQs.
#[inline]
pub fn enable() {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("msr daifclr, #2", options(nomem, nostack));
    }
}

/// Mascara IRQs.
#[inline]
pub fn disable() {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("msr daifset, #2", options(nomem, nostack));
    }
}

#[inline]
fn read_daif() -> Daif {
    #[cfg(target_arch = "aarch64")]
    {
        let value: u64;
        unsafe {
            core::arch::asm!("mrs {}, daif", out(reg) value, options(nomem, nostack));
        }
        Daif::from_bits_truncate(value)
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        Daif::IRQ
    }
}

#[inline]
fn write_daif(value: Daif) {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("msr daif, {}", in(reg) value.bits(), options(nomem, nostack));
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        let _ = value;
    }
}

/// Seção crítica RAII: mascara IRQs na construção e restaura a máscara
/// anterior no drop. Toda mutação de fila do scheduler, da lista de
/// timers e das listas livres dos alocadores acontece sob um destes.
pub struct IrqGuard {
    saved: Daif,
}

impl IrqGuard {
    pub fn new() -> Self {
        let saved = read_daif();
        disable();
        IrqGuard { saved }
    }
}

impl Default for IrqGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        write_daif(self.saved);
    }
}
