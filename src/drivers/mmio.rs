//! Acesso volátil a registradores mapeados em memória.

#[cfg(target_arch = "aarch64")]
use core::ptr::NonNull;
#[cfg(target_arch = "aarch64")]
use volatile::VolatilePtr;

/// Lê um registrador MMIO de 32 bits.
///
/// # Safety
/// `addr` deve ser um endereço de registrador válido para esta placa.
#[cfg(target_arch = "aarch64")]
pub unsafe fn read32(addr: usize) -> u32 {
    VolatilePtr::new(NonNull::new_unchecked(addr as *mut u32)).read()
}

/// Escreve um registrador MMIO de 32 bits.
///
/// # Safety
/// `addr` deve ser um endereço de registrador válido para esta placa.
#[cfg(target_arch = "aarch64")]
pub unsafe fn write32(addr: usize, value: u32) {
    VolatilePtr::new(NonNull::new_unchecked(addr as *mut u32)).write(value);
}

// Builds fora do alvo (análise estática, CI) não tocam MMIO.
#[cfg(not(target_arch = "aarch64"))]
pub unsafe fn read32(_addr: usize) -> u32 {
    0
}

#[cfg(not(target_arch = "aarch64"))]
pub unsafe fn write32(_addr: usize, _value: u32) {}
