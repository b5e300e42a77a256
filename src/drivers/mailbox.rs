//! Mailbox de propriedades do VideoCore (canal 8).
//!
//! O buffer é montado pelo chamador; aqui só enfileiramos o endereço,
//! esperamos a resposta e conferimos o canal.

#![cfg_attr(not(target_arch = "aarch64"), allow(dead_code))]

#[cfg(target_arch = "aarch64")]
use crate::drivers::mmio;

const MMIO_BASE: usize = 0x3F00_0000;
const MBOX_READ: usize = MMIO_BASE + 0x0000_B880;
const MBOX_STATUS: usize = MMIO_BASE + 0x0000_B898;
const MBOX_WRITE: usize = MMIO_BASE + 0x0000_B8A0;

const MBOX_EMPTY: u32 = 0x4000_0000;
const MBOX_FULL: u32 = 0x8000_0000;

pub const CHANNEL_PROPERTY: u8 = 8;
pub const RESPONSE_OK: u32 = 0x8000_0000;

/// Envia o buffer para o canal informado e espera a resposta.
///
/// O buffer deve estar alinhado a 16 bytes. Retorna `true` quando a
/// resposta veio do mesmo canal e com o endereço esperado.
#[cfg(target_arch = "aarch64")]
pub fn call(channel: u8, buffer: *mut u32) -> bool {
    let addr = buffer as usize as u32;
    let message = (addr & !0xF) | (channel as u32 & 0xF);
    unsafe {
        while mmio::read32(MBOX_STATUS) & MBOX_FULL != 0 {
            core::hint::spin_loop();
        }
        mmio::write32(MBOX_WRITE, message);
        loop {
            while mmio::read32(MBOX_STATUS) & MBOX_EMPTY != 0 {
                core::hint::spin_loop();
            }
            if mmio::read32(MBOX_READ) == message {
                return core::ptr::read_volatile(buffer.add(1)) == RESPONSE_OK;
            }
        }
    }
}

#[cfg(not(target_arch = "aarch64"))]
pub fn call(_channel: u8, _buffer: *mut u32) -> bool {
    false
}
