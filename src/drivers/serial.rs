//! # ============================================================
//! # Driver da mini UART (BCM2837, canal serial primário)
//! # ============================================================
//!
//! Saída por polling: espera o bit "transmitter empty" do LSR antes
//! de escrever cada byte. Entrada idem com o bit "data ready".
//! Os `emit_*` são as primitivas usadas pelos macros de log.

#![cfg_attr(not(target_arch = "aarch64"), allow(dead_code))]

#[cfg(target_arch = "aarch64")]
use crate::drivers::mmio;

const MMIO_BASE: usize = 0x3F00_0000;

const GPFSEL1: usize = MMIO_BASE + 0x0020_0004;
const GPPUD: usize = MMIO_BASE + 0x0020_0094;
const GPPUDCLK0: usize = MMIO_BASE + 0x0020_0098;

const AUX_ENABLES: usize = MMIO_BASE + 0x0021_5004;
const AUX_MU_IO: usize = MMIO_BASE + 0x0021_5040;
const AUX_MU_IER: usize = MMIO_BASE + 0x0021_5044;
const AUX_MU_LCR: usize = MMIO_BASE + 0x0021_504C;
const AUX_MU_MCR: usize = MMIO_BASE + 0x0021_5050;
const AUX_MU_LSR: usize = MMIO_BASE + 0x0021_5054;
const AUX_MU_CNTL: usize = MMIO_BASE + 0x0021_5060;
const AUX_MU_BAUD: usize = MMIO_BASE + 0x0021_5068;

const LSR_DATA_READY: u32 = 1 << 0;
const LSR_TX_EMPTY: u32 = 1 << 5;

/// Configura GPIO 14/15 como função alternativa 5 e sobe a mini UART
/// a 115200 baud, 8 bits, sem interrupções.
#[cfg(target_arch = "aarch64")]
pub fn init() {
    unsafe {
        mmio::write32(AUX_ENABLES, 1);
        mmio::write32(AUX_MU_CNTL, 0);
        mmio::write32(AUX_MU_IER, 0);
        mmio::write32(AUX_MU_LCR, 3);
        mmio::write32(AUX_MU_MCR, 0);
        mmio::write32(AUX_MU_BAUD, 270);

        let mut sel = mmio::read32(GPFSEL1);
        sel &= !((7 << 12) | (7 << 15));
        sel |= (2 << 12) | (2 << 15);
        mmio::write32(GPFSEL1, sel);

        mmio::write32(GPPUD, 0);
        delay_cycles(150);
        mmio::write32(GPPUDCLK0, (1 << 14) | (1 << 15));
        delay_cycles(150);
        mmio::write32(GPPUDCLK0, 0);

        mmio::write32(AUX_MU_CNTL, 3);
    }
}

#[cfg(not(target_arch = "aarch64"))]
pub fn init() {}

#[cfg(target_arch = "aarch64")]
fn delay_cycles(n: u32) {
    for _ in 0..n {
        unsafe { core::arch::asm!("nop") };
    }
}

/// Escreve um byte, bloqueando até o transmissor estar livre.
#[cfg(target_arch = "aarch64")]
pub fn putc(c: u8) {
    putc_raw(c);
    if c == b'\n' {
        putc_raw(b'\r');
    }
}

#[cfg(target_arch = "aarch64")]
fn putc_raw(c: u8) {
    unsafe {
        while mmio::read32(AUX_MU_LSR) & LSR_TX_EMPTY == 0 {
            core::hint::spin_loop();
        }
        mmio::write32(AUX_MU_IO, c as u32);
    }
}

// Fora do alvo real a saída vai para o stdout do processo hospedeiro,
// para que o boot simulado e as suites de teste fiquem visíveis.
#[cfg(not(target_arch = "aarch64"))]
pub fn putc(c: u8) {
    extern "C" {
        fn putchar(c: i32) -> i32;
    }
    unsafe {
        putchar(c as i32);
    }
}

/// Lê um byte, bloqueando até haver dado disponível.
#[cfg(target_arch = "aarch64")]
pub fn getc() -> u8 {
    unsafe {
        while mmio::read32(AUX_MU_LSR) & LSR_DATA_READY == 0 {
            core::hint::spin_loop();
        }
        let c = (mmio::read32(AUX_MU_IO) & 0xFF) as u8;
        if c == b'\r' {
            b'\n'
        } else {
            c
        }
    }
}

// Sem hardware, a leitura devolve fim-de-linha para não travar testes.
#[cfg(not(target_arch = "aarch64"))]
pub fn getc() -> u8 {
    b'\n'
}

// ------------------------------------------------------------
// Primitivas de emissão usadas pelos macros de log
// ------------------------------------------------------------

pub fn emit_str(s: &str) {
    for b in s.bytes() {
        putc(b);
    }
}

pub fn emit_nl() {
    putc(b'\n');
}

/// Emite um valor em hexadecimal com prefixo `0x`.
pub fn emit_hex(value: usize) {
    emit_str("0x");
    if value == 0 {
        putc(b'0');
        return;
    }
    let mut started = false;
    for shift in (0..usize::BITS / 4).rev() {
        let nibble = ((value >> (shift * 4)) & 0xF) as u8;
        if nibble != 0 || started {
            started = true;
            putc(if nibble < 10 {
                b'0' + nibble
            } else {
                b'a' + nibble - 10
            });
        }
    }
}

/// Emite um valor em decimal.
pub fn emit_dec(mut value: usize) {
    let mut buf = [0u8; 20];
    let mut i = buf.len();
    loop {
        i -= 1;
        buf[i] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    for &b in &buf[i..] {
        putc(b);
    }
}
