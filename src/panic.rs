//! Panic handler do kernel.
//!
//! Sem core::fmt: o local do pânico sai pela serial com os emissores
//! crus, e o núcleo para num loop de wfe. Em execução hospedada o
//! runtime da plataforma já fornece o handler.

#[cfg(target_arch = "aarch64")]
use core::panic::PanicInfo;

#[cfg(target_arch = "aarch64")]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    use crate::drivers::serial;

    crate::arch::irq::disable();

    serial::emit_str("\x1b[1;31m[PANIC]\x1b[0m ");
    if let Some(location) = info.location() {
        serial::emit_str(location.file());
        serial::emit_str(":");
        serial::emit_dec(location.line() as usize);
    } else {
        serial::emit_str("local desconhecido");
    }
    serial::emit_nl();

    loop {
        unsafe {
            core::arch::asm!("wfe");
        }
    }
}
