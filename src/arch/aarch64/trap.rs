//! # ============================================================
//! # Entrada de exceções, trap frame e tabela de vetores
//! # ============================================================
//!
//! Toda exceção salva o frame completo na pilha de kernel da tarefa e
//! entrega um ponteiro para o handler em Rust. O caminho de retorno
//! (`__trap_ret`) é compartilhado: é por ele que um filho de fork começa
//! a executar, com o contexto apontando para o frame copiado.

/// Snapshot de registradores capturado na entrada de uma exceção.
///
/// Layout acordado com o assembly dos vetores: x0..x30 contíguos, depois
/// sp_el0, elr_el1 e spsr_el1. 272 bytes, múltiplo de 16.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TrapFrame {
    pub regs: [u64; 31],
    pub sp_el0: u64,
    pub elr_el1: u64,
    pub spsr_el1: u64,
}

impl TrapFrame {
    pub const fn zeroed() -> Self {
        TrapFrame {
            regs: [0; 31],
            sp_el0: 0,
            elr_el1: 0,
            spsr_el1: 0,
        }
    }

    /// Número da syscall, por convenção em x8.
    #[inline]
    pub fn syscall_number(&self) -> u64 {
        self.regs[8]
    }

    /// Argumento de syscall `n` (x0..x5).
    #[inline]
    pub fn arg(&self, n: usize) -> u64 {
        self.regs[n]
    }

    /// Escreve o slot de retorno (x0).
    #[inline]
    pub fn set_return(&mut self, value: isize) {
        self.regs[0] = value as u64;
    }

    /// A exceção veio do modo usuário (EL0)?
    #[inline]
    pub fn from_el0(&self) -> bool {
        self.spsr_el1 & 0xF == 0
    }
}

/// Classe de exceção `svc` vinda de AArch64 (ESR_EL1.EC).
pub const EC_SVC_AARCH64: u64 = 0b010101;

/// SPSR para entrar em EL0 com interrupções habilitadas.
pub const SPSR_EL0_IRQ_ON: u64 = 0;

#[cfg(target_arch = "aarch64")]
core::arch::global_asm!(
    r#"
.macro save_frame
    sub sp, sp, #272
    stp x0, x1, [sp, #16 * 0]
    stp x2, x3, [sp, #16 * 1]
    stp x4, x5, [sp, #16 * 2]
    stp x6, x7, [sp, #16 * 3]
    stp x8, x9, [sp, #16 * 4]
    stp x10, x11, [sp, #16 * 5]
    stp x12, x13, [sp, #16 * 6]
    stp x14, x15, [sp, #16 * 7]
    stp x16, x17, [sp, #16 * 8]
    stp x18, x19, [sp, #16 * 9]
    stp x20, x21, [sp, #16 * 10]
    stp x22, x23, [sp, #16 * 11]
    stp x24, x25, [sp, #16 * 12]
    stp x26, x27, [sp, #16 * 13]
    stp x28, x29, [sp, #16 * 14]
    str x30, [sp, #8 * 30]
    mrs x9, sp_el0
    mrs x10, elr_el1
    stp x9, x10, [sp, #8 * 31]
    mrs x9, spsr_el1
    str x9, [sp, #8 * 33]
.endm

.section .text
.global __trap_ret
__trap_ret:
    ldp x9, x10, [sp, #8 * 31]
    msr sp_el0, x9
    msr elr_el1, x10
    ldr x9, [sp, #8 * 33]
    msr spsr_el1, x9
    ldp x0, x1, [sp, #16 * 0]
    ldp x2, x3, [sp, #16 * 1]
    ldp x4, x5, [sp, #16 * 2]
    ldp x6, x7, [sp, #16 * 3]
    ldp x8, x9, [sp, #16 * 4]
    ldp x10, x11, [sp, #16 * 5]
    ldp x12, x13, [sp, #16 * 6]
    ldp x14, x15, [sp, #16 * 7]
    ldp x16, x17, [sp, #16 * 8]
    ldp x18, x19, [sp, #16 * 9]
    ldp x20, x21, [sp, #16 * 10]
    ldp x22, x23, [sp, #16 * 11]
    ldp x24, x25, [sp, #16 * 12]
    ldp x26, x27, [sp, #16 * 13]
    ldp x28, x29, [sp, #16 * 14]
    ldr x30, [sp, #8 * 30]
    add sp, sp, #272
    eret

// Um filho de fork chega aqui via cpu_switch_to, com sp apontando para
// o trap frame copiado da mãe.
.global ret_from_fork
ret_from_fork:
    b __trap_ret

sync_entry:
    save_frame
    mov x0, sp
    bl handle_sync_exception
    b __trap_ret

irq_entry:
    save_frame
    mov x0, sp
    bl handle_irq_exception
    b __trap_ret

invalid_entry:
    save_frame
    mov x0, sp
    mrs x1, esr_el1
    bl handle_invalid_exception
    b __trap_ret

.macro vector target
    .align 7
    b \target
.endm

.align 11
.global exception_vector_table
exception_vector_table:
    // EL1 com SP_EL0
    vector invalid_entry
    vector invalid_entry
    vector invalid_entry
    vector invalid_entry
    // EL1 com SP_EL1
    vector sync_entry
    vector irq_entry
    vector invalid_entry
    vector invalid_entry
    // EL0 AArch64
    vector sync_entry
    vector irq_entry
    vector invalid_entry
    vector invalid_entry
    // EL0 AArch32 (não suportado)
    vector invalid_entry
    vector invalid_entry
    vector invalid_entry
    vector invalid_entry
"#
);

/// Instala a tabela de vetores em VBAR_EL1.
pub fn init() {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        extern "C" {
            static exception_vector_table: u8;
        }
        let base = &exception_vector_table as *const u8 as u64;
        core::arch::asm!("msr vbar_el1, {}", in(reg) base, options(nomem, nostack));
    }
}

/// Lê a syndrome da última exceção síncrona.
#[cfg(target_arch = "aarch64")]
fn read_esr() -> u64 {
    let esr: u64;
    unsafe {
        core::arch::asm!("mrs {}, esr_el1", out(reg) esr, options(nomem, nostack));
    }
    esr
}

#[cfg(target_arch = "aarch64")]
#[no_mangle]
extern "C" fn handle_sync_exception(frame: *mut TrapFrame) {
    let esr = read_esr();
    let ec = (esr >> 26) & 0x3F;
    let frame = unsafe { &mut *frame };

    if ec == EC_SVC_AARCH64 {
        // Syscalls rodam com IRQs habilitadas para não atrasar o timer.
        super::irq::enable();
        crate::syscall::dispatch(frame);
        super::irq::disable();
    } else {
        crate::kerror!("(TRAP) Excecao sincrona inesperada, ESR=", esr);
        crate::kerror!("(TRAP) ELR=", frame.elr_el1);
    }

    if frame.from_el0() {
        crate::sched::signal::check_pending(frame);
    }
}

#[cfg(target_arch = "aarch64")]
#[no_mangle]
extern "C" fn handle_irq_exception(frame: *mut TrapFrame) {
    let frame = unsafe { &mut *frame };

    if super::timer::irq_source() & super::timer::IRQ_SRC_CNTPNS != 0 {
        crate::time::handle_timer_irq();
    }

    // Preempção só no fim do tratamento, nunca no meio.
    if crate::time::take_reschedule() {
        crate::sched::schedule();
    }

    if frame.from_el0() {
        crate::sched::signal::check_pending(frame);
    }
}

#[cfg(target_arch = "aarch64")]
#[no_mangle]
extern "C" fn handle_invalid_exception(frame: *mut TrapFrame, esr: u64) {
    let frame = unsafe { &mut *frame };
    crate::kerror!("(TRAP) Vetor invalido, ESR=", esr);
    crate::kerror!("(TRAP) ELR=", frame.elr_el1);
    crate::kerror!("(TRAP) SPSR=", frame.spsr_el1);
}
