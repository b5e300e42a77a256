//! # ============================================================
//! # Contexto de CPU e troca de contexto
//! # ============================================================
//!
//! Apenas os registradores callee-saved são preservados aqui; os demais
//! já foram salvos no trap frame quando a troca acontece dentro de uma
//! exceção, ou são voláteis pela ABI quando a troca é cooperativa.

/// Registradores preservados entre trocas de contexto.
///
/// O layout é parte do contrato com o assembly de `cpu_switch_to`:
/// pares (x19,x20)..(x27,x28), depois (fp,lr), depois sp.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CpuContext {
    pub x19: u64,
    pub x20: u64,
    pub x21: u64,
    pub x22: u64,
    pub x23: u64,
    pub x24: u64,
    pub x25: u64,
    pub x26: u64,
    pub x27: u64,
    pub x28: u64,
    pub fp: u64,
    pub lr: u64,
    pub sp: u64,
}

impl CpuContext {
    pub const fn zeroed() -> Self {
        CpuContext {
            x19: 0,
            x20: 0,
            x21: 0,
            x22: 0,
            x23: 0,
            x24: 0,
            x25: 0,
            x26: 0,
            x27: 0,
            x28: 0,
            fp: 0,
            lr: 0,
            sp: 0,
        }
    }
}

#[cfg(target_arch = "aarch64")]
core::arch::global_asm!(
    r#"
.section .text
.global cpu_switch_to
// x0 = contexto de saída, x1 = contexto de entrada
cpu_switch_to:
    stp x19, x20, [x0, #16 * 0]
    stp x21, x22, [x0, #16 * 1]
    stp x23, x24, [x0, #16 * 2]
    stp x25, x26, [x0, #16 * 3]
    stp x27, x28, [x0, #16 * 4]
    stp x29, x30, [x0, #16 * 5]
    mov x9, sp
    str x9, [x0, #16 * 6]

    ldp x19, x20, [x1, #16 * 0]
    ldp x21, x22, [x1, #16 * 1]
    ldp x23, x24, [x1, #16 * 2]
    ldp x25, x26, [x1, #16 * 3]
    ldp x27, x28, [x1, #16 * 4]
    ldp x29, x30, [x1, #16 * 5]
    ldr x9, [x1, #16 * 6]
    mov sp, x9
    ret
"#
);

#[cfg(target_arch = "aarch64")]
extern "C" {
    /// Salva os callee-saved de `prev`, restaura os de `next` e retoma a
    /// execução no `lr` salvo de `next`. Único ponto de transferência de
    /// controle entre tarefas.
    pub fn cpu_switch_to(prev: *mut CpuContext, next: *const CpuContext);
}

/// Versão simulada para execução fora do alvo: a política de escalonamento
/// continua exercitável, só não há transferência real de controle.
#[cfg(not(target_arch = "aarch64"))]
pub unsafe fn cpu_switch_to(prev: *mut CpuContext, next: *const CpuContext) {
    let _ = (prev, next);
}
