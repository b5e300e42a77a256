//! Binário do kernel.
//!
//! No alvo, `_start` roda no núcleo 0 logo após o firmware: estaciona os
//! núcleos secundários, desce de EL2 para EL1, arma a pilha de boot,
//! zera o BSS e salta para `kernel_main` com o endereço do devicetree
//! ainda em x0. Em execução hospedada o binário sobe os subsistemas
//! sobre a arena estática e roda as suites de self test.

#![cfg_attr(target_arch = "aarch64", no_std)]
#![cfg_attr(target_arch = "aarch64", no_main)]

extern crate ember;

#[cfg(target_arch = "aarch64")]
core::arch::global_asm!(
    r#"
.section ".text.boot"
.global _start
_start:
    // Só o núcleo 0 continua; os demais ficam nas spin tables.
    mrs     x1, mpidr_el1
    and     x1, x1, #3
    cbz     x1, 2f
1:
    wfe
    b       1b

2:
    // O firmware entrega em EL2; o kernel vive em EL1.
    mrs     x1, CurrentEL
    lsr     x1, x1, #2
    cmp     x1, #2
    b.ne    3f
    mov     x1, #(1 << 31)          // EL1 executa em AArch64
    msr     hcr_el2, x1
    mov     x1, #0x3c5              // EL1h, exceções mascaradas
    msr     spsr_el2, x1
    adr     x1, 3f
    msr     elr_el2, x1
    eret

3:
    // Libera FP/SIMD em EL1: o reset de CPACR_EL1 trapeia as cópias
    // vetorizadas que o compilador emite.
    mov     x1, #(3 << 20)
    msr     cpacr_el1, x1
    isb

    ldr     x1, =__stack_top
    mov     sp, x1

    // BSS precisa nascer zerado; o firmware não garante isso.
    ldr     x1, =__bss_start
    ldr     x2, =__bss_end
4:
    cmp     x1, x2
    b.ge    5f
    str     xzr, [x1], #8
    b       4b

5:
    // x0 ainda carrega o endereço do devicetree.
    bl      kernel_main
6:
    wfe
    b       6b
"#
);

#[cfg(not(target_arch = "aarch64"))]
fn main() {
    ember::boot::init_subsystems(0);

    #[cfg(feature = "self_test")]
    {
        ember::boot::run_self_tests();
        if ember::klib::test_framework::total_failures() > 0 {
            std::process::exit(1);
        }
    }
}
