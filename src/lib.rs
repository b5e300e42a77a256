//! Ember Kernel Library.
//!
//! Ponto central de exportação dos módulos do kernel.
//! Kernel educacional para Raspberry Pi 3 (AArch64, single-core,
//! endereçamento físico).

#![no_std]

// Habilitar alocação dinâmica (necessário para Vec/Box/Arc).
// O alocador global é o próprio buddy+slab do kernel (ver `mm`).
extern crate alloc;

// --- Módulos de Baixo Nível (Hardware) ---
pub mod arch; // AArch64 (trap frame, context switch, DAIF, core timer)
pub mod drivers; // Colaboradores externos (UART serial, mailbox)

// --- Módulos Centrais (Lógica do Kernel) ---
pub mod boot; // kernel_main e parsing mínimo do device tree
pub mod klib; // Utilitários internos (align, hex, framework de testes)
pub mod logging; // Macros kerror!/kwarn!/kinfo!/kdebug!/ktrace!
pub mod mm; // Gerenciamento de memória (bump, buddy, slab, facade)
pub mod sys; // Definições de sistema (erros)
pub mod time; // Fila de timers e tick de preempção

// --- Subsistemas Avançados ---
pub mod exec; // Carregamento de imagens de programa
pub mod fs; // Sistema de arquivos virtual (VFS) + tmpfs/initramfs
pub mod sched; // Scheduler, tarefas e sinais
pub mod syscall; // Interface com userspace

mod panic;
