//! # ============================================================
//! # Entrega adiada de sinais
//! # ============================================================
//!
//! Cada tarefa carrega uma máscara de sinais pendentes. Ninguém entrega
//! sinal no meio da execução: a drenagem acontece só no checkpoint de
//! retorno de trap para o modo usuário, varrendo a máscara do bit mais
//! baixo para o mais alto.
//!
//! Handlers padrão rodam direto em modo kernel. Handler customizado
//! exige palco: o trap frame original vai para o slot `signal_frame` da
//! tarefa, uma pilha nova é alocada para a invocação, e o frame corrente
//! é reescrito para que o eret caia no wrapper de usuário. O wrapper
//! chama o handler e conclui com a syscall sigreturn, que libera a pilha
//! e restaura o frame original byte a byte.

use crate::arch::TrapFrame;
use crate::sched::config::{SIGKILL, SIG_COUNT};
use crate::sched::scheduler;
use crate::sched::task::{Stack, TaskId};
use crate::sys::KernelError;

/// O que fazer quando um sinal é entregue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalHandler {
    /// Termina a tarefa (padrão do slot SIGKILL).
    DefaultKill,
    /// Loga e segue a vida (padrão dos demais).
    DefaultLog,
    /// Função registrada pelo usuário, executada em EL0.
    Custom(u64),
}

/// Tabela inicial de handlers de uma tarefa nova.
pub fn default_table() -> [SignalHandler; SIG_COUNT] {
    let mut table = [SignalHandler::DefaultLog; SIG_COUNT];
    table[SIGKILL] = SignalHandler::DefaultKill;
    table
}

/// Marca `sig` como pendente em `pid`.
pub fn send(pid: TaskId, sig: usize) -> Result<(), KernelError> {
    if sig >= SIG_COUNT {
        crate::kwarn!("(SIG) Numero de sinal invalido=", sig);
        return Err(KernelError::InvalidArgument);
    }
    scheduler::with_task(pid, |task| {
        task.pending_signals |= 1 << sig;
    })
    .map_err(|err| {
        crate::kwarn!("(SIG) sigkill: tarefa nao achada, pid=", pid);
        err
    })
}

/// Registra um handler customizado para `sig` na tarefa corrente e
/// devolve o endereço do handler anterior (0 para os padrões).
pub fn register(sig: usize, handler_addr: u64) -> Result<u64, KernelError> {
    if sig >= SIG_COUNT {
        return Err(KernelError::InvalidArgument);
    }
    scheduler::with_current(|task| {
        let old = match task.handlers[sig] {
            SignalHandler::Custom(addr) => addr,
            _ => 0,
        };
        task.handlers[sig] = SignalHandler::Custom(handler_addr);
        old
    })
}

/// Checkpoint de entrega: drena a máscara pendente da tarefa corrente.
///
/// Handler padrão é tratado aqui mesmo e a varredura continua. Handler
/// customizado para a drenagem: o frame já foi reescrito para o wrapper
/// e os sinais restantes esperam o próximo checkpoint.
pub fn check_pending(frame: &mut TrapFrame) {
    loop {
        let staged = {
            let Ok(next) = scheduler::with_current(|task| {
                if task.pending_signals == 0 {
                    return None;
                }
                let sig = task.pending_signals.trailing_zeros() as usize;
                task.pending_signals &= !(1 << sig);
                Some((sig, task.handlers[sig]))
            }) else {
                return;
            };
            let Some((sig, handler)) = next else {
                return;
            };

            match handler {
                SignalHandler::DefaultKill => {
                    crate::kinfo!("(SIG) Handler padrao fatal, sinal=", sig);
                    scheduler::exit_current();
                }
                SignalHandler::DefaultLog => {
                    crate::kinfo!("(SIG) Sinal ignorado por padrao=", sig);
                    false
                }
                SignalHandler::Custom(addr) => stage_custom_handler(frame, sig, addr),
            }
        };
        if staged {
            return;
        }
    }
}

/// Prepara o frame corrente para executar o handler em EL0. Retorna
/// true quando o palco foi montado (a drenagem deve parar).
fn stage_custom_handler(frame: &mut TrapFrame, sig: usize, handler_addr: u64) -> bool {
    let stack = match Stack::alloc() {
        Ok(stack) => stack,
        Err(_) => {
            crate::kerror!("(SIG) Sem memoria para pilha de handler, sinal=", sig);
            return false;
        }
    };

    let staged = scheduler::with_current(|task| {
        task.signal_frame = Some(*frame);
        let top = stack.top() as u64;
        task.handler_stack = Some(stack);

        frame.elr_el1 = signal_wrapper_addr();
        frame.spsr_el1 = crate::arch::aarch64::trap::SPSR_EL0_IRQ_ON;
        frame.sp_el0 = top;
        frame.regs[0] = handler_addr;
    });

    match staged {
        Ok(()) => {
            crate::kdebug!("(SIG) Handler customizado montado, sinal=", sig);
            true
        }
        Err(_) => false,
    }
}

/// Desfaz o palco do handler: libera a pilha temporária e restaura o
/// trap frame salvo, retomando exatamente onde o sinal interrompeu.
pub fn sigreturn(frame: &mut TrapFrame) {
    let restored = scheduler::with_current(|task| {
        drop(task.handler_stack.take());
        task.signal_frame.take()
    });
    match restored {
        Ok(Some(saved)) => *frame = saved,
        Ok(None) => {
            crate::kwarn!("(SIG) sigreturn sem frame salvo");
        }
        Err(_) => {}
    }
}

/// Wrapper executado em EL0: chama o handler (endereço em x0) e conclui
/// com a syscall sigreturn.
#[cfg(target_arch = "aarch64")]
fn signal_wrapper_addr() -> u64 {
    extern "C" {
        fn signal_handler_wrapper();
    }
    signal_handler_wrapper as usize as u64
}

#[cfg(not(target_arch = "aarch64"))]
fn signal_wrapper_addr() -> u64 {
    0
}

#[cfg(target_arch = "aarch64")]
core::arch::global_asm!(
    r#"
.section .text
.global signal_handler_wrapper
signal_handler_wrapper:
    blr x0
    mov x8, #10
    svc #0
"#
);
