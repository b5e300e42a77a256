//! # ============================================================
//! # Bloco de controle de tarefa
//! # ============================================================

use crate::arch::CpuContext;
use crate::fs::vfs::{File, Vnode};
use crate::sched::config::{DEFAULT_PRIORITY, FD_TABLE_SIZE, SIG_COUNT, THREAD_STACK_SIZE};
use crate::sched::signal::SignalHandler;
use crate::sys::KernelError;
use alloc::sync::Arc;

pub type TaskId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Ready,
    Running,
    Blocked,
    Exited,
}

/// Pilha de tamanho fixo saída de `kalloc`, devolvida no drop.
pub struct Stack {
    base: usize,
}

impl Stack {
    pub fn alloc() -> Result<Self, KernelError> {
        let base = crate::mm::kalloc(THREAD_STACK_SIZE)?;
        Ok(Stack { base })
    }

    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    /// Topo da pilha (cresce para baixo).
    #[inline]
    pub fn top(&self) -> usize {
        self.base + THREAD_STACK_SIZE
    }

    /// O endereço cai dentro desta pilha?
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr < self.top()
    }

    /// Copia o conteúdo inteiro da outra pilha para esta.
    pub fn copy_from(&mut self, other: &Stack) {
        unsafe {
            core::ptr::copy_nonoverlapping(
                other.base as *const u8,
                self.base as *mut u8,
                THREAD_STACK_SIZE,
            );
        }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        crate::mm::kfree(self.base);
    }
}

pub struct Task {
    pub id: TaskId,
    pub state: TaskState,
    pub counter: i64,
    pub priority: i64,
    pub preempt_count: i64,
    pub context: CpuContext,
    pub kernel_stack: Stack,
    pub user_stack: Stack,

    // Sinais
    pub pending_signals: u32,
    pub handlers: [SignalHandler; SIG_COUNT],
    pub signal_frame: Option<crate::arch::TrapFrame>,
    pub handler_stack: Option<Stack>,

    // Estado de VFS por tarefa
    pub cwd: Option<Arc<Vnode>>,
    pub files: [Option<File>; FD_TABLE_SIZE],

    /// Imagem de programa carregada por exec. Compartilhada com filhos
    /// de fork, que executam o mesmo código no mesmo lugar.
    pub program: Option<Arc<[u8]>>,
}

impl Task {
    /// Monta um bloco de controle com pilhas novas. O contexto salvo é
    /// zerado; quem cria decide onde a tarefa começa.
    pub fn new(id: TaskId) -> Result<Self, KernelError> {
        let kernel_stack = Stack::alloc()?;
        let user_stack = Stack::alloc()?;
        Ok(Task {
            id,
            state: TaskState::Ready,
            counter: DEFAULT_PRIORITY,
            priority: DEFAULT_PRIORITY,
            preempt_count: 0,
            context: CpuContext::zeroed(),
            kernel_stack,
            user_stack,
            pending_signals: 0,
            handlers: crate::sched::signal::default_table(),
            signal_frame: None,
            handler_stack: None,
            cwd: None,
            files: core::array::from_fn(|_| None),
            program: None,
        })
    }

    /// Abre o console nos descritores 0, 1 e 2. Falha vira warn: a
    /// tarefa continua utilizável, só sem console.
    pub fn bind_console(&mut self) {
        for fd in 0..3 {
            match crate::fs::vfs::open(crate::sched::config::CONSOLE_PATH, 0) {
                Ok(file) => self.files[fd] = Some(file),
                Err(err) => {
                    crate::kwarn!("(SCHED) Console indisponivel para fd=", fd);
                    crate::kwarn!(err.as_str());
                    return;
                }
            }
        }
    }

    /// Primeiro slot livre da tabela de descritores.
    pub fn free_fd(&self) -> Option<usize> {
        self.files.iter().position(|slot| slot.is_none())
    }
}
