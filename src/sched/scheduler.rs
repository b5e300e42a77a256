//! # ============================================================
//! # Scheduler cooperativo com preempção assistida por timer
//! # ============================================================
//!
//! Três filas (ready, wait, zombie) mais o slot `current`. Cada tarefa
//! existe em exatamente um desses lugares; a posse do `Box` é a prova.
//! Toda mutação acontece com IRQs mascaradas e sob o Mutex global, e a
//! troca de contexto em si ocorre com o Mutex já solto.

use crate::arch::{cpu_switch_to, CpuContext, IrqGuard};
use crate::sched::task::{Task, TaskId, TaskState};
use crate::sys::KernelError;
use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use spin::Mutex;

pub struct Scheduler {
    ready: VecDeque<Box<Task>>,
    wait: VecDeque<Box<Task>>,
    zombies: VecDeque<Box<Task>>,
    current: Option<Box<Task>>,
    next_id: TaskId,
}

impl Scheduler {
    const fn new() -> Self {
        Scheduler {
            ready: VecDeque::new(),
            wait: VecDeque::new(),
            zombies: VecDeque::new(),
            current: None,
            next_id: 0,
        }
    }

    fn take_id(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Aplica `f` à tarefa de id `pid`, onde quer que ela esteja.
    fn with_task<R>(&mut self, pid: TaskId, f: impl FnOnce(&mut Task) -> R) -> Option<R> {
        if let Some(cur) = self.current.as_mut() {
            if cur.id == pid {
                return Some(f(cur));
            }
        }
        for queue in [&mut self.ready, &mut self.wait] {
            if let Some(task) = queue.iter_mut().find(|t| t.id == pid) {
                return Some(f(task));
            }
        }
        None
    }
}

pub static SCHEDULER: Mutex<Scheduler> = Mutex::new(Scheduler::new());

/// Cria o scheduler e adota o contexto de boot como tarefa idle: ela é
/// a `current` inicial e garante que sempre existe para onde trocar.
pub fn init() {
    let idle = match Task::new(0) {
        Ok(mut idle) => {
            idle.state = TaskState::Running;
            // O console da idle é ligado pelo boot, depois do VFS subir.
            idle
        }
        Err(err) => {
            crate::kerror!("(SCHED) Sem memoria para a tarefa idle");
            crate::kerror!(err.as_str());
            return;
        }
    };

    let mut sched = SCHEDULER.lock();
    sched.next_id = 1;
    sched.current = Some(Box::new(idle));
    crate::kinfo!("(SCHED) Scheduler pronto, idle=0");
}

/// Cria uma thread de kernel que começa em `entry` e a põe na fila
/// ready. Retorna o id novo.
pub fn create_thread(entry: fn()) -> Result<TaskId, KernelError> {
    let id = {
        let _irq = IrqGuard::new();
        SCHEDULER.lock().take_id()
    };

    let mut task = Task::new(id)?;
    task.context.lr = task_entry_point() as u64;
    task.context.x19 = entry as usize as u64;
    task.context.sp = task.kernel_stack.top() as u64;
    task.context.fp = task.kernel_stack.top() as u64;
    task.bind_console();

    let _irq = IrqGuard::new();
    let mut sched = SCHEDULER.lock();
    // cwd herdado de quem criou.
    if task.cwd.is_none() {
        if let Some(cur) = sched.current.as_ref() {
            task.cwd = cur.cwd.clone();
        }
    }
    sched.ready.push_back(Box::new(task));
    crate::kdebug!("(SCHED) Thread criada, id=", id);
    Ok(id)
}

/// Decide a próxima tarefa e troca o contexto. Com a fila ready vazia,
/// retorna sem trocar.
pub fn schedule() {
    let _irq = IrqGuard::new();

    let pair = {
        let mut sched = SCHEDULER.lock();
        pick_next(&mut sched)
    };

    if let Some((prev_ctx, next_ctx)) = pair {
        unsafe { cpu_switch_to(prev_ctx, next_ctx) };
    }
    // O IrqGuard desta chamada só volta a rodar quando ESTA tarefa for
    // reescalonada; ele restaura a mascara salva na entrada.
}

/// Toda a cirurgia de filas, sob o lock. Devolve os contextos para a
/// troca, que acontece depois de soltar o Mutex.
fn pick_next(sched: &mut Scheduler) -> Option<(*mut CpuContext, *const CpuContext)> {
    let mut next = sched.ready.pop_front()?;

    let mut prev = match sched.current.take() {
        Some(prev) => prev,
        None => {
            // Bootstrap: o contexto corrente adota a primeira tarefa.
            next.state = TaskState::Running;
            sched.current = Some(next);
            return None;
        }
    };

    if next.state == TaskState::Exited {
        // Invariante quebrada: tarefa morta na fila ready.
        crate::kerror!("(SCHED) Tarefa EXITED na fila ready, id=", next.id);
        sched.zombies.push_back(next);
        sched.current = Some(prev);
        return None;
    }

    let prev_ctx = &mut prev.context as *mut CpuContext;
    match prev.state {
        TaskState::Running => {
            prev.state = TaskState::Ready;
            sched.ready.push_back(prev);
        }
        TaskState::Ready => {
            sched.ready.push_back(prev);
        }
        TaskState::Blocked => {
            sched.wait.push_back(prev);
        }
        TaskState::Exited => {
            sched.zombies.push_back(prev);
        }
    }

    next.state = TaskState::Running;
    let next_ctx = &next.context as *const CpuContext;
    sched.current = Some(next);

    Some((prev_ctx, next_ctx))
}

/// Marca a tarefa corrente como terminada e escalona para longe dela.
/// Nunca retorna ao chamador.
pub fn exit_current() -> ! {
    {
        let _irq = IrqGuard::new();
        let mut sched = SCHEDULER.lock();
        if let Some(cur) = sched.current.as_mut() {
            cur.state = TaskState::Exited;
        }
    }
    loop {
        schedule();
    }
}

/// Termina a tarefa `pid`, esteja onde estiver. Matar a si mesmo cai no
/// comportamento de `exit_current`.
pub fn kill(pid: TaskId) -> Result<(), KernelError> {
    let is_self = {
        let _irq = IrqGuard::new();
        let mut sched = SCHEDULER.lock();

        if let Some(cur) = sched.current.as_mut() {
            if cur.id == pid {
                cur.state = TaskState::Exited;
                true
            } else {
                let mut found = false;
                for queue_is_ready in [true, false] {
                    let queue = if queue_is_ready {
                        &mut sched.ready
                    } else {
                        &mut sched.wait
                    };
                    if let Some(idx) = queue.iter().position(|t| t.id == pid) {
                        if let Some(mut task) = queue.remove(idx) {
                            task.state = TaskState::Exited;
                            sched.zombies.push_back(task);
                            found = true;
                        }
                        break;
                    }
                }
                if !found {
                    crate::kwarn!("(SCHED) kill: tarefa nao achada, pid=", pid);
                    return Err(KernelError::NotFound);
                }
                false
            }
        } else {
            return Err(KernelError::InternalInconsistency);
        }
    };

    if is_self {
        exit_current();
    }
    Ok(())
}

/// Recolhe a fila de zumbis, devolvendo pilhas e blocos de controle ao
/// alocador. Roda sempre num contexto que não é o da tarefa recolhida.
pub fn reap_zombies() {
    let drained = {
        let _irq = IrqGuard::new();
        let mut sched = SCHEDULER.lock();
        core::mem::take(&mut sched.zombies)
    };
    for zombie in drained.iter() {
        crate::kdebug!("(SCHED) Zumbi recolhido, id=", zombie.id);
    }
    drop(drained);
}

/// Id da tarefa corrente.
pub fn current_id() -> Option<TaskId> {
    let _irq = IrqGuard::new();
    SCHEDULER.lock().current.as_ref().map(|t| t.id)
}

/// cwd da tarefa corrente, para resolução de caminhos relativos.
pub fn current_cwd() -> Option<Arc<crate::fs::vfs::Vnode>> {
    let _irq = IrqGuard::new();
    SCHEDULER
        .lock()
        .current
        .as_ref()
        .and_then(|t| t.cwd.clone())
}

/// Aplica `f` à tarefa corrente.
pub fn with_current<R>(f: impl FnOnce(&mut Task) -> R) -> Result<R, KernelError> {
    let _irq = IrqGuard::new();
    let mut sched = SCHEDULER.lock();
    match sched.current.as_mut() {
        Some(cur) => Ok(f(cur)),
        None => Err(KernelError::InternalInconsistency),
    }
}

/// Aplica `f` à tarefa `pid`, onde quer que esteja.
pub fn with_task<R>(pid: TaskId, f: impl FnOnce(&mut Task) -> R) -> Result<R, KernelError> {
    let _irq = IrqGuard::new();
    SCHEDULER
        .lock()
        .with_task(pid, f)
        .ok_or(KernelError::NotFound)
}

/// Duplica a tarefa corrente no meio de uma syscall.
///
/// As duas pilhas são copiadas byte a byte; o sp salvo do filho preserva
/// o mesmo deslocamento do topo que o sp vivo da mãe tinha. O trap frame
/// da syscall é copiado para o deslocamento equivalente na pilha de
/// kernel do filho com o slot de retorno zerado e o sp_el0 rebaseado
/// para a pilha de usuário duplicada. O filho começa a rodar pelo
/// caminho normal de retorno de trap; a mãe recebe o id do filho.
pub fn fork(frame: &mut crate::arch::TrapFrame) -> Result<TaskId, KernelError> {
    let _irq = IrqGuard::new();
    let mut sched = SCHEDULER.lock();

    let child_id = {
        let id = sched.next_id;
        sched.next_id += 1;
        id
    };

    let parent = sched
        .current
        .as_ref()
        .ok_or(KernelError::InternalInconsistency)?;

    let mut child = Task::new(child_id)?;
    child.state = TaskState::Ready;
    child.counter = parent.counter;
    child.priority = parent.priority;
    child.preempt_count = parent.preempt_count;
    child.pending_signals = parent.pending_signals;
    child.handlers = parent.handlers;
    child.cwd = parent.cwd.clone();
    child.files = parent.files.clone();
    child.program = parent.program.clone();

    child.kernel_stack.copy_from(&parent.kernel_stack);
    child.user_stack.copy_from(&parent.user_stack);
    child.context = parent.context;

    // O frame desta syscall vive na pilha de kernel da mãe; o filho
    // retoma a partir da cópia dele, no mesmo deslocamento.
    let frame_addr = frame as *const crate::arch::TrapFrame as usize;
    let child_frame_addr = if parent.kernel_stack.contains(frame_addr) {
        child.kernel_stack.base() + (frame_addr - parent.kernel_stack.base())
    } else {
        // Frame fora da pilha (chamada direta de teste): aloja no topo.
        child.kernel_stack.top() - core::mem::size_of::<crate::arch::TrapFrame>()
    };
    let child_frame = child_frame_addr as *mut crate::arch::TrapFrame;
    unsafe {
        *child_frame = *frame;
        (*child_frame).regs[0] = 0;
        let sp_el0 = frame.sp_el0 as usize;
        if parent.user_stack.contains(sp_el0) {
            (*child_frame).sp_el0 =
                (child.user_stack.base() + (sp_el0 - parent.user_stack.base())) as u64;
        }
    }

    child.context.sp = child_frame_addr as u64;
    child.context.fp = child_frame_addr as u64;
    child.context.lr = ret_from_fork_addr() as u64;

    sched.ready.push_back(Box::new(child));
    crate::kdebug!("(SCHED) fork concluido, filho=", child_id);
    Ok(child_id)
}

#[cfg(target_arch = "aarch64")]
fn ret_from_fork_addr() -> usize {
    extern "C" {
        fn ret_from_fork();
    }
    ret_from_fork as usize
}

#[cfg(not(target_arch = "aarch64"))]
fn ret_from_fork_addr() -> usize {
    0
}

/// Ponto de entrada comum das threads de kernel: o trampolim habilita
/// IRQs e salta para a função guardada em x19.
#[cfg(target_arch = "aarch64")]
fn task_entry_point() -> usize {
    extern "C" {
        fn task_entry_trampoline();
    }
    task_entry_trampoline as usize
}

#[cfg(not(target_arch = "aarch64"))]
fn task_entry_point() -> usize {
    0
}

#[cfg(target_arch = "aarch64")]
core::arch::global_asm!(
    r#"
.section .text
.global task_entry_trampoline
task_entry_trampoline:
    msr daifclr, #2
    blr x19
    bl task_exit_fallback
"#
);

/// Uma thread de kernel cujo entry retornou cai aqui e morre limpa.
#[no_mangle]
extern "C" fn task_exit_fallback() -> ! {
    exit_current();
}

// Introspecção usada pelas suites de self test.

/// (tamanhos de ready, wait, zombie) num instante.
pub fn queue_depths() -> (usize, usize, usize) {
    let _irq = IrqGuard::new();
    let sched = SCHEDULER.lock();
    (sched.ready.len(), sched.wait.len(), sched.zombies.len())
}

/// O id corrente aparece em ready ou wait? (nunca deveria)
pub fn current_in_queues() -> bool {
    let _irq = IrqGuard::new();
    let sched = SCHEDULER.lock();
    let Some(cur) = sched.current.as_ref() else {
        return false;
    };
    let id = cur.id;
    sched.ready.iter().chain(sched.wait.iter()).any(|t| t.id == id)
}
