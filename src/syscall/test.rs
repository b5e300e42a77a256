//! Self tests da camada de syscall, atravessando o dispatcher com trap
//! frames montados à mão. Rodam com o VFS e o scheduler já de pé.

use crate::arch::TrapFrame;
use crate::fs::config::{O_CREAT, SEEK_SET};
use crate::klib::test_framework::{run_test_suite, TestCase, TestResult};
use crate::sys::KernelError;
use crate::syscall::numbers::*;
use crate::test_assert;

fn frame_for(number: u64, args: &[u64]) -> TrapFrame {
    let mut frame = TrapFrame::zeroed();
    frame.regs[8] = number;
    for (i, &arg) in args.iter().enumerate() {
        frame.regs[i] = arg;
    }
    frame
}

fn ret_of(frame: &TrapFrame) -> isize {
    frame.regs[0] as isize
}

/// getpid devolve o id da tarefa corrente.
fn test_getpid_dispatch() -> TestResult {
    let mut frame = frame_for(SYS_GETPID, &[]);
    crate::syscall::dispatch(&mut frame);
    let id = match crate::sched::current_id() {
        Some(id) => id,
        None => return TestResult::Failed,
    };
    test_assert!(ret_of(&frame) == id as isize);
    TestResult::Passed
}

/// Número desconhecido escreve o erro no slot de retorno em vez de
/// deixar lixo.
fn test_unknown_syscall() -> TestResult {
    let mut frame = frame_for(99, &[]);
    frame.regs[0] = 0xDEAD;
    crate::syscall::dispatch(&mut frame);
    test_assert!(ret_of(&frame) == KernelError::NoSuchSyscall.as_isize());
    TestResult::Passed
}

/// mkdir, open com create, write, seek, read e close, tudo pela ABI.
fn test_file_round_trip() -> TestResult {
    let dir = b"/st_sys\0";
    let mut frame = frame_for(SYS_MKDIR, &[dir.as_ptr() as u64]);
    crate::syscall::dispatch(&mut frame);
    test_assert!(ret_of(&frame) == 0, "(SYS-TEST) mkdir falhou");

    let path = b"/st_sys/dados\0";
    let mut frame = frame_for(SYS_OPEN, &[path.as_ptr() as u64, O_CREAT as u64]);
    crate::syscall::dispatch(&mut frame);
    let fd = ret_of(&frame);
    test_assert!(fd >= 0, "(SYS-TEST) open falhou");
    let fd = fd as u64;

    let payload = b"ember";
    let mut frame = frame_for(SYS_WRITE, &[fd, payload.as_ptr() as u64, payload.len() as u64]);
    crate::syscall::dispatch(&mut frame);
    test_assert!(ret_of(&frame) == payload.len() as isize);

    let mut frame = frame_for(SYS_LSEEK64, &[fd, 0, SEEK_SET as u64]);
    crate::syscall::dispatch(&mut frame);
    test_assert!(ret_of(&frame) == 0);

    let mut back = [0u8; 5];
    let mut frame = frame_for(SYS_READ, &[fd, back.as_mut_ptr() as u64, back.len() as u64]);
    crate::syscall::dispatch(&mut frame);
    test_assert!(ret_of(&frame) == payload.len() as isize);
    test_assert!(&back == payload, "(SYS-TEST) conteudo divergiu");

    let mut frame = frame_for(SYS_CLOSE, &[fd]);
    crate::syscall::dispatch(&mut frame);
    test_assert!(ret_of(&frame) == 0);

    // Depois do close o descritor está vago.
    let mut frame = frame_for(SYS_WRITE, &[fd, payload.as_ptr() as u64, payload.len() as u64]);
    crate::syscall::dispatch(&mut frame);
    test_assert!(ret_of(&frame) < 0);
    TestResult::Passed
}

/// chdir muda a base dos caminhos relativos da tarefa.
fn test_chdir_relative_paths() -> TestResult {
    let dir = b"/st_sys\0";
    let mut frame = frame_for(SYS_CHDIR, &[dir.as_ptr() as u64]);
    crate::syscall::dispatch(&mut frame);
    test_assert!(ret_of(&frame) == 0, "(SYS-TEST) chdir falhou");

    let rel = b"relativo\0";
    let mut frame = frame_for(SYS_OPEN, &[rel.as_ptr() as u64, O_CREAT as u64]);
    crate::syscall::dispatch(&mut frame);
    let fd = ret_of(&frame);
    test_assert!(fd >= 0);

    test_assert!(crate::fs::vfs::lookup("/st_sys/relativo").is_ok());

    let mut frame = frame_for(SYS_CLOSE, &[fd as u64]);
    crate::syscall::dispatch(&mut frame);
    test_assert!(ret_of(&frame) == 0);

    // Volta para a raiz para não contaminar as outras suites.
    let root = b"/\0";
    let mut frame = frame_for(SYS_CHDIR, &[root.as_ptr() as u64]);
    crate::syscall::dispatch(&mut frame);
    test_assert!(ret_of(&frame) == 0);
    TestResult::Passed
}

/// O filho de fork nasce com o mesmo frame da mãe, exceto x0 = 0; a
/// mãe recebe o id do filho.
fn test_fork_symmetry() -> TestResult {
    let mut frame = frame_for(SYS_FORK, &[]);
    frame.regs[5] = 0x51AC;
    frame.elr_el1 = 0x4000;
    crate::syscall::dispatch(&mut frame);

    let child = ret_of(&frame);
    test_assert!(child > 0, "(SYS-TEST) fork falhou");

    let parent_frame = frame;
    let mirrored = crate::sched::scheduler::with_task(child as u32, |task| {
        let child_frame = unsafe { &*(task.context.sp as usize as *const TrapFrame) };
        child_frame.regs[0] == 0
            && child_frame.regs[5] == parent_frame.regs[5]
            && child_frame.elr_el1 == parent_frame.elr_el1
            && child_frame.spsr_el1 == parent_frame.spsr_el1
    });
    test_assert!(mirrored == Ok(true), "(SYS-TEST) frame do filho divergiu");

    test_assert!(crate::sched::scheduler::kill(child as u32).is_ok());
    crate::sched::reap_zombies();
    TestResult::Passed
}

/// Ponteiro nulo e descritor inválido são recusados sem pânico.
fn test_bad_arguments() -> TestResult {
    let mut frame = frame_for(SYS_OPEN, &[0, 0]);
    crate::syscall::dispatch(&mut frame);
    test_assert!(ret_of(&frame) == KernelError::InvalidArgument.as_isize());

    let buf = [0u8; 4];
    let mut frame = frame_for(SYS_WRITE, &[9999, buf.as_ptr() as u64, buf.len() as u64]);
    crate::syscall::dispatch(&mut frame);
    test_assert!(ret_of(&frame) < 0);
    TestResult::Passed
}

pub fn run() {
    const TESTS: &[TestCase] = &[
        TestCase {
            name: "getpid_dispatch",
            func: test_getpid_dispatch,
        },
        TestCase {
            name: "unknown_syscall",
            func: test_unknown_syscall,
        },
        TestCase {
            name: "file_round_trip",
            func: test_file_round_trip,
        },
        TestCase {
            name: "chdir_relative_paths",
            func: test_chdir_relative_paths,
        },
        TestCase {
            name: "fork_symmetry",
            func: test_fork_symmetry,
        },
        TestCase {
            name: "bad_arguments",
            func: test_bad_arguments,
        },
    ];
    run_test_suite("syscall", TESTS);
}
