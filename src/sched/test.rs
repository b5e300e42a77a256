//! Self tests do scheduler, rodados no boot a partir da tarefa idle.

use crate::klib::test_framework::{run_test_suite, TestCase, TestResult};
use crate::sched::{scheduler, signal};
use crate::test_assert;

fn noop_thread() {
    crate::sched::exit_current();
}

/// N threads + idle: M rodadas de schedule nunca deixam a tarefa
/// corrente duplicada nas filas.
fn test_running_never_queued() -> TestResult {
    let mut created = [0u32; 4];
    for slot in created.iter_mut() {
        match scheduler::create_thread(noop_thread) {
            Ok(id) => *slot = id,
            Err(_) => return TestResult::Failed,
        }
    }

    for _ in 0..32 {
        crate::sched::schedule();
        test_assert!(
            !scheduler::current_in_queues(),
            "(SCHED-TEST) corrente duplicada em fila"
        );
    }

    // As threads noop ja sairam; recolhe o que sobrou. kill na propria
    // tarefa corrente nao retornaria.
    for &id in created.iter() {
        if scheduler::current_id() == Some(id) {
            continue;
        }
        let _ = scheduler::kill(id);
    }
    scheduler::reap_zombies();
    TestResult::Passed
}

/// Tarefa morta vai para a fila de zumbis e some depois do reap.
fn test_kill_and_reap() -> TestResult {
    let id = match scheduler::create_thread(noop_thread) {
        Ok(id) => id,
        Err(_) => return TestResult::Failed,
    };

    let (_, _, zombies_before) = scheduler::queue_depths();
    test_assert!(scheduler::kill(id).is_ok());
    let (_, _, zombies_after) = scheduler::queue_depths();
    test_assert!(zombies_after == zombies_before + 1, "(SCHED-TEST) zumbi nao enfileirado");

    scheduler::reap_zombies();
    let (_, _, zombies_final) = scheduler::queue_depths();
    test_assert!(zombies_final == 0, "(SCHED-TEST) zumbis sobraram");

    // O id nao existe mais em lugar nenhum.
    test_assert!(scheduler::with_task(id, |_| ()).is_err());
    TestResult::Passed
}

/// kill de pid inexistente falha com NotFound e nao mexe nas filas.
fn test_kill_missing() -> TestResult {
    let before = scheduler::queue_depths();
    test_assert!(scheduler::kill(9999).is_err());
    test_assert!(scheduler::queue_depths() == before);
    TestResult::Passed
}

/// sigkill marca o bit pendente; o checkpoint seguinte da tarefa alvo
/// aplica o handler fatal sem handler de usuario nenhum.
fn test_signal_default_kill_pending() -> TestResult {
    let id = match scheduler::create_thread(noop_thread) {
        Ok(id) => id,
        Err(_) => return TestResult::Failed,
    };

    test_assert!(signal::send(id, crate::sched::config::SIGKILL).is_ok());
    let pending = match scheduler::with_task(id, |t| t.pending_signals) {
        Ok(p) => p,
        Err(_) => return TestResult::Failed,
    };
    test_assert!(pending & (1 << crate::sched::config::SIGKILL) != 0);

    // O checkpoint em si nao e acionavel daqui: no slot DefaultKill,
    // check_pending termina em exit_current, que so devolve o controle
    // por troca de contexto real. Confere-se entao que a tabela da
    // tarefa alvo leva o sinal pendente ao handler fatal.
    let fatal = scheduler::with_task(id, |t| t.handlers[crate::sched::config::SIGKILL]);
    test_assert!(
        fatal == Ok(signal::SignalHandler::DefaultKill),
        "(SCHED-TEST) slot fatal remapeado"
    );

    // Sinal fora do intervalo e pid inexistente sao rejeitados.
    test_assert!(signal::send(id, 32).is_err());
    test_assert!(signal::send(9999, 1).is_err());

    let _ = scheduler::kill(id);
    scheduler::reap_zombies();
    TestResult::Passed
}

pub fn run() {
    const TESTS: &[TestCase] = &[
        TestCase {
            name: "running_never_queued",
            func: test_running_never_queued,
        },
        TestCase {
            name: "kill_and_reap",
            func: test_kill_and_reap,
        },
        TestCase {
            name: "kill_missing",
            func: test_kill_missing,
        },
        TestCase {
            name: "signal_default_kill_pending",
            func: test_signal_default_kill_pending,
        },
    ];
    run_test_suite("sched", TESTS);
}
