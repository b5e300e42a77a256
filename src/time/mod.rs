//! # ============================================================
//! # Fila de timers e tick de preempção
//! # ============================================================
//!
//! Fila ordenada por expiração (valor absoluto do contador físico). O
//! hardware só conhece a cabeça: inserir um timer que vira a nova cabeça
//! reprograma o compare. O handler de IRQ desliga o timer, reabilita as
//! IRQs gerais cedo para não afamar outras fontes, drena tudo que já
//! expirou e rearma para a próxima expiração pendente.
//!
//! O timer periódico de preempção não escalona nada diretamente: só
//! levanta a flag consultada no fim do tratamento de IRQ, de modo que a
//! troca de tarefa acontece num ponto seguro, nunca no meio do handler.

use crate::arch::{timer as hw, IrqGuard};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;

pub type TimerCallback = fn(&'static str);

struct Timer {
    expires: u64,
    callback: TimerCallback,
    msg: &'static str,
}

/// Ordenada por `expires` crescente; o índice 0 é a próxima a vencer.
static TIMERS: Mutex<Vec<Timer>> = Mutex::new(Vec::new());

static RESCHEDULE: AtomicBool = AtomicBool::new(false);

/// Divisor da fatia de preempção: freq >> 5 dá um tick de ~31 ms.
const PREEMPT_SHIFT: u32 = 5;

fn preempt_tick(_msg: &'static str) {
    RESCHEDULE.store(true, Ordering::Relaxed);
    add_timer(preempt_tick, "", hw::freq() >> PREEMPT_SHIFT);
}

/// Arma o tick periódico de preempção e liga o timer do core.
pub fn init() {
    add_timer(preempt_tick, "", hw::freq() >> PREEMPT_SHIFT);
    crate::kinfo!("(TIME) Tick de preempcao armado, freq=", hw::freq() as usize);
}

/// Agenda `callback` para daqui a `ticks` do contador físico.
pub fn add_timer(callback: TimerCallback, msg: &'static str, ticks: u64) {
    let _irq = IrqGuard::new();
    let now = hw::now();
    let timer = Timer {
        expires: now + ticks,
        callback,
        msg,
    };

    let mut timers = TIMERS.lock();
    let pos = timers
        .iter()
        .position(|t| t.expires > timer.expires)
        .unwrap_or(timers.len());
    let new_head = pos == 0;
    timers.insert(pos, timer);

    if new_head {
        hw::set_compare(timers[0].expires);
    }
    hw::enable();
}

/// Agenda a impressão de `msg` daqui a `secs` segundos.
pub fn set_timeout(msg: &'static str, secs: u64) {
    add_timer(print_expired, msg, secs * hw::freq());
}

fn print_expired(msg: &'static str) {
    crate::klog!("Timer expirado: ");
    crate::klog!(msg);
    crate::knl!();
}

/// Tratamento da IRQ do timer do core.
pub fn handle_timer_irq() {
    hw::disable();
    // Outras fontes de IRQ nao esperam a drenagem.
    crate::arch::irq::enable();

    loop {
        let expired = {
            let mut timers = TIMERS.lock();
            let now = hw::now();
            if timers.first().is_some_and(|t| t.expires <= now) {
                Some(timers.remove(0))
            } else {
                None
            }
        };
        // Callback roda fora do lock; pode inserir timers novos.
        match expired {
            Some(timer) => (timer.callback)(timer.msg),
            None => break,
        }
    }

    let timers = TIMERS.lock();
    if let Some(head) = timers.first() {
        hw::set_compare(head.expires);
        hw::enable();
    }
}

/// Consome a flag de preempção; consultada só no fim do tratamento de
/// IRQ.
pub fn take_reschedule() -> bool {
    RESCHEDULE.swap(false, Ordering::Relaxed)
}

#[cfg(feature = "self_test")]
pub mod test {
    use super::*;
    use crate::klib::test_framework::{run_test_suite, TestCase, TestResult};
    use crate::test_assert;

    fn noop(_msg: &'static str) {}

    /// Inserções fora de ordem ficam ordenadas por expiração.
    fn test_sorted_insertion() -> TestResult {
        let _irq = IrqGuard::new();
        hw::disable();

        add_timer(noop, "c", 3_000_000);
        add_timer(noop, "a", 1_000_000);
        add_timer(noop, "b", 2_000_000);

        {
            let timers = TIMERS.lock();
            for pair in timers.windows(2) {
                test_assert!(
                    pair[0].expires <= pair[1].expires,
                    "(TIME-TEST) fila desordenada"
                );
            }
        }

        // Limpa os timers de teste, preservando os demais.
        let mut timers = TIMERS.lock();
        timers.retain(|t| t.callback as usize != noop as usize);
        TestResult::Passed
    }

    /// set_timeout converte segundos em ticks do contador físico.
    fn test_set_timeout_schedules() -> TestResult {
        let _irq = IrqGuard::new();
        hw::disable();

        let before = hw::now();
        set_timeout("st_timeout", 2);

        let scheduled = {
            let timers = TIMERS.lock();
            timers
                .iter()
                .any(|t| t.msg == "st_timeout" && t.expires >= before + 2 * hw::freq())
        };
        test_assert!(scheduled, "(TIME-TEST) timeout nao agendado");

        let mut timers = TIMERS.lock();
        timers.retain(|t| t.msg != "st_timeout");
        TestResult::Passed
    }

    pub fn run() {
        const TESTS: &[TestCase] = &[
            TestCase {
                name: "sorted_insertion",
                func: test_sorted_insertion,
            },
            TestCase {
                name: "set_timeout_schedules",
                func: test_set_timeout_schedules,
            },
        ];
        run_test_suite("time", TESTS);
    }
}
