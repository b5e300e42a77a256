//! Framework de testes do kernel

use core::sync::atomic::{AtomicUsize, Ordering};

// Acumula falhas entre suites para o veredito final do boot.
static FAILURES: AtomicUsize = AtomicUsize::new(0);

/// Total de falhas acumuladas por todas as suites já executadas.
pub fn total_failures() -> usize {
    FAILURES.load(Ordering::Relaxed)
}

/// Resultado de teste
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TestResult {
    Passed,
    Failed,
    Skipped,
}

/// Um caso de teste
pub struct TestCase {
    pub name: &'static str,
    pub func: fn() -> TestResult,
}

/// Executa suite de testes
pub fn run_test_suite(name: &str, tests: &[TestCase]) -> (usize, usize, usize) {
    crate::klog!("\x1b[1m=== Suite: ");
    crate::klog!(name);
    crate::klog!(" ===\x1b[0m");
    crate::knl!();

    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;

    for test in tests {
        let result = (test.func)();
        match result {
            TestResult::Passed => {
                crate::kok!(test.name);
                passed += 1;
            }
            TestResult::Failed => {
                crate::kfail!(test.name);
                failed += 1;
            }
            TestResult::Skipped => {
                crate::kwarn!(test.name);
                skipped += 1;
            }
        }
    }

    crate::klog!("Resultados: passed=", passed, " failed=", failed);
    crate::knl!();
    FAILURES.fetch_add(failed, Ordering::Relaxed);
    (passed, failed, skipped)
}

/// Compara e registra a falha com o valor observado.
#[macro_export]
macro_rules! test_assert {
    ($cond:expr) => {{
        if !$cond {
            return $crate::klib::test_framework::TestResult::Failed;
        }
    }};
    ($cond:expr, $msg:expr) => {{
        if !$cond {
            $crate::kerror!($msg);
            return $crate::klib::test_framework::TestResult::Failed;
        }
    }};
}

/// Compara dois valores e registra ambos na falha.
#[macro_export]
macro_rules! test_assert_eq {
    ($left:expr, $right:expr) => {{
        let l = $left;
        let r = $right;
        if l != r {
            $crate::klog!("  esperado=", r as usize, " obtido=", l as usize);
            $crate::knl!();
            return $crate::klib::test_framework::TestResult::Failed;
        }
    }};
}
