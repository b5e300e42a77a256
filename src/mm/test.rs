//! Self tests do subsistema de memória, rodados no boot.

use crate::klib::test_framework::{run_test_suite, TestCase, TestResult};
use crate::mm::allocator::ALLOCATOR;
use crate::mm::config::{CACHE_CLASS_COUNT, MAX_CHUNK_SIZE, MAX_ORDER, PAGE_SIZE};
use crate::test_assert;

/// allocate seguido de release restaura o conjunto de blocos livres.
fn test_buddy_round_trip() -> TestResult {
    let mut alloc = ALLOCATOR.lock();
    for size in [1, PAGE_SIZE - 1, PAGE_SIZE, PAGE_SIZE + 1, 8 * PAGE_SIZE, 100 * PAGE_SIZE] {
        let before = alloc.buddy.free_signature();
        let addr = match alloc.buddy.allocate(size) {
            Ok(addr) => addr,
            Err(_) => return TestResult::Failed,
        };
        alloc.buddy.release(addr);
        let after = alloc.buddy.free_signature();
        test_assert!(before == after, "(MM-TEST) round trip divergiu");
    }
    TestResult::Passed
}

/// Alocações vivas nunca se sobrepõem; liberar tudo re-funde a arena.
fn test_buddy_disjoint_and_coalesce() -> TestResult {
    let mut alloc = ALLOCATOR.lock();
    let before = alloc.buddy.free_signature();

    let sizes = [
        PAGE_SIZE,
        3 * PAGE_SIZE,
        PAGE_SIZE / 2,
        16 * PAGE_SIZE,
        5 * PAGE_SIZE,
        PAGE_SIZE,
        64 * PAGE_SIZE,
        2 * PAGE_SIZE,
    ];
    let mut blocks = [(0usize, 0usize); 8];
    for (i, &size) in sizes.iter().enumerate() {
        let addr = match alloc.buddy.allocate(size) {
            Ok(addr) => addr,
            Err(_) => return TestResult::Failed,
        };
        let pages = size.div_ceil(PAGE_SIZE).next_power_of_two();
        blocks[i] = (addr, addr + pages * PAGE_SIZE);
    }

    for i in 0..blocks.len() {
        for j in (i + 1)..blocks.len() {
            let (a0, a1) = blocks[i];
            let (b0, b1) = blocks[j];
            test_assert!(a1 <= b0 || b1 <= a0, "(MM-TEST) blocos sobrepostos");
        }
    }

    for &(start, _) in blocks.iter() {
        alloc.buddy.release(start);
    }
    test_assert!(
        alloc.buddy.free_signature() == before,
        "(MM-TEST) arena nao re-fundiu"
    );
    TestResult::Passed
}

/// release de endereço estranho é um no-op observável.
fn test_buddy_foreign_release() -> TestResult {
    let mut alloc = ALLOCATOR.lock();
    let before = alloc.buddy.free_signature();
    alloc.buddy.release(usize::MAX - PAGE_SIZE);
    alloc.buddy.release(0x80000 + 8);
    let after = alloc.buddy.free_signature();
    test_assert!(before == after);
    TestResult::Passed
}

/// Página reservada nunca é entregue, mesmo com a arena esgotada, e
/// recusa release. Consome uma página da arena em definitivo.
fn test_buddy_reserve_exclusion() -> TestResult {
    let mut alloc = ALLOCATOR.lock();

    // Escolhe uma página comprovadamente livre para reservar.
    let reserved = match alloc.buddy.allocate(PAGE_SIZE) {
        Ok(addr) => addr,
        Err(_) => return TestResult::Failed,
    };
    alloc.buddy.release(reserved);
    alloc.buddy.reserve(reserved, reserved + PAGE_SIZE);
    let after_reserve = alloc.buddy.free_signature();

    // Esgota a arena de cima para baixo. Pedidos do tamanho exato do
    // bloco nunca quebram blocos maiores depois que as ordens acima já
    // secaram, então cada sucesso consome um bloco livre inteiro e o
    // total de blocos cabe num vetor fixo.
    let mut held = [0usize; 128];
    let mut count = 0;
    for order in (0..MAX_ORDER).rev() {
        let size = (1 << order) * PAGE_SIZE;
        loop {
            if count == held.len() {
                return TestResult::Failed;
            }
            match alloc.buddy.allocate(size) {
                Ok(addr) => {
                    held[count] = addr;
                    count += 1;
                }
                Err(_) => break,
            }
        }
    }
    test_assert!(alloc.buddy.allocate(PAGE_SIZE).is_err());
    for &addr in held[..count].iter() {
        test_assert!(addr != reserved, "(MM-TEST) pagina reservada entregue");
    }

    for &addr in held[..count].iter() {
        alloc.buddy.release(addr);
    }
    alloc.buddy.release(reserved);
    test_assert!(
        alloc.buddy.free_signature() == after_reserve,
        "(MM-TEST) reserva nao sobreviveu ao ciclo"
    );
    TestResult::Passed
}

/// Um chunk sai e volta sempre para a classe que o originou; ciclos de
/// alloc/free deixam os comprimentos das listas intactos.
fn test_slab_class_isolation() -> TestResult {
    let mut alloc = ALLOCATOR.lock();

    let mut lens = [0usize; CACHE_CLASS_COUNT];
    for (i, len) in lens.iter_mut().enumerate() {
        *len = alloc.kmem.free_len(i);
    }

    for class_idx in 0..CACHE_CLASS_COUNT {
        let size = alloc.kmem.chunk_size(class_idx);
        let crate::mm::allocator::KernelAllocator {
            ref mut buddy,
            ref mut kmem,
            ..
        } = *alloc;
        let addr = match kmem.allocate(buddy, size) {
            Ok(addr) => addr,
            Err(_) => return TestResult::Failed,
        };

        // Só a classe alvo encolheu.
        for other in 0..CACHE_CLASS_COUNT {
            let expected = if other == class_idx {
                lens[other] - 1
            } else {
                lens[other]
            };
            test_assert!(
                alloc.kmem.free_len(other) == expected,
                "(MM-TEST) classe errada mexida no alloc"
            );
        }

        let tag = alloc.buddy.cache_tag(addr);
        alloc.kmem.release(tag, addr);
        for other in 0..CACHE_CLASS_COUNT {
            test_assert!(
                alloc.kmem.free_len(other) == lens[other],
                "(MM-TEST) comprimento nao restaurado"
            );
        }
    }
    TestResult::Passed
}

/// A fachada roteia pelo tamanho no alloc e pela tag no free.
fn test_facade_tag_dispatch() -> TestResult {
    let mut alloc = ALLOCATOR.lock();

    // Pequeno: deve vir do slab (classe de 64 bytes).
    let slab_len = alloc.kmem.free_len(2);
    let small = match alloc.alloc_bytes(48) {
        Ok(addr) => addr,
        Err(_) => return TestResult::Failed,
    };
    test_assert!(alloc.kmem.free_len(2) == slab_len - 1);
    test_assert!(alloc.buddy.cache_tag(small) >= 0, "(MM-TEST) tag ausente");

    // Grande: deve vir do buddy, sem tag de slab.
    let buddy_sig = alloc.buddy.free_signature();
    let big = match alloc.alloc_bytes(MAX_CHUNK_SIZE + 1) {
        Ok(addr) => addr,
        Err(_) => return TestResult::Failed,
    };
    test_assert!(alloc.buddy.cache_tag(big) < 0, "(MM-TEST) tag indevida");

    // O free decide o caminho sozinho, pela tag.
    alloc.free_bytes(big);
    test_assert!(alloc.buddy.free_signature() == buddy_sig);
    alloc.free_bytes(small);
    test_assert!(alloc.kmem.free_len(2) == slab_len);

    TestResult::Passed
}

/// Tamanho zero é recusado nas duas camadas.
fn test_zero_size_rejected() -> TestResult {
    let mut alloc = ALLOCATOR.lock();
    test_assert!(alloc.buddy.allocate(0).is_err());
    test_assert!(alloc.alloc_bytes(0).is_err());
    TestResult::Passed
}

pub fn run() {
    const TESTS: &[TestCase] = &[
        TestCase {
            name: "buddy_round_trip",
            func: test_buddy_round_trip,
        },
        TestCase {
            name: "buddy_disjoint_and_coalesce",
            func: test_buddy_disjoint_and_coalesce,
        },
        TestCase {
            name: "buddy_foreign_release",
            func: test_buddy_foreign_release,
        },
        TestCase {
            name: "buddy_reserve_exclusion",
            func: test_buddy_reserve_exclusion,
        },
        TestCase {
            name: "slab_class_isolation",
            func: test_slab_class_isolation,
        },
        TestCase {
            name: "facade_tag_dispatch",
            func: test_facade_tag_dispatch,
        },
        TestCase {
            name: "zero_size_rejected",
            func: test_zero_size_rejected,
        },
    ];
    run_test_suite("mm", TESTS);
}
