//! Gerência de memória física: bump de boot, buddy de páginas, kmem
//! cache de objetos pequenos e a fachada `kalloc`/`kfree`.

pub mod allocator;
pub mod buddy;
pub mod bump;
pub mod config;
pub mod kmem;

#[cfg(feature = "self_test")]
pub mod test;

pub use allocator::{kalloc, kfree};

/// Intervalo físico `[start, end)` a excluir da alocação.
#[derive(Debug, Clone, Copy)]
pub struct ReservedRange {
    pub start: usize,
    pub end: usize,
}

/// Sobe o subsistema inteiro na ordem exigida: buddy, reservas de boot,
/// kmem cache. Chamar exatamente uma vez.
pub fn init(reserves: &[ReservedRange]) {
    allocator::init();
    for range in reserves {
        allocator::reserve(range.start, range.end);
    }
    allocator::enable_kmem();
    crate::kinfo!("(MM) Bump de boot consumido=", bump::used());
    crate::kinfo!("(MM) Subsistema de memoria pronto");
}
