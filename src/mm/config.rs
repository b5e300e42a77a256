//! Constantes do subsistema de memória física.

/// Tamanho de página.
pub const PAGE_SIZE: usize = 4096;

/// Extensão total da arena gerenciada, a partir de `arena_base()`.
#[cfg(target_arch = "aarch64")]
pub const MEMORY_SIZE: usize = 0x1000_0000;

/// Fora do alvo a arena encolhe para um único bloco de ordem máxima.
#[cfg(not(target_arch = "aarch64"))]
pub const MEMORY_SIZE: usize = MAX_BLOCK_PAGES * PAGE_SIZE;

/// Base física da arena de páginas.
#[cfg(target_arch = "aarch64")]
#[inline]
pub fn arena_base() -> usize {
    0x0
}

/// Em execução hospedada a arena é memória estática de verdade: o kmem
/// cache escreve links de lista livre dentro das próprias páginas.
#[cfg(not(target_arch = "aarch64"))]
pub fn arena_base() -> usize {
    use core::cell::UnsafeCell;

    #[repr(C, align(4096))]
    struct HostArena(UnsafeCell<[u8; MEMORY_SIZE]>);
    // Escritas são serializadas pelo Mutex da fachada de alocação.
    unsafe impl Sync for HostArena {}
    static HOST_ARENA: HostArena = HostArena(UnsafeCell::new([0; MEMORY_SIZE]));

    HOST_ARENA.0.get() as usize
}

/// Número de registros de página na arena.
pub const PAGE_COUNT: usize = MEMORY_SIZE / PAGE_SIZE;

/// Número de listas livres do buddy (ordens 0..MAX_ORDER-1).
pub const MAX_ORDER: usize = 14;

/// Maior bloco possível, em páginas.
pub const MAX_BLOCK_PAGES: usize = 1 << (MAX_ORDER - 1);

/// Menor classe do kmem cache, em bytes.
pub const MIN_CHUNK_SIZE: usize = 16;

/// Maior classe do kmem cache; acima disso o pedido vai direto ao buddy.
pub const MAX_CHUNK_SIZE: usize = 128;

/// log2 da menor classe (16 bytes).
pub const MIN_CACHE_ORDER: usize = 4;

/// Número de classes de tamanho (16, 32, 64, 128).
pub const CACHE_CLASS_COUNT: usize = 4;

/// Bytes do cabeçalho intrusivo que precede cada chunk do kmem cache.
pub const CHUNK_HEADER_SIZE: usize = 16;

/// Capacidade do alocador bump de boot.
pub const BUMP_ARENA_SIZE: usize = 64 * 1024;
