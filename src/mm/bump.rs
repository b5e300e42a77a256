//! Alocador bump de boot.
//!
//! Ponteiro monotônico sobre uma arena estática; nunca devolve memória.
//! Serve apenas o período entre o reset e `mm::init` (rascunho da
//! varredura da devicetree, bookkeeping inicial).

use crate::klib::align::align_up;
use crate::mm::config::BUMP_ARENA_SIZE;
use spin::Mutex;

#[repr(align(16))]
struct BumpArena(core::cell::UnsafeCell<[u8; BUMP_ARENA_SIZE]>);

// Única escrita concorrente possível é serializada por OFFSET.
unsafe impl Sync for BumpArena {}

static ARENA: BumpArena = BumpArena(core::cell::UnsafeCell::new([0; BUMP_ARENA_SIZE]));
static OFFSET: Mutex<usize> = Mutex::new(0);

/// Reserva `size` bytes com alinhamento `align` (potência de dois).
///
/// Retorna `None` quando a arena esgota. Não existe liberação.
pub fn alloc(size: usize, align: usize) -> Option<usize> {
    if size == 0 {
        return None;
    }
    let mut offset = OFFSET.lock();
    let base = ARENA.0.get() as usize;
    let start = align_up(base + *offset, align) - base;
    let end = start.checked_add(size)?;
    if end > BUMP_ARENA_SIZE {
        crate::kwarn!("(BUMP) Arena de boot esgotada, pedido=", size);
        return None;
    }
    *offset = end;
    Some(base + start)
}

/// Bytes já consumidos da arena.
pub fn used() -> usize {
    *OFFSET.lock()
}
