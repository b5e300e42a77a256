//! # ============================================================
//! # Fachada de alocação (kalloc/kfree + GlobalAlloc)
//! # ============================================================
//!
//! Dispatch por tamanho na alocação: pedidos até a maior classe do kmem
//! cache vão ao slab, acima disso direto ao buddy. Dispatch por TAG na
//! liberação: a tag `cache_order` da página dona do ponteiro é a única
//! fonte de verdade sobre qual caminho devolve a memória; o chamador
//! nunca informa o tipo.
//!
//! A mesma fachada é o `#[global_allocator]` do kernel, então todo
//! trafego de `Box`/`Vec`/`Arc` passa pelo buddy+slab.

use crate::arch::IrqGuard;
use crate::mm::buddy::BuddyAllocator;
use crate::mm::config::MAX_CHUNK_SIZE;
use crate::mm::kmem::KmemAllocator;
use crate::sys::KernelError;
use core::alloc::{GlobalAlloc, Layout};
use spin::Mutex;

pub struct KernelAllocator {
    pub buddy: BuddyAllocator,
    pub kmem: KmemAllocator,
    pub ready: bool,
}

impl KernelAllocator {
    pub const fn new() -> Self {
        KernelAllocator {
            buddy: BuddyAllocator::new(),
            kmem: KmemAllocator::new(),
            ready: false,
        }
    }

    pub fn alloc_bytes(&mut self, size: usize) -> Result<usize, KernelError> {
        if size == 0 {
            return Err(KernelError::InvalidArgument);
        }
        if size > MAX_CHUNK_SIZE {
            self.buddy.allocate(size)
        } else {
            self.kmem.allocate(&mut self.buddy, size)
        }
    }

    pub fn free_bytes(&mut self, addr: usize) {
        if addr == 0 {
            return;
        }
        let tag = self.buddy.cache_tag(addr);
        if tag >= 0 {
            self.kmem.release(tag, addr);
        } else {
            self.buddy.release(addr);
        }
    }
}

pub static ALLOCATOR: Mutex<KernelAllocator> = Mutex::new(KernelAllocator::new());

/// Sobe buddy e kmem cache. As reservas de boot devem ser aplicadas
/// entre as duas etapas, via `reserve`.
pub fn init() {
    let mut alloc = ALLOCATOR.lock();
    alloc.buddy.init();
}

/// Exclui um intervalo físico da alocação (imagem do kernel, DTB,
/// initramfs). Só durante o boot.
pub fn reserve(start: usize, end: usize) {
    ALLOCATOR.lock().buddy.reserve(start, end);
}

/// Conclui a inicialização: popula o kmem cache e libera o uso geral.
pub fn enable_kmem() {
    let mut alloc = ALLOCATOR.lock();
    let KernelAllocator {
        ref mut buddy,
        ref mut kmem,
        ref mut ready,
    } = *alloc;
    kmem.init(buddy);
    *ready = true;
}

/// Alocação de propósito geral.
///
/// As listas livres também são mutadas por alocações vindas do caminho
/// de IRQ; o guard fecha a janela em que o lock seria re-adquirido pelo
/// handler no mesmo core.
pub fn kalloc(size: usize) -> Result<usize, KernelError> {
    let _irq = IrqGuard::new();
    ALLOCATOR.lock().alloc_bytes(size)
}

/// Liberação de propósito geral; aceita qualquer ponteiro saído de
/// `kalloc` e ignora silenciosamente os demais.
pub fn kfree(addr: usize) {
    let _irq = IrqGuard::new();
    ALLOCATOR.lock().free_bytes(addr);
}

// ------------------------------------------------------------
// GlobalAlloc
// ------------------------------------------------------------

pub struct EmberHeap;

unsafe impl GlobalAlloc for EmberHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let _irq = IrqGuard::new();
        let mut alloc = ALLOCATOR.lock();
        if !alloc.ready {
            // Boot cedo demais: atende do bump para não corromper o buddy.
            drop(alloc);
            return match crate::mm::bump::alloc(layout.size(), layout.align()) {
                Some(addr) => addr as *mut u8,
                None => core::ptr::null_mut(),
            };
        }
        // Chunks do slab garantem 16 bytes de alinhamento; acima disso o
        // pedido precisa de uma pagina inteira.
        let size = if layout.align() > 16 {
            layout.size().max(layout.align()).max(MAX_CHUNK_SIZE + 1)
        } else {
            layout.size()
        };
        match alloc.alloc_bytes(size) {
            Ok(addr) => addr as *mut u8,
            Err(_) => core::ptr::null_mut(),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        let _irq = IrqGuard::new();
        ALLOCATOR.lock().free_bytes(ptr as usize);
    }
}

#[global_allocator]
static HEAP: EmberHeap = EmberHeap;
