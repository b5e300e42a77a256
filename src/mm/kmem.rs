//! # ============================================================
//! # kmem cache: sub-alocador de objetos pequenos
//! # ============================================================
//!
//! Quatro classes de tamanho (16, 32, 64, 128 bytes). Cada classe pede
//! páginas inteiras ao buddy e as fatia em chunks de tamanho fixo, cada
//! um precedido por um cabeçalho de 16 bytes que carrega o link da lista
//! livre enquanto o chunk está disponível. A página recebe a tag
//! `cache_order` no seu `PageInfo`; é ela que roteia o free de volta à
//! classe certa. Páginas entregues a uma classe nunca voltam ao buddy.

use crate::mm::buddy::BuddyAllocator;
use crate::mm::config::{
    CACHE_CLASS_COUNT, CHUNK_HEADER_SIZE, MAX_CHUNK_SIZE, MIN_CACHE_ORDER, PAGE_SIZE,
};
use crate::sys::KernelError;
use core::ptr::NonNull;

/// Cabeçalho intrusivo que vive nos primeiros bytes de cada chunk.
#[repr(C)]
struct FreeChunk {
    next: Option<NonNull<FreeChunk>>,
}

struct SizeClass {
    chunk_size: usize,
    free_head: Option<NonNull<FreeChunk>>,
    free_len: usize,
}

pub struct KmemAllocator {
    classes: [SizeClass; CACHE_CLASS_COUNT],
}

// As listas são mutadas apenas sob o Mutex da fachada.
unsafe impl Send for KmemAllocator {}

impl KmemAllocator {
    pub const fn new() -> Self {
        const EMPTY: SizeClass = SizeClass {
            chunk_size: 0,
            free_head: None,
            free_len: 0,
        };
        KmemAllocator {
            classes: [EMPTY; CACHE_CLASS_COUNT],
        }
    }

    /// Registra os tamanhos das classes e pré-popula cada uma com uma
    /// página do buddy.
    pub fn init(&mut self, buddy: &mut BuddyAllocator) {
        for (i, class) in self.classes.iter_mut().enumerate() {
            class.chunk_size = 1 << (i + MIN_CACHE_ORDER);
            class.free_head = None;
            class.free_len = 0;
        }
        for class_idx in 0..CACHE_CLASS_COUNT {
            if self.request_page(buddy, class_idx).is_err() {
                crate::kerror!("(KMEM) Sem pagina para classe=", class_idx);
            }
        }
        crate::kinfo!("(KMEM) Classes prontas, menor=", self.classes[0].chunk_size);
    }

    fn class_for(size: usize) -> Result<usize, KernelError> {
        if size == 0 || size > MAX_CHUNK_SIZE {
            return Err(KernelError::InvalidArgument);
        }
        let mut order = MIN_CACHE_ORDER;
        while (1 << order) < size {
            order += 1;
        }
        Ok(order - MIN_CACHE_ORDER)
    }

    /// Puxa uma página fresca do buddy, tagueia seu `PageInfo` com a
    /// classe e fatia tudo na lista livre.
    fn request_page(
        &mut self,
        buddy: &mut BuddyAllocator,
        class_idx: usize,
    ) -> Result<(), KernelError> {
        let page = buddy.allocate(PAGE_SIZE)?;
        buddy.tag_cache(page, (class_idx + MIN_CACHE_ORDER) as i8);

        let stride = self.classes[class_idx].chunk_size + CHUNK_HEADER_SIZE;
        let chunk_count = PAGE_SIZE / stride;
        for j in 0..chunk_count {
            let header = (page + j * stride) as *mut FreeChunk;
            unsafe {
                (*header).next = self.classes[class_idx].free_head;
                self.classes[class_idx].free_head = Some(NonNull::new_unchecked(header));
            }
            self.classes[class_idx].free_len += 1;
        }
        crate::kdebug!("(KMEM) Pagina nova para classe=", class_idx);
        Ok(())
    }

    /// Aloca um chunk da menor classe que cubra `size`.
    ///
    /// Pedidos acima de `MAX_CHUNK_SIZE` são recusados; o chamador deve
    /// rotear esses direto ao buddy.
    pub fn allocate(
        &mut self,
        buddy: &mut BuddyAllocator,
        size: usize,
    ) -> Result<usize, KernelError> {
        let class_idx = Self::class_for(size)?;

        if self.classes[class_idx].free_head.is_none() {
            self.request_page(buddy, class_idx)?;
        }
        let header = self.classes[class_idx]
            .free_head
            .ok_or(KernelError::NoMemory)?;

        unsafe {
            self.classes[class_idx].free_head = header.as_ref().next;
        }
        self.classes[class_idx].free_len -= 1;

        let addr = header.as_ptr() as usize + CHUNK_HEADER_SIZE;
        crate::ktrace!("(KMEM) Chunk alocado em=", addr);
        Ok(addr)
    }

    /// Devolve um chunk à classe indicada pela tag `cache_order` da página.
    pub fn release(&mut self, cache_order: i8, addr: usize) {
        if (cache_order as usize) < MIN_CACHE_ORDER {
            crate::kwarn!("(KMEM) Tag de classe invalida=", cache_order as usize);
            return;
        }
        let class_idx = cache_order as usize - MIN_CACHE_ORDER;
        if class_idx >= CACHE_CLASS_COUNT {
            crate::kwarn!("(KMEM) Tag de classe invalida=", cache_order as usize);
            return;
        }
        let header = (addr - CHUNK_HEADER_SIZE) as *mut FreeChunk;
        unsafe {
            (*header).next = self.classes[class_idx].free_head;
            self.classes[class_idx].free_head = Some(NonNull::new_unchecked(header));
        }
        self.classes[class_idx].free_len += 1;
        crate::ktrace!("(KMEM) Chunk devolvido em=", addr);
    }

    /// Comprimento da lista livre de uma classe (para os self tests).
    pub fn free_len(&self, class_idx: usize) -> usize {
        self.classes[class_idx].free_len
    }

    /// Tamanho de chunk de uma classe.
    pub fn chunk_size(&self, class_idx: usize) -> usize {
        self.classes[class_idx].chunk_size
    }
}
