//! # ============================================================
//! # Alocador buddy de páginas físicas
//! # ============================================================
//!
//! A arena inteira é particionada em blocos potência-de-dois. Cada página
//! tem um registro `PageInfo`; os blocos livres formam listas duplamente
//! encadeadas POR ÍNDICE dentro do próprio array de registros, então não
//! há ponteiro cru nenhum para virar dangling quando um bloco é reusado.
//!
//! Invariantes:
//! - Toda página pertence a exatamente um bloco de alguma ordem.
//! - Dois buddies livres da mesma ordem nunca coexistem (teriam sido
//!   fundidos no release).
//! - O índice do buddy é `idx ^ (1 << order)`, relativo à base da arena.

use crate::mm::config::{arena_base, MAX_BLOCK_PAGES, MAX_ORDER, MEMORY_SIZE, PAGE_COUNT, PAGE_SIZE};
use crate::sys::KernelError;

/// Sentinela de "sem vizinho" nas listas encadeadas por índice.
const NIL: u32 = u32::MAX;

/// Registro de estado de uma página física.
#[derive(Debug, Clone, Copy)]
pub struct PageInfo {
    /// Ordem do bloco que esta página encabeça; -1 para página interior.
    pub order: i8,
    /// Classe do kmem cache que a página serve; -1 quando não é slab.
    pub cache_order: i8,
    /// A página encabeça um bloco alocado.
    pub allocated: bool,
    /// A página encabeça um bloco presente numa lista livre.
    linked: bool,
    prev: u32,
    next: u32,
}

impl PageInfo {
    const UNTRACKED: PageInfo = PageInfo {
        order: -1,
        cache_order: -1,
        allocated: false,
        linked: false,
        prev: NIL,
        next: NIL,
    };
}

pub struct BuddyAllocator {
    pages: [PageInfo; PAGE_COUNT],
    free_heads: [u32; MAX_ORDER],
}

impl BuddyAllocator {
    pub const fn new() -> Self {
        BuddyAllocator {
            pages: [PageInfo::UNTRACKED; PAGE_COUNT],
            free_heads: [NIL; MAX_ORDER],
        }
    }

    /// Zera todos os registros e particiona a arena em blocos de ordem
    /// máxima. Deve rodar exatamente uma vez, antes de qualquer alocação.
    pub fn init(&mut self) {
        for page in self.pages.iter_mut() {
            *page = PageInfo::UNTRACKED;
        }
        for head in self.free_heads.iter_mut() {
            *head = NIL;
        }
        let mut idx = 0;
        while idx < PAGE_COUNT {
            self.push_free(idx, MAX_ORDER - 1);
            idx += MAX_BLOCK_PAGES;
        }
        crate::kinfo!("(BUDDY) Arena pronta, paginas=", PAGE_COUNT);
    }

    // --------------------------------------------------------
    // Listas livres encadeadas por índice
    // --------------------------------------------------------

    fn push_free(&mut self, idx: usize, order: usize) {
        let old_head = self.free_heads[order];
        if old_head != NIL {
            self.pages[old_head as usize].prev = idx as u32;
        }
        let page = &mut self.pages[idx];
        page.order = order as i8;
        page.allocated = false;
        page.linked = true;
        page.prev = NIL;
        page.next = old_head;
        self.free_heads[order] = idx as u32;
        crate::ktrace!("(BUDDY) [+] pagina=", idx);
    }

    fn unlink(&mut self, idx: usize, order: usize) {
        let (prev, next) = {
            let page = &self.pages[idx];
            (page.prev, page.next)
        };
        if prev != NIL {
            self.pages[prev as usize].next = next;
        } else {
            self.free_heads[order] = next;
        }
        if next != NIL {
            self.pages[next as usize].prev = prev;
        }
        let page = &mut self.pages[idx];
        page.linked = false;
        page.prev = NIL;
        page.next = NIL;
        crate::ktrace!("(BUDDY) [-] pagina=", idx);
    }

    fn pop_free(&mut self, order: usize) -> Option<usize> {
        let head = self.free_heads[order];
        if head == NIL {
            return None;
        }
        let idx = head as usize;
        self.unlink(idx, order);
        Some(idx)
    }

    // --------------------------------------------------------
    // Contrato público
    // --------------------------------------------------------

    /// Aloca um bloco que cubra `size` bytes e retorna sua base física.
    pub fn allocate(&mut self, size: usize) -> Result<usize, KernelError> {
        if size == 0 || size > MEMORY_SIZE {
            return Err(KernelError::NoMemory);
        }

        let pages_needed = size.div_ceil(PAGE_SIZE);
        let order = Self::order_for(pages_needed);

        // Procura da ordem pedida para cima; a primeira lista não vazia
        // fornece o bloco, que é repartido até a ordem exata.
        for scan in order..MAX_ORDER {
            if self.free_heads[scan] == NIL {
                continue;
            }
            let idx = match self.pop_free(scan) {
                Some(idx) => idx,
                None => return Err(KernelError::InternalInconsistency),
            };

            let mut current = scan;
            while current > order {
                current -= 1;
                // Metade superior volta como bloco livre da ordem abaixo.
                self.push_free(idx + (1 << current), current);
            }

            let page = &mut self.pages[idx];
            page.order = order as i8;
            page.allocated = true;
            page.linked = false;
            page.prev = NIL;
            page.next = NIL;

            let addr = arena_base() + idx * PAGE_SIZE;
            crate::kdebug!("(BUDDY) Alocado bloco em=", addr);
            return Ok(addr);
        }

        crate::kwarn!("(BUDDY) Sem bloco livre para size=", size);
        Err(KernelError::NoMemory)
    }

    /// Devolve um bloco, fundindo com o buddy enquanto ele também estiver
    /// livre na mesma ordem. Endereço estranho é um no-op silencioso.
    pub fn release(&mut self, addr: usize) {
        let Some(idx) = self.index_of(addr) else {
            crate::ktrace!("(BUDDY) release fora da arena=", addr);
            return;
        };
        {
            let page = &self.pages[idx];
            if !page.allocated || page.order < 0 {
                crate::ktrace!("(BUDDY) release de pagina nao alocada=", idx);
                return;
            }
        }

        let mut idx = idx;
        let mut order = self.pages[idx].order as usize;
        self.pages[idx].allocated = false;

        while order < MAX_ORDER - 1 {
            let buddy = idx ^ (1 << order);
            let mergeable = {
                let b = &self.pages[buddy];
                b.linked && b.order == order as i8
            };
            if !mergeable {
                break;
            }
            self.unlink(buddy, order);

            let lower = idx.min(buddy);
            let upper = idx.max(buddy);
            self.pages[upper] = PageInfo {
                cache_order: self.pages[upper].cache_order,
                ..PageInfo::UNTRACKED
            };

            idx = lower;
            order += 1;
            crate::ktrace!("(BUDDY) Fusao, novo head=", idx);
        }

        self.push_free(idx, order);
    }

    /// Exclui `[start, end)` da alocação, quebrando todo bloco que cobre o
    /// intervalo até granularidade de página e retirando essas páginas das
    /// listas livres. Só faz sentido durante o boot; não há des-reserva.
    pub fn reserve(&mut self, start: usize, end: usize) {
        if end <= start {
            return;
        }
        let first = match self.index_of(start.max(arena_base())) {
            Some(idx) => idx,
            None => return,
        };
        let last_addr = end.min(arena_base() + MEMORY_SIZE) - 1;
        let Some(last) = self.index_of(last_addr) else {
            return;
        };

        for idx in first..=last {
            self.split_down_to(idx);
            if self.pages[idx].linked && self.pages[idx].order == 0 {
                self.unlink(idx, 0);
                // Marcada como interior alocada: release() recusa.
                let page = &mut self.pages[idx];
                page.order = -1;
                page.allocated = true;
            }
        }
        crate::kinfo!("(BUDDY) Reservado inicio=", start);
        crate::kinfo!("(BUDDY)           fim=", end);
    }

    /// Quebra, de cima para baixo, todo bloco livre que cobre `idx` até
    /// que a página vire um bloco de ordem zero.
    fn split_down_to(&mut self, idx: usize) {
        for order in (1..MAX_ORDER).rev() {
            let head = idx & !((1 << order) - 1);
            let covering = {
                let page = &self.pages[head];
                page.linked && page.order == order as i8
            };
            if covering {
                self.unlink(head, order);
                self.push_free(head, order - 1);
                self.push_free(head + (1 << (order - 1)), order - 1);
            }
        }
    }

    // --------------------------------------------------------
    // Consultas usadas pelo kmem cache e pela fachada
    // --------------------------------------------------------

    /// Índice de página de um endereço dentro da arena.
    pub fn index_of(&self, addr: usize) -> Option<usize> {
        let base = arena_base();
        if addr < base || addr >= base + MEMORY_SIZE {
            return None;
        }
        Some((addr - base) / PAGE_SIZE)
    }

    /// Marca a página como pertencente a uma classe do kmem cache.
    pub fn tag_cache(&mut self, addr: usize, cache_order: i8) {
        if let Some(idx) = self.index_of(addr) {
            self.pages[idx].cache_order = cache_order;
        }
    }

    /// Tag de classe slab da página dona de `addr`; -1 quando não é slab.
    pub fn cache_tag(&self, addr: usize) -> i8 {
        match self.index_of(addr) {
            Some(idx) => self.pages[idx].cache_order,
            None => -1,
        }
    }

    fn order_for(pages: usize) -> usize {
        crate::klib::align::next_pow2(pages).trailing_zeros() as usize
    }

    // --------------------------------------------------------
    // Introspecção para as suites de self test
    // --------------------------------------------------------

    /// Comprimento da lista livre de uma ordem.
    pub fn free_list_len(&self, order: usize) -> usize {
        let mut len = 0;
        let mut cursor = self.free_heads[order];
        while cursor != NIL {
            len += 1;
            cursor = self.pages[cursor as usize].next;
        }
        len
    }

    /// Resumo insensível à ordem de inserção do conjunto de blocos livres:
    /// (quantidade, soma de hashes (ordem, índice)).
    pub fn free_signature(&self) -> (usize, u64) {
        let mut count = 0usize;
        let mut sum = 0u64;
        for order in 0..MAX_ORDER {
            let mut cursor = self.free_heads[order];
            while cursor != NIL {
                count += 1;
                let key = ((order as u64) << 32) | cursor as u64;
                sum = sum.wrapping_add(key.wrapping_mul(0x9E37_79B9_7F4A_7C15));
                cursor = self.pages[cursor as usize].next;
            }
        }
        (count, sum)
    }
}
