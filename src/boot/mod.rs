//! # ============================================================
//! # Sequência de boot
//! # ============================================================
//!
//! Ordem obrigatória: serial, devicetree, memória (com as reservas de
//! boot aplicadas antes do kmem), vetores de exceção, timers, scheduler
//! e por fim a hierarquia de arquivos. As suites de self test rodam com
//! tudo de pé, antes de liberar interrupções.

pub mod devicetree;

use crate::mm::ReservedRange;

/// Página das spin tables usadas no boot dos núcleos secundários.
const SPIN_TABLE_START: usize = 0x0;
const SPIN_TABLE_END: usize = 0x1000;

#[cfg(target_arch = "aarch64")]
extern "C" {
    static __kernel_start: u8;
    static __stack_top: u8;
}

/// Faixa física ocupada pela imagem do kernel, incluindo BSS e a pilha
/// de boot, conforme o linker script.
#[cfg(target_arch = "aarch64")]
fn kernel_image_range() -> ReservedRange {
    ReservedRange {
        start: unsafe { core::ptr::addr_of!(__kernel_start) as usize },
        end: unsafe { core::ptr::addr_of!(__stack_top) as usize },
    }
}

/// Coleta as reservas de boot e sobe a memória. Devolve a faixa do
/// initramfs, se o devicetree a declarar.
#[cfg(target_arch = "aarch64")]
fn init_memory(dtb_addr: usize) -> Option<(usize, usize)> {
    let mut reserves = [ReservedRange { start: 0, end: 0 }; 4];
    let mut count = 0;

    reserves[count] = ReservedRange {
        start: SPIN_TABLE_START,
        end: SPIN_TABLE_END,
    };
    count += 1;
    reserves[count] = kernel_image_range();
    count += 1;

    let mut initrd = None;
    if dtb_addr != 0 {
        let header = unsafe { core::slice::from_raw_parts(dtb_addr as *const u8, 40) };
        if let Some(size) = devicetree::total_size(header) {
            let blob = unsafe { core::slice::from_raw_parts(dtb_addr as *const u8, size) };
            initrd = devicetree::find_initrd(blob);
            reserves[count] = ReservedRange {
                start: dtb_addr,
                end: dtb_addr + size,
            };
            count += 1;
        } else {
            crate::kwarn!("(BOOT) Devicetree invalido em=", dtb_addr);
        }
    }
    if let Some((start, end)) = initrd {
        reserves[count] = ReservedRange { start, end };
        count += 1;
    }

    crate::mm::init(&reserves[..count]);
    initrd
}

/// Em execução hospedada não há firmware nem reservas: a arena estática
/// já nasce exclusiva do kernel.
#[cfg(not(target_arch = "aarch64"))]
fn init_memory(_dtb_addr: usize) -> Option<(usize, usize)> {
    let _ = (SPIN_TABLE_START, SPIN_TABLE_END);
    crate::mm::init(&[]);
    None
}

/// Sobe todos os subsistemas na ordem de dependência.
pub fn init_subsystems(dtb_addr: usize) {
    crate::drivers::serial::init();
    crate::kinfo!("(BOOT) Ember kernel");

    let initrd = init_memory(dtb_addr);
    if let Some((start, end)) = initrd {
        crate::fs::initramfs::set_archive(start, end);
    }

    #[cfg(target_arch = "aarch64")]
    crate::arch::aarch64::trap::init();

    crate::time::init();
    crate::sched::init();

    if let Err(err) = crate::fs::init() {
        crate::kerror!("(BOOT) Filesystem indisponivel: ");
        crate::kerror!(err.as_str());
    }
    crate::sched::with_current(|task| {
        task.cwd = crate::fs::vfs::root_vnode().ok();
        task.bind_console();
    })
    .ok();
}

/// Suites de self test, na ordem dos subsistemas.
#[cfg(feature = "self_test")]
pub fn run_self_tests() {
    crate::mm::test::run();
    devicetree::test::run();
    crate::time::test::run();
    crate::sched::test::run();
    crate::fs::test::run();
    crate::syscall::test::run();
}

/// Laço ocioso da tarefa de boot: recolhe zumbis e cede a vez.
pub fn idle_loop() -> ! {
    loop {
        crate::sched::reap_zombies();
        crate::sched::schedule();
        #[cfg(target_arch = "aarch64")]
        unsafe {
            core::arch::asm!("wfi");
        }
        #[cfg(not(target_arch = "aarch64"))]
        core::hint::spin_loop();
    }
}

/// Entrada em Rust depois do assembly de `_start`.
#[no_mangle]
pub extern "C" fn kernel_main(dtb_addr: usize) -> ! {
    init_subsystems(dtb_addr);

    #[cfg(feature = "self_test")]
    run_self_tests();

    crate::arch::irq::enable();
    crate::kinfo!("(BOOT) Kernel de pe, entrando no idle");
    idle_loop()
}
