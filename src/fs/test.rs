//! Self tests do VFS, rodados no boot depois de `fs::init`.

use crate::fs::config::{O_CREAT, SEEK_CUR, SEEK_END, SEEK_SET};
use crate::fs::initramfs::cpio::CpioReader;
use crate::fs::vfs;
use crate::klib::test_framework::{run_test_suite, TestCase, TestResult};
use crate::sys::KernelError;
use crate::test_assert;
use alloc::sync::Arc;
use alloc::vec::Vec;

/// Caminhos com `.`, `..` e barras redundantes chegam no mesmo vnode.
fn test_path_normalization() -> TestResult {
    test_assert!(vfs::mkdir("/st_a").is_ok());
    test_assert!(vfs::mkdir("/st_a/b").is_ok());

    let direct = match vfs::lookup("/st_a/b") {
        Ok(vnode) => vnode,
        Err(_) => return TestResult::Failed,
    };
    for alias in ["/st_a/./b", "/st_a/b/../b", "//st_a//b/", "st_a/b"] {
        match vfs::lookup(alias) {
            Ok(vnode) => test_assert!(Arc::ptr_eq(&vnode, &direct), "(FS-TEST) alias divergiu"),
            Err(_) => return TestResult::Failed,
        }
    }
    // `..` na raiz é no-op.
    match vfs::lookup("/../st_a/b") {
        Ok(vnode) => test_assert!(Arc::ptr_eq(&vnode, &direct)),
        Err(_) => return TestResult::Failed,
    }
    TestResult::Passed
}

/// Erros de criação: duplicado, pai ausente e nome comprido demais.
fn test_create_errors() -> TestResult {
    test_assert!(vfs::open("/st_a/f1", O_CREAT).is_ok());
    // O_CREAT sobre existente abre o arquivo, não é erro.
    test_assert!(vfs::open("/st_a/f1", O_CREAT).is_ok());
    // Sem O_CREAT, ausente é NotFound.
    match vfs::open("/st_a/f2", 0) {
        Err(KernelError::NotFound) => {}
        _ => return TestResult::Failed,
    }

    test_assert!(vfs::mkdir("/st_a/b") == Err(KernelError::AlreadyExists));
    test_assert!(vfs::mkdir("/st_missing/b") == Err(KernelError::NotFound));

    let mut path = alloc::string::String::from("/st_a/");
    for _ in 0..65 {
        path.push('x');
    }
    test_assert!(vfs::mkdir(&path) == Err(KernelError::InvalidArgument));
    TestResult::Passed
}

/// Escrita além da capacidade inicial cresce o arquivo sem perder dados.
fn test_write_growth() -> TestResult {
    let mut file = match vfs::open("/st_a/big", O_CREAT) {
        Ok(file) => file,
        Err(_) => return TestResult::Failed,
    };

    let chunk = [0xA5u8; 500];
    for _ in 0..10 {
        match file.write(&chunk) {
            Ok(written) => test_assert!(written == chunk.len()),
            Err(_) => return TestResult::Failed,
        }
    }
    test_assert!(file.seek(0, SEEK_END) == Ok(5000), "(FS-TEST) tamanho errado");
    test_assert!(file.seek(0, SEEK_SET) == Ok(0));

    let mut back = [0u8; 5000];
    match file.read(&mut back) {
        Ok(read) => test_assert!(read == 5000),
        Err(_) => return TestResult::Failed,
    }
    test_assert!(back.iter().all(|&b| b == 0xA5), "(FS-TEST) conteudo corrompido");
    // Ler no fim devolve zero bytes.
    test_assert!(file.read(&mut back) == Ok(0));
    TestResult::Passed
}

/// lseek64: bases SET/CUR/END, destino negativo e whence inválido.
fn test_seek_semantics() -> TestResult {
    let mut file = match vfs::open("/st_a/seek", O_CREAT) {
        Ok(file) => file,
        Err(_) => return TestResult::Failed,
    };
    test_assert!(file.write(b"0123456789").is_ok());

    test_assert!(file.seek(3, SEEK_SET) == Ok(3));
    test_assert!(file.seek(-2, SEEK_CUR) == Ok(1));
    test_assert!(file.seek(-4, SEEK_END) == Ok(6));
    test_assert!(file.seek(-1, SEEK_SET) == Err(KernelError::InvalidArgument));
    test_assert!(file.seek(0, 99) == Err(KernelError::InvalidArgument));

    let mut byte = [0u8; 1];
    test_assert!(file.read(&mut byte) == Ok(1));
    test_assert!(byte[0] == b'6');
    TestResult::Passed
}

/// Montagem esconde o conteúdo antigo do alvo e responde Busy na segunda.
fn test_mount_shadowing() -> TestResult {
    test_assert!(vfs::mkdir("/st_mnt").is_ok());
    test_assert!(vfs::open("/st_mnt/inner", O_CREAT).is_ok());

    let attach_point = match vfs::lookup("/st_mnt") {
        Ok(vnode) => vnode,
        Err(_) => return TestResult::Failed,
    };

    test_assert!(vfs::mount("/st_mnt", "tmpfs").is_ok());

    // O caminho agora resolve para a raiz da instância nova.
    match vfs::lookup("/st_mnt") {
        Ok(vnode) => test_assert!(!Arc::ptr_eq(&vnode, &attach_point)),
        Err(_) => return TestResult::Failed,
    }
    // O conteúdo antigo do alvo ficou sombreado.
    match vfs::lookup("/st_mnt/inner") {
        Err(KernelError::NotFound) => {}
        _ => return TestResult::Failed,
    }
    // O filesystem montado aceita criação normalmente.
    test_assert!(vfs::mkdir("/st_mnt/fresh").is_ok());
    // `..` atravessa a fronteira de volta para a raiz global.
    let root = match vfs::root_vnode() {
        Ok(vnode) => vnode,
        Err(_) => return TestResult::Failed,
    };
    match vfs::lookup("/st_mnt/..") {
        Ok(vnode) => test_assert!(Arc::ptr_eq(&vnode, &root), "(FS-TEST) '..' nao cruzou a montagem"),
        Err(_) => return TestResult::Failed,
    }

    test_assert!(vfs::mount("/st_mnt", "tmpfs") == Err(KernelError::Busy));
    test_assert!(vfs::mount("/st_a/f1", "tmpfs") == Err(KernelError::NotSupported));
    test_assert!(vfs::mount("/st_a", "no_such_fs") == Err(KernelError::NotFound));
    TestResult::Passed
}

/// O initramfs recusa qualquer mutação.
fn test_initramfs_read_only() -> TestResult {
    test_assert!(vfs::mkdir("/initramfs/d") == Err(KernelError::PermissionDenied));
    match vfs::open("/initramfs/novo", O_CREAT) {
        Err(KernelError::PermissionDenied) => {}
        _ => return TestResult::Failed,
    }
    TestResult::Passed
}

fn push_hex8(out: &mut Vec<u8>, value: u32) {
    for shift in (0..8).rev() {
        let nibble = (value >> (shift * 4)) & 0xF;
        out.push(b"0123456789ABCDEF"[nibble as usize]);
    }
}

fn push_entry(out: &mut Vec<u8>, name: &str, data: &[u8], mode: u32) {
    let start = out.len();
    out.extend_from_slice(b"070701");
    for field in [1u32, mode, 0, 0, 1, 0] {
        push_hex8(out, field);
    }
    push_hex8(out, data.len() as u32);
    for _ in 0..4 {
        push_hex8(out, 0);
    }
    push_hex8(out, name.len() as u32 + 1);
    push_hex8(out, 0);
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    while (out.len() - start) % 4 != 0 {
        out.push(0);
    }
    out.extend_from_slice(data);
    while (out.len() - start) % 4 != 0 {
        out.push(0);
    }
}

/// Parser newc: nomes, dados, flag de diretório e terminador.
fn test_cpio_parser() -> TestResult {
    let mut archive = Vec::new();
    push_entry(&mut archive, "dir", &[], 0o040755);
    push_entry(&mut archive, "dir/hello.txt", b"oi!", 0o100644);
    push_entry(&mut archive, "TRAILER!!!", &[], 0);

    let mut reader = CpioReader::new(&archive);

    match reader.next() {
        Some(entry) => {
            test_assert!(entry.name == "dir");
            test_assert!(entry.is_dir);
            test_assert!(entry.data.is_empty());
        }
        None => return TestResult::Failed,
    }
    match reader.next() {
        Some(entry) => {
            test_assert!(entry.name == "dir/hello.txt");
            test_assert!(!entry.is_dir);
            test_assert!(entry.data == b"oi!");
        }
        None => return TestResult::Failed,
    }
    test_assert!(reader.next().is_none());
    test_assert!(reader.next().is_none());
    TestResult::Passed
}

/// O console aparece como arquivo e aceita escrita.
fn test_dev_uart_write() -> TestResult {
    let mut file = match vfs::open("/dev/uart", 0) {
        Ok(file) => file,
        Err(_) => return TestResult::Failed,
    };
    test_assert!(file.write(b"") == Ok(0));
    test_assert!(file.seek(0, SEEK_SET) == Err(KernelError::NotSupported));
    TestResult::Passed
}

pub fn run() {
    const TESTS: &[TestCase] = &[
        TestCase {
            name: "path_normalization",
            func: test_path_normalization,
        },
        TestCase {
            name: "create_errors",
            func: test_create_errors,
        },
        TestCase {
            name: "write_growth",
            func: test_write_growth,
        },
        TestCase {
            name: "seek_semantics",
            func: test_seek_semantics,
        },
        TestCase {
            name: "mount_shadowing",
            func: test_mount_shadowing,
        },
        TestCase {
            name: "initramfs_read_only",
            func: test_initramfs_read_only,
        },
        TestCase {
            name: "cpio_parser",
            func: test_cpio_parser,
        },
        TestCase {
            name: "dev_uart_write",
            func: test_dev_uart_write,
        },
    ];
    run_test_suite("fs", TESTS);
}
