//! # ============================================================
//! # Initramfs: filesystem somente-leitura populado do CPIO de boot
//! # ============================================================
//!
//! O bootloader deixa um arquivo CPIO na memória; o devicetree informa
//! onde. A montagem materializa a árvore inteira em nós na hora, e a
//! partir daí o backend só aceita leitura.

pub mod cpio;

use crate::fs::config::{SEEK_CUR, SEEK_END, SEEK_SET};
use crate::fs::node::{FileContent, FsNode, NodeKind};
use crate::fs::vfs::{File, FileOps, Filesystem, Vnode, VnodeOps};
use crate::sys::KernelError;
use alloc::sync::Arc;
use cpio::CpioReader;
use spin::Once;

pub struct Initramfs;

static INITRAMFS: Initramfs = Initramfs;
static INITRAMFS_VOPS: InitramfsVnodeOps = InitramfsVnodeOps;
static INITRAMFS_FOPS: InitramfsFileOps = InitramfsFileOps;

/// Faixa [base, end) do arquivo CPIO, descoberta no devicetree.
static ARCHIVE: Once<(usize, usize)> = Once::new();

/// Registra o backend no VFS.
pub fn init() -> Result<(), KernelError> {
    crate::fs::vfs::register_filesystem(&INITRAMFS)
}

/// Informa onde o bootloader deixou o arquivo. Chamar antes de montar.
pub fn set_archive(base: usize, end: usize) {
    ARCHIVE.call_once(|| (base, end));
    crate::kinfo!("(INITRAMFS) CPIO em: ", base);
}

impl Filesystem for Initramfs {
    fn name(&self) -> &'static str {
        "initramfs"
    }

    fn setup_mount(&self) -> Result<Arc<Vnode>, KernelError> {
        let root = Vnode::new(FsNode::new_dir("/"), &INITRAMFS_VOPS, &INITRAMFS_FOPS);
        match ARCHIVE.get() {
            Some(&(base, end)) if end > base => {
                let archive =
                    unsafe { core::slice::from_raw_parts(base as *const u8, end - base) };
                populate(&root, archive)?;
            }
            _ => {
                crate::kwarn!("(INITRAMFS) Sem arquivo CPIO; raiz vazia");
            }
        }
        Ok(root)
    }
}

/// Materializa a árvore do arquivo. Diretórios intermediários ausentes
/// da listagem são criados sob demanda.
fn populate(root: &Arc<Vnode>, archive: &[u8]) -> Result<(), KernelError> {
    let mut count: usize = 0;
    for entry in CpioReader::new(archive) {
        if entry.name.is_empty() || entry.name == "." {
            continue;
        }
        let mut dir = root.clone();
        let mut components = entry.name.split('/').filter(|c| !c.is_empty()).peekable();
        while let Some(component) = components.next() {
            let last = components.peek().is_none();
            if let Some(existing) = dir.node.find_child(component) {
                dir = existing;
                continue;
            }
            let node = if last && !entry.is_dir {
                FsNode::new_file(component, FileContent::from_bytes(entry.data))
            } else {
                FsNode::new_dir(component)
            };
            dir = Vnode::new_child(&dir, node, &INITRAMFS_VOPS, &INITRAMFS_FOPS)?;
        }
        count += 1;
    }
    crate::kinfo!("(INITRAMFS) Entradas carregadas: ", count);
    Ok(())
}

struct InitramfsVnodeOps;

impl VnodeOps for InitramfsVnodeOps {
    fn lookup(&self, dir: &Arc<Vnode>, name: &str) -> Result<Arc<Vnode>, KernelError> {
        if dir.node.kind != NodeKind::Directory {
            return Err(KernelError::NotSupported);
        }
        dir.node.find_child(name).ok_or(KernelError::NotFound)
    }

    fn create(&self, _dir: &Arc<Vnode>, _name: &str) -> Result<Arc<Vnode>, KernelError> {
        Err(KernelError::PermissionDenied)
    }

    fn mkdir(&self, _dir: &Arc<Vnode>, _name: &str) -> Result<Arc<Vnode>, KernelError> {
        Err(KernelError::PermissionDenied)
    }
}

struct InitramfsFileOps;

impl FileOps for InitramfsFileOps {
    fn read(&self, file: &mut File, buf: &mut [u8]) -> Result<usize, KernelError> {
        if file.vnode.node.kind != NodeKind::File {
            return Err(KernelError::NotSupported);
        }
        let read = file.vnode.node.content.lock().read_at(file.pos, buf);
        file.pos += read;
        Ok(read)
    }

    fn write(&self, _file: &mut File, _buf: &[u8]) -> Result<usize, KernelError> {
        Err(KernelError::PermissionDenied)
    }

    fn lseek64(&self, file: &mut File, offset: i64, whence: u32) -> Result<i64, KernelError> {
        let size = file.vnode.node.content.lock().size() as i64;
        let base = match whence {
            SEEK_SET => 0,
            SEEK_CUR => file.pos as i64,
            SEEK_END => size,
            _ => return Err(KernelError::InvalidArgument),
        };
        let target = base.checked_add(offset).ok_or(KernelError::InvalidArgument)?;
        if target < 0 {
            return Err(KernelError::InvalidArgument);
        }
        file.pos = target as usize;
        Ok(target)
    }
}
