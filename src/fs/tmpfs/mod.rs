//! # ============================================================
//! # Tmpfs: filesystem em memória, leitura e escrita
//! # ============================================================
//!
//! Backend padrão da raiz. Todo o conteúdo vive no heap do kernel;
//! arquivos crescem por duplicação de capacidade na escrita.

use crate::fs::config::{MAX_FILE_NAME, SEEK_CUR, SEEK_END, SEEK_SET};
use crate::fs::node::{FileContent, FsNode, NodeKind};
use crate::fs::vfs::{File, FileOps, Filesystem, Vnode, VnodeOps};
use crate::sys::KernelError;
use alloc::sync::Arc;

pub struct Tmpfs;

static TMPFS: Tmpfs = Tmpfs;
static TMPFS_VOPS: TmpfsVnodeOps = TmpfsVnodeOps;
static TMPFS_FOPS: TmpfsFileOps = TmpfsFileOps;

/// Registra o backend no VFS.
pub fn init() -> Result<(), KernelError> {
    crate::fs::vfs::register_filesystem(&TMPFS)
}

impl Filesystem for Tmpfs {
    fn name(&self) -> &'static str {
        "tmpfs"
    }

    fn setup_mount(&self) -> Result<Arc<Vnode>, KernelError> {
        let root = FsNode::new_dir("/");
        Ok(Vnode::new(root, &TMPFS_VOPS, &TMPFS_FOPS))
    }
}

/// Recusa nomes vazios, longos demais ou duplicados no diretório.
fn check_new_name(dir: &Arc<Vnode>, name: &str) -> Result<(), KernelError> {
    if dir.node.kind != NodeKind::Directory {
        return Err(KernelError::NotSupported);
    }
    if name.is_empty() || name.len() > MAX_FILE_NAME {
        return Err(KernelError::InvalidArgument);
    }
    if dir.node.find_child(name).is_some() {
        return Err(KernelError::AlreadyExists);
    }
    Ok(())
}

struct TmpfsVnodeOps;

impl VnodeOps for TmpfsVnodeOps {
    fn lookup(&self, dir: &Arc<Vnode>, name: &str) -> Result<Arc<Vnode>, KernelError> {
        if dir.node.kind != NodeKind::Directory {
            return Err(KernelError::NotSupported);
        }
        dir.node.find_child(name).ok_or(KernelError::NotFound)
    }

    fn create(&self, dir: &Arc<Vnode>, name: &str) -> Result<Arc<Vnode>, KernelError> {
        check_new_name(dir, name)?;
        let node = FsNode::new_file(name, FileContent::new());
        Vnode::new_child(dir, node, &TMPFS_VOPS, &TMPFS_FOPS)
    }

    fn mkdir(&self, dir: &Arc<Vnode>, name: &str) -> Result<Arc<Vnode>, KernelError> {
        check_new_name(dir, name)?;
        let node = FsNode::new_dir(name);
        Vnode::new_child(dir, node, &TMPFS_VOPS, &TMPFS_FOPS)
    }
}

struct TmpfsFileOps;

impl FileOps for TmpfsFileOps {
    fn read(&self, file: &mut File, buf: &mut [u8]) -> Result<usize, KernelError> {
        if file.vnode.node.kind != NodeKind::File {
            return Err(KernelError::NotSupported);
        }
        let read = file.vnode.node.content.lock().read_at(file.pos, buf);
        file.pos += read;
        Ok(read)
    }

    fn write(&self, file: &mut File, buf: &[u8]) -> Result<usize, KernelError> {
        if file.vnode.node.kind != NodeKind::File {
            return Err(KernelError::NotSupported);
        }
        let written = file.vnode.node.content.lock().write_at(file.pos, buf);
        file.pos += written;
        Ok(written)
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
