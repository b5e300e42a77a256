//! Forma de nó compartilhada pelos dois backends concretos.
//!
//! tmpfs e initramfs diferem só em política (quem pode criar/escrever);
//! o formato do nó é idêntico: nome, tipo, buffer de arquivo com tamanho
//! lógico e capacidade separados, ou lista de filhos com teto fixo.

use crate::fs::config::{DEFAULT_FILE_CAPACITY, MAX_CHILDREN};
use crate::fs::vfs::Vnode;
use crate::sys::KernelError;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use spin::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// Buffer de arquivo com capacidade alocada e tamanho lógico separados.
/// O crescimento é sempre por dobra da capacidade.
pub struct FileContent {
    buf: Vec<u8>,
    size: usize,
}

impl FileContent {
    pub fn new() -> Self {
        FileContent {
            buf: vec![0; DEFAULT_FILE_CAPACITY],
            size: 0,
        }
    }

    /// Conteúdo pronto, vindo do archive: tamanho lógico igual ao dado.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut capacity = DEFAULT_FILE_CAPACITY;
        while capacity < data.len() {
            capacity *= 2;
        }
        let mut buf = vec![0; capacity];
        buf[..data.len()].copy_from_slice(data);
        FileContent {
            buf,
            size: data.len(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Lê a partir de `pos`, limitado ao tamanho lógico. Zero no EOF.
    pub fn read_at(&self, pos: usize, out: &mut [u8]) -> usize {
        if pos >= self.size {
            return 0;
        }
        let len = out.len().min(self.size - pos);
        out[..len].copy_from_slice(&self.buf[pos..pos + len]);
        len
    }

    /// Escreve em `pos`, dobrando a capacidade quantas vezes for preciso
    /// e estendendo o tamanho lógico se a escrita passou dele.
    pub fn write_at(&mut self, pos: usize, data: &[u8]) -> usize {
        let end = pos + data.len();
        while end > self.buf.len() {
            let doubled = self.buf.len() * 2;
            self.buf.resize(doubled, 0);
        }
        self.buf[pos..end].copy_from_slice(data);
        if end > self.size {
            self.size = end;
        }
        data.len()
    }
}

impl Default for FileContent {
    fn default() -> Self {
        Self::new()
    }
}

/// Nó do backing store.
pub struct FsNode {
    pub name: String,
    pub kind: NodeKind,
    pub content: Mutex<FileContent>,
    pub children: Mutex<Vec<Arc<Vnode>>>,
}

impl FsNode {
    pub fn new_dir(name: &str) -> Arc<Self> {
        Arc::new(FsNode {
            name: String::from(name),
            kind: NodeKind::Directory,
            content: Mutex::new(FileContent::new()),
            children: Mutex::new(Vec::new()),
        })
    }

    pub fn new_file(name: &str, content: FileContent) -> Arc<Self> {
        Arc::new(FsNode {
            name: String::from(name),
            kind: NodeKind::File,
            content: Mutex::new(content),
            children: Mutex::new(Vec::new()),
        })
    }

    /// Varredura linear dos filhos por nome.
    pub fn find_child(&self, name: &str) -> Option<Arc<Vnode>> {
        self.children
            .lock()
            .iter()
            .find(|child| child.node.name == name)
            .cloned()
    }

    /// Liga um filho novo, respeitando o teto de capacidade.
    pub fn attach_child(&self, child: Arc<Vnode>) -> Result<(), KernelError> {
        let mut children = self.children.lock();
        if children.len() >= MAX_CHILDREN {
            return Err(KernelError::NoMemory);
        }
        children.push(child);
        Ok(())
    }
}
