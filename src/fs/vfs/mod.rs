//! # ============================================================
//! # Núcleo do VFS: registro, montagens, vnodes e resolução de caminho
//! # ============================================================
//!
//! O vnode é o nó agnóstico de backend; as tabelas de operações são
//! trait objects, uma para operações de nó (lookup/create/mkdir) e uma
//! para operações de arquivo (read/write/seek/ioctl). Montagens são
//! substituições transparentes de diretório: a resolução redireciona
//! para a raiz do filesystem montado sempre que pisa num ponto de
//! anexação, inclusive no meio do caminho.

use crate::fs::config::{MAX_FILESYSTEMS, O_CREAT};
use crate::fs::node::{FsNode, NodeKind};
use crate::sys::KernelError;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use spin::{Mutex, Once};

/// Um backend registrável.
pub trait Filesystem: Send + Sync {
    fn name(&self) -> &'static str;
    /// Produz a raiz de uma instância nova deste filesystem.
    fn setup_mount(&self) -> Result<Arc<Vnode>, KernelError>;
}

/// Operações de nó.
pub trait VnodeOps: Send + Sync {
    fn lookup(&self, dir: &Arc<Vnode>, name: &str) -> Result<Arc<Vnode>, KernelError>;
    fn create(&self, dir: &Arc<Vnode>, name: &str) -> Result<Arc<Vnode>, KernelError>;
    fn mkdir(&self, dir: &Arc<Vnode>, name: &str) -> Result<Arc<Vnode>, KernelError>;
}

/// Operações de arquivo. Slot ausente responde NotSupported em vez de
/// quebrar.
pub trait FileOps: Send + Sync {
    fn open(&self, _vnode: &Arc<Vnode>) -> Result<(), KernelError> {
        Ok(())
    }
    fn read(&self, _file: &mut File, _buf: &mut [u8]) -> Result<usize, KernelError> {
        Err(KernelError::NotSupported)
    }
    fn write(&self, _file: &mut File, _buf: &[u8]) -> Result<usize, KernelError> {
        Err(KernelError::NotSupported)
    }
    fn close(&self, _file: &mut File) -> Result<(), KernelError> {
        Ok(())
    }
    fn lseek64(&self, _file: &mut File, _offset: i64, _whence: u32) -> Result<i64, KernelError> {
        Err(KernelError::NotSupported)
    }
    fn ioctl(&self, _file: &mut File, _cmd: u64, _arg: u64) -> Result<i64, KernelError> {
        Err(KernelError::NotSupported)
    }
}

/// Referência ao pai de um vnode.
#[derive(Clone)]
pub struct ParentLink {
    pub vnode: Weak<Vnode>,
    /// O pai é um ponto de anexação de outro filesystem (este vnode é a
    /// raiz sintética de uma montagem).
    pub crosses_mount: bool,
}

/// Par (filesystem, raiz produzida por ele) de uma montagem.
pub struct Mount {
    pub fs_name: &'static str,
    pub root: Once<Arc<Vnode>>,
}

pub struct Vnode {
    pub node: Arc<FsNode>,
    pub v_ops: &'static dyn VnodeOps,
    /// Trocável: mknod rebinda as operações de arquivo de um nó para as
    /// de um dispositivo.
    pub f_ops: Mutex<&'static dyn FileOps>,
    pub parent: Mutex<Option<ParentLink>>,
    /// Preenchido exatamente quando este vnode é ponto de anexação.
    pub mount: Mutex<Option<Arc<Mount>>>,
}

impl Vnode {
    pub fn new(
        node: Arc<FsNode>,
        v_ops: &'static dyn VnodeOps,
        f_ops: &'static dyn FileOps,
    ) -> Arc<Self> {
        Arc::new(Vnode {
            node,
            v_ops,
            f_ops: Mutex::new(f_ops),
            parent: Mutex::new(None),
            mount: Mutex::new(None),
        })
    }

    /// Cria um vnode filho já ligado ao diretório pai.
    pub fn new_child(
        dir: &Arc<Vnode>,
        node: Arc<FsNode>,
        v_ops: &'static dyn VnodeOps,
        f_ops: &'static dyn FileOps,
    ) -> Result<Arc<Self>, KernelError> {
        let child = Vnode::new(node, v_ops, f_ops);
        *child.parent.lock() = Some(ParentLink {
            vnode: Arc::downgrade(dir),
            crosses_mount: false,
        });
        dir.node.attach_child(child.clone())?;
        Ok(child)
    }
}

/// Cursor de uma instância aberta de arquivo.
#[derive(Clone)]
pub struct File {
    pub vnode: Arc<Vnode>,
    pub pos: usize,
    pub f_ops: &'static dyn FileOps,
    pub flags: u32,
}

impl File {
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, KernelError> {
        let ops = self.f_ops;
        ops.read(self, buf)
    }

    pub fn write(&mut self, buf: &[u8]) -> Result<usize, KernelError> {
        let ops = self.f_ops;
        ops.write(self, buf)
    }

    pub fn seek(&mut self, offset: i64, whence: u32) -> Result<i64, KernelError> {
        let ops = self.f_ops;
        ops.lseek64(self, offset, whence)
    }

    pub fn ioctl(&mut self, cmd: u64, arg: u64) -> Result<i64, KernelError> {
        let ops = self.f_ops;
        ops.ioctl(self, cmd, arg)
    }

    pub fn close(&mut self) -> Result<(), KernelError> {
        let ops = self.f_ops;
        ops.close(self)
    }
}

// ------------------------------------------------------------
// Registro global e montagem raiz
// ------------------------------------------------------------

static REGISTRY: Mutex<Vec<&'static dyn Filesystem>> = Mutex::new(Vec::new());
static ROOT: Once<Arc<Mount>> = Once::new();

/// Registra um backend. Nome duplicado e registro cheio são erros.
pub fn register_filesystem(fs: &'static dyn Filesystem) -> Result<(), KernelError> {
    let mut registry = REGISTRY.lock();
    if registry.iter().any(|f| f.name() == fs.name()) {
        return Err(KernelError::AlreadyExists);
    }
    if registry.len() >= MAX_FILESYSTEMS {
        return Err(KernelError::NoMemory);
    }
    registry.push(fs);
    crate::kinfo!("(VFS) Filesystem registrado: ");
    crate::kinfo!(fs.name());
    Ok(())
}

fn find_filesystem(name: &str) -> Option<&'static dyn Filesystem> {
    REGISTRY.lock().iter().find(|f| f.name() == name).copied()
}

/// Monta a raiz global com o filesystem pedido. Uma vez só, no boot.
pub fn init_root(fs_name: &'static str) -> Result<(), KernelError> {
    let fs = find_filesystem(fs_name).ok_or(KernelError::NotFound)?;
    let root = fs.setup_mount()?;
    let mount = Arc::new(Mount {
        fs_name,
        root: Once::new(),
    });
    mount.root.call_once(|| root);
    ROOT.call_once(|| mount);
    crate::kinfo!("(VFS) Raiz global montada");
    Ok(())
}

/// Vnode raiz do mount global.
pub fn root_vnode() -> Result<Arc<Vnode>, KernelError> {
    ROOT.get()
        .and_then(|m| m.root.get().cloned())
        .ok_or(KernelError::InternalInconsistency)
}

// ------------------------------------------------------------
// Resolução de caminho
// ------------------------------------------------------------

/// Segue pontos de anexação até sair em um vnode que não é montado.
fn redirect_into_mount(mut cur: Arc<Vnode>) -> Arc<Vnode> {
    loop {
        let redirected = cur
            .mount
            .lock()
            .as_ref()
            .and_then(|m| m.root.get().cloned());
        match redirected {
            Some(root) if !Arc::ptr_eq(&root, &cur) => cur = root,
            _ => return cur,
        }
    }
}

/// Um passo de `..`. Na raiz global é um no-op; saindo da raiz sintética
/// de uma montagem, a subida continua do pai do ponto de anexação.
fn ascend(cur: Arc<Vnode>, root: &Arc<Vnode>) -> Result<Arc<Vnode>, KernelError> {
    if Arc::ptr_eq(&cur, root) {
        return Ok(cur);
    }
    let link = cur.parent.lock().clone();
    let Some(link) = link else {
        crate::kerror!("(VFS) '..' sem pai fora da raiz");
        return Err(KernelError::InternalInconsistency);
    };
    let parent = link
        .vnode
        .upgrade()
        .ok_or(KernelError::InternalInconsistency)?;

    if !link.crosses_mount {
        return Ok(parent);
    }
    // `cur` é raiz de montagem; `parent` é o ponto de anexação. Subir de
    // verdade significa sair para o pai DELE, no filesystem de fora.
    let outer = parent.parent.lock().clone();
    match outer.and_then(|l| l.vnode.upgrade()) {
        Some(grand) => Ok(grand),
        None => Ok(root.clone()),
    }
}

/// Resolve um caminho até o vnode final.
pub fn lookup(path: &str) -> Result<Arc<Vnode>, KernelError> {
    let root = root_vnode()?;

    let mut cur = if path.starts_with('/') {
        root.clone()
    } else {
        crate::sched::current_cwd().unwrap_or_else(|| root.clone())
    };
    cur = redirect_into_mount(cur);

    for component in path.split('/').filter(|c| !c.is_empty()) {
        match component {
            "." => continue,
            ".." => {
                cur = ascend(cur, &root)?;
                cur = redirect_into_mount(cur);
            }
            name => {
                cur = redirect_into_mount(cur);
                cur = cur.v_ops.lookup(&cur, name)?;
                cur = redirect_into_mount(cur);
            }
        }
    }
    Ok(cur)
}

/// Separa `path` em (vnode do diretório pai, nome da folha), com a
/// disciplina usada por open-com-create, mkdir e mknod.
fn resolve_parent(path: &str) -> Result<(Arc<Vnode>, &str), KernelError> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(KernelError::InvalidArgument);
    }
    match trimmed.rfind('/') {
        // Sem barra: o pai é o cwd da tarefa corrente.
        None => {
            let parent = crate::sched::current_cwd()
                .map(Ok)
                .unwrap_or_else(root_vnode)?;
            Ok((redirect_into_mount(parent), trimmed))
        }
        // Uma barra inicial: o pai é a raiz global.
        Some(0) => Ok((redirect_into_mount(root_vnode()?), &trimmed[1..])),
        Some(pos) => {
            let parent = lookup(&trimmed[..pos])?;
            Ok((redirect_into_mount(parent), &trimmed[pos + 1..]))
        }
    }
}

// ------------------------------------------------------------
// Operações de caminho
// ------------------------------------------------------------

/// Abre (ou cria, com O_CREAT) um arquivo e devolve o cursor.
pub fn open(path: &str, flags: u32) -> Result<File, KernelError> {
    let vnode = match lookup(path) {
        Ok(vnode) => vnode,
        Err(KernelError::NotFound) if flags & O_CREAT != 0 => {
            let (parent, leaf) = resolve_parent(path)?;
            parent.v_ops.create(&parent, leaf)?
        }
        Err(err) => return Err(err),
    };

    let f_ops = *vnode.f_ops.lock();
    f_ops.open(&vnode)?;
    Ok(File {
        vnode,
        pos: 0,
        f_ops,
        flags,
    })
}

/// Cria um diretório.
pub fn mkdir(path: &str) -> Result<(), KernelError> {
    let (parent, leaf) = resolve_parent(path)?;
    parent.v_ops.mkdir(&parent, leaf)?;
    Ok(())
}

/// Cria um nó e rebinda suas operações de arquivo para um dispositivo.
pub fn mknod(path: &str, f_ops: &'static dyn FileOps) -> Result<Arc<Vnode>, KernelError> {
    let (parent, leaf) = resolve_parent(path)?;
    let vnode = parent.v_ops.create(&parent, leaf)?;
    *vnode.f_ops.lock() = f_ops;
    crate::kinfo!("(VFS) Dispositivo criado: ");
    crate::kinfo!(path);
    Ok(vnode)
}

/// Anexa uma instância nova do filesystem `fs_name` sobre `target`.
pub fn mount(target: &str, fs_name: &str) -> Result<(), KernelError> {
    let fs = find_filesystem(fs_name).ok_or(KernelError::NotFound)?;
    let target_vnode = lookup(target)?;

    if target_vnode.node.kind != NodeKind::Directory {
        return Err(KernelError::NotSupported);
    }
    // A resolução já entra em montagens; se o vnode final é a raiz
    // sintética de uma, o alvo já está montado.
    if let Some(link) = target_vnode.parent.lock().as_ref() {
        if link.crosses_mount {
            return Err(KernelError::Busy);
        }
    }

    // Anexação provisória; qualquer falha de setup desfaz.
    let record = Arc::new(Mount {
        fs_name: fs.name(),
        root: Once::new(),
    });
    {
        let mut slot = target_vnode.mount.lock();
        if slot.is_some() {
            return Err(KernelError::Busy);
        }
        *slot = Some(record.clone());
    }

    match fs.setup_mount() {
        Ok(new_root) => {
            *new_root.parent.lock() = Some(ParentLink {
                vnode: Arc::downgrade(&target_vnode),
                crosses_mount: true,
            });
            record.root.call_once(|| new_root);
            crate::kinfo!("(VFS) Montado em: ");
            crate::kinfo!(target);
            Ok(())
        }
        Err(err) => {
            *target_vnode.mount.lock() = None;
            crate::kwarn!("(VFS) setup_mount falhou; anexacao desfeita");
            Err(err)
        }
    }
}
