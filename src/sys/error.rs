//! # Códigos de Erro do Kernel
//!
//! Taxonomia única de erros, compartilhada por alocadores, scheduler e VFS.
//! Um erro produzido numa camada baixa (ex: `NotFound` num backend de
//! filesystem) atravessa `lookup` → `open` → handler de syscall sem ser
//! traduzido; só na fronteira do trap frame ele vira o valor negativo
//! convencional (`as_isize`).

/// Erros do kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum KernelError {
    /// Argumento nulo, zero ou fora de faixa
    InvalidArgument = 1,
    /// Exaustão de memória (buddy ou slab)
    NoMemory = 2,
    /// Caminho, componente ou tarefa inexistente
    NotFound = 3,
    /// Criação duplicada (arquivo/diretório/filesystem já existe)
    AlreadyExists = 4,
    /// Operação não permitida pelo backend (ex: write em initramfs)
    PermissionDenied = 5,
    /// Slot de operação ausente na tabela de operações
    NotSupported = 6,
    /// Alvo já é ponto de montagem
    Busy = 7,
    /// Violação de invariante interna (cwd ausente, fila corrompida)
    InternalInconsistency = 8,
    /// Número de syscall desconhecido
    NoSuchSyscall = 9,
}

impl KernelError {
    /// Descrição legível, para os logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "argumento inválido",
            Self::NoMemory => "sem memória",
            Self::NotFound => "não encontrado",
            Self::AlreadyExists => "já existe",
            Self::PermissionDenied => "permissão negada",
            Self::NotSupported => "operação não suportada",
            Self::Busy => "recurso ocupado",
            Self::InternalInconsistency => "inconsistência interna",
            Self::NoSuchSyscall => "syscall inexistente",
        }
    }

    /// Codificação ABI: valor negativo no slot de retorno do trap frame.
    /// Usar APENAS na fronteira de syscall; internamente o kernel trafega
    /// `Result<_, KernelError>`.
    pub fn as_isize(self) -> isize {
        -(self as i32) as isize
    }
}

/// Resultado padrão do kernel.
pub type KernelResult<T> = Result<T, KernelError>;
