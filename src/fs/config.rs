//! Constantes do subsistema de arquivos.

/// Tamanho máximo de nome de componente.
pub const MAX_FILE_NAME: usize = 64;

/// Teto de filhos por diretório.
pub const MAX_CHILDREN: usize = 16;

/// Capacidade inicial do buffer de um arquivo novo.
pub const DEFAULT_FILE_CAPACITY: usize = 4096;

/// Capacidade do registro de filesystems.
pub const MAX_FILESYSTEMS: usize = 10;

/// Flag de open: cria o arquivo se o lookup falhar.
pub const O_CREAT: u32 = 0o100;

/// Whence de lseek64.
pub const SEEK_SET: u32 = 0;
pub const SEEK_CUR: u32 = 1;
pub const SEEK_END: u32 = 2;
