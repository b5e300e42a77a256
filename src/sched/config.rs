//! Constantes do scheduler.

/// Tamanho das pilhas de kernel e de usuário de cada tarefa.
pub const THREAD_STACK_SIZE: usize = 0x1000;

/// Prioridade e fatia de tempo iniciais.
pub const DEFAULT_PRIORITY: i64 = 10;

/// Número de slots da tabela de descritores de arquivo.
pub const FD_TABLE_SIZE: usize = 16;

/// Quantidade de sinais suportados.
pub const SIG_COUNT: usize = 32;

/// Sinal cujo handler padrão termina a tarefa.
pub const SIGKILL: usize = 9;

/// Caminho do dispositivo de console pré-aberto nos descritores 0..2.
pub const CONSOLE_PATH: &str = "/dev/uart";
