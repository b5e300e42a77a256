//! # ============================================================
//! # Parser de arquivos CPIO (formato "newc")
//! # ============================================================
//!
//! Formato ASCII: cabeçalho de 110 bytes com campos em hexadecimal de 8
//! dígitos, seguido do nome (terminado em NUL) e dos dados, ambos com
//! padding para alinhamento de 4 bytes contado do início do cabeçalho.
//! O arquivo termina na entrada de nome `TRAILER!!!`.

const MAGIC: &[u8; 6] = b"070701";
const HEADER_SIZE: usize = 110;
const TRAILER: &str = "TRAILER!!!";

const MODE_TYPE_MASK: u32 = 0o170000;
const MODE_DIR: u32 = 0o040000;

/// Uma entrada do arquivo.
pub struct CpioEntry<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
    pub is_dir: bool,
}

/// Iterador sobre as entradas de um arquivo newc.
pub struct CpioReader<'a> {
    archive: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> CpioReader<'a> {
    pub fn new(archive: &'a [u8]) -> Self {
        CpioReader {
            archive,
            offset: 0,
            done: false,
        }
    }
}

fn parse_hex8(field: &[u8]) -> Option<u32> {
    let mut value: u32 = 0;
    for &byte in field {
        let digit = (byte as char).to_digit(16)?;
        value = value.wrapping_shl(4) | digit;
    }
    Some(value)
}

fn align4(offset: usize) -> usize {
    (offset + 3) & !3
}

impl<'a> Iterator for CpioReader<'a> {
    type Item = CpioEntry<'a>;

    fn next(&mut self) -> Option<CpioEntry<'a>> {
        if self.done {
            return None;
        }
        let header = self.archive.get(self.offset..self.offset + HEADER_SIZE)?;
        if &header[0..6] != MAGIC {
            crate::kwarn!("(CPIO) Magic invalido em: ", self.offset);
            self.done = true;
            return None;
        }

        let mode = parse_hex8(&header[14..22])?;
        let file_size = parse_hex8(&header[54..62])? as usize;
        let name_size = parse_hex8(&header[94..102])? as usize;

        let name_start = self.offset + HEADER_SIZE;
        let name_bytes = self.archive.get(name_start..name_start + name_size)?;
        // Descarta o NUL final.
        let name = core::str::from_utf8(name_bytes.split_last()?.1).ok()?;

        let data_start = align4(name_start + name_size);
        let data = self.archive.get(data_start..data_start + file_size)?;
        self.offset = align4(data_start + file_size);

        if name == TRAILER {
            self.done = true;
            return None;
        }
        Some(CpioEntry {
            name,
            data,
            is_dir: mode & MODE_TYPE_MASK == MODE_DIR,
        })
    }
}
