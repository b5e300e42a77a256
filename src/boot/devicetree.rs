//! # ============================================================
//! # Devicetree: localização do initramfs deixado pelo bootloader
//! # ============================================================
//!
//! Parser mínimo do FDT achatado: só o suficiente para varrer o bloco
//! de estrutura e pescar `linux,initrd-start` e `linux,initrd-end`.
//! Todos os campos são big-endian.

/// Assinatura no início de todo blob FDT.
pub const FDT_MAGIC: u32 = 0xd00d_feed;

const FDT_BEGIN_NODE: u32 = 1;
const FDT_END_NODE: u32 = 2;
const FDT_PROP: u32 = 3;
const FDT_NOP: u32 = 4;
const FDT_END: u32 = 9;

const HEADER_MAGIC: usize = 0;
const HEADER_TOTAL_SIZE: usize = 4;
const HEADER_OFF_STRUCT: usize = 8;
const HEADER_OFF_STRINGS: usize = 12;

fn be32(blob: &[u8], offset: usize) -> Option<u32> {
    let chunk = blob.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
}

fn align4(offset: usize) -> usize {
    (offset + 3) & !3
}

/// String NUL-terminada dentro do blob.
fn cstr_at(blob: &[u8], offset: usize) -> Option<&str> {
    let tail = blob.get(offset..)?;
    let len = tail.iter().position(|&b| b == 0)?;
    core::str::from_utf8(&tail[..len]).ok()
}

/// Tamanho declarado no cabeçalho, se o magic confere.
pub fn total_size(blob: &[u8]) -> Option<usize> {
    if be32(blob, HEADER_MAGIC)? != FDT_MAGIC {
        return None;
    }
    Some(be32(blob, HEADER_TOTAL_SIZE)? as usize)
}

/// Varre as propriedades do blob atrás da faixa `[start, end)` do
/// initramfs. `None` quando o blob é inválido ou não a declara.
pub fn find_initrd(blob: &[u8]) -> Option<(usize, usize)> {
    if be32(blob, HEADER_MAGIC)? != FDT_MAGIC {
        crate::kwarn!("(FDT) Magic invalido");
        return None;
    }
    let strings_base = be32(blob, HEADER_OFF_STRINGS)? as usize;
    let mut cursor = be32(blob, HEADER_OFF_STRUCT)? as usize;

    let mut start: Option<usize> = None;
    let mut end: Option<usize> = None;

    loop {
        let token = be32(blob, cursor)?;
        cursor += 4;
        match token {
            FDT_BEGIN_NODE => {
                let name = cstr_at(blob, cursor)?;
                cursor = align4(cursor + name.len() + 1);
            }
            FDT_END_NODE | FDT_NOP => {}
            FDT_PROP => {
                let len = be32(blob, cursor)? as usize;
                let name_off = be32(blob, cursor + 4)? as usize;
                let data = cursor + 8;
                cursor = align4(data + len);

                let name = cstr_at(blob, strings_base + name_off)?;
                match name {
                    "linux,initrd-start" => start = Some(be32(blob, data)? as usize),
                    "linux,initrd-end" => end = Some(be32(blob, data)? as usize),
                    _ => {}
                }
                if let (Some(start), Some(end)) = (start, end) {
                    return Some((start, end));
                }
            }
            FDT_END => return None,
            _ => {
                crate::kwarn!("(FDT) Token invalido=", token);
                return None;
            }
        }
    }
}

#[cfg(feature = "self_test")]
pub mod test {
    use super::*;
    use crate::klib::test_framework::{run_test_suite, TestCase, TestResult};
    use crate::test_assert;
    use alloc::vec::Vec;

    fn push_be32(out: &mut Vec<u8>, value: u32) {
        out.extend_from_slice(&value.to_be_bytes());
    }

    /// Blob sintético com um nó raiz e as duas propriedades do initrd.
    fn sample_blob() -> Vec<u8> {
        let strings = b"linux,initrd-start\0linux,initrd-end\0";
        let mut body = Vec::new();
        push_be32(&mut body, FDT_BEGIN_NODE);
        body.extend_from_slice(b"\0\0\0\0");
        push_be32(&mut body, FDT_PROP);
        push_be32(&mut body, 4);
        push_be32(&mut body, 0);
        push_be32(&mut body, 0x0800_0000);
        push_be32(&mut body, FDT_PROP);
        push_be32(&mut body, 4);
        push_be32(&mut body, 19);
        push_be32(&mut body, 0x0810_0000);
        push_be32(&mut body, FDT_END_NODE);
        push_be32(&mut body, FDT_END);

        let off_struct = 40;
        let off_strings = off_struct + body.len();
        let mut blob = Vec::new();
        push_be32(&mut blob, FDT_MAGIC);
        push_be32(&mut blob, (off_strings + strings.len()) as u32);
        push_be32(&mut blob, off_struct as u32);
        push_be32(&mut blob, off_strings as u32);
        while blob.len() < off_struct {
            push_be32(&mut blob, 0);
        }
        blob.extend_from_slice(&body);
        blob.extend_from_slice(strings);
        blob
    }

    fn test_find_initrd() -> TestResult {
        let blob = sample_blob();
        match find_initrd(&blob) {
            Some((start, end)) => {
                test_assert!(start == 0x0800_0000);
                test_assert!(end == 0x0810_0000);
            }
            None => return TestResult::Failed,
        }
        test_assert!(total_size(&blob) == Some(blob.len()));
        TestResult::Passed
    }

    fn test_bad_magic() -> TestResult {
        let mut blob = sample_blob();
        blob[0] = 0;
        test_assert!(find_initrd(&blob).is_none());
        test_assert!(total_size(&blob).is_none());
        TestResult::Passed
    }

    fn test_truncated_blob() -> TestResult {
        let blob = sample_blob();
        test_assert!(find_initrd(&blob[..48]).is_none());
        TestResult::Passed
    }

    pub fn run() {
        const TESTS: &[TestCase] = &[
            TestCase {
                name: "find_initrd",
                func: test_find_initrd,
            },
            TestCase {
                name: "bad_magic",
                func: test_bad_magic,
            },
            TestCase {
                name: "truncated_blob",
                func: test_truncated_blob,
            },
        ];
        run_test_suite("devicetree", TESTS);
    }
}
