//! Aritmética de alinhamento.

/// Arredonda `value` para cima até o próximo múltiplo de `align`.
///
/// `align` deve ser potência de dois.
#[inline]
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Arredonda `value` para baixo até o múltiplo anterior de `align`.
///
/// `align` deve ser potência de dois.
#[inline]
pub const fn align_down(value: usize, align: usize) -> usize {
    value & !(align - 1)
}

/// Menor potência de dois maior ou igual a `value`.
#[inline]
pub const fn next_pow2(value: usize) -> usize {
    if value <= 1 {
        1
    } else {
        1 << (usize::BITS - (value - 1).leading_zeros())
    }
}
