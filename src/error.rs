use thiserror::Error;

/// Errors surfaced by codec construction, encoding and decoding.
///
/// All failures leave the codec and the caller's symbol buffers with
/// their previous contents; nothing is retried internally.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FecError {
    /// The field width is outside [2, 16] or cannot be stored in the
    /// requested element type.
    #[error("unsupported field width {bits} for this element type")]
    FieldWidth { bits: u32 },

    /// `k` and `n` violate `1 <= k <= n <= 2^m`.
    #[error("invalid code parameters k={k} n={n} over GF(2^{bits})")]
    InvalidParams { k: usize, n: usize, bits: u32 },

    /// An encoded-symbol index is outside `[0, n)`.
    #[error("invalid symbol index {index} (max {max})")]
    InvalidIndex { index: usize, max: usize },

    /// Two received symbols claim the same index.
    #[error("duplicate symbol index {index}")]
    DuplicateIndex { index: usize },

    /// Gauss-Jordan could not find a pivot; the received set is not
    /// decodable.
    #[error("singular decode matrix")]
    SingularMatrix,

    /// Symbol buffers do not all hold the same number of elements, or
    /// the wrong number of symbols was supplied.
    #[error("symbol buffers must hold the same number of elements")]
    LengthMismatch,

    /// An aligned scratch allocation failed.
    #[error("aligned buffer allocation failed")]
    Allocation,
}
