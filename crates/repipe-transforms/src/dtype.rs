//! Numeric dtype names accepted in transform parameters.
//!
//! Field values are always computed as `f32`; the dtype only controls rounding
//! of fill values and is kept so configurations round-trip unchanged.

const INTEGER_DTYPES: &[&str] = &[
    "int8", "int16", "int32", "int64", "uint8", "uint16", "uint32", "uint64", "i1", "i2", "i4",
    "i8", "u1", "u2", "u4", "u8",
];

const FLOAT_DTYPES: &[&str] = &["float16", "float32", "float64", "f2", "f4", "f8"];

pub fn is_integer(dtype: &str) -> bool {
    INTEGER_DTYPES.contains(&dtype)
}

pub fn is_float(dtype: &str) -> bool {
    FLOAT_DTYPES.contains(&dtype)
}

pub fn is_supported(dtype: &str) -> bool {
    is_integer(dtype) || is_float(dtype)
}
