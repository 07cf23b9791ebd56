//! Scalar, vector, matrix and struct types for buffer elements.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

/// Interpretation of the bits of a single component.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FormatMode {
    UNorm,
    SNorm,
    UScaled,
    SScaled,
    UInt,
    SInt,
    UFloat,
    SFloat,
    Srgb,
}

impl FormatMode {
    pub fn is_float(self) -> bool {
        self == FormatMode::SFloat || self == FormatMode::UFloat
    }

    pub fn is_signed_int(self) -> bool {
        self == FormatMode::SInt
    }

    pub fn is_unsigned_int(self) -> bool {
        self == FormatMode::UInt
    }
}

/// A member of a [`StructType`].
#[derive(Clone, Debug, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub ty: Type,
    pub offset: Option<u32>,
    pub array_stride: Option<u32>,
    pub matrix_stride: Option<u32>,
}

impl StructMember {
    pub fn has_offset(&self) -> bool {
        self.offset.is_some()
    }
    pub fn has_array_stride(&self) -> bool {
        self.array_stride.is_some()
    }
    pub fn has_matrix_stride(&self) -> bool {
        self.matrix_stride.is_some()
    }
}

/// An aggregate type declared with `STRUCT`.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct StructType {
    pub members: Vec<StructMember>,
    pub stride: Option<u32>,
}

impl StructType {
    pub fn has_stride(&self) -> bool {
        self.stride.is_some()
    }

    pub fn member(&self, name: &str) -> Option<&StructMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// The element type of a buffer, image or probe value.
///
/// Types own their nested struct definitions by value; embedding a
/// previously declared struct clones its definition, which is sound because
/// types are immutable once their declaring block closes.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Number {
        mode: FormatMode,
        bits: u32,
        /// Component count of a column (1 for scalars).
        rows: u32,
        /// Column count (> 1 for matrices).
        columns: u32,
    },
    Struct(StructType),
}

impl Type {
    pub fn scalar(mode: FormatMode, bits: u32) -> Type {
        Type::Number {
            mode,
            bits,
            rows: 1,
            columns: 1,
        }
    }

    pub fn vec(mode: FormatMode, bits: u32, rows: u32) -> Type {
        Type::Number {
            mode,
            bits,
            rows,
            columns: 1,
        }
    }

    pub fn matrix(mode: FormatMode, bits: u32, rows: u32, columns: u32) -> Type {
        Type::Number {
            mode,
            bits,
            rows,
            columns,
        }
    }

    pub fn is_struct(&self) -> bool {
        match self {
            Type::Struct(_) => true,
            _ => false,
        }
    }

    pub fn is_number(&self) -> bool {
        !self.is_struct()
    }

    pub fn is_vec(&self) -> bool {
        match self {
            Type::Number { rows, columns, .. } => *rows > 1 && *columns == 1,
            _ => false,
        }
    }

    pub fn is_matrix(&self) -> bool {
        match self {
            Type::Number { columns, .. } => *columns > 1,
            _ => false,
        }
    }

    pub fn is_scalar(&self) -> bool {
        match self {
            Type::Number { rows, columns, .. } => *rows == 1 && *columns == 1,
            _ => false,
        }
    }

    pub fn row_count(&self) -> u32 {
        match self {
            Type::Number { rows, .. } => *rows,
            Type::Struct(_) => 1,
        }
    }

    pub fn column_count(&self) -> u32 {
        match self {
            Type::Number { columns, .. } => *columns,
            Type::Struct(_) => 1,
        }
    }

    pub fn format_mode(&self) -> Option<FormatMode> {
        match self {
            Type::Number { mode, .. } => Some(*mode),
            Type::Struct(_) => None,
        }
    }

    pub fn num_bits(&self) -> Option<u32> {
        match self {
            Type::Number { bits, .. } => Some(*bits),
            Type::Struct(_) => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match self {
            Type::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// True when every component holds a floating value.
    pub fn is_float(&self) -> bool {
        match self {
            Type::Number { mode, .. } => mode.is_float(),
            Type::Struct(_) => false,
        }
    }

    fn is_number_of(&self, mode: FormatMode, bits: u32) -> bool {
        match self {
            Type::Number {
                mode: m,
                bits: b,
                rows: 1,
                columns: 1,
            } => *m == mode && *b == bits,
            _ => false,
        }
    }

    pub fn is_int8(&self) -> bool {
        self.is_number_of(FormatMode::SInt, 8)
    }
    pub fn is_int16(&self) -> bool {
        self.is_number_of(FormatMode::SInt, 16)
    }
    pub fn is_int32(&self) -> bool {
        self.is_number_of(FormatMode::SInt, 32)
    }
    pub fn is_int64(&self) -> bool {
        self.is_number_of(FormatMode::SInt, 64)
    }
    pub fn is_uint8(&self) -> bool {
        self.is_number_of(FormatMode::UInt, 8)
    }
    pub fn is_uint16(&self) -> bool {
        self.is_number_of(FormatMode::UInt, 16)
    }
    pub fn is_uint32(&self) -> bool {
        self.is_number_of(FormatMode::UInt, 32)
    }
    pub fn is_uint64(&self) -> bool {
        self.is_number_of(FormatMode::UInt, 64)
    }
    pub fn is_float16(&self) -> bool {
        self.is_number_of(FormatMode::SFloat, 16)
    }
    pub fn is_float32(&self) -> bool {
        self.is_number_of(FormatMode::SFloat, 32)
    }
    pub fn is_float64(&self) -> bool {
        self.is_number_of(FormatMode::SFloat, 64)
    }

    /// True for the 32-bit types accepted as specialization constants.
    pub fn is_32bit_scalar(&self) -> bool {
        self.is_int32() || self.is_uint32() || self.is_float32()
    }
}

lazy_static! {
    static ref RE_VEC: Regex = Regex::new(r"^vec([234])<([a-z0-9]+)>$").unwrap();
    static ref RE_MAT: Regex = Regex::new(r"^mat([234])x([234])<([a-z0-9]+)>$").unwrap();
}

fn parse_scalar_name(name: &str) -> Option<Type> {
    let ty = match name {
        "int8" => Type::scalar(FormatMode::SInt, 8),
        "int16" => Type::scalar(FormatMode::SInt, 16),
        "int32" => Type::scalar(FormatMode::SInt, 32),
        "int64" => Type::scalar(FormatMode::SInt, 64),
        "uint8" => Type::scalar(FormatMode::UInt, 8),
        "uint16" => Type::scalar(FormatMode::UInt, 16),
        "uint32" => Type::scalar(FormatMode::UInt, 32),
        "uint64" => Type::scalar(FormatMode::UInt, 64),
        "float16" => Type::scalar(FormatMode::SFloat, 16),
        "float" => Type::scalar(FormatMode::SFloat, 32),
        "double" => Type::scalar(FormatMode::SFloat, 64),
        _ => return None,
    };
    Some(ty)
}

/// Parses a `DATA_TYPE` style name: a scalar name, `vecN<scalar>` or
/// `matCxR<scalar>` (GLSL column-major naming, so `mat2x4` is two columns of
/// four rows).
pub fn parse_type_name(name: &str) -> Result<Type> {
    if let Some(ty) = parse_scalar_name(name) {
        return Ok(ty);
    }

    let invalid = || Error::new(format!("invalid data type '{}' provided", name));

    if let Some(caps) = RE_VEC.captures(name) {
        let rows: u32 = caps[1].parse().unwrap();
        let scalar = parse_scalar_name(&caps[2]).ok_or_else(invalid)?;
        match scalar {
            Type::Number { mode, bits, .. } => return Ok(Type::vec(mode, bits, rows)),
            _ => return Err(invalid()),
        }
    }

    if let Some(caps) = RE_MAT.captures(name) {
        let columns: u32 = caps[1].parse().unwrap();
        let rows: u32 = caps[2].parse().unwrap();
        let scalar = parse_scalar_name(&caps[3]).ok_or_else(invalid)?;
        match scalar {
            Type::Number { mode, bits, .. } => {
                return Ok(Type::matrix(mode, bits, rows, columns));
            }
            _ => return Err(invalid()),
        }
    }

    Err(invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_names() {
        assert!(parse_type_name("uint8").unwrap().is_uint8());
        assert!(parse_type_name("int64").unwrap().is_int64());
        assert!(parse_type_name("float").unwrap().is_float32());
        assert!(parse_type_name("float16").unwrap().is_float16());
        assert!(parse_type_name("double").unwrap().is_float64());
    }

    #[test]
    fn vec_names() {
        let ty = parse_type_name("vec3<float>").unwrap();
        assert!(ty.is_vec());
        assert_eq!(3, ty.row_count());
        assert_eq!(Some(FormatMode::SFloat), ty.format_mode());

        let ty = parse_type_name("vec2<int8>").unwrap();
        assert_eq!(2, ty.row_count());
        assert_eq!(Some(8), ty.num_bits());
    }

    #[test]
    fn mat_names_are_column_major() {
        let ty = parse_type_name("mat2x4<int32>").unwrap();
        assert!(ty.is_matrix());
        assert_eq!(4, ty.row_count());
        assert_eq!(2, ty.column_count());

        let ty = parse_type_name("mat4x2<uint16>").unwrap();
        assert_eq!(2, ty.row_count());
        assert_eq!(4, ty.column_count());
    }

    #[test]
    fn invalid_names_rejected() {
        for name in &[
            "int17",
            "uintt0",
            "vec7<uint8>",
            "vec27<uint8>",
            "vec2<vec2<float>>",
            "vec2<mat2x2<float>>",
            "vec2float>",
            "vec2<uint32",
            "vec2<uint4>",
            "vec2<>",
            "vec2",
            "mat1x1<double>",
            "mat5x2<double>",
            "mat2x5<double>",
            "mat22x22<double>",
            "matx5<double>",
            "mat2<double>",
            "mat2x<double>",
            "mat2x2<vec4<float>>",
            "mat2x2",
            "mat2x2<>",
        ] {
            let r = parse_type_name(name);
            assert!(r.is_err(), "{} should be rejected", name);
            assert_eq!(
                format!("invalid data type '{}' provided", name),
                r.unwrap_err().to_string()
            );
        }
    }

    #[test]
    fn spec_constant_types() {
        assert!(parse_type_name("uint32").unwrap().is_32bit_scalar());
        assert!(parse_type_name("float").unwrap().is_32bit_scalar());
        assert!(!parse_type_name("uint8").unwrap().is_32bit_scalar());
        assert!(!parse_type_name("double").unwrap().is_32bit_scalar());
    }
}
