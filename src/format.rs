//! Memory formats and the std140/std430 layout engine.
//!
//! A [`Format`] pairs an element [`Type`] with a memory layout and a flat
//! list of [`Segment`]s describing how one element lands in buffer memory:
//! one segment per component plus explicit padding segments. All sizing
//! questions (element stride, struct member offsets, vec3 slack) are
//! answered by the segment list so that data emission and size reporting can
//! never disagree.

use byteorder::{LittleEndian, WriteBytesExt};
use lazy_static::lazy_static;
use regex::Regex;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::float16::{f32_to_hex_float10, f32_to_hex_float11, f32_to_hex_float16};
use crate::types::{FormatMode, StructType, Type};
use crate::value::Value;

/// Buffer memory layout rule set.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Layout {
    Std140,
    Std430,
}

impl Default for Layout {
    fn default() -> Layout {
        Layout::Std430
    }
}

/// Identity of a component within an element.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ComponentType {
    R,
    G,
    B,
    A,
    D,
    S,
    X,
}

impl ComponentType {
    fn from_letter(letter: u8) -> Option<ComponentType> {
        match letter {
            b'R' => Some(ComponentType::R),
            b'G' => Some(ComponentType::G),
            b'B' => Some(ComponentType::B),
            b'A' => Some(ComponentType::A),
            b'D' => Some(ComponentType::D),
            b'S' => Some(ComponentType::S),
            b'X' => Some(ComponentType::X),
            _ => None,
        }
    }

    fn by_index(idx: u32) -> ComponentType {
        match idx {
            0 => ComponentType::R,
            1 => ComponentType::G,
            2 => ComponentType::B,
            _ => ComponentType::A,
        }
    }
}

/// One slice of an element's memory image.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Segment {
    Component {
        name: ComponentType,
        mode: FormatMode,
        bits: u32,
    },
    Padding {
        bits: u32,
    },
}

impl Segment {
    pub fn is_padding(&self) -> bool {
        match self {
            Segment::Padding { .. } => true,
            _ => false,
        }
    }

    pub fn bits(&self) -> u32 {
        match *self {
            Segment::Component { bits, .. } => bits,
            Segment::Padding { bits } => bits,
        }
    }

    pub fn mode(&self) -> Option<FormatMode> {
        match *self {
            Segment::Component { mode, .. } => Some(mode),
            Segment::Padding { .. } => None,
        }
    }
}

pub type Segments = SmallVec<[Segment; 8]>;

fn round_up(value: u32, align: u32) -> u32 {
    debug_assert!(align > 0);
    (value + align - 1) / align * align
}

/// Base alignment in bytes of a column vector of `rows` components of
/// `bits`-wide scalars. Scalars align to their own size, vec2 to twice it,
/// vec3 and vec4 to four times it.
fn vec_alignment(rows: u32, bits: u32) -> u32 {
    let n = bits / 8;
    match rows {
        1 => n,
        2 => 2 * n,
        _ => 4 * n,
    }
}

/// Base alignment of a type under the given layout. std140 rounds struct and
/// matrix alignments up to 16 bytes.
fn type_alignment(ty: &Type, layout: Layout) -> u32 {
    match ty {
        Type::Number {
            bits,
            rows,
            columns,
            ..
        } => {
            let col = vec_alignment(*rows, *bits);
            if *columns > 1 && layout == Layout::Std140 {
                round_up(col, 16)
            } else {
                col
            }
        }
        Type::Struct(s) => {
            let align = s
                .members
                .iter()
                .map(|m| type_alignment(&m.ty, layout))
                .max()
                .unwrap_or(1);
            if layout == Layout::Std140 {
                round_up(align, 16)
            } else {
                align
            }
        }
    }
}

/// Appends the segments of one element of `ty` to `out`.
fn build_type_segments(
    ty: &Type,
    layout: Layout,
    matrix_stride: Option<u32>,
    out: &mut Segments,
) {
    match ty {
        Type::Number {
            mode,
            bits,
            rows,
            columns,
        } => {
            if *columns > 1 {
                // A matrix is an array of column vectors; the column stride
                // follows the vector alignment rule, rounded up to 16 under
                // std140, unless MATRIX_STRIDE overrides it.
                let default_stride = if layout == Layout::Std140 {
                    round_up(vec_alignment(*rows, *bits), 16)
                } else {
                    vec_alignment(*rows, *bits)
                };
                let stride = matrix_stride.unwrap_or(default_stride);
                let col_bytes = rows * bits / 8;
                for _ in 0..*columns {
                    for row in 0..*rows {
                        out.push(Segment::Component {
                            name: ComponentType::by_index(row),
                            mode: *mode,
                            bits: *bits,
                        });
                    }
                    if stride > col_bytes {
                        out.push(Segment::Padding {
                            bits: (stride - col_bytes) * 8,
                        });
                    }
                }
            } else {
                for row in 0..*rows {
                    out.push(Segment::Component {
                        name: ComponentType::by_index(row),
                        mode: *mode,
                        bits: *bits,
                    });
                }
                // A vec3 consumes the four-component slot.
                if *rows == 3 {
                    out.push(Segment::Padding { bits: *bits });
                }
            }
        }
        Type::Struct(s) => build_struct_segments(s, layout, out),
    }
}

fn segments_byte_size(segments: &[Segment]) -> u32 {
    segments.iter().map(|s| s.bits() / 8).sum()
}

fn type_size(ty: &Type, layout: Layout, matrix_stride: Option<u32>) -> u32 {
    let mut tmp = Segments::new();
    build_type_segments(ty, layout, matrix_stride, &mut tmp);
    segments_byte_size(&tmp)
}

fn build_struct_segments(s: &StructType, layout: Layout, out: &mut Segments) {
    let mut current = 0u32;
    for member in &s.members {
        let align = type_alignment(&member.ty, layout);
        let offset = member.offset.unwrap_or_else(|| round_up(current, align));
        if offset > current {
            out.push(Segment::Padding {
                bits: (offset - current) * 8,
            });
        }
        build_type_segments(&member.ty, layout, member.matrix_stride, out);
        current = offset + type_size(&member.ty, layout, member.matrix_stride);
    }

    let align = s
        .members
        .iter()
        .map(|m| type_alignment(&m.ty, layout))
        .max()
        .unwrap_or(1);
    let align = if layout == Layout::Std140 {
        round_up(align, 16)
    } else {
        align
    };
    let size = match s.stride {
        Some(stride) => stride,
        None => round_up(current, align),
    };
    if size > current {
        out.push(Segment::Padding {
            bits: (size - current) * 8,
        });
    }
}

/// Element format of a buffer or image.
#[derive(Clone, Debug, PartialEq)]
pub struct Format {
    name: Option<String>,
    ty: Type,
    layout: Layout,
    pack_bits: Option<u32>,
    segments: Segments,
}

impl Format {
    /// Builds a format from an element type, laying it out under `layout`.
    pub fn from_type(ty: Type, layout: Layout) -> Format {
        let mut segments = Segments::new();
        build_type_segments(&ty, layout, None, &mut segments);
        Format {
            name: None,
            ty,
            layout,
            pack_bits: None,
            segments,
        }
    }

    /// Parses an image-format name such as `R32G32B32A32_SFLOAT`,
    /// `D24_UNORM_S8_UINT` or `A2B10G10R10_UNORM_PACK32`.
    pub fn from_name(name: &str) -> Result<Format> {
        parse_format_name(name)
    }

    pub fn format_name(&self) -> Option<&str> {
        self.name.as_ref().map(|s| s.as_str())
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Re-lays the element out under a different layout rule set. Only
    /// meaningful for type-derived formats; named image formats have a fixed
    /// memory image.
    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
        if self.name.is_none() {
            self.segments.clear();
            let ty = self.ty.clone();
            let mut segments = Segments::new();
            build_type_segments(&ty, layout, None, &mut segments);
            self.segments = segments;
        }
    }

    pub fn is_packed(&self) -> bool {
        self.pack_bits.is_some()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Byte size of a single (padded) element.
    pub fn size_in_bytes(&self) -> u32 {
        match self.pack_bits {
            Some(bits) => bits / 8,
            None => segments_byte_size(&self.segments),
        }
    }

    /// Number of script literals consumed per element.
    pub fn values_per_element(&self) -> u32 {
        self.segments.iter().filter(|s| !s.is_padding()).count() as u32
    }

    /// True when the first component holds floating data; integer literals
    /// destined for such a format must be promoted to doubles first.
    pub fn is_float(&self) -> bool {
        self.segments
            .iter()
            .find(|s| !s.is_padding())
            .and_then(|s| s.mode())
            .map(|m| m.is_float())
            .unwrap_or(false)
    }

    pub fn is_uint8(&self) -> bool {
        self.ty.is_uint8()
    }
    pub fn is_uint32(&self) -> bool {
        self.ty.is_uint32()
    }
    pub fn is_int32(&self) -> bool {
        self.ty.is_int32()
    }
    pub fn is_float32(&self) -> bool {
        self.ty.is_float32()
    }

    /// True for formats carrying a depth or stencil aspect.
    pub fn has_depth_or_stencil(&self) -> bool {
        self.segments.iter().any(|s| match s {
            Segment::Component { name, .. } => {
                *name == ComponentType::D || *name == ComponentType::S
            }
            _ => false,
        })
    }

    /// Packs `values` into bytes, one value per component segment, zeroing
    /// padding. `values.len()` must be a multiple of `values_per_element()`.
    pub fn emit_values(&self, values: &[Value]) -> Vec<u8> {
        let mut out = Vec::new();
        let per_element = self.values_per_element() as usize;
        if per_element == 0 {
            return out;
        }
        for element in values.chunks(per_element) {
            if self.pack_bits.is_some() {
                self.emit_packed_element(element, &mut out);
            } else {
                self.emit_element(element, &mut out);
            }
        }
        out
    }

    fn emit_element(&self, values: &[Value], out: &mut Vec<u8>) {
        let mut next = values.iter();
        for segment in &self.segments {
            match *segment {
                Segment::Padding { bits } => {
                    out.extend(std::iter::repeat(0u8).take((bits / 8) as usize));
                }
                Segment::Component { mode, bits, .. } => {
                    let v = next.next().copied().unwrap_or(Value::Integer(0));
                    write_component(out, v, mode, bits);
                }
            }
        }
    }

    fn emit_packed_element(&self, values: &[Value], out: &mut Vec<u8>) {
        // Packed formats list components from the most significant bits
        // down, so fill the word MSB-first.
        let pack_bits = self.pack_bits.unwrap_or(0);
        let mut word: u64 = 0;
        let mut used = 0u32;
        let mut next = values.iter();
        for segment in &self.segments {
            let bits = segment.bits();
            let piece: u64 = match *segment {
                Segment::Padding { .. } => 0,
                Segment::Component { mode, bits, .. } => {
                    let v = next.next().copied().unwrap_or(Value::Integer(0));
                    packed_component_bits(v, mode, bits)
                }
            };
            used += bits;
            word |= (piece & ((1u64 << bits) - 1)) << (pack_bits - used);
        }
        let bytes = (pack_bits / 8) as usize;
        let mut buf = Vec::with_capacity(bytes);
        match bytes {
            1 => buf.write_u8(word as u8).unwrap(),
            2 => buf.write_u16::<LittleEndian>(word as u16).unwrap(),
            _ => buf.write_u32::<LittleEndian>(word as u32).unwrap(),
        }
        out.extend_from_slice(&buf);
    }
}

fn write_component(out: &mut Vec<u8>, v: Value, mode: FormatMode, bits: u32) {
    if mode.is_float() {
        match bits {
            16 => out
                .write_u16::<LittleEndian>(f32_to_hex_float16(v.as_f32()))
                .unwrap(),
            32 => out.write_f32::<LittleEndian>(v.as_f32()).unwrap(),
            _ => out.write_f64::<LittleEndian>(v.as_f64()).unwrap(),
        }
    } else {
        match bits {
            8 => out.write_u8(v.as_u8()).unwrap(),
            16 => out.write_u16::<LittleEndian>(v.as_u16()).unwrap(),
            32 => out.write_u32::<LittleEndian>(v.as_u32()).unwrap(),
            _ => out.write_u64::<LittleEndian>(v.as_u64()).unwrap(),
        }
    }
}

fn packed_component_bits(v: Value, mode: FormatMode, bits: u32) -> u64 {
    if mode.is_float() {
        match bits {
            10 => u64::from(f32_to_hex_float10(v.as_f32())),
            11 => u64::from(f32_to_hex_float11(v.as_f32())),
            16 => u64::from(f32_to_hex_float16(v.as_f32())),
            _ => v.as_u64(),
        }
    } else {
        v.as_u64()
    }
}

lazy_static! {
    static ref RE_COMPONENT_RUN: Regex = Regex::new(r"^(?:[RGBAXDS][0-9]+)+$").unwrap();
    static ref RE_COMPONENT: Regex = Regex::new(r"([RGBAXDS])([0-9]+)").unwrap();
}

fn parse_format_mode(s: &str) -> Option<FormatMode> {
    match s {
        "UNORM" => Some(FormatMode::UNorm),
        "SNORM" => Some(FormatMode::SNorm),
        "USCALED" => Some(FormatMode::UScaled),
        "SSCALED" => Some(FormatMode::SScaled),
        "UINT" => Some(FormatMode::UInt),
        "SINT" => Some(FormatMode::SInt),
        "UFLOAT" => Some(FormatMode::UFloat),
        "SFLOAT" => Some(FormatMode::SFloat),
        "SRGB" => Some(FormatMode::Srgb),
        _ => None,
    }
}

/// Parses an image-format name generically: runs of `<letter><bits>`
/// components each followed by a mode word, with an optional trailing
/// `PACK8|PACK16|PACK32`.
fn parse_format_name(name: &str) -> Result<Format> {
    let invalid = || Error::new("invalid format");

    let mut parts: Vec<&str> = name.split('_').collect();
    if parts.len() < 2 {
        return Err(invalid());
    }

    let mut pack_bits = None;
    let last = parts[parts.len() - 1];
    if let Some(rest) = strip_prefix(last, "PACK") {
        let bits: u32 = rest.parse().map_err(|_| invalid())?;
        if bits != 8 && bits != 16 && bits != 32 {
            return Err(invalid());
        }
        pack_bits = Some(bits);
        parts.pop();
    }

    if parts.is_empty() {
        return Err(invalid());
    }

    // Component runs accumulate until a mode word assigns their
    // interpretation, so `X8_D24_UNORM_PACK32` reads as two components both
    // covered by UNORM while `D32_SFLOAT_S8_UINT` carries two runs with
    // their own modes.
    let mut segments = Segments::new();
    let mut first: Option<(FormatMode, u32)> = None;
    let mut color_components = 0u32;
    let mut total_bits = 0u32;
    let mut pending: Vec<(ComponentType, u32)> = Vec::new();

    for &part in &parts {
        if let Some(mode) = parse_format_mode(part) {
            if pending.is_empty() {
                return Err(invalid());
            }
            for (component, bits) in pending.drain(..) {
                total_bits += bits;
                if component == ComponentType::X {
                    segments.push(Segment::Padding { bits });
                } else {
                    segments.push(Segment::Component {
                        name: component,
                        mode,
                        bits,
                    });
                    if first.is_none() {
                        first = Some((mode, bits));
                    }
                    color_components += 1;
                }
            }
        } else if RE_COMPONENT_RUN.is_match(part) {
            for caps in RE_COMPONENT.captures_iter(part) {
                let component = ComponentType::from_letter(caps[1].as_bytes()[0]).unwrap();
                let bits: u32 = caps[2].parse().map_err(|_| invalid())?;
                if bits == 0 || bits > 64 {
                    return Err(invalid());
                }
                if pack_bits.is_none() && bits % 8 != 0 {
                    return Err(invalid());
                }
                pending.push((component, bits));
            }
        } else {
            return Err(invalid());
        }
    }
    if !pending.is_empty() {
        return Err(invalid());
    }

    if let Some(pack) = pack_bits {
        if total_bits != pack {
            return Err(invalid());
        }
    }

    let (mode, bits) = first.ok_or_else(invalid)?;

    // Unpacked three-component formats consume the four-component slot, the
    // same rule applied to vec3 elements.
    if pack_bits.is_none()
        && color_components == 3
        && segments.len() == 3
        && segments.iter().all(|s| s.bits() == bits)
    {
        segments.push(Segment::Padding { bits });
    }

    Ok(Format {
        name: Some(name.to_owned()),
        ty: Type::vec(mode, bits, color_components.max(1)),
        layout: Layout::Std430,
        pack_bits,
        segments,
    })
}

fn strip_prefix<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.starts_with(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StructMember, StructType};

    fn member(name: &str, ty: Type) -> StructMember {
        StructMember {
            name: name.to_owned(),
            ty,
            offset: None,
            array_stride: None,
            matrix_stride: None,
        }
    }

    #[test]
    fn scalar_sizes() {
        let f = Format::from_type(Type::scalar(FormatMode::UInt, 32), Layout::Std430);
        assert_eq!(4, f.size_in_bytes());
        assert_eq!(1, f.values_per_element());

        let f = Format::from_type(Type::scalar(FormatMode::SFloat, 64), Layout::Std140);
        assert_eq!(8, f.size_in_bytes());
    }

    #[test]
    fn vec_sizes() {
        let f = Format::from_type(Type::vec(FormatMode::SInt, 32, 2), Layout::Std140);
        assert_eq!(8, f.size_in_bytes());
        assert_eq!(2, f.values_per_element());

        // vec3 consumes the vec4 slot in both layouts.
        let f = Format::from_type(Type::vec(FormatMode::SFloat, 32, 3), Layout::Std430);
        assert_eq!(16, f.size_in_bytes());
        assert_eq!(3, f.values_per_element());
    }

    #[test]
    fn matrix_sizes() {
        let mat2 = Type::matrix(FormatMode::SFloat, 32, 2, 2);
        let f = Format::from_type(mat2.clone(), Layout::Std430);
        assert_eq!(16, f.size_in_bytes());

        let f = Format::from_type(mat2, Layout::Std140);
        assert_eq!(32, f.size_in_bytes());

        let mat3 = Type::matrix(FormatMode::SFloat, 32, 3, 3);
        let f = Format::from_type(mat3, Layout::Std430);
        assert_eq!(48, f.size_in_bytes());
    }

    #[test]
    fn struct_std140_vs_std430() {
        let inner = Type::Struct(StructType {
            members: vec![
                member("d", Type::scalar(FormatMode::UInt, 32)),
                member("e", Type::scalar(FormatMode::UInt, 32)),
            ],
            stride: None,
        });
        let outer = Type::Struct(StructType {
            members: vec![
                member("a", Type::scalar(FormatMode::SFloat, 32)),
                member("b", Type::scalar(FormatMode::UInt, 32)),
                member("c", inner),
            ],
            stride: None,
        });

        let f = Format::from_type(outer.clone(), Layout::Std140);
        assert_eq!(32, f.size_in_bytes());

        let f = Format::from_type(outer, Layout::Std430);
        assert_eq!(16, f.size_in_bytes());
    }

    #[test]
    fn struct_member_offsets_are_respected() {
        let inner = Type::Struct(StructType {
            members: vec![
                StructMember {
                    offset: Some(8),
                    ..member("d", Type::scalar(FormatMode::UInt, 32))
                },
                StructMember {
                    offset: Some(16),
                    ..member("e", Type::scalar(FormatMode::UInt, 32))
                },
            ],
            stride: None,
        });
        let outer = Type::Struct(StructType {
            members: vec![
                StructMember {
                    offset: Some(8),
                    ..member("a", Type::scalar(FormatMode::SFloat, 32))
                },
                StructMember {
                    offset: Some(16),
                    ..member("b", Type::scalar(FormatMode::UInt, 32))
                },
                member("c", inner),
            ],
            stride: None,
        });

        let f = Format::from_type(outer, Layout::Std430);
        assert_eq!(40, f.size_in_bytes());
    }

    #[test]
    fn struct_with_vec3_member_std140() {
        let s = Type::Struct(StructType {
            members: vec![
                member("a", Type::scalar(FormatMode::SFloat, 32)),
                member("b", Type::vec(FormatMode::SFloat, 32, 3)),
            ],
            stride: None,
        });
        let f = Format::from_type(s, Layout::Std140);
        assert_eq!(32, f.size_in_bytes());

        let values = [
            Value::Double(1.0),
            Value::Double(64.0),
            Value::Double(128.0),
            Value::Double(220.0),
        ];
        let bytes = f.emit_values(&values);
        assert_eq!(32, bytes.len());
        let read = |at: usize| {
            f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        assert_eq!(1.0, read(0));
        assert_eq!(64.0, read(16));
        assert_eq!(128.0, read(20));
        assert_eq!(220.0, read(24));
    }

    #[test]
    fn struct_stride_overrides_size() {
        let s = Type::Struct(StructType {
            members: vec![member("a", Type::scalar(FormatMode::UInt, 8))],
            stride: Some(20),
        });
        let f = Format::from_type(s, Layout::Std430);
        assert_eq!(20, f.size_in_bytes());
    }

    #[test]
    fn matrix_stride_override() {
        let s = Type::Struct(StructType {
            members: vec![StructMember {
                matrix_stride: Some(20),
                ..member("m", Type::matrix(FormatMode::SFloat, 32, 2, 2))
            }],
            stride: None,
        });
        let f = Format::from_type(s, Layout::Std430);
        // Two columns of 20-byte stride, rounded to the struct alignment (8).
        assert_eq!(40, f.size_in_bytes());
    }

    #[test]
    fn std140_matrix_emission_pads_columns() {
        let f = Format::from_type(Type::matrix(FormatMode::SFloat, 32, 2, 2), Layout::Std140);
        let values = [
            Value::Double(1.0),
            Value::Double(2.0),
            Value::Double(3.0),
            Value::Double(4.0),
        ];
        let bytes = f.emit_values(&values);
        assert_eq!(32, bytes.len());
        let read = |at: usize| {
            f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        assert_eq!(1.0, read(0));
        assert_eq!(2.0, read(4));
        assert_eq!(0.0, read(8));
        assert_eq!(0.0, read(12));
        assert_eq!(3.0, read(16));
        assert_eq!(4.0, read(20));
    }

    #[test]
    fn named_format_rgba32() {
        let f = Format::from_name("R32G32B32A32_SFLOAT").unwrap();
        assert_eq!(16, f.size_in_bytes());
        assert_eq!(4, f.values_per_element());
        assert!(f.is_float());
        assert_eq!(Some("R32G32B32A32_SFLOAT"), f.format_name());
    }

    #[test]
    fn named_format_sint_segments() {
        let f = Format::from_name("R32G32B32A32_SINT").unwrap();
        let segs = f.segments();
        assert_eq!(4, segs.len());
        for (i, seg) in segs.iter().enumerate() {
            match seg {
                Segment::Component { name, mode, bits } => {
                    assert_eq!(ComponentType::by_index(i as u32), *name);
                    assert_eq!(FormatMode::SInt, *mode);
                    assert_eq!(32, *bits);
                }
                _ => panic!("unexpected padding"),
            }
        }
    }

    #[test]
    fn named_format_three_components_padded() {
        let f = Format::from_name("B8G8R8_UNORM").unwrap();
        assert_eq!(4, f.size_in_bytes());
        assert_eq!(3, f.values_per_element());
    }

    #[test]
    fn named_format_depth_stencil() {
        let f = Format::from_name("D32_SFLOAT_S8_UINT").unwrap();
        assert!(f.has_depth_or_stencil());
        assert_eq!(5, f.size_in_bytes());

        let f = Format::from_name("R8G8B8A8_UNORM").unwrap();
        assert!(!f.has_depth_or_stencil());
    }

    #[test]
    fn named_format_packed() {
        let f = Format::from_name("A2B10G10R10_UNORM_PACK32").unwrap();
        assert!(f.is_packed());
        assert_eq!(4, f.size_in_bytes());
        assert_eq!(4, f.values_per_element());

        let f = Format::from_name("X8_D24_UNORM_PACK32").unwrap();
        assert_eq!(4, f.size_in_bytes());
        assert_eq!(1, f.values_per_element());
    }

    #[test]
    fn invalid_format_names() {
        assert!(Format::from_name("A23A32").is_err());
        assert!(Format::from_name("R32G32B32A32").is_err());
        assert!(Format::from_name("R32_BLORP").is_err());
        assert!(Format::from_name("").is_err());
    }

    #[test]
    fn emit_uint8_series() {
        let f = Format::from_type(Type::scalar(FormatMode::UInt, 8), Layout::Std430);
        let values: Vec<Value> = (2..7).map(Value::Integer).collect();
        assert_eq!(vec![2u8, 3, 4, 5, 6], f.emit_values(&values));
    }

    #[test]
    fn emit_half_floats() {
        let f = Format::from_type(Type::scalar(FormatMode::SFloat, 16), Layout::Std430);
        let bytes = f.emit_values(&[Value::Double(1.0)]);
        assert_eq!(vec![0x00, 0x3c], bytes);
    }

    #[test]
    fn layout_switch_rebuilds_segments() {
        let mut f = Format::from_type(Type::matrix(FormatMode::SFloat, 32, 2, 2), Layout::Std430);
        assert_eq!(16, f.size_in_bytes());
        f.set_layout(Layout::Std140);
        assert_eq!(32, f.size_in_bytes());
    }
}
