//! Buffers and images.

use crate::error::{Error, Result};
use crate::format::Format;
use crate::value::Value;

/// Role a buffer plays when bound to a pipeline.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BufferKind {
    Unknown,
    Uniform,
    Storage,
    UniformDynamic,
    StorageDynamic,
    Vertex,
    Index,
    PushConstant,
    Color,
    DepthStencil,
    Resolve,
    Sampled,
    StorageImage,
    SampledImage,
    CombinedImageSampler,
    UniformTexelBuffer,
    StorageTexelBuffer,
}

impl BufferKind {
    /// Maps the `BIND BUFFER ... AS <keyword>` slot category.
    pub fn from_name(name: &str) -> Option<BufferKind> {
        let kind = match name {
            "uniform" => BufferKind::Uniform,
            "storage" => BufferKind::Storage,
            "uniform_dynamic" => BufferKind::UniformDynamic,
            "storage_dynamic" => BufferKind::StorageDynamic,
            "push_constant" => BufferKind::PushConstant,
            "color" => BufferKind::Color,
            "depth_stencil" => BufferKind::DepthStencil,
            "resolve" => BufferKind::Resolve,
            "storage_image" => BufferKind::StorageImage,
            "sampled_image" => BufferKind::SampledImage,
            "combined_image_sampler" => BufferKind::CombinedImageSampler,
            "uniform_texel_buffer" => BufferKind::UniformTexelBuffer,
            "storage_texel_buffer" => BufferKind::StorageTexelBuffer,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_dynamic(self) -> bool {
        self == BufferKind::UniformDynamic || self == BufferKind::StorageDynamic
    }

    /// Kinds addressed through image descriptors.
    pub fn is_image(self) -> bool {
        match self {
            BufferKind::StorageImage
            | BufferKind::SampledImage
            | BufferKind::CombinedImageSampler => true,
            _ => false,
        }
    }

    pub fn is_texel_buffer(self) -> bool {
        self == BufferKind::UniformTexelBuffer || self == BufferKind::StorageTexelBuffer
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ImageDimension {
    D1,
    D2,
    D3,
}

/// Sample counts a multisampled image may declare.
pub fn is_valid_sample_count(samples: u32) -> bool {
    match samples {
        1 | 2 | 4 | 8 | 16 | 32 | 64 => true,
        _ => false,
    }
}

/// A buffer (or image) declaration together with its initial contents.
#[derive(Clone, Debug)]
pub struct Buffer {
    name: String,
    kind: BufferKind,
    format: Option<Format>,
    element_count: u32,
    bytes: Vec<u8>,
    mip_levels: u32,
    width: u32,
    height: u32,
    depth: u32,
    samples: u32,
    dimension: Option<ImageDimension>,
}

impl Buffer {
    pub fn new(name: impl Into<String>) -> Buffer {
        Buffer {
            name: name.into(),
            kind: BufferKind::Unknown,
            format: None,
            element_count: 0,
            bytes: Vec::new(),
            mip_levels: 1,
            width: 0,
            height: 0,
            depth: 0,
            samples: 1,
            dimension: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: BufferKind) {
        self.kind = kind;
    }

    pub fn format(&self) -> Option<&Format> {
        self.format.as_ref()
    }

    pub fn format_mut(&mut self) -> Option<&mut Format> {
        self.format.as_mut()
    }

    pub fn set_format(&mut self, format: Format) {
        self.format = Some(format);
    }

    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    pub fn set_element_count(&mut self, count: u32) {
        self.element_count = count;
    }

    /// Count of script literals held, before padding.
    pub fn value_count(&self) -> u32 {
        match &self.format {
            Some(f) => self.element_count * f.values_per_element(),
            None => 0,
        }
    }

    pub fn size_in_bytes(&self) -> u32 {
        match &self.format {
            Some(f) => self.element_count * f.size_in_bytes(),
            None => 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn set_mip_levels(&mut self, levels: u32) {
        self.mip_levels = levels;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width;
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = height;
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn set_samples(&mut self, samples: u32) {
        self.samples = samples;
    }

    pub fn image_dimension(&self) -> Option<ImageDimension> {
        self.dimension
    }

    pub fn set_image_dimension(&mut self, dimension: ImageDimension) {
        self.dimension = Some(dimension);
    }

    /// Lays `values` out through the format's segments, replacing the
    /// buffer's contents and recomputing the element count. Fails when the
    /// literal count does not cover a whole number of elements.
    pub fn set_data(&mut self, values: Vec<Value>) -> Result<()> {
        let format = self
            .format
            .as_ref()
            .ok_or_else(|| Error::new("buffer has no format"))?;
        let per_element = format.values_per_element();
        if per_element == 0 || values.len() as u32 % per_element != 0 {
            return Err(Error::new("Mismatched number of items in buffer"));
        }
        self.element_count = values.len() as u32 / per_element;
        self.bytes = format.emit_values(&values);
        Ok(())
    }

    /// Resizes image-backed storage from its extents.
    pub fn recalculate_element_count_from_extents(&mut self) {
        let w = self.width.max(1);
        let h = self.height.max(1);
        let d = self.depth.max(1);
        self.element_count = w * h * d;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Layout;
    use crate::types::{FormatMode, Type};

    #[test]
    fn kind_names() {
        assert_eq!(Some(BufferKind::Uniform), BufferKind::from_name("uniform"));
        assert_eq!(
            Some(BufferKind::CombinedImageSampler),
            BufferKind::from_name("combined_image_sampler")
        );
        assert_eq!(None, BufferKind::from_name("INVALID"));
    }

    #[test]
    fn data_recomputes_element_count() {
        let mut buf = Buffer::new("my_buffer");
        buf.set_format(Format::from_type(
            Type::scalar(FormatMode::UInt, 32),
            Layout::Std430,
        ));
        buf.set_data((1..8u64).map(Value::Integer).collect()).unwrap();
        assert_eq!(7, buf.element_count());
        assert_eq!(7, buf.value_count());
        assert_eq!(28, buf.size_in_bytes());
        assert_eq!(1, buf.bytes()[0]);
    }

    #[test]
    fn data_with_partial_element_rejected() {
        let mut buf = Buffer::new("b");
        buf.set_format(Format::from_type(
            Type::vec(FormatMode::SInt, 32, 2),
            Layout::Std430,
        ));
        let r = buf.set_data(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert!(r.is_err());
        assert_eq!(
            "Mismatched number of items in buffer",
            r.unwrap_err().to_string()
        );
    }

    #[test]
    fn struct_buffer_std140_layout() {
        use crate::types::{StructMember, StructType};
        let inner = Type::Struct(StructType {
            members: vec![
                StructMember {
                    name: "d".into(),
                    ty: Type::scalar(FormatMode::UInt, 32),
                    offset: None,
                    array_stride: None,
                    matrix_stride: None,
                },
                StructMember {
                    name: "e".into(),
                    ty: Type::scalar(FormatMode::UInt, 32),
                    offset: None,
                    array_stride: None,
                    matrix_stride: None,
                },
            ],
            stride: None,
        });
        let outer = Type::Struct(StructType {
            members: vec![
                StructMember {
                    name: "a".into(),
                    ty: Type::scalar(FormatMode::SFloat, 32),
                    offset: None,
                    array_stride: None,
                    matrix_stride: None,
                },
                StructMember {
                    name: "b".into(),
                    ty: Type::scalar(FormatMode::UInt, 32),
                    offset: None,
                    array_stride: None,
                    matrix_stride: None,
                },
                StructMember {
                    name: "c".into(),
                    ty: inner,
                    offset: None,
                    array_stride: None,
                    matrix_stride: None,
                },
            ],
            stride: None,
        });

        let mut buf = Buffer::new("my_buffer");
        buf.set_format(Format::from_type(outer, Layout::Std140));
        buf.set_data(vec![
            Value::Double(1.0),
            Value::Integer(64),
            Value::Integer(128),
            Value::Integer(220),
        ])
        .unwrap();

        assert_eq!(1, buf.element_count());
        assert_eq!(32, buf.size_in_bytes());
        let bytes = buf.bytes();
        let f = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(1.0, f);
        let b = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(64, b);
        let d = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        assert_eq!(128, d);
        let e = u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
        assert_eq!(220, e);
    }

    #[test]
    fn image_extents() {
        let mut buf = Buffer::new("image");
        buf.set_format(Format::from_type(
            Type::scalar(FormatMode::UInt, 32),
            Layout::Std430,
        ));
        buf.set_image_dimension(ImageDimension::D3);
        buf.set_width(3);
        buf.set_height(4);
        buf.set_depth(5);
        buf.recalculate_element_count_from_extents();
        assert_eq!(60, buf.element_count());
    }

    #[test]
    fn sample_counts() {
        for &s in &[1u32, 2, 4, 8, 16, 32, 64] {
            assert!(is_valid_sample_count(s));
        }
        assert!(!is_valid_sample_count(5));
        assert!(!is_valid_sample_count(0));
    }
}
