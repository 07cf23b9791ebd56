//! Samplers.

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FilterType {
    Nearest,
    Linear,
}

impl FilterType {
    pub fn from_name(name: &str) -> Option<FilterType> {
        match name {
            "nearest" => Some(FilterType::Nearest),
            "linear" => Some(FilterType::Linear),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
    MirrorClampToEdge,
}

impl AddressMode {
    pub fn from_name(name: &str) -> Option<AddressMode> {
        match name {
            "repeat" => Some(AddressMode::Repeat),
            "mirrored_repeat" => Some(AddressMode::MirroredRepeat),
            "clamp_to_edge" => Some(AddressMode::ClampToEdge),
            "clamp_to_border" => Some(AddressMode::ClampToBorder),
            "mirror_clamp_to_edge" => Some(AddressMode::MirrorClampToEdge),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BorderColor {
    FloatTransparentBlack,
    IntTransparentBlack,
    FloatOpaqueBlack,
    IntOpaqueBlack,
    FloatOpaqueWhite,
    IntOpaqueWhite,
}

impl BorderColor {
    pub fn from_name(name: &str) -> Option<BorderColor> {
        match name {
            "float_transparent_black" => Some(BorderColor::FloatTransparentBlack),
            "int_transparent_black" => Some(BorderColor::IntTransparentBlack),
            "float_opaque_black" => Some(BorderColor::FloatOpaqueBlack),
            "int_opaque_black" => Some(BorderColor::IntOpaqueBlack),
            "float_opaque_white" => Some(BorderColor::FloatOpaqueWhite),
            "int_opaque_white" => Some(BorderColor::IntOpaqueWhite),
            _ => None,
        }
    }
}

/// Comparison operator shared by samplers, depth state and stencil state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

impl CompareOp {
    pub fn from_name(name: &str) -> Option<CompareOp> {
        match name {
            "never" => Some(CompareOp::Never),
            "less" => Some(CompareOp::Less),
            "equal" => Some(CompareOp::Equal),
            "less_or_equal" => Some(CompareOp::LessOrEqual),
            "greater" => Some(CompareOp::Greater),
            "not_equal" => Some(CompareOp::NotEqual),
            "greater_or_equal" => Some(CompareOp::GreaterOrEqual),
            "always" => Some(CompareOp::Always),
            _ => None,
        }
    }
}

/// A sampler declaration. Defaults follow Vulkan's zero-initialized
/// `VkSamplerCreateInfo`: nearest filtering, repeat addressing, LOD 0..1.
#[derive(Clone, Debug)]
pub struct Sampler {
    name: String,
    min_filter: FilterType,
    mag_filter: FilterType,
    mipmap_mode: FilterType,
    address_mode_u: AddressMode,
    address_mode_v: AddressMode,
    address_mode_w: AddressMode,
    border_color: BorderColor,
    min_lod: f32,
    max_lod: f32,
    normalized_coords: bool,
    compare_enable: bool,
    compare_op: CompareOp,
}

impl Sampler {
    pub fn new(name: impl Into<String>) -> Sampler {
        Sampler {
            name: name.into(),
            min_filter: FilterType::Nearest,
            mag_filter: FilterType::Nearest,
            mipmap_mode: FilterType::Nearest,
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            border_color: BorderColor::FloatTransparentBlack,
            min_lod: 0.0,
            max_lod: 1.0,
            normalized_coords: true,
            compare_enable: false,
            compare_op: CompareOp::Never,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_filter(&self) -> FilterType {
        self.min_filter
    }
    pub fn set_min_filter(&mut self, f: FilterType) {
        self.min_filter = f;
    }

    pub fn mag_filter(&self) -> FilterType {
        self.mag_filter
    }
    pub fn set_mag_filter(&mut self, f: FilterType) {
        self.mag_filter = f;
    }

    pub fn mipmap_mode(&self) -> FilterType {
        self.mipmap_mode
    }
    pub fn set_mipmap_mode(&mut self, f: FilterType) {
        self.mipmap_mode = f;
    }

    pub fn address_mode_u(&self) -> AddressMode {
        self.address_mode_u
    }
    pub fn set_address_mode_u(&mut self, m: AddressMode) {
        self.address_mode_u = m;
    }

    pub fn address_mode_v(&self) -> AddressMode {
        self.address_mode_v
    }
    pub fn set_address_mode_v(&mut self, m: AddressMode) {
        self.address_mode_v = m;
    }

    pub fn address_mode_w(&self) -> AddressMode {
        self.address_mode_w
    }
    pub fn set_address_mode_w(&mut self, m: AddressMode) {
        self.address_mode_w = m;
    }

    pub fn border_color(&self) -> BorderColor {
        self.border_color
    }
    pub fn set_border_color(&mut self, c: BorderColor) {
        self.border_color = c;
    }

    pub fn min_lod(&self) -> f32 {
        self.min_lod
    }
    pub fn set_min_lod(&mut self, lod: f32) {
        self.min_lod = lod;
    }

    pub fn max_lod(&self) -> f32 {
        self.max_lod
    }
    pub fn set_max_lod(&mut self, lod: f32) {
        self.max_lod = lod;
    }

    pub fn normalized_coords(&self) -> bool {
        self.normalized_coords
    }

    /// Unnormalized coordinates force both LODs to zero.
    pub fn set_normalized_coords(&mut self, normalized: bool) {
        self.normalized_coords = normalized;
        if !normalized {
            self.min_lod = 0.0;
            self.max_lod = 0.0;
        }
    }

    pub fn compare_enable(&self) -> bool {
        self.compare_enable
    }
    pub fn set_compare_enable(&mut self, enable: bool) {
        self.compare_enable = enable;
    }

    pub fn compare_op(&self) -> CompareOp {
        self.compare_op
    }
    pub fn set_compare_op(&mut self, op: CompareOp) {
        self.compare_op = op;
    }

    /// Checked when the declaration closes.
    pub fn validate(&self) -> Result<()> {
        if self.max_lod < self.min_lod {
            return Err(Error::new(
                "max LOD needs to be greater than or equal to min LOD",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let s = Sampler::new("sampler");
        assert_eq!(FilterType::Nearest, s.min_filter());
        assert_eq!(FilterType::Nearest, s.mag_filter());
        assert_eq!(AddressMode::Repeat, s.address_mode_u());
        assert_eq!(BorderColor::FloatTransparentBlack, s.border_color());
        assert_eq!(0.0, s.min_lod());
        assert_eq!(1.0, s.max_lod());
        assert!(s.normalized_coords());
        assert!(!s.compare_enable());
        assert_eq!(CompareOp::Never, s.compare_op());
    }

    #[test]
    fn unnormalized_coords_reset_lods() {
        let mut s = Sampler::new("s");
        s.set_min_lod(2.0);
        s.set_max_lod(3.0);
        s.set_normalized_coords(false);
        assert_eq!(0.0, s.min_lod());
        assert_eq!(0.0, s.max_lod());
    }

    #[test]
    fn lod_ordering_validated() {
        let mut s = Sampler::new("s");
        s.set_min_lod(2.0);
        s.set_max_lod(1.0);
        assert_eq!(
            "max LOD needs to be greater than or equal to min LOD",
            s.validate().unwrap_err().to_string()
        );
    }
}
