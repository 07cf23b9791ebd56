//! Bottom- and top-level acceleration structures for raytracing.

use bitflags::bitflags;

bitflags! {
    /// Geometry flags accepted by `GEOMETRY ... FLAGS`.
    #[derive(Default)]
    pub struct GeometryFlags: u32 {
        const OPAQUE = 1 << 0;
        const NO_DUPLICATE_ANY_HIT = 1 << 1;
    }
}

impl GeometryFlags {
    pub fn from_name(name: &str) -> Option<GeometryFlags> {
        match name {
            "OPAQUE" => Some(GeometryFlags::OPAQUE),
            "NO_DUPLICATE_ANY_HIT" => Some(GeometryFlags::NO_DUPLICATE_ANY_HIT),
            _ => None,
        }
    }
}

bitflags! {
    /// Instance flags accepted by `BOTTOM_LEVEL_INSTANCE ... FLAGS`.
    #[derive(Default)]
    pub struct InstanceFlags: u32 {
        const TRIANGLE_FACING_CULL_DISABLE = 1 << 0;
        const TRIANGLE_FLIP_FACING = 1 << 1;
        const FORCE_OPAQUE = 1 << 2;
        const FORCE_NO_OPAQUE = 1 << 3;
    }
}

impl InstanceFlags {
    pub fn from_name(name: &str) -> Option<InstanceFlags> {
        match name {
            "TRIANGLE_FACING_CULL_DISABLE" => Some(InstanceFlags::TRIANGLE_FACING_CULL_DISABLE),
            "TRIANGLE_FLIP_FACING" => Some(InstanceFlags::TRIANGLE_FLIP_FACING),
            "FORCE_OPAQUE" => Some(InstanceFlags::FORCE_OPAQUE),
            "FORCE_NO_OPAQUE" => Some(InstanceFlags::FORCE_NO_OPAQUE),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GeometryKind {
    Triangles,
    Aabbs,
}

/// One geometry of a BLAS: a flat float list, three coordinates per vertex
/// for triangles, two corner vertices per box for AABBs.
#[derive(Clone, Debug)]
pub struct Geometry {
    pub kind: GeometryKind,
    pub data: Vec<f32>,
    pub flags: GeometryFlags,
}

/// A bottom-level acceleration structure; all geometries share one kind.
#[derive(Clone, Debug)]
pub struct Blas {
    name: String,
    pub geometries: Vec<Geometry>,
}

impl Blas {
    pub fn new(name: impl Into<String>) -> Blas {
        Blas {
            name: name.into(),
            geometries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry_kind(&self) -> Option<GeometryKind> {
        self.geometries.first().map(|g| g.kind)
    }
}

/// An instance of a BLAS inside a TLAS.
#[derive(Clone, Debug)]
pub struct BlasInstance {
    pub blas_name: String,
    /// Row-major 3x4 transform, twelve floats.
    pub transform: Option<[f32; 12]>,
    pub mask: Option<u32>,
    pub offset: Option<u32>,
    pub index: Option<u32>,
    pub flags: InstanceFlags,
    /// Flag bits given numerically rather than by name.
    pub raw_flags: u32,
}

impl BlasInstance {
    pub fn new(blas_name: impl Into<String>) -> BlasInstance {
        BlasInstance {
            blas_name: blas_name.into(),
            transform: None,
            mask: None,
            offset: None,
            index: None,
            flags: InstanceFlags::default(),
            raw_flags: 0,
        }
    }
}

/// A top-level acceleration structure.
#[derive(Clone, Debug)]
pub struct Tlas {
    name: String,
    pub instances: Vec<BlasInstance>,
}

impl Tlas {
    pub fn new(name: impl Into<String>) -> Tlas {
        Tlas {
            name: name.into(),
            instances: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
