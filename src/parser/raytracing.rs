//! ACCELERATION_STRUCTURE blocks: bottom-level geometry lists and
//! top-level instance lists.

use super::Parser;
use crate::acceleration_structure::{
    Blas, BlasInstance, Geometry, GeometryFlags, GeometryKind, InstanceFlags, Tlas,
};
use crate::error::{Error, Result};

impl Parser {
    pub(crate) fn parse_acceleration_structure(&mut self) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("Acceleration structure type expected"));
        }
        match token.as_string() {
            "BOTTOM_LEVEL" => self.parse_blas(),
            "TOP_LEVEL" => self.parse_tlas(),
            other => Err(Error::new(format!(
                "Unknown acceleration structure type: {}",
                other
            ))),
        }
    }

    //----------------------------------------------------------------------------------------------
    // BOTTOM_LEVEL

    fn parse_blas(&mut self) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new(
                "Bottom level acceleration structure requires a name",
            ));
        }
        if !token.is_string() {
            return Err(Error::new(
                "Bottom level acceleration structure name expected",
            ));
        }
        let mut blas = Blas::new(token.as_string());

        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("END command missing"));
            }
            if !token.is_string() {
                return Err(Error::new("Identifier expected"));
            }
            match token.as_string() {
                "END" => break,
                "GEOMETRY" => {
                    let geometry = self.parse_geometry(&blas)?;
                    blas.geometries.push(geometry);
                }
                other => {
                    return Err(Error::new(format!("Unknown token: {}", other)));
                }
            }
        }

        self.script.add_blas(blas)?;
        self.validate_end_of_statement("END")
    }

    fn parse_geometry(&mut self, blas: &Blas) -> Result<Geometry> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("Identifier expected"));
        }
        let kind = match token.as_string() {
            "TRIANGLES" => GeometryKind::Triangles,
            "AABBS" => GeometryKind::Aabbs,
            _ => return Err(Error::new("Unexpected geometry type")),
        };
        if let Some(existing) = blas.geometry_kind() {
            if existing != kind {
                return Err(Error::new(
                    "Only one type of geometry is allowed within a BLAS",
                ));
            }
        }

        let mut data = Vec::new();
        let mut flags = GeometryFlags::default();
        loop {
            let mut token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("END expected"));
            }
            if token.is_string() {
                match token.as_string() {
                    "END" => break,
                    "FLAGS" => {
                        flags = self.parse_geometry_flags()?;
                        continue;
                    }
                    _ => return Err(Error::new("Unexpected data type")),
                }
            }
            if token.convert_to_double().is_err() {
                return Err(Error::new("Unexpected data type"));
            }
            data.push(token.as_f32());
        }

        match kind {
            GeometryKind::Triangles => {
                if data.is_empty() {
                    return Err(Error::new("No triangles have been specified."));
                }
                if data.len() % 9 != 0 {
                    if data.len() % 3 == 0 {
                        return Err(Error::new(
                            "Each triangle should include three vertices.",
                        ));
                    }
                    return Err(Error::new(
                        "Each vertex consists of three float coordinates.",
                    ));
                }
            }
            GeometryKind::Aabbs => {
                if data.is_empty() {
                    return Err(Error::new("No AABBs have been specified."));
                }
                if data.len() % 6 != 0 {
                    return Err(Error::new(
                        "Each vertex consists of three float coordinates. Each AABB should \
                         include two vertices.",
                    ));
                }
            }
        }

        Ok(Geometry { kind, data, flags })
    }

    /// Reads geometry flag identifiers up to the end of the line.
    fn parse_geometry_flags(&mut self) -> Result<GeometryFlags> {
        let mut flags = GeometryFlags::default();
        loop {
            let token = self.next();
            if token.is_eol() || token.is_eos() {
                break;
            }
            if !token.is_string() {
                return Err(Error::new("Identifier expected"));
            }
            match GeometryFlags::from_name(token.as_string()) {
                Some(flag) => flags |= flag,
                None => {
                    return Err(Error::new(format!(
                        "Unknown flag: {}",
                        token.as_string()
                    )));
                }
            }
        }
        Ok(flags)
    }

    //----------------------------------------------------------------------------------------------
    // TOP_LEVEL

    fn parse_tlas(&mut self) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("invalid TLAS name provided"));
        }
        if !token.is_string() {
            return Err(Error::new("invalid TLAS name provided"));
        }
        let mut tlas = Tlas::new(token.as_string());

        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("END command missing"));
            }
            if !token.is_string() {
                return Err(Error::new("Identifier expected"));
            }
            match token.as_string() {
                "END" => break,
                "BOTTOM_LEVEL_INSTANCE" => {
                    let instance = self.parse_blas_instance()?;
                    tlas.instances.push(instance);
                }
                other => {
                    return Err(Error::new(format!("Unknown token: {}", other)));
                }
            }
        }

        self.script.add_tlas(tlas)?;
        self.validate_end_of_statement("END")
    }

    fn parse_blas_instance(&mut self) -> Result<BlasInstance> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("Bottom level acceleration structure name expected"));
        }
        if self.script.blas(token.as_string()).is_none() {
            return Err(Error::new(
                "Bottom level acceleration structure with given name not found",
            ));
        }
        let mut instance = BlasInstance::new(token.as_string());

        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("END command missing"));
            }
            if !token.is_string() {
                return Err(Error::new(format!(
                    "Unknown token in BOTTOM_LEVEL_INSTANCE block: {}",
                    super::token_text(&token)
                )));
            }
            match token.as_string() {
                "END" => break,
                "TRANSFORM" => instance.transform = Some(self.parse_transform()?),
                "MASK" => {
                    let v = self.next();
                    if v.is_integer() {
                        instance.mask = Some(v.as_u32());
                    } else if v.is_hex() {
                        instance.mask = Some(v.as_hex() as u32);
                    } else {
                        return Err(Error::new("Integer or hex value expected"));
                    }
                }
                "OFFSET" => {
                    let v = self.next();
                    if v.is_integer() {
                        instance.offset = Some(v.as_u32());
                    } else if v.is_hex() {
                        instance.offset = Some(v.as_hex() as u32);
                    } else {
                        return Err(Error::new("Integer or hex value expected"));
                    }
                }
                "INDEX" => {
                    let v = self.next();
                    if v.is_integer() {
                        instance.index = Some(v.as_u32());
                    } else if v.is_hex() {
                        instance.index = Some(v.as_hex() as u32);
                    } else {
                        return Err(Error::new("Integer or hex value expected"));
                    }
                }
                "FLAGS" => self.parse_instance_flags(&mut instance)?,
                other => {
                    return Err(Error::new(format!(
                        "Unknown token in BOTTOM_LEVEL_INSTANCE block: {}",
                        other
                    )));
                }
            }
        }

        Ok(instance)
    }

    /// Reads the twelve floats of a row-major 3x4 instance transform,
    /// terminated by `END`.
    fn parse_transform(&mut self) -> Result<[f32; 12]> {
        let mut values = Vec::new();
        loop {
            let mut token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("END command missing"));
            }
            if token.is_string() {
                if token.as_string() == "END" {
                    break;
                }
                return Err(Error::new("Unexpected data type"));
            }
            if token.convert_to_double().is_err() {
                return Err(Error::new("Unexpected data type"));
            }
            values.push(token.as_f32());
        }
        if values.len() != 12 {
            return Err(Error::new("Transform matrix expected to have 12 numbers"));
        }
        let mut transform = [0.0f32; 12];
        transform.copy_from_slice(&values);
        Ok(transform)
    }

    /// Reads instance flags: named bits or raw integer/hex literals, up to
    /// the end of the line.
    fn parse_instance_flags(&mut self, instance: &mut BlasInstance) -> Result<()> {
        loop {
            let token = self.next();
            if token.is_eol() || token.is_eos() {
                break;
            }
            if token.is_integer() {
                instance.raw_flags |= token.as_u32();
            } else if token.is_hex() {
                instance.raw_flags |= token.as_hex() as u32;
            } else if token.is_string() {
                match InstanceFlags::from_name(token.as_string()) {
                    Some(flag) => instance.flags |= flag,
                    None => {
                        return Err(Error::new(format!(
                            "Unknown flag: {}",
                            token.as_string()
                        )));
                    }
                }
            } else {
                return Err(Error::new("Identifier expected"));
            }
        }
        Ok(())
    }
}
