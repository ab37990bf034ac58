//! Light descriptors consumed by shading blocks

use bevy_ecs::prelude::*;
use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Default spot cone half-angle in radians
pub const DEFAULT_SPOT_ANGLE: f32 = std::f32::consts::FRAC_PI_4;

/// Kind of light source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    Point,
    Directional,
    Spot,
    Area,
}

impl LightType {
    fn gpu_id(self) -> f32 {
        match self {
            LightType::Point => 0.0,
            LightType::Spot => 1.0,
            LightType::Directional => 2.0,
            LightType::Area => 3.0,
        }
    }
}

/// Light component
///
/// `node` refers to the scene node carrying the light's transform. It is a
/// lookup key only; the scene graph owns that entity.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Light {
    pub node: Entity,
    pub light_type: LightType,
    pub colour: Vec3,
    pub energy: f32,
    pub range: f32,
    pub shadows: bool,
    pub shadow_bias: f32,
    pub shadow_normal_bias: f32,
    pub attenuation: f32,
    /// Cone half-angle, only set for spot lights
    pub spot_angle: Option<f32>,
}

impl Light {
    pub fn new(node: Entity, light_type: LightType) -> Self {
        Self {
            node,
            light_type,
            colour: Vec3::ONE,
            energy: 1.0,
            range: 10.0,
            shadows: false,
            shadow_bias: 0.01,
            shadow_normal_bias: 0.0,
            attenuation: 1.0,
            spot_angle: match light_type {
                LightType::Spot => Some(DEFAULT_SPOT_ANGLE),
                _ => None,
            },
        }
    }

    pub fn point(node: Entity) -> Self {
        Self::new(node, LightType::Point)
    }

    pub fn directional(node: Entity) -> Self {
        Self::new(node, LightType::Directional)
    }

    pub fn spot(node: Entity) -> Self {
        Self::new(node, LightType::Spot)
    }

    pub fn area(node: Entity) -> Self {
        Self::new(node, LightType::Area)
    }

    pub fn with_colour(mut self, colour: Vec3) -> Self {
        self.colour = colour;
        self
    }

    pub fn with_energy(mut self, energy: f32) -> Self {
        self.energy = energy;
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    pub fn with_shadows(mut self, shadows: bool) -> Self {
        self.shadows = shadows;
        self
    }

    /// Set the cone angle. Ignored unless this is a spot light.
    pub fn with_spot_angle(mut self, angle: f32) -> Self {
        if self.light_type == LightType::Spot {
            self.spot_angle = Some(angle);
        }
        self
    }

    /// Pack for upload, with position and direction resolved from the node
    pub fn to_gpu_data(&self, position: Vec3, direction: Vec3) -> GpuLightData {
        let range = match self.light_type {
            LightType::Directional => f32::INFINITY,
            _ => self.range,
        };
        let direction = direction.normalize_or_zero();
        let cos_angle = self.spot_angle.map_or(-1.0, f32::cos);

        GpuLightData {
            position: position.extend(range),
            colour_energy: self.colour.extend(self.energy),
            direction_type: direction.extend(self.light_type.gpu_id()),
            params: Vec4::new(
                cos_angle,
                self.attenuation,
                if self.shadows { self.shadow_bias } else { 0.0 },
                if self.shadows { self.shadow_normal_bias } else { 0.0 },
            ),
        }
    }
}

/// GPU-friendly light data structure
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuLightData {
    /// xyz = position, w = range
    pub position: Vec4,
    /// xyz = colour, w = energy
    pub colour_energy: Vec4,
    /// xyz = direction, w = light type (0=point, 1=spot, 2=directional, 3=area)
    pub direction_type: Vec4,
    /// x = cos(spot angle) or -1, y = attenuation, z = shadow bias, w = shadow normal bias
    pub params: Vec4,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn node() -> Entity {
        Entity::from_raw(7)
    }

    #[rstest]
    #[case::point(LightType::Point, None)]
    #[case::directional(LightType::Directional, None)]
    #[case::spot(LightType::Spot, Some(DEFAULT_SPOT_ANGLE))]
    #[case::area(LightType::Area, None)]
    fn test_defaults(#[case] light_type: LightType, #[case] spot_angle: Option<f32>) {
        let light = Light::new(node(), light_type);
        assert_eq!(light.node, node());
        assert_eq!(light.spot_angle, spot_angle);
        assert_eq!(light.shadow_bias, 0.01);
        assert_eq!(light.shadow_normal_bias, 0.0);
        assert_eq!(light.attenuation, 1.0);
        assert!(!light.shadows);
    }

    #[test]
    fn test_spot_angle_ignored_for_point() {
        let light = Light::point(node()).with_spot_angle(0.3);
        assert_eq!(light.spot_angle, None);

        let light = Light::spot(node()).with_spot_angle(0.3);
        assert_eq!(light.spot_angle, Some(0.3));
    }

    #[test]
    fn test_gpu_packing() {
        let light = Light::directional(node()).with_energy(3.0);
        let data = light.to_gpu_data(Vec3::ZERO, Vec3::new(0.0, -2.0, 0.0));

        assert_eq!(data.position.w, f32::INFINITY);
        assert_eq!(data.colour_energy.w, 3.0);
        assert_eq!(data.direction_type, Vec4::new(0.0, -1.0, 0.0, 2.0));
        assert_eq!(data.params.x, -1.0);
        assert_eq!(std::mem::size_of::<GpuLightData>(), 64);
    }
}
