use std::fmt::{Display, Formatter};

use crate::core::color::Color;

/// Surface description written as one `newmtl` block per mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,

    pub diffuse_color: Color,
    pub specular_color: Color,
    pub opacity: f32,

    // Texture paths as the caller knows them, relocated on export
    pub diffuse_texture: Option<String>,
    pub specular_map_texture: Option<String>,
    pub normal_map_texture: Option<String>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_tobj(mat: tobj::Material) -> Self {
        let defaults = Self::default();
        Self {
            name: mat.name,

            diffuse_color: mat.diffuse.map(Color::from_array).unwrap_or(defaults.diffuse_color),
            specular_color: mat
                .specular
                .map(Color::from_array)
                .unwrap_or(defaults.specular_color),
            opacity: mat.dissolve.unwrap_or(defaults.opacity),

            diffuse_texture: mat.diffuse_texture,
            specular_map_texture: mat.specular_texture,
            normal_map_texture: mat.normal_texture,
        }
    }

    pub fn has_textures(&self) -> bool {
        self.diffuse_texture.is_some()
            || self.specular_map_texture.is_some()
            || self.normal_map_texture.is_some()
    }
}

impl Display for Material {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Material {} (Kd {:?}, d {})",
            self.name, self.diffuse_color, self.opacity
        )
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            diffuse_color: Color::WHITE,
            specular_color: Color::BLACK,
            opacity: 1.0,
            diffuse_texture: None,
            specular_map_texture: None,
            normal_map_texture: None,
        }
    }
}
