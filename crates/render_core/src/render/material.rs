//! Materials and draw-order sort keys

use slotmap::new_key_type;

use crate::render::GraphicsDevice;

new_key_type! {
    /// Stable handle to a material in a [`crate::render::ResourceStore`]
    pub struct MaterialId;
}

/// Opaque handle to a texture owned by the graphics backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Texture binding slots a material can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUnit {
    /// Base color
    Diffuse = 0,
    /// Tangent-space normal map
    Normal = 1,
    /// Specular mask
    Specular = 2,
    /// Environment map
    Environment = 3,
}

/// Number of texture units
pub const TEXTURE_UNIT_COUNT: usize = 4;

/// How blended materials combine with the framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Standard alpha blending
    #[default]
    Alpha,
    /// Additive blending
    Add,
    /// Multiplicative blending
    Multiply,
}

/// Render state for a batch of draw calls
#[derive(Debug, Clone)]
pub struct Material {
    render_pass: u32,
    use_blending: bool,
    blend_mode: BlendMode,
    use_refraction: bool,
    lighted: bool,
    textures: [Option<TextureId>; TEXTURE_UNIT_COUNT],
}

impl Material {
    /// Create an opaque, lighted material for a render pass
    pub fn new(render_pass: u32) -> Self {
        debug_assert!(
            render_pass < 256,
            "render pass must fit the top byte of the sort key"
        );
        Self {
            render_pass,
            use_blending: false,
            blend_mode: BlendMode::default(),
            use_refraction: false,
            lighted: true,
            textures: [None; TEXTURE_UNIT_COUNT],
        }
    }

    /// Sort key ordering draw calls to minimize state changes
    ///
    /// Layout: render pass in the top byte, the blending flag below it, and
    /// texture identity bits in the low half so materials sharing textures
    /// end up adjacent.
    pub fn sort_key(&self) -> u32 {
        let texture_bits = |unit: usize| self.textures[unit].map_or(0, |t| t.0);

        let mut key = self.render_pass << 24;
        key |= u32::from(self.use_blending) << 16;
        key |= (texture_bits(TextureUnit::Diffuse as usize)
            ^ texture_bits(TextureUnit::Normal as usize))
            & 0xffff;
        key
    }

    /// Bind this material's state on the device
    pub fn activate(&self, gfx: &mut dyn GraphicsDevice, allow_blending: bool) {
        gfx.bind_material(self, allow_blending);
    }

    /// Render pass this material belongs to
    pub fn render_pass(&self) -> u32 {
        self.render_pass
    }

    /// Move this material to another render pass (must stay below 256)
    pub fn set_render_pass(&mut self, render_pass: u32) {
        debug_assert!(
            render_pass < 256,
            "render pass must fit the top byte of the sort key"
        );
        self.render_pass = render_pass;
    }

    /// Whether this material blends with the framebuffer
    pub fn use_blending(&self) -> bool {
        self.use_blending
    }

    /// Enable blending with a mode
    pub fn set_blending(&mut self, mode: BlendMode) {
        self.use_blending = true;
        self.blend_mode = mode;
    }

    /// Disable blending
    pub fn clear_blending(&mut self) {
        self.use_blending = false;
    }

    /// Active blend mode (meaningful only while blending is enabled)
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Whether this material samples the refraction buffer
    pub fn use_refraction(&self) -> bool {
        self.use_refraction
    }

    /// Toggle refraction sampling
    pub fn set_refraction(&mut self, refraction: bool) {
        self.use_refraction = refraction;
    }

    /// Whether this material receives lighting
    pub fn lighted(&self) -> bool {
        self.lighted
    }

    /// Toggle lighting
    pub fn set_lighted(&mut self, lighted: bool) {
        self.lighted = lighted;
    }

    /// Bind a texture to a unit
    pub fn set_texture(&mut self, unit: TextureUnit, texture: Option<TextureId>) {
        self.textures[unit as usize] = texture;
    }

    /// Texture bound to a unit
    pub fn texture(&self, unit: TextureUnit) -> Option<TextureId> {
        self.textures[unit as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_orders_by_pass_first() {
        let early = Material::new(1);
        let mut late = Material::new(7);
        late.set_texture(TextureUnit::Diffuse, Some(TextureId(0xffff)));

        assert!(early.sort_key() < late.sort_key());
    }

    #[test]
    fn test_sort_key_separates_blended_materials() {
        let opaque = Material::new(3);
        let mut blended = Material::new(3);
        blended.set_blending(BlendMode::Alpha);

        assert!(opaque.sort_key() < blended.sort_key());
        assert_eq!(blended.sort_key() >> 24, 3);
    }

    #[test]
    fn test_sort_key_texture_bits_stay_in_low_half() {
        let mut material = Material::new(0);
        material.set_texture(TextureUnit::Diffuse, Some(TextureId(0x1234_5678)));
        material.set_texture(TextureUnit::Normal, Some(TextureId(0x0000_00ff)));

        assert_eq!(material.sort_key() >> 16, 0);
        assert_eq!(material.sort_key(), (0x5678 ^ 0x00ff) & 0xffff);
    }
}
