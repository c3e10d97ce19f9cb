//! RGBA colors shared by entities, meshes and the renderer.

/// Linear RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const WHITE: Color = Color([1.0, 1.0, 1.0, 1.0]);
    pub const BLACK: Color = Color([0.0, 0.0, 0.0, 1.0]);
    pub const TRANSPARENT: Color = Color([0.0, 0.0, 0.0, 0.0]);
    /// Scene background (#010413).
    pub const BACKGROUND: Color = Color([1.0 / 255.0, 4.0 / 255.0, 19.0 / 255.0, 1.0]);

    /// Builds an opaque color from a `0xRRGGBB` literal.
    pub const fn hex(rgb: u32) -> Self {
        Color([
            ((rgb >> 16) & 0xff) as f32 / 255.0,
            ((rgb >> 8) & 0xff) as f32 / 255.0,
            (rgb & 0xff) as f32 / 255.0,
            1.0,
        ])
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color([r, g, b, a])
    }

    /// Builds a color from 8-bit channels and a float alpha.
    pub fn rgb8(r: u8, g: u8, b: u8, alpha: f32) -> Self {
        Color([
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            alpha.clamp(0.0, 1.0),
        ])
    }

    /// HSL to RGB with `hue` in degrees and `saturation`/`lightness` in `[0, 1]`.
    pub fn hsla(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = lightness - c / 2.0;
        Color([r + m, g + m, b + m, alpha.clamp(0.0, 1.0)])
    }

    /// Same color with a replaced alpha.
    pub fn with_alpha(self, alpha: f32) -> Self {
        let [r, g, b, _] = self.0;
        Color([r, g, b, alpha.clamp(0.0, 1.0)])
    }

    /// Same color with its alpha multiplied by `factor`.
    pub fn fade(self, factor: f32) -> Self {
        self.with_alpha(self.0[3] * factor)
    }

    pub fn alpha(&self) -> f32 {
        self.0[3]
    }

    /// Component-wise blend towards `other`.
    pub fn mix(self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mut out = [0.0; 4];
        for (i, value) in out.iter_mut().enumerate() {
            *value = self.0[i] + (other.0[i] - self.0[i]) * t;
        }
        Color(out)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}
