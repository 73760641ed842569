// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame buffers and 2D transforms produced by compositing nodes.

/// An RGBA frame buffer with premultiplied alpha
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl Image {
    /// Create an image filled with one color
    pub fn filled(width: u32, height: u32, color: [f32; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// Create a fully transparent image
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0.0; 4])
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size in bytes of the pixel storage
    pub fn byte_size(&self) -> usize {
        self.pixels.len() * size_of::<[f32; 4]>()
    }

    /// Pixel at (x, y), `None` outside the image
    pub fn pixel(&self, x: i64, y: i64) -> Option<[f32; 4]> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Apply a function to every pixel
    pub fn map(&self, f: impl Fn([f32; 4]) -> [f32; 4]) -> Self {
        Self {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().copied().map(f).collect(),
        }
    }

    /// Build an image by evaluating a function per pixel
    pub fn from_fn(width: u32, height: u32, f: impl Fn(i64, i64) -> [f32; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..i64::from(height) {
            for x in 0..i64::from(width) {
                pixels.push(f(x, y));
            }
        }
        Self { width, height, pixels }
    }

    /// Composite `self` over `background` (Porter-Duff over), sized like the background
    pub fn over(&self, background: &Image) -> Self {
        Self::from_fn(background.width, background.height, |x, y| {
            let bg = background.pixel(x, y).unwrap_or([0.0; 4]);
            match self.pixel(x, y) {
                Some(fg) => {
                    let k = 1.0 - fg[3];
                    [
                        fg[0] + bg[0] * k,
                        fg[1] + bg[1] * k,
                        fg[2] + bg[2] * k,
                        fg[3] + bg[3] * k,
                    ]
                }
                None => bg,
            }
        })
    }
}

/// A 2D affine transform `[a, b, c, d, tx, ty]` mapping
/// `(x, y)` to `(a*x + c*y + tx, b*x + d*y + ty)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Matrix coefficients
    pub m: [f64; 6],
}

impl Transform {
    /// The identity transform
    pub const IDENTITY: Self = Self { m: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0] };

    /// Translation by (x, y)
    pub fn translate(x: f64, y: f64) -> Self {
        Self { m: [1.0, 0.0, 0.0, 1.0, x, y] }
    }

    /// Uniform scale about the origin
    pub fn scale(s: f64) -> Self {
        Self { m: [s, 0.0, 0.0, s, 0.0, 0.0] }
    }

    /// Map a point
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, tx, ty] = self.m;
        (a * x + c * y + tx, b * x + d * y + ty)
    }

    /// `self` after `other`
    pub fn then(&self, other: &Transform) -> Self {
        let [a1, b1, c1, d1, tx1, ty1] = self.m;
        let [a2, b2, c2, d2, tx2, ty2] = other.m;
        Self {
            m: [
                a2 * a1 + c2 * b1,
                b2 * a1 + d2 * b1,
                a2 * c1 + c2 * d1,
                b2 * c1 + d2 * d1,
                a2 * tx1 + c2 * ty1 + tx2,
                b2 * tx1 + d2 * ty1 + ty2,
            ],
        }
    }

    /// Inverse transform, `None` when singular
    pub fn inverse(&self) -> Option<Self> {
        let [a, b, c, d, tx, ty] = self.m;
        let det = a * d - b * c;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        let (ia, ib, ic, id) = (d * inv, -b * inv, -c * inv, a * inv);
        Some(Self {
            m: [ia, ib, ic, id, -(ia * tx + ic * ty), -(ib * tx + id * ty)],
        })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_over_opaque_foreground_wins() {
        let fg = Image::filled(2, 2, [1.0, 0.0, 0.0, 1.0]);
        let bg = Image::filled(3, 3, [0.0, 0.0, 1.0, 1.0]);
        let out = fg.over(&bg);
        assert_eq!(out.width(), 3);
        assert_eq!(out.pixel(0, 0), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(out.pixel(2, 2), Some([0.0, 0.0, 1.0, 1.0]));
        assert_eq!(out.pixel(3, 0), None);
    }

    #[test]
    fn test_transform_inverse_roundtrip() {
        let t = Transform::translate(3.0, -2.0).then(&Transform::scale(2.0));
        assert_eq!(t.apply(1.0, 1.0), (8.0, -2.0));
        let inv = t.inverse().unwrap();
        let (x, y) = inv.apply(8.0, -2.0);
        assert!((x - 1.0).abs() < 1e-12 && (y - 1.0).abs() < 1e-12);
        assert!(Transform::scale(0.0).inverse().is_none());
    }
}
