// Core buffers shared by every stage of the makeup engine.
// Visual expectation: a RasterBuffer is what you see (photo, layers, final frame);
// an AlphaStencil is invisible on its own and only decides *where* color may land.

/// Opaque 8-bit color used for step tints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional). Returns None for anything else.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A position in photo pixel space (x right, y down).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// width × height grid of RGBA8 samples, row-major, 4 bytes per pixel.
/// Ownership: whoever builds it owns it; mutation happens in place, sharing needs an explicit clone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterBuffer {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>, // length = width * height * 4
}

impl RasterBuffer {
    /// Fully transparent black buffer.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0; width * height * 4] }
    }

    /// Every pixel set to `color` at full opacity.
    /// Visual: a flat sheet of one color (this is how a step's tint starts).
    pub fn filled(width: usize, height: usize, color: Rgb) -> Self {
        let mut data = Vec::with_capacity(width * height * 4);
        for _ in 0..width * height {
            data.extend_from_slice(&[color.r, color.g, color.b, 255]);
        }
        Self { width, height, data }
    }

    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        if data.len() != width * height * 4 {
            return None;
        }
        Some(Self { width, height, data })
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, px: [u8; 4]) {
        let i = (y * self.width + x) * 4;
        self.data[i..i + 4].copy_from_slice(&px);
    }

    pub fn same_size(&self, width: usize, height: usize) -> bool {
        self.width == width && self.height == height
    }

    /// Replace the alpha channel with the stencil's coverage.
    pub fn set_alpha_from(&mut self, stencil: &AlphaStencil) {
        debug_assert!(stencil.same_size(self.width, self.height));
        for (px, &a) in self.data.chunks_exact_mut(4).zip(stencil.alpha.iter()) {
            px[3] = a;
        }
    }

    /// Pack into 0x00RRGGBB words for minifb.
    pub fn to_xrgb(&self, out: &mut Vec<u32>) {
        out.clear();
        out.extend(self.data.chunks_exact(4).map(|px| {
            ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32
        }));
    }
}

/// Single-channel coverage mask: 0 = absent, 255 = fully present, 1..254 antialiased.
/// Invariant: dimensions always equal the working photo's dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlphaStencil {
    pub width: usize,
    pub height: usize,
    pub alpha: Vec<u8>, // length = width * height
}

impl AlphaStencil {
    /// Nothing covered.
    pub fn empty(width: usize, height: usize) -> Self {
        Self { width, height, alpha: vec![0; width * height] }
    }

    /// Everything covered (the "whole canvas permitted" stencil).
    pub fn full(width: usize, height: usize) -> Self {
        Self { width, height, alpha: vec![255; width * height] }
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut alpha = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                alpha.push(f(x, y));
            }
        }
        Self { width, height, alpha }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.alpha[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, a: u8) {
        self.alpha[y * self.width + x] = a;
    }

    pub fn same_size(&self, width: usize, height: usize) -> bool {
        self.width == width && self.height == height
    }

    pub fn is_empty(&self) -> bool {
        self.alpha.iter().all(|&a| a == 0)
    }

    pub fn clear(&mut self) {
        self.alpha.fill(0);
    }
}

/// Precomputed brush footprint, diameter = 2 × radius.
/// Visual: the soft round "dab" left on the step mask at each pointer sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrushStamp {
    pub radius: u32,
    pub image: RasterBuffer, // RGBA: gray = texture, alpha = falloff (plus gloss sheen)
    pub eraser: AlphaStencil, // what one erase dab removes, same size as `image`
}

impl BrushStamp {
    #[inline]
    pub fn diameter(&self) -> usize {
        self.image.width
    }

    /// Paint coverage of one stamp texel: alpha scaled by its luminance.
    #[inline]
    pub fn paint_coverage(&self, x: usize, y: usize) -> u8 {
        let [r, _, _, a] = self.image.pixel(x, y);
        mul_255(a, r)
    }

    #[inline]
    pub fn erase_coverage(&self, x: usize, y: usize) -> u8 {
        self.eraser.get(x, y)
    }
}

/// a × b / 255 with rounding; exact identity for b = 255 and absorbing for b = 0.
#[inline]
pub fn mul_255(a: u8, b: u8) -> u8 {
    ((a as u32 * b as u32 + 127) / 255) as u8
}
