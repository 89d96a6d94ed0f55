//! Minimal software canvas with the compositing modes the synthesizer needs:
//! source-over, source-atop (paint clipped to existing alpha) and destination-out.

use image::RgbaImage;

/// Per-pixel coverage in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageMask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl CoverageMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: i64, y: i64) -> f32 {
        self.index(x, y).map_or(0.0, |i| self.data[i])
    }

    /// Keep the stronger of the existing and new coverage.
    pub fn accumulate(&mut self, x: i64, y: i64, coverage: f32) {
        if let Some(i) = self.index(x, y) {
            self.data[i] = self.data[i].max(coverage.clamp(0.0, 1.0));
        }
    }

    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, coverage: f32) {
        for y in y0.max(0)..y1.min(self.height as i64) {
            for x in x0.max(0)..x1.min(self.width as i64) {
                self.accumulate(x, y, coverage);
            }
        }
    }

    pub fn total(&self) -> f32 {
        self.data.iter().sum()
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|c| *c <= 0.0)
    }

    /// Grayscale dilation with a disc of `radius` pixels.
    pub fn dilate(&self, radius: u32) -> CoverageMask {
        if radius == 0 {
            return self.clone();
        }
        let r = radius as i64;
        let offsets: Vec<(i64, i64)> = (-r..=r)
            .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
            .filter(|(dx, dy)| dx * dx + dy * dy <= r * r)
            .collect();
        let mut out = CoverageMask::new(self.width, self.height);
        for y in 0..self.height as i64 {
            for x in 0..self.width as i64 {
                let c = self.get(x, y);
                if c <= 0.0 {
                    continue;
                }
                for (dx, dy) in &offsets {
                    out.accumulate(x + dx, y + dy, c);
                }
            }
        }
        out
    }

    /// Separable box blur applied twice, a cheap stand-in for a gaussian shadow.
    pub fn blur(&self, radius: u32) -> CoverageMask {
        if radius == 0 {
            return self.clone();
        }
        let mut out = self.clone();
        for _ in 0..2 {
            out = out.box_pass(radius, true).box_pass(radius, false);
        }
        out
    }

    fn box_pass(&self, radius: u32, horizontal: bool) -> CoverageMask {
        let r = radius as i64;
        let window = (2 * r + 1) as f32;
        let mut out = CoverageMask::new(self.width, self.height);
        let (outer, inner) = if horizontal {
            (self.height as i64, self.width as i64)
        } else {
            (self.width as i64, self.height as i64)
        };
        for o in 0..outer {
            let sample = |i: i64| {
                if horizontal {
                    self.get(i, o)
                } else {
                    self.get(o, i)
                }
            };
            let mut sum: f32 = (-r..=r).map(sample).sum();
            for i in 0..inner {
                let value = sum / window;
                let idx = if horizontal {
                    out.index(i, o)
                } else {
                    out.index(o, i)
                };
                if let Some(idx) = idx {
                    out.data[idx] = value;
                }
                sum += sample(i + r + 1) - sample(i - r);
            }
        }
        out
    }
}

/// Straight-alpha RGBA float canvas.
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn alpha(&self, x: i64, y: i64) -> f32 {
        self.index(x, y).map_or(0.0, |i| self.pixels[i][3])
    }

    pub fn source_over(&mut self, x: i64, y: i64, rgb: [f32; 3], alpha: f32) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        let sa = alpha.clamp(0.0, 1.0);
        if sa <= 0.0 {
            return;
        }
        let [dr, dg, db, da] = self.pixels[i];
        let out_a = sa + da * (1.0 - sa);
        let mix = |s: f32, d: f32| (s * sa + d * da * (1.0 - sa)) / out_a;
        self.pixels[i] = [mix(rgb[0], dr), mix(rgb[1], dg), mix(rgb[2], db), out_a];
    }

    /// Paint only where the destination already has alpha; destination alpha is kept.
    pub fn source_atop(&mut self, x: i64, y: i64, rgb: [f32; 3], alpha: f32) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        let sa = alpha.clamp(0.0, 1.0);
        let [dr, dg, db, da] = self.pixels[i];
        if da <= 0.0 || sa <= 0.0 {
            return;
        }
        let mix = |s: f32, d: f32| s * sa + d * (1.0 - sa);
        self.pixels[i] = [mix(rgb[0], dr), mix(rgb[1], dg), mix(rgb[2], db), da];
    }

    pub fn destination_out(&mut self, x: i64, y: i64, alpha: f32) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i][3] *= 1.0 - alpha.clamp(0.0, 1.0);
        }
    }

    pub fn fill_mask(&mut self, mask: &CoverageMask, rgb: [f32; 3], alpha: f32) {
        for y in 0..self.height.min(mask.height()) as i64 {
            for x in 0..self.width.min(mask.width()) as i64 {
                let coverage = mask.get(x, y);
                if coverage > 0.0 {
                    self.source_over(x, y, rgb, coverage * alpha);
                }
            }
        }
    }

    pub fn into_image(self) -> RgbaImage {
        let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let mut image = RgbaImage::new(self.width, self.height);
        for (pixel, value) in image.pixels_mut().zip(self.pixels) {
            pixel.0 = [to_u8(value[0]), to_u8(value[1]), to_u8(value[2]), to_u8(value[3])];
        }
        image
    }
}

pub fn rgb_unit(rgb: [u8; 3]) -> [f32; 3] {
    [
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dilate_grows_coverage() {
        let mut mask = CoverageMask::new(16, 16);
        mask.accumulate(8, 8, 1.0);
        let grown = mask.dilate(2);
        assert_eq!(grown.get(10, 8), 1.0);
        assert_eq!(grown.get(8, 6), 1.0);
        assert_eq!(grown.get(11, 8), 0.0);
    }

    #[test]
    fn blur_spreads_and_preserves_mass() {
        let mut mask = CoverageMask::new(32, 32);
        mask.fill_rect(12, 12, 20, 20, 1.0);
        let blurred = mask.blur(2);
        assert!(blurred.get(11, 16) > 0.0);
        assert!((blurred.total() - mask.total()).abs() < 1.0);
    }

    #[test]
    fn source_atop_never_adds_alpha() {
        let mut canvas = Canvas::new(2, 1);
        canvas.source_over(0, 0, [1.0, 0.0, 0.0], 0.5);
        canvas.source_atop(0, 0, [0.0, 0.0, 1.0], 1.0);
        canvas.source_atop(1, 0, [0.0, 0.0, 1.0], 1.0);
        assert!((canvas.alpha(0, 0) - 0.5).abs() < 1e-6);
        assert_eq!(canvas.alpha(1, 0), 0.0);
    }

    #[test]
    fn destination_out_erases() {
        let mut canvas = Canvas::new(1, 1);
        canvas.source_over(0, 0, [1.0, 1.0, 1.0], 1.0);
        canvas.destination_out(0, 0, 0.25);
        assert!((canvas.alpha(0, 0) - 0.75).abs() < 1e-6);
    }
}
