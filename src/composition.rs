//! Post-processing chain: scene render, bloom, then antialiasing.
//!
//! The composer owns the viewport size and everything derived from it;
//! the GPU surface reads these values rather than recomputing them.

use glam::Vec2;

use crate::params::BloomParams;

/// One stage of the composition chain, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Backdrop, orb and particles into the HDR scene target
    Render,
    /// Threshold, blur mip chain and additive composite
    Bloom,
    /// FXAA onto the presentation surface
    Fxaa,
}

/// Fixed pass order
pub const PASS_ORDER: [PassKind; 3] = [PassKind::Render, PassKind::Bloom, PassKind::Fxaa];

/// Viewport-dependent composition state
#[derive(Debug, Clone, PartialEq)]
pub struct Composer {
    bloom: BloomParams,
    width: u32,
    height: u32,
    pixel_ratio: f32,
    /// Recomputed on every accepted resize
    bloom_mips: Vec<(u32, u32)>,
}

impl Composer {
    pub fn new(bloom: BloomParams, width: u32, height: u32, pixel_ratio: f32) -> Self {
        let mut composer = Self {
            bloom,
            width: 1,
            height: 1,
            pixel_ratio: 1.0,
            bloom_mips: Vec::new(),
        };
        composer.resize(width, height, pixel_ratio);
        composer.bloom_mips =
            bloom_mip_chain(composer.drawing_buffer_size(), composer.bloom.mip_levels);
        composer
    }

    pub fn passes(&self) -> &'static [PassKind] {
        &PASS_ORDER
    }

    /// Apply a new viewport size. Zero-sized viewports are ignored.
    /// Returns true when the size actually changed.
    pub fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32) -> bool {
        if width == 0 || height == 0 {
            log::warn!("Ignoring zero-sized resize {}x{}", width, height);
            return false;
        }
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };

        let changed =
            self.width != width || self.height != height || self.pixel_ratio != pixel_ratio;
        self.width = width;
        self.height = height;
        self.pixel_ratio = pixel_ratio;
        if changed {
            self.bloom_mips = bloom_mip_chain(self.drawing_buffer_size(), self.bloom.mip_levels);
            log::debug!("Viewport {}x{} @ {}x", width, height, pixel_ratio);
        }
        changed
    }

    /// Width over height of the CSS-pixel viewport
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Device-pixel size of the drawing buffer
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        let w = (self.width as f32 * self.pixel_ratio).round().max(1.0) as u32;
        let h = (self.height as f32 * self.pixel_ratio).round().max(1.0) as u32;
        (w, h)
    }

    /// `(w*dpr, h*dpr)` as fed to the backdrop shader
    pub fn backdrop_resolution(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * self.pixel_ratio,
            self.height as f32 * self.pixel_ratio,
        )
    }

    /// `(1/(w*dpr), 1/(h*dpr))` for the FXAA pass
    pub fn fxaa_inverse_resolution(&self) -> Vec2 {
        Vec2::ONE / self.backdrop_resolution()
    }

    /// Bloom blur target sizes for the current drawing buffer
    pub fn bloom_mip_sizes(&self) -> &[(u32, u32)] {
        &self.bloom_mips
    }

    pub fn bloom(&self) -> &BloomParams {
        &self.bloom
    }
}

/// Bloom blur target sizes: `levels` sizes (at least one), starting at
/// half of `buffer_size` and halving, each rounded and at least 1x1
pub fn bloom_mip_chain(buffer_size: (u32, u32), levels: usize) -> Vec<(u32, u32)> {
    let halve = |(w, h): (u32, u32)| {
        (
            (w as f32 / 2.0).round().max(1.0) as u32,
            (h as f32 / 2.0).round().max(1.0) as u32,
        )
    };
    let mut size = halve(buffer_size);
    let mut mips = Vec::with_capacity(levels.max(1));
    for _ in 0..levels.max(1) {
        mips.push(size);
        size = halve(size);
    }
    mips
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_doubles_resolution_uniforms() {
        let mut composer = Composer::new(BloomParams::default(), 800, 600, 1.0);
        let aspect_before = composer.aspect();
        let inverse_before = composer.fxaa_inverse_resolution();
        let backdrop_before = composer.backdrop_resolution();

        assert!(composer.resize(1600, 1200, 1.0));
        assert!((composer.aspect() - aspect_before).abs() < 1e-6);
        assert!((aspect_before - 4.0 / 3.0).abs() < 1e-6);

        let inverse_after = composer.fxaa_inverse_resolution();
        assert!((inverse_before.x / inverse_after.x - 2.0).abs() < 1e-5);
        assert!((inverse_before.y / inverse_after.y - 2.0).abs() < 1e-5);
        assert_eq!(composer.backdrop_resolution(), backdrop_before * 2.0);
    }

    #[test]
    fn test_zero_resize_is_noop() {
        let mut composer = Composer::new(BloomParams::default(), 800, 600, 2.0);
        let before = composer.clone();
        assert!(!composer.resize(0, 600, 1.0));
        assert!(!composer.resize(800, 0, 1.0));
        assert_eq!(composer, before);
        assert!(composer.aspect().is_finite());
    }

    #[test]
    fn test_resize_is_idempotent() {
        let mut composer = Composer::new(BloomParams::default(), 1024, 768, 1.0);
        assert!(!composer.resize(1024, 768, 1.0));
        assert!(!composer.resize(1024, 768, 1.0));
        assert_eq!(composer.size(), (1024, 768));
    }

    #[test]
    fn test_pixel_ratio_scales_buffers() {
        let composer = Composer::new(BloomParams::default(), 800, 600, 2.0);
        assert_eq!(composer.drawing_buffer_size(), (1600, 1200));
        assert_eq!(composer.backdrop_resolution(), Vec2::new(1600.0, 1200.0));
        let inv = composer.fxaa_inverse_resolution();
        assert!((inv.x - 1.0 / 1600.0).abs() < 1e-9);
    }

    #[test]
    fn test_bloom_mip_chain() {
        let composer = Composer::new(BloomParams::default(), 800, 600, 1.0);
        let mips = composer.bloom_mip_sizes();
        assert_eq!(mips.len(), 5);
        assert_eq!(mips[0], (400, 300));
        assert_eq!(mips[1], (200, 150));
        assert_eq!(mips[4], (25, 19));
    }

    #[test]
    fn test_bloom_mips_follow_resize_and_level_count() {
        let bloom = BloomParams {
            mip_levels: 2,
            ..Default::default()
        };
        let mut composer = Composer::new(bloom, 800, 600, 1.0);
        assert_eq!(composer.bloom_mip_sizes(), &[(400, 300), (200, 150)]);

        composer.resize(1600, 1200, 1.0);
        assert_eq!(composer.bloom_mip_sizes(), &[(800, 600), (400, 300)]);

        // A rejected resize keeps the chain
        composer.resize(0, 0, 1.0);
        assert_eq!(composer.bloom_mip_sizes().len(), 2);
    }

    #[test]
    fn test_mip_chain_never_empty_or_zero() {
        assert_eq!(bloom_mip_chain((4, 2), 0), vec![(2, 1)]);
        let tiny = bloom_mip_chain((3, 1), 4);
        assert_eq!(tiny.len(), 4);
        assert!(tiny.iter().all(|&(w, h)| w >= 1 && h >= 1));
    }

    #[test]
    fn test_pass_order() {
        let composer = Composer::new(BloomParams::default(), 10, 10, 1.0);
        assert_eq!(
            composer.passes(),
            &[PassKind::Render, PassKind::Bloom, PassKind::Fxaa]
        );
    }
}
