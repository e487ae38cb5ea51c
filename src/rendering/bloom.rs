//! Bloom mip chain layout.
//!
//! The bright pass writes the first mip size. Each level then blurs
//! horizontally and vertically at its own size, reading the previous
//! level's vertical result, and every level is added into the first-size
//! sum with a radius-dependent weight.

use glam::Vec2;

use super::uniforms::BloomUniforms;

/// Uniforms and size for one blur level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomLevel {
    pub size: (u32, u32),
    pub blur_h: BloomUniforms,
    pub blur_v: BloomUniforms,
    pub accumulate: BloomUniforms,
}

/// The full chain for one drawing-buffer size
#[derive(Debug, Clone, PartialEq)]
pub struct BloomChain {
    levels: Vec<BloomLevel>,
}

impl BloomChain {
    /// One level per entry of `mip_sizes`, using the strength, radius and
    /// threshold carried by `base`
    pub fn new(base: &BloomUniforms, mip_sizes: &[(u32, u32)]) -> Self {
        let count = mip_sizes.len();
        let levels = mip_sizes
            .iter()
            .enumerate()
            .map(|(index, &size)| {
                let sized = base.with_target_size(size);
                BloomLevel {
                    size,
                    blur_h: sized.with_direction(Vec2::X),
                    blur_v: sized.with_direction(Vec2::Y),
                    accumulate: sized.with_weight(level_weight(index, count, base.radius)),
                }
            })
            .collect();
        Self { levels }
    }

    pub fn levels(&self) -> &[BloomLevel] {
        &self.levels
    }

    pub fn sizes(&self) -> Vec<(u32, u32)> {
        self.levels.iter().map(|level| level.size).collect()
    }

    /// Size of the bright-pass and sum targets
    pub fn base_size(&self) -> (u32, u32) {
        self.levels.first().map_or((1, 1), |level| level.size)
    }
}

/// Weight of level `index` of `count`
///
/// Level factors fall linearly from 1 (1, 0.8, .., 0.2 for five levels);
/// `radius` mixes each factor toward `1.2 - factor`, shifting weight onto
/// the wider, coarser levels.
pub fn level_weight(index: usize, count: usize, radius: f32) -> f32 {
    let count = count.max(1) as f32;
    let factor = 1.0 - index as f32 / count;
    factor + (1.2 - factor - factor) * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::Composer;
    use crate::params::BloomParams;

    #[test]
    fn test_chain_matches_composer_sizes() {
        for levels in [1, 3, 5, 8] {
            let bloom = BloomParams {
                mip_levels: levels,
                ..Default::default()
            };
            let composer = Composer::new(bloom, 1280, 720, 1.5);
            let base = BloomUniforms::new(composer.bloom(), composer.bloom_mip_sizes()[0]);
            let chain = BloomChain::new(&base, composer.bloom_mip_sizes());

            assert_eq!(chain.levels().len(), levels);
            assert_eq!(chain.sizes(), composer.bloom_mip_sizes());
            assert_eq!(chain.base_size(), (960, 540));
            for level in chain.levels() {
                let texel = [1.0 / level.size.0 as f32, 1.0 / level.size.1 as f32];
                assert_eq!(level.blur_h.texel_size, texel);
                assert_eq!(level.blur_v.texel_size, texel);
                assert_eq!(level.blur_h.direction, [1.0, 0.0]);
                assert_eq!(level.blur_v.direction, [0.0, 1.0]);
            }
        }
    }

    #[test]
    fn test_level_weights() {
        // Zero radius keeps the linear falloff
        let tight: Vec<f32> = (0..5).map(|i| level_weight(i, 5, 0.0)).collect();
        for (w, expected) in tight.iter().zip([1.0, 0.8, 0.6, 0.4, 0.2]) {
            assert!((w - expected).abs() < 1e-6);
        }
        // Full radius reverses it
        assert!((level_weight(0, 5, 1.0) - 0.2).abs() < 1e-6);
        assert!((level_weight(4, 5, 1.0) - 1.0).abs() < 1e-6);
        // Default radius 0.5 weights every level equally
        for i in 0..5 {
            assert!((level_weight(i, 5, 0.5) - 0.6).abs() < 1e-6);
        }
    }

    #[test]
    fn test_accumulate_uniforms_carry_weights() {
        let base = BloomUniforms::new(&BloomParams::default(), (400, 300));
        let chain = BloomChain::new(&base, &[(400, 300), (200, 150)]);
        let levels = chain.levels();
        assert!((levels[0].accumulate.weight - level_weight(0, 2, 0.5)).abs() < 1e-6);
        assert!((levels[1].accumulate.weight - level_weight(1, 2, 0.5)).abs() < 1e-6);
        assert_eq!(levels[1].accumulate.strength, 2.0);
    }

    #[test]
    fn test_empty_chain_base_size() {
        let base = BloomUniforms::new(&BloomParams::default(), (1, 1));
        let chain = BloomChain::new(&base, &[]);
        assert!(chain.levels().is_empty());
        assert_eq!(chain.base_size(), (1, 1));
    }
}
