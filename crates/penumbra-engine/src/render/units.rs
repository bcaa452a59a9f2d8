//! Texture unit table.
//!
//! A "unit" is a binding number inside a program's texture bind group. The same
//! numbers are used by the host when building bind groups and by the shader
//! preamble generator when declaring `@binding(N)` variables, so both sides
//! always agree. Changing [`MAX_LIGHTS`] regenerates the shader declarations,
//! the `dirlights` uniform array and the shadow slot range together.

/// Maximum number of directional lights (shadow-casting).
pub const MAX_LIGHTS: usize = 8;

pub const BASE_COLOR: u32 = 0;
pub const METALLIC_ROUGHNESS: u32 = 1;
pub const HDR_DEPTH: u32 = 2;
pub const VOLUMETRIC: u32 = 3;

/// The composite program reads the HDR color output through the base-color unit.
pub const HDR_COLOR: u32 = BASE_COLOR;

/// First shadow-map unit; light slot `i` uses `SHADOW_MAP_BASE + i`.
pub const SHADOW_MAP_BASE: u32 = 4;

/// Samplers are declared above every texture unit.
pub const SAMPLER_BASE: u32 = 16;
pub const MATERIAL_SAMPLER: u32 = SAMPLER_BASE;
pub const SHADOW_SAMPLER: u32 = SAMPLER_BASE + 1;

const _: () = assert!(SHADOW_MAP_BASE as usize + MAX_LIGHTS <= SAMPLER_BASE as usize);
const _: () = assert!(VOLUMETRIC < SHADOW_MAP_BASE);

/// Unit reserved for the shadow map of light slot `slot`.
///
/// Returns `None` past [`MAX_LIGHTS`].
#[inline]
pub fn shadow_unit(slot: usize) -> Option<u32> {
    (slot < MAX_LIGHTS).then(|| SHADOW_MAP_BASE + slot as u32)
}

/// Iterates `(slot, unit)` for every shadow slot.
pub fn shadow_units() -> impl Iterator<Item = (usize, u32)> {
    (0..MAX_LIGHTS).map(|slot| (slot, SHADOW_MAP_BASE + slot as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_units_follow_material_units() {
        assert_eq!(shadow_unit(0), Some(4));
        assert_eq!(shadow_unit(MAX_LIGHTS - 1), Some(4 + MAX_LIGHTS as u32 - 1));
        assert_eq!(shadow_unit(MAX_LIGHTS), None);
    }

    #[test]
    fn units_are_unique() {
        let mut all: Vec<u32> = vec![BASE_COLOR, METALLIC_ROUGHNESS, HDR_DEPTH, VOLUMETRIC];
        all.extend(shadow_units().map(|(_, u)| u));
        all.extend([MATERIAL_SAMPLER, SHADOW_SAMPLER]);
        let mut dedup = all.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(all.len(), dedup.len());
    }
}
