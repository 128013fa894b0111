//! Gamma curves applied to palette intensities before packing.
//!
//! The host normally owns the curve contents; this type only holds them and
//! answers lookups by level.

/// A set of 256-entry intensity curves indexed by gamma level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GammaTable {
    curves: Vec<[u8; 256]>,
}

impl GammaTable {
    /// Wrap host-supplied curves. An empty list behaves like `identity()`.
    pub fn new(curves: Vec<[u8; 256]>) -> Self {
        if curves.is_empty() {
            return Self::identity();
        }
        Self { curves }
    }

    /// A single level that leaves every intensity unchanged.
    pub fn identity() -> Self {
        let mut curve = [0u8; 256];
        for (i, v) in curve.iter_mut().enumerate() {
            *v = i as u8;
        }
        Self {
            curves: vec![curve],
        }
    }

    /// Level 0 is identity; each further level brightens with exponent
    /// `1 / (1 + level / 4)`, so level 4 is a square root curve.
    pub fn power_curves(levels: usize) -> Self {
        let curves = (0..levels.max(1))
            .map(|level| {
                let exponent = 1.0 / (1.0 + level as f64 / 4.0);
                let mut curve = [0u8; 256];
                for (i, v) in curve.iter_mut().enumerate() {
                    let x = i as f64 / 255.0;
                    *v = (255.0 * x.powf(exponent)).round().clamp(0.0, 255.0) as u8;
                }
                curve
            })
            .collect();
        Self { curves }
    }

    pub fn levels(&self) -> usize {
        self.curves.len()
    }

    /// Curve for `level`; levels past the end use the brightest curve.
    pub fn curve(&self, level: usize) -> &[u8; 256] {
        let last = self.curves.len() - 1;
        &self.curves[level.min(last)]
    }

    #[inline]
    pub fn apply(&self, level: usize, value: u8) -> u8 {
        self.curve(level)[value as usize]
    }
}

impl Default for GammaTable {
    fn default() -> Self {
        Self::identity()
    }
}
