//! Unit conversions between native host units (feet) and reported units.

/// Square feet to square metres.
pub const FT2_TO_M2: f64 = 0.092903;

/// Cubic feet to cubic metres.
pub const FT3_TO_M3: f64 = 0.028_316_846_592;

/// Millimetres per foot.
pub const MM_PER_FT: f64 = 304.8;

#[must_use]
pub fn ft2_to_m2(area_ft2: f64) -> f64 {
    area_ft2 * FT2_TO_M2
}

#[must_use]
pub fn m2_to_ft2(area_m2: f64) -> f64 {
    area_m2 / FT2_TO_M2
}

#[must_use]
pub fn ft3_to_m3(volume_ft3: f64) -> f64 {
    volume_ft3 * FT3_TO_M3
}

#[must_use]
pub fn mm_to_ft(length_mm: f64) -> f64 {
    length_mm / MM_PER_FT
}

#[must_use]
pub fn ft_to_mm(length_ft: f64) -> f64 {
    length_ft * MM_PER_FT
}
