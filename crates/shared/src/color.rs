//! Brewing-color mapping: EBC measurement to display color.
//!
//! The measurement is clamped to the 0–80 EBC domain, converted to the
//! SRM scale, and run through polynomial fits for the three channels.
//! The fits are taken verbatim from the brewing reference data; green is
//! deliberately left unclamped because the clamped EBC domain already
//! keeps it inside 0–255.

const EBC_MAX: f64 = 80.0;

/// An 8-bit display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Six-digit lowercase hex encoding, `#rrggbb`.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Maps an EBC measurement to a display color.
///
/// Pure and deterministic. `saturation` of 1.0 keeps the full color and
/// 0.0 collapses to perceptual gray; values outside that range are not
/// validated, the blend simply extrapolates. NaN inputs are not guarded
/// and taint the output (the final channel casts saturate).
pub fn convert(ebc: f64, saturation: f64) -> Rgb {
    let srm = ebc_to_srm(ebc.clamp(0.0, EBC_MAX));
    let (r, g, b) = desaturate(calc_red(srm), calc_green(srm), calc_blue(srm), saturation);
    Rgb {
        r: channel(r),
        g: channel(g),
        b: channel(b),
    }
}

/// Convenience for callers that only need the hex form.
pub fn ebc_to_hex(ebc: f64, saturation: f64) -> String {
    convert(ebc, saturation).hex()
}

fn ebc_to_srm(ebc: f64) -> f64 {
    ebc * 0.508
}

fn calc_red(srm: f64) -> f64 {
    // Clamped above only; the fit cannot go negative inside the domain.
    (280.0 - srm * 5.65).round().min(255.0)
}

fn calc_green(srm: f64) -> f64 {
    (0.188349 * srm.powi(2) - 13.2676 * srm + 239.51).round()
}

fn calc_blue(srm: f64) -> f64 {
    let fit = 0.000933566 * srm.powi(4) - 0.0894788 * srm.powi(3) + 3.00611 * srm.powi(2)
        - 40.8883 * srm
        + 183.409;
    fit.round().max(0.0)
}

/// Blends each channel toward the perceptual gray of the rounded
/// channels: `channel * saturation + gray * (1 - saturation)`.
fn desaturate(r: f64, g: f64, b: f64, saturation: f64) -> (f64, f64, f64) {
    let gray = (r * 0.3086 + g * 0.6094 + b * 0.082) * (1.0 - saturation);
    (
        (r * saturation + gray).round(),
        (g * saturation + gray).round(),
        (b * saturation + gray).round(),
    )
}

fn channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}
