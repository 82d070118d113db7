use crate::error::TypeflowError;
use fixed::types::I32F32;

/// Fixed-point length in PostScript points. All geometry and spacing
/// arithmetic goes through milli-point integers, so add/sub/compare are
/// exact and reproducible across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pt(I32F32);

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::from_bits(0));

    pub fn from_f32(value: f32) -> Pt {
        if !value.is_finite() {
            return Pt::ZERO;
        }
        let milli = (value as f64 * 1000.0).round();
        let milli = milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Pt::from_milli_i64(milli)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_milli_i64(self) -> i64 {
        let bits = self.0.to_bits() as i128;
        let denom = 1i128 << 32;
        let scaled = bits * 1000;
        let adj = if scaled >= 0 { denom / 2 } else { -denom / 2 };
        let milli = (scaled + adj) / denom;
        milli.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn max(self, other: Pt) -> Pt {
        if self >= other { self } else { other }
    }

    pub fn mul_ratio(self, num: i32, denom: i32) -> Pt {
        if denom == 0 {
            return Pt::ZERO;
        }
        let milli = self.to_milli_i64() as i128;
        let value = div_round_i128(milli.saturating_mul(num as i128), denom as i128);
        Pt::from_milli_i128(value)
    }

    pub fn from_milli_i64(milli: i64) -> Pt {
        Pt::from_milli_i128(milli as i128)
    }

    fn from_milli_i128(milli: i128) -> Pt {
        let denom = 1i128 << 32;
        let adj = if milli >= 0 { 500 } else { -500 };
        let bits = (milli * denom + adj) / 1000;
        let bits = bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Pt(I32F32::from_bits(bits))
    }

    /// Parses a textual length literal such as "12pt", "210mm", "1cm",
    /// "8.5in", "16px" or "2pc". Fails on anything else.
    pub fn parse(raw: &str) -> Result<Pt, TypeflowError> {
        let trimmed = raw.trim();
        let malformed = || TypeflowError::Parse(raw.to_string());
        if trimmed.len() < 3 || !trimmed.is_ascii() {
            return Err(malformed());
        }
        let (number, unit) = trimmed.split_at(trimmed.len() - 2);
        let value: f64 = number.trim().parse().map_err(|_| malformed())?;
        if !value.is_finite() {
            return Err(malformed());
        }
        let milli = match unit {
            "pt" => value * 1000.0,
            "in" => value * 72_000.0,
            "pc" => value * 12_000.0,
            "px" => value * 750.0,
            "mm" => value * 72_000.0 / 25.4,
            "cm" => value * 72_000.0 / 2.54,
            _ => return Err(malformed()),
        };
        let milli = milli.round();
        if milli < i64::MIN as f64 || milli > i64::MAX as f64 {
            return Err(malformed());
        }
        Ok(Pt::from_milli_i64(milli as i64))
    }
}

impl std::ops::Add for Pt {
    type Output = Pt;
    fn add(self, rhs: Pt) -> Pt {
        Pt::from_milli_i128(self.to_milli_i64() as i128 + rhs.to_milli_i64() as i128)
    }
}

impl std::ops::Sub for Pt {
    type Output = Pt;
    fn sub(self, rhs: Pt) -> Pt {
        Pt::from_milli_i128(self.to_milli_i64() as i128 - rhs.to_milli_i64() as i128)
    }
}

impl std::ops::SubAssign for Pt {
    fn sub_assign(&mut self, rhs: Pt) {
        *self = *self - rhs;
    }
}

impl std::ops::Mul<i32> for Pt {
    type Output = Pt;
    fn mul(self, rhs: i32) -> Pt {
        let milli = self.to_milli_i64() as i128;
        Pt::from_milli_i128(milli.saturating_mul(rhs as i128))
    }
}

impl std::ops::Mul<f32> for Pt {
    type Output = Pt;
    fn mul(self, rhs: f32) -> Pt {
        if !rhs.is_finite() {
            return Pt::ZERO;
        }
        Pt::from_f32(self.to_f32() * rhs)
    }
}

impl std::ops::Neg for Pt {
    type Output = Pt;
    fn neg(self) -> Pt {
        Pt::from_milli_i128(-(self.to_milli_i64() as i128))
    }
}

fn div_round_i128(num: i128, den: i128) -> i128 {
    if den == 0 {
        return 0;
    }
    let den_abs = den.abs();
    if num >= 0 {
        (num + (den_abs / 2)) / den
    } else {
        -(((-num) + (den_abs / 2)) / den)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: Pt,
    pub height: Pt,
}

/// Resolved page geometry. All six fields are committed together by the
/// dimension resolver; a document never observes a partial record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: Pt,
    pub height: Pt,
    pub margin_left: Pt,
    pub margin_right: Pt,
    pub margin_top: Pt,
    pub margin_bottom: Pt,
}
