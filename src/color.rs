use std::fmt;

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Lenient `#rrggbb` parsing.
    ///
    /// Invalid or short input is accepted rather than rejected: the sanitized
    /// string is read as one hex integer and the low 24 bits become the
    /// channels, so `"fff"` is `#000fff` and garbage collapses to black.
    pub fn from_hex(hex: &str) -> Self {
        let sanitized = hex.trim().trim_start_matches('#');
        let bits = u32::from_str_radix(sanitized, 16).unwrap_or(0) & 0x00ff_ffff;
        Self {
            r: (bits >> 16) as u8,
            g: (bits >> 8) as u8,
            b: bits as u8,
            a: 255,
        }
    }

    /// Same color with an explicit opacity; `alpha` is clamped to [0, 1].
    pub fn with_opacity(self, alpha: f32) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    pub fn alpha_f32(self) -> f32 {
        f32::from(self.a) / 255.0
    }

    /// Per-channel linear interpolation, `t` clamped to [0, 1].
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 {
            let af = f32::from(a);
            let bf = f32::from(b);
            (af + (bf - af) * t).round().clamp(0.0, 255.0) as u8
        };
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }

    /// Premultiplied RGBA8 bytes for the raster pipeline.
    pub fn to_premul(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }
        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for Rgba8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl serde::Serialize for Rgba8 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Rgba8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        // 8-digit input carries an explicit alpha byte; everything else goes
        // through the lenient 24-bit path.
        let sanitized = s.trim().trim_start_matches('#');
        if sanitized.len() == 8
            && let Ok(bits) = u32::from_str_radix(sanitized, 16)
        {
            return Ok(Self {
                r: (bits >> 24) as u8,
                g: (bits >> 16) as u8,
                b: (bits >> 8) as u8,
                a: bits as u8,
            });
        }
        Ok(Self::from_hex(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_hex() {
        let c = Rgba8::from_hex("#14b8a6");
        assert_eq!(c, Rgba8::rgb(0x14, 0xb8, 0xa6));
    }

    #[test]
    fn short_and_invalid_hex_are_accepted() {
        assert_eq!(Rgba8::from_hex("fff"), Rgba8::rgb(0x00, 0x0f, 0xff));
        assert_eq!(Rgba8::from_hex("not-a-color"), Rgba8::rgb(0, 0, 0));
        assert_eq!(Rgba8::from_hex(""), Rgba8::rgb(0, 0, 0));
    }

    #[test]
    fn with_opacity_clamps_alpha() {
        let c = Rgba8::from_hex("#14b8a6");
        assert_eq!(c.with_opacity(1.5).a, 255);
        assert_eq!(c.with_opacity(-1.0).a, 0);
        assert_eq!(c.with_opacity(0.5).a, 128);
    }

    #[test]
    fn lerp_endpoints() {
        let a = Rgba8::rgba(10, 20, 30, 40);
        let b = Rgba8::rgba(200, 210, 220, 230);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
    }

    #[test]
    fn premul_halves_at_half_alpha() {
        let c = Rgba8::rgba(255, 0, 0, 128);
        assert_eq!(c.to_premul(), [128, 0, 0, 128]);
    }

    #[test]
    fn serde_hex_roundtrip() {
        let c = Rgba8::from_hex("#f97316");
        let s = serde_json::to_string(&c).unwrap();
        assert_eq!(s, "\"#f97316\"");
        let de: Rgba8 = serde_json::from_str(&s).unwrap();
        assert_eq!(de, c);
    }
}
