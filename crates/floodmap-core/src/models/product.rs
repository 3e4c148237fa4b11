use crate::error::{FloodError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Square metres per hectare
pub const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

/// SAR polarization channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Polarization {
    HH,
    HV,
    VV,
    VH,
}

impl Polarization {
    /// All supported channels in processing order
    pub const ALL: [Polarization; 4] =
        [Polarization::HH, Polarization::HV, Polarization::VV, Polarization::VH];

    pub fn as_str(&self) -> &'static str {
        match self {
            Polarization::HH => "HH",
            Polarization::HV => "HV",
            Polarization::VV => "VV",
            Polarization::VH => "VH",
        }
    }
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Polarization {
    type Err = FloodError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "HH" => Ok(Polarization::HH),
            "HV" => Ok(Polarization::HV),
            "VV" => Ok(Polarization::VV),
            "VH" => Ok(Polarization::VH),
            other => Err(FloodError::validation(
                "polarization",
                format!("Unsupported polarization '{}'. Use HH, HV, VV or VH", other),
            )),
        }
    }
}

/// Identity of one raw acquisition segment, parsed from its product directory name
///
/// Directory names follow `SAT_orbit_p_d_BEAM_YYYYMMDD_HHMMSS_POL[_POL...]_PRODUCT`,
/// e.g. `RS2_OK20576_PK214403_DK199768_F6F_20110507_225921_HH_HV_SGF`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneId {
    pub satellite: String,
    pub beam: String,
    pub date: String,
    pub time: String,
    pub polarizations: Vec<Polarization>,
}

impl SceneId {
    /// Parse a scene directory name
    pub fn parse(name: &str) -> Result<Self> {
        let parts: Vec<&str> = name.split('_').collect();
        if parts.len() < 9 {
            return Err(FloodError::validation(
                "scene",
                format!("'{}' does not look like a scene product name", name),
            ));
        }

        let date = parts[5];
        let time = parts[6];
        if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
            return Err(FloodError::validation(
                "scene",
                format!("'{}' has no YYYYMMDD acquisition date", name),
            ));
        }
        if time.len() != 6 || !time.chars().all(|c| c.is_ascii_digit()) {
            return Err(FloodError::validation(
                "scene",
                format!("'{}' has no HHMMSS acquisition time", name),
            ));
        }

        let polarizations = parts[7..parts.len() - 1]
            .iter()
            .map(|p| p.parse::<Polarization>())
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            satellite: parts[0].to_string(),
            beam: parts[4].to_string(),
            date: date.to_string(),
            time: time.to_string(),
            polarizations,
        })
    }

    /// File stem shared by the imported and orthorectified rasters of this scene
    pub fn product_stem(&self) -> String {
        format!("{}_{}_{}_{}", self.satellite, self.beam, self.date, self.time)
    }
}

/// Ground pixel spacing in map units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSpacing {
    pub x: f64,
    pub y: f64,
}

impl Default for PixelSpacing {
    fn default() -> Self {
        Self { x: 12.5, y: 12.5 }
    }
}

impl FromStr for PixelSpacing {
    type Err = FloodError;

    /// Parse a `"x,y"` pair
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            FloodError::validation("pixel_spacing", format!("'{}' {}", s, reason))
        };

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(invalid("must be two comma-separated values, e.g. 12.5,12.5"));
        }

        let x: f64 = parts[0].parse().map_err(|_| invalid("has a non-numeric x spacing"))?;
        let y: f64 = parts[1].parse().map_err(|_| invalid("has a non-numeric y spacing"))?;
        if !(x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0) {
            return Err(invalid("must contain positive spacings"));
        }

        Ok(Self { x, y })
    }
}

impl fmt::Display for PixelSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Shape and georeferencing of a raster on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterInfo {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub pixel_width: f64,
    /// Usually negative for north-up rasters
    pub pixel_height: f64,
    pub projection: Option<String>,
}

/// A named raster artifact produced by a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageProduct {
    pub path: PathBuf,
    pub polarization: Option<Polarization>,
    pub date: String,
    pub time: String,
    pub projection_code: String,
    pub pixel_spacing: PixelSpacing,
}

/// Short projection code used in product names
///
/// `"UTM 18 D122"` becomes `UTM18`, `"CanLCC      E008"` becomes `CanLCC`.
pub fn projection_code(projection: &str) -> Result<String> {
    let tokens: Vec<&str> = projection.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(FloodError::validation(
            "projection",
            format!("'{}' must end with a datum/ellipsoid token, e.g. 'UTM 18 D122'", projection),
        ));
    }
    Ok(tokens[..tokens.len() - 1].concat())
}

/// File-name token for a numeric parameter: `2.5` gives `2p5`, `-12.5` gives `m12p5`
pub fn value_token(value: f64) -> String {
    format!("{}", value).replace('-', "m").replace('.', "p")
}

/// Pixel-count threshold for a sieve removing regions below `hole_size_ha`
///
/// Pixel height is usually stored negative, so the pixel area uses its magnitude.
pub fn sieve_pixel_count(hole_size_ha: f64, pixel_width: f64, pixel_height: f64) -> Result<u64> {
    if !(hole_size_ha.is_finite() && hole_size_ha > 0.0) {
        return Err(FloodError::validation("hole_size", "must be a positive number of hectares"));
    }

    let pixel_area = (pixel_width * pixel_height).abs();
    if !(pixel_area.is_finite() && pixel_area > 0.0) {
        return Err(FloodError::validation(
            "pixel_spacing",
            format!("raster pixel size {} x {} has no area", pixel_width, pixel_height),
        ));
    }

    Ok((hole_size_ha * SQUARE_METRES_PER_HECTARE / pixel_area).floor() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_dual_pol_scene() {
        let scene =
            SceneId::parse("RS2_OK20576_PK214403_DK199768_F6F_20110507_225921_HH_HV_SGF").unwrap();
        assert_eq!(scene.satellite, "RS2");
        assert_eq!(scene.beam, "F6F");
        assert_eq!(scene.date, "20110507");
        assert_eq!(scene.time, "225921");
        assert_eq!(scene.polarizations, vec![Polarization::HH, Polarization::HV]);
        assert_eq!(scene.product_stem(), "RS2_F6F_20110507_225921");
    }

    #[test]
    fn test_parse_quad_pol_scene() {
        let scene = SceneId::parse("RS2_OK1_PK2_DK3_FQ5_20160510_232553_HH_HV_VV_VH_SLC").unwrap();
        assert_eq!(scene.polarizations.len(), 4);
    }

    #[test]
    fn test_reject_malformed_scene_names() {
        assert!(SceneId::parse("notes").is_err());
        assert!(SceneId::parse("RS2_OK1_PK2_DK3_F6F_2011_225921_HH_SGF").is_err());
        assert!(SceneId::parse("RS2_OK1_PK2_DK3_F6F_20110507_225921_XX_SGF").is_err());
    }

    #[test]
    fn test_pixel_spacing_parsing() {
        assert_eq!("12.5,12.5".parse::<PixelSpacing>().unwrap(), PixelSpacing::default());
        assert_eq!("10, 20".parse::<PixelSpacing>().unwrap(), PixelSpacing { x: 10.0, y: 20.0 });
        assert!("12.5".parse::<PixelSpacing>().is_err());
        assert!("12.5,abc".parse::<PixelSpacing>().is_err());
        assert!("12.5,12.5,3".parse::<PixelSpacing>().is_err());
        assert!("-1,12.5".parse::<PixelSpacing>().is_err());
    }

    #[test]
    fn test_projection_code() {
        assert_eq!(projection_code("UTM 18 D122").unwrap(), "UTM18");
        assert_eq!(projection_code("CanLCC      E008").unwrap(), "CanLCC");
        assert!(projection_code("UTM").is_err());
    }

    #[test]
    fn test_value_tokens() {
        assert_eq!(value_token(2.5), "2p5");
        assert_eq!(value_token(2.0), "2");
        assert_eq!(value_token(-12.5), "m12p5");
    }

    #[test]
    fn test_sieve_pixel_count_uses_absolute_pixel_area() {
        assert_eq!(sieve_pixel_count(2.5, 12.5, -12.5).unwrap(), 160);
        assert_eq!(sieve_pixel_count(2.5, 12.5, 12.5).unwrap(), 160);
        // 2,500,000 m2 over 156.25 m2 pixels
        assert_eq!(sieve_pixel_count(250.0, 12.5, -12.5).unwrap(), 16000);
    }

    #[test]
    fn test_sieve_pixel_count_rejects_degenerate_input() {
        assert!(sieve_pixel_count(0.0, 12.5, -12.5).is_err());
        assert!(sieve_pixel_count(2.5, 0.0, -12.5).is_err());
    }

    proptest! {
        #[test]
        fn prop_sieve_count_ignores_pixel_height_sign(
            hole in 0.1f64..500.0,
            w in 1.0f64..100.0,
            h in 1.0f64..100.0,
        ) {
            let north_up = sieve_pixel_count(hole, w, -h).unwrap();
            let south_up = sieve_pixel_count(hole, w, h).unwrap();
            prop_assert_eq!(north_up, south_up);
        }
    }
}
