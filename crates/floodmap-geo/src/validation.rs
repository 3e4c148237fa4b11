use geo::{LineString, MultiPolygon, Polygon};

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }

    fn absorb(&mut self, prefix: &str, other: ValidationResult) {
        for error in other.errors {
            self.add_error(format!("{}.{}", prefix, error.location), error.reason);
        }
    }
}

fn validate_ring(ring: &LineString<f64>, location: &str) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if ring.0.len() < 4 {
        result.add_error(
            location.to_string(),
            format!("ring must have at least 4 points, found {}", ring.0.len()),
        );
    }

    if let (Some(first), Some(last)) = (ring.0.first(), ring.0.last()) {
        if first != last {
            result.add_error(
                location.to_string(),
                "ring must be closed (first point == last point)".to_string(),
            );
        }
    }

    for (i, coord) in ring.0.iter().enumerate() {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            result.add_error(format!("{}[{}]", location, i), "Coordinates must be finite".to_string());
        }
    }

    result
}

/// Validate a polygon's rings
pub fn validate_polygon(polygon: &Polygon<f64>) -> ValidationResult {
    let mut result = validate_ring(polygon.exterior(), "exterior");

    for (i, interior) in polygon.interiors().iter().enumerate() {
        let ring = validate_ring(interior, &format!("interior[{}]", i));
        result.errors.extend(ring.errors);
    }
    result.is_valid = result.errors.is_empty();

    result
}

pub fn validate_multipolygon(multipolygon: &MultiPolygon<f64>) -> ValidationResult {
    let mut result = ValidationResult::valid();

    for (i, polygon) in multipolygon.0.iter().enumerate() {
        result.absorb(&format!("MultiPolygon[{}]", i), validate_polygon(polygon));
    }

    result
}
