pub mod linear_curve;

// One vertex of a piecewise linear fan curve.
// The duty is a percentage between 0 and 100
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub temp: f64,
    pub duty: f64,
}

impl From<(f64, f64)> for CurvePoint {
    fn from(value: (f64, f64)) -> Self {
        Self {
            temp: value.0,
            duty: value.1,
        }
    }
}
