use crate::fan_curve::CurvePoint;

// Piecewise linear fan curve with a configurable minimum duty floor.
// Breakpoints are trusted to be ordered by ascending temperature,
// the configuration loader rejects anything else at startup
#[derive(Debug, Clone)]
pub struct LinearCurve {
    points: Vec<CurvePoint>,
    min_duty: f64,
}

impl LinearCurve {
    pub fn new(points: &[(f64, f64)], min_duty: f64) -> LinearCurve {
        Self {
            points: points.iter().map(|p| CurvePoint::from(*p)).collect(),
            min_duty,
        }
    }

    // Return the number of breakpoints in the curve
    pub fn points_num(&self) -> usize {
        self.points.len()
    }

    // Return the duty cycle for the given temperature
    // as a fraction between 0 and 1
    pub fn duty_fraction(&self, temp: f64) -> f64 {
        // The segment below the first breakpoint rises from an
        // implicit origin point, the first breakpoint's duty is the
        // ceiling of that segment and not a value held from zero
        let mut lower = CurvePoint { temp: 0.0, duty: 0.0 };
        let mut upper = lower;

        // Find the two breakpoints bracketing the temperature
        for point in self.points.iter() {
            upper = *point;

            if point.temp > temp {
                break;
            }

            lower = *point;
        }

        // At or above the last breakpoint the bracket collapses
        // onto one point, return its duty directly with no floor
        if upper.temp <= lower.temp {
            return upper.duty / 100.0;
        }

        // y = mx + c between the two bracketing points
        let m = (upper.duty - lower.duty) / (upper.temp - lower.temp);
        let c = upper.duty - m * upper.temp;

        // Interpolated values are not allowed below the floor
        let duty = (m * temp + c).max(self.min_duty);

        duty / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINTS: &[(f64, f64)] =
        &[(25.0, 30.0), (30.0, 50.0), (40.0, 80.0), (60.0, 100.0)];

    #[test]
    fn interpolates_between_breakpoints() {
        let curve = LinearCurve::new(POINTS, 20.0);

        // Between (25, 30) and (30, 50): m = 4, 30 + 4 * 2.5 = 40
        assert!((curve.duty_fraction(27.5) - 0.40).abs() < 1e-9);
    }

    #[test]
    fn returns_last_duty_at_or_above_max() {
        let curve = LinearCurve::new(POINTS, 20.0);

        assert!((curve.duty_fraction(60.0) - 1.0).abs() < 1e-9);
        assert!((curve.duty_fraction(70.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rises_from_origin_below_first_breakpoint() {
        let curve = LinearCurve::new(POINTS, 0.0);

        // Linear from (0, 0) to (25, 30)
        assert!((curve.duty_fraction(12.5) - 0.15).abs() < 1e-9);
        assert!((curve.duty_fraction(0.0) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn floors_interpolated_values() {
        let points = &[(25.0, 0.0), (30.0, 50.0), (40.0, 80.0), (60.0, 100.0)];
        let curve = LinearCurve::new(points, 20.0);

        // The origin segment interpolates to 0, the floor lifts it to 20
        assert!((curve.duty_fraction(1.0) - 0.20).abs() < 1e-9);
    }

    #[test]
    fn floor_never_applies_at_or_above_max() {
        // A curve ending below the floor still returns the last
        // breakpoint's duty when the bracket collapses
        let points = &[(40.0, 10.0)];
        let curve = LinearCurve::new(points, 20.0);

        assert!((curve.duty_fraction(40.0) - 0.10).abs() < 1e-9);
        assert!((curve.duty_fraction(55.0) - 0.10).abs() < 1e-9);
    }

    #[test]
    fn exact_breakpoint_uses_upper_segment() {
        let curve = LinearCurve::new(POINTS, 0.0);

        // At 30 the bracket is (30, 50) to (40, 80)
        assert!((curve.duty_fraction(30.0) - 0.50).abs() < 1e-9);
    }

    #[test]
    fn duplicate_temperatures_encode_a_step() {
        // Repeated breakpoint temperatures are how configurations
        // express discontinuous jumps
        let points = &[(20.0, 40.0), (30.0, 40.0), (30.0, 60.0), (60.0, 100.0)];
        let curve = LinearCurve::new(points, 0.0);

        assert!((curve.duty_fraction(29.0) - 0.40).abs() < 1e-9);
        assert!((curve.duty_fraction(30.0) - 0.60).abs() < 1e-9);
    }

    #[test]
    fn monotonic_points_give_monotonic_output() {
        let curve = LinearCurve::new(POINTS, 0.0);

        let mut last = 0.0;
        for step in 0..=700 {
            let temp = step as f64 * 0.1;
            let duty = curve.duty_fraction(temp);

            assert!(duty >= last, "duty decreased at {temp}");
            last = duty;
        }
    }
}
