use crate::stats_reader::Metric;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Colour for municipalities without data; deliberately outside the blue ramp.
pub const NO_DATA: Rgb = Rgb(110, 110, 110);

// ColorBrewer "Blues", light to dark.
const BLUES: [Rgb; 9] = [
    Rgb(247, 251, 255),
    Rgb(222, 235, 247),
    Rgb(198, 219, 239),
    Rgb(158, 202, 225),
    Rgb(107, 174, 214),
    Rgb(66, 146, 198),
    Rgb(33, 113, 181),
    Rgb(8, 81, 156),
    Rgb(8, 48, 107),
];

/// Sequential scale over `[0, max]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorScale {
    max: f64,
}

impl ColorScale {
    /// A missing or non-positive maximum collapses the domain to `[0, 1]`.
    pub fn new(max: Option<f64>) -> Self {
        let max = max.filter(|m| *m > 0.0).unwrap_or(1.0);
        Self { max }
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Position of `value` in the domain, clamped to `[0, 1]`.
    pub fn normalize(&self, value: f64) -> f64 {
        (value / self.max).clamp(0.0, 1.0)
    }

    pub fn color(&self, metric: Metric) -> Rgb {
        match metric {
            Metric::Absent => NO_DATA,
            Metric::Value(v) => interpolate(self.normalize(v)),
        }
    }

    /// Legend ticks from the top of the domain down to zero.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        match count {
            0 => Vec::new(),
            1 => vec![self.max],
            _ => {
                let steps = (count - 1) as f64;
                (0..count).map(|i| self.max * (steps - i as f64) / steps).collect()
            }
        }
    }
}

fn interpolate(t: f64) -> Rgb {
    let scaled = t * (BLUES.len() - 1) as f64;
    let lo = scaled.floor() as usize;
    let hi = (lo + 1).min(BLUES.len() - 1);
    let frac = scaled - lo as f64;
    let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * frac).round() as u8;
    let (a, b) = (BLUES[lo], BLUES[hi]);
    Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ends_of_the_domain_hit_the_ramp_ends() {
        let scale = ColorScale::new(Some(30.0));
        assert_eq!(scale.color(Metric::Value(0.0)), BLUES[0]);
        assert_eq!(scale.color(Metric::Value(30.0)), BLUES[8]);
        assert_eq!(scale.color(Metric::Value(99.0)), BLUES[8]);
    }

    #[test]
    fn zero_and_absent_differ() {
        let scale = ColorScale::new(Some(10.0));
        assert_ne!(scale.color(Metric::Value(0.0)), scale.color(Metric::Absent));
        assert_eq!(scale.color(Metric::Absent), NO_DATA);
    }

    #[test]
    fn degenerate_domain_falls_back_to_unit() {
        assert_eq!(ColorScale::new(None).max(), 1.0);
        assert_eq!(ColorScale::new(Some(0.0)).max(), 1.0);
    }

    #[test]
    fn ticks_descend_to_zero() {
        let scale = ColorScale::new(Some(30.0));
        assert_eq!(scale.ticks(4), vec![30.0, 20.0, 10.0, 0.0]);
        assert_eq!(scale.ticks(1), vec![30.0]);
    }
}
