use crate::error::Error;

/// Outcome of negotiating a requested sample rate against a device base
/// rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecimationPlan {
    pub requested_hz: u16,
    pub base_hz: u16,
    /// Integer divisor pushed to the device, never less than 1.
    pub decimation: u16,
    /// Rate the device will actually produce. Differs from the request
    /// whenever the base rate is not an integer multiple of it, and is
    /// what downstream health checks must target.
    pub actual_hz: f64,
}

pub fn negotiate(requested_hz: u16, base_hz: u16) -> Result<DecimationPlan, Error> {
    if requested_hz == 0 || requested_hz > base_hz {
        return Err(Error::RateExceedsBase {
            requested: requested_hz,
            base: base_hz,
        });
    }
    let decimation = (base_hz / requested_hz).max(1);
    Ok(DecimationPlan {
        requested_hz,
        base_hz,
        decimation,
        actual_hz: f64::from(base_hz) / f64::from(decimation),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_divisors() {
        let plan = negotiate(100, 1000).unwrap();
        assert_eq!(plan.decimation, 10);
        approx::assert_relative_eq!(plan.actual_hz, 100.0);

        let plan = negotiate(100, 500).unwrap();
        assert_eq!(plan.decimation, 5);
        approx::assert_relative_eq!(plan.actual_hz, 100.0);

        let plan = negotiate(500, 500).unwrap();
        assert_eq!(plan.decimation, 1);
        approx::assert_relative_eq!(plan.actual_hz, 500.0);
    }

    #[test]
    fn inexact_divisors_report_the_actual_rate() {
        let plan = negotiate(150, 500).unwrap();
        assert_eq!(plan.decimation, 3);
        approx::assert_relative_eq!(plan.actual_hz, 500.0 / 3.0, epsilon = 1e-12);

        let plan = negotiate(333, 1000).unwrap();
        assert_eq!(plan.decimation, 3);
        approx::assert_relative_eq!(plan.actual_hz, 1000.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn rejects_zero_and_excessive_requests() {
        assert!(matches!(
            negotiate(0, 500),
            Err(Error::RateExceedsBase { requested: 0, base: 500 })
        ));
        assert!(matches!(
            negotiate(501, 500),
            Err(Error::RateExceedsBase { requested: 501, base: 500 })
        ));
    }

    #[test]
    fn rounding_error_is_bounded() {
        for base in [100u16, 250, 500, 1000] {
            for requested in 1..=base {
                let plan = negotiate(requested, base).unwrap();
                assert!(plan.decimation >= 1);
                assert!(plan.actual_hz <= f64::from(base));
                // actual >= requested * d / (d + 1)
                let d = f64::from(plan.decimation);
                assert!(plan.actual_hz >= f64::from(requested) * d / (d + 1.0));
            }
        }
    }
}
