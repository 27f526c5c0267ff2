//! Derived physical quantities with first-order error propagation.
//!
//! The error formulas are the simplified linear ones the downstream plots
//! were produced with; they are not exact propagation.

use crate::error::{StatError, StatResult};
use crate::models::Measured;

/// Spin polarization from a magnetoresistance given in percent.
///
/// `P = sqrt(MR / (200 + MR))`. A zero MR yields zero error.
pub fn polarization_from_mr(mr: Measured) -> StatResult<Measured> {
    let denom = 200.0 + mr.value;
    if denom == 0.0 {
        return Err(StatError::Degenerate(
            "magnetoresistance of -200% has no polarization".to_string(),
        ));
    }

    let ratio = mr.value / denom;
    if ratio < 0.0 {
        return Err(StatError::Degenerate(format!(
            "negative ratio {} for magnetoresistance {}",
            ratio, mr.value
        )));
    }

    let p = ratio.sqrt();
    let err = if mr.value == 0.0 {
        0.0
    } else {
        (mr.err / mr.value + mr.err / denom) * p.sqrt() / 2.0
    };

    Ok(Measured::new(p, err))
}

/// Magnetoresistance in percent from two polarization estimates.
///
/// `MR = |2 p1 p2 / (1 - p1 p2)| * 100`. A zero polarization contributes
/// no relative-error term.
pub fn mr_from_polarization(p1: Measured, p2: Measured) -> StatResult<Measured> {
    let product = p1.value * p2.value;
    if product == 1.0 {
        return Err(StatError::Degenerate(
            "polarization product of 1 makes magnetoresistance infinite".to_string(),
        ));
    }

    let tmr = (2.0 * product / (1.0 - product)).abs();
    let rel = relative(p1) + relative(p2);
    let err = (rel + rel).abs() * tmr;

    Ok(Measured::new(tmr * 100.0, err * 100.0))
}

fn relative(p: Measured) -> f64 {
    if p.value == 0.0 {
        0.0
    } else {
        p.err / p.value
    }
}

/// Which hysteresis-history class a field point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryClass {
    Lower,
    Upper,
}

/// Branch selection: both magnetization indicators on the same side
/// (strictly positive product) means the upper history class.
pub fn history_class(m_fst: f64, m_snd: f64) -> HistoryClass {
    if m_fst * m_snd > 0.0 {
        HistoryClass::Upper
    } else {
        HistoryClass::Lower
    }
}

/// Pick the magnetoresistance estimate for a field point.
pub fn select_history_class(m_fst: f64, m_snd: f64, lhc: Measured, uhc: Measured) -> Measured {
    match history_class(m_fst, m_snd) {
        HistoryClass::Upper => uhc,
        HistoryClass::Lower => lhc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarization_mr_round_trip() {
        let mut mr = 0.5;
        while mr < 200.0 {
            let p = polarization_from_mr(Measured::new(mr, 0.0)).unwrap();
            let back = mr_from_polarization(p, p).unwrap();
            assert!(
                (back.value - mr).abs() < 1e-9 * mr.max(1.0),
                "mr {} came back as {}",
                mr,
                back.value
            );
            mr += 7.25;
        }
    }

    #[test]
    fn test_polarization_error_formula() {
        let p = polarization_from_mr(Measured::new(100.0, 3.0)).unwrap();
        let expected_p = (100.0f64 / 300.0).sqrt();
        assert!((p.value - expected_p).abs() < 1e-12);

        let expected_err = (3.0 / 100.0 + 3.0 / 300.0) * expected_p.sqrt() / 2.0;
        assert!((p.err - expected_err).abs() < 1e-12);
    }

    #[test]
    fn test_zero_mr_has_zero_error() {
        let p = polarization_from_mr(Measured::new(0.0, 5.0)).unwrap();
        assert_eq!(p, Measured::new(0.0, 0.0));
    }

    #[test]
    fn test_negative_ratio_is_degenerate() {
        assert!(matches!(
            polarization_from_mr(Measured::new(-50.0, 1.0)),
            Err(StatError::Degenerate(_))
        ));
        assert!(matches!(
            polarization_from_mr(Measured::new(-200.0, 1.0)),
            Err(StatError::Degenerate(_))
        ));
    }

    #[test]
    fn test_mr_from_polarization_error() {
        let p1 = Measured::new(0.5, 0.05);
        let p2 = Measured::new(0.25, 0.025);
        let mr = mr_from_polarization(p1, p2).unwrap();

        let tmr = 2.0 * 0.125 / (1.0 - 0.125);
        assert!((mr.value - tmr * 100.0).abs() < 1e-9);
        // relative errors are 0.1 each, doubled
        assert!((mr.err - 0.4 * tmr * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_unit_product_is_degenerate() {
        let one = Measured::new(1.0, 0.1);
        assert!(matches!(
            mr_from_polarization(one, one),
            Err(StatError::Degenerate(_))
        ));
    }

    #[test]
    fn test_zero_polarization_contributes_no_error() {
        let mr = mr_from_polarization(Measured::new(0.0, 0.1), Measured::new(0.5, 0.1)).unwrap();
        assert_eq!(mr, Measured::new(0.0, 0.0));
    }

    #[test]
    fn test_history_class_selection() {
        let lhc = Measured::new(1.0, 0.1);
        let uhc = Measured::new(2.0, 0.2);

        assert_eq!(select_history_class(2.0, 3.0, lhc, uhc), uhc);
        assert_eq!(select_history_class(2.0, -3.0, lhc, uhc), lhc);
        assert_eq!(select_history_class(0.0, 3.0, lhc, uhc), lhc);
        assert_eq!(select_history_class(-2.0, -3.0, lhc, uhc), uhc);
    }
}
