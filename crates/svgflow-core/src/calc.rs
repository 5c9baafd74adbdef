use crate::model::Calculation;

/// Reduces a series to one scalar. Every method yields `0` for an empty series.
pub fn calculate_value(values: &[f64], method: Calculation) -> f64 {
    let (Some(first), Some(last)) = (values.first(), values.last()) else {
        return 0.0;
    };
    match method {
        Calculation::Last => *last,
        Calculation::Total => values.iter().sum(),
        Calculation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Calculation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Calculation::Count => values.len() as f64,
        Calculation::Delta => last - first,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Calculation; 6] = [
        Calculation::Last,
        Calculation::Total,
        Calculation::Max,
        Calculation::Min,
        Calculation::Count,
        Calculation::Delta,
    ];

    #[test]
    fn empty_series_is_zero() {
        for m in ALL {
            assert_eq!(calculate_value(&[], m), 0.0, "{m:?}");
        }
    }

    #[test]
    fn reduces_small_series() {
        let v = [1.0, 2.0, 3.0];
        assert_eq!(calculate_value(&v, Calculation::Delta), 2.0);
        assert_eq!(calculate_value(&v, Calculation::Total), 6.0);
        assert_eq!(calculate_value(&v, Calculation::Max), 3.0);
        assert_eq!(calculate_value(&v, Calculation::Min), 1.0);
        assert_eq!(calculate_value(&v, Calculation::Count), 3.0);
        assert_eq!(calculate_value(&v, Calculation::Last), 3.0);
    }

    #[test]
    fn delta_can_be_negative() {
        assert_eq!(calculate_value(&[5.0, 1.0, 2.0], Calculation::Delta), -3.0);
    }
}
