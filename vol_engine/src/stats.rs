/// stats.rs — Small statistical helpers shared by the estimators.
///
///   mean      x̄ = Σx / n
///   std_dev   s = √( Σ(x − x̄)² / (n − 1) )      (sample, Bessel-corrected)
///
/// Both return `None` on inputs too short to define the statistic so the
/// caller decides what an empty window means.

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let m = data.iter().sum::<f64>() / data.len() as f64;
    let var = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    Some(var.sqrt())
}

/// Population variance (denominator n).  Used to seed the GARCH optimiser.
pub fn variance(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    Some(data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn std_dev_sample() {
        // values 2,4,4,4,5,5,7,9 → sample var = 32/7
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let s = std_dev(&data).unwrap();
        assert!((s - (32.0f64 / 7.0).sqrt()).abs() < 1e-12, "s = {s}");
        assert_eq!(std_dev(&[1.0]), None);
    }

    #[test]
    fn population_variance() {
        let v = variance(&[1.0, 3.0]).unwrap();
        assert!((v - 1.0).abs() < 1e-12);
    }
}
