/// optimise.rs — Nelder–Mead downhill simplex
///
/// Derivative-free minimiser used for the GARCH likelihood.  Fully
/// deterministic: same objective and start point give the same answer.
///
///   reflection  ρ = 1,   expansion  χ = 2,
///   contraction γ = 0.5, shrink     σ = 0.5
///
/// Converged when the objective spread across the simplex satisfies
///   f_worst − f_best ≤ ftol · (1 + |f_best|)
/// Non-finite objective values are treated as +∞ so infeasible points are
/// simply rejected.

#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

pub fn nelder_mead<F>(f: F, x0: &[f64], max_iter: usize, ftol: f64) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let n = x0.len();
    let eval = |x: &[f64]| {
        let v = f(x);
        if v.is_finite() { v } else { f64::INFINITY }
    };

    // Initial simplex: x0 plus one vertex stepped along each axis
    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    simplex.push((x0.to_vec(), eval(x0)));
    for i in 0..n {
        let mut x = x0.to_vec();
        x[i] += 0.1 * x0[i].abs().max(1.0);
        let fx = eval(&x);
        simplex.push((x, fx));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let f_best = simplex[0].1;
        let f_worst = simplex[n].1;
        if f_best.is_finite() && (f_worst - f_best) <= ftol * (1.0 + f_best.abs()) {
            converged = true;
            break;
        }
        iterations += 1;

        // Centroid of all but the worst vertex
        let mut centroid = vec![0.0; n];
        for (x, _) in &simplex[..n] {
            for (c, xi) in centroid.iter_mut().zip(x) {
                *c += xi / n as f64;
            }
        }
        let worst = simplex[n].0.clone();
        let towards = |t: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&worst)
                .map(|(c, w)| c + t * (c - w))
                .collect()
        };

        let xr = towards(1.0);
        let fr = eval(&xr);

        if fr < f_best {
            let xe = towards(2.0);
            let fe = eval(&xe);
            simplex[n] = if fe < fr { (xe, fe) } else { (xr, fr) };
            continue;
        }
        if fr < simplex[n - 1].1 {
            simplex[n] = (xr, fr);
            continue;
        }

        // Contraction: outside if the reflection beat the worst, else inside
        let (xc, fc, accept) = if fr < f_worst {
            let xc = towards(0.5);
            let fc = eval(&xc);
            (xc, fc, fc <= fr)
        } else {
            let xc = towards(-0.5);
            let fc = eval(&xc);
            (xc, fc, fc < f_worst)
        };
        if accept {
            simplex[n] = (xc, fc);
            continue;
        }

        // Shrink towards the best vertex
        let best = simplex[0].0.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let x: Vec<f64> = best
                .iter()
                .zip(&vertex.0)
                .map(|(b, xi)| b + 0.5 * (xi - b))
                .collect();
            let fx = eval(&x);
            *vertex = (x, fx);
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (x, value) = simplex.swap_remove(0);
    Minimum { x, value, iterations, converged }
}
