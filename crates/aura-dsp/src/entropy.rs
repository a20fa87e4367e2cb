//! Sample entropy
//!
//! Regularity statistic of the cleaned RR series: the negative log of the
//! conditional probability that sequences matching for `m` beats keep
//! matching for `m + 1`. Lower values mean a more regular (often more
//! coherent) rhythm.

/// Sample entropy with embedding dimension `m` and Chebyshev radius
/// `r · SD(x)`.
///
/// Returns `−ln(A/B)`; when either template count is zero the conventional
/// finite fallback `−ln(1/((N−m)(N−m−1)))` is returned instead. A flat or
/// too-short series yields 0.
pub fn sample_entropy(x: &[f64], m: usize, r: f64) -> f64 {
    let n = x.len();
    if n <= m + 2 {
        return 0.0;
    }

    let mean = x.iter().sum::<f64>() / n as f64;
    let var = x.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    let sd = var.sqrt();
    if sd < 1e-12 {
        return 0.0;
    }

    let z: Vec<f64> = x.iter().map(|v| (v - mean) / sd).collect();

    // Count template pairs of length `len` within radius r, over the first
    // N−m templates so the m and m+1 counts are drawn from the same pool.
    let templates = n - m;
    let matches = |len: usize| -> u64 {
        let mut count = 0u64;
        for i in 0..templates {
            for j in (i + 1)..templates {
                if i + len > n || j + len > n {
                    continue;
                }
                let mut within = true;
                for k in 0..len {
                    if (z[i + k] - z[j + k]).abs() > r {
                        within = false;
                        break;
                    }
                }
                if within {
                    count += 1;
                }
            }
        }
        count
    };

    let b = matches(m);
    let a = matches(m + 1);

    if a == 0 || b == 0 {
        let pairs = ((n - m) * (n - m - 1)) as f64;
        return -(1.0 / pairs).ln();
    }
    -((a as f64) / (b as f64)).ln()
}
