//! Synthetic clustered datasets for evaluation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Points sampled around fixed centers, with the center each came from.
#[derive(Debug, Clone)]
pub struct Blobs {
    pub points: Vec<Vec<f32>>,
    /// Index into the center list, one per point
    pub labels: Vec<usize>,
    pub dimension: usize,
}

impl Blobs {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Indices of the points drawn around `center`.
    pub fn members(&self, center: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == center)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Standard normal sample (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f32 {
    // 1 - u keeps the log argument in (0, 1]
    let u1: f32 = 1.0 - rng.random::<f32>();
    let u2: f32 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

/// Sample `per_center` points around each center with isotropic Gaussian noise.
///
/// Points are laid out center by center: the first `per_center` points belong to
/// center 0, and so on.
///
/// # Arguments
///
/// * `centers` - Blob centers, all of the same dimension
/// * `per_center` - Points per blob
/// * `std_dev` - Standard deviation within each blob
/// * `seed` - Random seed for reproducibility
pub fn gaussian_blobs(centers: &[Vec<f32>], per_center: usize, std_dev: f32, seed: u64) -> Blobs {
    let mut rng = StdRng::seed_from_u64(seed);
    let dimension = centers.first().map_or(0, Vec::len);

    let mut points = Vec::with_capacity(centers.len() * per_center);
    let mut labels = Vec::with_capacity(centers.len() * per_center);
    for (label, center) in centers.iter().enumerate() {
        for _ in 0..per_center {
            points.push(
                center
                    .iter()
                    .map(|&c| c + gaussian(&mut rng) * std_dev)
                    .collect(),
            );
            labels.push(label);
        }
    }

    Blobs {
        points,
        labels,
        dimension,
    }
}

/// `n` random centers in `[0, spread)^dimension`.
pub fn random_centers(n: usize, dimension: usize, spread: f32, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dimension).map(|_| rng.random::<f32>() * spread).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blobs_are_deterministic() {
        let centers = vec![vec![0.0, 0.0], vec![10.0, 10.0]];
        let a = gaussian_blobs(&centers, 5, 0.5, 7);
        let b = gaussian_blobs(&centers, 5, 0.5, 7);
        assert_eq!(a.points, b.points);
        assert_eq!(a.len(), 10);
        assert_eq!(a.members(1), vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn blobs_stay_near_their_center() {
        let centers = vec![vec![0.0, 0.0, 0.0], vec![100.0, 0.0, 0.0]];
        let blobs = gaussian_blobs(&centers, 200, 1.0, 3);
        for (p, &l) in blobs.points.iter().zip(&blobs.labels) {
            let d: f32 = p
                .iter()
                .zip(&centers[l])
                .map(|(x, c)| (x - c).powi(2))
                .sum::<f32>()
                .sqrt();
            // ~8 sigma in 3-D never happens for 400 draws
            assert!(d < 8.0, "point {p:?} too far from center {l}");
        }
    }
}
