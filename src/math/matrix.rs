use rand::rngs::StdRng;
use rand::Rng;
use std::f64::consts::PI;
use std::ops::Mul;

/// Dense row-major matrix of `f64` values.
///
/// Shape errors panic: a dimension mismatch here is always a programming
/// bug in the caller, never a recoverable condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows],
        }
    }

    pub fn from_data(data: Vec<Vec<f64>>) -> Matrix {
        let rows = data.len();
        let cols = data[0].len();
        for row in &data {
            assert_eq!(row.len(), cols, "all matrix rows must share one length");
        }
        Matrix { rows, cols, data }
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    /// Both u1 and u2 must be uniform on (0, 1].
    pub(crate) fn standard_normal(rng: &mut StdRng) -> f64 {
        // Draw two independent uniform samples in (0, 1] to avoid log(0).
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// Xavier (Glorot) initialization: samples from N(0, sqrt(1 / cols)).
    ///
    /// Keeps the variance of activations and gradients roughly equal across
    /// sigmoid layers. `cols` is the fan-in of the transformation.
    pub fn xavier(rows: usize, cols: usize, rng: &mut StdRng) -> Matrix {
        let std_dev = (1.0 / cols as f64).sqrt();
        let mut res = Matrix::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                res.data[i][j] = Matrix::standard_normal(rng) * std_dev;
            }
        }
        res
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);

        for i in 0..res.rows {
            for j in 0..res.cols {
                res.data[i][j] = self.data[j][i];
            }
        }

        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect(),
        }
    }

    /// Element-wise (Hadamard) product with a same-shape matrix.
    pub fn hadamard(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(self.rows, rhs.rows, "hadamard: row counts differ");
        assert_eq!(self.cols, rhs.cols, "hadamard: column counts differ");

        let mut res = Matrix::zeros(self.rows, self.cols);
        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[i][j] = self.data[i][j] * rhs.data[i][j];
            }
        }
        res
    }

    /// Copies rows `start..end` into a new matrix.
    pub fn row_slice(&self, start: usize, end: usize) -> Matrix {
        assert!(
            start < end && end <= self.rows,
            "row_slice: range out of bounds"
        );
        Matrix::from_data(self.data[start..end].to_vec())
    }
}

impl Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Self) -> Self::Output {
        if self.cols != rhs.rows {
            panic!("Matrices are of incorrect sizes")
        }

        let mut res = Matrix::zeros(self.rows, rhs.cols);

        for i in 0..res.rows {
            for j in 0..res.cols {
                let mut sum = 0.0;

                for k in 0..self.cols {
                    sum += self.data[i][k] * rhs.data[k][j];
                }

                res.data[i][j] = sum;
            }
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn zeros_has_requested_shape() {
        let m = Matrix::zeros(3, 2);
        assert_eq!(m.rows, 3);
        assert_eq!(m.cols, 2);
        assert!(m.data.iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn product_matches_hand_computation() {
        let a = Matrix::from_data(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let b = Matrix::from_data(vec![vec![5.0, 6.0], vec![7.0, 8.0]]);
        let c = a * b;
        assert_eq!(c.data, vec![vec![19.0, 22.0], vec![43.0, 50.0]]);
    }

    #[test]
    #[should_panic(expected = "incorrect sizes")]
    fn product_rejects_mismatched_shapes() {
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(2, 3);
        let _ = a * b;
    }

    #[test]
    fn transpose_swaps_axes() {
        let m = Matrix::from_data(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let t = m.transpose();
        assert_eq!(t.rows, 3);
        assert_eq!(t.cols, 2);
        assert_eq!(t.data, vec![vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]]);
    }

    #[test]
    fn hadamard_multiplies_elementwise() {
        let a = Matrix::from_data(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let b = Matrix::from_data(vec![vec![2.0, 0.5], vec![-1.0, 2.0]]);
        let h = a.hadamard(&b);
        assert_eq!(h.data, vec![vec![2.0, 1.0], vec![-3.0, 8.0]]);
    }

    #[test]
    fn row_slice_copies_requested_rows() {
        let m = Matrix::from_data(vec![
            vec![0.0, 0.0],
            vec![1.0, 10.0],
            vec![2.0, 20.0],
            vec![3.0, 30.0],
        ]);
        let s = m.row_slice(1, 3);
        assert_eq!(s.rows, 2);
        assert_eq!(s.data, vec![vec![1.0, 10.0], vec![2.0, 20.0]]);
    }

    #[test]
    fn map_applies_function_everywhere() {
        let m = Matrix::from_data(vec![vec![1.0, -2.0]]);
        let doubled = m.map(|x| x * 2.0);
        assert_eq!(doubled.data, vec![vec![2.0, -4.0]]);
    }

    #[test]
    fn xavier_is_deterministic_for_a_fixed_seed() {
        let mut rng_a = StdRng::seed_from_u64(11);
        let mut rng_b = StdRng::seed_from_u64(11);
        let a = Matrix::xavier(4, 3, &mut rng_a);
        let b = Matrix::xavier(4, 3, &mut rng_b);
        assert_eq!(a, b);
        assert_eq!(a.rows, 4);
        assert_eq!(a.cols, 3);
        assert!(a.data.iter().flatten().all(|v| v.is_finite()));
    }
}
