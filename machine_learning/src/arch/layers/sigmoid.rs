use ndarray::{Array2, ArrayView2, Zip};

/// Sigmoid activation scaled by an amplitude, `amp / (1 + e^-z)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sigmoid {
    amp: f32,
}

impl Sigmoid {
    pub fn new(amp: f32) -> Self {
        Self { amp }
    }

    fn f(&self, z: f32) -> f32 {
        self.amp / (1. + (-z).exp())
    }

    fn df(&self, z: f32) -> f32 {
        let e = (-z).exp();
        (self.amp * e) / (e + 1.).powi(2)
    }

    pub fn forward(&self, x: ArrayView2<f32>) -> Array2<f32> {
        x.mapv(|z| self.f(z))
    }

    pub fn backward(&self, x: ArrayView2<f32>, mut d: Array2<f32>) -> Array2<f32> {
        Zip::from(&mut d)
            .and(&x)
            .for_each(|d, &z| *d *= self.df(z));

        d
    }
}
