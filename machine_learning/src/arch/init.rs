use comms::specs::machine_learning::InitSpec;
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{MlErr, ParameterSet, Result};

/// Checks that an initialization strategy describes a valid distribution.
///
/// # Returns
/// An `InvalidInit` error if a normal has a non finite mean or a negative or non finite standard
/// deviation.
pub fn check_init(init: InitSpec) -> Result<()> {
    if let InitSpec::Normal { mean, std_dev } = init
        && (!mean.is_finite() || !std_dev.is_finite() || std_dev < 0.0)
    {
        return Err(MlErr::InvalidInit(format!(
            "normal({mean}, {std_dev}) needs a finite mean and a finite, non negative deviation"
        )));
    }

    Ok(())
}

/// Samples the initial parameters of a model with the given layout.
///
/// `LecunUniform` draws every tensor of a layer from `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`, where
/// `fan_in` is the leading dimension of the layer's weight matrix.
///
/// # Arguments
/// * `shapes` - The shape of each tensor of the model.
/// * `init` - The initialization strategy.
/// * `rng` - The random number generator to sample from.
pub(super) fn init_params<R: Rng>(
    shapes: &[Vec<usize>],
    init: InitSpec,
    rng: &mut R,
) -> Result<ParameterSet> {
    check_init(init)?;

    let mut tensors = Vec::with_capacity(shapes.len());
    let mut fan_in = 1;

    for shape in shapes {
        if shape.len() == 2 {
            fan_in = shape[0].max(1);
        }

        let tensor = match init {
            InitSpec::Const { value } => ArrayD::from_elem(IxDyn(shape), value),
            InitSpec::LecunUniform => {
                let bound = 1.0 / (fan_in as f32).sqrt();
                ArrayD::from_shape_simple_fn(IxDyn(shape), || rng.random_range(-bound..=bound))
            }
            InitSpec::Normal { mean, std_dev } => {
                let normal = Normal::new(mean, std_dev)
                    .map_err(|e| MlErr::InvalidInit(format!("normal({mean}, {std_dev}): {e}")))?;
                ArrayD::from_shape_simple_fn(IxDyn(shape), || normal.sample(&mut *rng))
            }
        };

        tensors.push(tensor);
    }

    Ok(ParameterSet::new(tensors))
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn lecun_uniform_respects_fan_in_bound() {
        let shapes = vec![vec![16, 4], vec![4]];
        let mut rng = StdRng::seed_from_u64(1);

        let params = init_params(&shapes, InitSpec::LecunUniform, &mut rng).unwrap();
        assert_eq!(params.shapes(), shapes);
        assert!(params.to_flat().iter().all(|x| x.abs() <= 0.25));
    }

    #[test]
    fn invalid_normal_is_reported() {
        let shapes = vec![vec![2, 2]];
        let init = InitSpec::Normal {
            mean: 0.0,
            std_dev: -1.0,
        };

        let res = init_params(&shapes, init, &mut StdRng::seed_from_u64(0));
        assert!(matches!(res, Err(MlErr::InvalidInit(_))));
    }

    #[test]
    fn non_finite_normals_are_rejected() {
        let nan_mean = InitSpec::Normal {
            mean: f32::NAN,
            std_dev: 1.0,
        };
        let inf_dev = InitSpec::Normal {
            mean: 0.0,
            std_dev: f32::INFINITY,
        };

        assert!(matches!(check_init(nan_mean), Err(MlErr::InvalidInit(_))));
        assert!(matches!(check_init(inf_dev), Err(MlErr::InvalidInit(_))));
        assert!(check_init(InitSpec::Normal { mean: 0.0, std_dev: 0.5 }).is_ok());
    }
}
