use ndarray::{ArrayView1, ArrayView2, Axis};

/// A quality score over a batch of predictions and their class labels.
pub trait Metric {
    fn score(&self, y_pred: ArrayView2<f32>, y: ArrayView1<u32>) -> f32;
}

/// The fraction of samples whose highest scoring output is their label.
#[derive(Debug, Default, Clone, Copy)]
pub struct Accuracy;

impl Metric for Accuracy {
    fn score(&self, y_pred: ArrayView2<f32>, y: ArrayView1<u32>) -> f32 {
        let n = y_pred.nrows();
        if n == 0 {
            return 0.0;
        }

        let hits = y_pred
            .axis_iter(Axis(0))
            .zip(y)
            .filter(|(row, label)| argmax(row.view()) == Some(**label as usize))
            .count();

        hits as f32 / n as f32
    }
}

fn argmax(row: ArrayView1<f32>) -> Option<usize> {
    row.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &z)| match best {
            Some((_, max)) if max >= z => best,
            _ => Some((i, z)),
        })
        .map(|(i, _)| i)
}
