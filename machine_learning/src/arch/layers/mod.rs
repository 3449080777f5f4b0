mod dense;
mod layer;
mod relu;
mod sigmoid;

pub use dense::Dense;
pub use layer::Layer;
pub use relu::Relu;
pub use sigmoid::Sigmoid;
