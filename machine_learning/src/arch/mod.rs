mod init;
pub mod layers;
pub mod loss;
pub mod metric;
mod model;
mod sequential;

pub use init::check_init;
pub use model::Model;
pub use sequential::Sequential;
