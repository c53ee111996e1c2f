pub mod dataset;
pub mod mnist;

pub use dataset::Dataset;
pub use mnist::MnistData;
