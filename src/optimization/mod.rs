mod adam;
mod gradient_descent;
mod momentum;
mod optim;
mod optimizer;

pub use adam::Adam;
pub use gradient_descent::GradientDescent;
pub use momentum::GradientDescentWithMomentum;
pub use optim::Optim;
pub use optimizer::Optimizer;
