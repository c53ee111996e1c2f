mod evaluate;
mod history;
mod trainer;

pub use evaluate::{Accuracy, evaluate};
pub use history::{LossHistory, LossRecord};
pub use trainer::Trainer;
