mod conv;
mod dense;
mod pooling;

pub use conv::Conv2d;
pub use dense::Dense;
pub use pooling::MaxPool2d;

/// Where a layer sits in the network during the backward pass.
///
/// `Last` consumes the fused loss delta without applying an activation
/// derivative; `First` skips computing the input gradient nothing consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerPosition {
    First,
    Middle,
    Last,
}
