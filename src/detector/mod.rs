pub mod classifier;
pub mod outbid;

pub use classifier::{classify, Classification};
pub use outbid::{evaluate, OutbidPolicy};
