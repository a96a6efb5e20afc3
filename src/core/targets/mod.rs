pub mod matrix;

pub use matrix::{
    available_targets, Configuration, HostPlatform, Target, TargetPlatform, TargetRole,
};
