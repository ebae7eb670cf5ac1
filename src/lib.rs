pub mod artifacts;
#[cfg(any(feature = "ndarray", feature = "wgpu"))]
pub mod backend;
pub mod convnet;
pub mod optim;
pub mod state;
pub mod training;

pub mod prelude {
    pub use crate::convnet::*;
    pub use crate::optim::*;
    pub use crate::state::*;
}
