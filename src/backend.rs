use burn::prelude::*;

#[cfg(feature = "ndarray")]
pub type MainBackend = burn::backend::NdArray<f32, i32>;
#[cfg(all(feature = "wgpu", not(feature = "ndarray")))]
pub type MainBackend = burn::backend::wgpu::Wgpu<f32, i32>;

pub trait MainDevice: Backend {
    fn main_device() -> <Self as Backend>::Device {
        Default::default()
    }
}

impl MainDevice for MainBackend {}

#[cfg(feature = "autodiff")]
pub type MainAutoBackend = burn::backend::Autodiff<MainBackend>;
#[cfg(feature = "autodiff")]
impl MainDevice for MainAutoBackend {}
