pub mod backend;
pub mod backends;
pub mod device;
pub mod error;
pub mod modelsource;
pub mod session;
pub mod value;

pub use backend::Backend;
pub use backends::OnnxBackend;
pub use device::Device;
pub use error::InferError;
pub use modelsource::ModelSource;
pub use session::Session;
pub use value::TensorValue;
