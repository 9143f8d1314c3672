pub mod environment;
pub mod model_description;
pub mod sdf;

pub use environment::EnvironmentDescription;
pub use model_description::{GeometryType, ModelDescription, Pose, PrimitiveModel, SimulationModel};
