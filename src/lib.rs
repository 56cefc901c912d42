pub mod correction;
pub mod error;
pub mod interpolate;
pub mod locator;
pub mod mesh;
pub mod model;
pub mod parameter;

pub use correction::SemiDynamic;
pub use error::SemidynaError;
pub use mesh::MeshCode;
pub use model::{
    CorrectionDirection, CorrectionResult, CorrectionVector, Epoch, GeodeticPoint, MeshCorner,
    MeshCorners,
};
pub use parameter::{ParameterCache, ParameterStore, ParameterTable};
