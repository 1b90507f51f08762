//! Scene graph, camera and the synchronizer that keeps them in step with the view state.

pub mod bounds;
pub mod camera;
pub mod graph;
pub mod helpers;
pub mod instance;
pub mod mesh;
pub mod resources;
pub mod sync;

pub use bounds::Aabb;
pub use camera::{CameraRig, Projection};
pub use graph::{Drawable, Label, Scene};
pub use instance::{ModelInstance, ModelSource};
pub use resources::{GpuResources, ResourceId, ResourceKind};
pub use sync::{AttachOutcome, LoadState, SceneSynchronizer};
