pub mod commands;
pub mod device;
pub mod input;
pub mod property;
pub mod scene;
pub mod target;
pub mod types;

pub use commands::{CardPlacement, RenderCommand};
pub use device::{DeviceProfile, DeviceTier};
pub use input::{InputEvent, InputKind, PointerPhase};
pub use property::{Layer, Property};
pub use scene::{PostProcessing, SceneParams};
pub use target::TargetId;
pub use types::{Color, ElementGeometry, Vec3, Viewport};
