pub mod config;
pub mod content;
pub mod device;
pub mod easing;
pub mod host;
pub mod interaction;
pub mod page;
pub mod presets;
pub mod render_loop;
pub mod scene;
pub mod scroll;
pub mod timeline;
pub mod view;

pub use config::{ConfigError, MotionConfig};
pub use device::Environment;
pub use easing::Easing;
pub use host::{FrameRequest, Host, HostError, ListenerId, ManualHost, SurfaceStatus};
pub use page::{MountError, Page};
pub use scroll::{ScrollOptions, ScrollState, SmoothScroll};
pub use view::ViewSpec;
