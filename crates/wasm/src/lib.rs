use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use folio_core::content::{ContentItem, check_unique, sample_projects};
use folio_core::{Environment, FrameRequest, MotionConfig, Page, SurfaceStatus, ViewSpec, presets};
use folio_protocol::{ElementGeometry, InputEvent, RenderCommand, TargetId, Viewport};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

mod host;

pub use host::{BridgeHost, HostOp};

static PAGE: Mutex<Option<Page<BridgeHost>>> = Mutex::new(None);

/// Everything JS knows about the page at mount time.
#[derive(Debug, Deserialize)]
struct MountOptions {
    environment: Environment,
    viewport: Viewport,
    document_height: f64,
    layout: HashMap<TargetId, ElementGeometry>,
    /// Partial override of the motion tuning.
    #[serde(default)]
    config: Option<serde_json::Value>,
    /// Gallery items; the bundled samples when absent.
    #[serde(default)]
    content: Option<Vec<ContentItem>>,
    /// Custom views replacing the portfolio's own.
    #[serde(default)]
    views: Option<Vec<ViewSpec>>,
}

/// What JS must undo after a page goes away.
#[derive(Debug, Default, Serialize)]
struct Teardown {
    commands: Vec<RenderCommand>,
    host_ops: Vec<HostOp>,
}

impl Teardown {
    fn of(mut page: Page<BridgeHost>) -> Self {
        let commands = page.unmount();
        let host_ops = page.host_mut().take_ops();
        Self { commands, host_ops }
    }
}

fn js_err(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

fn lock() -> Result<MutexGuard<'static, Option<Page<BridgeHost>>>, JsError> {
    PAGE.lock().map_err(|_| JsError::new("page state poisoned"))
}

fn with_page<T>(f: impl FnOnce(&mut Page<BridgeHost>) -> T) -> Result<T, JsError> {
    let mut page = lock()?;
    let page = page.as_mut().ok_or_else(|| JsError::new("page is not mounted"))?;
    Ok(f(page))
}

/// Mount the page. Any previously mounted page is unmounted first; its
/// teardown is returned as JSON.
#[wasm_bindgen]
pub fn mount(options_json: &str) -> Result<String, JsError> {
    let options: MountOptions = serde_json::from_str(options_json).map_err(js_err)?;
    let config = match options.config {
        Some(value) => MotionConfig::from_json(&value.to_string()).map_err(js_err)?,
        None => MotionConfig::default(),
    };
    // Classified once; the presets and the page share the result.
    let profile = options.environment.classify(&config.device);
    let views = match options.views {
        Some(views) => views,
        None => {
            let content = options.content.unwrap_or_else(sample_projects);
            check_unique(&content).map_err(js_err)?;
            presets::portfolio(&config, &profile, &content).map_err(js_err)?
        }
    };

    let mut slot = lock()?;
    let teardown = slot.take().map(Teardown::of).unwrap_or_default();
    let host = BridgeHost::new(options.viewport, options.document_height, options.layout);
    *slot = Some(Page::mount(host, profile, config, views).map_err(js_err)?);
    serde_json::to_string(&teardown).map_err(js_err)
}

/// Unmount the page. Returns the commands reverting every applied value
/// and the listeners and frame to release. Unmounting twice returns an
/// empty teardown.
#[wasm_bindgen]
pub fn unmount() -> Result<String, JsError> {
    let page = lock()?.take();
    let teardown = page.map(Teardown::of).unwrap_or_default();
    serde_json::to_string(&teardown).map_err(js_err)
}

/// Forward a DOM event, e.g. `{"Wheel":{"delta_y":40}}`.
#[wasm_bindgen]
pub fn dispatch_input(event_json: &str) -> Result<(), JsError> {
    let event: InputEvent = serde_json::from_str(event_json).map_err(js_err)?;
    with_page(|page| {
        if let InputEvent::Resize {
            viewport,
            document_height,
        } = &event
        {
            page.host_mut().resize(*viewport, *document_height);
        }
        page.handle_input(event);
    })
}

/// Replace the measured layout, e.g. after fonts load or a lazy section
/// mounts. Timelines re-measure and late elements attach right away, so
/// their listeners are in the next `take_host_ops`.
#[wasm_bindgen]
pub fn set_layout(layout_json: &str) -> Result<(), JsError> {
    let layout: HashMap<TargetId, ElementGeometry> =
        serde_json::from_str(layout_json).map_err(js_err)?;
    with_page(|page| {
        page.host_mut().set_layout(layout);
        page.relayout()
    })?
    .map_err(js_err)
}

/// Report the state of the 3D canvas. `error` marks it unusable.
#[wasm_bindgen]
pub fn set_surface(ready: bool, error: Option<String>) -> Result<(), JsError> {
    let status = match (ready, error) {
        (_, Some(reason)) => SurfaceStatus::Failed(reason),
        (true, None) => SurfaceStatus::Ready,
        (false, None) => SurfaceStatus::Pending,
    };
    with_page(|page| page.host_mut().set_surface(status))
}

/// Glide to a section, as the navbar links do.
#[wasm_bindgen]
pub fn scroll_to_section(selector: &str) -> Result<bool, JsError> {
    with_page(|page| page.scroll_to_target(&TargetId::new(selector)))
}

/// Run the frame requested as `request_id`, returning render commands as
/// JSON.
#[wasm_bindgen]
pub fn frame(request_id: u64, now_ms: f64) -> Result<String, JsError> {
    let commands = with_page(|page| page.frame(FrameRequest(request_id), now_ms))?;
    serde_json::to_string(&commands).map_err(js_err)
}

/// Drain the listener and frame requests queued since the last call.
#[wasm_bindgen]
pub fn take_host_ops() -> Result<String, JsError> {
    let ops = with_page(|page| page.host_mut().take_ops())?;
    serde_json::to_string(&ops).map_err(js_err)
}
