// Application state for HTTP handlers
use crate::application::scheduler::DashboardHandle;
use crate::infrastructure::svg_surface::FrameStore;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: DashboardHandle,
    pub frames: FrameStore,
}
