use crate::app::state::AppState;
use crate::perf::PerfGuard;

use super::common::{authenticate, map_api_error, read_image, to_json};

// ==========================================
// 维修工相关命令
// ==========================================

pub fn complete_task(
    state: &AppState,
    token: &str,
    request_id: i64,
    image_path: &str,
) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.complete_task").for_request(request_id);
    let session = authenticate(state, token, &mut perf)?;
    let image = read_image(state, "completion_image", image_path)?;
    let result = state
        .worker_api
        .complete_task(&session, request_id, &image)
        .map_err(map_api_error)?;
    to_json(&result)
}
