use crate::api::CreateRequestForm;
use crate::app::state::AppState;
use crate::perf::PerfGuard;

use super::common::{authenticate, map_api_error, read_image, to_json};

// ==========================================
// 报修人相关命令
// ==========================================

/// 提交报修（图片从文件读取）
pub fn create_request(
    state: &AppState,
    token: &str,
    form: &CreateRequestForm,
    image_path: &str,
) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.create_request");
    let session = authenticate(state, token, &mut perf)?;
    let image = read_image(state, "request_image", image_path)?;
    let result = state
        .requestee_api
        .create_request(&session, form, &image)
        .map_err(map_api_error)?;
    to_json(&result)
}

pub fn review_request(
    state: &AppState,
    token: &str,
    request_id: i64,
    approve: bool,
    rating: Option<u8>,
) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.review_request").for_request(request_id);
    let session = authenticate(state, token, &mut perf)?;
    let result = state
        .requestee_api
        .review_request(&session, request_id, approve, rating)
        .map_err(map_api_error)?;
    to_json(&result)
}

/// 报修人自己的工单
pub fn list_my_requests(state: &AppState, token: &str) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.list_my_requests");
    let session = authenticate(state, token, &mut perf)?;
    let result = state
        .requestee_api
        .dashboard(&session)
        .map_err(map_api_error)?;
    to_json(&result)
}
