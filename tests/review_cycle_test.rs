// ==========================================
// 完工确认 / 驳回 / 评分集成测试
// ==========================================

mod helpers;

use cleanify::domain::{Category, RequestStatus, ReviewDecision};
use helpers::api_test_helper::*;

/// 建立一张已提交完工的工单, 返回 (报修人, 维修工, 工单ID)
fn pending_approval(env: &ApiTestEnv) -> (cleanify::auth::Session, cleanify::auth::Session, i64) {
    let worker = env.worker("plumber1", Category::WaterLeakage);
    let requestee = env.requestee("ana");
    let created = env.file_request(&requestee, Category::WaterLeakage, "Dorm B");
    let request_id = created.request.request.request_id;
    env.complete(&worker, request_id);
    assert_eq!(env.request_status(request_id), RequestStatus::PendingApproval);
    (requestee, worker, request_id)
}

#[test]
fn test_approve_completes_request_and_records_rating() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (ana, worker, request_id) = pending_approval(&env);

    let result = env
        .state
        .requestee_api
        .review_request(&ana, request_id, true, Some(4))
        .expect("确认失败");

    assert_eq!(result.decision, ReviewDecision::Approve);
    assert!(result.reassignment.is_none());
    let request = &result.request.request;
    assert_eq!(request.status, RequestStatus::Completed);
    assert!(request.is_approved_by_requestee);
    assert!(request.approved_at.is_some());
    assert_eq!(request.worker_rating.map(|r| r.value()), Some(4));
    // 完工照片保留
    assert!(request.completion_image.is_some());

    assert_eq!(result.worker_average, Some(4.0));
    assert_eq!(env.average_rating(worker.user_id), Some(4.0));
    assert!(!env.is_busy(worker.user_id));
    assert_eq!(env.count_actions("APPROVE"), 1);
}

#[test]
fn test_reject_resets_request_and_reassigns() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (ana, worker, request_id) = pending_approval(&env);

    let completion = env.completion_image(request_id).expect("应有完工照片");
    assert!(env.media_path(&completion).exists());

    let result = env
        .state
        .requestee_api
        .review_request(&ana, request_id, false, Some(2))
        .expect("驳回失败");

    assert_eq!(result.decision, ReviewDecision::Reject);
    // 唯一空闲的同类别维修工被重新派单
    let reassignment = result.reassignment.expect("驳回后应重新派单");
    assert_eq!(
        reassignment.assigned_worker().map(|(id, _)| id),
        Some(worker.user_id)
    );

    let request = &result.request.request;
    assert_eq!(request.status, RequestStatus::Assigned);
    assert!(!request.is_approved_by_requestee);
    assert!(request.completion_image.is_none());
    assert!(request.approved_at.is_none());
    assert!(!env.media_path(&completion).exists());

    // 驳回评分计入平均分
    assert_eq!(env.average_rating(worker.user_id), Some(2.0));
    assert!(env.is_busy(worker.user_id));
    assert_eq!(env.count_actions("REJECT"), 1);
}

#[test]
fn test_reject_without_free_worker_returns_to_pending() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (ana, worker, request_id) = pending_approval(&env);

    // 维修工接了另一张工单
    let other = env.file_request(&ana, Category::WaterLeakage, "Dorm C");
    assert_eq!(
        other.outcome.assigned_worker().map(|(id, _)| id),
        Some(worker.user_id)
    );

    let result = env
        .state
        .requestee_api
        .review_request(&ana, request_id, false, Some(1))
        .expect("驳回失败");

    assert!(result
        .reassignment
        .as_ref()
        .and_then(|o| o.assigned_worker())
        .is_none());
    assert_eq!(env.request_status(request_id), RequestStatus::Pending);
    assert_eq!(env.assigned_worker(request_id), None);
}

#[test]
fn test_average_rating_spans_all_reviews() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let worker = env.worker("plumber1", Category::WaterLeakage);
    let ana = env.requestee("ana");

    for (location, rating) in [("Room 1", 5u8), ("Room 2", 2u8)] {
        let created = env.file_request(&ana, Category::WaterLeakage, location);
        let request_id = created.request.request.request_id;
        env.complete(&worker, request_id);
        env.state
            .requestee_api
            .review_request(&ana, request_id, true, Some(rating))
            .expect("确认失败");
    }

    assert_eq!(env.average_rating(worker.user_id), Some(3.5));
    let dashboard = env.state.worker_api.dashboard(&worker).unwrap();
    assert_eq!(dashboard.average_rating, Some(3.5));
    assert_eq!(dashboard.completed.len(), 2);
}

#[test]
fn test_review_requires_valid_rating() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (ana, _worker, request_id) = pending_approval(&env);

    for rating in [None, Some(0u8), Some(6u8)] {
        let err = env
            .state
            .requestee_api
            .review_request(&ana, request_id, true, rating)
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
    assert_eq!(env.request_status(request_id), RequestStatus::PendingApproval);
}

#[test]
fn test_review_rejects_foreign_or_wrong_state_request() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (ana, worker, request_id) = pending_approval(&env);
    let bob = env.requestee("bob");

    // 他人的工单
    let err = env
        .state
        .requestee_api
        .review_request(&bob, request_id, true, Some(5))
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    // 维修工不能确认
    let err = env
        .state
        .requestee_api
        .review_request(&worker, request_id, true, Some(5))
        .unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");

    // 已确认的工单不能再次确认
    env.state
        .requestee_api
        .review_request(&ana, request_id, true, Some(5))
        .expect("确认失败");
    let err = env
        .state
        .requestee_api
        .review_request(&ana, request_id, false, Some(1))
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(env.request_status(request_id), RequestStatus::Completed);
}

#[test]
fn test_requestee_dashboard_splits_pending_approval() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (ana, _worker, request_id) = pending_approval(&env);
    env.file_request(&ana, Category::GarbageCollection, "Canteen");

    let dashboard = env.state.requestee_api.dashboard(&ana).unwrap();
    assert_eq!(dashboard.pending_approval.len(), 1);
    assert_eq!(dashboard.pending_approval[0].request.request_id, request_id);
    assert_eq!(dashboard.other.len(), 1);
    assert_eq!(dashboard.other[0].request.status, RequestStatus::Pending);
}

#[test]
fn test_create_request_collects_field_errors() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let ana = env.requestee("ana");

    let form = cleanify::api::CreateRequestForm {
        category: None,
        location: "   ".to_string(),
        description: None,
    };
    let err = env
        .state
        .requestee_api
        .create_request(&ana, &form, b"plain text")
        .unwrap_err();

    match err {
        cleanify::api::ApiError::ValidationError(errors) => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert!(fields.contains(&"location"));
            assert!(fields.contains(&"category"));
            assert!(fields.contains(&"request_image"));
        }
        other => panic!("应返回字段错误, 实际 {:?}", other),
    }
}
