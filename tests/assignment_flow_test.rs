// ==========================================
// 派单 / 补派集成测试
// ==========================================
// 测试范围:
// 1. 提交报修即自动派单（同类别 / 空闲 / 启用）
// 2. 无空闲维修工时保持 Pending
// 3. 维修工注册 / 完工后补派最早待派工单
// 4. 候选列表过期时的重试 / 派单策略 / 忙碌标记校正
// ==========================================

mod helpers;

use cleanify::auth::Session;
use cleanify::config::config_keys;
use cleanify::domain::{Category, RequestStatus};
use cleanify::engine::{AssignmentOutcome, WorkerSelection};
use cleanify::repository::WorkerCandidate;
use helpers::api_test_helper::*;

#[test]
fn test_create_request_assigns_free_worker_of_category() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let plumber = env.worker("plumber1", Category::WaterLeakage);
    let _janitor = env.worker("janitor1", Category::GarbageCollection);
    let ana = env.requestee("ana");

    let result = env.file_request(&ana, Category::WaterLeakage, "Dorm B, room 204");

    match &result.outcome {
        AssignmentOutcome::Assigned {
            worker_id,
            worker_username,
            ..
        } => {
            assert_eq!(*worker_id, plumber.user_id);
            assert_eq!(worker_username, "plumber1");
        }
        other => panic!("应派给同类别维修工, 实际 {:?}", other),
    }
    assert_eq!(result.request.request.status, RequestStatus::Assigned);
    assert!(result.request.request.assigned_at.is_some());
    assert_eq!(result.request.worker_username.as_deref(), Some("plumber1"));
    assert!(env.is_busy(plumber.user_id));

    // 报修图片已落盘
    assert!(env.media_path(&result.request.request.request_image).exists());
    assert_eq!(env.count_actions("AUTO_ASSIGN"), 1);
}

#[test]
fn test_create_request_stays_pending_without_free_worker() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let plumber = env.worker("plumber1", Category::WaterLeakage);
    let ana = env.requestee("ana");

    let first = env.file_request(&ana, Category::WaterLeakage, "Library");
    assert!(first.outcome.assigned_worker().is_some());

    // 唯一的维修工已忙碌
    let second = env.file_request(&ana, Category::WaterLeakage, "Gym");
    assert!(matches!(
        second.outcome,
        AssignmentOutcome::NoWorkerAvailable {
            category: Category::WaterLeakage,
            ..
        }
    ));
    assert_eq!(env.request_status(second.request.request.request_id), RequestStatus::Pending);
    assert_eq!(env.assigned_worker(second.request.request.request_id), None);
    assert!(env.is_busy(plumber.user_id));
    assert_eq!(env.count_actions("NO_WORKER_FREE"), 1);
}

#[test]
fn test_other_category_worker_is_never_auto_assigned() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let electrician = env.worker("sparky", Category::ElectricityIssue);
    let ana = env.requestee("ana");

    let result = env.file_request(&ana, Category::WashroomCleaning, "Block C washroom");

    assert!(result.outcome.assigned_worker().is_none());
    assert!(!env.is_busy(electrician.user_id));
}

#[test]
fn test_worker_signup_picks_up_oldest_pending_request() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let ana = env.requestee("ana");

    let older = env.file_request(&ana, Category::GarbageCollection, "Canteen");
    let _newer = env.file_request(&ana, Category::GarbageCollection, "Parking lot");

    let signup = env.signup("collector", cleanify::Role::Worker, Some(Category::GarbageCollection));

    let outcome = signup.rebalance.expect("注册后应补派");
    assert_eq!(outcome.request_id(), older.request.request.request_id);
    assert_eq!(
        env.assigned_worker(older.request.request.request_id),
        Some(signup.session.user_id)
    );
    assert!(env.is_busy(signup.session.user_id));
}

#[test]
fn test_completion_frees_worker_and_rebalances() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let plumber = env.worker("plumber1", Category::WaterLeakage);
    let ana = env.requestee("ana");

    let first = env.file_request(&ana, Category::WaterLeakage, "Lab 1");
    let waiting = env.file_request(&ana, Category::WaterLeakage, "Lab 2");
    assert!(waiting.outcome.assigned_worker().is_none());

    let done = env
        .state
        .worker_api
        .complete_task(&plumber, first.request.request.request_id, &jpeg_bytes())
        .expect("提交完工失败");

    assert_eq!(done.request.request.status, RequestStatus::PendingApproval);
    let completion = done
        .request
        .request
        .completion_image
        .clone()
        .expect("应保存完工照片");
    assert!(completion.starts_with("completion_images/"));
    assert!(env.media_path(&completion).exists());

    // 完工后立刻接到下一张
    let next = done.next_task.expect("应补派下一张工单");
    assert_eq!(next.request_id(), waiting.request.request.request_id);
    assert_eq!(env.request_status(waiting.request.request.request_id), RequestStatus::Assigned);
    assert!(env.is_busy(plumber.user_id));
}

#[test]
fn test_completion_without_backlog_leaves_worker_free() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let plumber = env.worker("plumber1", Category::WaterLeakage);
    let ana = env.requestee("ana");

    let first = env.file_request(&ana, Category::WaterLeakage, "Lab 1");
    env.complete(&plumber, first.request.request.request_id);

    assert!(!env.is_busy(plumber.user_id));
    let dashboard = env.state.worker_api.dashboard(&plumber).unwrap();
    assert!(dashboard.current_task.is_none());
    assert!(!dashboard.is_busy);
}

#[test]
fn test_complete_task_requires_own_assigned_request() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let plumber = env.worker("plumber1", Category::WaterLeakage);
    let other = env.worker("plumber2", Category::WaterLeakage);
    let ana = env.requestee("ana");

    let request = env.file_request(&ana, Category::WaterLeakage, "Lab 1");
    let request_id = request.request.request.request_id;
    assert_eq!(env.assigned_worker(request_id), Some(plumber.user_id));

    let err = env
        .state
        .worker_api
        .complete_task(&other, request_id, &jpeg_bytes())
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    // 报修人不能调用维修工接口
    let err = env
        .state
        .worker_api
        .complete_task(&ana, request_id, &jpeg_bytes())
        .unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");

    // 非图片内容
    let err = env
        .state
        .worker_api
        .complete_task(&plumber, request_id, b"not an image")
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert_eq!(env.request_status(request_id), RequestStatus::Assigned);
}

#[test]
fn test_deactivated_worker_is_skipped() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let admin = env.admin("root");
    let plumber = env.worker("plumber1", Category::WaterLeakage);
    let backup = env.worker("plumber2", Category::WaterLeakage);
    let ana = env.requestee("ana");

    env.state
        .admin_api
        .set_user_active(&admin, plumber.user_id, false)
        .expect("停用失败");

    let result = env.file_request(&ana, Category::WaterLeakage, "Dorm A");
    assert_eq!(
        result.outcome.assigned_worker().map(|(id, _)| id),
        Some(backup.user_id)
    );
}

// ==========================================
// 派单引擎
// ==========================================

fn candidate(session: &cleanify::auth::Session) -> WorkerCandidate {
    WorkerCandidate {
        user_id: session.user_id,
        username: session.username.clone(),
        last_assigned_at: None,
    }
}

/// 两名维修工均忙碌时提交一张工单, 返回 (维修工1, 维修工2, 报修人, 工单ID)
fn pending_with_busy_workers(env: &ApiTestEnv) -> (Session, Session, Session, i64) {
    let first = env.worker("plumber1", Category::WaterLeakage);
    let second = env.worker("plumber2", Category::WaterLeakage);
    env.set_busy(first.user_id, true);
    env.set_busy(second.user_id, true);
    let ana = env.requestee("ana");
    let created = env.file_request(&ana, Category::WaterLeakage, "Dorm B");
    let request_id = created.request.request.request_id;
    assert_eq!(env.request_status(request_id), RequestStatus::Pending);
    (first, second, ana, request_id)
}

#[test]
fn test_stale_busy_candidate_falls_through_to_next() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (first, second, _ana, request_id) = pending_with_busy_workers(&env);
    env.set_busy(second.user_id, false);

    // 候选列表列出时两人都空闲, 写入时第一位已忙碌
    let outcome = env
        .state
        .assignment_engine
        .assign_to_candidates(
            request_id,
            Category::WaterLeakage,
            WorkerSelection::FirstFree,
            vec![candidate(&first), candidate(&second)],
        )
        .unwrap();

    assert_eq!(outcome.assigned_worker(), Some((second.user_id, "plumber2")));
    assert_eq!(env.assigned_worker(request_id), Some(second.user_id));
    assert_eq!(env.request_status(request_id), RequestStatus::Assigned);
    assert!(env.is_busy(first.user_id));
    assert!(env.is_busy(second.user_id));
}

#[test]
fn test_all_stale_candidates_leave_request_pending() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (first, second, _ana, request_id) = pending_with_busy_workers(&env);
    let before = env.count_actions("NO_WORKER_FREE");

    let outcome = env
        .state
        .assignment_engine
        .assign_to_candidates(
            request_id,
            Category::WaterLeakage,
            WorkerSelection::FirstFree,
            vec![candidate(&first), candidate(&second)],
        )
        .unwrap();

    assert!(matches!(outcome, AssignmentOutcome::NoWorkerAvailable { .. }));
    assert_eq!(env.request_status(request_id), RequestStatus::Pending);
    assert_eq!(env.assigned_worker(request_id), None);
    assert_eq!(env.count_actions("NO_WORKER_FREE"), before + 1);
}

#[test]
fn test_request_taken_meanwhile_is_skipped() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (first, second, _ana, request_id) = pending_with_busy_workers(&env);
    env.set_busy(second.user_id, false);
    env.state
        .assignment_engine
        .assign_request(request_id)
        .unwrap();
    assert_eq!(env.assigned_worker(request_id), Some(second.user_id));

    // 旧候选列表里的维修工此时空闲, 但工单已被派出
    env.set_busy(first.user_id, false);
    let outcome = env
        .state
        .assignment_engine
        .assign_to_candidates(
            request_id,
            Category::WaterLeakage,
            WorkerSelection::FirstFree,
            vec![candidate(&first)],
        )
        .unwrap();

    assert_eq!(
        outcome,
        AssignmentOutcome::Skipped {
            request_id,
            status: RequestStatus::Assigned,
        }
    );
    assert_eq!(env.assigned_worker(request_id), Some(second.user_id));
    assert!(!env.is_busy(first.user_id));

    // 直接对非 Pending 工单派单同样跳过
    let outcome = env.state.assignment_engine.assign_request(request_id).unwrap();
    assert!(matches!(outcome, AssignmentOutcome::Skipped { .. }));
}

#[test]
fn test_longest_idle_prefers_least_recently_assigned() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.config_manager
        .set_global_config_value(config_keys::WORKER_SELECTION, "LONGEST_IDLE")
        .unwrap();
    let first = env.worker("plumber1", Category::WaterLeakage);
    let second = env.worker("plumber2", Category::WaterLeakage);
    let ana = env.requestee("ana");

    // 两人都未派过单, 按 user_id
    let a = env.file_request(&ana, Category::WaterLeakage, "Lab 1");
    let a_id = a.request.request.request_id;
    assert_eq!(env.assigned_worker(a_id), Some(first.user_id));
    env.complete(&first, a_id);

    // 从未派单者优先（FIRST_FREE 会选 plumber1）
    let b = env.file_request(&ana, Category::WaterLeakage, "Lab 2");
    let b_id = b.request.request.request_id;
    assert_eq!(env.assigned_worker(b_id), Some(second.user_id));
    env.complete(&second, b_id);

    // 最近一次派单更早者优先
    let c = env.file_request(&ana, Category::WaterLeakage, "Lab 3");
    assert_eq!(
        c.outcome.assigned_worker().map(|(id, _)| id),
        Some(first.user_id)
    );
}

#[test]
fn test_reconcile_busy_clears_flag_on_non_worker() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let ana = env.requestee("ana");
    env.set_busy(ana.user_id, true);

    let busy = env.state.assignment_engine.reconcile_busy(ana.user_id).unwrap();
    assert!(!busy);
    assert!(!env.is_busy(ana.user_id));
}

#[test]
fn test_reconcile_busy_follows_assigned_requests() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let plumber = env.worker("plumber1", Category::WaterLeakage);
    let ana = env.requestee("ana");
    let engine = &env.state.assignment_engine;

    // 无 Assigned 工单却标记忙碌
    env.set_busy(plumber.user_id, true);
    assert!(!engine.reconcile_busy(plumber.user_id).unwrap());
    assert!(!env.is_busy(plumber.user_id));

    // 有 Assigned 工单却标记空闲
    env.file_request(&ana, Category::WaterLeakage, "Lab 1");
    env.set_busy(plumber.user_id, false);
    assert!(engine.reconcile_busy(plumber.user_id).unwrap());
    assert!(env.is_busy(plumber.user_id));
}
