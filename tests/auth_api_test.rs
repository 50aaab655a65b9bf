// ==========================================
// AuthApi 集成测试
// ==========================================
// 测试范围: 注册校验 / 登录 / 登出 / 会话解析 / 权限
// ==========================================

mod helpers;

use cleanify::api::ApiError;
use cleanify::auth::DashboardKind;
use cleanify::domain::{Category, Role};
use helpers::api_test_helper::*;

fn field_names(err: ApiError) -> Vec<String> {
    match err {
        ApiError::ValidationError(errors) => errors.into_iter().map(|e| e.field).collect(),
        other => panic!("应返回字段错误, 实际 {:?}", other),
    }
}

#[test]
fn test_signup_creates_profile_and_session() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let result = env.signup("plumber1", Role::Worker, Some(Category::WaterLeakage));
    assert_eq!(result.dashboard, DashboardKind::Worker);
    assert!(result.rebalance.is_none());

    let user = env.state.auth_api.whoami(&result.session.token).unwrap();
    assert_eq!(user.account.username, "plumber1");
    assert!(user.account.is_active);
    assert!(!user.account.is_staff);
    assert_eq!(user.profile.role, Role::Worker);
    assert_eq!(user.profile.category, Some(Category::WaterLeakage));
    assert!(!user.profile.is_busy);
    assert!(user.profile.average_rating.is_none());
    // 明文密码不入库
    assert_ne!(user.account.password_hash, TEST_PASSWORD);
    assert_eq!(env.count_actions("SIGNUP"), 1);
}

#[test]
fn test_requestee_signup_ignores_category() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let result = env.signup("ana", Role::Requestee, Some(Category::WaterLeakage));
    assert_eq!(result.dashboard, DashboardKind::Requestee);

    let user = env.state.auth_api.whoami(&result.session.token).unwrap();
    assert_eq!(user.profile.category, None);
}

#[test]
fn test_signup_reports_all_field_errors() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let mut form = ApiTestEnv::signup_form("bad user!", Role::Worker, None);
    form.email = "not-an-email".to_string();
    form.password2 = "Different-Lamp-42".to_string();

    let fields = field_names(env.state.auth_api.signup(&form).unwrap_err());
    assert!(fields.contains(&"username".to_string()));
    assert!(fields.contains(&"email".to_string()));
    assert!(fields.contains(&"password2".to_string()));
    assert!(fields.contains(&"category".to_string()));
    assert_eq!(env.count_actions("SIGNUP"), 0);
}

#[test]
fn test_signup_rejects_weak_passwords() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    for weak in ["short1", "password123", "12345678901", "ana.campus"] {
        let mut form = ApiTestEnv::signup_form("ana.campus", Role::Requestee, None);
        form.password1 = weak.to_string();
        form.password2 = weak.to_string();
        let fields = field_names(env.state.auth_api.signup(&form).unwrap_err());
        assert!(!fields.is_empty(), "密码 {} 应被拒绝", weak);
        assert!(fields.iter().all(|f| f == "password2"));
    }
}

#[test]
fn test_signup_rejects_duplicate_username_and_email() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.requestee("ana");

    let form = ApiTestEnv::signup_form("ana", Role::Requestee, None);
    let fields = field_names(env.state.auth_api.signup(&form).unwrap_err());
    assert!(fields.contains(&"username".to_string()));
    assert!(fields.contains(&"email".to_string()));

    // 邮箱大小写不敏感
    let mut form = ApiTestEnv::signup_form("ana2", Role::Requestee, None);
    form.email = "ANA@campus.edu".to_string();
    let fields = field_names(env.state.auth_api.signup(&form).unwrap_err());
    assert_eq!(fields, vec!["email".to_string()]);
}

#[test]
fn test_login_failures_are_uniform() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let admin = env.admin("root");
    let ana = env.requestee("ana");

    let wrong_password = env.state.auth_api.login("ana", "Wrong-Lamp-42").unwrap_err();
    let unknown_user = env.state.auth_api.login("nobody", TEST_PASSWORD).unwrap_err();
    assert_eq!(wrong_password.code(), "INVALID_CREDENTIALS");
    assert_eq!(unknown_user.code(), "INVALID_CREDENTIALS");
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());

    env.state
        .admin_api
        .set_user_active(&admin, ana.user_id, false)
        .unwrap();
    let inactive = env.state.auth_api.login("ana", TEST_PASSWORD).unwrap_err();
    assert_eq!(inactive.code(), "INVALID_CREDENTIALS");
}

#[test]
fn test_login_routes_to_dashboard_by_role() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.requestee("ana");
    env.worker("plumber1", Category::WaterLeakage);
    env.admin("root");

    let cases = [
        ("ana", DashboardKind::Requestee),
        ("plumber1", DashboardKind::Worker),
        ("root", DashboardKind::Admin),
    ];
    for (username, expected) in cases {
        let result = env.state.auth_api.login(username, TEST_PASSWORD).unwrap();
        assert_eq!(result.dashboard, expected, "{} 的工作台", username);
    }
}

#[test]
fn test_logout_invalidates_token() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let ana = env.requestee("ana");

    assert!(env.state.auth_api.authenticate(&ana.token).is_ok());
    env.state.auth_api.logout(&ana.token).unwrap();

    let err = env.state.auth_api.authenticate(&ana.token).unwrap_err();
    assert_eq!(err.code(), "UNAUTHENTICATED");
    // 重复登出同样成功
    assert!(env.state.auth_api.logout(&ana.token).is_ok());
}

#[test]
fn test_expired_session_is_rejected_and_removed() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let ana = env.requestee("ana");
    assert_eq!(env.session_count(ana.user_id), 1);

    env.expire_session(&ana.token);

    let err = env.state.auth_api.authenticate(&ana.token).unwrap_err();
    assert_eq!(err.code(), "UNAUTHENTICATED");
    assert_eq!(env.session_count(ana.user_id), 0);
}

#[test]
fn test_authenticate_rejects_garbage_tokens() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    for token in ["", "   ", "not-a-token"] {
        let err = env.state.auth_api.authenticate(token).unwrap_err();
        assert_eq!(err.code(), "UNAUTHENTICATED");
    }
}

#[test]
fn test_role_guards() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let ana = env.requestee("ana");
    let plumber = env.worker("plumber1", Category::WaterLeakage);

    assert_eq!(
        env.state.worker_api.dashboard(&ana).unwrap_err().code(),
        "PERMISSION_DENIED"
    );
    assert_eq!(
        env.state.requestee_api.dashboard(&plumber).unwrap_err().code(),
        "PERMISSION_DENIED"
    );
    assert_eq!(
        env.state.admin_api.dashboard(&ana).unwrap_err().code(),
        "PERMISSION_DENIED"
    );
    assert_eq!(
        env.state.config_api.list_configs(&plumber).unwrap_err().code(),
        "PERMISSION_DENIED"
    );
}

#[test]
fn test_create_admin_validates_input() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.admin("root");

    let err = env
        .state
        .auth_api
        .create_admin("root", "other@campus.edu", TEST_PASSWORD)
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let err = env
        .state
        .auth_api
        .create_admin("root2", "root2@campus.edu", "123")
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}
