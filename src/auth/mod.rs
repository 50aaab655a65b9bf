// ==========================================
// 校园服务工单系统 - 认证层
// ==========================================
// 职责: 密码哈希 / 注册表单校验 / 会话与角色守卫
// ==========================================

pub mod error;
pub mod password;
pub mod session;
pub mod validator;

pub use error::{AuthError, AuthResult, FieldError};
pub use password::{hash_password, verify_password};
pub use session::{generate_token, DashboardKind, Session};
pub use validator::{validate_signup_form, SignupForm};
