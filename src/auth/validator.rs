// ==========================================
// 校园服务工单系统 - 注册表单校验
// ==========================================
// 职责: 无状态字段校验 (唯一性检查由 AuthApi 查库完成)
// 密码规则: 最小长度 / 非纯数字 / 非常见密码 / 不与用户信息相似
// ==========================================

use crate::auth::error::FieldError;
use crate::domain::types::{Category, Role};
use crate::i18n::{t, t_with_args};
use serde::{Deserialize, Serialize};

pub const USERNAME_MAX_LEN: usize = 150;

/// 相似度阈值（>= 即判定过于相似）
const MAX_SIMILARITY: f64 = 0.7;

/// 常见密码（小写）
const COMMON_PASSWORDS: &[&str] = &[
    "123456", "123456789", "12345678", "password", "qwerty", "qwerty123", "1234567", "111111",
    "1234567890", "123123", "abc123", "password1", "password123", "iloveyou", "000000",
    "qwertyuiop", "1q2w3e4r", "admin", "admin123", "welcome", "welcome1", "monkey", "dragon",
    "letmein", "football", "baseball", "sunshine", "princess", "passw0rd", "master", "shadow",
    "superman", "michael", "trustno1", "654321", "666666", "888888", "987654321", "asdfghjkl",
    "zxcvbnm", "qazwsx", "changeme", "secret", "computer", "internet", "starwars", "whatever",
    "freedom", "hello123", "login",
];

/// 注册表单
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password1: String,
    pub password2: String,
    pub role: Option<Role>,
    /// 仅维修工必填, 其他角色忽略
    pub category: Option<Category>,
}

impl SignupForm {
    /// 维修工保留类别, 其他角色丢弃
    pub fn effective_category(&self) -> Option<Category> {
        match self.role {
            Some(Role::Worker) => self.category,
            _ => None,
        }
    }
}

/// 校验注册表单
///
/// # 返回
/// 所有字段错误（为空表示通过）
pub fn validate_signup_form(form: &SignupForm, min_password_length: usize) -> Vec<FieldError> {
    let mut errors = Vec::new();

    // ===== 用户名 =====
    let username = form.username.trim();
    if username.is_empty() {
        errors.push(FieldError::new("username", t("form.required")));
    } else if username.chars().count() > USERNAME_MAX_LEN {
        errors.push(FieldError::new("username", t("form.username_too_long")));
    } else if !is_valid_username(username) {
        errors.push(FieldError::new("username", t("form.username_invalid")));
    }

    // ===== 邮箱 =====
    let email = form.email.trim();
    if email.is_empty() {
        errors.push(FieldError::new("email", t("form.email_required")));
    } else if !is_valid_email(email) {
        errors.push(FieldError::new("email", t("form.email_invalid")));
    }

    // ===== 密码 =====
    if form.password1.is_empty() {
        errors.push(FieldError::new("password1", t("form.required")));
    }
    if form.password2.is_empty() {
        errors.push(FieldError::new("password2", t("form.required")));
    } else if form.password1 != form.password2 {
        errors.push(FieldError::new("password2", t("form.password_mismatch")));
    } else {
        let attributes = [
            ("username", username),
            ("first name", form.first_name.trim()),
            ("last name", form.last_name.trim()),
            ("email address", email),
        ];
        for message in validate_password(&form.password2, min_password_length, &attributes) {
            errors.push(FieldError::new("password2", message));
        }
    }

    // ===== 角色与类别 =====
    match form.role {
        None => errors.push(FieldError::new("role", t("form.role_required"))),
        Some(Role::Worker) if form.category.is_none() => {
            errors.push(FieldError::new("category", t("form.category_required")))
        }
        Some(_) => {}
    }

    errors
}

/// 用户名字符集: 字母 / 数字 / @ . + - _
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// 邮箱格式校验（local@domain.tld）
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty()
                && !l.starts_with('-')
                && !l.ends_with('-')
                && l.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

/// 密码强度校验
///
/// # 参数
/// - attributes: (字段显示名, 值), 用于相似度检查
pub fn validate_password(
    password: &str,
    min_length: usize,
    attributes: &[(&str, &str)],
) -> Vec<String> {
    let mut messages = Vec::new();

    for (field, value) in attributes {
        if is_too_similar(password, value) {
            messages.push(t_with_args("form.password_similar", &[("field", field)]));
            break;
        }
    }

    if password.chars().count() < min_length {
        messages.push(t_with_args(
            "form.password_too_short",
            &[("min", &min_length.to_string())],
        ));
    }

    if COMMON_PASSWORDS.contains(&password.trim().to_lowercase().as_str()) {
        messages.push(t("form.password_common"));
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        messages.push(t("form.password_numeric"));
    }

    messages
}

/// 密码是否与某个用户属性过于相似
///
/// 属性整体及按非字母数字切分后的各段都参与比较
fn is_too_similar(password: &str, attribute: &str) -> bool {
    if attribute.is_empty() {
        return false;
    }
    let password = password.to_lowercase();
    let attribute = attribute.to_lowercase();

    std::iter::once(attribute.as_str())
        .chain(attribute.split(|c: char| !c.is_alphanumeric()))
        .filter(|part| !part.is_empty())
        .any(|part| similarity(&password, part) >= MAX_SIMILARITY)
}

/// 相似度 = 2 * LCS / (|a| + |b|)
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut curr = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        prev = curr;
    }
    2.0 * prev[b.len()] as f64 / (a.len() + b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> SignupForm {
        SignupForm {
            username: "ana.r".to_string(),
            email: "ana@campus.edu".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Reyes".to_string(),
            password1: "Gr33n-Lantern!".to_string(),
            password2: "Gr33n-Lantern!".to_string(),
            role: Some(Role::Requestee),
            category: None,
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(validate_signup_form(&valid_form(), 8).is_empty());
    }

    #[test]
    fn test_worker_requires_category() {
        let mut form = valid_form();
        form.role = Some(Role::Worker);
        assert_eq!(fields(&validate_signup_form(&form, 8)), vec!["category"]);

        form.category = Some(Category::WaterLeakage);
        assert!(validate_signup_form(&form, 8).is_empty());
        assert_eq!(form.effective_category(), Some(Category::WaterLeakage));
    }

    #[test]
    fn test_requestee_category_ignored() {
        let mut form = valid_form();
        form.category = Some(Category::GarbageCollection);
        assert!(validate_signup_form(&form, 8).is_empty());
        assert_eq!(form.effective_category(), None);
    }

    #[test]
    fn test_missing_fields() {
        let form = SignupForm::default();
        let errors = validate_signup_form(&form, 8);
        let f = fields(&errors);
        assert!(f.contains(&"username"));
        assert!(f.contains(&"email"));
        assert!(f.contains(&"password1"));
        assert!(f.contains(&"password2"));
        assert!(f.contains(&"role"));
    }

    #[test]
    fn test_password_mismatch() {
        let mut form = valid_form();
        form.password2 = "Something-else9".to_string();
        assert_eq!(fields(&validate_signup_form(&form, 8)), vec!["password2"]);
    }

    #[test]
    fn test_password_rules() {
        assert_eq!(validate_password("12345678", 8, &[]).len(), 2); // 常见 + 纯数字
        assert_eq!(validate_password("short", 8, &[]).len(), 1);
        assert_eq!(validate_password("Password", 8, &[]).len(), 1);
        assert!(validate_password("anareyes1", 8, &[("username", "ana.reyes")]).len() >= 1);
        assert!(validate_password("Gr33n-Lantern!", 8, &[("username", "ana")]).is_empty());
    }

    #[test]
    fn test_username_and_email_format() {
        assert!(is_valid_username("worker_01+night@x.y-z"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("semi;colon"));

        assert!(is_valid_email("a.b+tag@sub.campus.edu"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a@localhost"));
        assert!(!is_valid_email("a@@campus.edu"));
        assert!(!is_valid_email("a b@campus.edu"));
    }

    #[test]
    fn test_similarity() {
        assert!((similarity("abc", "abc") - 1.0).abs() < f64::EPSILON);
        assert!(similarity("abcdef", "uvwxyz") < 0.1);
    }
}
