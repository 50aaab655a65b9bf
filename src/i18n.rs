// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持英文（默认）和中文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 支持的语言
pub const AVAILABLE_LOCALES: [&str; 2] = ["en", "zh-CN"];

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"en" 或 "zh-CN"）; 未知语言保持不变
///
/// # 返回
/// 是否切换成功
pub fn set_locale(locale: &str) -> bool {
    match AVAILABLE_LOCALES.iter().find(|l| l.eq_ignore_ascii_case(locale.trim())) {
        Some(l) => {
            rust_i18n::set_locale(l);
            true
        }
        None => {
            tracing::warn!(locale, "不支持的语言，保持当前设置");
            false
        }
    }
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use cleanify::i18n::t;
/// let msg = t("common.success");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use cleanify::i18n::t_with_args;
/// let msg = t_with_args("request.assigned", &[("worker", "plumber1")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
