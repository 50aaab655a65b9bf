// ==========================================
// 校园服务工单系统 - 密码哈希
// ==========================================
// 算法: PBKDF2-HMAC-SHA256, 随机盐
// 存储: pbkdf2_sha256$<iterations>$<salt>$<base64 hash>
// ==========================================

use crate::auth::error::{AuthError, AuthResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const ALGORITHM: &str = "pbkdf2_sha256";

const SALT_LEN: usize = 22;

type HmacSha256 = Hmac<Sha256>;

/// 单块 PBKDF2 (输出 32 字节)
fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> AuthResult<[u8; 32]> {
    let prf = HmacSha256::new_from_slice(password)
        .map_err(|e| AuthError::MalformedHash(e.to_string()))?;

    let mut mac = prf.clone();
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut u = [0u8; 32];
    u.copy_from_slice(&mac.finalize().into_bytes());
    let mut out = u;

    for _ in 1..iterations {
        let mut mac = prf.clone();
        mac.update(&u);
        u.copy_from_slice(&mac.finalize().into_bytes());
        for (o, b) in out.iter_mut().zip(u.iter()) {
            *o ^= b;
        }
    }
    Ok(out)
}

fn random_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

/// 生成密码哈希
pub fn hash_password(password: &str, iterations: u32) -> AuthResult<String> {
    let iterations = iterations.max(1);
    let salt = random_salt();
    let hash = pbkdf2_sha256(password.as_bytes(), salt.as_bytes(), iterations)?;
    Ok(format!(
        "{}${}${}${}",
        ALGORITHM,
        iterations,
        salt,
        STANDARD.encode(hash)
    ))
}

/// 校验密码
///
/// # 返回
/// - `Ok(false)`: 密码不匹配
/// - `Err(MalformedHash)`: 存储格式无法识别
pub fn verify_password(password: &str, encoded: &str) -> AuthResult<bool> {
    let parts: Vec<&str> = encoded.splitn(4, '$').collect();
    let [algorithm, iterations, salt, expected] = parts.as_slice() else {
        return Err(AuthError::MalformedHash("字段数不足".to_string()));
    };
    if *algorithm != ALGORITHM {
        return Err(AuthError::MalformedHash(format!("不支持的算法: {}", algorithm)));
    }
    let iterations: u32 = iterations
        .parse()
        .map_err(|_| AuthError::MalformedHash(format!("迭代次数非法: {}", iterations)))?;
    let expected = STANDARD
        .decode(expected)
        .map_err(|e| AuthError::MalformedHash(e.to_string()))?;

    let actual = pbkdf2_sha256(password.as_bytes(), salt.as_bytes(), iterations)?;
    // 长度不同时 ct_eq 直接返回 0
    Ok(bool::from(actual.as_slice().ct_eq(expected.as_slice())))
}
