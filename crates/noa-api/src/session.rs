use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::Result;

/// 登录令牌中的声明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userID")]
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// 登录会话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// 从令牌解析会话
    ///
    /// 只读取声明，不校验签名；签名由后端负责。
    pub fn from_token(token: impl Into<String>) -> Result<Self> {
        let token = token.into();

        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(&token, &DecodingKey::from_secret(&[]), &validation)?;
        let expires_at = data
            .claims
            .exp
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single());

        Ok(Self {
            token,
            user_id: data.claims.user_id,
            expires_at,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}
