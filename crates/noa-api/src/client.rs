use async_trait::async_trait;
use noa_config::ApiConfig;
use noa_device::DeviceBackend;
use noa_types::Device;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::session::Session;
use crate::types::{RegisterResponse, RemoteDevice, UserProfile};
use crate::{ApiError, Result};

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct OtpResponse {
    #[serde(rename = "OTP", default)]
    otp: Option<String>,
}

/// 后端 REST 客户端
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 登录，返回令牌及其中的用户 ID
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let email = required(email, "Please fill the information.")?;
        let password = required(password, "Please fill the information.")?;

        let request = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "Email": email, "Password": password }));
        let response: LoginResponse = self.execute(request, "login").await?.json().await?;

        let session = Session::from_token(response.token)?;
        info!("Logged in as {}", session.user_id);
        Ok(session)
    }

    /// 注册新用户
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<RegisterResponse> {
        let username = required(username, "Username is required")?;
        let email = required(email, "Email is required")?;
        let password = required(password, "Password is required")?;
        if password != confirm_password {
            return Err(ApiError::validation("Passwords do not match"));
        }

        let request = self.client.post(self.url("/register")).json(&json!({
            "Username": username,
            "Email": email,
            "Password": password,
        }));
        Ok(self.execute(request, "register").await?.json().await?)
    }

    /// 发送验证码，开发环境下后端会回传验证码
    pub async fn send_otp(&self, email: &str) -> Result<Option<String>> {
        let email = required(email, "Email is required")?;

        let request = self
            .client
            .post(self.url("/sendotp"))
            .json(&json!({ "Email": email }));
        let body = self.execute(request, "send otp").await?.text().await?;

        Ok(serde_json::from_str::<OtpResponse>(&body)
            .ok()
            .and_then(|r| r.otp))
    }

    /// 校验 4 位验证码
    pub async fn verify_otp(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
        otp: &str,
    ) -> Result<()> {
        let email = required(email, "Email is required")?;
        let otp = otp.trim();
        if otp.len() != 4 || !otp.chars().all(|c| c.is_ascii_digit()) {
            return Err(ApiError::validation("OTP must be 4 digits"));
        }

        let request = self.client.post(self.url("/verifyotp")).json(&json!({
            "username": username,
            "Email": email,
            "password": hashed_password,
            "otp": otp,
        }));
        self.execute(request, "verify otp").await?;
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = required(email, "Email is required")?;

        let request = self
            .client
            .post(self.url("/forgotpassword"))
            .json(&json!({ "Email": email }));
        self.execute(request, "forgot password").await?;
        Ok(())
    }

    pub async fn fetch_user(&self, user_id: &str) -> Result<UserProfile> {
        let user_id = required(user_id, "User ID is required")?;

        let request = self
            .client
            .post(self.url("/userID"))
            .json(&json!({ "userID": user_id }));
        Ok(self.execute(request, "fetch user").await?.json().await?)
    }

    /// 用户在后端登记的设备
    pub async fn list_devices(&self, user_id: &str) -> Result<Vec<RemoteDevice>> {
        let user_id = required(user_id, "User ID is required")?;

        let request = self
            .client
            .post(self.url("/deviceaddresses"))
            .json(&json!({ "userID": user_id }));
        let body = self.execute(request, "list devices").await?.text().await?;

        // 没有设备时后端返回 null
        let devices: Option<Vec<RemoteDevice>> = serde_json::from_str(&body)?;
        Ok(devices.unwrap_or_default())
    }

    pub async fn register_device(&self, device_address: &str) -> Result<()> {
        let device_address = required(device_address, "Device address is required")?;

        let request = self
            .client
            .post(self.url("/registerdevice"))
            .query(&[("deviceAddress", device_address)]);
        self.execute(request, "register device").await?;
        Ok(())
    }

    pub async fn delete_device(&self, user_id: &str, device_id: &str) -> Result<()> {
        let user_id = required(user_id, "User ID is required")?;
        let device_id = required(device_id, "Device ID is required")?;

        let request = self
            .client
            .delete(self.url("/deletedevice"))
            .json(&json!({ "userID": user_id, "deviceID": device_id }));
        self.execute(request, "delete device").await?;
        Ok(())
    }

    pub async fn change_bookmark(&self, user_id: &str, device_id: &str, bookmark: bool) -> Result<()> {
        let user_id = required(user_id, "User ID is required")?;
        let device_id = required(device_id, "Device ID is required")?;

        let request = self.client.put(self.url("/changebookmark")).json(&json!({
            "userID": user_id,
            "deviceID": device_id,
            "bookmark": bookmark,
        }));
        self.execute(request, "change bookmark").await?;
        Ok(())
    }

    /// 发送请求，非 2xx 转换为 [`ApiError::Backend`]
    async fn execute(&self, request: RequestBuilder, operation: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            debug!(operation, status = status.as_u16(), "Request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = backend_message(status, &body);
        warn!(operation, status = status.as_u16(), "Request failed: {}", message);

        Err(ApiError::Backend {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl DeviceBackend for ApiClient {
    async fn devices(&self, user_id: &str) -> anyhow::Result<Vec<Device>> {
        let devices = self.list_devices(user_id).await?;
        Ok(devices.into_iter().map(Device::from).collect())
    }

    async fn set_bookmark(&self, user_id: &str, device_id: &str, bookmark: bool) -> anyhow::Result<()> {
        Ok(self.change_bookmark(user_id, device_id, bookmark).await?)
    }

    async fn remove_device(&self, user_id: &str, device_id: &str) -> anyhow::Result<()> {
        Ok(self.delete_device(user_id, device_id).await?)
    }
}

fn required<'a>(value: &'a str, message: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(message));
    }
    Ok(value)
}

/// 错误提示：优先取 JSON 中的 `message`，否则用原始文本
fn backend_message(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.trim().is_empty());

    match message {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("Unexpected error occurred.")
            .to_string(),
    }
}
