use async_trait::async_trait;

/// 推送消息处理器
///
/// 每条消息处理完成后才会投递下一条。
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// 处理一条文本消息
    async fn on_message(&self, text: &str);

    /// 处理器名称（日志用）
    fn name(&self) -> &str;
}
