//! Fixed user-facing strings.
//!
//! These reach end users directly (students, mostly Chinese speaking), so
//! they never carry error detail.

/// 401 body for a missing, malformed or unverifiable credential.
pub const UNAUTHORIZED: &str = "Unauthorized";

/// 429 body when the provider is rate limiting us.
pub const RATE_LIMITED: &str = "请求太频繁，请稍后再试。";

/// 402 body when the provider account has run out of credit.
pub const QUOTA_EXHAUSTED: &str = "服务额度已用完，请联系管理员。";

/// 500 body for every other failure.
pub const SERVICE_UNAVAILABLE: &str = "AI服务暂时不可用";

/// Shown in the conversation when a send fails before or during streaming.
pub const APOLOGY: &str = "抱歉，我暂时无法回复。请稍后再试。";

/// Shown in the conversation when there is no signed-in session.
pub const SIGN_IN_REQUIRED: &str = "请先登录后再使用AI助教功能。";
