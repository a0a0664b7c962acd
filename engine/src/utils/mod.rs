//! 工具模块
//!
//! - logger: 日志系统初始化
//! - clock: 可注入的时钟,凭证过期判断使用

pub mod clock;
pub mod logger;

pub use clock::{Clock, ManualClock, SystemClock};
