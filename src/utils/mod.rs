//! 日志初始化与参数校验等通用工具

pub mod logger;
pub mod validator;
