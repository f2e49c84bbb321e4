//! 数据模型模块
//! 身份服务的请求/响应结构

pub mod auth;
