// src/agentchat/mod.rs

pub mod agent;
pub mod chat_agent;
pub mod client_wrapper;
pub mod config;
pub mod conversation;
pub mod event;
pub mod function;
pub mod group_chat;
pub mod message;
pub mod pipeline;
pub mod speaker;
pub mod user_proxy;
