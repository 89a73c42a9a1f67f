//! Decor Assist: interior-design generation jobs and an Arabic furniture chatbot.

pub mod api;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod jobs;
pub mod pipelines;
