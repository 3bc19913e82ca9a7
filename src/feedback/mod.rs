pub mod client;

pub use client::FeedbackClient;
