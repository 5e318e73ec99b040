use axum::Json;
use serde::Serialize;

pub const GREETING: &str = "Hello world! 👋";

#[derive(Debug, Serialize)]
pub struct Message {
    pub text: &'static str,
}

/// Answers every method with the fixed greeting.
pub async fn hello() -> Json<Message> {
    Json(Message { text: GREETING })
}
