//! Basic-query gate.
//!
//! Decides whether a query can go straight to retrieval or needs the
//! transformer chain. The model must answer with one of two literals.

use crate::runner::PromptRunner;
use ragoon_core::config::ControllerFallback;
use ragoon_core::{AppError, AppResult};
use ragoon_prompt::{builtin, vars};
use std::sync::Arc;

const BASIC: &str = "True";
const NEEDS_TRANSFORM: &str = "False";

pub struct Controller {
    runner: Arc<PromptRunner>,
    on_unexpected: ControllerFallback,
}

impl Controller {
    pub fn new(runner: Arc<PromptRunner>, on_unexpected: ControllerFallback) -> Self {
        Self {
            runner,
            on_unexpected,
        }
    }

    /// Classify `query`. Single shot, never retried.
    ///
    /// # Errors
    /// Returns `AppError::Protocol` when the reply is neither `True` nor
    /// `False` and the fallback policy is `fail`. Completion failures are
    /// propagated.
    pub async fn is_basic_query(&self, query: &str) -> AppResult<bool> {
        let reply = self
            .runner
            .run(builtin::CONTROLLER, &vars([("query", query.to_string())]))
            .await?;

        self.interpret(&reply)
    }

    fn interpret(&self, reply: &str) -> AppResult<bool> {
        match reply.trim() {
            BASIC => Ok(true),
            NEEDS_TRANSFORM => Ok(false),
            other => match self.on_unexpected {
                ControllerFallback::Fail => Err(AppError::Protocol(format!(
                    "controller replied {:?}, expected \"{}\" or \"{}\"",
                    other, BASIC, NEEDS_TRANSFORM
                ))),
                ControllerFallback::Transform => {
                    tracing::warn!(
                        "Controller replied {:?}; treating query as non-basic",
                        other
                    );
                    Ok(false)
                }
            },
        }
    }
}
