use std::collections::VecDeque;
use std::sync::Mutex;

use crate::{AssistError, AssistRequest, Assistant};

/// Scripted assistant for testing. Pops one reply per call; once the
/// script runs dry every call reports the assistant as unavailable.
pub struct ScriptedAssistant {
    replies: Mutex<VecDeque<Result<String, AssistError>>>,
    requests: Mutex<Vec<AssistRequest>>,
}

impl Default for ScriptedAssistant {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAssistant {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies(replies: Vec<Result<String, AssistError>>) -> Self {
        let s = Self::new();
        s.replies.lock().unwrap().extend(replies);
        s
    }

    pub fn push_reply(&self, reply: Result<String, AssistError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<AssistRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Assistant for ScriptedAssistant {
    fn complete(&self, request: &AssistRequest) -> Result<String, AssistError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AssistError::Unavailable("script exhausted".into())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelTier;

    #[test]
    fn pops_replies_then_unavailable() {
        let a = ScriptedAssistant::with_replies(vec![Ok("one".into()), Err(AssistError::Timeout)]);
        let req = AssistRequest::new("p", ModelTier::Fast, 16);
        assert_eq!(a.complete(&req), Ok("one".into()));
        assert_eq!(a.complete(&req), Err(AssistError::Timeout));
        assert!(matches!(a.complete(&req), Err(AssistError::Unavailable(_))));
        assert_eq!(a.requests().len(), 3);
        assert_eq!(a.requests()[0].prompt, "p");
    }
}
