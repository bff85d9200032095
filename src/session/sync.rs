//! 答案写入排队
//!
//! 同一道题同时最多只有一个 `submitAnswer` 在途；在途期间的新状态合并为一个待发快照，
//! 在途请求结束（无论成败）后再发出。这样同一题的写入按发起顺序到达服务端，
//! 最后一次写入一定是本地的最新状态。

use crate::models::{AnswerPayload, QuestionId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct AnswerSync {
    in_flight: HashSet<QuestionId>,
    pending: HashMap<QuestionId, AnswerPayload>,
}

impl AnswerSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一次写入；返回 `Some` 表示应立即发送
    pub fn enqueue(&mut self, payload: AnswerPayload) -> Option<AnswerPayload> {
        if self.in_flight.insert(payload.question_id) {
            Some(payload)
        } else {
            self.pending.insert(payload.question_id, payload);
            None
        }
    }

    /// 某题的在途写入已结束；返回 `Some` 表示需要接着发送的最新快照
    pub fn complete(&mut self, question_id: QuestionId) -> Option<AnswerPayload> {
        match self.pending.remove(&question_id) {
            Some(next) => Some(next),
            None => {
                self.in_flight.remove(&question_id);
                None
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}
