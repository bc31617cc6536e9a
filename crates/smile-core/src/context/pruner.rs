//! History pruning under a fixed token budget
//!
//! Pruning runs in escalating phases and stops as soon as the history fits:
//!
//! 1. trim any message larger than a third of the window, keeping its tail
//! 2. summarize the oldest messages outside the most recent five
//! 3. drop the oldest messages outside the most recent five
//! 4. summarize recent messages, never the final one
//! 5. drop recent messages, never the final one
//! 6. truncate the final message from the top to fit exactly

use super::config::{ContextBudget, MIN_RECENT_MESSAGES};
use super::render::{render_message, summarize_message};
use crate::tokens::{MESSAGE_OVERHEAD_TOKENS, TokenCounter};
use crate::types::ChatMessage;

/// What a pruning pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Reserved tokens plus history tokens after pruning
    pub total_tokens: usize,
    pub trimmed: usize,
    pub summarized: usize,
    pub dropped: usize,
    pub truncated_final: bool,
}

/// Prunes a working copy of the history in place
#[derive(Debug)]
pub struct HistoryPruner<'a> {
    counter: &'a TokenCounter,
    budget: ContextBudget,
}

impl<'a> HistoryPruner<'a> {
    pub fn new(counter: &'a TokenCounter, budget: ContextBudget) -> Self {
        Self { counter, budget }
    }

    fn over_budget(&self, total: usize) -> bool {
        total > self.budget.context_length
    }

    pub fn prune(&self, history: &mut Vec<ChatMessage>) -> PruneReport {
        let mut report = PruneReport {
            total_tokens: self.budget.reserved + self.counter.count_messages(history),
            ..Default::default()
        };

        if !self.over_budget(report.total_tokens) {
            return report;
        }

        self.trim_oversized(history, &mut report);

        let older = history.len().saturating_sub(MIN_RECENT_MESSAGES);
        self.summarize_range(history, 0..older, &mut report);

        while self.over_budget(report.total_tokens) && history.len() > MIN_RECENT_MESSAGES {
            self.drop_oldest(history, &mut report);
        }

        let all_but_last = history.len().saturating_sub(1);
        self.summarize_range(history, 0..all_but_last, &mut report);

        while self.over_budget(report.total_tokens) && history.len() > 1 {
            self.drop_oldest(history, &mut report);
        }

        if self.over_budget(report.total_tokens) {
            if let Some(last) = history.last_mut() {
                self.truncate_final(last, &mut report);
            }
        }

        tracing::debug!(
            total = report.total_tokens,
            ceiling = self.budget.context_length,
            trimmed = report.trimmed,
            summarized = report.summarized,
            dropped = report.dropped,
            truncated_final = report.truncated_final,
            "pruned chat history"
        );

        report
    }

    /// Cap messages that take more than a third of the window.
    ///
    /// Candidates are visited longest-first by rendered length. Each gives up
    /// the smaller of the remaining overage and its own excess over a third.
    fn trim_oversized(&self, history: &mut [ChatMessage], report: &mut PruneReport) {
        let context_length = self.budget.context_length;
        let third = context_length / 3;

        let mut candidates: Vec<(usize, usize, usize)> = history
            .iter()
            .enumerate()
            .filter_map(|(index, message)| {
                let tokens = self.counter.count_message_content(message);
                (tokens * 3 > context_length)
                    .then(|| (index, tokens, render_message(message).chars().count()))
            })
            .collect();
        candidates.sort_by(|a, b| b.2.cmp(&a.2));

        for (index, tokens, _) in candidates {
            if !self.over_budget(report.total_tokens) {
                break;
            }
            let overage = report.total_tokens - context_length;
            let delta = overage.min(tokens - third);

            let message = &mut history[index];
            let trimmed = self.fit_from_top(&render_message(message), tokens - delta);
            let new_tokens = self.counter.count_text(&trimmed);
            message.set_text(trimmed);

            report.total_tokens = report.total_tokens - tokens + new_tokens;
            report.trimmed += 1;
        }
    }

    /// Summarize messages in `range`, oldest first, until the history fits
    fn summarize_range(
        &self,
        history: &mut [ChatMessage],
        range: std::ops::Range<usize>,
        report: &mut PruneReport,
    ) {
        for index in range {
            if !self.over_budget(report.total_tokens) {
                break;
            }
            let message = &mut history[index];
            let before = self.counter.count_message_content(message);
            let summary = summarize_message(message);
            let after = self.counter.count_text(&summary);
            // Short messages would grow by the ellipsis
            if after >= before {
                continue;
            }
            message.set_text(summary);
            report.total_tokens -= before - after;
            report.summarized += 1;
        }
    }

    fn drop_oldest(&self, history: &mut Vec<ChatMessage>, report: &mut PruneReport) {
        let removed = history.remove(0);
        report.total_tokens -= self.counter.count_message(&removed);
        report.dropped += 1;
    }

    /// Keep the most recent tokens of the last message that still fit
    fn truncate_final(&self, message: &mut ChatMessage, report: &mut PruneReport) {
        let before = self.counter.count_message_content(message);
        let room = self
            .budget
            .history_tokens()
            .saturating_sub(MESSAGE_OVERHEAD_TOKENS);

        let truncated = self.fit_from_top(&render_message(message), room);
        let after = self.counter.count_text(&truncated);
        message.set_text(truncated);

        report.total_tokens = report.total_tokens - before + after;
        report.truncated_final = true;
    }

    /// Keep the tail of `text` within `max_tokens`.
    ///
    /// Re-encoding a decoded slice can tokenize differently at the cut, so the
    /// limit is tightened until the result really fits.
    fn fit_from_top(&self, text: &str, max_tokens: usize) -> String {
        let mut limit = max_tokens;
        loop {
            let candidate = self.counter.prune_from_top(text, limit);
            if limit == 0 || self.counter.count_text(&candidate) <= max_tokens {
                return candidate;
            }
            limit -= 1;
        }
    }
}
