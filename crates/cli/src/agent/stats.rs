// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Token and cost accumulation across model calls.

use super::model::TokenUsage;

// Per-token prices used when the backend does not report costs.
const INPUT_COST_PER_TOKEN: f64 = 3e-6;
const OUTPUT_COST_PER_TOKEN: f64 = 1.5e-5;
const CACHE_READ_COST_PER_TOKEN: f64 = 3e-7;
const CACHE_WRITE_COST_PER_TOKEN: f64 = 3.75e-6;

/// Accumulator for token usage and costs across a run's model calls.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenCostAccumulator {
    new_input_tokens: u64,
    output_tokens: u64,
    cache_read_tokens: u64,
    cache_write_tokens: u64,

    new_input_cost: f64,
    output_cost: f64,
    cache_read_cost: f64,
    cache_write_cost: f64,

    call_count: u64,
}

impl TokenCostAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in the usage from a single model call.
    pub fn add_usage(&mut self, usage: TokenUsage) {
        self.new_input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.cache_read_tokens += usage.cache_read_tokens;
        self.cache_write_tokens += usage.cache_write_tokens;

        self.new_input_cost += usage.input_tokens as f64 * INPUT_COST_PER_TOKEN;
        self.output_cost += usage.output_tokens as f64 * OUTPUT_COST_PER_TOKEN;
        self.cache_read_cost += usage.cache_read_tokens as f64 * CACHE_READ_COST_PER_TOKEN;
        self.cache_write_cost += usage.cache_write_tokens as f64 * CACHE_WRITE_COST_PER_TOKEN;

        self.call_count += 1;
    }

    /// Reset all accumulated values to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    pub fn total_tokens(&self) -> u64 {
        self.new_input_tokens + self.output_tokens + self.cache_read_tokens + self.cache_write_tokens
    }

    pub fn total_input_cost(&self) -> f64 {
        self.new_input_cost + self.cache_read_cost + self.cache_write_cost
    }

    pub fn total_cost(&self) -> f64 {
        self.total_input_cost() + self.output_cost
    }

    /// What the cached tokens would have cost at the regular input price.
    pub fn cache_savings(&self) -> f64 {
        self.cache_read_tokens as f64 * (INPUT_COST_PER_TOKEN - CACHE_READ_COST_PER_TOKEN)
    }

    /// Cache savings as a percentage of the uncached input cost.
    pub fn cache_savings_percentage(&self) -> f64 {
        if self.cache_read_tokens == 0 {
            return 0.0;
        }
        let savings = self.cache_savings();
        let without_cache = self.total_input_cost() + savings;
        if without_cache > 0.0 {
            savings / without_cache * 100.0
        } else {
            0.0
        }
    }

    /// Structured summary for telemetry and debug logs.
    pub fn summary(&self) -> serde_json::Value {
        if self.call_count == 0 {
            return serde_json::json!({ "message": "no model calls recorded" });
        }
        let mut summary = serde_json::json!({
            "callCount": self.call_count,
            "tokenUsage": {
                "totalTokens": self.total_tokens(),
                "newInputTokens": self.new_input_tokens,
                "outputTokens": self.output_tokens,
                "cacheReadTokens": self.cache_read_tokens,
                "cacheWriteTokens": self.cache_write_tokens,
            },
            "costAnalysis": {
                "totalCost": format!("${:.6}", self.total_cost()),
                "inputCost": format!("${:.6}", self.total_input_cost()),
                "outputCost": format!("${:.6}", self.output_cost),
            },
        });
        if self.cache_read_tokens > 0 {
            summary["cacheSavings"] = serde_json::json!({
                "totalSavings": format!("${:.6}", self.cache_savings()),
                "savingsPercentage": (self.cache_savings_percentage() * 10.0).round() / 10.0,
                "cachedTokensUsed": self.cache_read_tokens,
            });
        }
        summary
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
