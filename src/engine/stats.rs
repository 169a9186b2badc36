//! Summary statistics over a finished step ledger.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::step::finite_or_null;
use crate::domain::{StepType, StrategyStep};

use super::ledger::STRATEGY_COMPLETE;

/// A dated exit or re-entry, with the reason the step carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionPoint {
    pub date: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyStats {
    pub total_loops: u32,
    /// Exits closed at a positive P&L.
    pub successful_loops: u32,
    /// P&L percent reported by the terminal step.
    pub total_profit: f64,
    /// Lowest P&L percent seen on any step.
    pub max_drawdown: f64,
    /// Mean days between a loop's swap and its exit.
    pub average_loop_duration: f64,
    pub average_loop_profit: f64,
    #[serde(serialize_with = "finite_or_null")]
    pub final_health_factor: f64,
    pub exit_points: Vec<DecisionPoint>,
    pub reentry_points: Vec<DecisionPoint>,
}

impl StrategyStats {
    pub fn from_steps(steps: &[StrategyStep]) -> Self {
        let exits: Vec<&StrategyStep> = steps
            .iter()
            .filter(|s| s.step_type == StepType::Exit && s.task != STRATEGY_COMPLETE)
            .collect();

        let mut opened: HashMap<u32, NaiveDate> = HashMap::new();
        for step in steps.iter().filter(|s| s.step_type == StepType::Swap) {
            if let Some(date) = parse_date(&step.date) {
                opened.entry(step.loop_no).or_insert(date);
            }
        }
        let durations: Vec<f64> = exits
            .iter()
            .filter_map(|exit| {
                let start = opened.get(&exit.loop_no)?;
                let end = parse_date(&exit.date)?;
                Some((end - *start).num_days() as f64)
            })
            .collect();
        let exit_profits: Vec<f64> = exits.iter().map(|s| s.profit_loss).collect();

        Self {
            total_loops: steps.iter().map(|s| s.loop_no).max().unwrap_or(0),
            successful_loops: exit_profits.iter().filter(|p| **p > 0.0).count() as u32,
            total_profit: steps.last().map(|s| s.profit_loss).unwrap_or(0.0),
            max_drawdown: steps
                .iter()
                .map(|s| s.profit_loss)
                .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.min(p))))
                .unwrap_or(0.0),
            average_loop_duration: mean(&durations),
            average_loop_profit: mean(&exit_profits),
            final_health_factor: steps
                .last()
                .map(|s| s.health_factor)
                .unwrap_or(f64::INFINITY),
            exit_points: exits.iter().map(|s| decision_point(s)).collect(),
            reentry_points: steps
                .iter()
                .filter(|s| s.step_type == StepType::Reenter)
                .map(decision_point)
                .collect(),
        }
    }
}

fn decision_point(step: &StrategyStep) -> DecisionPoint {
    DecisionPoint {
        date: step.date.clone(),
        reason: step.reason.clone().unwrap_or_default(),
    }
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
