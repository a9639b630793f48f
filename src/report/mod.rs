//! Summaries of collected hypotheses

use crate::model::HypothesisRecord;
use crate::sampling::DistributionFamily;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-confounder tallies across hypothesis records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfounderTally {
    /// Records proposing this confounder
    pub mentions: usize,
    /// Records ranking it first
    pub top_ranked: usize,
}

/// Aggregate view of a hypothesis file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HypothesisSummary {
    /// Records in the file
    pub total_records: usize,
    /// Records asserting a confounder
    pub with_confounder: usize,
    /// Tallies keyed by confounder name
    pub confounders: BTreeMap<String, ConfounderTally>,
    /// Declared families, normalized to the canonical name when recognized
    pub families: BTreeMap<String, usize>,
}

impl HypothesisSummary {
    /// Summarize a set of hypothesis records
    pub fn from_records(records: &[HypothesisRecord]) -> Self {
        let mut summary = Self {
            total_records: records.len(),
            ..Default::default()
        };

        for record in records {
            if !record.is_confounder {
                continue;
            }
            summary.with_confounder += 1;

            let mut names: Vec<&str> = record
                .confounder_variables
                .iter()
                .map(String::as_str)
                .chain(record.confounder_hypotheses.iter().map(|h| h.confounder.as_str()))
                .collect();
            names.sort_unstable();
            names.dedup();
            for name in names {
                summary.confounders.entry(name.to_string()).or_default().mentions += 1;
            }

            if let Some(top) = record.top_ranked() {
                summary
                    .confounders
                    .entry(top.confounder.clone())
                    .or_default()
                    .top_ranked += 1;
            }

            for prior in &record.probability {
                if let Some(text) = prior.family() {
                    let key = DistributionFamily::recognize(text, false)
                        .map(|m| m.family().to_string())
                        .unwrap_or_else(|| text.trim().to_string());
                    *summary.families.entry(key).or_default() += 1;
                }
            }
        }

        summary
    }

    /// Confounders ordered by mentions, then top-rank count, then name
    pub fn ranked_confounders(&self) -> Vec<(&str, &ConfounderTally)> {
        let mut ranked: Vec<_> = self
            .confounders
            .iter()
            .map(|(name, tally)| (name.as_str(), tally))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.mentions
                .cmp(&a.1.mentions)
                .then(b.1.top_ranked.cmp(&a.1.top_ranked))
                .then(a.0.cmp(b.0))
        });
        ranked
    }

    /// Print the summary in a fixed-width table
    pub fn print(&self) {
        println!("{}", "=".repeat(70));
        println!("   Hypothesis Summary");
        println!("{}", "=".repeat(70));
        println!();
        println!("  Records:              {}", self.total_records);
        println!("  With confounder:      {}", self.with_confounder);
        println!();

        if !self.confounders.is_empty() {
            println!("  {:<40} {:>10} {:>10}", "Confounder", "Mentions", "Top-ranked");
            for (name, tally) in self.ranked_confounders() {
                println!("  {:<40} {:>10} {:>10}", name, tally.mentions, tally.top_ranked);
            }
            println!();
        }

        if !self.families.is_empty() {
            println!("  Distribution families:");
            for (family, count) in &self.families {
                println!("    {:<38} {:>10}", family, count);
            }
            println!();
        }

        println!("{}", "=".repeat(70));
    }
}
