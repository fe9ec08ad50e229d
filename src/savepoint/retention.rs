//! Grandfather-father-son retention planning.
//!
//! Classification is derived, never stored: every pass regroups the
//! artifacts by (instance, target), sorts each group newest-first, and
//! rebuilds the bucket assignment from scratch. The single most recent
//! artifact in each group is always kept, even under an all-zero policy.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::model::Artifact;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionPolicy {
    #[serde(default = "default_daily")]
    pub daily: usize,
    #[serde(default = "default_weekly")]
    pub weekly: usize,
    #[serde(default = "default_monthly")]
    pub monthly: usize,
}

fn default_daily() -> usize {
    7
}
fn default_weekly() -> usize {
    4
}
fn default_monthly() -> usize {
    6
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            daily: default_daily(),
            weekly: default_weekly(),
            monthly: default_monthly(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Daily,
    Weekly,
    Monthly,
    /// Kept only by the most-recent safety rule.
    MostRecent,
}

#[derive(Debug)]
pub struct Keeper {
    pub artifact: Artifact,
    pub bucket: Bucket,
}

#[derive(Debug, Default)]
pub struct RetentionPlan {
    pub keep: Vec<Keeper>,
    pub delete: Vec<Artifact>,
}

/// Compute the GFS keep/delete split for a set of artifacts.
///
/// Within each (instance, target) group, newest-first: the first
/// `daily` artifacts are daily keepers; among the remainder, the newest
/// artifact of each distinct ISO week fills up to `weekly` slots; among
/// what is still left, the newest of each distinct calendar month fills
/// up to `monthly` slots. Everything else is deletable.
pub fn plan(artifacts: &[Artifact], policy: &RetentionPolicy) -> RetentionPlan {
    let mut groups: BTreeMap<(String, String), Vec<&Artifact>> = BTreeMap::new();
    for artifact in artifacts {
        groups
            .entry((artifact.instance_id.clone(), artifact.target.clone()))
            .or_default()
            .push(artifact);
    }

    let mut plan = RetentionPlan::default();

    for (_, mut group) in groups {
        group.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        plan_group(&group, policy, &mut plan);
    }

    plan
}

fn plan_group(group: &[&Artifact], policy: &RetentionPolicy, plan: &mut RetentionPlan) {
    let mut remainder: Vec<&Artifact> = Vec::new();

    for (i, artifact) in group.iter().enumerate() {
        if i < policy.daily {
            plan.keep.push(Keeper {
                artifact: (*artifact).clone(),
                bucket: Bucket::Daily,
            });
        } else {
            remainder.push(artifact);
        }
    }

    let mut weekly_seen: HashSet<(i32, u32)> = HashSet::new();
    let mut weekly_kept = 0;
    let mut after_weekly: Vec<&Artifact> = Vec::new();

    for artifact in remainder {
        let week = artifact.created_at.iso_week();
        let key = (week.year(), week.week());
        if weekly_kept < policy.weekly && weekly_seen.insert(key) {
            weekly_kept += 1;
            plan.keep.push(Keeper {
                artifact: artifact.clone(),
                bucket: Bucket::Weekly,
            });
        } else {
            after_weekly.push(artifact);
        }
    }

    let mut monthly_seen: HashSet<(i32, u32)> = HashSet::new();
    let mut monthly_kept = 0;

    for artifact in after_weekly {
        let key = (artifact.created_at.year(), artifact.created_at.month());
        if monthly_kept < policy.monthly && monthly_seen.insert(key) {
            monthly_kept += 1;
            plan.keep.push(Keeper {
                artifact: artifact.clone(),
                bucket: Bucket::Monthly,
            });
        } else {
            plan.delete.push(artifact.clone());
        }
    }

    // Safety rule: the newest artifact in the group survives any policy,
    // including all-zero bucket counts.
    if let Some(newest) = group.first() {
        let newest_path = &newest.storage_path;
        if let Some(pos) = plan
            .delete
            .iter()
            .position(|a| &a.storage_path == newest_path)
        {
            let artifact = plan.delete.remove(pos);
            plan.keep.push(Keeper {
                artifact,
                bucket: Bucket::MostRecent,
            });
        }
    }
}
