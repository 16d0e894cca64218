//! # Shard Planner Module / 分片规划模块
//!
//! This module decides which suites a sharded CI worker runs. Suites are
//! ranked by name, so every worker computes the same partition no matter
//! the order suites were declared or discovered in.
//!
//! 此模块决定分片 CI 节点运行哪些套件。套件按名称排序，
//! 因此无论声明顺序如何，每个节点都会计算出相同的划分。

use std::sync::Arc;

use crate::core::config::ShardAssignment;
use crate::core::registry::TestSuite;

/// Represents the suites one invocation will run.
#[derive(Debug)]
pub struct ExecutionPlan {
    /// The suites to run, in their original order.
    pub suites_to_run: Vec<Arc<TestSuite>>,
    /// Names of the suites assigned to other shards.
    pub sharded_out: Vec<String>,
    /// Whether the suites are distributed across multiple shards (CI environment).
    pub is_distributed: bool,
}

/// Marks which of `names` belong to shard `index` of `count`.
///
/// The names are ranked in sorted order and the name at 1-based rank `i`
/// is selected iff `index mod count == i mod count`. A `count` of zero
/// selects everything. The returned flags follow the input order.
pub fn shard_mask<S: AsRef<str>>(names: &[S], index: usize, count: usize) -> Vec<bool> {
    let shard = ShardAssignment::new(index, count);
    if !shard.is_active() {
        return vec![true; names.len()];
    }

    let mut ranked: Vec<usize> = (0..names.len()).collect();
    ranked.sort_by(|&a, &b| names[a].as_ref().cmp(names[b].as_ref()).then(a.cmp(&b)));

    let mut mask = vec![false; names.len()];
    for (rank, &original) in ranked.iter().enumerate() {
        mask[original] = shard.includes(rank + 1);
    }
    mask
}

/// The suites of shard `index` of `count`, keeping their input order.
pub fn select(suites: &[Arc<TestSuite>], index: usize, count: usize) -> Vec<Arc<TestSuite>> {
    let names: Vec<&str> = suites.iter().map(|suite| suite.name.as_str()).collect();
    shard_mask(&names, index, count)
        .into_iter()
        .zip(suites)
        .filter(|(selected, _)| *selected)
        .map(|(_, suite)| Arc::clone(suite))
        .collect()
}

/// Creates an execution plan for the eligible suites.
///
/// # Arguments
/// * `suites` - The suites that survived name, WIP and autoreload filtering
/// * `shard` - Optional shard assignment for distributed execution
///
/// # Returns
/// An `ExecutionPlan` with the selected suites and the ones left to other shards
pub fn plan_execution(suites: Vec<Arc<TestSuite>>, shard: Option<ShardAssignment>) -> ExecutionPlan {
    let Some(shard) = shard.filter(ShardAssignment::is_active) else {
        return ExecutionPlan {
            suites_to_run: suites,
            sharded_out: Vec::new(),
            is_distributed: false,
        };
    };

    let names: Vec<&str> = suites.iter().map(|suite| suite.name.as_str()).collect();
    let mask = shard_mask(&names, shard.index, shard.count);

    let (selected, rejected): (Vec<_>, Vec<_>) = suites
        .iter()
        .zip(mask)
        .partition(|(_, selected)| *selected);

    tracing::debug!(
        index = shard.index,
        count = shard.count,
        selected = selected.len(),
        total = suites.len(),
        "planned shard"
    );

    ExecutionPlan {
        suites_to_run: selected.into_iter().map(|(suite, _)| Arc::clone(suite)).collect(),
        sharded_out: rejected.into_iter().map(|(suite, _)| suite.name.clone()).collect(),
        is_distributed: true,
    }
}
