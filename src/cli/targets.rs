// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Splitting positional arguments into node names and selectors

use anyhow::{Context, Result, bail};

use crate::query::{LabelSelector, QueryTargets};

/// An argument containing `=` or a space is a label selector, anything else
/// is a node name
pub fn parse_targets(args: &[String]) -> Result<QueryTargets> {
    if args.is_empty() {
        bail!("no positional arguments specified. specify node names or node selectors");
    }

    let mut targets = QueryTargets::default();
    for arg in args {
        if !arg.contains(['=', ' ']) {
            targets.node_names.insert(arg.clone());
            continue;
        }
        let selector = LabelSelector::parse(arg)
            .with_context(|| format!("failed to parse node selector {:?}", arg))?;
        targets.selectors.push(selector);
    }
    Ok(targets)
}
