// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! List the pods running on a set of Kubernetes nodes

pub mod cli;
pub mod config;
pub mod kubernetes;
pub mod output;
pub mod progress;
pub mod query;
