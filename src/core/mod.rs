// Copyright 2025 Dynsql Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Core types and definitions for Dynsql
//!
//! - [`Value`] - Runtime parameter and argument values
//! - [`Parameter`] - Lookup capability over parameter environments
//! - [`Error`] - Error types for every load, lookup and render operation

pub mod error;
pub mod param;
pub mod value;

// Re-export main types for convenience
pub use error::{Cause, Error, Result};
pub use param::{Parameter, SCALAR_PARAM};
pub use value::Value;
