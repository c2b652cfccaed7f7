// Copyright 2025 eraflo
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

//! # Solve Core
//!
//! Foundational crate containing traits, GPU data layouts, and interface
//! contracts for the GPU-driven rendering core. Nothing here talks to a real
//! graphics API: backends implement [`renderer::GraphicsDevice`], lanes and
//! agents only ever see the abstractions defined in this crate.

#![warn(missing_docs)]

pub mod lane;
pub mod math;
pub mod renderer;
pub mod scene;
pub mod utils;

pub use utils::timer::Stopwatch;
