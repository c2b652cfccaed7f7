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

//! Host implementations of the compute shaders.
//!
//! Each function follows its WGSL counterpart step for step, on the same
//! `#[repr(C)]` layouts. They serve as the test oracle for the device path and
//! as a fallback where no device is available.

pub mod clusters;
pub mod pyramid;
pub mod visibility;
