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

//! Backend-agnostic rendering contracts: resource handles, descriptors, the
//! device and encoder traits, GPU data layouts and renderer constants.

pub mod api;
pub mod config;
pub mod error;
pub mod gpu_types;
pub mod surface;
pub mod traits;
pub mod transient;

pub use self::api::*;
pub use self::error::{PipelineError, RenderError, ResourceError, ShaderError};
pub use self::surface::{RenderSurface, SurfaceError, SurfaceFrame};
pub use self::traits::*;
pub use self::transient::TransientPool;
